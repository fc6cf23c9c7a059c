use serde::{Deserialize, Serialize};

use super::domain::{ApplicantRecord, Gender, UserRecord};

/// Fields a listing can be narrowed on. Implemented by every record shown in a filterable table.
pub trait Filterable {
    fn name(&self) -> &str;
    fn email(&self) -> &str;
    fn age(&self) -> Option<&str>;
    fn gender(&self) -> Option<Gender>;
    fn location(&self) -> Option<&str>;
}

impl Filterable for UserRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn age(&self) -> Option<&str> {
        self.age.as_deref()
    }

    fn gender(&self) -> Option<Gender> {
        self.gender
    }

    fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

impl Filterable for ApplicantRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn age(&self) -> Option<&str> {
        self.age.as_deref()
    }

    fn gender(&self) -> Option<Gender> {
        None
    }

    fn location(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

/// Age constraint of a listing. Range and exact matching cannot be active together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AgeCriterion {
    #[default]
    Any,
    Range {
        from: Option<u32>,
        to: Option<u32>,
    },
    Exact {
        age: u32,
    },
}

impl AgeCriterion {
    fn admits(self, raw_age: Option<&str>) -> bool {
        if self == AgeCriterion::Any {
            return true;
        }

        let Some(age) = raw_age.and_then(parse_age) else {
            return false;
        };

        match self {
            AgeCriterion::Any => true,
            AgeCriterion::Exact { age: expected } => age == expected,
            AgeCriterion::Range { from, to } => {
                from.map_or(true, |lower| age >= lower) && to.map_or(true, |upper| age <= upper)
            }
        }
    }
}

/// Active predicates for a user or applicant listing, combined with logical AND.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    pub search_text: Option<String>,
    pub age: AgeCriterion,
    pub gender: Option<Gender>,
    pub location: Option<String>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search_text = non_blank(text.into());
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = non_blank(location.into());
        self
    }

    pub fn with_age_range(mut self, from: Option<u32>, to: Option<u32>) -> Self {
        self.set_age_range(from, to);
        self
    }

    pub fn with_age_exact(mut self, age: u32) -> Self {
        self.set_age_exact(age);
        self
    }

    /// Replace any age constraint with an inclusive range. Clears an exact age.
    pub fn set_age_range(&mut self, from: Option<u32>, to: Option<u32>) {
        self.age = match (from, to) {
            (None, None) => AgeCriterion::Any,
            (from, to) => AgeCriterion::Range { from, to },
        };
    }

    /// Replace any age constraint with an exact match. Clears both range bounds.
    pub fn set_age_exact(&mut self, age: u32) {
        self.age = AgeCriterion::Exact { age };
    }

    pub fn clear_age(&mut self) {
        self.age = AgeCriterion::Any;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn matches<T: Filterable + ?Sized>(&self, record: &T) -> bool {
        Predicate::compile(self).matches(record)
    }
}

/// Lower-cased needles computed once per listing rather than once per record.
struct Predicate {
    search: Option<String>,
    age: AgeCriterion,
    gender: Option<Gender>,
    location: Option<String>,
}

impl Predicate {
    fn compile(spec: &FilterSpec) -> Self {
        Self {
            search: spec.search_text.as_deref().map(str::to_lowercase),
            age: spec.age,
            gender: spec.gender,
            location: spec.location.as_deref().map(str::to_lowercase),
        }
    }

    fn matches<T: Filterable + ?Sized>(&self, record: &T) -> bool {
        let search_ok = self.search.as_deref().map_or(true, |needle| {
            contains_folded(record.name(), needle) || contains_folded(record.email(), needle)
        });

        let gender_ok = self
            .gender
            .map_or(true, |wanted| record.gender() == Some(wanted));

        let location_ok = self.location.as_deref().map_or(true, |needle| {
            record
                .location()
                .is_some_and(|location| contains_folded(location, needle))
        });

        search_ok && self.age.admits(record.age()) && gender_ok && location_ok
    }
}

fn contains_folded(haystack: &str, folded_needle: &str) -> bool {
    haystack.to_lowercase().contains(folded_needle)
}

/// Parse the leading integer of a stored age (`"30"`, `" 30 yrs"`). Returns `None` when the
/// value does not start with a digit or overflows.
pub fn parse_age(raw: &str) -> Option<u32> {
    let trimmed = raw.trim_start();
    let digits = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .map_or(trimmed, |end| &trimmed[..end]);

    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Return the records matching `spec`, preserving input order.
pub fn filter_records<'a, T: Filterable>(records: &'a [T], spec: &FilterSpec) -> Vec<&'a T> {
    let predicate = Predicate::compile(spec);
    records
        .iter()
        .filter(|record| predicate.matches(*record))
        .collect()
}

/// Owned variant of [`filter_records`].
pub fn filter_owned<T: Filterable + Clone>(records: &[T], spec: &FilterSpec) -> Vec<T> {
    filter_records(records, spec).into_iter().cloned().collect()
}

/// "Showing N of M" counts for a filtered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListingSummary {
    pub shown: usize,
    pub total: usize,
}

impl ListingSummary {
    pub fn describe(&self, noun: &str) -> String {
        format!("Showing {} of {} {}", self.shown, self.total, noun)
    }
}

/// Raw filter inputs as typed into the listing form or passed on a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterQuery {
    pub search: Option<String>,
    pub age_from: Option<String>,
    pub age_to: Option<String>,
    pub age_exact: Option<String>,
    pub gender: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("{field} must be a whole number, got '{value}'")]
    InvalidAge { field: &'static str, value: String },
    #[error("unknown gender '{0}', expected Male, Female or Other")]
    InvalidGender(String),
}

impl TryFrom<FilterQuery> for FilterSpec {
    type Error = FilterError;

    fn try_from(query: FilterQuery) -> Result<Self, Self::Error> {
        let mut spec = FilterSpec::new();
        spec.search_text = query.search.and_then(non_blank);
        spec.location = query.location.and_then(non_blank);

        if let Some(raw) = query.gender.and_then(non_blank) {
            let gender = Gender::from_label(&raw).ok_or(FilterError::InvalidGender(raw))?;
            spec.gender = Some(gender);
        }

        match parse_bound("ageExact", query.age_exact)? {
            Some(age) => spec.set_age_exact(age),
            None => spec.set_age_range(
                parse_bound("ageFrom", query.age_from)?,
                parse_bound("ageTo", query.age_to)?,
            ),
        }

        Ok(spec)
    }
}

fn parse_bound(field: &'static str, raw: Option<String>) -> Result<Option<u32>, FilterError> {
    match raw.and_then(non_blank) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| FilterError::InvalidAge { field, value }),
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
