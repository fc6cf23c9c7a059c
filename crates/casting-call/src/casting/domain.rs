use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a user document; also the key of that user's applicant documents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Identifier of a casting event document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }

    /// Parse the exact label used by the listing UI; blank input means "all genders".
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "Male" => Some(Self::Male),
            "Female" => Some(Self::Female),
            "Other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Talent,
}

/// Profile document stored under `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub mobile: Option<String>,
    #[serde(default, deserialize_with = "loose_age")]
    pub age: Option<String>,
    #[serde(default, deserialize_with = "blank_gender_as_none")]
    pub gender: Option<Gender>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

impl UserRecord {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Casting call document stored under `casting_events/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub date: DateTime<Utc>,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// Application document stored under `casting_events/{event}/applicants/{uid}`.
///
/// The id doubles as the membership flag: a user has applied to an event exactly
/// when a document keyed by their uid exists in that event's sub-collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "loose_age")]
    pub age: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub height: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub weight: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    pub applied_at: DateTime<Utc>,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// The listing's "All Genders" option stores an empty string.
fn blank_gender_as_none<'de, D>(deserializer: D) -> Result<Option<Gender>, D::Error>
where
    D: Deserializer<'de>,
{
    match blank_as_none(deserializer)? {
        None => Ok(None),
        Some(label) => Gender::from_label(&label).map(Some).ok_or_else(|| {
            serde::de::Error::unknown_variant(&label, &["Male", "Female", "Other"])
        }),
    }
}

/// Ages arrive either as form strings or as numbers written by older clients.
fn loose_age<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAge {
        Text(String),
        Number(i64),
    }

    let raw = Option::<RawAge>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawAge::Text(text)) if !text.trim().is_empty() => Some(text),
        Some(RawAge::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}
