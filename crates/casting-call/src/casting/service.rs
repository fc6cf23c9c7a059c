use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::context::{AccessError, SessionContext};
use super::domain::{ApplicantRecord, EventId, EventRecord, UserId, UserRecord};
use super::export::{render_export, ExportArtifact, ExportError, ExportFormat, ExportSettings};
use super::filter::{filter_owned, FilterError, FilterSpec, ListingSummary};
use super::store::{RecordStore, StoreError};

/// Upper bound on the photos attached to one application.
pub const MAX_APPLICATION_PHOTOS: usize = 5;

/// Admin listing of talent users after filtering.
#[derive(Debug, Clone, Serialize)]
pub struct RosterView {
    pub summary: ListingSummary,
    pub users: Vec<UserRecord>,
}

/// Applicants of one event after filtering, newest application first.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicantListing {
    pub event: EventRecord,
    pub summary: ListingSummary,
    pub applicants: Vec<ApplicantRecord>,
}

/// Event as shown on the talent board, with the viewer's application state.
#[derive(Debug, Clone, Serialize)]
pub struct EventCard {
    #[serde(flatten)]
    pub event: EventRecord,
    pub applied: bool,
}

/// Application details submitted by a talent user. Name, email and age fall back to the profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub age: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub address: Option<String>,
    pub photos: Vec<String>,
}

/// Fields required to publish a casting call. The image is uploaded beforehand.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub location: String,
    pub date: DateTime<Utc>,
    pub image_url: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("at least one photo is required")]
    NoPhotos,
    #[error("{count} photos attached, at most {max} allowed")]
    TooManyPhotos { count: usize, max: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("casting event '{0}' not found")]
    EventNotFound(EventId),
    #[error("already applied to casting event '{0}'")]
    AlreadyApplied(EventId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

const EVENT_ID_PREFIX: &str = "evt-";

fn event_id(sequence: u64) -> EventId {
    EventId(format!("{EVENT_ID_PREFIX}{sequence:06}"))
}

fn event_sequence(id: &EventId) -> Option<u64> {
    id.0.strip_prefix(EVENT_ID_PREFIX)?.parse().ok()
}

/// Admin and talent operations over the record store.
pub struct CastingService<S> {
    store: Arc<S>,
    export: ExportSettings,
    event_sequence: AtomicU64,
}

impl<S> CastingService<S>
where
    S: RecordStore + 'static,
{
    pub fn new(store: Arc<S>, export: ExportSettings) -> Self {
        Self {
            store,
            export,
            event_sequence: AtomicU64::new(1),
        }
    }

    pub fn export_settings(&self) -> ExportSettings {
        self.export
    }

    /// Resolve the signed-in user's profile into a request context.
    pub fn session(&self, user_id: &UserId) -> Result<SessionContext, ServiceError> {
        let user = self
            .store
            .fetch_user(user_id)?
            .ok_or(AccessError::Unauthenticated)?;
        Ok(SessionContext::new(user))
    }

    /// Non-admin users matching `spec`, in store order.
    pub fn roster(
        &self,
        ctx: &SessionContext,
        spec: &FilterSpec,
    ) -> Result<RosterView, ServiceError> {
        ctx.require_admin()?;

        let talent: Vec<UserRecord> = self
            .store
            .list_users()?
            .into_iter()
            .filter(|user| !user.is_admin())
            .collect();
        let users = filter_owned(&talent, spec);
        debug!(shown = users.len(), total = talent.len(), "roster filtered");

        Ok(RosterView {
            summary: ListingSummary {
                shown: users.len(),
                total: talent.len(),
            },
            users,
        })
    }

    pub fn export_roster(
        &self,
        ctx: &SessionContext,
        spec: &FilterSpec,
        format: ExportFormat,
    ) -> Result<ExportArtifact, ServiceError> {
        let roster = self.roster(ctx, spec)?;
        let artifact = render_export("users", "Users", &roster.users, format, self.export)?;
        info!(
            admin = %ctx.user_id(),
            rows = roster.users.len(),
            file = %artifact.file_name,
            "roster exported"
        );
        Ok(artifact)
    }

    pub fn applicants(
        &self,
        ctx: &SessionContext,
        event_id: &EventId,
        spec: &FilterSpec,
    ) -> Result<ApplicantListing, ServiceError> {
        ctx.require_admin()?;

        let event = self.require_event(event_id)?;
        let all = self.store.list_applicants(event_id)?;
        let applicants = filter_owned(&all, spec);

        Ok(ApplicantListing {
            event,
            summary: ListingSummary {
                shown: applicants.len(),
                total: all.len(),
            },
            applicants,
        })
    }

    pub fn export_applicants(
        &self,
        ctx: &SessionContext,
        event_id: &EventId,
        spec: &FilterSpec,
        format: ExportFormat,
    ) -> Result<ExportArtifact, ServiceError> {
        let listing = self.applicants(ctx, event_id, spec)?;
        let stem = format!("applicants-{event_id}");
        let title = format!("Applicants for \"{}\"", listing.event.title);
        let artifact = render_export(&stem, &title, &listing.applicants, format, self.export)?;
        info!(
            admin = %ctx.user_id(),
            event = %event_id,
            rows = listing.applicants.len(),
            "applicants exported"
        );
        Ok(artifact)
    }

    /// Every event, newest first, flagged with whether the signed-in user has applied.
    pub fn event_board(&self, ctx: &SessionContext) -> Result<Vec<EventCard>, ServiceError> {
        let events = self.store.list_events()?;
        let mut cards = Vec::with_capacity(events.len());
        for event in events {
            let applied = self
                .store
                .fetch_applicant(&event.id, ctx.user_id())?
                .is_some();
            cards.push(EventCard { event, applied });
        }
        Ok(cards)
    }

    /// File an application keyed by the signed-in user's id. A second application to the same
    /// event is rejected.
    pub fn apply(
        &self,
        ctx: &SessionContext,
        event_id: &EventId,
        form: ApplicationForm,
    ) -> Result<ApplicantRecord, ServiceError> {
        self.require_event(event_id)?;
        let record = applicant_from_form(ctx.user(), form, Utc::now())?;

        match self.store.insert_applicant(event_id, record) {
            Ok(stored) => {
                info!(event = %event_id, applicant = %stored.id, "application received");
                Ok(stored)
            }
            Err(StoreError::Conflict) => Err(ServiceError::AlreadyApplied(event_id.clone())),
            Err(other) => Err(other.into()),
        }
    }

    pub fn create_event(
        &self,
        ctx: &SessionContext,
        draft: EventDraft,
    ) -> Result<EventRecord, ServiceError> {
        ctx.require_admin()?;

        let EventDraft {
            title,
            description,
            location,
            date,
            image_url,
        } = draft;

        let event = EventRecord {
            id: self.next_event_id(),
            title: required("title", title)?,
            description: required("description", description)?,
            location: required("location", location)?,
            date,
            image_url: required("imageUrl", image_url)?,
            created_at: Utc::now(),
        };

        let stored = self.insert_event(event)?;
        info!(event = %stored.id, title = %stored.title, "casting event created");
        Ok(stored)
    }

    fn next_event_id(&self) -> EventId {
        event_id(self.event_sequence.fetch_add(1, Ordering::Relaxed))
    }

    /// A store seeded with generated ids can already hold the next id. On conflict the
    /// sequence jumps past the highest stored id and the insert is retried once.
    fn insert_event(&self, mut event: EventRecord) -> Result<EventRecord, ServiceError> {
        match self.store.insert_event(event.clone()) {
            Err(StoreError::Conflict) => {
                let highest = self
                    .store
                    .list_events()?
                    .iter()
                    .filter_map(|existing| event_sequence(&existing.id))
                    .max()
                    .unwrap_or(0);
                self.event_sequence
                    .fetch_max(highest.saturating_add(1), Ordering::Relaxed);
                let taken = std::mem::replace(&mut event.id, self.next_event_id());
                debug!(taken = %taken, retry = %event.id, "event id already stored");
                Ok(self.store.insert_event(event)?)
            }
            other => Ok(other?),
        }
    }

    pub fn delete_event(&self, ctx: &SessionContext, event_id: &EventId) -> Result<(), ServiceError> {
        ctx.require_admin()?;
        self.require_event(event_id)?;
        self.store.delete_event(event_id)?;
        info!(event = %event_id, "casting event deleted");
        Ok(())
    }

    pub fn delete_user(&self, ctx: &SessionContext, user_id: &UserId) -> Result<(), ServiceError> {
        ctx.require_admin()?;
        self.store.delete_user(user_id)?;
        info!(user = %user_id, "user deleted");
        Ok(())
    }

    fn require_event(&self, event_id: &EventId) -> Result<EventRecord, ServiceError> {
        self.store
            .fetch_event(event_id)?
            .ok_or_else(|| ServiceError::EventNotFound(event_id.clone()))
    }
}

pub(crate) fn applicant_from_form(
    user: &UserRecord,
    form: ApplicationForm,
    applied_at: DateTime<Utc>,
) -> Result<ApplicantRecord, ValidationError> {
    let ApplicationForm {
        name,
        email,
        phone,
        age,
        height,
        weight,
        address,
        photos,
    } = form;

    let photos: Vec<String> = photos
        .into_iter()
        .filter(|url| !url.trim().is_empty())
        .collect();
    if photos.is_empty() {
        return Err(ValidationError::NoPhotos);
    }
    if photos.len() > MAX_APPLICATION_PHOTOS {
        return Err(ValidationError::TooManyPhotos {
            count: photos.len(),
            max: MAX_APPLICATION_PHOTOS,
        });
    }

    Ok(ApplicantRecord {
        id: user.id.clone(),
        name: required("name", name.unwrap_or_else(|| user.name.clone()))?,
        email: required("email", email.unwrap_or_else(|| user.email.clone()))?,
        phone: optional(phone).or_else(|| user.mobile.clone()),
        age: optional(age).or_else(|| user.age.clone()),
        height: optional(height),
        weight: optional(weight),
        address: optional(address),
        photos,
        applied_at,
    })
}

fn required(field: &'static str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|inner| inner.trim().to_string())
        .filter(|inner| !inner.is_empty())
}
