use super::domain::{ApplicantRecord, EventId, EventRecord, UserId, UserRecord};

/// Document store holding `users`, `casting_events` and each event's `applicants`.
///
/// Listings come back fully materialized. Events are ordered newest `created_at` first and
/// applicants newest `applied_at` first.
pub trait RecordStore: Send + Sync {
    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError>;
    fn fetch_user(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError>;
    fn delete_user(&self, id: &UserId) -> Result<(), StoreError>;

    fn list_events(&self) -> Result<Vec<EventRecord>, StoreError>;
    fn fetch_event(&self, id: &EventId) -> Result<Option<EventRecord>, StoreError>;
    fn insert_event(&self, event: EventRecord) -> Result<EventRecord, StoreError>;
    /// Removes the event together with its applicant sub-collection.
    fn delete_event(&self, id: &EventId) -> Result<(), StoreError>;

    fn list_applicants(&self, event: &EventId) -> Result<Vec<ApplicantRecord>, StoreError>;
    fn fetch_applicant(
        &self,
        event: &EventId,
        applicant: &UserId,
    ) -> Result<Option<ApplicantRecord>, StoreError>;
    /// Fails with [`StoreError::Conflict`] when a document with the applicant's id exists.
    fn insert_applicant(
        &self,
        event: &EventId,
        applicant: ApplicantRecord,
    ) -> Result<ApplicantRecord, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}
