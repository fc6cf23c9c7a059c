//! Casting-call roster: talent and applicant listings, filtering, export and applications.

pub mod context;
pub mod domain;
pub mod export;
pub mod filter;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use context::{AccessError, SessionContext};
pub use domain::{
    ApplicantRecord, EventId, EventRecord, Gender, UserId, UserRecord, UserRole,
};
pub use export::{
    render_export, to_delimited_string, write_delimited, CsvQuoting, ExportArtifact,
    ExportColumn, ExportError, ExportFormat, ExportSettings, Exportable, TabularDocument,
    PLACEHOLDER,
};
pub use filter::{
    filter_owned, filter_records, parse_age, AgeCriterion, FilterError, FilterQuery, FilterSpec,
    Filterable, ListingSummary,
};
pub use router::{casting_router, USER_HEADER};
pub use service::{
    ApplicantListing, ApplicationForm, CastingService, EventCard, EventDraft, RosterView,
    ServiceError, ValidationError, MAX_APPLICATION_PHOTOS,
};
pub use store::{RecordStore, StoreError};
