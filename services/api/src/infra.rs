use casting_call::casting::{
    ApplicantRecord, EventId, EventRecord, RecordStore, StoreError, UserId, UserRecord,
};
use casting_call::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Snapshot of the record store as exported from the document database.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RecordDump {
    pub(crate) users: Vec<UserRecord>,
    pub(crate) events: Vec<EventRecord>,
    pub(crate) applicants: BTreeMap<EventId, Vec<ApplicantRecord>>,
}

/// Accepts either a bare array of users or a full [`RecordDump`].
pub(crate) fn parse_dump(raw: &str) -> Result<RecordDump, AppError> {
    if raw.trim_start().starts_with('[') {
        let users: Vec<UserRecord> = serde_json::from_str(raw)?;
        return Ok(RecordDump {
            users,
            ..RecordDump::default()
        });
    }
    Ok(serde_json::from_str(raw)?)
}

pub(crate) fn load_dump(path: &Path) -> Result<RecordDump, AppError> {
    let raw = std::fs::read_to_string(path)?;
    parse_dump(&raw)
}

#[derive(Default)]
struct StoreState {
    users: Vec<UserRecord>,
    events: Vec<EventRecord>,
    applicants: HashMap<EventId, BTreeMap<UserId, ApplicantRecord>>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryRecordStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryRecordStore {
    pub(crate) fn from_dump(dump: RecordDump) -> Self {
        let applicants = dump
            .applicants
            .into_iter()
            .map(|(event, records)| {
                let by_id = records
                    .into_iter()
                    .map(|record| (record.id.clone(), record))
                    .collect();
                (event, by_id)
            })
            .collect();

        Self {
            state: Arc::new(Mutex::new(StoreState {
                users: dump.users,
                events: dump.events,
                applicants,
            })),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl RecordStore for InMemoryRecordStore {
    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.lock()?.users.clone())
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.lock()?.users.iter().find(|user| &user.id == id).cloned())
    }

    fn delete_user(&self, id: &UserId) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let before = guard.users.len();
        guard.users.retain(|user| &user.id != id);
        if guard.users.len() == before {
            Err(StoreError::NotFound)
        } else {
            Ok(())
        }
    }

    fn list_events(&self) -> Result<Vec<EventRecord>, StoreError> {
        let mut events = self.lock()?.events.clone();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    fn fetch_event(&self, id: &EventId) -> Result<Option<EventRecord>, StoreError> {
        Ok(self
            .lock()?
            .events
            .iter()
            .find(|event| &event.id == id)
            .cloned())
    }

    fn insert_event(&self, event: EventRecord) -> Result<EventRecord, StoreError> {
        let mut guard = self.lock()?;
        if guard.events.iter().any(|existing| existing.id == event.id) {
            return Err(StoreError::Conflict);
        }
        guard.events.push(event.clone());
        Ok(event)
    }

    fn delete_event(&self, id: &EventId) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let before = guard.events.len();
        guard.events.retain(|event| &event.id != id);
        if guard.events.len() == before {
            return Err(StoreError::NotFound);
        }
        guard.applicants.remove(id);
        Ok(())
    }

    fn list_applicants(&self, event: &EventId) -> Result<Vec<ApplicantRecord>, StoreError> {
        let guard = self.lock()?;
        let mut applicants: Vec<ApplicantRecord> = guard
            .applicants
            .get(event)
            .map(|by_id| by_id.values().cloned().collect())
            .unwrap_or_default();
        applicants.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        Ok(applicants)
    }

    fn fetch_applicant(
        &self,
        event: &EventId,
        applicant: &UserId,
    ) -> Result<Option<ApplicantRecord>, StoreError> {
        Ok(self
            .lock()?
            .applicants
            .get(event)
            .and_then(|by_id| by_id.get(applicant))
            .cloned())
    }

    fn insert_applicant(
        &self,
        event: &EventId,
        applicant: ApplicantRecord,
    ) -> Result<ApplicantRecord, StoreError> {
        let mut guard = self.lock()?;
        let by_id = guard.applicants.entry(event.clone()).or_default();
        if by_id.contains_key(&applicant.id) {
            return Err(StoreError::Conflict);
        }
        by_id.insert(applicant.id.clone(), applicant.clone());
        Ok(applicant)
    }
}
