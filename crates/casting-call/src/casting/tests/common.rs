use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::casting::context::SessionContext;
use crate::casting::domain::{
    ApplicantRecord, EventId, EventRecord, Gender, UserId, UserRecord, UserRole,
};
use crate::casting::export::ExportSettings;
use crate::casting::service::{ApplicationForm, CastingService};
use crate::casting::store::{RecordStore, StoreError};

pub(super) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn admin() -> UserRecord {
    UserRecord {
        id: UserId("admin-1".to_string()),
        name: "Priya Admin".to_string(),
        email: "priya@castingnation.test".to_string(),
        mobile: None,
        age: None,
        gender: None,
        location: Some("Mumbai".to_string()),
        role: UserRole::Admin,
    }
}

pub(super) fn talent(
    id: &str,
    name: &str,
    email: &str,
    age: &str,
    gender: Gender,
    location: &str,
) -> UserRecord {
    UserRecord {
        id: UserId(id.to_string()),
        name: name.to_string(),
        email: email.to_string(),
        mobile: Some("+91 98200 00000".to_string()),
        age: Some(age.to_string()),
        gender: Some(gender),
        location: Some(location.to_string()),
        role: UserRole::Talent,
    }
}

pub(super) fn ann() -> UserRecord {
    talent("u-ann", "Ann", "a@x.com", "30", Gender::Female, "Pune")
}

pub(super) fn bob() -> UserRecord {
    talent("u-bob", "Bob", "b@x.com", "40", Gender::Male, "Mumbai")
}

pub(super) fn event(id: &str, title: &str, created_day: u32) -> EventRecord {
    EventRecord {
        id: EventId(id.to_string()),
        title: title.to_string(),
        description: "Open audition".to_string(),
        location: "Film City, Mumbai".to_string(),
        date: at(28, 10),
        image_url: format!("https://storage.test/casting_events/{id}.jpg"),
        created_at: at(created_day, 9),
    }
}

pub(super) fn applicant(user: &UserRecord, applied_day: u32) -> ApplicantRecord {
    ApplicantRecord {
        id: user.id.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
        phone: user.mobile.clone(),
        age: user.age.clone(),
        height: Some("170".to_string()),
        weight: None,
        address: user.location.clone(),
        photos: vec![format!("https://storage.test/applicants/{}/1.jpg", user.id)],
        applied_at: at(applied_day, 12),
    }
}

pub(super) fn form_with_photos(count: usize) -> ApplicationForm {
    ApplicationForm {
        height: Some("168".to_string()),
        address: Some("Koregaon Park, Pune".to_string()),
        photos: (0..count)
            .map(|i| format!("https://storage.test/uploads/{i}.jpg"))
            .collect(),
        ..ApplicationForm::default()
    }
}

pub(super) fn admin_session() -> SessionContext {
    SessionContext::new(admin())
}

pub(super) fn talent_session() -> SessionContext {
    SessionContext::new(ann())
}

pub(super) fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::default();
    {
        let mut state = store.state.lock().expect("store mutex poisoned");
        state.users = vec![ann(), admin(), bob()];
        state.events = vec![event("evt-a", "Ad Film", 1), event("evt-b", "Web Series", 3)];
        let mut applicants = BTreeMap::new();
        applicants.insert(bob().id, applicant(&bob(), 4));
        state.applicants.insert(EventId("evt-b".to_string()), applicants);
    }
    Arc::new(store)
}

pub(super) fn build_service() -> (CastingService<MemoryStore>, Arc<MemoryStore>) {
    let store = seeded_store();
    let service = CastingService::new(store.clone(), ExportSettings::default());
    (service, store)
}

#[derive(Default)]
pub(super) struct StoreState {
    pub(super) users: Vec<UserRecord>,
    pub(super) events: Vec<EventRecord>,
    pub(super) applicants: HashMap<EventId, BTreeMap<UserId, ApplicantRecord>>,
}

#[derive(Default)]
pub(super) struct MemoryStore {
    pub(super) state: Mutex<StoreState>,
}

impl RecordStore for MemoryStore {
    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.state.lock().expect("store mutex poisoned").users.clone())
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.users.iter().find(|user| &user.id == id).cloned())
    }

    fn delete_user(&self, id: &UserId) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let before = state.users.len();
        state.users.retain(|user| &user.id != id);
        if state.users.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn list_events(&self) -> Result<Vec<EventRecord>, StoreError> {
        let state = self.state.lock().expect("store mutex poisoned");
        let mut events = state.events.clone();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    fn fetch_event(&self, id: &EventId) -> Result<Option<EventRecord>, StoreError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.events.iter().find(|event| &event.id == id).cloned())
    }

    fn insert_event(&self, event: EventRecord) -> Result<EventRecord, StoreError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        if state.events.iter().any(|existing| existing.id == event.id) {
            return Err(StoreError::Conflict);
        }
        state.events.push(event.clone());
        Ok(event)
    }

    fn delete_event(&self, id: &EventId) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let before = state.events.len();
        state.events.retain(|event| &event.id != id);
        if state.events.len() == before {
            return Err(StoreError::NotFound);
        }
        state.applicants.remove(id);
        Ok(())
    }

    fn list_applicants(&self, event: &EventId) -> Result<Vec<ApplicantRecord>, StoreError> {
        let state = self.state.lock().expect("store mutex poisoned");
        let mut applicants: Vec<ApplicantRecord> = state
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
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
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
        let mut state = self.state.lock().expect("store mutex poisoned");
        let by_id = state.applicants.entry(event.clone()).or_default();
        if by_id.contains_key(&applicant.id) {
            return Err(StoreError::Conflict);
        }
        by_id.insert(applicant.id.clone(), applicant.clone());
        Ok(applicant)
    }
}

/// Store whose backend is unreachable. User lookups still succeed so requests get past auth.
pub(super) struct UnavailableStore;

impl UnavailableStore {
    fn offline<T>() -> Result<T, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

impl RecordStore for UnavailableStore {
    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Self::offline()
    }

    fn fetch_user(&self, _id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(Some(admin()))
    }

    fn delete_user(&self, _id: &UserId) -> Result<(), StoreError> {
        Self::offline()
    }

    fn list_events(&self) -> Result<Vec<EventRecord>, StoreError> {
        Self::offline()
    }

    fn fetch_event(&self, _id: &EventId) -> Result<Option<EventRecord>, StoreError> {
        Self::offline()
    }

    fn insert_event(&self, _event: EventRecord) -> Result<EventRecord, StoreError> {
        Self::offline()
    }

    fn delete_event(&self, _id: &EventId) -> Result<(), StoreError> {
        Self::offline()
    }

    fn list_applicants(&self, _event: &EventId) -> Result<Vec<ApplicantRecord>, StoreError> {
        Self::offline()
    }

    fn fetch_applicant(
        &self,
        _event: &EventId,
        _applicant: &UserId,
    ) -> Result<Option<ApplicantRecord>, StoreError> {
        Self::offline()
    }

    fn insert_applicant(
        &self,
        _event: &EventId,
        _applicant: ApplicantRecord,
    ) -> Result<ApplicantRecord, StoreError> {
        Self::offline()
    }
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    serde_json::from_slice(&read_body(response).await).expect("json payload")
}
