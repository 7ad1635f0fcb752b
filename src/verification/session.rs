use std::sync::{Arc, Mutex, MutexGuard};

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::store::KeyValueStore;

use super::record::{ParsedIdentity, VerificationRecord, VerificationStep};

pub const SESSION_KEY: &str = "verification_session";

/// Which storage key the pending verification lives under.
///
/// `Global` is one record per device. `Account` keeps each signed-in
/// account's record apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionScope {
    #[default]
    Global,
    Account(String),
}

impl SessionScope {
    pub fn storage_key(&self) -> String {
        match self {
            SessionScope::Global => SESSION_KEY.to_string(),
            SessionScope::Account(account) => format!("{SESSION_KEY}:{account}"),
        }
    }
}

struct SessionInner {
    scope: SessionScope,
    record: VerificationRecord,
}

/// Durable progress through the verification flow.
///
/// Every mutation lands in memory first and is then written to the store.
/// Store failures are logged and swallowed: the in-memory record stays
/// authoritative for this process, but callers cannot assume it survived a
/// restart.
pub struct VerificationSession {
    store: Arc<dyn KeyValueStore>,
    inner: Mutex<SessionInner>,
}

impl VerificationSession {
    pub fn open(store: Arc<dyn KeyValueStore>, scope: SessionScope) -> Self {
        let record = load_record(store.as_ref(), &scope);
        if record != VerificationRecord::default() {
            info!(
                "Recovered pending verification under {} at step {:?}",
                scope.storage_key(),
                record.step()
            );
        }

        Self {
            store,
            inner: Mutex::new(SessionInner { scope, record }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, SessionInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn snapshot(&self) -> VerificationRecord {
        self.inner().record.clone()
    }

    pub fn scope(&self) -> SessionScope {
        self.inner().scope.clone()
    }

    pub fn step(&self) -> VerificationStep {
        self.inner().record.step()
    }

    pub fn is_pending(&self) -> bool {
        self.inner().record != VerificationRecord::default()
    }

    pub fn set_id_image_uri(&self, uri: impl Into<String>) {
        let uri = uri.into();
        self.update(|record| record.id_image_uri = Some(uri));
    }

    pub fn set_face_image_uri(&self, uri: impl Into<String>) {
        let uri = uri.into();
        self.update(|record| record.face_image_uri = Some(uri));
    }

    pub fn set_parsed_id(&self, fields: ParsedIdentity) {
        self.update(|record| record.parsed_identity = Some(fields));
    }

    /// Marks the document step done. Completion never reverts outside
    /// [`reset`](Self::reset), so `false` on a completed step is ignored.
    pub fn set_id_complete(&self, complete: bool) {
        self.update(|record| {
            if record.id_complete && !complete {
                warn!("Ignoring attempt to clear id_complete without reset");
                return;
            }
            record.id_complete = complete;
        });
    }

    /// Same rules as [`set_id_complete`](Self::set_id_complete).
    pub fn set_face_complete(&self, complete: bool) {
        self.update(|record| {
            if record.face_complete && !complete {
                warn!("Ignoring attempt to clear face_complete without reset");
                return;
            }
            record.face_complete = complete;
        });
    }

    /// Drops the whole record, in memory and in storage.
    pub fn reset(&self) {
        let mut inner = self.inner();
        self.clear_record(&mut inner);
    }

    /// Resets the current scope's record, then adopts `scope` and loads
    /// whatever is stored for it, all under one lock so no setter can land
    /// in between.
    pub fn switch_scope(&self, scope: SessionScope) {
        let mut inner = self.inner();
        self.clear_record(&mut inner);
        info!(
            "Verification session scope {} -> {}",
            inner.scope.storage_key(),
            scope.storage_key()
        );
        inner.record = load_record(self.store.as_ref(), &scope);
        inner.scope = scope;
    }

    fn clear_record(&self, inner: &mut SessionInner) {
        inner.record = VerificationRecord::default();
        let key = inner.scope.storage_key();
        if let Err(err) = self.store.remove(&key) {
            error!("Failed to remove verification session {key}: {err:#}");
        }
        info!("Verification session {key} reset");
    }

    fn update<F>(&self, mutate: F)
    where
        F: FnOnce(&mut VerificationRecord),
    {
        let mut inner = self.inner();
        mutate(&mut inner.record);
        // Persisting under the lock keeps store writes in setter order.
        persist_record(self.store.as_ref(), &inner.scope, &inner.record);
    }
}

fn load_record(store: &dyn KeyValueStore, scope: &SessionScope) -> VerificationRecord {
    let key = scope.storage_key();
    match store.get(&key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!("Discarding unreadable verification session {key}: {err}");
            VerificationRecord::default()
        }),
        Ok(None) => VerificationRecord::default(),
        Err(err) => {
            error!("Failed to load verification session {key}: {err:#}");
            VerificationRecord::default()
        }
    }
}

fn persist_record(store: &dyn KeyValueStore, scope: &SessionScope, record: &VerificationRecord) {
    let key = scope.storage_key();
    let serialized = match serde_json::to_string(record) {
        Ok(serialized) => serialized,
        Err(err) => {
            error!("Failed to serialize verification session {key}: {err}");
            return;
        }
    };
    if let Err(err) = store.set(&key, &serialized) {
        error!("Failed to persist verification session {key}: {err:#}");
    }
}
