use crate::core::session::{Session, SessionContext};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// In-memory session registry
///
/// Sessions expire after a period without access; an expired session is
/// simply gone and the client opens a new one.
#[derive(Clone)]
pub struct SessionStore {
    sessions: moka::future::Cache<Uuid, Arc<Session>>,
}

impl SessionStore {
    pub fn new(max_sessions: u64, idle: Duration) -> Self {
        let sessions = moka::future::CacheBuilder::new(max_sessions)
            .time_to_idle(idle)
            .build();

        Self { sessions }
    }

    pub async fn create(&self, context: SessionContext) -> (Uuid, Arc<Session>) {
        let id = Uuid::new_v4();
        let session = Arc::new(Session::new(context));
        self.sessions.insert(id, session.clone()).await;

        tracing::debug!("Created session {}", id);
        (id, session)
    }

    pub async fn get(&self, id: &Uuid) -> Option<Arc<Session>> {
        self.sessions.get(id).await
    }

    pub async fn remove(&self, id: &Uuid) {
        self.sessions.invalidate(id).await;
    }
}
