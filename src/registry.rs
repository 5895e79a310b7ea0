//! Session registry
//!
//! Maps session ids to live orchestrators. The map itself sits behind one mutex; each
//! session has its own mutex so frames for different sessions never contend on a shared
//! lock while they are processed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::ScreeningConfig;
use crate::error::ScreenError;
use crate::orchestrator::SessionOrchestrator;
use tracing::{debug, info};

/// Shared handle to one session
pub type SessionHandle = Arc<Mutex<SessionOrchestrator>>;

type Factory = Box<dyn Fn() -> SessionOrchestrator + Send + Sync>;

pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionHandle>>,
    factory: Factory,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(ScreeningConfig::default())
    }
}

impl SessionRegistry {
    /// Registry whose sessions run without collaborators under `config`
    pub fn new(config: ScreeningConfig) -> Self {
        Self::with_factory(move || SessionOrchestrator::new(config.clone()))
    }

    /// Registry that builds each new session with `factory`
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn() -> SessionOrchestrator + Send + Sync + 'static,
    {
        Self {
            sessions: Mutex::new(HashMap::new()),
            factory: Box::new(factory),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, SessionHandle>>, ScreenError> {
        self.sessions.lock().map_err(|_| ScreenError::RegistryPoisoned)
    }

    /// Start a new session; fails if the id is already live
    pub fn create(&self, id: &str) -> Result<SessionHandle, ScreenError> {
        let mut sessions = self.lock()?;
        if sessions.contains_key(id) {
            return Err(ScreenError::SessionExists(id.to_string()));
        }
        let handle = Arc::new(Mutex::new((self.factory)()));
        sessions.insert(id.to_string(), Arc::clone(&handle));
        info!(session = id, "session created");
        Ok(handle)
    }

    pub fn get(&self, id: &str) -> Result<Option<SessionHandle>, ScreenError> {
        Ok(self.lock()?.get(id).cloned())
    }

    pub fn get_or_create(&self, id: &str) -> Result<SessionHandle, ScreenError> {
        let mut sessions = self.lock()?;
        let handle = sessions.entry(id.to_string()).or_insert_with(|| {
            debug!(session = id, "session created on first use");
            Arc::new(Mutex::new((self.factory)()))
        });
        Ok(Arc::clone(handle))
    }

    /// Remove a session, returning its handle if it existed
    ///
    /// Callers still holding the handle may finish with it; the registry no longer does.
    pub fn destroy(&self, id: &str) -> Result<Option<SessionHandle>, ScreenError> {
        let removed = self.lock()?.remove(id);
        if removed.is_some() {
            info!(session = id, "session destroyed");
        }
        Ok(removed)
    }

    pub fn len(&self) -> Result<usize, ScreenError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, ScreenError> {
        Ok(self.lock()?.is_empty())
    }

    /// Live session ids, sorted
    pub fn session_ids(&self) -> Result<Vec<String>, ScreenError> {
        let mut ids: Vec<String> = self.lock()?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::RecordedFrame;
    use std::thread;

    #[test]
    fn test_create_rejects_duplicates() {
        let registry = SessionRegistry::default();
        registry.create("a").unwrap();
        assert!(matches!(
            registry.create("a"),
            Err(ScreenError::SessionExists(id)) if id == "a"
        ));
        assert_eq!(registry.len().unwrap(), 1);
    }

    #[test]
    fn test_get_or_create_returns_same_session() {
        let registry = SessionRegistry::default();
        let first = registry.get_or_create("s").unwrap();
        let second = registry.get_or_create("s").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_destroy() {
        let registry = SessionRegistry::default();
        registry.create("x").unwrap();
        assert!(registry.destroy("x").unwrap().is_some());
        assert!(registry.destroy("x").unwrap().is_none());
        assert!(registry.is_empty().unwrap());
    }

    #[test]
    fn test_concurrent_sessions_are_independent() {
        let registry = Arc::new(SessionRegistry::default());
        let workers: Vec<_> = (0..4)
            .map(|n| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let id = format!("session-{n}");
                    let handle = registry.get_or_create(&id).unwrap();
                    for i in 0..50 {
                        let mut session = handle.lock().unwrap();
                        session.process_observation(RecordedFrame::at(i as f64 * 0.1)).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(
            registry.session_ids().unwrap(),
            vec!["session-0", "session-1", "session-2", "session-3"]
        );
        for id in registry.session_ids().unwrap() {
            let handle = registry.get(&id).unwrap().unwrap();
            assert_eq!(handle.lock().unwrap().frame_count(), 50);
        }
    }
}
