use crate::error::LoadError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Tracks the newest load per session. Starting a load supersedes the previous one for the
/// same session; the superseded load notices at its next check and stops.
#[derive(Debug, Clone, Default)]
pub struct LoadCoordinator {
    inner: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    next_generation: AtomicU64,
    current: Mutex<HashMap<String, u64>>,
}

impl Shared {
    fn current(&self) -> std::sync::MutexGuard<'_, HashMap<String, u64>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LoadCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, session: &str) -> LoadTicket {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let previous = self
            .inner
            .current()
            .insert(session.to_string(), generation);
        if previous.is_some() {
            tracing::info!(session, "superseding in-flight calendar load");
        }

        LoadTicket {
            owner: Some(Owner {
                shared: Arc::clone(&self.inner),
                session: session.to_string(),
                generation,
            }),
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.inner.current().len()
    }
}

/// Handle of one load. Dropping the current ticket clears its session entry.
#[derive(Debug)]
pub struct LoadTicket {
    owner: Option<Owner>,
}

#[derive(Debug)]
struct Owner {
    shared: Arc<Shared>,
    session: String,
    generation: u64,
}

impl LoadTicket {
    /// A ticket that is never superseded, for one-shot loads.
    pub fn detached() -> Self {
        Self { owner: None }
    }

    pub fn is_current(&self) -> bool {
        match &self.owner {
            None => true,
            Some(o) => o.shared.current().get(&o.session) == Some(&o.generation),
        }
    }

    pub fn ensure_current(&self) -> Result<(), LoadError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(LoadError::Superseded)
        }
    }
}

impl Drop for LoadTicket {
    fn drop(&mut self) {
        let Some(o) = &self.owner else {
            return;
        };
        let mut current = o.shared.current();
        if current.get(&o.session) == Some(&o.generation) {
            current.remove(&o.session);
        }
    }
}
