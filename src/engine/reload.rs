// src/engine/reload.rs

use std::fmt;
use std::sync::Weak;

use crate::engine::session::SessionInner;
use crate::watch::WatchTrigger;

/// Requests a fresh content load for one module id.
///
/// Holds only a weak reference to the session: a reload after the session is
/// gone does nothing, as does a reload outside serve mode.
#[derive(Clone)]
pub struct ReloadHandle {
    id: String,
    session: Weak<SessionInner>,
}

impl fmt::Debug for ReloadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadHandle")
            .field("id", &self.id)
            .field("attached", &(self.session.strong_count() > 0))
            .finish()
    }
}

impl ReloadHandle {
    pub(crate) fn new(id: impl Into<String>, session: Weak<SessionInner>) -> Self {
        Self {
            id: id.into(),
            session,
        }
    }

    /// A handle bound to no session; `reload` is always a no-op.
    pub fn detached(id: impl Into<String>) -> Self {
        Self::new(id, Weak::new())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn reload(&self) {
        if let Some(session) = self.session.upgrade() {
            session.request_reload(&self.id);
        }
    }

    /// Reload because a watched dependent file changed; the trigger is handed
    /// to the next content callback.
    pub(crate) fn reload_for(&self, trigger: WatchTrigger) {
        if let Some(session) = self.session.upgrade() {
            session.record_trigger(&self.id, trigger);
            session.request_reload(&self.id);
        }
    }
}
