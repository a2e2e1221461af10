// crates/jobs/src/identity.rs
//! The job slot: which job a runner is currently tracking.
//!
//! Poll callbacks are scheduled before later updates happen, so the current
//! id must be readable at the moment a response resolves, not at the moment
//! the callback was created. [`JobIdentity`] is therefore a plain shared cell
//! that every reader consults directly; `set` and `clear` are visible to the
//! next reader on any task as soon as they return.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use gource_studio_types::JobId;

/// Holds at most one live job id.
#[derive(Debug, Default)]
pub struct JobIdentity {
    current: RwLock<Option<JobId>>,
}

impl JobIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `id` the current job. Returns the id it replaced, if any.
    pub fn set(&self, id: JobId) -> Option<JobId> {
        self.write().replace(id)
    }

    pub fn get(&self) -> Option<JobId> {
        self.read().clone()
    }

    /// Empty the slot. Returns the id that was in it.
    pub fn clear(&self) -> Option<JobId> {
        self.write().take()
    }

    pub fn is_current(&self, id: &JobId) -> bool {
        self.read().as_ref() == Some(id)
    }

    /// Empty the slot only if it still holds `id`.
    ///
    /// Compare and clear happen under one write lock, so for any id exactly
    /// one caller ever sees `true`.
    pub fn clear_if(&self, id: &JobId) -> bool {
        let mut current = self.write();
        if current.as_ref() == Some(id) {
            *current = None;
            true
        } else {
            false
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<JobId>> {
        self.current.read().unwrap_or_else(|poisoned| {
            tracing::error!("JobIdentity lock poisoned on read, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<JobId>> {
        self.current.write().unwrap_or_else(|poisoned| {
            tracing::error!("JobIdentity lock poisoned on write, recovering");
            poisoned.into_inner()
        })
    }
}
