//! State shared between the dispatcher, heartbeat and supervisor.

use std::sync::atomic::{AtomicBool, Ordering};

use bumble_sdk::ClientHandle;
use parking_lot::Mutex;

/// Authentication state of the current (or most recent) session.
///
/// The dispatcher is the only writer; the heartbeat reads it every tick.
#[derive(Debug, Default)]
pub struct SessionState {
    authenticated: AtomicBool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    /// Store the router's verdict. Returns the previous value.
    pub fn set_authenticated(&self, success: bool) -> bool {
        self.authenticated.swap(success, Ordering::AcqRel)
    }
}

/// The live session handle, if any.
///
/// Attached by the supervisor when an attempt starts, detached when it ends.
#[derive(Debug, Default)]
pub struct CurrentSession {
    slot: Mutex<Option<ClientHandle>>,
}

impl CurrentSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, handle: ClientHandle) {
        *self.slot.lock() = Some(handle);
    }

    pub fn detach(&self) -> Option<ClientHandle> {
        self.slot.lock().take()
    }

    /// A clone of the live handle. Never hold the lock across a send.
    pub fn get(&self) -> Option<ClientHandle> {
        self.slot.lock().clone()
    }
}
