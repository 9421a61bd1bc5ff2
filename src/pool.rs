//! A process-wide, lazily populated pool of warm `WorkerHandle`s.
//! SPDX-License-Identifier: Apache-2.0 OR GPL-3.0-or-later

use crate::error::Error;
use crate::worker::WorkerHandle;
use std::cell::RefCell;
use std::rc::Rc;

/// A LIFO pool of idle workers, all spawned from the same script URL.
///
/// `Get` returns an existing idle handle or spawns one; `Put` returns a
/// handle for reuse. The pool places no bound on concurrency — the caller
/// gates that by how many `get`s it has in flight at once.
pub struct WorkerPool {
    script_url: String,
    idle: Rc<RefCell<Vec<WorkerHandle>>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("script_url", &self.script_url)
            .field("idle", &self.idle.borrow().len())
            .finish()
    }
}

impl WorkerPool {
    /// Create an empty pool. Workers are spawned lazily, on the first
    /// `get` that finds no idle handle.
    pub fn new(script_url: impl Into<String>) -> WorkerPool {
        WorkerPool {
            script_url: script_url.into(),
            idle: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Remove an idle handle, or spawn a new one from this pool's script
    /// URL.
    pub async fn get(&self) -> Result<WorkerHandle, Error> {
        if let Some(handle) = self.idle.borrow_mut().pop() {
            return Ok(handle);
        }
        WorkerHandle::spawn(&self.script_url).await
    }

    /// Return a handle for reuse.
    pub fn put(&self, handle: WorkerHandle) {
        self.idle.borrow_mut().push(handle);
    }

    /// Number of idle handles currently held.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.borrow().len()
    }
}
