//! The worker-side `name -> fn` map a server loop dispatches against.
//! SPDX-License-Identifier: Apache-2.0 OR GPL-3.0-or-later

use crate::port::Port;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

/// A registered worker-side function: takes the call's output and input
/// ports, returns `Ok(())` on success or `Err(message)` to abort the call
/// with a terminal ERR frame on `w`.
pub type RemoteFn = Rc<dyn Fn(Port, Port) -> Pin<Box<dyn Future<Output = Result<(), String>>>>>;

/// Flat, case-sensitive, process-local map from function name to
/// implementation. Populated only on the worker side, before
/// `server::listen_and_serve` starts; nothing in this crate offers a way to
/// mutate a table once `listen_and_serve` has taken ownership of it.
#[derive(Default)]
pub struct FunctionTable {
    funcs: HashMap<String, RemoteFn>,
}

impl std::fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTable")
            .field("names", &self.funcs.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FunctionTable {
    pub fn new() -> FunctionTable {
        FunctionTable::default()
    }

    /// Register `f` under `name`. Overwrites any previous registration for
    /// the same name.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Port, Port) -> Fut + 'static,
        Fut: Future<Output = Result<(), String>> + 'static,
    {
        let f: RemoteFn = Rc::new(move |w, r| {
            Box::pin(f(w, r)) as Pin<Box<dyn Future<Output = Result<(), String>>>>
        });
        self.funcs.insert(name.into(), f);
    }

    /// Look up a function by name. Case-sensitive.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<RemoteFn> {
        self.funcs.get(name).cloned()
    }
}
