//! wRPC: an in-browser remote-procedure-call runtime that turns a pool of
//! Web Worker threads into a mesh of stream-oriented compute nodes.
//!
//! A program compiled for the browser runs either as the main page or as a
//! worker. [`call`] lets either side invoke a named function on a pooled
//! worker, with the caller and callee connected by a pair of byte streams.
//! Multiple names chain into a pipeline whose stages run concurrently
//! across workers. Inside a worker, [`register`] a function and then run
//! [`listen_and_serve`] to start accepting calls.
//! SPDX-License-Identifier: Apache-2.0 OR GPL-3.0-or-later
#![warn(missing_docs, missing_debug_implementations)]
#![forbid(unsafe_code)]

pub mod array;
pub mod config;
pub mod dupe;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod pool;
pub mod port;
pub mod registry;
pub mod server;
pub mod worker;

use dupe::Dupe;
use registry::FunctionTable;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys::DedicatedWorkerGlobalScope;

pub use error::Error;
pub use port::Port;
pub use pool::WorkerPool;
pub use registry::RemoteFn;
pub use worker::WorkerHandle;

thread_local! {
    static FUNCTIONS: RefCell<FunctionTable> = RefCell::new(FunctionTable::new());
    static POOLS: RefCell<HashMap<String, Rc<WorkerPool>>> = RefCell::new(HashMap::new());
}

/// Register a function under `name`, to be served once [`listen_and_serve`]
/// runs. Must be called before `listen_and_serve`; the name space is flat,
/// case-sensitive, and process-local.
pub fn register<F, Fut>(name: impl Into<String>, f: F)
where
    F: Fn(Port, Port) -> Fut + 'static,
    Fut: Future<Output = Result<(), String>> + 'static,
{
    FUNCTIONS.with(|table| table.borrow_mut().register(name, f));
}

/// Wrap this worker's global scope as its controlling port, emit the
/// readiness handshake, and dispatch calls against every function
/// registered so far. Must be called from inside a worker.
pub async fn listen_and_serve() -> Result<(), Error> {
    let funcs = FUNCTIONS.with(|table| std::mem::take(&mut *table.borrow_mut()));
    let global: DedicatedWorkerGlobalScope = js_sys::global().dyn_into().map_err(|_| {
        Error::Transport("listen_and_serve called outside a dedicated worker".into())
    })?;
    server::listen_and_serve(funcs, global).await
}

/// Chain `names` into one logical duplex stream, spawning or reusing
/// workers (one per distinct `worker_script_url`) from a process-wide pool.
/// See [`pipeline::call`] for the full contract.
pub async fn call(worker_script_url: &str, names: &[&str]) -> Result<(Port, Port), Error> {
    let pool = POOLS.with(|pools| {
        pools
            .borrow_mut()
            .entry(worker_script_url.to_string())
            .or_insert_with(|| Rc::new(WorkerPool::new(worker_script_url)))
            .dupe()
    });
    pipeline::call(&pool, names).await
}

/// Install a `tracing` subscriber that renders events to the browser
/// console, and report Rust panics there too. Call once, as early as
/// possible, from both the main page and every worker. A no-op unless the
/// `console-logging` feature is enabled, so a host application that wants
/// its own subscriber can disable the default feature instead.
#[cfg(feature = "console-logging")]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}
