//! A spawned Web Worker plus the controlling port used to dispatch calls to
//! it.
//! SPDX-License-Identifier: Apache-2.0 OR GPL-3.0-or-later

use crate::config::{CALL_ACK_TIMEOUT, HANDSHAKE_TIMEOUT};
use crate::error::Error;
use crate::frame::Frame;
use crate::port::Port;
use futures_util::future::{select, Either};
use std::time::Duration;
use tracing::debug;
use wasm_bindgen::JsCast;
use web_sys::{MessagePort, Worker as JsWorker};

/// A worker process and the controlling port used to send it CALL frames.
#[derive(Debug)]
pub struct WorkerHandle {
    js_worker: JsWorker,
    port: Port,
}

impl WorkerHandle {
    /// Start a worker executing `script_url`, wrap its global postMessage
    /// surface as a controlling port, and block until the readiness
    /// handshake arrives. Returns `Error::Transport` if the worker does not
    /// become ready within [`HANDSHAKE_TIMEOUT`].
    pub async fn spawn(script_url: &str) -> Result<WorkerHandle, Error> {
        let js_worker = JsWorker::new(script_url)
            .map_err(|e| Error::Transport(format!("Worker constructor failed: {e:?}")))?;
        let port = Port::wrap_worker(js_worker.clone());

        match with_timeout(HANDSHAKE_TIMEOUT, port.read_message()).await {
            Some(Ok(Frame::Ready)) => {
                debug!("worker ready");
                Ok(WorkerHandle { js_worker, port })
            }
            Some(Ok(other)) => {
                js_worker.terminate();
                Err(Error::Transport(format!(
                    "expected readiness handshake, got {other:?}"
                )))
            }
            Some(Err(e)) => {
                js_worker.terminate();
                Err(e)
            }
            None => {
                js_worker.terminate();
                Err(Error::Transport("timed out waiting for worker to become ready".into()))
            }
        }
    }

    /// Send a CALL frame on the controlling port, transferring `w` (and `r`,
    /// unless `r` and `w` are the same port, in which case only `w` is
    /// transferred). Returns once the CALL frame has been ACK'd by the
    /// server loop.
    pub async fn invoke(&self, name: &str, w: MessagePort, r: MessagePort) -> Result<(), Error> {
        let frame = Frame::Call {
            name: name.to_string(),
            w,
            r,
        };
        match with_timeout(CALL_ACK_TIMEOUT, self.port.write_message(frame)).await {
            Some(result) => result,
            None => Err(Error::Transport("timed out waiting for CALL to be ACK'd".into())),
        }
    }

    /// Terminate the underlying worker immediately.
    pub fn close(&self) {
        self.js_worker.terminate();
    }
}

impl Drop for WorkerHandle {
    // A handle that becomes unreachable without an explicit `close()` still
    // tears down its worker.
    fn drop(&mut self) {
        self.js_worker.terminate();
    }
}

/// Race `fut` against a `setTimeout` of `duration`. `None` means the timer
/// won.
async fn with_timeout<F: std::future::Future>(duration: Duration, fut: F) -> Option<F::Output> {
    let timer = sleep(duration);
    futures_util::pin_mut!(fut);
    futures_util::pin_mut!(timer);
    match select(fut, timer).await {
        Either::Left((value, _)) => Some(value),
        Either::Right(((), _)) => None,
    }
}

/// `spawn` itself may run from the main page (the common case) or from a
/// worker wiring up a nested pipeline, so this cannot assume a `Window`
/// exists; `WorkerGlobalScope` exposes the same `setTimeout`.
async fn sleep(duration: Duration) {
    let ms = duration.as_millis().min(i32::MAX as u128) as i32;
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        if let Some(window) = web_sys::window() {
            window
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
                .expect("setTimeout (this is a bug)");
        } else {
            let scope: web_sys::WorkerGlobalScope = js_sys::global().unchecked_into();
            scope
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
                .expect("setTimeout (this is a bug)");
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}
