//! The dispatch loop that runs inside each worker.
//! SPDX-License-Identifier: Apache-2.0 OR GPL-3.0-or-later

use crate::dupe::Dupe;
use crate::error::Error;
use crate::frame::Frame;
use crate::port::Port;
use crate::registry::FunctionTable;
use tracing::{error, warn};
use web_sys::DedicatedWorkerGlobalScope;

/// Wrap the worker's global message surface as a Port, emit the initial
/// readiness frame, then dispatch CALL frames against `funcs` one at a
/// time until a transport error or EOF terminates the controlling port.
///
/// `funcs` must already hold every function this worker will ever serve:
/// there is no way to register more once this call has taken ownership of
/// the table.
pub async fn listen_and_serve(
    funcs: FunctionTable,
    global: DedicatedWorkerGlobalScope,
) -> Result<(), Error> {
    let control = Port::wrap_global(global);
    control.write_message(Frame::Ready).await?;

    loop {
        match control.read_message().await {
            Ok(Frame::Call { name, w, r }) => {
                dispatch(&funcs, &name, Port::wrap(w), Port::wrap(r)).await;
            }
            Ok(other) => {
                warn!("server: ignoring frame that is not a call: {other:?}");
            }
            Err(Error::EndOfStream) => return Ok(()),
            Err(e) => {
                error!("server: controlling port failed: {e}");
                return Err(e);
            }
        }
    }
}

/// Run one call to completion and close its output port accordingly.
/// Never propagates a function's error up to the controlling port's loop:
/// per-call failures are local to that call's output port.
async fn dispatch(funcs: &FunctionTable, name: &str, w: Port, r: Port) {
    let Some(f) = funcs.get(name) else {
        warn!("server: call for unregistered function {name:?}");
        w.close_with_error(Error::FunctionNotFound(name.to_string()).to_string());
        return;
    };
    match f(w.dupe(), r).await {
        Ok(()) => w.close(),
        Err(msg) => w.close_with_error(msg),
    }
}

#[cfg(test)]
mod tests {
    // `listen_and_serve` needs a live `DedicatedWorkerGlobalScope`, which
    // only exists inside a real worker; the dispatch loop it drives is
    // exercised indirectly by `tests/pipeline.rs` and `tests/worker.rs`
    // (a `WorkerHandle` talking to a protocol-correct JS peer), and
    // `FunctionTable::get`'s lookup semantics are covered directly in
    // `registry.rs`.
}
