//! Chains N named calls into one logical duplex stream.
//! SPDX-License-Identifier: Apache-2.0 OR GPL-3.0-or-later

use crate::error::Error;
use crate::pool::WorkerPool;
use crate::port::Port;
use tracing::debug;
use web_sys::{MessageChannel, MessagePort};

/// Acquire a worker per name in `names` and wire
/// `input -> stage_1 -> stage_2 -> ... -> stage_n -> output`, transferring
/// one port of each intermediate pair into the worker that produced it and
/// the other into the worker (or caller) that consumes it.
///
/// Returns `(output, input)`: write request bytes to `input`, read response
/// bytes from `output`.
///
/// Stages are issued strictly in order: stage *i*'s CALL is ACK'd before
/// stage *i+1*'s is issued, because stage *i+1* is given a port whose other
/// end was transferred away as part of stage *i*'s invocation. Issuing them
/// out of order would make that port unavailable.
pub async fn call(pool: &WorkerPool, names: &[&str]) -> Result<(Port, Port), Error> {
    let first_pair = MessageChannel::new().expect("MessageChannel (this is a bug)");
    let w0 = Port::wrap(first_pair.port1());
    let mut current_r: MessagePort = first_pair.port2();

    if names.is_empty() {
        // No stage exists to consume `current_r`; close the write side so
        // the caller's read side observes a drained, closed pipe rather
        // than hanging forever.
        w0.close();
        return Ok((Port::wrap(current_r), w0));
    }

    for (i, &name) in names.iter().enumerate() {
        let pair = MessageChannel::new().expect("MessageChannel (this is a bug)");
        let stage_out = pair.port1();
        let stage_in = pair.port2();

        let worker = pool.get().await?;
        if let Err(e) = worker.invoke(name, stage_out, current_r).await {
            worker.close();
            return Err(e);
        }
        debug!("pipeline: wired stage {i} ({name})");
        pool.put(worker);

        current_r = stage_in;
    }

    Ok((Port::wrap(current_r), w0))
}
