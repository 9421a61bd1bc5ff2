//! Error taxonomy. Every fallible operation in this crate returns one of
//! these variants; there is no `anyhow`/`Box<dyn Error>` at a public
//! boundary.
//! SPDX-License-Identifier: Apache-2.0 OR GPL-3.0-or-later

use thiserror::Error;

/// Errors surfaced through the `Port` API and everything built on top of it.
#[derive(Debug, Error, Clone)]
pub enum Error {
    /// The peer sent `EOF`. Normal termination of a read side.
    #[error("end of stream")]
    EndOfStream,

    /// The local side already called `close`/`close_with_error`; the port
    /// is unusable from now on.
    #[error("closed pipe")]
    ClosedPipe,

    /// `onerror`/`onmessageerror` fired on the underlying `MessagePort`, or
    /// a worker failed to become ready within its handshake timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer sent `ERR(msg)`.
    #[error("{0}")]
    User(String),

    /// The caller's read buffer was smaller than the next `DATA` frame; the
    /// frame was pushed back to the head of the queue and can be retried
    /// with a larger buffer.
    #[error("buffer too short for next frame")]
    ShortBuffer,

    /// A `DATA` read was attempted but the frame did not carry an `arr`
    /// field, or an incoming envelope matched none of the five frame
    /// shapes. Protocol violation; the port is closed.
    #[error("malformed frame")]
    BadFrame,

    /// Server-side only: a `CALL` frame named a function absent from the
    /// registry. The server loop turns this into an `Err` frame on the
    /// call's output port rather than hanging the caller (see
    /// `server::listen_and_serve`); a `Port` caller never sees this variant
    /// directly.
    #[error("function not found: {0}")]
    FunctionNotFound(String),
}

impl Error {
    /// Whether this error still allows the caller to make a decision, as
    /// opposed to meaning the port is permanently unusable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EndOfStream | Self::User(_) | Self::ShortBuffer)
    }
}
