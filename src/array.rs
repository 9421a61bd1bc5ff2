//! Byte <-> typed-array conversions at the JS boundary. Every DATA payload
//! crosses the `postMessage` boundary as an `ArrayBuffer`, but is only ever
//! handled as `bytes::Bytes` on the Rust side of that boundary.
//! SPDX-License-Identifier: Apache-2.0 OR GPL-3.0-or-later

use bytes::Bytes;
use js_sys::{ArrayBuffer, Uint8Array};

/// Copy `b` into a freshly allocated `ArrayBuffer`, suitable for use as a
/// transferable in a `postMessage` call.
pub fn bytes_to_array_buffer(b: &[u8]) -> ArrayBuffer {
    let view = Uint8Array::new_with_length(b.len() as u32);
    view.copy_from(b);
    view.buffer()
}

/// Copy the contents of `buf` out into an owned `Bytes`.
///
/// `ArrayBuffer`s arriving via `postMessage` are detached from the sender
/// (transfer semantics) by the time we see them, so this is always a copy
/// out of wasm-linear-memory-external storage, never a reinterpretation of
/// an existing Rust allocation.
pub fn array_buffer_to_bytes(buf: &ArrayBuffer) -> Bytes {
    let view = Uint8Array::new(buf);
    let mut out = vec![0u8; view.length() as usize];
    view.copy_to(&mut out);
    Bytes::from(out)
}

#[cfg(test)]
mod tests {
    // `ArrayBuffer`/`Uint8Array` require a JS engine, so round-trip coverage
    // for these two functions lives in `tests/port.rs` under
    // `wasm-bindgen-test` rather than here.
}
