//! Helper for building an inline worker script as a `blob:` URL, so tests
//! can spawn a small hand-written JS peer that speaks the wire protocol
//! directly, without a second compiled wasm binary.
//! SPDX-License-Identifier: Apache-2.0 OR GPL-3.0-or-later
#![cfg(target_arch = "wasm32")]

use js_sys::Array;
use wasm_bindgen::JsValue;
use web_sys::{Blob, BlobPropertyBag, Url};

/// Turn a JS source string into a `blob:` URL usable as a `Worker` script.
pub fn blob_worker_url(source: &str) -> String {
    let parts = Array::new();
    parts.push(&JsValue::from_str(source));
    let mut options = BlobPropertyBag::new();
    options.type_("application/javascript");
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options)
        .expect("Blob::new (this is a bug)");
    Url::create_object_url_with_blob(&blob).expect("createObjectURL (this is a bug)")
}

/// A worker that posts the readiness handshake immediately, ACKs every
/// DATA/CALL frame it receives (without inspecting its contents beyond what
/// is needed to ACK), and otherwise does nothing — enough to exercise
/// `WorkerHandle::spawn`/`invoke` against a protocol-correct peer.
pub const ACK_ONLY_WORKER: &str = r#"
self.postMessage({});
self.onmessage = (ev) => {
  const d = ev.data;
  if (d && (d.arr !== undefined || d.call !== undefined)) {
    self.postMessage({ __ack: true });
  }
};
"#;

/// A worker that, on receiving exactly one `CALL` frame, copies every DATA
/// frame read from `r` back out through `w` until `r` sends EOF, then closes
/// `w` the same way — a hand-written JS stand-in for the `echo` function
/// used in end-to-end pipeline tests.
pub const ECHO_CALL_WORKER: &str = r#"
self.postMessage({});
self.onmessage = (outerEv) => {
  const d = outerEv.data;
  if (!(d && d.call !== undefined)) {
    if (d && (d.arr !== undefined)) self.postMessage({ __ack: true });
    return;
  }
  self.postMessage({ __ack: true });
  const w = d.w;
  const r = d.r;
  r.onmessage = (ev) => {
    const msg = ev.data;
    if (msg.arr !== undefined) {
      r.postMessage({ __ack: true });
      w.postMessage({ arr: msg.arr }, [msg.arr]);
    } else if (msg.__eof !== undefined) {
      w.postMessage({ __eof: true });
    } else if (msg.__err !== undefined) {
      w.postMessage({ __err: msg.__err });
    }
  };
};
"#;

/// A worker that dispatches on the `CALL` name between `upper` and
/// `reverse`, processing each DATA frame a line at a time and appending a
/// trailing newline to every transformed line — a hand-written JS stand-in
/// for the line-oriented `upperCaseWorker`/`reverseWorker` pair used to
/// test a multi-stage pipeline.
pub const LINE_TRANSFORM_WORKER: &str = r#"
self.postMessage({});
self.onmessage = (outerEv) => {
  const d = outerEv.data;
  if (!(d && d.call !== undefined)) {
    if (d && (d.arr !== undefined)) self.postMessage({ __ack: true });
    return;
  }
  self.postMessage({ __ack: true });
  const name = d.call;
  const w = d.w;
  const r = d.r;
  const decoder = new TextDecoder();
  const encoder = new TextEncoder();
  let pending = "";

  function transform(line) {
    if (name === "upper") return line.toUpperCase();
    if (name === "reverse") return line.split("").reverse().join("");
    return line;
  }

  function emit(line) {
    const out = encoder.encode(transform(line) + "\n");
    w.postMessage({ arr: out.buffer }, [out.buffer]);
  }

  r.onmessage = (ev) => {
    const msg = ev.data;
    if (msg.arr !== undefined) {
      r.postMessage({ __ack: true });
      pending += decoder.decode(msg.arr, { stream: true });
      const lines = pending.split("\n");
      pending = lines.pop();
      for (const line of lines) emit(line);
    } else if (msg.__eof !== undefined) {
      if (pending.length > 0) {
        emit(pending);
        pending = "";
      }
      w.postMessage({ __eof: true });
    } else if (msg.__err !== undefined) {
      w.postMessage({ __err: msg.__err });
    }
  };
};
"#;

/// A worker that, on receiving a `CALL` frame (regardless of name), sends
/// `__err` immediately — a hand-written JS stand-in for a registered
/// function returning an error, and for `server::dispatch`'s own
/// unregistered-function path, both of which use the same
/// `CloseWithError`-on-`w` mechanism on the caller's side of the wire.
pub const ERR_CALL_WORKER: &str = r#"
self.postMessage({});
self.onmessage = (ev) => {
  const d = ev.data;
  if (!(d && d.call !== undefined)) {
    if (d && (d.arr !== undefined)) self.postMessage({ __ack: true });
    return;
  }
  self.postMessage({ __ack: true });
  d.w.postMessage({ __err: "oops" });
};
"#;
