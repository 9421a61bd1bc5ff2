//! The wire envelope exchanged through a `Port`.
//! SPDX-License-Identifier: Apache-2.0 OR GPL-3.0-or-later

use crate::array::{array_buffer_to_bytes, bytes_to_array_buffer};
use crate::error::Error;
use bytes::Bytes;
use js_sys::{Array, Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::MessagePort;

/// One envelope on the wire. Exactly one of five shapes.
#[derive(Debug, Clone)]
pub enum Frame {
    /// `{ arr: ArrayBuffer }` — a chunk of the byte stream.
    Data(Bytes),
    /// `{ call, w, r }` — request to execute a named function. `w` is
    /// where the callee writes output, `r` is where it reads input; the
    /// two may be the same underlying port.
    Call {
        name: String,
        w: MessagePort,
        r: MessagePort,
    },
    /// `{ __ack: true }` — back-pressure credit.
    Ack,
    /// `{ __eof: true }` — sender closed cleanly.
    Eof,
    /// `{ __err: string }` — sender is aborting with this message.
    Err(String),
    /// `{}` — the worker's one-time readiness handshake. Not one of the
    /// five steady-state shapes; only ever sent once, worker to caller,
    /// right after the server loop attaches its message handler.
    Ready,
}

impl Frame {
    /// Build the `postMessage` payload and accompanying transfer list.
    pub fn into_js(self) -> (JsValue, Array) {
        let obj = Object::new();
        let transfer = Array::new();
        match self {
            Frame::Data(bytes) => {
                let arr = bytes_to_array_buffer(&bytes);
                Reflect::set(&obj, &"arr".into(), &arr).expect("set `arr` (this is a bug)");
                transfer.push(&arr);
            }
            Frame::Call { name, w, r } => {
                Reflect::set(&obj, &"call".into(), &name.into())
                    .expect("set `call` (this is a bug)");
                Reflect::set(&obj, &"w".into(), &w).expect("set `w` (this is a bug)");
                Reflect::set(&obj, &"r".into(), &r).expect("set `r` (this is a bug)");
                let same_port = Object::is(w.as_ref(), r.as_ref());
                transfer.push(&w);
                if !same_port {
                    transfer.push(&r);
                }
            }
            Frame::Ack => {
                Reflect::set(&obj, &"__ack".into(), &JsValue::TRUE)
                    .expect("set `__ack` (this is a bug)");
            }
            Frame::Eof => {
                Reflect::set(&obj, &"__eof".into(), &JsValue::TRUE)
                    .expect("set `__eof` (this is a bug)");
            }
            Frame::Err(msg) => {
                Reflect::set(&obj, &"__err".into(), &msg.into())
                    .expect("set `__err` (this is a bug)");
            }
            Frame::Ready => {}
        }
        (obj.into(), transfer)
    }

    /// Parse a `MessageEvent.data()` payload. Returns `Error::BadFrame` if
    /// no recognized tag is present, or a tagged field has the wrong type.
    pub fn from_js(data: &JsValue) -> Result<Frame, Error> {
        if let Some(arr) = get(data, "arr") {
            let buf = arr
                .dyn_into::<js_sys::ArrayBuffer>()
                .map_err(|_| Error::BadFrame)?;
            return Ok(Frame::Data(array_buffer_to_bytes(&buf)));
        }
        if let Some(call) = get(data, "call") {
            let name = call.as_string().ok_or(Error::BadFrame)?;
            let w: MessagePort = get(data, "w")
                .ok_or(Error::BadFrame)?
                .dyn_into()
                .map_err(|_| Error::BadFrame)?;
            let r: MessagePort = get(data, "r")
                .ok_or(Error::BadFrame)?
                .dyn_into()
                .map_err(|_| Error::BadFrame)?;
            return Ok(Frame::Call { name, w, r });
        }
        if get(data, "__ack").is_some() {
            return Ok(Frame::Ack);
        }
        if get(data, "__eof").is_some() {
            return Ok(Frame::Eof);
        }
        if let Some(err) = get(data, "__err") {
            let msg = err.as_string().ok_or(Error::BadFrame)?;
            return Ok(Frame::Err(msg));
        }
        if let Ok(obj) = data.clone().dyn_into::<Object>() {
            if Object::keys(&obj).length() == 0 {
                return Ok(Frame::Ready);
            }
        }
        Err(Error::BadFrame)
    }

    /// Whether this frame is terminal: EOF and ERR end the stream, no
    /// further frames may follow on that port.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Eof | Frame::Err(_))
    }

    /// Whether this frame consumes one unit of send credit and therefore
    /// must be acknowledged by the receiver. True for every frame that
    /// travels through the FIFO queue (DATA, CALL, and the one-time
    /// readiness handshake); false for ACK/EOF/ERR, which are posted
    /// directly and never themselves acknowledged.
    #[must_use]
    pub fn needs_ack(&self) -> bool {
        matches!(self, Frame::Data(_) | Frame::Call { .. } | Frame::Ready)
    }
}

fn get(data: &JsValue, key: &str) -> Option<JsValue> {
    let value = Reflect::get(data, &key.into()).ok()?;
    if value.is_undefined() {
        None
    } else {
        Some(value)
    }
}
