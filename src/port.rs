//! Synchronous, flow-controlled channel over a `MessagePort`.
//! SPDX-License-Identifier: Apache-2.0 OR GPL-3.0-or-later

use crate::config::SEND_WINDOW;
use crate::dupe::Dupe;
use crate::error::Error;
use crate::frame::Frame;
use bytes::Bytes;
use futures_util::future::poll_fn;
use futures_util::task::AtomicWaker;
use js_sys::Array;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::task::Poll;
use tracing::trace;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{DedicatedWorkerGlobalScope, MessageChannel, MessageEvent, MessagePort, Worker};

/// The three host objects that can stand on the other side of a
/// `postMessage` call: a `MessagePort`, a worker's own global scope (used
/// once, for the controlling port a worker listens on), or a `Worker`
/// handle (used once, for the controlling port the caller holds on a
/// worker it spawned).
enum Endpoint {
    Port(MessagePort),
    Global(DedicatedWorkerGlobalScope),
    Worker(Worker),
}

impl Endpoint {
    fn post_message(&self, data: &JsValue, transfer: &Array) -> Result<(), JsValue> {
        match self {
            Self::Port(p) => p.post_message_with_transferable(data, &transfer.clone().into()),
            Self::Global(g) => g.post_message_with_transfer(data, &transfer.clone().into()),
            Self::Worker(w) => w.post_message_with_transfer(data, &transfer.clone().into()),
        }
    }

    fn set_onmessage(&self, f: Option<&js_sys::Function>) {
        match self {
            Self::Port(p) => p.set_onmessage(f),
            Self::Global(g) => g.set_onmessage(f),
            Self::Worker(w) => w.set_onmessage(f),
        }
    }

    fn set_onerror(&self, f: Option<&js_sys::Function>) {
        match self {
            Self::Port(p) => p.set_onerror(f),
            Self::Global(g) => g.set_onerror(f),
            Self::Worker(w) => w.set_onerror(f),
        }
    }

    fn set_onmessageerror(&self, f: Option<&js_sys::Function>) {
        match self {
            Self::Port(p) => p.set_onmessageerror(f),
            Self::Global(g) => g.set_onmessageerror(f),
            Self::Worker(w) => w.set_onmessageerror(f),
        }
    }

    /// Release the underlying port. A no-op for a `Worker`/global scope,
    /// neither of which has an analogous handle to release (terminating
    /// the worker itself is `WorkerHandle`'s job, not the port's).
    fn close(&self) {
        if let Self::Port(p) = self {
            p.close();
        }
    }
}

struct PortState {
    raw: Endpoint,
    /// DATA/CALL frames that have arrived and not yet been handed to a
    /// caller of `read_message`/`read`.
    incoming: RefCell<VecDeque<Frame>>,
    /// At most one frame, put back here by `read` when the caller's buffer
    /// was too small for it. Already ACK'd; checked before `incoming`.
    pushback: RefCell<Option<Frame>>,
    /// Sticky, set at most once.
    err: Cell<Option<Error>>,
    /// Whether the single outstanding DATA/CALL frame we sent has been
    /// ACK'd yet.
    ack_ready: Cell<bool>,
    recv_waker: AtomicWaker,
    ack_waker: AtomicWaker,
    _onmessage: Closure<dyn FnMut(MessageEvent)>,
    _onerror: Closure<dyn FnMut(web_sys::Event)>,
    _onmessageerror: Closure<dyn FnMut(web_sys::Event)>,
}

impl std::fmt::Debug for PortState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortState")
            .field("err", &self.err.get())
            .field("ack_ready", &self.ack_ready.get())
            .finish_non_exhaustive()
    }
}

impl PortState {
    fn handle_message(&self, event: MessageEvent) {
        // Once `err` is set the port is closed from the local view; drop
        // anything still in flight from the peer.
        if self.err.get().is_some() {
            return;
        }
        let data = event.data();
        match Frame::from_js(&data) {
            Ok(Frame::Ack) => {
                self.ack_ready.set(true);
                self.ack_waker.wake();
            }
            Ok(Frame::Eof) => self.set_err_once(Error::EndOfStream),
            Ok(Frame::Err(msg)) => self.set_err_once(Error::User(msg)),
            Ok(frame) => {
                trace!("port: queued {frame:?}");
                self.incoming.borrow_mut().push_back(frame);
                self.recv_waker.wake();
            }
            Err(_) => self.set_err_once(Error::BadFrame),
        }
    }

    fn handle_error(&self, msg: String) {
        self.set_err_once(Error::Transport(msg));
    }

    fn set_err_once(&self, e: Error) {
        if self.err.get().is_none() {
            self.err.set(Some(e));
            self.recv_waker.wake();
            self.ack_waker.wake();
        }
    }

    fn send_ack(&self) {
        let (data, transfer) = Frame::Ack.into_js();
        if self.raw.post_message(&data, &transfer).is_err() {
            self.set_err_once(Error::Transport("failed to post ACK".into()));
        }
    }
}

impl Drop for PortState {
    // No GC finalizer available on a MessagePort wrapper here: detach the
    // handlers and release the host object regardless of how the port's
    // last reader or writer left `err`.
    fn drop(&mut self) {
        self.raw.set_onmessage(None);
        self.raw.set_onerror(None);
        self.raw.set_onmessageerror(None);
        self.raw.close();
    }
}

/// A framed, flow-controlled, byte-stream-capable handle on one end of a
/// `MessageChannel`. Cheaply [`Dupe`]-able: every handle shares the same
/// underlying queue, ACK credit, and sticky error, so duplicating a `Port`
/// does not duplicate the port itself (there is still exactly one
/// `MessagePort` and one pending-frame queue behind any number of handles).
pub struct Port {
    inner: Rc<PortState>,
}

impl std::fmt::Debug for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Port").field(&self.inner).finish()
    }
}

impl Dupe for Port {
    fn dupe(&self) -> Self {
        Port {
            inner: self.inner.dupe(),
        }
    }
}

impl Port {
    fn from_endpoint(raw: Endpoint) -> Port {
        let inner = Rc::new_cyclic(|weak: &Weak<PortState>| {
            let on_message_weak = weak.clone();
            let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
                if let Some(state) = on_message_weak.upgrade() {
                    state.handle_message(event);
                }
            });
            let on_error_weak = weak.clone();
            let onerror = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
                if let Some(state) = on_error_weak.upgrade() {
                    state.handle_error("transport error".to_string());
                }
            });
            let on_message_error_weak = weak.clone();
            let onmessageerror =
                Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
                    if let Some(state) = on_message_error_weak.upgrade() {
                        state.handle_error("message could not be deserialized".to_string());
                    }
                });

            raw.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
            raw.set_onerror(Some(onerror.as_ref().unchecked_ref()));
            raw.set_onmessageerror(Some(onmessageerror.as_ref().unchecked_ref()));

            PortState {
                raw,
                // The credit-1 protocol means the peer never has more than
                // `SEND_WINDOW` frames outstanding at once.
                incoming: RefCell::new(VecDeque::with_capacity(SEND_WINDOW as usize)),
                pushback: RefCell::new(None),
                err: Cell::new(None),
                ack_ready: Cell::new(false),
                recv_waker: AtomicWaker::new(),
                ack_waker: AtomicWaker::new(),
                _onmessage: onmessage,
                _onerror: onerror,
                _onmessageerror: onmessageerror,
            }
        });
        Port { inner }
    }

    /// Allocate a fresh bi-directional channel; returns the two ends.
    pub fn pipe() -> (Port, Port) {
        let channel = MessageChannel::new().expect("MessageChannel (this is a bug)");
        (Self::wrap(channel.port1()), Self::wrap(channel.port2()))
    }

    /// Wrap a `MessagePort` value received via transfer.
    pub fn wrap(raw: MessagePort) -> Port {
        Self::from_endpoint(Endpoint::Port(raw))
    }

    /// Wrap a worker's own global scope as its controlling port. Used once,
    /// by the server loop, on entry to `listen_and_serve`.
    pub fn wrap_global(raw: DedicatedWorkerGlobalScope) -> Port {
        Self::from_endpoint(Endpoint::Global(raw))
    }

    /// Wrap a freshly spawned `Worker` as the caller's controlling port
    /// onto it. Used once, by `WorkerHandle::spawn`.
    pub(crate) fn wrap_worker(raw: Worker) -> Port {
        Self::from_endpoint(Endpoint::Worker(raw))
    }

    /// Block until a DATA/CALL frame arrives, or a terminal condition sets
    /// `err`. Sends one ACK back to the peer after the frame is taken.
    pub async fn read_message(&self) -> Result<Frame, Error> {
        let state = &self.inner;
        poll_fn(|cx| {
            if let Some(frame) = state.pushback.borrow_mut().take() {
                return Poll::Ready(Ok(frame));
            }
            if let Some(frame) = state.incoming.borrow_mut().pop_front() {
                state.send_ack();
                return Poll::Ready(Ok(frame));
            }
            if let Some(e) = state.err.get() {
                return Poll::Ready(Err(e));
            }
            state.recv_waker.register(cx.waker());
            // Re-check after registering: `handle_message`/`set_err_once`
            // may have run between our first check and the registration.
            if let Some(frame) = state.incoming.borrow_mut().pop_front() {
                state.send_ack();
                return Poll::Ready(Ok(frame));
            }
            if let Some(e) = state.err.get() {
                return Poll::Ready(Err(e));
            }
            Poll::Pending
        })
        .await
    }

    /// Send one frame; block until the matching ACK arrives (for DATA/CALL)
    /// or return immediately (for ACK/EOF/ERR, which are never acknowledged).
    pub async fn write_message(&self, frame: Frame) -> Result<(), Error> {
        let state = &self.inner;
        if let Some(e) = state.err.get() {
            return Err(e);
        }
        let needs_ack = frame.needs_ack();
        let (data, transfer) = frame.into_js();
        if state.raw.post_message(&data, &transfer).is_err() {
            state.set_err_once(Error::Transport("failed to post message".into()));
            return Err(state.err.get().expect("just set"));
        }
        if !needs_ack {
            return Ok(());
        }
        state.ack_ready.set(false);
        poll_fn(|cx| {
            if state.ack_ready.get() {
                return Poll::Ready(Ok(()));
            }
            if let Some(e) = state.err.get() {
                return Poll::Ready(Err(e));
            }
            state.ack_waker.register(cx.waker());
            if state.ack_ready.get() {
                return Poll::Ready(Ok(()));
            }
            if let Some(e) = state.err.get() {
                return Poll::Ready(Err(e));
            }
            Poll::Pending
        })
        .await
    }

    /// Byte-stream view: consume the DATA payload of the next frame. If the
    /// frame is larger than `buf`, it is pushed back to the head of the
    /// queue (already ACK'd, so no second ACK is sent when it is retried)
    /// and `Error::ShortBuffer` is reported.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, Error> {
        match self.read_message().await? {
            Frame::Data(bytes) => {
                if bytes.len() > buf.len() {
                    *self.inner.pushback.borrow_mut() = Some(Frame::Data(bytes));
                    return Err(Error::ShortBuffer);
                }
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            _ => {
                self.inner.set_err_once(Error::BadFrame);
                Err(Error::BadFrame)
            }
        }
    }

    /// Wrap `buf` in a DATA frame and send it.
    pub async fn write(&self, buf: &[u8]) -> Result<usize, Error> {
        self.write_message(Frame::Data(Bytes::copy_from_slice(buf)))
            .await?;
        Ok(buf.len())
    }

    /// Send EOF, set local `err = ClosedPipe`, release the underlying port.
    /// Idempotent: a second call is a no-op.
    pub fn close(&self) {
        self.close_internal(None);
    }

    /// Send ERR(msg), set local `err = ClosedPipe`, release the underlying
    /// port. Idempotent: a second call is a no-op.
    pub fn close_with_error(&self, msg: impl Into<String>) {
        self.close_internal(Some(msg.into()));
    }

    fn close_internal(&self, msg: Option<String>) {
        let state = &self.inner;
        if state.err.get().is_some() {
            return;
        }
        let frame = match msg {
            None => Frame::Eof,
            Some(m) => Frame::Err(m),
        };
        let (data, transfer) = frame.into_js();
        let _ = state.raw.post_message(&data, &transfer);
        state.set_err_once(Error::ClosedPipe);
    }
}

#[cfg(test)]
mod tests {
    // `Port` cannot be constructed without a `MessageChannel`, so its
    // behavior is covered end-to-end in `tests/port.rs` under
    // `wasm-bindgen-test`.
}
