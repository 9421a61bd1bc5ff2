//! End-to-end `Port` behavior against a real `MessageChannel`. Exercises the
//! universal properties from the design notes that do not require spawning
//! a worker.
//! SPDX-License-Identifier: Apache-2.0 OR GPL-3.0-or-later
#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;
use wrpc::error::Error;
use wrpc::port::Port;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
async fn round_trip_preserves_bytes() {
    let (a, b) = Port::pipe();
    let sent = b"hello";
    a.write(sent).await.expect("write");
    let mut buf = [0u8; 16];
    let n = b.read(&mut buf).await.expect("read");
    assert_eq!(&buf[..n], sent);
}

#[wasm_bindgen_test]
async fn order_is_preserved_across_multiple_writes() {
    let (a, b) = Port::pipe();
    a.write(b"one").await.expect("write one");
    a.write(b"two").await.expect("write two");

    let mut buf = [0u8; 16];
    let n1 = b.read(&mut buf).await.expect("read one");
    assert_eq!(&buf[..n1], b"one");
    let n2 = b.read(&mut buf).await.expect("read two");
    assert_eq!(&buf[..n2], b"two");
}

#[wasm_bindgen_test]
async fn close_surfaces_end_of_stream_after_drain() {
    let (a, b) = Port::pipe();
    a.write(b"last").await.expect("write");
    a.close();

    let mut buf = [0u8; 16];
    let n = b.read(&mut buf).await.expect("drain buffered frame");
    assert_eq!(&buf[..n], b"last");

    match b.read(&mut buf).await {
        Err(Error::EndOfStream) => {}
        other => panic!("expected end-of-stream, got {other:?}"),
    }
}

#[wasm_bindgen_test]
async fn close_with_error_surfaces_user_error_after_drain() {
    let (a, b) = Port::pipe();
    a.write(b"buffered").await.expect("write");
    a.close_with_error("oops");

    let mut buf = [0u8; 16];
    let n = b.read(&mut buf).await.expect("drain buffered frame");
    assert_eq!(&buf[..n], b"buffered");

    match b.read(&mut buf).await {
        Err(Error::User(msg)) => assert_eq!(msg, "oops"),
        other => panic!("expected user-error, got {other:?}"),
    }
}

#[wasm_bindgen_test]
async fn error_is_sticky_once_set() {
    let (a, b) = Port::pipe();
    a.close_with_error("first");
    // A second close is a documented no-op; `err` must not change.
    a.close_with_error("second");

    let mut buf = [0u8; 16];
    match b.read(&mut buf).await {
        Err(Error::User(msg)) => assert_eq!(msg, "first"),
        other => panic!("expected the first error to stick, got {other:?}"),
    }
}

#[wasm_bindgen_test]
async fn oversized_frame_is_pushed_back_whole() {
    let (a, b) = Port::pipe();
    a.write(b"0123456789").await.expect("write 10 bytes");

    let mut small = [0u8; 4];
    assert!(matches!(b.read(&mut small).await, Err(Error::ShortBuffer)));

    let mut big = [0u8; 16];
    let n = b.read(&mut big).await.expect("retry with a large enough buffer");
    assert_eq!(&big[..n], b"0123456789");
}

#[wasm_bindgen_test]
async fn write_does_not_resolve_before_its_frame_is_acked() {
    use futures_util::FutureExt;

    let (a, b) = Port::pipe();
    a.write(b"first").await.expect("first write completes");

    let mut second = Box::pin(a.write(b"second"));
    // Polling once posts the frame and starts waiting on its ACK; nothing
    // on the other end has read it yet, so it must not resolve here.
    assert!(second.as_mut().now_or_never().is_none());

    let mut buf = [0u8; 16];
    let n = b.read(&mut buf).await.expect("read second");
    assert_eq!(&buf[..n], b"second");

    second.await.expect("write resolves once its frame is acked");
}

#[wasm_bindgen_test]
async fn two_independent_pipes_do_not_cross_talk() {
    let (a1, b1) = Port::pipe();
    let (a2, b2) = Port::pipe();

    a1.write(b"AAAA").await.expect("write to pipe 1");
    a2.write(b"BBBB").await.expect("write to pipe 2");

    let mut buf = [0u8; 16];
    let n1 = b1.read(&mut buf).await.expect("read pipe 1");
    assert_eq!(&buf[..n1], b"AAAA");
    let n2 = b2.read(&mut buf).await.expect("read pipe 2");
    assert_eq!(&buf[..n2], b"BBBB");
}
