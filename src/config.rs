//! Tunables shared by every module. These are compile-time defaults, not a
//! config file or environment parser; there is no persisted state anywhere
//! in this crate.
//! SPDX-License-Identifier: Apache-2.0 OR GPL-3.0-or-later

use std::time::Duration;

/// How long `WorkerHandle::spawn` waits for the initial readiness ACK
/// before giving up and returning a `transport-error`.
///
/// Chrome is known to take noticeably longer than Firefox to schedule a
/// freshly created worker's first task; the default leans toward the slower
/// browser rather than the faster one.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(3);

/// How long `WorkerHandle::invoke` waits for its `CALL` frame to be
/// acknowledged by the callee's server loop.
pub const CALL_ACK_TIMEOUT: Duration = Duration::from_secs(3);

/// The ACK-based back-pressure window is fixed at one outstanding
/// DATA/CALL frame. This is not configurable; it is named here so call
/// sites (`port.rs`'s incoming-queue capacity) read as "the window" rather
/// than a bare `1`.
pub const SEND_WINDOW: u8 = 1;
