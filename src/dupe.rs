//! A cheap, explicit alternative to `Clone` for reference-counted handles.
//! SPDX-License-Identifier: Apache-2.0 OR GPL-3.0-or-later

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

/// Marks a type whose `Clone` impl is O(1) (bumping a refcount, copying a
/// small `Copy` value). Distinguishing `dupe()` from `clone()` lets a reader
/// tell at the call site whether a clone is expected to be cheap without
/// having to go check the type definition.
pub trait Dupe {
    fn dupe(&self) -> Self;
}

impl<T> Dupe for Rc<T> {
    #[inline]
    fn dupe(&self) -> Self {
        Rc::clone(self)
    }
}

impl<T> Dupe for Arc<T> {
    #[inline]
    fn dupe(&self) -> Self {
        Arc::clone(self)
    }
}

impl<T: Copy> Dupe for Cell<T> {
    #[inline]
    fn dupe(&self) -> Self {
        Cell::new(self.get())
    }
}

impl<T: Dupe> Dupe for Option<T> {
    #[inline]
    fn dupe(&self) -> Self {
        self.as_ref().map(Dupe::dupe)
    }
}

impl Dupe for web_sys::MessagePort {
    #[inline]
    fn dupe(&self) -> Self {
        self.clone()
    }
}
