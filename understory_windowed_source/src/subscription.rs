// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cancellation handles for channel subscriptions.
//!
//! A [`Subscription`] owns a single teardown action. A [`CompositeSubscription`]
//! groups several of them so they can be released together, in insertion order,
//! exactly once.

use alloc::boxed::Box;
use core::fmt;

use smallvec::SmallVec;

/// Handle to an active registration on a [`ReplayChannel`](crate::ReplayChannel).
///
/// Dropping the handle unsubscribes. Use [`Subscription::detach`] to keep the
/// callback registered for as long as the channel lives.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Creates a handle that runs `teardown` when unsubscribed.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// Returns a handle that is already closed.
    pub fn empty() -> Self {
        Self { teardown: None }
    }

    /// Runs the teardown action. Calling this again is a no-op.
    pub fn unsubscribe(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }

    /// Returns `true` once the teardown action has run (or was never set).
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.teardown.is_none()
    }

    /// Consumes the handle without tearing anything down.
    pub fn detach(mut self) {
        self.teardown = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// An ordered bag of [`Subscription`]s released as a unit.
///
/// Once [`unsubscribe`](Self::unsubscribe) has run the bag stays closed:
/// anything added afterwards is torn down on the spot.
#[derive(Default)]
#[must_use = "dropping a CompositeSubscription unsubscribes everything it holds"]
pub struct CompositeSubscription {
    entries: SmallVec<[Subscription; 2]>,
    closed: bool,
}

impl CompositeSubscription {
    /// Creates an empty, open bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `subscription` to the bag.
    pub fn add(&mut self, mut subscription: Subscription) {
        if self.closed {
            subscription.unsubscribe();
        } else {
            self.entries.push(subscription);
        }
    }

    /// Tears down every held subscription in insertion order.
    pub fn unsubscribe(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for mut entry in self.entries.drain(..) {
            entry.unsubscribe();
        }
    }

    /// Number of subscriptions currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the bag holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` once the bag has been disposed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for CompositeSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for CompositeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeSubscription")
            .field("entries", &self.entries)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
