// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Replay-of-latest multicast channels.
//!
//! A [`ReplayChannel`] remembers the most recent value pushed into it. New
//! subscribers receive that value immediately on [`subscribe`](ReplayChannel::subscribe),
//! then every later push, synchronously and in registration order.
//!
//! ## Semantics
//!
//! - Delivery happens on the pushing call stack.
//! - Every subscriber observes values in the order they were pushed, so the
//!   last value a subscriber sees is always [`value`](ReplayChannel::value).
//! - A push made from a callback of the same channel updates the latest value
//!   right away but is queued; the outermost push delivers it once the current
//!   value has reached every subscriber.
//! - The subscriber list is snapshotted per delivered value. Subscribers added
//!   while a value is being delivered see it through replay only.
//! - A subscriber removed while a value is being delivered is not called for
//!   the rest of that delivery.
//! - Callbacks may push into other channels, subscribe, or unsubscribe.
//!
//! Clones of a [`ReplayChannel`] are handles to the same channel. Hand out an
//! [`Observable`] where consumers should only be able to listen.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use understory_windowed_source::ReplayChannel;
//!
//! let channel = ReplayChannel::with_value(1_u32);
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let sink = Rc::clone(&seen);
//! let _sub = channel.subscribe(move |v| sink.borrow_mut().push(*v));
//! channel.push(2);
//!
//! assert_eq!(*seen.borrow(), [1, 2]);
//! ```

use alloc::collections::VecDeque;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use smallvec::SmallVec;

use crate::Subscription;

type Callback<V> = Rc<dyn Fn(&V)>;

struct Entry<V> {
    id: u64,
    /// Sequence number of the latest value when this entry subscribed; it was
    /// replayed, so only later values are delivered.
    since: u64,
    callback: Callback<V>,
    active: Rc<Cell<bool>>,
}

struct Inner<V> {
    latest: Option<V>,
    seq: u64,
    entries: Vec<Entry<V>>,
    next_id: u64,
    delivering: bool,
    pending: VecDeque<(u64, V)>,
}

/// Clears the delivery state even if a callback unwinds.
struct DeliveryGuard<'a, V> {
    inner: &'a RefCell<Inner<V>>,
}

impl<V> Drop for DeliveryGuard<'_, V> {
    fn drop(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.delivering = false;
        inner.pending.clear();
    }
}

/// A multicast channel that replays its latest value to new subscribers.
pub struct ReplayChannel<V> {
    inner: Rc<RefCell<Inner<V>>>,
}

impl<V: Clone + 'static> ReplayChannel<V> {
    /// Creates a channel with no value; subscribers hear nothing until the first push.
    #[must_use]
    pub fn new() -> Self {
        Self::from_latest(None)
    }

    /// Creates a channel seeded with `value`, which is replayed to every new subscriber.
    #[must_use]
    pub fn with_value(value: V) -> Self {
        Self::from_latest(Some(value))
    }

    fn from_latest(latest: Option<V>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                latest,
                seq: 0,
                entries: Vec::new(),
                next_id: 0,
                delivering: false,
                pending: VecDeque::new(),
            })),
        }
    }

    /// Stores `value` as the latest and delivers it to every active subscriber.
    ///
    /// When called from one of this channel's own callbacks, the value becomes
    /// the latest immediately and is delivered after the current one.
    pub fn push(&self, value: V) {
        let seq = {
            let mut inner = self.inner.borrow_mut();
            inner.seq += 1;
            let seq = inner.seq;
            inner.latest = Some(value.clone());
            if inner.delivering {
                inner.pending.push_back((seq, value));
                return;
            }
            inner.delivering = true;
            seq
        };

        let _guard = DeliveryGuard { inner: &self.inner };
        let mut next = Some((seq, value));
        while let Some((seq, value)) = next {
            let snapshot: SmallVec<[(Callback<V>, Rc<Cell<bool>>); 4]> = self
                .inner
                .borrow()
                .entries
                .iter()
                .filter(|entry| entry.since < seq)
                .map(|entry| (Rc::clone(&entry.callback), Rc::clone(&entry.active)))
                .collect();
            for (callback, active) in snapshot {
                if active.get() {
                    callback(&value);
                }
            }
            next = self.inner.borrow_mut().pending.pop_front();
        }
    }

    /// Registers `callback`, replays the latest value to it, and returns its handle.
    pub fn subscribe(&self, callback: impl Fn(&V) + 'static) -> Subscription {
        let callback: Callback<V> = Rc::new(callback);
        let active = Rc::new(Cell::new(true));
        let (id, latest) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            let since = inner.seq;
            inner.entries.push(Entry {
                id,
                since,
                callback: Rc::clone(&callback),
                active: Rc::clone(&active),
            });
            (id, inner.latest.clone())
        };

        let weak: Weak<RefCell<Inner<V>>> = Rc::downgrade(&self.inner);
        let subscription = Subscription::new(move || {
            active.set(false);
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().entries.retain(|entry| entry.id != id);
            }
        });

        if let Some(latest) = latest {
            callback(&latest);
        }
        subscription
    }

    /// Returns a clone of the latest value, if any has been pushed or seeded.
    #[must_use]
    pub fn value(&self) -> Option<V> {
        self.inner.borrow().latest.clone()
    }

    /// Returns `true` if a value has been pushed or seeded.
    #[must_use]
    pub fn has_value(&self) -> bool {
        self.inner.borrow().latest.is_some()
    }

    /// Number of currently registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Returns a listen-only view of this channel.
    #[must_use]
    pub fn observable(&self) -> Observable<V> {
        Observable {
            channel: self.clone(),
        }
    }

    /// Returns `true` if both handles refer to the same channel.
    #[must_use]
    pub fn same_channel(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<V: Clone + 'static> Default for ReplayChannel<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for ReplayChannel<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for ReplayChannel<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ReplayChannel")
            .field("has_value", &inner.latest.is_some())
            .field("subscribers", &inner.entries.len())
            .finish_non_exhaustive()
    }
}

/// Listen-only view of a [`ReplayChannel`].
///
/// This is what a data source hands to its rendering host: the host can
/// subscribe and read the latest value but cannot push.
pub struct Observable<V> {
    channel: ReplayChannel<V>,
}

impl<V: Clone + 'static> Observable<V> {
    /// See [`ReplayChannel::subscribe`].
    pub fn subscribe(&self, callback: impl Fn(&V) + 'static) -> Subscription {
        self.channel.subscribe(callback)
    }

    /// See [`ReplayChannel::value`].
    #[must_use]
    pub fn value(&self) -> Option<V> {
        self.channel.value()
    }

    /// See [`ReplayChannel::subscriber_count`].
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.channel.subscriber_count()
    }

    /// Returns `true` if both views observe the same channel.
    #[must_use]
    pub fn same_channel(&self, other: &Self) -> bool {
        self.channel.same_channel(&other.channel)
    }
}

impl<V> Clone for Observable<V> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

impl<V> fmt::Debug for Observable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
