// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Glue between a visible index range and a [`WindowedDataSource`].
//!
//! Computing the range from scroll geometry is left to a virtualization
//! controller such as `understory_virtual_list`; its `VisibleStrip` maps to
//! `strip.start..strip.end`. This module only slices the full dataset by that
//! range and pushes the result into [`WindowedDataSource::data_of_range`].

use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;
use core::ops::Range;

use tracing::trace;

use crate::{ReplayChannel, Rows, Subscription, WindowedDataSource};

/// Returns the rows of `rows` inside `range`, clamped to the collection.
///
/// `range.end` is clamped to `rows.len()` and `range.start` to the clamped end,
/// so out-of-bounds or inverted ranges yield an empty (or shortened) window.
///
/// ```
/// use understory_windowed_source::slice_window;
///
/// let rows = [10, 11, 12, 13];
/// assert_eq!(&*slice_window(&rows, 1..3), &[11, 12]);
/// assert_eq!(&*slice_window(&rows, 2..99), &[12, 13]);
/// assert!(slice_window(&rows, 5..9).is_empty());
/// ```
#[must_use]
pub fn slice_window<T: Clone>(rows: &[T], range: Range<usize>) -> Rows<T> {
    let end = range.end.min(rows.len());
    let start = range.start.min(end);
    Rc::from(&rows[start..end])
}

struct SlicerState<T> {
    rows: Option<Rows<T>>,
    range: Range<usize>,
}

impl<T: Clone> SlicerState<T> {
    fn window(&self) -> Option<Rows<T>> {
        self.rows
            .as_deref()
            .map(|rows| slice_window(rows, self.range.clone()))
    }
}

/// Keeps [`WindowedDataSource::data_of_range`] in sync with a visible index range.
///
/// The slicer listens to [`WindowedDataSource::data_to_render`]. Whenever the
/// full dataset arrives there, or the range changes through
/// [`set_range`](Self::set_range), it pushes the current window into
/// `data_of_range`.
///
/// ```
/// use understory_windowed_source::{WindowSlicer, WindowedDataSource};
///
/// let mut source = WindowedDataSource::<u32>::with_data((0..100).collect::<Vec<_>>());
/// let slicer = WindowSlicer::attach(&source, 0..3);
/// let rendered = source.connect();
/// assert_eq!(rendered.value().as_deref(), Some(&[0, 1, 2][..]));
///
/// slicer.set_range(50..52);
/// assert_eq!(rendered.value().as_deref(), Some(&[50, 51][..]));
/// ```
pub struct WindowSlicer<T> {
    state: Rc<RefCell<SlicerState<T>>>,
    target: ReplayChannel<Rows<T>>,
    subscription: Subscription,
}

impl<T: Clone + 'static> WindowSlicer<T> {
    /// Attaches to `source`, starting with the visible `range`.
    #[must_use]
    pub fn attach(source: &WindowedDataSource<T>, range: Range<usize>) -> Self {
        let state = Rc::new(RefCell::new(SlicerState { rows: None, range }));
        let target = source.data_of_range().clone();

        let listener_state = Rc::clone(&state);
        let listener_target = target.clone();
        let subscription = source
            .data_to_render()
            .subscribe(move |rows: &Rows<T>| {
                let window = {
                    let mut state = listener_state.borrow_mut();
                    state.rows = Some(Rc::clone(rows));
                    state.window()
                };
                if let Some(window) = window {
                    trace!(rows = rows.len(), window = window.len(), "data changed, re-slicing");
                    listener_target.push(window);
                }
            });

        Self {
            state,
            target,
            subscription,
        }
    }

    /// Current visible index range.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.state.borrow().range.clone()
    }

    /// Updates the visible index range, pushing a new window if it changed.
    pub fn set_range(&self, range: Range<usize>) {
        let window = {
            let mut state = self.state.borrow_mut();
            if state.range == range {
                return;
            }
            state.range = range;
            state.window()
        };
        if let Some(window) = window {
            trace!(window = window.len(), "range changed, re-slicing");
            self.target.push(window);
        }
    }

    /// Stops following the data source. Later range changes still update the
    /// stored range but only re-push the last known dataset.
    pub fn detach(&mut self) {
        self.subscription.unsubscribe();
    }

    /// Returns `true` while the slicer follows the data source.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        !self.subscription.is_closed()
    }
}

impl<T> fmt::Debug for WindowSlicer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("WindowSlicer")
            .field("range", &state.range)
            .field("rows", &state.rows.as_ref().map(|rows| rows.len()))
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}
