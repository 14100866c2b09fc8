// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The windowed data source and the capability trait table hosts drive.

use alloc::rc::Rc;
use core::cell::OnceCell;
use core::fmt;

use tracing::{debug, trace};

use crate::{CompositeSubscription, Observable, ReplayChannel};

/// An immutable snapshot of rows. Collections are replaced wholesale, never patched.
pub type Rows<T> = Rc<[T]>;

/// Capabilities a virtualized table host expects from its data source.
///
/// The host calls [`connect`](Self::connect) once when it mounts and renders
/// whatever the returned [`Observable`] emits. It calls
/// [`disconnect`](Self::disconnect) once when it unmounts. Owner code uses
/// [`data`](Self::data) and [`set_data`](Self::set_data) to read and replace
/// the full collection.
pub trait DataSource<T> {
    /// Wires the source (if not already wired) and returns the rows to render.
    fn connect(&mut self) -> Observable<Rows<T>>;

    /// Releases the wiring established by [`connect`](Self::connect). No-op when
    /// already disconnected.
    fn disconnect(&mut self);

    /// Returns the current full row collection.
    fn data(&self) -> Rows<T>;

    /// Replaces the full row collection.
    fn set_data(&mut self, rows: Rows<T>);
}

struct Streams<T> {
    data_to_render: ReplayChannel<Rows<T>>,
    data_of_range: ReplayChannel<Rows<T>>,
}

/// A data source that feeds a table only the rows inside the visible window.
///
/// Two change sources stay independent:
///
/// - Replacing the full collection via [`set_data`](Self::set_data) is
///   forwarded to [`data_to_render`](Self::data_to_render), where range
///   trackers and transformation stages (filtering, sorting, paging) listen.
/// - Whatever is pushed into [`data_of_range`](Self::data_of_range) becomes
///   the render output returned by [`DataSource::connect`].
///
/// Setting data alone does not change the render output; something must
/// re-slice and push into `data_of_range` in response. See
/// [`WindowSlicer`](crate::WindowSlicer) for the usual way to do that.
///
/// The two public channels are created once and persist across
/// `disconnect`/`connect` cycles, as does the render output, so subscribers
/// keep their identity. While disconnected, pushes into `data_of_range` do not
/// reach the render output and data replacements do not reach
/// `data_to_render`. Reconnecting replays the latest value of each input.
pub struct WindowedDataSource<T> {
    rows: Rows<T>,
    data: ReplayChannel<Rows<T>>,
    render_data: ReplayChannel<Rows<T>>,
    streams: OnceCell<Streams<T>>,
    render_changes: Option<CompositeSubscription>,
}

impl<T: 'static> WindowedDataSource<T> {
    /// Creates a source with no rows.
    #[must_use]
    pub fn new() -> Self {
        Self::with_data(Rows::<T>::default())
    }

    /// Creates a source holding `initial` and wires its channels.
    #[must_use]
    pub fn with_data(initial: impl Into<Rows<T>>) -> Self {
        let rows = initial.into();
        let mut source = Self {
            data: ReplayChannel::with_value(Rc::clone(&rows)),
            rows,
            render_data: ReplayChannel::with_value(Rows::default()),
            streams: OnceCell::new(),
            render_changes: None,
        };
        source.update_change_subscription();
        source
    }

    /// Returns the current full row collection.
    #[must_use]
    pub fn data(&self) -> Rows<T> {
        Rc::clone(&self.rows)
    }

    /// Replaces the full row collection and notifies the raw data channel.
    ///
    /// No validation of row contents is performed.
    pub fn set_data(&mut self, rows: impl Into<Rows<T>>) {
        let rows = rows.into();
        trace!(len = rows.len(), "replacing data");
        self.rows = Rc::clone(&rows);
        self.data.push(rows);
    }

    /// Channel carrying the full dataset, forwarded from [`set_data`](Self::set_data)
    /// while connected.
    pub fn data_to_render(&self) -> &ReplayChannel<Rows<T>> {
        &self.streams().data_to_render
    }

    /// Channel the range tracker pushes the visible subset into.
    pub fn data_of_range(&self) -> &ReplayChannel<Rows<T>> {
        &self.streams().data_of_range
    }

    /// Returns `true` once the public channels have been created.
    #[must_use]
    pub fn streams_ready(&self) -> bool {
        self.streams.get().is_some()
    }

    /// Returns `true` while the render wiring is active.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.render_changes.is_some()
    }

    /// Latest render output.
    #[must_use]
    pub fn render_value(&self) -> Rows<T> {
        self.render_data.value().unwrap_or_default()
    }

    /// Wires the source if needed and returns the render output.
    pub fn connect(&mut self) -> Observable<Rows<T>> {
        if self.render_changes.is_none() {
            self.update_change_subscription();
        }
        self.render_data.observable()
    }

    /// Releases the render wiring, if any.
    pub fn disconnect(&mut self) {
        if let Some(mut wiring) = self.render_changes.take() {
            wiring.unsubscribe();
            debug!("render wiring released");
        }
    }

    fn streams(&self) -> &Streams<T> {
        self.streams.get_or_init(|| Streams {
            data_to_render: ReplayChannel::new(),
            data_of_range: ReplayChannel::new(),
        })
    }

    fn update_change_subscription(&mut self) {
        let (to_render, of_range) = {
            let streams = self.streams();
            (
                streams.data_to_render.clone(),
                streams.data_of_range.clone(),
            )
        };

        let mut wiring = CompositeSubscription::new();
        wiring.add(
            self.data
                .subscribe(move |rows: &Rows<T>| to_render.push(Rc::clone(rows))),
        );
        let render = self.render_data.clone();
        wiring.add(of_range.subscribe(move |rows: &Rows<T>| render.push(Rc::clone(rows))));
        self.render_changes = Some(wiring);
        debug!(rows = self.rows.len(), "render wiring established");
    }
}

impl<T: 'static> Default for WindowedDataSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> DataSource<T> for WindowedDataSource<T> {
    fn connect(&mut self) -> Observable<Rows<T>> {
        Self::connect(self)
    }

    fn disconnect(&mut self) {
        Self::disconnect(self);
    }

    fn data(&self) -> Rows<T> {
        Self::data(self)
    }

    fn set_data(&mut self, rows: Rows<T>) {
        Self::set_data(self, rows);
    }
}

impl<T> fmt::Debug for WindowedDataSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowedDataSource")
            .field("rows", &self.rows.len())
            .field("streams_ready", &self.streams.get().is_some())
            .field("connected", &self.render_changes.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use super::{DataSource, Rows, WindowedDataSource};
    use crate::{Observable, Subscription};

    type Log = Rc<RefCell<Vec<Vec<char>>>>;

    fn observe(view: &Observable<Rows<char>>) -> (Log, Subscription) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let sub = view.subscribe(move |rows: &Rows<char>| sink.borrow_mut().push(rows.to_vec()));
        (log, sub)
    }

    #[test]
    fn data_round_trips_before_connect() {
        let mut source = WindowedDataSource::<i32>::new();
        source.set_data(vec![1, 2, 3]);
        assert_eq!(&*source.data(), &[1, 2, 3]);

        source.set_data(Vec::<i32>::new());
        assert!(source.data().is_empty());
    }

    #[test]
    fn empty_source_replays_empty_render_output() {
        let mut source = WindowedDataSource::<char>::new();
        let view = source.connect();
        let (log, _sub) = observe(&view);
        assert_eq!(*log.borrow(), [Vec::<char>::new()]);
    }

    #[test]
    fn channels_are_ready_and_wired_after_construction() {
        let source = WindowedDataSource::<char>::with_data(vec!['a']);
        assert!(source.streams_ready());
        assert!(source.is_connected());
        assert_eq!(source.data_to_render().value().as_deref(), Some(&['a'][..]));
        assert!(!source.data_of_range().has_value());
    }

    #[test]
    fn connecting_twice_does_not_duplicate_emissions() {
        let mut source = WindowedDataSource::<char>::with_data(vec!['a', 'b']);
        let first = source.connect();
        let second = source.connect();
        assert!(first.same_channel(&second));
        assert_eq!(source.data_of_range().subscriber_count(), 1);

        let (log, _sub) = observe(&second);
        source.data_of_range().push(Rc::from(vec!['a']));
        assert_eq!(*log.borrow(), [vec![], vec!['a']]);
    }

    #[test]
    fn range_push_reaches_current_and_later_subscribers() {
        let mut source = WindowedDataSource::<char>::with_data(vec!['a', 'b', 'c']);
        let view = source.connect();
        let (early, _early_sub) = observe(&view);

        source.data_of_range().push(Rc::from(vec!['b', 'c']));
        let (late, _late_sub) = observe(&view);

        assert_eq!(early.borrow().last(), Some(&vec!['b', 'c']));
        assert_eq!(*late.borrow(), [vec!['b', 'c']]);
        assert_eq!(&*source.render_value(), &['b', 'c']);
    }

    #[test]
    fn setting_data_does_not_touch_render_output() {
        let mut source = WindowedDataSource::<char>::with_data(vec!['a', 'b', 'c']);
        let view = source.connect();
        let (log, _sub) = observe(&view);

        source.data_of_range().push(Rc::from(vec!['a', 'b']));
        assert_eq!(log.borrow().last(), Some(&vec!['a', 'b']));

        source.set_data(vec!['a', 'b', 'c', 'd']);
        assert_eq!(log.borrow().len(), 2, "data replacement must not emit");
        assert_eq!(
            source.data_to_render().value().as_deref(),
            Some(&['a', 'b', 'c', 'd'][..])
        );

        source.data_of_range().push(Rc::from(vec!['c', 'd']));
        assert_eq!(*log.borrow(), [vec![], vec!['a', 'b'], vec!['c', 'd']]);
    }

    #[test]
    fn disconnect_stops_delivery_and_reconnect_resumes_on_same_output() {
        let mut source = WindowedDataSource::<char>::with_data(vec!['a', 'b', 'c']);
        let view = source.connect();
        let (log, _sub) = observe(&view);
        source.data_of_range().push(Rc::from(vec!['a']));

        source.disconnect();
        assert!(!source.is_connected());
        assert_eq!(source.data_of_range().subscriber_count(), 0);

        source.data_of_range().push(Rc::from(vec!['b']));
        source.set_data(vec!['x']);
        assert_eq!(*log.borrow(), [vec![], vec!['a']]);
        assert_eq!(
            source.data_to_render().value().as_deref(),
            Some(&['a', 'b', 'c'][..]),
            "data replacement must not be forwarded while disconnected"
        );

        // Channels persist, so the old view keeps its identity and replay
        // resumes with the latest range value once rewired.
        let rewired = source.connect();
        assert!(rewired.same_channel(&view));
        assert!(source.streams_ready());
        assert_eq!(*log.borrow(), [vec![], vec!['a'], vec!['b']]);
        assert_eq!(source.data_to_render().value().as_deref(), Some(&['x'][..]));
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut source = WindowedDataSource::<u8>::new();
        source.disconnect();
        source.disconnect();
        assert!(!source.is_connected());
        let _ = source.connect();
        assert!(source.is_connected());
    }

    #[test]
    fn range_subset_is_not_validated_against_data() {
        let mut source = WindowedDataSource::<char>::with_data(vec!['a']);
        let view = source.connect();
        source.data_of_range().push(Rc::from(vec!['z', 'q']));
        assert_eq!(view.value().as_deref(), Some(&['z', 'q'][..]));
    }

    #[test]
    fn trait_object_drives_the_source() {
        let mut source = WindowedDataSource::<u32>::with_data(vec![1_u32, 2, 3]);
        let host: &mut dyn DataSource<u32> = &mut source;
        let view = host.connect();
        host.set_data(Rc::from(vec![4_u32]));
        assert_eq!(&*host.data(), &[4]);
        host.disconnect();
        assert_eq!(view.value().as_deref(), Some(&[][..]));
    }

    #[test]
    fn dropping_the_source_releases_wiring() {
        let source = WindowedDataSource::<char>::with_data(vec!['a']);
        let range = source.data_of_range().clone();
        assert_eq!(range.subscriber_count(), 1);
        drop(source);
        assert_eq!(range.subscriber_count(), 0);
    }
}
