// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_windowed_source --heading-base-level=0

//! Understory Windowed Source: feed a virtualized table only its visible rows.
//!
//! A table host that virtualizes its rows should not be handed the full
//! dataset on every change. This crate provides a small, renderer-agnostic
//! data source that keeps two change sources apart and combines them into the
//! rows the host actually draws:
//!
//! - [`WindowedDataSource`]: owns the full row collection and exposes two
//!   public channels. [`data_to_render`](WindowedDataSource::data_to_render)
//!   carries the full dataset whenever it is replaced.
//!   [`data_of_range`](WindowedDataSource::data_of_range) receives the
//!   visible subset and drives the render output.
//! - [`DataSource`]: the capability set a table host drives (`connect`,
//!   `disconnect`, data accessors), implemented as a trait.
//! - [`ReplayChannel`] and [`Observable`]: synchronous multicast channels that
//!   replay their latest value to new subscribers.
//! - [`Subscription`] and [`CompositeSubscription`]: cancellation handles;
//!   `disconnect` releases the source's internal wiring as one unit.
//! - [`WindowSlicer`] and [`slice_window`]: glue that slices the full dataset
//!   by a visible index range (for example a `VisibleStrip` from
//!   `understory_virtual_list`) and pushes the result into `data_of_range`.
//!
//! This crate deliberately does **not** compute visible ranges from scroll
//! geometry, render rows, or implement sorting/filtering/paging. Those stages
//! can subscribe to `data_to_render` and push into `data_of_range`.
//!
//! Everything is single-threaded: channels use `Rc`/`RefCell` and deliver on
//! the pushing call stack.
//!
//! ## Minimal example
//!
//! ```rust
//! use std::rc::Rc;
//! use understory_windowed_source::{DataSource, WindowedDataSource};
//!
//! let mut source = WindowedDataSource::<char>::with_data(vec!['a', 'b', 'c']);
//!
//! // The host connects once when it mounts.
//! let rendered = source.connect();
//! assert_eq!(rendered.value().as_deref(), Some(&[][..]));
//!
//! // The range tracker pushes the visible subset.
//! source.data_of_range().push(Rc::from(vec!['a', 'b']));
//! assert_eq!(rendered.value().as_deref(), Some(&['a', 'b'][..]));
//!
//! // Replacing data alone leaves the render output untouched.
//! source.set_data(vec!['a', 'b', 'c', 'd']);
//! assert_eq!(rendered.value().as_deref(), Some(&['a', 'b'][..]));
//!
//! // The host disconnects once when it unmounts.
//! DataSource::disconnect(&mut source);
//! ```
//!
//! ## Slicing by a visible range
//!
//! ```rust
//! use understory_windowed_source::{WindowSlicer, WindowedDataSource};
//!
//! let mut source = WindowedDataSource::<u32>::with_data((0..1_000).collect::<Vec<_>>());
//! let slicer = WindowSlicer::attach(&source, 0..20);
//! let rendered = source.connect();
//! assert_eq!(rendered.value().map(|rows| rows.len()), Some(20));
//!
//! // Scrolling moves the window.
//! slicer.set_range(500..510);
//! assert_eq!(rendered.value().and_then(|rows| rows.first().copied()), Some(500));
//!
//! // New data is re-sliced with the current window.
//! source.set_data((0..505).collect::<Vec<_>>());
//! assert_eq!(rendered.value().map(|rows| rows.len()), Some(5));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod channel;
mod source;
mod subscription;
mod window;

pub use channel::{Observable, ReplayChannel};
pub use source::{DataSource, Rows, WindowedDataSource};
pub use subscription::{CompositeSubscription, Subscription};
pub use window::{WindowSlicer, slice_window};
