#![forbid(unsafe_code)]

//! Virtualized rendering for append-heavy log streams.
//!
//! This crate keeps render cost independent of how many log items are
//! retained: only the items intersecting the viewport (plus a small
//! overscan buffer) are laid out, while a tail-follow state machine keeps
//! the newest item in view until the user scrolls away.
//!
//! - [`VirtualLogList`] - the renderer: reconciliation, layout, scrolling
//! - [`HeightCache`] / [`PositionIndex`] - measured heights and prefix-sum offsets
//! - [`visible_window`] - the render window for a scroll position
//! - [`ScrollController`] - auto-follow, settle timer, frame actions
//! - [`Reconciler`] - incremental update vs. full reset decisions
//! - [`RowMeasurer`] - terminal row counting for log text
//! - [`TailBuffer`] - retention cap, filter and search around the list
//!
//! # Example
//! ```
//! use tailview::{ListController, TailBuffer, VirtualListConfig, VirtualLogList};
//!
//! let mut buffer = TailBuffer::new(5_000);
//! let mut list = VirtualLogList::new(VirtualListConfig::default());
//!
//! buffer.push_many(["[INFO] boot", "[WARN] disk at 91%"]);
//! list.sync(&buffer.visible_items());
//! assert_eq!(list.window(), Some(0..=1));
//!
//! list.scroll_to_bottom();
//! assert!(list.auto_follow());
//! ```

pub mod config;
pub mod height;
pub mod item;
pub mod list;
pub mod measure;
pub mod position;
pub mod reconcile;
pub mod scroll;
pub mod shell;
pub mod viewport;

pub use config::{ConfigError, ConfigParse, VirtualListConfig};
pub use height::{HeightCache, HeightUpdate};
pub use item::{IdSource, ItemId, Keyed, LogItem, LogLevel, SessionIds};
pub use list::{Dirty, ItemClick, ListController, ListLayout, VirtualLogList, VisibleRow};
pub use measure::{RowMeasurer, WrapMode};
pub use position::PositionIndex;
pub use reconcile::{ChangeKind, Reconciler, Reconciliation, ResetReason};
pub use scroll::{FrameAction, ScrollController, ScrollTick, ViewportState};
pub use shell::TailBuffer;
pub use viewport::visible_window;
