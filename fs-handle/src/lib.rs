//! # fs-handle
//!
//! A stateful, navigable handle onto a single directory subtree. The
//! handle tracks a current-directory cursor, supports bounded up/down
//! navigation, produces structured listings, and streams typed change
//! notifications (create/delete/modify) for the watched directory to any
//! number of subscribers.
//!
//! Serialization of listings and events, and the transport that invokes
//! handle operations remotely, are the caller's concern; this crate only
//! produces the data types and the subscription stream.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                         FsHandle                           │
//! ├────────────────────────────────────────────────────────────┤
//! │  PathNavigator ──► list_directory ──► ListingEntry         │
//! │       │                                                    │
//! │       ▼                                                    │
//! │  WatchBinding ──► UpdateEvent ──► EventDispatcher          │
//! │   (notify)                          (per-subscriber        │
//! │                                      bounded channels)     │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod dispatch;
pub mod entry;
pub mod error;
pub mod handle;
pub mod listing;
pub mod navigator;
pub mod watcher;

pub use dispatch::{EventDispatcher, Subscription, SubscriptionId};
pub use entry::{ListingEntry, UpdateEvent, UpdateKind};
pub use error::{FsHandleError, Result};
pub use handle::FsHandle;
pub use listing::list_directory;
pub use navigator::PathNavigator;
pub use watcher::WatchBinding;
