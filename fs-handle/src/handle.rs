//! The navigable directory handle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::dispatch::{EventDispatcher, Subscription, SubscriptionId};
use crate::entry::ListingEntry;
use crate::error::{FsHandleError, Result};
use crate::listing::list_directory;
use crate::navigator::PathNavigator;
use crate::watcher::WatchBinding;

/// A stateful handle onto one directory subtree.
///
/// Tracks a current-directory cursor, serves structured listings of the
/// cursor, and streams change notifications for the cursor's directory to
/// subscribers. Watching starts lazily on the first `subscribe` call and
/// follows the cursor from then on.
///
/// The cursor and the active watch binding live under a single lock, so a
/// navigation step and its rebind are one atomic transition. Watching is
/// best-effort: a failed (re)bind leaves the handle fully usable for
/// navigation and listing.
///
/// `close` releases the native watch deterministically. If the handle is
/// dropped without `close`, the native registration is still released by
/// drop and the consumer task drains out on its own, but without the
/// bounded-shutdown guarantee.
pub struct FsHandle {
    /// Cursor plus active binding, guarded as one unit.
    state: Mutex<HandleState>,

    /// Fan-out of update events to subscribers.
    dispatcher: Arc<EventDispatcher>,
}

struct HandleState {
    navigator: PathNavigator,
    binding: Option<WatchBinding>,
    closed: bool,
}

impl FsHandle {
    /// Open a handle at `initial`, bounded by the filesystem root.
    ///
    /// Fails if `initial` does not exist or is not a directory; this is
    /// the only fault that is fatal to the handle.
    pub fn new(initial: impl AsRef<Path>) -> Result<Self> {
        Self::from_navigator(PathNavigator::new(initial)?)
    }

    /// Open a handle at `initial`, confined to the subtree under `root`.
    pub fn with_root(initial: impl AsRef<Path>, root: impl AsRef<Path>) -> Result<Self> {
        Self::from_navigator(PathNavigator::with_root(initial, root)?)
    }

    fn from_navigator(navigator: PathNavigator) -> Result<Self> {
        info!("opened handle at {}", navigator.current_path().display());

        Ok(Self {
            state: Mutex::new(HandleState {
                navigator,
                binding: None,
                closed: false,
            }),
            dispatcher: EventDispatcher::new(),
        })
    }

    /// Move the cursor into the named child directory.
    ///
    /// Returns `false` without error if the child is missing, is not a
    /// directory, or the handle is closed. On success any active watch is
    /// retargeted to the new cursor.
    pub async fn descend(&self, name: &str) -> bool {
        let mut state = self.state.lock().await;
        if state.closed || !state.navigator.descend(name) {
            return false;
        }

        self.rebind(&mut state).await;
        true
    }

    /// Move the cursor to its parent directory.
    ///
    /// Returns `false` without error at the root boundary or if the handle
    /// is closed. On success any active watch is retargeted.
    pub async fn ascend(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.closed || !state.navigator.ascend() {
            return false;
        }

        self.rebind(&mut state).await;
        true
    }

    /// The current cursor position.
    pub async fn current_path(&self) -> PathBuf {
        self.state.lock().await.navigator.current_path().to_path_buf()
    }

    /// List the immediate children of the current directory.
    ///
    /// The enumeration runs against the cursor value read under the lock;
    /// the filesystem walk itself is not serialized with navigation, so it
    /// may legitimately observe a directory the cursor has since left.
    pub async fn list(&self) -> Result<Vec<ListingEntry>> {
        let path = {
            let state = self.state.lock().await;
            if state.closed {
                return Err(FsHandleError::Closed);
            }
            state.navigator.current_path().to_path_buf()
        };

        list_directory(&path)
    }

    /// Subscribe to change notifications for the current directory.
    ///
    /// The first subscription starts the watch; a registration fault is
    /// returned here, once, and leaves the handle usable for navigation
    /// and listing.
    pub async fn subscribe(&self) -> Result<Subscription> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(FsHandleError::Closed);
        }

        if state.binding.is_none() {
            let binding = WatchBinding::bind(
                state.navigator.current_path(),
                self.dispatcher.clone(),
            )?;
            state.binding = Some(binding);
        }

        Ok(self.dispatcher.subscribe().await)
    }

    /// Stop delivering events to the given subscription.
    pub async fn unsubscribe(&self, id: SubscriptionId) {
        self.dispatcher.unsubscribe(id).await;
    }

    /// Release the watch, end all subscriptions, and mark the handle
    /// closed. Idempotent; bounded by the watcher's release timeout.
    ///
    /// Subscribers can drain events already buffered, after which their
    /// `recv` resolves to `None` rather than blocking on a dead handle.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if state.closed {
            return;
        }
        state.closed = true;

        if let Some(binding) = state.binding.take() {
            binding.release().await;
        }
        self.dispatcher.clear().await;

        info!(
            "closed handle at {}",
            state.navigator.current_path().display()
        );
    }

    /// Retarget the active watch, if any, at the cursor. Old binding goes
    /// first so native registrations never accumulate; a bind fault
    /// degrades the handle to unwatched rather than failing navigation.
    async fn rebind(&self, state: &mut HandleState) {
        let Some(old) = state.binding.take() else {
            return;
        };
        old.release().await;

        match WatchBinding::bind(state.navigator.current_path(), self.dispatcher.clone()) {
            Ok(binding) => state.binding = Some(binding),
            Err(e) => warn!(
                "could not rewatch {}: {e}",
                state.navigator.current_path().display()
            ),
        }
    }
}
