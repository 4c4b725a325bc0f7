//! Native watch binding and raw-event translation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch::EventDispatcher;
use crate::entry::{UpdateEvent, UpdateKind};
use crate::error::Result;

/// Buffer between the native notification callback and the consumer task.
const RAW_EVENT_BUFFER: usize = 1024;

/// How long `release` waits for the consumer task to finish before
/// force-aborting it.
const RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

/// One live native watch registration on one directory, paired with the
/// background task that drains its raw events.
///
/// This is an owned resource: its sole owner is the handle, it is released
/// before any replacement is created, and releasing it both cancels the
/// consumer task and drops the native registration. Raw events still in
/// flight when a binding is released die with its channel, so an event can
/// be lost across a rebind but can never be attributed to the wrong
/// directory.
#[derive(Debug)]
pub struct WatchBinding {
    /// Directory this binding watches.
    path: PathBuf,

    /// Native watcher; dropping it releases the OS registration.
    watcher: Option<RecommendedWatcher>,

    /// Consumer task draining raw events.
    task: Option<JoinHandle<()>>,

    /// Cancels the consumer task.
    cancel: CancellationToken,
}

impl WatchBinding {
    /// Register a non-recursive watch on `path` and start consuming its
    /// events.
    ///
    /// Registration faults surface here, once; the caller can continue
    /// without watching. Only entry create/remove/modify notifications are
    /// translated; access and catch-all kinds are discarded. On platforms
    /// whose native primitive cannot report modifications, `Modify` events
    /// are simply absent while `Create`/`Delete` continue to flow.
    pub fn bind(path: &Path, dispatcher: Arc<EventDispatcher>) -> Result<Self> {
        let (raw_tx, raw_rx) = mpsc::channel::<notify::Event>(RAW_EVENT_BUFFER);

        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if raw_tx.try_send(event).is_err() {
                        // Consumer gone or saturated; the event is lost.
                        warn!("raw event buffer full or closed, dropping notification");
                    }
                }
                Err(e) => warn!("watch error: {e}"),
            },
        )?;

        watcher.watch(path, RecursiveMode::NonRecursive)?;
        info!("watching {}", path.display());

        let cancel = CancellationToken::new();
        let task = tokio::spawn(consume_raw_events(
            path.to_path_buf(),
            raw_rx,
            dispatcher,
            cancel.clone(),
        ));

        Ok(Self {
            path: path.to_path_buf(),
            watcher: Some(watcher),
            task: Some(task),
            cancel,
        })
    }

    /// The directory this binding watches.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cancel the consumer task and drop the native registration.
    ///
    /// Bounded: if the task does not finish within `RELEASE_TIMEOUT` it is
    /// force-aborted and a warning is the only observable effect.
    pub async fn release(mut self) {
        self.cancel.cancel();

        if let Some(mut watcher) = self.watcher.take() {
            let _ = watcher.unwatch(&self.path);
        }

        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(RELEASE_TIMEOUT, &mut task).await.is_err() {
                task.abort();
                warn!(
                    "watch consumer for {} did not stop in time, aborting",
                    self.path.display()
                );
            }
        }

        info!("released watch on {}", self.path.display());
    }
}

/// Consumer loop: translate raw notifications into update events and hand
/// them to the dispatcher.
async fn consume_raw_events(
    watched: PathBuf,
    mut raw_rx: mpsc::Receiver<notify::Event>,
    dispatcher: Arc<EventDispatcher>,
    cancel: CancellationToken,
) {
    loop {
        let raw = tokio::select! {
            _ = cancel.cancelled() => break,
            maybe = raw_rx.recv() => match maybe {
                Some(raw) => raw,
                None => break,
            },
        };

        let Some(kind) = UpdateKind::from_raw(raw.kind) else {
            continue;
        };

        // A raw notification can repeat a path; emit each affected entry
        // at most once per notification.
        let mut seen: Vec<&PathBuf> = Vec::new();
        for path in &raw.paths {
            if seen.contains(&path) {
                continue;
            }
            seen.push(path);

            // Only immediate children of the bound directory; anything
            // else belongs to a binding that no longer exists.
            if path.parent() != Some(watched.as_path()) {
                debug!("ignoring event outside watched dir: {}", path.display());
                continue;
            }

            if let Some(event) = UpdateEvent::for_path(kind, path) {
                debug!("{:?} {}", event.kind, event.name);
                dispatcher.dispatch(event).await;
            }
        }
    }

    debug!("watch consumer for {} finished", watched.display());
}
