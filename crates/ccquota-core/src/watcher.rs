//! File watcher for the history log, stats cache and config file
//!
//! Uses notify on individual files. The session tree is not watched: it can
//! hold thousands of files, so the scheduler's interval covers it instead.
//!
//! Each file is either `Watched` or `Unwatched`. A file that cannot be
//! watched at startup, or that is removed later, stays `Unwatched` until the
//! engine is restarted; the interval tick is then its only refresh path.
//! A remove event for a path that exists again (an atomic rename-over) is
//! re-watched on the new file instead.

use crate::error::CoreError;
use crate::event::{EngineEvent, EventBus, RefreshTrigger};
use crate::scheduler::TriggerSender;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Watch state of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Unwatched,
    Watched,
}

/// A file to watch and the trigger its changes produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub path: PathBuf,
    pub trigger: RefreshTrigger,
}

impl WatchTarget {
    pub fn new(path: impl Into<PathBuf>, trigger: RefreshTrigger) -> Self {
        Self {
            path: path.into(),
            trigger,
        }
    }
}

/// What a notify event means for one target
#[derive(Debug, Clone, PartialEq, Eq)]
enum WatchAction {
    /// Content changed, request a pass
    Changed(RefreshTrigger),
    /// File went away or was replaced; re-check and request a pass
    Removed(PathBuf, RefreshTrigger),
}

type StateTable = Arc<RwLock<HashMap<PathBuf, WatchState>>>;

/// File watcher feeding triggers to the scheduler
pub struct FileWatcher {
    watcher: Arc<Mutex<Option<RecommendedWatcher>>>,
    states: StateTable,
    processor: Option<JoinHandle<()>>,
}

impl FileWatcher {
    /// Start watching `targets`; never fails
    ///
    /// Setup errors leave the affected files `Unwatched` and are reported on
    /// the event bus.
    pub fn start(targets: Vec<WatchTarget>, triggers: TriggerSender, event_bus: EventBus) -> Self {
        let states: StateTable = Arc::new(RwLock::new(
            targets
                .iter()
                .map(|t| (t.path.clone(), WatchState::Unwatched))
                .collect(),
        ));

        let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let watcher = match RecommendedWatcher::new(
            move |res| {
                let _ = event_tx.send(res);
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        ) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                let err = CoreError::WatchError {
                    message: e.to_string(),
                    source: Some(e),
                };
                error!(error = %err, "Failed to create file watcher, relying on interval refresh");
                event_bus.publish(EngineEvent::WatcherError(err.to_string()));
                None
            }
        };
        let watcher = Arc::new(Mutex::new(watcher));

        if let Some(w) = watcher.lock().as_mut() {
            for target in &targets {
                match w.watch(&target.path, RecursiveMode::NonRecursive) {
                    Ok(()) => {
                        states.write().insert(target.path.clone(), WatchState::Watched);
                        debug!(path = %target.path.display(), "Watching file");
                    }
                    Err(e) => {
                        warn!(
                            path = %target.path.display(),
                            error = %e,
                            "Cannot watch file, interval refresh only"
                        );
                    }
                }
            }
        }

        let processor = tokio::spawn(Self::process_events(
            event_rx,
            targets,
            triggers,
            Arc::clone(&watcher),
            Arc::clone(&states),
            event_bus,
        ));

        info!("File watcher started");

        Self {
            watcher,
            states,
            processor: Some(processor),
        }
    }

    /// Current state of `path`, `None` if it was never a target
    pub fn state(&self, path: &Path) -> Option<WatchState> {
        self.states.read().get(path).copied()
    }

    /// Snapshot of all watch states
    pub fn states(&self) -> HashMap<PathBuf, WatchState> {
        self.states.read().clone()
    }

    /// Close all descriptors and stop forwarding events
    pub async fn stop(&mut self) {
        // Dropping the watcher drops the callback's sender and ends the processor
        self.watcher.lock().take();
        for state in self.states.write().values_mut() {
            *state = WatchState::Unwatched;
        }
        if let Some(processor) = self.processor.take() {
            let _ = processor.await;
        }
        info!("File watcher stopped");
    }

    async fn process_events(
        mut event_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
        targets: Vec<WatchTarget>,
        triggers: TriggerSender,
        watcher: Arc<Mutex<Option<RecommendedWatcher>>>,
        states: StateTable,
        event_bus: EventBus,
    ) {
        while let Some(result) = event_rx.recv().await {
            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    error!(error = %e, "File watcher error");
                    event_bus.publish(EngineEvent::WatcherError(e.to_string()));
                    continue;
                }
            };

            for action in Self::process_event(&event, &targets) {
                match action {
                    WatchAction::Changed(trigger) => {
                        trace!(?trigger, "Watched file changed");
                        let _ = triggers.send(trigger);
                    }
                    WatchAction::Removed(path, trigger) => {
                        Self::handle_removed(&watcher, &states, &path);
                        let _ = triggers.send(trigger);
                    }
                }
            }
        }
        debug!("File watcher event stream closed");
    }

    /// Drop the old watch on `path`, re-watch it if a new file took its place
    fn handle_removed(
        watcher: &Mutex<Option<RecommendedWatcher>>,
        states: &StateTable,
        path: &Path,
    ) -> WatchState {
        let mut guard = watcher.lock();
        let Some(w) = guard.as_mut() else {
            return WatchState::Unwatched;
        };
        // The old inode's watch may already be gone
        let _ = w.unwatch(path);

        let state = if path.exists() {
            match w.watch(path, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    debug!(path = %path.display(), "Watched file replaced, watching new file");
                    WatchState::Watched
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot re-watch replaced file");
                    WatchState::Unwatched
                }
            }
        } else {
            warn!(path = %path.display(), "Watched file removed, no longer watching");
            WatchState::Unwatched
        };
        states.write().insert(path.to_path_buf(), state);
        state
    }

    /// Map a notify event onto the targets it concerns
    fn process_event(event: &Event, targets: &[WatchTarget]) -> Vec<WatchAction> {
        let removed = match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => false,
            EventKind::Remove(_) => true,
            _ => return Vec::new(),
        };

        targets
            .iter()
            .filter(|t| event.paths.iter().any(|p| *p == t.path))
            .map(|t| {
                if removed {
                    WatchAction::Removed(t.path.clone(), t.trigger)
                } else {
                    WatchAction::Changed(t.trigger)
                }
            })
            .collect()
    }
}
