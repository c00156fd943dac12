//! Usage engine
//!
//! One long-lived value, built by whoever presents the gauge and shared with
//! anything that reads the snapshot or asks for a refresh.

use crate::config::{ConfigSource, SourcePaths};
use crate::event::{EngineEvent, EventBus, RefreshTrigger};
use crate::models::UsageSnapshot;
use crate::reconciler::{PassOutcome, Reconciler};
use crate::scheduler::{PassRunner, Scheduler, SchedulerConfig, TriggerSender};
use crate::store::SnapshotStore;
use crate::watcher::{FileWatcher, WatchState, WatchTarget};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

/// Pass body run by the scheduler: reconcile, then publish
///
/// `pass_lock` is held for the whole pass, so scheduled passes and
/// [`UsageEngine::reconcile_once`] never overlap and publish in start order.
struct PublishingPass {
    reconciler: Arc<Reconciler>,
    store: Arc<SnapshotStore>,
    pass_lock: parking_lot::Mutex<()>,
}

impl PublishingPass {
    fn run(&self) -> PassOutcome {
        let _guard = self.pass_lock.lock();
        let outcome = self.reconciler.reconcile();
        if outcome.report.has_errors() {
            let degraded = outcome.report.degraded_sources();
            self.store
                .event_bus()
                .publish(EngineEvent::PassDegraded(degraded));
        }
        self.store.publish(outcome.snapshot.clone());
        outcome
    }
}

impl PassRunner for PublishingPass {
    fn run_pass(&self) {
        self.run();
    }
}

/// Running background parts
struct Running {
    scheduler: Scheduler,
    watcher: FileWatcher,
}

/// Quota tracking engine
pub struct UsageEngine {
    pass: Arc<PublishingPass>,
    watch_targets: Vec<WatchTarget>,
    scheduler_config: SchedulerConfig,
    triggers: RwLock<Option<TriggerSender>>,
    running: Mutex<Option<Running>>,
}

impl UsageEngine {
    pub fn new(
        paths: SourcePaths,
        config: Arc<dyn ConfigSource>,
        scheduler_config: SchedulerConfig,
    ) -> Self {
        let mut watch_targets = vec![
            WatchTarget::new(&paths.history_file, RefreshTrigger::HistoryChanged),
            WatchTarget::new(&paths.stats_cache, RefreshTrigger::StatsCacheChanged),
        ];
        if let Some(path) = config.watch_path() {
            watch_targets.push(WatchTarget::new(path, RefreshTrigger::ConfigChanged));
        }

        let reconciler = Arc::new(Reconciler::new(paths, config));
        let store = Arc::new(SnapshotStore::new(EventBus::default_capacity()));

        Self {
            pass: Arc::new(PublishingPass {
                reconciler,
                store,
                pass_lock: parking_lot::Mutex::new(()),
            }),
            watch_targets,
            scheduler_config,
            triggers: RwLock::new(None),
            running: Mutex::new(None),
        }
    }

    /// Create with default scheduler timings
    pub fn with_defaults(paths: SourcePaths, config: Arc<dyn ConfigSource>) -> Self {
        Self::new(paths, config, SchedulerConfig::default())
    }

    /// Start the scheduler and watchers and request the first pass
    ///
    /// Calling it again while running only requests another pass.
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if let Some(ref r) = *running {
            r.scheduler.trigger(RefreshTrigger::Startup);
            return;
        }

        let runner: Arc<dyn PassRunner> = Arc::clone(&self.pass) as Arc<dyn PassRunner>;
        let scheduler = Scheduler::spawn(runner, self.scheduler_config.clone());
        let watcher = FileWatcher::start(
            self.watch_targets.clone(),
            scheduler.sender(),
            self.event_bus().clone(),
        );
        scheduler.trigger(RefreshTrigger::Startup);
        *self.triggers.write() = Some(scheduler.sender());

        info!(
            targets = self.watch_targets.len(),
            interval_secs = self.scheduler_config.interval.as_secs(),
            "Usage engine started"
        );
        *running = Some(Running { scheduler, watcher });
    }

    /// Request a pass; returns immediately
    ///
    /// Before `start` there is no worker, so the request is dropped.
    pub fn refresh(&self) {
        self.send(RefreshTrigger::Manual);
    }

    /// Configuration-change hook; debounced with other bursty triggers
    pub fn config_changed(&self) {
        self.send(RefreshTrigger::ConfigChanged);
    }

    fn send(&self, trigger: RefreshTrigger) {
        match self.triggers.read().as_ref() {
            Some(tx) => {
                let _ = tx.send(trigger);
            }
            None => warn!(?trigger, "Engine not started, ignoring refresh request"),
        }
    }

    /// Run one pass on the calling thread and publish it
    ///
    /// Blocks while a scheduled pass is in flight, then runs after it.
    pub fn reconcile_once(&self) -> PassOutcome {
        self.pass.run()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Option<Arc<UsageSnapshot>> {
        self.pass.store.get()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_bus().subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        self.pass.store.event_bus()
    }

    /// Watch state per file; empty when not started
    pub async fn watch_states(&self) -> HashMap<PathBuf, WatchState> {
        match self.running.lock().await.as_ref() {
            Some(r) => r.watcher.states(),
            None => HashMap::new(),
        }
    }

    /// Stop watchers and timers; an in-flight pass completes first
    pub async fn stop(&self) {
        self.triggers.write().take();
        let Some(mut running) = self.running.lock().await.take() else {
            return;
        };
        running.watcher.stop().await;
        running.scheduler.shutdown().await;
        info!("Usage engine stopped");
    }
}
