//! Single-flight refresh scheduler
//!
//! All triggers (file events, config changes, timer ticks, explicit
//! refreshes) go through one channel to a dispatcher task. The dispatcher
//! debounces the bursty ones and then sets a dirty signal. A single worker
//! drains that signal and runs one pass at a time on the blocking pool.
//!
//! The dirty signal is a `Notify` permit, which holds at most one pending
//! wakeup: any number of triggers during a running pass collapse into one
//! more pass after it, never a queue.

use crate::event::RefreshTrigger;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace};

/// Sending half handed to watchers and the engine
pub type TriggerSender = mpsc::UnboundedSender<RefreshTrigger>;

/// Configuration for the scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Safety-net refresh interval (covers the unwatched session tree)
    pub interval: Duration,

    /// Quiet period before a burst of debounced triggers fires
    pub debounce_delay: Duration,

    /// Longest a continuous burst can hold off a pass
    pub max_debounce_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            debounce_delay: Duration::from_millis(250),
            max_debounce_delay: Duration::from_secs(3),
        }
    }
}

/// Work executed for each reconciliation pass
///
/// Runs on the blocking pool; file reads inside may block.
pub trait PassRunner: Send + Sync + 'static {
    fn run_pass(&self);
}

impl<F> PassRunner for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn run_pass(&self) {
        self()
    }
}

/// Trailing-edge debounce with a cap
#[derive(Debug)]
struct DebounceState {
    delay: Duration,
    max_delay: Duration,
    burst_started: Option<Instant>,
    deadline: Option<Instant>,
}

impl DebounceState {
    fn new(config: &SchedulerConfig) -> Self {
        Self {
            delay: config.debounce_delay,
            max_delay: config.max_debounce_delay.max(config.debounce_delay),
            burst_started: None,
            deadline: None,
        }
    }

    /// Record an event at `now`, pushing the deadline out but never past the cap
    fn on_event(&mut self, now: Instant) {
        let started = *self.burst_started.get_or_insert(now);
        let trailing = now + self.delay;
        let cap = started + self.max_delay;
        self.deadline = Some(trailing.min(cap));
    }

    fn take(&mut self) {
        self.burst_started = None;
        self.deadline = None;
    }
}

/// Handle to the running scheduler tasks
pub struct Scheduler {
    trigger_tx: TriggerSender,
    shutdown_tx: watch::Sender<bool>,
    dispatcher: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl Scheduler {
    /// Spawn the dispatcher and worker on the current runtime
    ///
    /// No pass runs until the first trigger arrives or the first interval
    /// elapses.
    pub fn spawn(runner: Arc<dyn PassRunner>, config: SchedulerConfig) -> Self {
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let dirty = Arc::new(Notify::new());

        let worker = tokio::spawn(Self::run_worker(
            runner,
            Arc::clone(&dirty),
            shutdown_rx.clone(),
        ));
        let dispatcher = tokio::spawn(Self::run_dispatcher(trigger_rx, dirty, config, shutdown_rx));

        info!("Refresh scheduler started");

        Self {
            trigger_tx,
            shutdown_tx,
            dispatcher,
            worker,
        }
    }

    /// Request a pass
    pub fn trigger(&self, trigger: RefreshTrigger) {
        // Closed channel means we are shutting down
        let _ = self.trigger_tx.send(trigger);
    }

    /// Sender for other trigger sources
    pub fn sender(&self) -> TriggerSender {
        self.trigger_tx.clone()
    }

    /// Stop timers and the debouncer; an in-flight pass runs to completion
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.dispatcher.await;
        let _ = self.worker.await;
        info!("Refresh scheduler stopped");
    }

    async fn run_dispatcher(
        mut trigger_rx: mpsc::UnboundedReceiver<RefreshTrigger>,
        dirty: Arc<Notify>,
        config: SchedulerConfig,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut debounce = DebounceState::new(&config);
        let mut interval = time::interval_at(Instant::now() + config.interval, config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let deadline = debounce.deadline;
            tokio::select! {
                received = trigger_rx.recv() => {
                    let Some(trigger) = received else { break };
                    if trigger.is_debounced() {
                        trace!(?trigger, "Debouncing trigger");
                        debounce.on_event(Instant::now());
                    } else {
                        debug!(?trigger, "Scheduling pass");
                        dirty.notify_one();
                    }
                }
                _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    debug!("Debounce window elapsed, scheduling pass");
                    debounce.take();
                    dirty.notify_one();
                }
                _ = interval.tick() => {
                    trace!("Safety-net interval tick");
                    dirty.notify_one();
                }
                _ = shutdown_rx.changed() => break,
            }
        }
    }

    async fn run_worker(
        runner: Arc<dyn PassRunner>,
        dirty: Arc<Notify>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = dirty.notified() => {
                    let runner = Arc::clone(&runner);
                    if let Err(e) = tokio::task::spawn_blocking(move || runner.run_pass()).await {
                        error!(error = %e, "Reconciliation pass panicked");
                    }
                }
                _ = shutdown_rx.changed() => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_runner(counter: Arc<AtomicUsize>, work: Duration) -> Arc<dyn PassRunner> {
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(work);
        })
    }

    fn quiet_config(debounce: Duration) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(3600),
            debounce_delay: debounce,
            max_debounce_delay: Duration::from_secs(3),
        }
    }

    #[test]
    fn test_debounce_state_caps_deadline() {
        let config = SchedulerConfig {
            interval: Duration::from_secs(60),
            debounce_delay: Duration::from_millis(100),
            max_debounce_delay: Duration::from_millis(250),
        };
        let mut state = DebounceState::new(&config);
        let t0 = Instant::now();

        state.on_event(t0);
        assert_eq!(state.deadline, Some(t0 + Duration::from_millis(100)));

        state.on_event(t0 + Duration::from_millis(80));
        assert_eq!(state.deadline, Some(t0 + Duration::from_millis(180)));

        state.on_event(t0 + Duration::from_millis(200));
        assert_eq!(state.deadline, Some(t0 + Duration::from_millis(250)));

        state.take();
        assert_eq!(state.deadline, None);
    }

    #[tokio::test]
    async fn test_write_burst_runs_one_pass() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::spawn(
            counting_runner(Arc::clone(&counter), Duration::ZERO),
            quiet_config(Duration::from_millis(100)),
        );

        for _ in 0..3 {
            scheduler.trigger(RefreshTrigger::HistoryChanged);
            time::sleep(Duration::from_millis(20)).await;
        }
        time::sleep(Duration::from_millis(400)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_triggers_during_pass_coalesce_into_one() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::spawn(
            counting_runner(Arc::clone(&counter), Duration::from_millis(150)),
            quiet_config(Duration::from_millis(50)),
        );

        scheduler.trigger(RefreshTrigger::Manual);
        time::sleep(Duration::from_millis(40)).await;
        for _ in 0..5 {
            scheduler.trigger(RefreshTrigger::Manual);
        }
        time::sleep(Duration::from_millis(600)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_passes_never_overlap() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let runner: Arc<dyn PassRunner> = {
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            Arc::new(move || {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(30));
                in_flight.fetch_sub(1, Ordering::SeqCst);
            })
        };
        let scheduler = Scheduler::spawn(runner, quiet_config(Duration::from_millis(10)));

        for i in 0..20 {
            let trigger = if i % 2 == 0 {
                RefreshTrigger::Manual
            } else {
                RefreshTrigger::ConfigChanged
            };
            scheduler.trigger(trigger);
            time::sleep(Duration::from_millis(7)).await;
        }
        time::sleep(Duration::from_millis(300)).await;

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_interval_fires_without_triggers() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::spawn(
            counting_runner(Arc::clone(&counter), Duration::ZERO),
            SchedulerConfig {
                interval: Duration::from_millis(100),
                ..quiet_config(Duration::from_millis(50))
            },
        );

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(330)).await;
        assert!(counter.load(Ordering::SeqCst) >= 2);
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_no_passes_after_shutdown() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::spawn(
            counting_runner(Arc::clone(&counter), Duration::ZERO),
            quiet_config(Duration::from_millis(10)),
        );
        let sender = scheduler.sender();
        scheduler.shutdown().await;

        let _ = sender.send(RefreshTrigger::Manual);
        time::sleep(Duration::from_millis(100)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
