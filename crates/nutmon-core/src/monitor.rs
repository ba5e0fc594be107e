//! Poll loop and power-state machine.
//!
//! The monitor samples `ups.status` and `battery.charge` at a fixed
//! interval, classifies the status, and dispatches device-control actions
//! on status edges. Exactly one previous sample is retained; the first
//! sample only seeds the state machine and can never produce an edge.
//!
//! The loop is cancellable via a [`CancellationToken`], checked both
//! before each tick and during every sleep, so an external stop request
//! never waits out a full poll interval.

use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use nutmon_types::{PowerStatus, Sample};

use crate::actions::PowerActions;
use crate::error::{Error, Result};
use crate::events::{EventDispatcher, EventReceiver, MonitorEvent};
use crate::traits::StatusSource;

/// Default time between poll ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default battery charge (percent) required before the load is resumed.
pub const DEFAULT_RESUME_THRESHOLD: f64 = 90.0;

/// What to do when a poll tick fails.
///
/// The conservative default is [`Stop`](Self::Stop): silently polling on
/// with stale state is worse than exiting loudly.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FailurePolicy {
    /// Abort the monitor on the first failed tick.
    #[default]
    Stop,
    /// Log the failure and keep polling, optionally giving up after a run
    /// of consecutive failures.
    Continue {
        /// Abort after this many consecutive failures (`None` = never).
        max_consecutive: Option<u32>,
    },
    /// Re-dial the daemon when a session-fatal error occurs.
    Reconnect {
        /// Reconnection attempts before giving up.
        max_attempts: u32,
        /// Delay before each attempt.
        delay: Duration,
    },
}

/// Options for the poll loop.
///
/// Use the builder for convenient configuration:
///
/// ```
/// use std::time::Duration;
/// use nutmon_core::monitor::{FailurePolicy, PollOptions};
///
/// let options = PollOptions::builder()
///     .interval(Duration::from_secs(10))
///     .resume_threshold(80.0)
///     .failure_policy(FailurePolicy::Continue { max_consecutive: Some(5) })
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Time between poll ticks. Default: 5 seconds.
    pub interval: Duration,
    /// Battery charge (percent) required before resuming the load after
    /// power returns. Default: 90.
    pub resume_threshold: f64,
    /// Whether to refresh the full variable snapshot each tick, for
    /// observability only. Default: false.
    pub refresh_vars: bool,
    /// Reaction to a failed tick. Default: stop.
    pub failure_policy: FailurePolicy,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            resume_threshold: DEFAULT_RESUME_THRESHOLD,
            refresh_vars: false,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl PollOptions {
    /// Create a new builder for PollOptions.
    pub fn builder() -> PollOptionsBuilder {
        PollOptionsBuilder::default()
    }

    /// Validate the options and return an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::invalid_config("poll interval must be > 0"));
        }
        if !(0.0..=100.0).contains(&self.resume_threshold) {
            return Err(Error::invalid_config(
                "resume threshold must be a percentage in 0..=100",
            ));
        }
        Ok(())
    }
}

/// Builder for PollOptions.
#[derive(Debug, Clone, Default)]
pub struct PollOptionsBuilder {
    options: PollOptions,
}

impl PollOptionsBuilder {
    /// Set the poll interval.
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.options.interval = interval;
        self
    }

    /// Set the resume charge threshold (percent).
    #[must_use]
    pub fn resume_threshold(mut self, threshold: f64) -> Self {
        self.options.resume_threshold = threshold;
        self
    }

    /// Enable or disable the per-tick variable snapshot refresh.
    #[must_use]
    pub fn refresh_vars(mut self, refresh: bool) -> Self {
        self.options.refresh_vars = refresh;
        self
    }

    /// Set the failure policy.
    #[must_use]
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.options.failure_policy = policy;
        self
    }

    /// Build the PollOptions.
    #[must_use]
    pub fn build(self) -> PollOptions {
        self.options
    }
}

/// State machine position: edges are only computed once steady.
#[derive(Debug, Clone, Copy)]
enum PollState {
    /// No sample taken yet; the first one seeds the machine.
    Initial,
    /// At least one sample taken; transitions compare against `prev`.
    Steady { prev: PowerStatus },
}

/// The poll loop over a [`StatusSource`], dispatching [`PowerActions`]
/// on status edges.
pub struct UpsMonitor<S, A> {
    source: S,
    actions: A,
    options: PollOptions,
    events: EventDispatcher,
    state: PollState,
}

impl<S: StatusSource, A: PowerActions> UpsMonitor<S, A> {
    /// Create a monitor over a source and an action sink.
    pub fn new(source: S, actions: A, options: PollOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            source,
            actions,
            options,
            events: EventDispatcher::default(),
            state: PollState::Initial,
        })
    }

    /// Subscribe to the monitor's event stream.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// The monitor's event dispatcher.
    ///
    /// Embedders use this to inject context events the loop itself cannot
    /// know, such as which UPS was selected before the loop started.
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Run the poll loop until cancelled or a fatal failure.
    ///
    /// Cancellation is graceful and returns `Ok(())`; any error returned
    /// means the session is over and the process should treat it as fatal.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        let mut ticker = interval(self.options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("monitor cancelled, shutting down");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(()) => consecutive_failures = 0,
                        Err(Error::Cancelled) => return Ok(()),
                        Err(error) => {
                            consecutive_failures += 1;
                            self.events.send(MonitorEvent::TickFailed {
                                error: error.to_string(),
                            });
                            match self.on_tick_failure(error, consecutive_failures, &cancel).await {
                                Ok(()) => {}
                                Err(Error::Cancelled) => return Ok(()),
                                Err(fatal) => return Err(fatal),
                            }
                        }
                    }
                }
            }
        }
    }

    /// One poll tick: sample, classify, detect the edge, dispatch.
    async fn tick(&mut self) -> Result<()> {
        let sample = self.source.sample().await?;
        let charge = sample.charge();
        debug!(
            status = %sample.status,
            raw = %sample.raw_status,
            charge = %sample.raw_charge,
            "polled UPS"
        );
        self.events.send(MonitorEvent::Sample {
            status: sample.status,
            charge,
        });

        if self.options.refresh_vars {
            // Observability only; a failed refresh never fails the tick.
            match self.source.refresh_vars().await {
                Ok(vars) => self.events.send(MonitorEvent::VariablesRefreshed { count: vars.len() }),
                Err(error) => warn!(%error, "variable snapshot refresh failed"),
            }
        }

        match self.state {
            PollState::Initial => {
                self.state = PollState::Steady { prev: sample.status };
            }
            PollState::Steady { prev } if prev != sample.status => {
                info!(from = %prev, to = %sample.status, "UPS status changed");
                self.events.send(MonitorEvent::StatusChanged {
                    from: prev,
                    to: sample.status,
                });
                self.on_edge(&sample).await;
                self.state = PollState::Steady { prev: sample.status };
            }
            PollState::Steady { .. } => {}
        }
        Ok(())
    }

    /// Dispatch the transition action for the status just entered.
    async fn on_edge(&mut self, sample: &Sample) {
        match sample.status {
            PowerStatus::OnBattery => {
                warn!("UPS on battery power, suspending load");
                self.actions.suspend_print().await;
                self.actions.suspend_heater().await;
                self.events.send(MonitorEvent::LoadSuspended);
            }
            PowerStatus::Online => {
                let charge = sample.charge();
                info!(charge = ?charge, "UPS back online");
                self.events.send(MonitorEvent::ResumeAllowed { charge });
                match charge {
                    Some(charge) if charge >= self.options.resume_threshold => {
                        info!(charge, "battery charge sufficient, resuming load");
                        self.actions.resume_heater().await;
                        self.actions.resume_print().await;
                        self.events.send(MonitorEvent::LoadResumed);
                    }
                    Some(charge) => {
                        info!(
                            charge,
                            threshold = self.options.resume_threshold,
                            "charge below resume threshold, load stays suspended"
                        );
                    }
                    None => {
                        warn!(raw = %sample.raw_charge, "battery charge unreadable, load stays suspended");
                    }
                }
            }
            PowerStatus::Unknown => {
                warn!(raw = %sample.raw_status, "UPS status unrecognized, no action");
            }
        }
    }

    /// Apply the failure policy to a failed tick.
    ///
    /// `Ok(())` means keep polling; an error aborts the loop
    /// (`Error::Cancelled` aborts it gracefully).
    async fn on_tick_failure(
        &mut self,
        error: Error,
        consecutive: u32,
        cancel: &CancellationToken,
    ) -> Result<()> {
        match self.options.failure_policy.clone() {
            FailurePolicy::Stop => {
                error!(%error, "poll tick failed, stopping");
                Err(error)
            }
            FailurePolicy::Continue { max_consecutive } => {
                warn!(%error, consecutive, "poll tick failed, continuing");
                match max_consecutive {
                    Some(max) if consecutive >= max => {
                        error!(consecutive, "too many consecutive failures, stopping");
                        Err(error)
                    }
                    _ => Ok(()),
                }
            }
            FailurePolicy::Reconnect { max_attempts, delay } => {
                if !error.is_fatal_to_session() {
                    warn!(%error, "poll tick failed, session still usable, continuing");
                    return Ok(());
                }
                warn!(%error, "session lost, reconnecting");
                for attempt in 1..=max_attempts {
                    self.events.send(MonitorEvent::ReconnectStarted { attempt });
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(Error::Cancelled),
                        _ = sleep(delay) => {}
                    }
                    match self.source.reconnect().await {
                        Ok(()) => {
                            info!(attempt, "reconnected to daemon");
                            self.events
                                .send(MonitorEvent::ReconnectSucceeded { attempts: attempt });
                            return Ok(());
                        }
                        Err(error) => warn!(%error, attempt, "reconnect attempt failed"),
                    }
                }
                error!(max_attempts, "reconnect attempts exhausted, stopping");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ActionCall, MockActions, MockSource, ScriptedTick};

    fn ok(status: &str, charge: &str) -> ScriptedTick {
        ScriptedTick::sample(status, charge)
    }

    async fn run_script(script: Vec<ScriptedTick>, options: PollOptions) -> (Result<()>, MockActions) {
        let cancel = CancellationToken::new();
        let source = MockSource::new(script, cancel.clone());
        let actions = MockActions::default();
        let monitor = UpsMonitor::new(source, actions.clone(), options).unwrap();
        let result = monitor.run(cancel).await;
        (result, actions)
    }

    #[tokio::test(start_paused = true)]
    async fn test_edge_detection_dispatches_exactly_twice() {
        // [Online, Online, OnBattery, OnBattery, Online]: suspend on the
        // 3rd tick, resume on the 5th, nothing on ticks 2 and 4.
        let script = vec![
            ok("OL", "100"),
            ok("OL", "100"),
            ok("OB DISCHRG", "95"),
            ok("OB DISCHRG", "93"),
            ok("OL CHRG", "94"),
        ];
        let (result, actions) = run_script(script, PollOptions::default()).await;
        result.unwrap();
        assert_eq!(
            actions.calls(),
            vec![
                ActionCall::SuspendPrint,
                ActionCall::SuspendHeater,
                ActionCall::ResumeHeater,
                ActionCall::ResumePrint,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_sample_never_produces_an_edge() {
        // Starting on battery is seed state, not a transition.
        let script = vec![ok("OB", "80"), ok("OB", "79")];
        let (result, actions) = run_script(script, PollOptions::default()).await;
        result.unwrap();
        assert!(actions.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_charge_withholds_resume() {
        let script = vec![ok("OL", "100"), ok("OB", "60"), ok("OL", "60")];
        let (result, actions) = run_script(script, PollOptions::default()).await;
        result.unwrap();
        // Suspend pair only: power returned but charge is below threshold.
        assert_eq!(
            actions.calls(),
            vec![ActionCall::SuspendPrint, ActionCall::SuspendHeater]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unparsable_charge_withholds_resume() {
        let script = vec![ok("OL", "100"), ok("OB", "95"), ok("OL", "n/a")];
        let (result, actions) = run_script(script, PollOptions::default()).await;
        result.unwrap();
        assert_eq!(
            actions.calls(),
            vec![ActionCall::SuspendPrint, ActionCall::SuspendHeater]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_unknown_dispatches_nothing() {
        let script = vec![ok("OL", "100"), ok("WAIT", "100"), ok("WAIT", "100")];
        let (result, actions) = run_script(script, PollOptions::default()).await;
        result.unwrap();
        assert!(actions.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_policy_aborts_on_first_failure() {
        let script = vec![ok("OL", "100"), ScriptedTick::fail()];
        let (result, _) = run_script(script, PollOptions::default()).await;
        assert!(matches!(result, Err(Error::ConnectionClosed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_continue_policy_rides_out_failures() {
        let script = vec![
            ok("OL", "100"),
            ScriptedTick::fail(),
            ok("OB", "95"),
            ok("OL", "95"),
        ];
        let options = PollOptions::builder()
            .failure_policy(FailurePolicy::Continue { max_consecutive: None })
            .build();
        let (result, actions) = run_script(script, options).await;
        result.unwrap();
        assert_eq!(actions.calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_continue_policy_gives_up_after_max_consecutive() {
        let script = vec![
            ok("OL", "100"),
            ScriptedTick::fail(),
            ScriptedTick::fail(),
            ok("OL", "100"),
        ];
        let options = PollOptions::builder()
            .failure_policy(FailurePolicy::Continue { max_consecutive: Some(2) })
            .build();
        let (result, _) = run_script(script, options).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_policy_redials_the_source() {
        let script = vec![ok("OL", "100"), ScriptedTick::fail(), ok("OL", "100")];
        let options = PollOptions::builder()
            .failure_policy(FailurePolicy::Reconnect {
                max_attempts: 3,
                delay: Duration::from_secs(1),
            })
            .build();
        let cancel = CancellationToken::new();
        let source = MockSource::new(script, cancel.clone());
        let reconnects = source.reconnect_count();
        let actions = MockActions::default();
        let monitor = UpsMonitor::new(source, actions, options).unwrap();
        monitor.run(cancel).await.unwrap();
        assert_eq!(reconnects.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_the_sleep() {
        let cancel = CancellationToken::new();
        // Endless healthy script; only cancellation can end the loop.
        let source = MockSource::repeating("OL", "100");
        let actions = MockActions::default();
        let monitor = UpsMonitor::new(source, actions, PollOptions::default()).unwrap();
        let handle = tokio::spawn(monitor.run(cancel.clone()));
        tokio::time::sleep(Duration::from_secs(12)).await;
        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_describe_the_edges() {
        let script = vec![ok("OL", "100"), ok("OB", "95"), ok("OL", "95")];
        let cancel = CancellationToken::new();
        let source = MockSource::new(script, cancel.clone());
        let monitor = UpsMonitor::new(source, MockActions::default(), PollOptions::default()).unwrap();
        let mut rx = monitor.subscribe();
        monitor.run(cancel).await.unwrap();

        let mut edges = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let MonitorEvent::StatusChanged { from, to } = event {
                edges.push((from, to));
            }
        }
        assert_eq!(
            edges,
            vec![
                (PowerStatus::Online, PowerStatus::OnBattery),
                (PowerStatus::OnBattery, PowerStatus::Online),
            ]
        );
    }

    #[test]
    fn test_power_status_matches_exhaustively_from_here() {
        // Compile-time check that the status set stays closed for callers
        // outside nutmon-types, since on_edge matches without a wildcard.
        for status in [
            PowerStatus::Online,
            PowerStatus::OnBattery,
            PowerStatus::Unknown,
        ] {
            let label = match status {
                PowerStatus::Online => "online",
                PowerStatus::OnBattery => "on_battery",
                PowerStatus::Unknown => "unknown",
            };
            assert!(!label.is_empty());
        }
    }

    #[test]
    fn test_poll_options_validation() {
        let options = PollOptions::builder().interval(Duration::ZERO).build();
        assert!(options.validate().is_err());

        let options = PollOptions::builder().resume_threshold(120.0).build();
        assert!(options.validate().is_err());

        assert!(PollOptions::default().validate().is_ok());
    }
}
