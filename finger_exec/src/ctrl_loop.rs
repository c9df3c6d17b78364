//! # Control loop
//!
//! The loop ties the [`SetpointRegister`], a [`StateEstimator`], a [`ControlLaw`] and a
//! [`CommandSink`] together. Each tick reads the latest target and joint state, computes one
//! command and emits it.
//!
//! The loop has two states, expressed as two types:
//!
//! - [`ControlLoop`]: inactive. Nothing happens on its own, but [`ControlLoop::tick`] can be called
//!   by an external scheduler (or a test).
//! - [`RunningLoop`]: returned by [`ControlLoop::start`]. A timer thread ticks the loop at a fixed
//!   period until [`RunningLoop::stop`] is called, which hands the inactive loop back.
//!
//! The timer sleeps towards absolute deadlines. A tick that finishes after the next deadline is an
//! overrun: it is logged and counted, and the schedule restarts from that instant rather than
//! trying to catch up.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, trace, warn};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use crate::{
    law::ControlLaw,
    setpoint::SetpointRegister,
    sink::CommandSink,
    state_est::StateEstimator,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default period of the loop.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(10);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An inactive control loop.
pub struct ControlLoop<L, E, S> {
    setpoint: Arc<SetpointRegister>,
    law: L,
    estimator: E,
    sink: S,
    period: Duration,
    stats: Arc<LoopStats>,
}

/// A control loop ticking on its own timer thread.
///
/// Dropping a running loop stops it, but the inactive loop is lost. Use [`RunningLoop::stop`] to
/// get it back.
pub struct RunningLoop<L, E, S> {
    setpoint: Arc<SetpointRegister>,
    stats: Arc<LoopStats>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<thread::JoinHandle<ControlLoop<L, E, S>>>,
}

/// Counters describing the loop's execution so far.
///
/// These are updated by the timer thread and may be read from anywhere while the loop runs.
#[derive(Debug, Default)]
pub struct LoopStats {
    ticks: AtomicU64,
    overruns: AtomicU64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("The loop period must be positive and finite, found {0} s")]
    InvalidPeriod(f64),

    #[error("Could not spawn the loop's timer thread: {0}")]
    SpawnError(std::io::Error),

    #[error("The loop's timer thread panicked")]
    ThreadPanicked,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<L, E, S> ControlLoop<L, E, S>
where
    L: ControlLaw,
    E: StateEstimator,
    S: CommandSink,
{
    /// Create a new inactive loop.
    pub fn new(
        setpoint: Arc<SetpointRegister>,
        law: L,
        estimator: E,
        sink: S,
        period: Duration,
    ) -> Result<Self, LoopError> {
        if period == Duration::from_secs(0) {
            return Err(LoopError::InvalidPeriod(0.0));
        }

        Ok(Self {
            setpoint,
            law,
            estimator,
            sink,
            period,
            stats: Arc::new(LoopStats::default()),
        })
    }

    /// Run a single tick of the loop, returning the command that was emitted.
    ///
    /// `dt_s` is the time since the previous tick and is passed through to the law.
    pub fn tick(&mut self, dt_s: f64) -> f64 {
        let target_rad = self.setpoint.get();
        let state = self.estimator.estimate();

        let command = self.law.compute(target_rad, state, dt_s);
        self.sink.emit(command);

        self.stats.ticks.fetch_add(1, Ordering::Relaxed);

        trace!(
            "Tick: target {:.4} rad, position {:.4} rad, velocity {:.4} rad/s, command {:.4}",
            target_rad,
            state.position_rad,
            state.velocity_rads,
            command
        );

        command
    }

    pub fn setpoint(&self) -> &Arc<SetpointRegister> {
        &self.setpoint
    }

    pub fn law(&self) -> &L {
        &self.law
    }

    pub fn law_mut(&mut self) -> &mut L {
        &mut self.law
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stats(&self) -> &Arc<LoopStats> {
        &self.stats
    }
}

impl<L, E, S> ControlLoop<L, E, S>
where
    L: ControlLaw + 'static,
    E: StateEstimator + 'static,
    S: CommandSink + 'static,
{
    /// Start ticking the loop on a timer thread.
    pub fn start(self) -> Result<RunningLoop<L, E, S>, LoopError> {
        let setpoint = self.setpoint.clone();
        let stats = self.stats.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        info!("Starting control loop with a period of {:?}", self.period);

        let join_handle = thread::Builder::new()
            .name("ctrl_loop".into())
            .spawn(move || run(self, shutdown_clone))
            .map_err(LoopError::SpawnError)?;

        Ok(RunningLoop {
            setpoint,
            stats,
            shutdown,
            join_handle: Some(join_handle),
        })
    }
}

impl<L, E, S> RunningLoop<L, E, S> {
    /// Stop the loop.
    ///
    /// Any tick in progress completes first. No ticks happen after this returns.
    pub fn stop(mut self) -> Result<ControlLoop<L, E, S>, LoopError> {
        let ctrl_loop = self.signal_and_join()?;

        info!(
            "Control loop stopped after {} ticks ({} overruns)",
            self.stats.ticks(),
            self.stats.overruns()
        );

        Ok(ctrl_loop)
    }

    pub fn setpoint(&self) -> &Arc<SetpointRegister> {
        &self.setpoint
    }

    pub fn stats(&self) -> &Arc<LoopStats> {
        &self.stats
    }

    fn signal_and_join(&mut self) -> Result<ControlLoop<L, E, S>, LoopError> {
        self.shutdown.store(true, Ordering::Release);

        let jh = self.join_handle.take().ok_or(LoopError::ThreadPanicked)?;

        // Wake the timer thread if it's waiting for its next deadline
        jh.thread().unpark();

        jh.join().map_err(|_| LoopError::ThreadPanicked)
    }
}

impl<L, E, S> Drop for RunningLoop<L, E, S> {
    fn drop(&mut self) {
        if self.join_handle.is_some() && self.signal_and_join().is_err() {
            warn!("Control loop thread panicked");
        }
    }
}

impl LoopStats {
    /// Number of ticks executed.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Number of ticks which finished after the following tick was due.
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Convert a period in seconds into a [`Duration`] usable by the loop.
pub fn period_from_secs(period_s: f64) -> Result<Duration, LoopError> {
    match Duration::try_from_secs_f64(period_s) {
        Ok(d) if d > Duration::from_secs(0) => Ok(d),
        _ => Err(LoopError::InvalidPeriod(period_s)),
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Timer thread body.
fn run<L, E, S>(mut ctrl_loop: ControlLoop<L, E, S>, shutdown: Arc<AtomicBool>) -> ControlLoop<L, E, S>
where
    L: ControlLaw,
    E: StateEstimator,
    S: CommandSink,
{
    let period = ctrl_loop.period;
    let mut last_tick: Option<Instant> = None;
    let mut deadline = Instant::now();

    debug!("Control loop thread running");

    while !shutdown.load(Ordering::Acquire) {
        let tick_start = Instant::now();

        // First tick gets the nominal period
        let dt_s = match last_tick {
            Some(t) => tick_start.duration_since(t).as_secs_f64(),
            None => period.as_secs_f64(),
        };
        last_tick = Some(tick_start);

        ctrl_loop.tick(dt_s);

        deadline += period;

        let now = Instant::now();
        if now > deadline {
            warn!(
                "Control loop overrun by {:.06} s",
                now.duration_since(deadline).as_secs_f64()
            );
            ctrl_loop.stats.overruns.fetch_add(1, Ordering::Relaxed);
            deadline = now;
            continue;
        }

        // Parking may return early, so keep waiting until the deadline or a shutdown
        loop {
            let now = Instant::now();
            if now >= deadline || shutdown.load(Ordering::Acquire) {
                break;
            }
            thread::park_timeout(deadline - now);
        }
    }

    debug!("Control loop thread exiting");

    ctrl_loop
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        law::{FnLaw, PdLaw},
        sim::{FingerPlant, PlantParams},
        sink::FnSink,
        state_est::{FixedState, FnEstimator, JointState},
    };
    use std::sync::{mpsc, Mutex};

    fn pd_loop(target: f64, state: JointState) -> ControlLoop<PdLaw, FixedState, Vec<f64>> {
        ControlLoop::new(
            Arc::new(SetpointRegister::new(target)),
            PdLaw::default(),
            FixedState(state),
            Vec::new(),
            DEFAULT_PERIOD,
        )
        .unwrap()
    }

    /// Law which records the `dt` of each call and outputs zero.
    struct DtRecorder(Vec<f64>);

    impl ControlLaw for DtRecorder {
        fn compute(&mut self, _target_rad: f64, _state: JointState, dt_s: f64) -> f64 {
            self.0.push(dt_s);
            0.0
        }
    }

    #[test]
    fn test_tick_scenarios() {
        // Positive error, no motion
        let mut l = pd_loop(1.0, JointState::new(0.0, 0.0));
        assert_eq!(l.tick(0.01), 3.5);

        // No error, moving
        let mut l = pd_loop(0.0, JointState::new(0.0, 2.0));
        assert_eq!(l.tick(0.01), -0.2);

        // At rest on target
        let mut l = pd_loop(0.5, JointState::new(0.5, 0.0));
        assert_eq!(l.tick(0.01), 0.0);
    }

    #[test]
    fn test_unset_setpoint_holds_zero() {
        let mut l = ControlLoop::new(
            Arc::new(SetpointRegister::default()),
            PdLaw::default(),
            FixedState::default(),
            Vec::new(),
            DEFAULT_PERIOD,
        )
        .unwrap();

        for _ in 0..5 {
            assert_eq!(l.tick(0.01), 0.0);
        }
        assert_eq!(l.sink(), &vec![0.0; 5]);
    }

    #[test]
    fn test_one_command_per_tick() {
        let mut l = pd_loop(1.0, JointState::default());

        for i in 1..=10 {
            l.tick(0.01);
            assert_eq!(l.sink().len(), i);
        }
        assert_eq!(l.stats().ticks(), 10);
    }

    #[test]
    fn test_tick_reads_latest_setpoint() {
        let mut l = pd_loop(0.0, JointState::default());

        l.setpoint().set(0.2);
        l.setpoint().set(1.0);
        assert_eq!(l.tick(0.01), 3.5);

        l.setpoint().set(f64::NAN);
        assert!(l.tick(0.01).is_nan());
    }

    #[test]
    fn test_law_can_be_replaced() {
        let mut l = ControlLoop::new(
            Arc::new(SetpointRegister::new(2.0)),
            FnLaw(|target: f64, position: f64, _velocity: f64| 10.0 * (target - position)),
            FixedState(JointState::new(1.5, 0.0)),
            Vec::new(),
            DEFAULT_PERIOD,
        )
        .unwrap();

        assert_eq!(l.tick(0.01), 5.0);
    }

    #[test]
    fn test_invalid_period() {
        assert!(ControlLoop::new(
            Arc::new(SetpointRegister::default()),
            PdLaw::default(),
            FixedState::default(),
            Vec::new(),
            Duration::from_secs(0),
        )
        .is_err());

        assert_eq!(period_from_secs(0.01).unwrap(), Duration::from_millis(10));
        assert!(period_from_secs(0.0).is_err());
        assert!(period_from_secs(-0.01).is_err());
        assert!(period_from_secs(f64::NAN).is_err());
        assert!(period_from_secs(f64::INFINITY).is_err());
    }

    #[test]
    fn test_running_loop_emits_once_per_tick() {
        let (tx, rx) = mpsc::channel();
        let register = Arc::new(SetpointRegister::new(1.0));

        let l = ControlLoop::new(
            register.clone(),
            PdLaw::default(),
            FixedState::default(),
            tx,
            Duration::from_millis(1),
        )
        .unwrap();

        let running = l.start().unwrap();
        thread::sleep(Duration::from_millis(50));

        register.set(0.5);
        thread::sleep(Duration::from_millis(50));

        let stopped = running.stop().unwrap();
        let commands: Vec<f64> = rx.try_iter().collect();

        assert!(!commands.is_empty());
        assert_eq!(commands.len() as u64, stopped.stats().ticks());
        assert_eq!(commands[0], 3.5);
        assert_eq!(*commands.last().unwrap(), 1.75);

        // Nothing after stop
        thread::sleep(Duration::from_millis(10));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_running_loop_passes_elapsed_time() {
        let period = Duration::from_millis(2);

        let l = ControlLoop::new(
            Arc::new(SetpointRegister::default()),
            DtRecorder(Vec::new()),
            FixedState::default(),
            Vec::new(),
            period,
        )
        .unwrap();

        let running = l.start().unwrap();
        thread::sleep(Duration::from_millis(30));
        let stopped = running.stop().unwrap();

        let dts = &stopped.law().0;
        assert!(dts.len() >= 2);
        assert_eq!(dts[0], period.as_secs_f64());
        assert!(dts[1..].iter().all(|&dt| dt > 0.0));
        assert_eq!(dts.len(), stopped.sink().len());
    }

    #[test]
    fn test_drop_stops_loop() {
        let (tx, rx) = mpsc::channel();

        let running = ControlLoop::new(
            Arc::new(SetpointRegister::new(1.0)),
            PdLaw::default(),
            FixedState::default(),
            tx,
            Duration::from_millis(1),
        )
        .unwrap()
        .start()
        .unwrap();

        thread::sleep(Duration::from_millis(10));
        drop(running);

        // The sender went with the loop so the channel drains then disconnects
        let _ = rx.try_iter().count();
        assert!(matches!(rx.try_recv(), Err(mpsc::TryRecvError::Disconnected)));
    }

    #[test]
    fn test_closed_loop_with_plant() {
        let plant = Arc::new(Mutex::new(FingerPlant::new(PlantParams::default()).unwrap()));
        let plant_est = plant.clone();
        let plant_sink = plant.clone();

        let mut l = ControlLoop::new(
            Arc::new(SetpointRegister::new(0.5)),
            PdLaw::default(),
            FnEstimator(move || plant_est.lock().unwrap().state()),
            FnSink(move |command: f64| {
                plant_sink.lock().unwrap().step(command);
            }),
            DEFAULT_PERIOD,
        )
        .unwrap();

        for _ in 0..1000 {
            l.tick(0.01);
        }

        // Proportional control against the spring settles short of the target at
        // k_p * target / (k_p + stiffness)
        let expected = 3.5 * 0.5 / (3.5 + 0.65);
        let state = plant.lock().unwrap().state();
        assert!((state.position_rad - expected).abs() < 1e-3);
        assert!(state.velocity_rads.abs() < 1e-3);
    }
}
