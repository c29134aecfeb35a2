use std::any::Any;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use arc_swap::ArcSwap;
use flume::Receiver;
use nf_core::command::{CommandCode, FlightInput, FlightState, ManualCommand};
use nf_core::config::PipelineConfig;
use nf_core::display::{DisplayBoard, DisplayFrame, DisplaySnapshot, FlightStatus};
use nf_core::session::{ModeSelector, SessionLock};
use nf_core::traits::{Actuator, SensorSource};
use nf_dsp::Analyzer;
use nf_source::StreamReader;

use crate::error::SessionError;
use crate::state_machine::{FlightStateMachine, Transition};

/// Shared handles the worker runs against.
#[derive(Clone)]
pub struct SessionContext {
    pub config: Arc<ArcSwap<PipelineConfig>>,
    pub lock: Arc<SessionLock>,
    pub modes: Arc<ModeSelector>,
    pub board: Arc<DisplayBoard>,
    pub manual: Receiver<ManualCommand>,
}

/// How the session ended.
#[derive(Debug)]
pub enum SessionExit {
    /// The lock was engaged.
    Stopped,
    Failed(SessionError),
}

/// Summary returned by the worker after its guaranteed landing.
#[derive(Debug)]
pub struct SessionReport {
    pub exit: SessionExit,
    pub cycles: u64,
    pub actuations: u64,
    pub final_state: FlightState,
    /// The shutdown landing was acknowledged.
    pub landing_ok: bool,
}

/// Spawn the worker on its own thread (`nf-worker`).
///
/// # Errors
/// Returns an error if the thread cannot be spawned.
pub fn spawn_session<S, A>(
    source: S,
    actuator: A,
    ctx: SessionContext,
) -> anyhow::Result<JoinHandle<SessionReport>>
where
    S: SensorSource + 'static,
    A: Actuator + 'static,
{
    let handle = thread::Builder::new()
        .name("nf-worker".to_string())
        .spawn(move || run_session(source, actuator, &ctx))?;
    Ok(handle)
}

/// Acquire, analyse and actuate until the lock is engaged or a fatal error
/// occurs, then land.
///
/// Landing is attempted on every exit path and never raises.
pub fn run_session<S: SensorSource, A: Actuator>(
    source: S,
    actuator: A,
    ctx: &SessionContext,
) -> SessionReport {
    let config = ctx.config.load_full();
    let mut worker = Worker {
        reader: StreamReader::new(source, &config),
        fsm: FlightStateMachine::new(actuator, Arc::clone(&ctx.modes), config.move_distance_cm),
        analyzer: None,
        loaded: Arc::clone(&config),
        ctx,
        cycles: 0,
        last_command: None,
        frame: None,
    };
    log::info!("Flight session started");

    let exit = match Analyzer::new(&config) {
        Ok(analyzer) => {
            worker.analyzer = Some(analyzer);
            worker.run()
        }
        Err(err) => {
            log::error!("Cannot build analyzer: {err}");
            SessionExit::Failed(err.into())
        }
    };

    let landing_ok = worker.fsm.shutdown();
    worker.publish(false, true);

    let report = SessionReport {
        exit,
        cycles: worker.cycles,
        actuations: worker.fsm.actuations(),
        final_state: worker.fsm.state(),
        landing_ok,
    };
    log::info!(
        "Flight session over after {} cycles, {} actuations ({:?})",
        report.cycles,
        report.actuations,
        report.exit
    );
    report
}

struct Worker<'a, S, A> {
    reader: StreamReader<S>,
    fsm: FlightStateMachine<A>,
    analyzer: Option<Analyzer>,
    loaded: Arc<PipelineConfig>,
    ctx: &'a SessionContext,
    cycles: u64,
    last_command: Option<CommandCode>,
    frame: Option<Arc<DisplayFrame>>,
}

impl<S: SensorSource, A: Actuator> Worker<'_, S, A> {
    fn run(&mut self) -> SessionExit {
        loop {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.cycle()));
            let err = match outcome {
                Ok(Ok(ControlFlow::Continue(()))) => continue,
                Ok(Ok(ControlFlow::Break(()))) => return SessionExit::Stopped,
                // A producer shutting down after the stop is part of the stop.
                Ok(Err(SessionError::Source(err))) if self.ctx.lock.is_engaged() => {
                    log::info!("Sensor stream closed after stop: {err}");
                    return SessionExit::Stopped;
                }
                Ok(Err(err)) => err,
                Err(payload) => SessionError::Panic(panic_message(payload.as_ref())),
            };
            log::error!("Flight session aborted: {err}");
            // Failed actuations already went through the emergency path.
            if !matches!(err, SessionError::Actuator(_)) {
                self.fsm.emergency_land();
            }
            return SessionExit::Failed(err);
        }
    }

    fn cycle(&mut self) -> Result<ControlFlow<()>, SessionError> {
        if self.ctx.lock.is_engaged() {
            self.step(FlightInput::Abort)?;
            return Ok(ControlFlow::Break(()));
        }

        let manual: Vec<ManualCommand> = self.ctx.manual.try_iter().collect();
        for command in manual {
            self.step(FlightInput::Manual(command))?;
        }

        self.reload();

        let chunk = self.reader.next_chunk()?;
        self.cycles += 1;
        let code = if chunk.is_empty() {
            None
        } else {
            match self.analyzer.as_mut().map(|a| a.analyze(&chunk)) {
                Some(Ok(analysis)) => {
                    self.frame = Some(Arc::new(analysis.display));
                    Some(analysis.decision.command)
                }
                Some(Err(err)) => {
                    log::debug!("Skipping cycle {}: {err}", self.cycles);
                    None
                }
                None => None,
            }
        };
        if code.is_some() {
            self.last_command = code;
        }
        self.publish(false, false);

        if let Some(code) = code {
            // The lock may have been engaged while this cycle was pulling.
            let input = if self.ctx.lock.is_engaged() {
                FlightInput::Abort
            } else {
                FlightInput::Code(code)
            };
            self.step(input)?;
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Feed one input to the state machine, announcing actuations first.
    fn step(&mut self, input: FlightInput) -> Result<Transition, SessionError> {
        if self.fsm.plan(input).is_some() {
            self.publish(true, false);
        }
        let transition = self.fsm.handle(input, &mut self.reader)?;
        if matches!(transition, Transition::Actuated { .. }) {
            self.publish(false, false);
        }
        Ok(transition)
    }

    /// Rebuild the analyzer when a new configuration was stored.
    fn reload(&mut self) {
        let current = self.ctx.config.load_full();
        if Arc::ptr_eq(&current, &self.loaded) {
            return;
        }
        match Analyzer::new(&current) {
            Ok(analyzer) => {
                self.analyzer = Some(analyzer);
                self.reader.reconfigure(&current);
                self.fsm.set_move_distance(current.move_distance_cm);
                log::info!(
                    "Analyzer rebuilt: channel {}, {}-{} Hz",
                    current.channel,
                    current.lower_cutoff_hz,
                    current.upper_cutoff_hz
                );
            }
            Err(err) => log::warn!("Configuration rejected, keeping previous analyzer: {err}"),
        }
        self.loaded = current;
    }

    fn publish(&self, actuating: bool, session_over: bool) {
        self.ctx.board.publish(DisplaySnapshot {
            frame: self.frame.clone(),
            flight: FlightStatus {
                state: self.fsm.state(),
                locked: self.fsm.is_locked() || self.ctx.lock.is_engaged(),
                mode: self.ctx.modes.mode(),
                last_command: self.last_command,
                actuating,
                actuations: self.fsm.actuations(),
            },
            stream: self.reader.status(),
            cycle: self.cycles,
            session_over,
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
