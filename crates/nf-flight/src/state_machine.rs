use std::sync::Arc;

use nf_core::command::{CommandCode, Direction, FlightInput, FlightMode, FlightState, ManualCommand};
use nf_core::error::ActuatorError;
use nf_core::session::ModeSelector;
use nf_core::traits::{Actuator, BufferFlush};

/// One actuator operation chosen by the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Takeoff,
    Land,
    Maneuver(FlightMode),
    Move(Direction),
    Up,
    Down,
    Flip(Direction),
}

impl Action {
    /// State after the action succeeds.
    fn next_state(self, current: FlightState) -> FlightState {
        match self {
            Self::Takeoff => FlightState::Airborne,
            Self::Land => FlightState::Grounded,
            _ => current,
        }
    }
}

/// Outcome of one [`FlightStateMachine::handle`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// No actuation for this input in this state.
    Ignored,
    /// The session is locked; nothing was emitted.
    Aborted,
    /// One actuation completed, bracketed by buffer flushes.
    Actuated {
        action: Action,
        from: FlightState,
        to: FlightState,
    },
}

/// Single writer of actuator state.
///
/// Turns classifier codes and operator commands into actuations:
///
/// | input                     | Grounded           | Airborne                       |
/// |---------------------------|--------------------|--------------------------------|
/// | `AlphaDominant`           | takeoff, Airborne  | land, Grounded                 |
/// | `BetaDominant`            | no-op              | maneuver from [`ModeSelector`] |
/// | `BothDominant`, `Neither` | no-op              | no-op                          |
///
/// Every actuation is immediately preceded and followed by a buffer flush.
/// A failed actuation triggers an emergency landing and forces `Grounded`.
/// Once locked, nothing is emitted until [`FlightStateMachine::shutdown`].
pub struct FlightStateMachine<A> {
    actuator: A,
    state: FlightState,
    locked: bool,
    modes: Arc<ModeSelector>,
    move_distance_cm: u32,
    actuations: u64,
    /// Result of the shutdown landing, once it ran.
    landing: Option<bool>,
}

impl<A: Actuator> FlightStateMachine<A> {
    /// Session start: `Grounded`, unlocked.
    #[must_use]
    pub fn new(actuator: A, modes: Arc<ModeSelector>, move_distance_cm: u32) -> Self {
        Self {
            actuator,
            state: FlightState::Grounded,
            locked: false,
            modes,
            move_distance_cm,
            actuations: 0,
            landing: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> FlightState {
        self.state
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Completed actuations this session.
    #[must_use]
    pub fn actuations(&self) -> u64 {
        self.actuations
    }

    #[must_use]
    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn set_move_distance(&mut self, distance_cm: u32) {
        self.move_distance_cm = distance_cm;
    }

    /// Action `input` would trigger now, without side effects.
    #[must_use]
    pub fn plan(&self, input: FlightInput) -> Option<Action> {
        if self.locked || self.landing.is_some() {
            return None;
        }
        let airborne = self.state == FlightState::Airborne;
        let toggle = if airborne { Action::Land } else { Action::Takeoff };
        match input {
            FlightInput::Abort => None,
            FlightInput::Code(CommandCode::AlphaDominant)
            | FlightInput::Manual(ManualCommand::ToggleFlight) => Some(toggle),
            FlightInput::Code(code) if code.triggers_maneuver() && airborne => {
                Some(Action::Maneuver(self.modes.mode()))
            }
            FlightInput::Code(_) => None,
            FlightInput::Manual(_) if !airborne => None,
            FlightInput::Manual(ManualCommand::Move(d)) => Some(Action::Move(d)),
            FlightInput::Manual(ManualCommand::Flip(d)) => Some(Action::Flip(d)),
            FlightInput::Manual(ManualCommand::Up) => Some(Action::Up),
            FlightInput::Manual(ManualCommand::Down) => Some(Action::Down),
        }
    }

    /// Consume one input.
    ///
    /// # Errors
    /// Returns the [`ActuatorError`] of a failed actuation, after the
    /// emergency landing has been issued.
    pub fn handle(
        &mut self,
        input: FlightInput,
        flush: &mut impl BufferFlush,
    ) -> Result<Transition, ActuatorError> {
        if input == FlightInput::Abort {
            if !self.locked {
                log::info!("Flight session locked; command emission suppressed");
            }
            self.locked = true;
        }
        if self.locked {
            return Ok(Transition::Aborted);
        }
        let Some(action) = self.plan(input) else {
            return Ok(Transition::Ignored);
        };

        let from = self.state;
        flush.flush();
        if let Err(err) = self.perform(action) {
            log::error!("Actuation {action:?} failed: {err}");
            self.emergency_land();
            return Err(err);
        }
        self.state = action.next_state(from);
        self.actuations += 1;
        flush.flush();

        log::info!("{action:?}: {from:?} -> {:?}", self.state);
        Ok(Transition::Actuated {
            action,
            from,
            to: self.state,
        })
    }

    fn perform(&mut self, action: Action) -> Result<(), ActuatorError> {
        let distance = self.move_distance_cm;
        let a = &mut self.actuator;
        match action {
            Action::Takeoff => a.takeoff(),
            Action::Land => a.land(),
            Action::Maneuver(FlightMode::PresetA) => a.preset_maneuver_a(),
            Action::Maneuver(FlightMode::PresetB) => a.preset_maneuver_b(),
            Action::Maneuver(FlightMode::Forward) => a.move_forward(distance),
            Action::Move(d) => a.move_by(d, distance),
            Action::Up => a.move_up(),
            Action::Down => a.move_down(),
            Action::Flip(d) => a.flip(d),
        }
    }

    /// Cut the motors and force `Grounded`. Failures are logged only.
    pub fn emergency_land(&mut self) {
        if let Err(err) = self.actuator.emergency_land() {
            log::error!("Emergency landing failed: {err}");
        }
        self.state = FlightState::Grounded;
    }

    /// Guaranteed landing at session end. Runs once; later calls return the
    /// first result without touching the actuator.
    ///
    /// Returns whether the landing was acknowledged.
    pub fn shutdown(&mut self) -> bool {
        if let Some(ok) = self.landing {
            return ok;
        }
        self.locked = true;
        let ok = match self.actuator.land() {
            Ok(()) => true,
            Err(err) => {
                log::error!("Shutdown landing failed: {err}");
                false
            }
        };
        self.state = FlightState::Grounded;
        self.landing = Some(ok);
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Flush,
        Takeoff,
        Land,
        Emergency,
        Move(Direction, u32),
        Up,
        Down,
        Flip(Direction),
    }

    type Log = Arc<Mutex<Vec<Call>>>;

    struct MockActuator {
        log: Log,
        airborne: bool,
        fail_on: Option<Call>,
    }

    impl MockActuator {
        fn record(&mut self, call: Call) -> Result<(), ActuatorError> {
            self.log.lock().unwrap().push(call.clone());
            if self.fail_on.as_ref() == Some(&call) {
                return Err(ActuatorError::Timeout(format!("{call:?}")));
            }
            Ok(())
        }
    }

    impl Actuator for MockActuator {
        fn takeoff(&mut self) -> Result<(), ActuatorError> {
            self.record(Call::Takeoff)?;
            self.airborne = true;
            Ok(())
        }
        fn land(&mut self) -> Result<(), ActuatorError> {
            self.record(Call::Land)?;
            self.airborne = false;
            Ok(())
        }
        fn emergency_land(&mut self) -> Result<(), ActuatorError> {
            self.airborne = false;
            self.record(Call::Emergency)
        }
        fn move_by(&mut self, d: Direction, cm: u32) -> Result<(), ActuatorError> {
            self.record(Call::Move(d, cm))
        }
        fn move_up(&mut self) -> Result<(), ActuatorError> {
            self.record(Call::Up)
        }
        fn move_down(&mut self) -> Result<(), ActuatorError> {
            self.record(Call::Down)
        }
        fn flip(&mut self, d: Direction) -> Result<(), ActuatorError> {
            self.record(Call::Flip(d))
        }
        fn is_airborne(&self) -> bool {
            self.airborne
        }
    }

    struct MockFlush(Log);

    impl BufferFlush for MockFlush {
        fn flush(&mut self) -> usize {
            self.0.lock().unwrap().push(Call::Flush);
            0
        }
    }

    struct Rig {
        fsm: FlightStateMachine<MockActuator>,
        flush: MockFlush,
        log: Log,
        modes: Arc<ModeSelector>,
    }

    impl Rig {
        fn new() -> Self {
            Self::failing(None)
        }

        fn failing(fail_on: Option<Call>) -> Self {
            let log: Log = Arc::default();
            let modes = Arc::new(ModeSelector::new(1));
            let actuator = MockActuator {
                log: Arc::clone(&log),
                airborne: false,
                fail_on,
            };
            Self {
                fsm: FlightStateMachine::new(actuator, Arc::clone(&modes), 20),
                flush: MockFlush(Arc::clone(&log)),
                log,
                modes,
            }
        }

        fn feed(&mut self, input: FlightInput) -> Result<Transition, ActuatorError> {
            self.fsm.handle(input, &mut self.flush)
        }

        fn code(&mut self, code: CommandCode) -> Transition {
            self.feed(FlightInput::Code(code)).unwrap()
        }

        fn calls(&self) -> Vec<Call> {
            self.log.lock().unwrap().clone()
        }

        fn clear(&self) {
            self.log.lock().unwrap().clear();
        }
    }

    #[test]
    fn alpha_takes_off_then_lands() {
        let mut rig = Rig::new();
        assert_eq!(
            rig.code(CommandCode::AlphaDominant),
            Transition::Actuated {
                action: Action::Takeoff,
                from: FlightState::Grounded,
                to: FlightState::Airborne,
            }
        );
        assert_eq!(rig.calls(), vec![Call::Flush, Call::Takeoff, Call::Flush]);
        assert!(rig.fsm.actuator().is_airborne());

        rig.clear();
        rig.code(CommandCode::AlphaDominant);
        assert_eq!(rig.fsm.state(), FlightState::Grounded);
        assert_eq!(rig.calls(), vec![Call::Flush, Call::Land, Call::Flush]);
    }

    #[test]
    fn only_alpha_leaves_the_ground() {
        for code in [CommandCode::BetaDominant, CommandCode::BothDominant, CommandCode::Neither] {
            let mut rig = Rig::new();
            assert_eq!(rig.code(code), Transition::Ignored);
            assert_eq!(rig.fsm.state(), FlightState::Grounded);
            assert!(rig.calls().is_empty(), "{code:?} touched the actuator");
        }
    }

    #[test]
    fn beta_runs_selected_maneuver_while_airborne() {
        let mut rig = Rig::new();
        rig.code(CommandCode::AlphaDominant);

        rig.clear();
        rig.code(CommandCode::BetaDominant);
        assert_eq!(
            rig.calls(),
            vec![
                Call::Flush,
                Call::Move(Direction::Forward, 20),
                Call::Move(Direction::Back, 20),
                Call::Flush
            ]
        );
        assert_eq!(rig.fsm.state(), FlightState::Airborne);

        rig.modes.set_index(2);
        rig.clear();
        rig.code(CommandCode::BetaDominant);
        assert_eq!(
            rig.calls(),
            vec![Call::Flush, Call::Flip(Direction::Left), Call::Flip(Direction::Right), Call::Flush]
        );

        rig.modes.set_index(3);
        rig.fsm.set_move_distance(35);
        rig.clear();
        rig.code(CommandCode::BetaDominant);
        assert_eq!(
            rig.calls(),
            vec![Call::Flush, Call::Move(Direction::Forward, 35), Call::Flush]
        );
    }

    #[test]
    fn neither_and_both_never_actuate() {
        let mut rig = Rig::new();
        rig.code(CommandCode::AlphaDominant);
        rig.clear();
        assert_eq!(rig.code(CommandCode::Neither), Transition::Ignored);
        assert_eq!(rig.code(CommandCode::BothDominant), Transition::Ignored);
        assert!(rig.calls().is_empty());
    }

    #[test]
    fn every_actuation_is_bracketed_by_flushes() {
        let mut rig = Rig::new();
        let inputs = [
            FlightInput::Code(CommandCode::AlphaDominant),
            FlightInput::Code(CommandCode::BetaDominant),
            FlightInput::Manual(ManualCommand::Up),
            FlightInput::Manual(ManualCommand::Flip(Direction::Forward)),
            FlightInput::Code(CommandCode::Neither),
            FlightInput::Manual(ManualCommand::ToggleFlight),
        ];
        for input in inputs {
            rig.feed(input).unwrap();
        }
        let calls = rig.calls();
        // Each actuation group starts and ends with a flush.
        let mut i = 0;
        while i < calls.len() {
            assert_eq!(calls[i], Call::Flush, "at {i}: {calls:?}");
            let end = calls[i + 1..].iter().position(|c| *c == Call::Flush).unwrap() + i + 1;
            assert!(end > i + 1, "empty actuation group at {i}");
            i = end + 1;
        }
        assert_eq!(rig.fsm.actuations(), 5);
    }

    #[test]
    fn manual_motion_needs_flight() {
        let mut rig = Rig::new();
        for cmd in [
            ManualCommand::Move(Direction::Left),
            ManualCommand::Flip(Direction::Back),
            ManualCommand::Up,
            ManualCommand::Down,
        ] {
            assert_eq!(rig.feed(FlightInput::Manual(cmd)).unwrap(), Transition::Ignored);
        }
        assert!(rig.calls().is_empty());

        rig.feed(FlightInput::Manual(ManualCommand::ToggleFlight)).unwrap();
        rig.clear();
        rig.feed(FlightInput::Manual(ManualCommand::Move(Direction::Left))).unwrap();
        assert_eq!(
            rig.calls(),
            vec![Call::Flush, Call::Move(Direction::Left, 20), Call::Flush]
        );
    }

    #[test]
    fn abort_locks_for_good() {
        let mut rig = Rig::new();
        rig.code(CommandCode::AlphaDominant);
        rig.clear();
        assert_eq!(rig.feed(FlightInput::Abort).unwrap(), Transition::Aborted);
        for input in [
            FlightInput::Code(CommandCode::AlphaDominant),
            FlightInput::Code(CommandCode::BetaDominant),
            FlightInput::Manual(ManualCommand::ToggleFlight),
        ] {
            assert_eq!(rig.feed(input).unwrap(), Transition::Aborted);
        }
        assert!(rig.calls().is_empty());
        assert!(rig.fsm.is_locked());

        assert!(rig.fsm.shutdown());
        assert!(rig.fsm.shutdown());
        assert_eq!(rig.calls(), vec![Call::Land]);
        assert_eq!(rig.fsm.state(), FlightState::Grounded);
    }

    #[test]
    fn failed_actuation_lands_in_emergency() {
        let mut rig = Rig::failing(Some(Call::Move(Direction::Forward, 20)));
        rig.code(CommandCode::AlphaDominant);
        rig.clear();

        let err = rig.feed(FlightInput::Code(CommandCode::BetaDominant)).unwrap_err();
        assert!(matches!(err, ActuatorError::Timeout(_)));
        assert_eq!(rig.fsm.state(), FlightState::Grounded);
        assert_eq!(
            rig.calls(),
            vec![Call::Flush, Call::Move(Direction::Forward, 20), Call::Emergency]
        );
    }

    #[test]
    fn failed_shutdown_landing_is_reported_not_raised() {
        let mut rig = Rig::failing(Some(Call::Land));
        assert!(!rig.fsm.shutdown());
        assert_eq!(rig.fsm.state(), FlightState::Grounded);
    }

    #[test]
    fn plan_is_side_effect_free() {
        let rig = Rig::new();
        assert_eq!(rig.fsm.plan(FlightInput::Code(CommandCode::AlphaDominant)), Some(Action::Takeoff));
        assert_eq!(rig.fsm.plan(FlightInput::Code(CommandCode::BetaDominant)), None);
        assert!(rig.calls().is_empty());
    }
}
