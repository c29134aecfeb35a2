// Flight control: command state machine, actuator drivers and the worker session.

pub mod actuator;
pub mod error;
pub mod session;
pub mod state_machine;

pub use actuator::{SimulatedActuator, TelloActuator};
pub use error::SessionError;
pub use session::{SessionContext, SessionExit, SessionReport, run_session, spawn_session};
pub use state_machine::{FlightStateMachine, Transition};
