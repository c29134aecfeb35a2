use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};

use nf_core::command::Direction;
use nf_core::error::ActuatorError;
use nf_core::traits::Actuator;

/// Actuator that only logs what it would do.
///
/// Tracks the airborne flag like a real vehicle and can simulate command
/// latency, which lets the sensor queue fill up during an actuation.
///
/// # Example
/// ```
/// use nf_core::traits::Actuator;
/// use nf_flight::SimulatedActuator;
/// let mut sim = SimulatedActuator::new();
/// sim.takeoff().unwrap();
/// assert!(sim.is_airborne());
/// assert_eq!(sim.commands(), ["takeoff"]);
/// ```
#[derive(Debug, Default)]
pub struct SimulatedActuator {
    airborne: bool,
    latency: Duration,
    commands: Vec<String>,
}

impl SimulatedActuator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command takes `latency` to complete.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Commands issued so far, in SDK text form.
    #[must_use]
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    fn issue(&mut self, command: String) {
        log::info!("[sim] {command}");
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        self.commands.push(command);
    }
}

impl Actuator for SimulatedActuator {
    fn takeoff(&mut self) -> Result<(), ActuatorError> {
        self.issue("takeoff".into());
        self.airborne = true;
        Ok(())
    }

    fn land(&mut self) -> Result<(), ActuatorError> {
        self.issue("land".into());
        self.airborne = false;
        Ok(())
    }

    fn emergency_land(&mut self) -> Result<(), ActuatorError> {
        self.issue("emergency".into());
        self.airborne = false;
        Ok(())
    }

    fn move_by(&mut self, direction: Direction, distance_cm: u32) -> Result<(), ActuatorError> {
        self.issue(format!("{} {distance_cm}", move_verb(direction)));
        Ok(())
    }

    fn move_up(&mut self) -> Result<(), ActuatorError> {
        self.issue(format!("up {TELLO_STEP_CM}"));
        Ok(())
    }

    fn move_down(&mut self) -> Result<(), ActuatorError> {
        self.issue(format!("down {TELLO_STEP_CM}"));
        Ok(())
    }

    fn flip(&mut self, direction: Direction) -> Result<(), ActuatorError> {
        self.issue(format!("flip {}", flip_code(direction)));
        Ok(())
    }

    fn is_airborne(&self) -> bool {
        self.airborne
    }
}

/// Default Tello command address.
pub const TELLO_ADDR: &str = "192.168.10.1:8889";
/// Vertical step and minimum move distance accepted by the SDK.
const TELLO_STEP_CM: u32 = 20;
const TELLO_MAX_MOVE_CM: u32 = 500;

fn move_verb(direction: Direction) -> &'static str {
    match direction {
        Direction::Forward => "forward",
        Direction::Back => "back",
        Direction::Left => "left",
        Direction::Right => "right",
    }
}

fn flip_code(direction: Direction) -> char {
    match direction {
        Direction::Forward => 'f',
        Direction::Back => 'b',
        Direction::Left => 'l',
        Direction::Right => 'r',
    }
}

/// Tello quadcopter over the UDP text SDK.
///
/// Each command waits for the `ok` acknowledgement; any other reply, or
/// silence past the timeout, is an error. Commands are never retried.
///
/// Replies carry no command id. Datagrams queued before a command are
/// discarded, and after a timeout the next reply from the drone is taken as
/// the late answer to the timed-out command.
pub struct TelloActuator {
    socket: UdpSocket,
    drone: SocketAddr,
    timeout: Duration,
    airborne: bool,
    /// A timed-out command may still be answered.
    late_reply_due: bool,
}

impl TelloActuator {
    /// Bind a local socket, then enter SDK mode with `command`.
    ///
    /// # Errors
    /// [`ActuatorError::Link`] if the socket cannot be set up, or the error of
    /// the `command` handshake.
    pub fn connect(drone: SocketAddr, timeout: Duration) -> Result<Self, ActuatorError> {
        let local: SocketAddr = if drone.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local).map_err(link)?;

        let mut tello = Self {
            socket,
            drone,
            timeout,
            airborne: false,
            late_reply_due: false,
        };
        tello.send("command")?;
        log::info!("Tello SDK mode at {drone}");
        Ok(tello)
    }

    /// Drop every datagram already queued on the socket.
    fn discard_stale(&mut self) -> Result<(), ActuatorError> {
        self.socket.set_nonblocking(true).map_err(link)?;
        let mut buf = [0u8; 256];
        while let Ok((n, from)) = self.socket.recv_from(&mut buf) {
            if from == self.drone {
                self.late_reply_due = false;
            }
            log::debug!("tello: discarding stale {:?}", String::from_utf8_lossy(&buf[..n]));
        }
        self.socket.set_nonblocking(false).map_err(link)
    }

    fn send(&mut self, command: &str) -> Result<(), ActuatorError> {
        self.discard_stale()?;
        log::debug!("tello <- {command}");
        self.socket.send_to(command.as_bytes(), self.drone).map_err(link)?;

        let deadline = Instant::now() + self.timeout;
        let mut buf = [0u8; 256];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.late_reply_due = true;
                return Err(ActuatorError::Timeout(command.to_string()));
            }
            self.socket.set_read_timeout(Some(remaining)).map_err(link)?;
            match self.socket.recv_from(&mut buf) {
                // Ignore stray datagrams from anything but the drone.
                Ok((_, from)) if from != self.drone => {}
                Ok((n, _)) => {
                    let reply = String::from_utf8_lossy(&buf[..n]).trim().to_string();
                    if self.late_reply_due {
                        self.late_reply_due = false;
                        log::debug!("tello: late reply {reply:?} to an earlier command");
                        continue;
                    }
                    log::debug!("tello -> {reply}");
                    return if reply.eq_ignore_ascii_case("ok") {
                        Ok(())
                    } else {
                        Err(ActuatorError::Rejected {
                            command: command.to_string(),
                            reply,
                        })
                    };
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                Err(e) => return Err(link(e)),
            }
        }
    }
}

fn link(err: std::io::Error) -> ActuatorError {
    ActuatorError::Link(err.to_string())
}

impl Actuator for TelloActuator {
    fn takeoff(&mut self) -> Result<(), ActuatorError> {
        self.send("takeoff")?;
        self.airborne = true;
        Ok(())
    }

    fn land(&mut self) -> Result<(), ActuatorError> {
        self.send("land")?;
        self.airborne = false;
        Ok(())
    }

    fn emergency_land(&mut self) -> Result<(), ActuatorError> {
        // Motors stop whatever the reply.
        self.airborne = false;
        self.send("emergency")
    }

    fn move_by(&mut self, direction: Direction, distance_cm: u32) -> Result<(), ActuatorError> {
        let distance = distance_cm.clamp(TELLO_STEP_CM, TELLO_MAX_MOVE_CM);
        self.send(&format!("{} {distance}", move_verb(direction)))
    }

    fn move_up(&mut self) -> Result<(), ActuatorError> {
        self.send(&format!("up {TELLO_STEP_CM}"))
    }

    fn move_down(&mut self) -> Result<(), ActuatorError> {
        self.send(&format!("down {TELLO_STEP_CM}"))
    }

    fn flip(&mut self, direction: Direction) -> Result<(), ActuatorError> {
        self.send(&format!("flip {}", flip_code(direction)))
    }

    fn is_airborne(&self) -> bool {
        self.airborne
    }
}
