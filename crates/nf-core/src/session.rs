use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::command::FlightMode;

/// One-way kill switch for a flight session.
///
/// Starts released. [`SessionLock::engage`] is the only transition and it is
/// irreversible, there is no `release`. Stop handlers (Esc key,
/// Ctrl-C) engage it; the worker checks it at the top of every cycle.
///
/// # Example
/// ```
/// use nf_core::session::SessionLock;
/// let lock = SessionLock::new();
/// assert!(!lock.is_engaged());
/// assert!(lock.engage());
/// assert!(!lock.engage()); // already engaged
/// assert!(lock.is_engaged());
/// ```
#[derive(Debug, Default)]
pub struct SessionLock {
    engaged: AtomicBool,
}

impl SessionLock {
    /// New, released lock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            engaged: AtomicBool::new(false),
        }
    }

    /// Engage the lock. Returns `true` if this call performed the transition.
    pub fn engage(&self) -> bool {
        !self.engaged.swap(true, Ordering::AcqRel)
    }

    /// `true` once any stop signal has been raised.
    #[inline]
    #[must_use]
    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::Acquire)
    }
}

/// Process-wide maneuver selector, written by the configuration side and
/// read by the worker.
///
/// # Example
/// ```
/// use nf_core::command::FlightMode;
/// use nf_core::session::ModeSelector;
/// let modes = ModeSelector::new(1);
/// assert_eq!(modes.mode(), FlightMode::PresetA);
/// modes.set_index(9);
/// assert_eq!(modes.mode(), FlightMode::Forward);
/// ```
#[derive(Debug)]
pub struct ModeSelector {
    index: AtomicU8,
}

impl ModeSelector {
    /// Selector starting at the given mode index.
    #[must_use]
    pub fn new(index: u8) -> Self {
        Self {
            index: AtomicU8::new(index),
        }
    }

    /// Store a new mode index (1, 2, or anything else).
    #[inline]
    pub fn set_index(&self, index: u8) {
        self.index.store(index, Ordering::Relaxed);
    }

    /// Raw index as last written.
    #[inline]
    #[must_use]
    pub fn index(&self) -> u8 {
        self.index.load(Ordering::Relaxed)
    }

    /// Maneuver currently selected.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> FlightMode {
        FlightMode::from_index(self.index())
    }
}

impl Default for ModeSelector {
    fn default() -> Self {
        Self::new(1)
    }
}
