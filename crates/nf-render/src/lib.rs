//! Terminal dashboard for neuroflight.
//!
//! Draws the published display snapshot: PSD chart with peak markers,
//! band gauges, flight status sidebar and help overlay.

pub mod ui;
