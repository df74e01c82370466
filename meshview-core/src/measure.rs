//! Point-to-point distance measurements.
//!
//! A [`MeasurementSession`] pairs picked points into [`Measurement`]s. It is
//! `Idle` until a first point arrives, then `Pending` until the second one
//! completes the measurement. Every mutating call returns the transition it
//! caused so a UI can update without polling.

use nalgebra::Point3;
use serde::Serialize;

use crate::pick::PickPoint;

/// A completed measurement between two picked points
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    /// Creation order, starting at 1
    pub id: u64,
    pub start: PickPoint,
    pub end: PickPoint,
    pub distance: f64,
}

impl Measurement {
    fn new(id: u64, start: PickPoint, end: PickPoint) -> Self {
        Self {
            id,
            start,
            end,
            distance: distance(&start, &end),
        }
    }

    /// Where the distance label is anchored.
    pub fn midpoint(&self) -> Point3<f64> {
        nalgebra::center(&self.start, &self.end)
    }

    /// Distance with `precision` decimals, e.g. `"5.000 units"`.
    pub fn label(&self, precision: usize) -> String {
        format!("{:.*} units", precision, self.distance)
    }
}

/// Euclidean distance in model units.
pub fn distance(a: &PickPoint, b: &PickPoint) -> f64 {
    (b - a).norm()
}

/// Measurement state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasureState {
    Idle,
    Pending { start: PickPoint },
}

/// Observable transitions of a [`MeasurementSession`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeasurementEvent {
    /// First point recorded; waiting for the second.
    Started { start: PickPoint },
    /// Second point recorded; the measurement was appended to the list.
    Completed { measurement: Measurement },
    /// The pending first point was dropped.
    Cancelled { start: PickPoint },
    /// Measurement mode flipped. `discarded` is the pending start, if any.
    ModeChanged {
        enabled: bool,
        discarded: Option<PickPoint>,
    },
    /// All measurements removed.
    Cleared { removed: usize },
}

#[derive(Debug, Clone)]
pub struct MeasurementSession {
    mode_enabled: bool,
    state: MeasureState,
    measurements: Vec<Measurement>,
    next_id: u64,
}

impl MeasurementSession {
    pub fn new() -> Self {
        Self {
            mode_enabled: false,
            state: MeasureState::Idle,
            measurements: Vec::new(),
            next_id: 1,
        }
    }

    pub fn mode_enabled(&self) -> bool {
        self.mode_enabled
    }

    pub fn state(&self) -> MeasureState {
        self.state
    }

    pub fn pending_start(&self) -> Option<PickPoint> {
        match self.state {
            MeasureState::Idle => None,
            MeasureState::Pending { start } => Some(start),
        }
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    /// Feed a picked point. Ignored while measurement mode is off.
    pub fn record(&mut self, point: PickPoint) -> Option<MeasurementEvent> {
        if !self.mode_enabled {
            return None;
        }

        let event = match self.state {
            MeasureState::Idle => {
                self.state = MeasureState::Pending { start: point };
                log::debug!("measurement started at {point:?}");
                MeasurementEvent::Started { start: point }
            }
            MeasureState::Pending { start } => {
                let measurement = Measurement::new(self.next_id, start, point);
                self.next_id += 1;
                self.state = MeasureState::Idle;
                self.measurements.push(measurement.clone());
                log::debug!(
                    "measurement #{} completed: {:.6}",
                    measurement.id,
                    measurement.distance
                );
                MeasurementEvent::Completed { measurement }
            }
        };
        Some(event)
    }

    pub fn toggle_mode(&mut self) -> MeasurementEvent {
        self.mode_enabled = !self.mode_enabled;
        let discarded = if self.mode_enabled {
            None
        } else {
            self.take_pending()
        };
        log::debug!("measurement mode {}", if self.mode_enabled { "on" } else { "off" });
        MeasurementEvent::ModeChanged {
            enabled: self.mode_enabled,
            discarded,
        }
    }

    /// Drop the pending first point, if there is one.
    pub fn cancel(&mut self) -> Option<MeasurementEvent> {
        let start = self.take_pending()?;
        log::debug!("measurement cancelled");
        Some(MeasurementEvent::Cancelled { start })
    }

    pub fn clear_all(&mut self) -> MeasurementEvent {
        let removed = self.measurements.len();
        self.measurements.clear();
        self.state = MeasureState::Idle;
        log::debug!("cleared {removed} measurements");
        MeasurementEvent::Cleared { removed }
    }

    fn take_pending(&mut self) -> Option<PickPoint> {
        let start = self.pending_start();
        self.state = MeasureState::Idle;
        start
    }
}

impl Default for MeasurementSession {
    fn default() -> Self {
        Self::new()
    }
}
