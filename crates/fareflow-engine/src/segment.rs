//! Validated motion segments and the fare rules.

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::error::SegmentViolation;
use crate::position::Position;

/// Monetary amount; presented with two decimals.
pub type Price = f32;

pub const FARE_IDLE_PER_HOUR: f64 = 11.9;
pub const FARE_MOVING_MIDNIGHT: f64 = 1.30;
pub const FARE_MOVING_NORMAL: f64 = 0.74;
/// Flat amount added once per ride.
pub const FARE_FLAG: Price = 1.30;
/// Lower bound on any ride fare.
pub const FARE_MINIMUM: Price = 3.47;

/// Below this speed a segment is billed as idle time, km/h.
const IDLE_SPEED_KMH: f64 = 10.0;
/// Last hour of day (inclusive) inside the midnight tariff window.
const MIDNIGHT_LAST_HOUR: u32 = 5;

/// The motion between two consecutive same-ride positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    ride_id: i64,
    /// km/h
    speed: f64,
    /// km
    distance: f64,
    duration: Duration,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl Segment {
    /// Derive a segment from two consecutive positions of one ride.
    ///
    /// # Errors
    ///
    /// Rejects position pairs from different rides, with non-positive
    /// duration, or whose implied speed is negative or above `max_speed`.
    pub fn new(p1: &Position, p2: &Position, max_speed: f64) -> Result<Self, SegmentViolation> {
        if p1.ride_id != p2.ride_id {
            return Err(SegmentViolation::RideMismatch);
        }
        let duration = p2.timestamp - p1.timestamp;
        if duration <= Duration::zero() {
            return Err(SegmentViolation::NonPositiveDuration);
        }
        let distance = p2.distance(p1);
        let hours = duration.num_seconds() as f64 / 3600.0;
        let speed = distance / hours;
        if !(0.0..=max_speed).contains(&speed) {
            return Err(SegmentViolation::SpeedOutOfRange);
        }

        Ok(Self {
            ride_id: p1.ride_id,
            speed,
            distance,
            duration,
            started_at: p1.timestamp,
            finished_at: p2.timestamp,
        })
    }

    pub fn ride_id(&self) -> i64 {
        self.ride_id
    }

    /// Price of this segment.
    ///
    /// Rule priority: idle time wins over any moving tariff; the midnight
    /// tariff applies only when the start hour is within [0, 5] and the
    /// finish hour has not passed 5.
    pub fn fare(&self) -> Price {
        if self.speed <= IDLE_SPEED_KMH {
            let minutes = self.duration.num_seconds() as f64 / 60.0;
            return (minutes / 60.0 * FARE_IDLE_PER_HOUR) as f32;
        }
        if self.started_at.hour() <= MIDNIGHT_LAST_HOUR
            && self.finished_at.hour() <= MIDNIGHT_LAST_HOUR
        {
            (self.distance * FARE_MOVING_MIDNIGHT) as f32
        } else {
            (self.distance * FARE_MOVING_NORMAL) as f32
        }
    }
}
