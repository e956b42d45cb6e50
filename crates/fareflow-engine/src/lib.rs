//! Fare estimation engine.
//!
//! Consumes a CSV stream of `(ride_id, latitude, longitude, unix_seconds)`
//! records and produces one `(ride_id, fare)` record per contiguous ride.
//! The work is organised as two nested pipelines built from the
//! [`fareflow_pipeline`] stages: the outer one groups records by ride and
//! fans rides across a worker pool; each worker runs an inner pipeline that
//! turns positions into validated segments and folds them into a fare.

pub mod config;
pub mod error;
pub mod estimator;
pub mod haversine;
pub mod position;
pub mod ride;
pub mod segment;

pub use config::Config;
pub use error::Error;
pub use estimator::Estimator;
pub use ride::RideFare;
pub use segment::{Price, Segment, FARE_FLAG, FARE_MINIMUM};
