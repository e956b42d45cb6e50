//! Error taxonomy for the estimation pipeline.
//!
//! Two of the variants are flow-control sentinels rather than faults:
//! [`Error::EndOfStream`] ends the outer record generator and
//! [`Error::LinesEmpty`] ends a ride's position generator. Both travel the
//! error channels like any other error and are filtered out by the drains.

use fareflow_pipeline::Canceled;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `max_speed` must be greater than zero.
    #[error("max_speed must be greater than zero")]
    ConfigMaxSpeed,

    /// `concurrency` must be greater than zero.
    #[error("concurrency must be greater than zero")]
    ConfigConcurrency,

    /// A record field failed to parse or was out of range.
    #[error("malformed {field}: {value:?}")]
    Parse { field: &'static str, value: String },

    /// Two positions do not form a valid motion segment.
    #[error("invalid segment: {0}")]
    Segment(#[from] SegmentViolation),

    /// A stage observed cancellation.
    #[error("{0} canceled")]
    Canceled(&'static str),

    /// CSV read or write failure.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Output flush failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Sentinel: a ride's line cursor is exhausted.
    #[error("ride lines are empty")]
    LinesEmpty,

    /// Sentinel: the record source reached end of input.
    #[error("end of input stream")]
    EndOfStream,
}

/// Why a pair of positions was rejected by [`crate::Segment::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SegmentViolation {
    #[error("positions belong to different rides")]
    RideMismatch,
    #[error("duration is not positive")]
    NonPositiveDuration,
    #[error("speed is outside the accepted range")]
    SpeedOutOfRange,
}

impl Error {
    /// Whether an error surfacing on a merged error stream aborts the run.
    /// The two end-of-stream sentinels are the only benign kinds.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::EndOfStream | Error::LinesEmpty)
    }
}

impl Canceled for Error {
    fn canceled(stage: &'static str) -> Self {
        Error::Canceled(stage)
    }
}
