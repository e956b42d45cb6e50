//! Generic streaming pipeline substrate.
//!
//! A pipeline is assembled from five stage kinds, each running as its own
//! task and communicating over bounded [`tokio::sync::mpsc`] channels:
//!
//! - [`generate`]: turn a pull-style producer function into an event stream
//! - [`group`]: accumulate consecutive events that belong together
//! - [`reduce`]: fold pairs of consecutive events into derived events
//! - [`worker_pool`]: fan events out across N concurrent workers
//! - [`sink`]: consume the stream in the caller's task
//!
//! Every stage except [`sink`] returns an event receiver and an error
//! receiver; [`merge_errors`] fans any number of error receivers into one
//! stream for a single drain after the sink completes.
//!
//! Channels are bounded with capacity [`EVENT_CHANNEL_CAPACITY`], so a slow
//! stage pauses its upstream. Every blocking send and receive races the
//! shared [`CancellationToken`], and cancellation wins when both are ready:
//! a cancelled stage stops producing, closes its event channel, and then
//! reports through its error channel.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod merge;
pub mod stage;

pub use merge::merge_errors;
pub use stage::{generate, group, reduce, sink, worker_pool};

/// Capacity of inter-stage event channels. One slot keeps stages in
/// lockstep: an emitter can stay one event ahead of its consumer, no more.
pub const EVENT_CHANNEL_CAPACITY: usize = 1;

/// Implemented by error types flowing through a pipeline so that a stage can
/// report its own cancellation without knowing the concrete error taxonomy.
pub trait Canceled {
    /// Build the error a stage emits when it observes cancellation.
    fn canceled(stage: &'static str) -> Self;
}
