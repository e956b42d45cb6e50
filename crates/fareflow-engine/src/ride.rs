//! Per-ride fare estimation: a nested pipeline over one ride's records.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use csv::StringRecord;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use fareflow_pipeline::{generate, merge_errors, reduce, sink};

use crate::config::Config;
use crate::error::Error;
use crate::position::Position;
use crate::segment::{Price, Segment, FARE_FLAG, FARE_MINIMUM};

/// Final estimate for one ride.
#[derive(Debug, Clone, PartialEq)]
pub struct RideFare {
    pub ride_id: i64,
    pub fare: Price,
}

/// One ride's raw records, consumed from the front as the inner pipeline
/// generates positions. The cursor is owned exclusively by the ride task.
pub(crate) struct Ride {
    ride_id_hint: Option<i64>,
    lines: VecDeque<StringRecord>,
    max_speed: f64,
}

impl Ride {
    pub(crate) fn new(lines: Vec<StringRecord>, config: &Config) -> Result<Self, Error> {
        config.validate()?;
        let ride_id_hint = lines
            .first()
            .and_then(|line| line.get(0))
            .and_then(|field| field.parse().ok());
        Ok(Self {
            ride_id_hint,
            lines: lines.into(),
            max_speed: config.max_speed,
        })
    }

    /// Run the inner pipeline and emit exactly one [`RideFare`] on `out`.
    ///
    /// Malformed records and invalid segments are skipped; the ride still
    /// produces a fare from whatever remains. Any other inner error aborts
    /// the ride. A result ready at cancellation time is dropped.
    pub(crate) async fn run(
        self,
        cancel: &CancellationToken,
        out: &mpsc::Sender<RideFare>,
    ) -> Result<(), Error> {
        let Ride {
            ride_id_hint,
            mut lines,
            max_speed,
        } = self;

        let (positions, position_errors) = generate(cancel.clone(), move || {
            let Some(line) = lines.pop_front() else {
                return Err(Error::LinesEmpty);
            };
            // Malformed records are dropped, not fatal.
            Ok(parse_position(&line).ok())
        });

        let discarded = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&discarded);
        let (segments, segment_errors) = reduce(cancel.clone(), positions, move |p1, p2| {
            match Segment::new(p1, p2, max_speed) {
                Ok(segment) => Ok(Some(segment)),
                Err(_) => {
                    counter.fetch_add(1, Ordering::Relaxed);
                    Ok(None)
                }
            }
        });

        let mut total: Price = FARE_FLAG;
        let mut ride_id = ride_id_hint;
        sink(cancel, segments, |segment: Segment| {
            total += segment.fare();
            ride_id = Some(segment.ride_id());
            Ok::<(), Error>(())
        })
        .await?;

        let skipped = discarded.load(Ordering::Relaxed);
        if skipped > 0 {
            tracing::debug!(
                ride_id = ride_id.unwrap_or_default(),
                skipped,
                "discarded invalid segments"
            );
        }

        let mut inner_errors = merge_errors(vec![position_errors, segment_errors]);
        while let Some(err) = inner_errors.recv().await {
            if err.is_fatal() {
                return Err(err);
            }
        }

        let estimate = RideFare {
            ride_id: ride_id.unwrap_or_default(),
            fare: total.max(FARE_MINIMUM),
        };
        tokio::select! {
            biased;
            () = cancel.cancelled() => {}
            _ = out.send(estimate) => {}
        }
        Ok(())
    }
}

fn parse_position(line: &StringRecord) -> Result<Position, Error> {
    let field = |index: usize, name: &'static str| {
        line.get(index).ok_or(Error::Parse {
            field: name,
            value: String::new(),
        })
    };
    Position::parse(
        field(0, "ride_id")?,
        field(1, "latitude")?,
        field(2, "longitude")?,
        field(3, "timestamp")?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    fn config() -> Config {
        Config {
            max_speed: 100.0,
            concurrency: 1,
        }
    }

    async fn estimate(lines: Vec<StringRecord>) -> RideFare {
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(1);
        Ride::new(lines, &config())
            .unwrap()
            .run(&cancel, &tx)
            .await
            .unwrap();
        rx.recv().await.unwrap()
    }

    #[tokio::test]
    async fn short_slow_ride_hits_the_minimum() {
        let fare = estimate(vec![
            record(&["1", "37.966660", "23.728308", "1405594957"]),
            record(&["1", "37.966627", "23.728263", "1405594966"]),
            record(&["1", "37.966625", "23.728263", "1405594974"]),
            record(&["1", "37.966613", "23.728375", "1405594984"]),
            record(&["1", "37.966203", "23.728597", "1405594992"]),
        ])
        .await;
        assert_eq!(fare, RideFare { ride_id: 1, fare: FARE_MINIMUM });
    }

    #[tokio::test]
    async fn single_position_ride_keeps_its_id() {
        let fare = estimate(vec![record(&["7", "37.9", "23.7", "1405594957"])]).await;
        assert_eq!(fare, RideFare { ride_id: 7, fare: FARE_MINIMUM });
    }

    #[tokio::test]
    async fn malformed_record_in_the_middle_is_skipped() {
        let fare = estimate(vec![
            record(&["3", "37.966660", "23.728308", "1405594957"]),
            record(&["3", "not-a-latitude", "23.728263", "1405594966"]),
            record(&["3", "37.966627", "23.728263", "1405594975"]),
        ])
        .await;
        assert_eq!(fare.ride_id, 3);
        assert!(fare.fare >= FARE_MINIMUM);
    }

    #[tokio::test]
    async fn outlier_speed_leaves_only_the_minimum() {
        // ~111 km in one second is far past max_speed.
        let fare = estimate(vec![
            record(&["9", "37.0", "23.0", "1405594957"]),
            record(&["9", "38.0", "23.0", "1405594958"]),
        ])
        .await;
        assert_eq!(fare, RideFare { ride_id: 9, fare: FARE_MINIMUM });
    }

    #[tokio::test]
    async fn cancellation_drops_the_result() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, mut rx) = mpsc::channel(1);
        let lines = vec![record(&["1", "37.9", "23.7", "1405594957"])];
        let result = Ride::new(lines, &config()).unwrap().run(&cancel, &tx).await;
        assert!(result.is_err());
        drop(tx);
        assert_eq!(rx.recv().await, None);
    }
}
