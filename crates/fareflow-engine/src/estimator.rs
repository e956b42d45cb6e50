//! The outer estimation pipeline: records -> rides -> fares -> CSV.

use std::io::{Read, Write};

use csv::StringRecord;
use tokio_util::sync::CancellationToken;

use fareflow_pipeline::{generate, group, merge_errors, sink, worker_pool};

use crate::config::Config;
use crate::error::Error;
use crate::ride::{Ride, RideFare};

/// Streams ride positions from `reader` and writes one fare estimate per
/// contiguous ride to `writer`.
///
/// Records are expected as headerless CSV rows
/// `ride_id,latitude,longitude,unix_timestamp`, contiguous by ride id.
pub struct Estimator<R, W> {
    reader: R,
    writer: W,
    config: Config,
}

impl<R, W> Estimator<R, W>
where
    R: Read + Send + 'static,
    W: Write,
{
    pub fn new(reader: R, writer: W, config: Config) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            reader,
            writer,
            config,
        })
    }

    /// Run the pipeline to completion or cancellation.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error observed: a malformed source read, a
    /// write failure, a ride worker fault, or cancellation.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), Error> {
        let config = self.config;
        tracing::debug!(
            concurrency = config.concurrency,
            max_speed = config.max_speed,
            "starting estimation run"
        );

        let mut records = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(self.reader)
            .into_records();
        let (lines, read_errors) = generate(cancel.clone(), move || match records.next() {
            None => Err(Error::EndOfStream),
            Some(Err(err)) => Err(Error::Csv(err)),
            Some(Ok(record)) => Ok(Some(record)),
        });

        let (rides, group_errors) = group(
            cancel.clone(),
            lines,
            |line: &StringRecord, current: &[StringRecord]| {
                Ok::<_, Error>(line.get(0) == current[0].get(0))
            },
        );

        let (fares, ride_errors) = worker_pool(
            cancel.clone(),
            config.concurrency,
            rides,
            move |cancel, lines: Vec<StringRecord>, out| async move {
                Ride::new(lines, &config)?.run(&cancel, &out).await
            },
        );

        let mut output = csv::Writer::from_writer(self.writer);
        let mut rides_estimated = 0u64;
        sink(&cancel, fares, |fare: RideFare| {
            output.write_record(&[fare.ride_id.to_string(), format!("{:.2}", fare.fare)])?;
            rides_estimated += 1;
            Ok::<(), Error>(())
        })
        .await?;
        output.flush()?;

        tracing::info!(rides = rides_estimated, "estimation run complete");

        let mut errors = merge_errors(vec![read_errors, group_errors, ride_errors]);
        while let Some(err) = errors.recv().await {
            if err.is_fatal() {
                return Err(err);
            }
        }
        Ok(())
    }
}
