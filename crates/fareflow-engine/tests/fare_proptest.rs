use std::io::Cursor;

use csv::StringRecord;
use proptest::prelude::*;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use fareflow_pipeline::group;

use fareflow_engine::{Config, Error, Estimator, FARE_MINIMUM};

/// Point counts per ride; ride ids are assigned sequentially so every group
/// in the generated input is a distinct contiguous run.
fn point_counts() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..5, 0..8)
}

fn build_input(point_counts: &[usize]) -> String {
    let mut input = String::new();
    for (ride_index, &points) in point_counts.iter().enumerate() {
        let ride_id = ride_index as i64 + 1;
        for point in 0..points {
            // Slow drift around a fixed location: every segment stays valid.
            let lat = 37.966_0 + point as f64 * 0.000_01;
            let lon = 23.728_0 + point as f64 * 0.000_01;
            let ts = 1_405_594_957 + point as i64 * 10;
            input.push_str(&format!("{ride_id},{lat:.6},{lon:.6},{ts}\n"));
        }
    }
    input
}

fn estimate(input: String, concurrency: usize) -> String {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    runtime.block_on(async move {
        let mut out = Vec::new();
        let config = Config {
            max_speed: 100.0,
            concurrency,
        };
        Estimator::new(Cursor::new(input), &mut out, config)
            .expect("valid config")
            .run(CancellationToken::new())
            .await
            .expect("pipeline run");
        String::from_utf8(out).expect("ascii output")
    })
}

proptest! {
    #[test]
    fn one_output_row_per_contiguous_ride(counts in point_counts()) {
        let output = estimate(build_input(&counts), 1);
        prop_assert_eq!(output.lines().count(), counts.len());
    }

    #[test]
    fn every_fare_respects_the_minimum(counts in point_counts(), concurrency in 1usize..5) {
        let output = estimate(build_input(&counts), concurrency);
        for line in output.lines() {
            let (_, fare) = line.split_once(',').expect("two columns");
            prop_assert!(fare.parse::<f32>().expect("numeric fare") >= FARE_MINIMUM);
        }
    }

    #[test]
    fn single_position_rides_pay_exactly_the_minimum(ride_id in 1i64..10_000) {
        let input = format!("{ride_id},37.9,23.7,1405594957\n");
        let output = estimate(input, 1);
        prop_assert_eq!(output, format!("{ride_id},3.47\n"));
    }

    #[test]
    fn grouping_rides_then_flattening_preserves_the_records(counts in point_counts()) {
        let records: Vec<StringRecord> = build_input(&counts)
            .lines()
            .map(|line| StringRecord::from(line.split(',').collect::<Vec<_>>()))
            .collect();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        let fed = records.clone();
        let flattened = runtime.block_on(async move {
            let (tx, rx) = mpsc::channel(1);
            tokio::spawn(async move {
                for record in fed {
                    if tx.send(record).await.is_err() {
                        return;
                    }
                }
            });
            let (mut groups, _errors) = group(
                CancellationToken::new(),
                rx,
                |line: &StringRecord, current: &[StringRecord]| {
                    Ok::<_, Error>(line.get(0) == current[0].get(0))
                },
            );
            let mut flattened = Vec::new();
            while let Some(ride) = groups.recv().await {
                flattened.extend(ride);
            }
            flattened
        });
        prop_assert_eq!(flattened, records);
    }
}
