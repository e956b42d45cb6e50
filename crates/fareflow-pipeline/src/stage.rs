//! The five pipeline stage constructors.
//!
//! Each constructor (except [`sink`]) spawns the stage task and hands back
//! `(events, errors)` receivers. Stage tasks drop their event sender before
//! sending a terminal error, so consumers always observe the event channel
//! closing first.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::{Canceled, EVENT_CHANNEL_CAPACITY};

/// Repeatedly invoke `produce` in a dedicated task and forward its items.
///
/// `Ok(Some(item))` is forwarded, `Ok(None)` is skipped, and the first
/// `Err` terminates the stage and is reported on the error channel. The
/// producer signals end-of-stream by returning its sentinel error.
/// Cancellation terminates the stage with `E::canceled("generate")`.
pub fn generate<T, E, F>(
    cancel: CancellationToken,
    mut produce: F,
) -> (mpsc::Receiver<T>, mpsc::Receiver<E>)
where
    T: Send + 'static,
    E: Canceled + Send + 'static,
    F: FnMut() -> Result<Option<T>, E> + Send + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (err_tx, err_rx) = mpsc::channel(1);

    tokio::spawn(async move {
        let fault = loop {
            if cancel.is_cancelled() {
                break Some(E::canceled("generate"));
            }
            match produce() {
                Err(err) => break Some(err),
                Ok(None) => {
                    // A skip performs no channel operation, so yield to keep
                    // the stage cooperative on skip-heavy streams.
                    tokio::task::yield_now().await;
                }
                Ok(Some(item)) => {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break Some(E::canceled("generate")),
                        sent = event_tx.send(item) => {
                            if sent.is_err() {
                                break None;
                            }
                        }
                    }
                }
            }
        };
        drop(event_tx);
        if let Some(err) = fault {
            let _ = err_tx.send(err).await;
        }
    });

    (event_rx, err_rx)
}

/// Accumulate consecutive input items into groups.
///
/// A group starts with the first item; each following item is tested with
/// `belongs(item, group)`. A `false` verdict emits the completed group and
/// starts a new one with the current item. When the input closes, or when
/// `belongs` errors, the pending group is flushed before the stage
/// terminates; cancellation flushes nothing.
pub fn group<T, E, F>(
    cancel: CancellationToken,
    mut input: mpsc::Receiver<T>,
    mut belongs: F,
) -> (mpsc::Receiver<Vec<T>>, mpsc::Receiver<E>)
where
    T: Send + 'static,
    E: Canceled + Send + 'static,
    F: FnMut(&T, &[T]) -> Result<bool, E> + Send + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (err_tx, err_rx) = mpsc::channel(1);

    tokio::spawn(async move {
        let mut current: Vec<T> = Vec::new();
        let fault = loop {
            let item = tokio::select! {
                biased;
                () = cancel.cancelled() => break Some(E::canceled("group")),
                received = input.recv() => match received {
                    Some(item) => item,
                    None => break None,
                },
            };
            if current.is_empty() {
                current.push(item);
                continue;
            }
            match belongs(&item, &current) {
                Err(err) => break Some(err),
                Ok(true) => current.push(item),
                Ok(false) => {
                    let completed = std::mem::replace(&mut current, vec![item]);
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break Some(E::canceled("group")),
                        sent = event_tx.send(completed) => {
                            if sent.is_err() {
                                break None;
                            }
                        }
                    }
                }
            }
        };
        if !current.is_empty() {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                _ = event_tx.send(current) => {}
            }
        }
        drop(event_tx);
        if let Some(err) = fault {
            let _ = err_tx.send(err).await;
        }
    });

    (event_rx, err_rx)
}

/// Fold pairs of consecutive items with a sliding window of one.
///
/// The first item is absorbed without emission. Every later item is paired
/// with `last`; `Ok(Some(result))` emits, `Ok(None)` skips, and in both
/// cases `last` advances to the current item, so one rejected pair never
/// stalls the chain. The first `Err` terminates the stage.
pub fn reduce<T, U, E, F>(
    cancel: CancellationToken,
    mut input: mpsc::Receiver<T>,
    mut reduce_fn: F,
) -> (mpsc::Receiver<U>, mpsc::Receiver<E>)
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
    F: FnMut(&T, &T) -> Result<Option<U>, E> + Send + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (err_tx, err_rx) = mpsc::channel(1);

    tokio::spawn(async move {
        let mut last: Option<T> = None;
        let fault = loop {
            let item = tokio::select! {
                biased;
                () = cancel.cancelled() => break None,
                received = input.recv() => match received {
                    Some(item) => item,
                    None => break None,
                },
            };
            let Some(prev) = last.as_ref() else {
                last = Some(item);
                continue;
            };
            match reduce_fn(prev, &item) {
                Err(err) => break Some(err),
                Ok(None) => last = Some(item),
                Ok(Some(result)) => {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break None,
                        sent = event_tx.send(result) => {
                            if sent.is_err() {
                                break None;
                            }
                        }
                    }
                    last = Some(item);
                }
            }
        };
        drop(event_tx);
        if let Some(err) = fault {
            let _ = err_tx.send(err).await;
        }
    });

    (event_rx, err_rx)
}

/// Fan the input out across `concurrency` workers sharing one receiver.
///
/// Each worker pulls an item and runs `worker(cancel, item, events)`; the
/// worker may emit any number of events. A worker that returns an error
/// forwards it on the error channel and continues with the next item. The
/// event channel closes once every worker has drained the input and
/// returned.
pub fn worker_pool<T, U, E, W, Fut>(
    cancel: CancellationToken,
    concurrency: usize,
    input: mpsc::Receiver<T>,
    worker: W,
) -> (mpsc::Receiver<U>, mpsc::Receiver<E>)
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
    W: Fn(CancellationToken, T, mpsc::Sender<U>) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (err_tx, err_rx) = mpsc::channel(concurrency.max(1));
    let input = Arc::new(Mutex::new(input));

    let mut workers = JoinSet::new();
    for _ in 0..concurrency {
        let cancel = cancel.clone();
        let input = Arc::clone(&input);
        let event_tx = event_tx.clone();
        let err_tx = err_tx.clone();
        let worker = worker.clone();
        workers.spawn(async move {
            loop {
                let item = {
                    let mut receiver = input.lock().await;
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => None,
                        received = receiver.recv() => received,
                    }
                };
                let Some(item) = item else { return };
                if let Err(err) = worker(cancel.clone(), item, event_tx.clone()).await {
                    // Per-item recovery: report and move on to the next item.
                    if err_tx.send(err).await.is_err() {
                        return;
                    }
                }
            }
        });
    }
    drop(event_tx);
    drop(err_tx);

    // Reap worker tasks; the output channels close when the last worker
    // drops its senders.
    tokio::spawn(async move { while workers.join_next().await.is_some() {} });

    (event_rx, err_rx)
}

/// Consume the stream in the caller's task, applying `each` to every event.
///
/// Returns the first `each` error without consuming further events, or
/// `E::canceled("sink")` if the token fires while waiting. `each` may
/// borrow caller-local state; the sink is not spawned.
pub async fn sink<T, E, F>(
    cancel: &CancellationToken,
    mut input: mpsc::Receiver<T>,
    mut each: F,
) -> Result<(), E>
where
    E: Canceled,
    F: FnMut(T) -> Result<(), E>,
{
    loop {
        let item = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(E::canceled("sink")),
            received = input.recv() => match received {
                Some(item) => item,
                None => return Ok(()),
            },
        };
        each(item)?;
    }
}
