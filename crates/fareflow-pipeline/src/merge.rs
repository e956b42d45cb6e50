//! Error fan-in across stages.

use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Fan all stage error channels into one stream.
///
/// The merged channel closes once every source has closed. Forwarding is not
/// raced against cancellation: stages terminate (and close their error
/// channels) when cancelled, and the errors they report on the way out must
/// still reach the final drain. Consumers must drain the merged stream fully
/// to observe every error.
pub fn merge_errors<E>(sources: Vec<mpsc::Receiver<E>>) -> mpsc::Receiver<E>
where
    E: Send + 'static,
{
    let (merged_tx, merged_rx) = mpsc::channel(sources.len().max(1));

    let mut forwarders = JoinSet::new();
    for mut source in sources {
        let merged_tx = merged_tx.clone();
        forwarders.spawn(async move {
            while let Some(err) = source.recv().await {
                if merged_tx.send(err).await.is_err() {
                    return;
                }
            }
        });
    }
    drop(merged_tx);

    tokio::spawn(async move { while forwarders.join_next().await.is_some() {} });

    merged_rx
}
