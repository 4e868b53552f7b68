//! Async wait helpers.
//!
//! Scenario tests observe tasks they do not control; these helpers wait for
//! a condition with a deadline instead of sleeping for fixed intervals.

use std::future::Future;
use std::time::Duration;

use trustdiary_sync::{ReaderHandle, ReaderView};

/// Deadline for every wait in the testkit.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Poll `condition` until it holds. Panics with `what` after [`DEFAULT_TIMEOUT`].
pub async fn wait_until<F, Fut>(what: &str, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let polled = tokio::time::timeout(DEFAULT_TIMEOUT, async {
        while !condition().await {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    })
    .await;

    if polled.is_err() {
        panic!("timed out waiting for {what}");
    }
}

/// Wait until the reader's view satisfies `condition`.
pub async fn wait_for_view<F>(reader: &ReaderHandle, what: &str, condition: F) -> ReaderView
where
    F: Fn(&ReaderView) -> bool,
{
    let mut changes = reader.changes();
    let waited = tokio::time::timeout(DEFAULT_TIMEOUT, async {
        loop {
            let view = reader.view();
            if condition(&view) {
                return view;
            }
            if changes.changed().await.is_err() {
                // The reader stopped; its view cannot change any more.
                let view = reader.view();
                return view;
            }
        }
    })
    .await;

    match waited {
        Ok(view) if condition(&view) => view,
        _ => panic!("timed out waiting for reader: {what}"),
    }
}

/// Wait until the reader holds at least `count` entries.
pub async fn wait_for_entries(reader: &ReaderHandle, count: usize) -> ReaderView {
    wait_for_view(reader, &format!("{count} entries"), |view| {
        view.entries.len() >= count
    })
    .await
}
