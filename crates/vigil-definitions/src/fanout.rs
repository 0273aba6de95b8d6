//! Gather-all-or-fail fan-out for multi-row writes.
//!
//! Every future runs to completion; the first error (in submission order)
//! is returned afterwards. Writes that already succeeded stay applied.

use std::future::Future;

use futures_util::future::join_all;
use tracing::debug;
use vigil_store::StoreResult;

pub(crate) async fn gather_all<I, F, T>(futures: I) -> StoreResult<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = StoreResult<T>>,
{
    let results = join_all(futures).await;
    let total = results.len();
    let mut values = Vec::with_capacity(total);
    let mut first_err = None;
    let mut failed = 0usize;
    for result in results {
        match result {
            Ok(v) => values.push(v),
            Err(e) => {
                failed += 1;
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
    }
    match first_err {
        Some(e) => {
            debug!(total, failed, "fan-out finished with failures");
            Err(e)
        }
        None => Ok(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vigil_store::StoreError;

    #[tokio::test]
    async fn collects_in_submission_order() {
        let out = gather_all((1..=3).map(|i| async move { Ok::<_, StoreError>(i * 10) }))
            .await
            .unwrap();
        assert_eq!(out, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn failure_does_not_cancel_siblings() {
        let completed = Arc::new(AtomicUsize::new(0));
        let futures = (0..4).map(|i| {
            let completed = completed.clone();
            async move {
                tokio::task::yield_now().await;
                completed.fetch_add(1, Ordering::SeqCst);
                if i == 1 {
                    Err(StoreError::Write(format!("row {i}")))
                } else {
                    Ok(i)
                }
            }
        });

        let err = gather_all(futures).await.unwrap_err();
        assert!(err.to_string().contains("row 1"));
        assert_eq!(completed.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn empty_input_succeeds() {
        let out: Vec<u8> = gather_all(Vec::<std::future::Ready<StoreResult<u8>>>::new())
            .await
            .unwrap();
        assert!(out.is_empty());
    }
}
