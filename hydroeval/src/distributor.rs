//! Pluggable synchronous/concurrent execution of per-metric work items.
//!
//! Both variants conform to the same `perform`/`perform_async` shape: take
//! a list of work items, run each through a closure, and return results in
//! input order. Errors from one item never cancel the others — each result
//! slot carries its own `Result`.

use std::future::Future;
use std::pin::Pin;

/// A unit of work submitted to a [`Distributor`]: a closure producing a
/// future, so both sync and async work can be represented uniformly.
pub type WorkItem<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Runs a list of work items either one at a time or concurrently, always
/// returning results in the same order the items were submitted.
pub enum Distributor {
    Sequential,
    Concurrent,
}

impl Distributor {
    /// Runs every item to completion, in input order, and returns their
    /// results in that same order.
    pub async fn perform<T: Send + 'static>(&self, items: Vec<WorkItem<T>>) -> Vec<T> {
        match self {
            Distributor::Sequential => {
                let mut results = Vec::with_capacity(items.len());
                for item in items {
                    results.push(item.await);
                }
                results
            }
            Distributor::Concurrent => {
                let tasks: Vec<_> = items.into_iter().map(tokio::spawn).collect();
                let mut results = Vec::with_capacity(tasks.len());
                for task in tasks {
                    results.push(task.await.expect("work item panicked"));
                }
                results
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(value: i32) -> WorkItem<i32> {
        Box::pin(async move { value })
    }

    #[tokio::test]
    async fn sequential_preserves_input_order() {
        let distributor = Distributor::Sequential;
        let results = distributor.perform(vec![item(1), item(2), item(3)]).await;
        assert_eq!(results, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn concurrent_preserves_input_order() {
        let distributor = Distributor::Concurrent;
        let results = distributor.perform(vec![item(1), item(2), item(3)]).await;
        assert_eq!(results, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn one_failing_item_does_not_cancel_the_others() {
        let distributor = Distributor::Sequential;
        let items: Vec<WorkItem<Result<i32, String>>> = vec![
            Box::pin(async { Ok(1) }),
            Box::pin(async { Err("boom".to_owned()) }),
            Box::pin(async { Ok(3) }),
        ];

        let results = distributor.perform(items).await;
        assert_eq!(results[0], Ok(1));
        assert!(results[1].is_err());
        assert_eq!(results[2], Ok(3));
    }
}
