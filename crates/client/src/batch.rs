//! Batch execution policies.
//!
//! Two ways to run a list of fallible tasks in parallel:
//!
//! - [`join_all`]: every task must succeed. The first failure aborts the tasks
//!   still running and is returned.
//! - [`join_best_effort`]: every task runs to completion and its own outcome
//!   is reported; the batch itself never fails.
//!
//! Both bound parallelism with a semaphore and return results in input order.

use std::future::Future;
use std::sync::Arc;

use shellcache_core::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

fn task_error(err: JoinError) -> Error {
    Error::Task(err.to_string())
}

fn spawn_all<T, F>(tasks: Vec<F>, max_concurrency: usize) -> JoinSet<(usize, Result<T, Error>)>
where
    T: Send + 'static,
    F: Future<Output = Result<T, Error>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut join_set = JoinSet::new();

    for (index, task) in tasks.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        join_set.spawn(async move {
            // NOTE: Hold permit for task duration to enforce concurrency limit
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => return (index, Err(Error::Task(e.to_string()))),
            };
            (index, task.await)
        });
    }

    join_set
}

/// Run every task; fail as soon as one fails.
///
/// # Errors
///
/// Returns the first task error (or panic) observed. Tasks still in flight
/// are aborted before returning.
pub async fn join_all<T, F>(tasks: Vec<F>, max_concurrency: usize) -> Result<Vec<T>, Error>
where
    T: Send + 'static,
    F: Future<Output = Result<T, Error>> + Send + 'static,
{
    let total = tasks.len();
    let mut join_set = spawn_all(tasks, max_concurrency);
    let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();

    while let Some(joined) = join_set.join_next().await {
        let outcome = joined.map_err(task_error).and_then(|(index, result)| result.map(|value| (index, value)));
        match outcome {
            Ok((index, value)) => slots[index] = Some(value),
            Err(e) => {
                join_set.shutdown().await;
                return Err(e);
            }
        }
    }

    slots
        .into_iter()
        .map(|slot| slot.ok_or_else(|| Error::Task("task finished without a result".into())))
        .collect()
}

/// Run every task to completion and report each outcome.
///
/// A panicking task is reported as `Error::Task` in its own slot.
pub async fn join_best_effort<T, F>(tasks: Vec<F>, max_concurrency: usize) -> Vec<Result<T, Error>>
where
    T: Send + 'static,
    F: Future<Output = Result<T, Error>> + Send + 'static,
{
    let total = tasks.len();
    let mut join_set = spawn_all(tasks, max_concurrency);
    let mut slots: Vec<Option<Result<T, Error>>> = (0..total).map(|_| None).collect();
    let mut lost = Vec::new();

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => lost.push(e.to_string()),
        }
    }

    // A panicked task loses its index; its empty slot carries the panic message.
    let mut lost = lost.into_iter();
    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| Err(Error::Task(lost.next().unwrap_or_else(|| "task lost".to_string()))))
        })
        .collect()
}
