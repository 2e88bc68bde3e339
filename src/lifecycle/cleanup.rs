//! Ordered teardown callbacks.

use std::error::Error;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

type BoxError = Box<dyn Error + Send + Sync>;
type Callback = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>;

/// A cleanup callback that failed or panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    pub name: String,
    pub error: String,
}

/// Named teardown callbacks, run once each in registration order.
#[derive(Default)]
pub struct CleanupRegistry {
    callbacks: Vec<(String, Callback)>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut, E>(&mut self, name: impl Into<String>, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        let callback: Callback =
            Box::new(move || async move { callback().await.map_err(Into::into) }.boxed());
        self.callbacks.push((name.into(), callback));
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Run every callback sequentially. A failure or panic is logged and
    /// collected; the remaining callbacks still run.
    pub async fn run_all(self) -> Vec<CleanupFailure> {
        let mut failures = Vec::new();

        for (name, callback) in self.callbacks {
            let outcome = AssertUnwindSafe(callback()).catch_unwind().await;
            let error = match outcome {
                Ok(Ok(())) => {
                    tracing::info!(cleanup = %name, "Cleanup completed");
                    continue;
                }
                Ok(Err(e)) => e.to_string(),
                Err(panic) => panic_message(panic.as_ref()),
            };

            tracing::error!(cleanup = %name, error = %error, "Cleanup failed");
            failures.push(CleanupFailure { name, error });
        }

        failures
    }
}

impl std::fmt::Debug for CleanupRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.callbacks.iter().map(|(name, _)| name))
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_runs_in_order_despite_failure() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CleanupRegistry::new();

        let log = calls.clone();
        registry.register("closeA", move || async move {
            log.lock().unwrap().push("closeA");
            Err::<(), _>("connection reset")
        });
        let log = calls.clone();
        registry.register("closeB", move || async move {
            log.lock().unwrap().push("closeB");
            Ok::<(), BoxError>(())
        });

        let failures = registry.run_all().await;

        assert_eq!(*calls.lock().unwrap(), vec!["closeA", "closeB"]);
        assert_eq!(
            failures,
            vec![CleanupFailure {
                name: "closeA".to_string(),
                error: "connection reset".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_panicking_callback_is_contained() {
        let ran = Arc::new(Mutex::new(false));
        let mut registry = CleanupRegistry::new();

        registry.register("explodes", || async {
            if true {
                panic!("boom");
            }
            Ok::<(), BoxError>(())
        });
        let flag = ran.clone();
        registry.register("after", move || async move {
            *flag.lock().unwrap() = true;
            Ok::<(), BoxError>(())
        });

        let failures = registry.run_all().await;

        assert!(*ran.lock().unwrap());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "explodes");
        assert_eq!(failures[0].error, "panicked: boom");
    }
}
