//! Run group with first-error cancellation.
//!
//! Tasks share one token, a child of the caller's. The first task to fail
//! cancels the token; [`RunGroup::wait`] still joins every task before it
//! returns that first error.

use std::future::Future;

use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

pub struct RunGroup<E> {
    token: CancellationToken,
    tasks: JoinSet<Result<(), E>>,
}

impl<E> RunGroup<E>
where
    E: From<JoinError> + Send + 'static,
{
    /// New group cancelled whenever `parent` is.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            tasks: JoinSet::new(),
        }
    }

    /// Token every task should watch.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Join every task. Returns the first error, if any.
    pub async fn wait(mut self) -> Result<(), E> {
        let mut first_error = None;

        while let Some(joined) = self.tasks.join_next().await {
            let result = joined.map_err(E::from).and_then(|r| r);
            if let Err(e) = result {
                if first_error.is_none() {
                    self.token.cancel();
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Failed(&'static str),
        Panicked,
    }

    impl From<JoinError> for TestError {
        fn from(_: JoinError) -> Self {
            TestError::Panicked
        }
    }

    #[tokio::test]
    async fn all_clean_is_ok() {
        let mut group = RunGroup::<TestError>::new(&CancellationToken::new());
        group.spawn(async { Ok(()) });
        group.spawn(async { Ok(()) });
        assert_eq!(group.len(), 2);
        assert_eq!(group.wait().await, Ok(()));
    }

    #[tokio::test]
    async fn first_error_cancels_siblings_and_waits_for_them() {
        let mut group = RunGroup::<TestError>::new(&CancellationToken::new());
        let sibling_done = Arc::new(AtomicBool::new(false));

        let token = group.token();
        let done = Arc::clone(&sibling_done);
        group.spawn(async move {
            token.cancelled().await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            done.store(true, Ordering::SeqCst);
            Ok(())
        });
        group.spawn(async { Err(TestError::Failed("boom")) });

        assert_eq!(group.wait().await, Err(TestError::Failed("boom")));
        assert!(sibling_done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn later_errors_are_dropped() {
        let mut group = RunGroup::<TestError>::new(&CancellationToken::new());
        group.spawn(async { Err(TestError::Failed("first")) });
        let token = group.token();
        group.spawn(async move {
            token.cancelled().await;
            Err(TestError::Failed("second"))
        });

        assert_eq!(group.wait().await, Err(TestError::Failed("first")));
    }

    #[tokio::test]
    async fn parent_cancel_reaches_tasks() {
        let parent = CancellationToken::new();
        let mut group = RunGroup::<TestError>::new(&parent);
        let token = group.token();
        group.spawn(async move {
            token.cancelled().await;
            Ok(())
        });

        parent.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), group.wait()).await;
        assert_eq!(result, Ok(Ok(())));
    }

    #[tokio::test]
    async fn group_cancel_does_not_reach_parent() {
        let parent = CancellationToken::new();
        let mut group = RunGroup::<TestError>::new(&parent);
        group.spawn(async { Err(TestError::Failed("x")) });
        let _ = group.wait().await;
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn panic_becomes_error() {
        let mut group = RunGroup::<TestError>::new(&CancellationToken::new());
        group.spawn(async { panic!("task panicked") });
        assert_eq!(group.wait().await, Err(TestError::Panicked));
    }
}
