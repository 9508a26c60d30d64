//! Request-scoped cancellation and deadlines.
//!
//! Every repository operation takes a [`Context`] and runs its complete
//! storage sequence through [`Context::run`]. When the context is cancelled or
//! its deadline passes, the in-flight future is dropped: pending queries are
//! abandoned and an uncommitted `sqlx::Transaction` rolls back on drop.
//!
//! ```rust,ignore
//! use core_catalog::context::Context;
//! use std::time::Duration;
//!
//! let ctx = Context::new().with_timeout(Duration::from_secs(2));
//! let artist = repo.get_by_id(&ctx, 42).await?;
//! ```

use crate::error::{CatalogError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context driven by an externally owned token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Derive a child context. Cancelling `self` cancels the child, never the
    /// other way around.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derive a child context that expires after `timeout`. An earlier
    /// inherited deadline is kept.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a child context that expires at `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Fail fast if the context is already done.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(CatalogError::Cancelled);
        }
        if matches!(self.deadline, Some(deadline) if deadline <= Instant::now()) {
            return Err(CatalogError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `work` to completion unless the context is cancelled or its
    /// deadline passes first.
    pub async fn run<T, F>(&self, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let expiry = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(CatalogError::Cancelled),
            _ = expiry => Err(CatalogError::DeadlineExceeded),
            result = work => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_returns_work_result() {
        let ctx = Context::new();
        let value = ctx.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn cancelled_context_never_polls_work() {
        let ctx = Context::new();
        ctx.cancel();

        let mut polled = false;
        let result: Result<()> = ctx
            .run(async {
                polled = true;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(CatalogError::Cancelled)));
        assert!(!polled);
    }

    #[tokio::test]
    async fn cancellation_interrupts_pending_work() {
        let ctx = Context::new();
        let handle = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        });

        let result: Result<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(CatalogError::Cancelled)));
    }

    #[tokio::test]
    async fn deadline_interrupts_pending_work() {
        let ctx = Context::new().with_timeout(Duration::from_millis(50));

        let result: Result<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(CatalogError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn parent_cancellation_reaches_children() {
        let parent = Context::new();
        let child = parent.child();
        let timed = parent.with_timeout(Duration::from_secs(60));

        parent.cancel();

        assert!(child.is_cancelled());
        assert!(timed.is_cancelled());
        assert!(matches!(child.check(), Err(CatalogError::Cancelled)));
    }

    #[tokio::test]
    async fn child_cancellation_leaves_parent_running() {
        let parent = Context::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());
        assert!(parent.check().is_ok());
    }

    #[tokio::test]
    async fn earlier_deadline_is_inherited() {
        let short = Context::new().with_timeout(Duration::from_millis(10));
        let long = short.with_timeout(Duration::from_secs(60));
        assert_eq!(long.deadline(), short.deadline());
    }
}
