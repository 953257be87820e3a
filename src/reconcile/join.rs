//! Joining readiness signals.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::lifecycle::LoadError;

/// What a join does when one of its members fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinPolicy {
    /// Fail as soon as any member fails; the rest are abandoned.
    #[default]
    FailFast,
    /// Wait for every member, then report the first failure (if any).
    BestEffort,
}

impl JoinPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FailFast => "fail-fast",
            Self::BestEffort => "best-effort",
        }
    }
}

impl std::fmt::Display for JoinPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wait for a set of signals under `policy`.
///
/// An empty set resolves immediately. Members run as tasks on the current
/// runtime, so a fail-fast join returns without polling the stragglers.
pub async fn join<I, F>(waits: I, policy: JoinPolicy) -> Result<(), LoadError>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<(), LoadError>> + Send + 'static,
{
    let mut set = JoinSet::new();
    for wait in waits {
        set.spawn(wait);
    }

    let mut first_error = None;
    while let Some(joined) = set.join_next().await {
        let result = joined.unwrap_or_else(|err| {
            Err(LoadError::Abandoned(Arc::from(format!("join member: {err}"))))
        });
        if let Err(err) = result {
            match policy {
                JoinPolicy::FailFast => return Err(err),
                JoinPolicy::BestEffort => {
                    first_error.get_or_insert(err);
                }
            }
        }
    }

    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Address;
    use crate::lifecycle::Readiness;

    fn failure(path: &str) -> LoadError {
        LoadError::network(&Address::from_absolute(path), "boom")
    }

    #[tokio::test]
    async fn test_empty_join_is_ready() {
        let waits: Vec<std::future::Ready<Result<(), LoadError>>> = Vec::new();
        assert_eq!(join(waits, JoinPolicy::FailFast).await, Ok(()));
    }

    #[tokio::test]
    async fn test_fail_fast_does_not_wait_for_pending() {
        let (_never, pending) = Readiness::pending("slow");
        let (settle, failing) = Readiness::pending("bad");
        settle.fail(failure("https://example.com/bad.js"));

        let waits = [pending, failing]
            .into_iter()
            .map(|r| async move { r.wait().await });
        let err = join(waits, JoinPolicy::FailFast).await.unwrap_err();
        assert!(err.to_string().contains("bad.js"));
    }

    #[tokio::test]
    async fn test_best_effort_waits_for_all() {
        let (slow_settle, slow) = Readiness::pending("slow");
        let (bad_settle, bad) = Readiness::pending("bad");
        bad_settle.fail(failure("https://example.com/bad.js"));

        let observer = slow.clone();
        let waits = [slow, bad].into_iter().map(|r| async move { r.wait().await });
        let handle = tokio::spawn(join(waits, JoinPolicy::BestEffort));

        tokio::task::yield_now().await;
        assert!(!observer.is_settled());
        slow_settle.ready();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(LoadError::Network { .. })));
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(JoinPolicy::default(), JoinPolicy::FailFast);
        assert_eq!(JoinPolicy::BestEffort.to_string(), "best-effort");
    }
}
