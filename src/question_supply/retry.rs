use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use tokio::time::{sleep, timeout};
use tracing::warn;

use super::{Question, QuestionSupply, QuestionSupplyError};
use crate::state::room::Difficulty;

/// Bounds applied to every call of a [`RetryingQuestionSupply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Deadline of a single attempt.
    pub attempt_timeout: Duration,
    /// Attempts including the first one.
    pub max_attempts: u32,
    /// Wait before the second attempt; doubled afterwards.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    const MAX_BACKOFF: Duration = Duration::from_secs(8);

    fn next_delay(current: Duration) -> Duration {
        (current * 2).min(Self::MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(20),
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// Wraps a supply with a per-attempt timeout and exponential-backoff retries.
pub struct RetryingQuestionSupply {
    inner: Arc<dyn QuestionSupply>,
    policy: RetryPolicy,
}

impl RetryingQuestionSupply {
    /// Wrap `inner` with the bounds of `policy`.
    pub fn new(inner: Arc<dyn QuestionSupply>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl QuestionSupply for RetryingQuestionSupply {
    fn generate(
        &self,
        topic: String,
        difficulty: Difficulty,
        count: usize,
    ) -> BoxFuture<'static, Result<Vec<Question>, QuestionSupplyError>> {
        let inner = self.inner.clone();
        let policy = self.policy;
        Box::pin(async move {
            let max_attempts = policy.max_attempts.max(1);
            let mut delay = policy.initial_backoff;

            for attempt in 1..=max_attempts {
                let outcome = timeout(
                    policy.attempt_timeout,
                    inner.generate(topic.clone(), difficulty, count),
                )
                .await;
                let err = match outcome {
                    Ok(Ok(questions)) => return Ok(questions),
                    Ok(Err(err)) => err,
                    Err(_) => QuestionSupplyError::Timeout(policy.attempt_timeout),
                };

                if !err.is_transient() {
                    return Err(err);
                }
                if attempt == max_attempts {
                    return Err(QuestionSupplyError::Exhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }

                warn!(%topic, attempt, error = %err, "question supply attempt failed; retrying");
                sleep(delay).await;
                delay = RetryPolicy::next_delay(delay);
            }

            Err(QuestionSupplyError::Exhausted {
                attempts: max_attempts,
                last: Box::new(QuestionSupplyError::Malformed("no attempt made".into())),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            Mutex,
            atomic::{AtomicU32, Ordering},
        },
    };

    use reqwest::StatusCode;

    use super::*;

    type Scripted = Result<Vec<Question>, QuestionSupplyError>;

    struct ScriptedSupply {
        script: Mutex<VecDeque<Scripted>>,
        calls: AtomicU32,
        stall: Option<Duration>,
    }

    impl ScriptedSupply {
        fn new(script: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
                stall: None,
            })
        }
    }

    impl QuestionSupply for ScriptedSupply {
        fn generate(
            &self,
            _topic: String,
            _difficulty: Difficulty,
            _count: usize,
        ) -> BoxFuture<'static, Result<Vec<Question>, QuestionSupplyError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(QuestionSupplyError::Malformed("script exhausted".into())));
            let stall = self.stall;
            Box::pin(async move {
                if let Some(stall) = stall {
                    sleep(stall).await;
                }
                next
            })
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempt_timeout: Duration::from_millis(50),
            max_attempts,
            initial_backoff: Duration::from_millis(1),
        }
    }

    fn question() -> Question {
        Question {
            text: "q".into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: 2,
        }
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let supply = ScriptedSupply::new(vec![
            Err(QuestionSupplyError::Malformed("garbage".into())),
            Ok(vec![question()]),
        ]);
        let retrying = RetryingQuestionSupply::new(supply.clone(), fast_policy(3));

        let questions = retrying
            .generate("space".into(), Difficulty::Easy, 1)
            .await
            .unwrap();
        assert_eq!(questions, vec![question()]);
        assert_eq!(supply.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_failures_stop_immediately() {
        let supply = ScriptedSupply::new(vec![Err(QuestionSupplyError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: "bad key".into(),
        })]);
        let retrying = RetryingQuestionSupply::new(supply.clone(), fast_policy(3));

        let err = retrying
            .generate("space".into(), Difficulty::Easy, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, QuestionSupplyError::Status { .. }));
        assert_eq!(supply.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempts_are_bounded() {
        let supply = ScriptedSupply::new(Vec::new());
        let retrying = RetryingQuestionSupply::new(supply.clone(), fast_policy(3));

        let err = retrying
            .generate("space".into(), Difficulty::Hard, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, QuestionSupplyError::Exhausted { attempts: 3, .. }));
        assert_eq!(supply.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn slow_attempts_time_out() {
        let supply = Arc::new(ScriptedSupply {
            script: Mutex::new(vec![Ok(vec![question()])].into()),
            calls: AtomicU32::new(0),
            stall: Some(Duration::from_secs(5)),
        });
        let retrying = RetryingQuestionSupply::new(supply, fast_policy(1));

        let err = retrying
            .generate("space".into(), Difficulty::Medium, 1)
            .await
            .unwrap_err();
        let QuestionSupplyError::Exhausted { last, .. } = err else {
            panic!("expected exhausted retries");
        };
        assert!(matches!(*last, QuestionSupplyError::Timeout(_)));
    }
}
