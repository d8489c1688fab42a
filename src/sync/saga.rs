//! Small generic saga runner.
//!
//! A saga is an ordered list of steps, each able to undo itself. Steps run
//! strictly in sequence; when one fails, the steps that already completed
//! are compensated in reverse order.

use async_trait::async_trait;
use tracing::{Level, event};

use crate::core::{RemoteError, SyncError};

/// One local action of a saga and its compensating action.
#[async_trait]
pub trait SagaStep<C: Send>: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, ctx: &mut C) -> Result<(), SyncError>;

    /// Undoes `execute`. Steps without side effects keep the default.
    async fn compensate(&self, _ctx: &mut C) -> Result<(), RemoteError> {
        Ok(())
    }
}

/// A compensation that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationFailure {
    pub step: &'static str,
    pub error: RemoteError,
}

/// Why a saga stopped: the failing step, its error, and any compensations
/// that failed while unwinding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaFailure {
    pub step: &'static str,
    pub cause: SyncError,
    pub compensation_failures: Vec<CompensationFailure>,
}

impl SagaFailure {
    pub fn fully_compensated(&self) -> bool {
        self.compensation_failures.is_empty()
    }
}

pub struct Saga<C: Send> {
    name: &'static str,
    steps: Vec<Box<dyn SagaStep<C>>>,
}

impl<C: Send> Saga<C> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: impl SagaStep<C> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    pub async fn run(&self, ctx: &mut C) -> Result<(), SagaFailure> {
        for (index, step) in self.steps.iter().enumerate() {
            event!(Level::DEBUG, saga = self.name, step = step.name(), "saga step started");
            if let Err(cause) = step.execute(ctx).await {
                event!(
                    Level::WARN,
                    saga = self.name,
                    step = step.name(),
                    error = %cause,
                    "saga step failed, compensating"
                );
                let compensation_failures = self.unwind(index, ctx).await;
                return Err(SagaFailure {
                    step: step.name(),
                    cause,
                    compensation_failures,
                });
            }
        }
        Ok(())
    }

    /// Compensates steps `[0, failed)` in reverse order, continuing past failures.
    async fn unwind(&self, failed: usize, ctx: &mut C) -> Vec<CompensationFailure> {
        let mut failures = Vec::new();
        for step in self.steps[..failed].iter().rev() {
            if let Err(error) = step.compensate(ctx).await {
                event!(
                    Level::ERROR,
                    saga = self.name,
                    step = step.name(),
                    error = %error,
                    "compensation failed"
                );
                failures.push(CompensationFailure {
                    step: step.name(),
                    error,
                });
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StoreKind;

    #[derive(Default)]
    struct Trace {
        events: Vec<String>,
    }

    struct Recorded {
        name: &'static str,
        fail: bool,
        fail_compensation: bool,
    }

    impl Recorded {
        fn ok(name: &'static str) -> Self {
            Self {
                name,
                fail: false,
                fail_compensation: false,
            }
        }
    }

    #[async_trait]
    impl SagaStep<Trace> for Recorded {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn execute(&self, ctx: &mut Trace) -> Result<(), SyncError> {
            ctx.events.push(format!("do:{}", self.name));
            if self.fail {
                return Err(SyncError::configuration(format!("{} failed", self.name)));
            }
            Ok(())
        }

        async fn compensate(&self, ctx: &mut Trace) -> Result<(), RemoteError> {
            ctx.events.push(format!("undo:{}", self.name));
            if self.fail_compensation {
                return Err(RemoteError::transport(StoreKind::Content, "undo", "down"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn runs_all_steps_in_order() {
        let saga = Saga::new("test").step(Recorded::ok("a")).step(Recorded::ok("b"));
        let mut trace = Trace::default();

        saga.run(&mut trace).await.unwrap();
        assert_eq!(trace.events, vec!["do:a", "do:b"]);
        assert_eq!(saga.step_names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failure_compensates_completed_steps_in_reverse() {
        let saga = Saga::new("test")
            .step(Recorded::ok("a"))
            .step(Recorded::ok("b"))
            .step(Recorded {
                name: "c",
                fail: true,
                fail_compensation: false,
            })
            .step(Recorded::ok("d"));
        let mut trace = Trace::default();

        let failure = saga.run(&mut trace).await.unwrap_err();
        assert_eq!(failure.step, "c");
        assert!(failure.fully_compensated());
        assert_eq!(
            trace.events,
            vec!["do:a", "do:b", "do:c", "undo:b", "undo:a"]
        );
    }

    #[tokio::test]
    async fn failed_compensation_is_reported_and_unwinding_continues() {
        let saga = Saga::new("test")
            .step(Recorded::ok("a"))
            .step(Recorded {
                name: "b",
                fail: false,
                fail_compensation: true,
            })
            .step(Recorded {
                name: "c",
                fail: true,
                fail_compensation: false,
            });
        let mut trace = Trace::default();

        let failure = saga.run(&mut trace).await.unwrap_err();
        assert_eq!(failure.compensation_failures.len(), 1);
        assert_eq!(failure.compensation_failures[0].step, "b");
        assert_eq!(trace.events.last().map(String::as_str), Some("undo:a"));
    }

    #[tokio::test]
    async fn first_step_failure_has_nothing_to_compensate() {
        let saga = Saga::new("test").step(Recorded {
            name: "a",
            fail: true,
            fail_compensation: true,
        });
        let mut trace = Trace::default();

        let failure = saga.run(&mut trace).await.unwrap_err();
        assert!(failure.fully_compensated());
        assert_eq!(trace.events, vec!["do:a"]);
    }
}
