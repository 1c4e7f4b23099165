//! Per-step failure policy for UI sequences.
//!
//! Every interaction in a flow is tagged [`StepPolicy::Optional`] or
//! [`StepPolicy::Mandatory`] and settled through [`StepLog`]. Optional
//! failures are logged and absorbed; mandatory failures are wrapped in
//! [`MonitorError::StepFailed`] and propagate.

use crate::{MonitorError, Result};
use serde::Serialize;
use std::future::Future;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepPolicy {
    Optional,
    Mandatory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub name: &'static str,
    pub policy: StepPolicy,
}

impl Step {
    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            policy: StepPolicy::Optional,
        }
    }

    pub const fn mandatory(name: &'static str) -> Self {
        Self {
            name,
            policy: StepPolicy::Mandatory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub name: &'static str,
    pub policy: StepPolicy,
    pub status: StepStatus,
}

/// Runs steps and keeps an ordered record of how each one settled.
#[derive(Debug, Default)]
pub struct StepLog {
    records: Vec<StepRecord>,
}

impl StepLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `action` under `step`'s policy.
    ///
    /// Returns `Ok(Some(_))` on success, `Ok(None)` when an optional step
    /// failed, and `Err(StepFailed)` when a mandatory step failed.
    pub async fn run<T, Fut>(&mut self, step: Step, action: Fut) -> Result<Option<T>>
    where
        Fut: Future<Output = Result<T>>,
    {
        let result = action.await;
        self.settle(step, result)
    }

    pub async fn require<T, Fut>(&mut self, name: &'static str, action: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let step = Step::mandatory(name);
        self.run(step, action).await?.ok_or_else(|| MonitorError::StepFailed {
            step: name,
            source: Box::new(MonitorError::General("step produced no value".into())),
        })
    }

    pub async fn tolerate<T, Fut>(&mut self, name: &'static str, action: Fut) -> Option<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        // Optional steps never surface an error.
        self.run(Step::optional(name), action).await.ok().flatten()
    }

    fn settle<T>(&mut self, step: Step, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => {
                tracing::debug!(step = step.name, "step completed");
                self.push(step, StepStatus::Completed);
                Ok(Some(value))
            }
            Err(e) => match step.policy {
                StepPolicy::Optional => {
                    tracing::warn!(step = step.name, error = %e, "optional step skipped");
                    self.push(step, StepStatus::Skipped(e.to_string()));
                    Ok(None)
                }
                StepPolicy::Mandatory => {
                    tracing::error!(step = step.name, error = %e, "mandatory step failed");
                    self.push(step, StepStatus::Failed(e.to_string()));
                    Err(MonitorError::StepFailed {
                        step: step.name,
                        source: Box::new(e),
                    })
                }
            },
        }
    }

    fn push(&mut self, step: Step, status: StepStatus) {
        self.records.push(StepRecord {
            name: step.name,
            policy: step.policy,
            status,
        });
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<StepRecord> {
        self.records
    }

    pub fn status_of(&self, name: &str) -> Option<&StepStatus> {
        self.records
            .iter()
            .rev()
            .find(|r| r.name == name)
            .map(|r| &r.status)
    }
}
