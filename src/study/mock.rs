//! Mock step executor for deterministic testing
//!
//! Returns scripted statuses and writes scripted transcripts without
//! spawning processes. Invocations are recorded so tests can check what
//! the runner would have executed.
//!
//! # Example
//! ```no_run
//! use studyrun::study::{MockExecutor, StepStatus};
//!
//! let executor = MockExecutor::new()
//!     .with_output("step01", b"loading data\n".to_vec())
//!     .with_status("step02", StepStatus::Failed { code: Some(2) });
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::error::StudyError;
use super::executor::{StepExecutor, StepInvocation, StepStatus};
use super::interrupt::Interrupt;

#[derive(Clone, Default)]
pub struct MockExecutor {
    statuses: HashMap<String, StepStatus>,
    outputs: HashMap<String, Vec<u8>>,
    interrupt_during: HashSet<String>,
    calls: Arc<Mutex<Vec<StepInvocation>>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status returned for `step`; unscripted steps succeed
    pub fn with_status(mut self, step: impl Into<String>, status: StepStatus) -> Self {
        self.statuses.insert(step.into(), status);
        self
    }

    /// Bytes written to the transcript of `step`
    pub fn with_output(mut self, step: impl Into<String>, output: Vec<u8>) -> Self {
        self.outputs.insert(step.into(), output);
        self
    }

    /// Trigger the run's interrupt while `step` runs, as if Ctrl-C arrived
    /// just as it finished
    pub fn with_interrupt_during(mut self, step: impl Into<String>) -> Self {
        self.interrupt_during.insert(step.into());
        self
    }

    /// Invocations seen so far, in execution order
    pub fn calls(&self) -> Vec<StepInvocation> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl StepExecutor for MockExecutor {
    async fn execute(
        &self,
        invocation: &StepInvocation,
        interrupt: &Interrupt,
    ) -> Result<StepStatus, StudyError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(invocation.clone());

        let output = self
            .outputs
            .get(&invocation.step)
            .map(Vec::as_slice)
            .unwrap_or_default();
        std::fs::write(&invocation.transcript_path, output).map_err(|source| {
            StudyError::Transcript {
                step: invocation.step.clone(),
                source,
            }
        })?;

        if self.interrupt_during.contains(&invocation.step) {
            interrupt.trigger();
        }

        Ok(self
            .statuses
            .get(&invocation.step)
            .copied()
            .unwrap_or(StepStatus::Succeeded))
    }
}
