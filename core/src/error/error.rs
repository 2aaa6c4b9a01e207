use thiserror::Error;

use crate::context::TaskStatus;

use super::worker::WorkerError;

/// Error taxonomy for a coordination run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Plan or registry is malformed; raised before any task runs, never retried.
    Configuration,
    /// A step was scheduled before all its prerequisites completed.
    DependencyViolation,
    /// A worker failed after its retry budget was exhausted.
    Execution,
    /// Broken engine invariant (illegal state transition, lost task).
    Internal,
}

/// Errors raised while validating a plan or driving a run.
#[derive(Error, Debug, Clone)]
pub enum CoordinationError {
    #[error("Duplicate task ID: {0}")]
    DuplicateTaskId(String),

    #[error("Dependency not found: task '{task_id}' depends on '{missing_dep}'")]
    DependencyNotFound { task_id: String, missing_dep: String },

    #[error("Dependency on parallel task: '{dependent_id}' cannot depend on parallel task '{prerequisite_id}'")]
    ParallelTaskDependency {
        prerequisite_id: String,
        dependent_id: String,
    },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Unknown worker '{worker_id}' referenced by task '{task_id}'")]
    UnknownWorker { task_id: String, worker_id: String },

    #[error("Dependency not satisfied: task '{task_id}' requires '{prerequisite_id}' to be completed")]
    DependencyNotSatisfied {
        task_id: String,
        prerequisite_id: String,
    },

    #[error("Task '{task_id}' failed: {source}")]
    TaskFailed {
        task_id: String,
        #[source]
        source: WorkerError,
    },

    #[error("Unknown task in context: {0}")]
    UnknownTask(String),

    #[error("Invalid transition for task '{task_id}': {from:?} -> {to:?}")]
    InvalidTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Run was interrupted: {0}")]
    Interrupted(String),
}

impl CoordinationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateTaskId(_)
            | Self::DependencyNotFound { .. }
            | Self::ParallelTaskDependency { .. }
            | Self::CircularDependency(_)
            | Self::UnknownWorker { .. } => ErrorKind::Configuration,
            Self::DependencyNotSatisfied { .. } => ErrorKind::DependencyViolation,
            Self::TaskFailed { .. } => ErrorKind::Execution,
            Self::UnknownTask(_) | Self::InvalidTransition { .. } | Self::Interrupted(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_configuration_errors() {
        assert!(CoordinationError::CircularDependency("a -> b -> a".into()).is_configuration());
        assert!(CoordinationError::UnknownWorker {
            task_id: "a".into(),
            worker_id: "ghost".into(),
        }
        .is_configuration());
        assert_eq!(
            CoordinationError::DependencyNotSatisfied {
                task_id: "b".into(),
                prerequisite_id: "a".into(),
            }
            .kind(),
            ErrorKind::DependencyViolation
        );
    }

    #[test]
    fn task_failure_displays_worker_message() {
        let err = CoordinationError::TaskFailed {
            task_id: "build".into(),
            source: WorkerError::Failed("exit code 2".into()),
        };
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert_eq!(err.to_string(), "Task 'build' failed: exit code 2");
    }
}
