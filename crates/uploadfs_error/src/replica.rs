//! Replica error types.

use std::fmt;

/// One replica that failed, tagged with its identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{}: {}", target, reason)]
pub struct ReplicaFailure {
    /// Identity of the failed target (e.g. `account/container`)
    pub target: String,
    /// What went wrong on that target
    pub reason: String,
}

impl ReplicaFailure {
    /// Create a new failure record.
    pub fn new(target: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            target: target.into(),
            reason: reason.to_string(),
        }
    }
}

/// Kinds of replica errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReplicaErrorKind {
    /// The operation failed on some replicas; the others completed and were
    /// not rolled back.
    Failed {
        /// Operation name (copy_in, remove, enable, ...)
        operation: String,
        /// Every replica that failed
        failures: Vec<ReplicaFailure>,
    },
    /// Every replica was tried and none succeeded.
    Exhausted {
        /// Operation name
        operation: String,
        /// Failure of each replica, in the order tried
        failures: Vec<ReplicaFailure>,
    },
    /// Replicas disagree about the prior state of an object, nothing was changed.
    Diverged {
        /// Object path
        path: String,
        /// Replicas that do not hold the object
        targets: Vec<String>,
    },
}

impl fmt::Display for ReplicaErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicaErrorKind::Failed {
                operation,
                failures,
            } => {
                write!(f, "{} failed on replicas [", operation)?;
                write_failures(f, failures)?;
                write!(f, "]")
            }
            ReplicaErrorKind::Exhausted {
                operation,
                failures,
            } => {
                write!(f, "{}: all replicas exhausted [", operation)?;
                write_failures(f, failures)?;
                write!(f, "]")
            }
            ReplicaErrorKind::Diverged { path, targets } => write!(
                f,
                "replicas diverged for {}: missing on [{}]",
                path,
                targets.join(", ")
            ),
        }
    }
}

fn write_failures(f: &mut fmt::Formatter<'_>, failures: &[ReplicaFailure]) -> fmt::Result {
    for (i, failure) in failures.iter().enumerate() {
        if i > 0 {
            write!(f, "; ")?;
        }
        write!(f, "{}", failure)?;
    }
    Ok(())
}

/// Replica error with location tracking.
///
/// # Examples
///
/// ```
/// use uploadfs_error::{ReplicaError, ReplicaErrorKind, ReplicaFailure};
///
/// let err = ReplicaError::new(ReplicaErrorKind::Failed {
///     operation: "copy_in".to_string(),
///     failures: vec![ReplicaFailure::new("acct2/media", "connection reset")],
/// });
/// assert_eq!(err.failed_targets(), vec!["acct2/media"]);
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Replica Error: {} at line {} in {}", kind, line, file)]
pub struct ReplicaError {
    /// The kind of error that occurred
    pub kind: ReplicaErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ReplicaError {
    /// Create a new replica error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ReplicaErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Identities of the targets this error concerns.
    pub fn failed_targets(&self) -> Vec<&str> {
        match &self.kind {
            ReplicaErrorKind::Failed { failures, .. }
            | ReplicaErrorKind::Exhausted { failures, .. } => {
                failures.iter().map(|f| f.target.as_str()).collect()
            }
            ReplicaErrorKind::Diverged { targets, .. } => {
                targets.iter().map(String::as_str).collect()
            }
        }
    }
}
