//! Failure types.

use std::fmt;

/// An observed reclaimability state that contradicts the expected one.
///
/// Running out of retries is not an error of its own: it shows up as
/// [`StillReachable`](Self::StillReachable) or
/// [`NotAllReclaimed`](Self::NotAllReclaimed) when reclamation was expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReclaimError {
    /// The target was expected to be reclaimable but is still alive.
    StillReachable,
    /// The target was expected to stay alive but has been reclaimed.
    ReclaimedEarly,
    /// Some targets of a group were still alive.
    NotAllReclaimed {
        /// Indices of the handles whose targets are still alive.
        retained: Vec<usize>,
        /// Size of the group.
        total: usize,
    },
    /// Some targets of a group were reclaimed although none should have been.
    SomeReclaimed {
        /// Indices of the handles whose targets are gone.
        reclaimed: Vec<usize>,
        /// Size of the group.
        total: usize,
    },
}

impl fmt::Display for ReclaimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StillReachable => {
                write!(f, "expected target to be reclaimable, but it is still reachable")
            }
            Self::ReclaimedEarly => {
                write!(f, "expected target not to be reclaimable, but it was reclaimed")
            }
            Self::NotAllReclaimed { retained, total } => write!(
                f,
                "expected all {total} targets to be reclaimable, but {} still reachable (indices {retained:?})",
                retained.len()
            ),
            Self::SomeReclaimed { reclaimed, total } => write!(
                f,
                "expected none of {total} targets to be reclaimable, but {} reclaimed (indices {reclaimed:?})",
                reclaimed.len()
            ),
        }
    }
}

impl std::error::Error for ReclaimError {}

/// A `GC_TESTING_*` environment variable that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// Name of the offending variable.
    pub variable: &'static str,
    /// Its raw value.
    pub value: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} must be a non-negative integer, got \"{}\"",
            self.variable, self.value
        )
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_messages_name_indices() {
        let err = ReclaimError::NotAllReclaimed {
            retained: vec![1],
            total: 3,
        };
        assert_eq!(
            err.to_string(),
            "expected all 3 targets to be reclaimable, but 1 still reachable (indices [1])"
        );

        let err = ReclaimError::SomeReclaimed {
            reclaimed: vec![0, 2],
            total: 3,
        };
        assert_eq!(
            err.to_string(),
            "expected none of 3 targets to be reclaimable, but 2 reclaimed (indices [0, 2])"
        );
    }

    #[test]
    fn test_config_error_message() {
        let err = ConfigError {
            variable: "GC_TESTING_PAUSE_MS",
            value: "soon".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "GC_TESTING_PAUSE_MS must be a non-negative integer, got \"soon\""
        );
    }
}
