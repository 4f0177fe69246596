use thiserror::Error;

use crate::types::ParticleHandle;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Invalid particle count, cube size, time step or sub-step count.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// The grid or the particle store could not grow.
    #[error("allocation failed for {what} ({requested} elements)")]
    Allocation {
        what: &'static str,
        requested: usize,
    },
    /// A removed or never-issued handle was passed in.
    #[error("no live particle for handle {0}")]
    NotFound(ParticleHandle),
    /// A previous step hit an allocation failure; the run must be abandoned.
    #[error("simulation faulted on an earlier step")]
    Faulted,
}

impl SimError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SimError::Configuration(msg.into())
    }

    /// Whether the error ends the run (as opposed to a local, recoverable error).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, SimError::Allocation { .. } | SimError::Faulted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_cause() {
        let e = SimError::config("cube_size must be > 0");
        assert!(e.to_string().contains("cube_size"));

        let e = SimError::Allocation { what: "grid buckets", requested: 64 };
        assert!(e.to_string().contains("grid buckets"));
        assert!(e.is_fatal());
    }

    #[test]
    fn not_found_is_recoverable() {
        let e = SimError::NotFound(ParticleHandle::new(3, 1));
        assert!(!e.is_fatal());
        assert!(e.to_string().contains("#3"));
    }
}
