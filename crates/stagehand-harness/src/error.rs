/// Harness error types
use std::path::PathBuf;
use thiserror::Error;

pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that abort a run.
///
/// A failing test is not an error; it is recorded in the run summary.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Godot binary not found at '{}'", .0.display())]
    ExecutableNotFound(PathBuf),

    #[error("Failed to launch '{}': {}", .program.display(), .error)]
    Spawn {
        program: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error at {}: {}", .path.display(), .error)]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Failed to write report: {0}")]
    Output(#[from] std::io::Error),

    #[error("Interrupted")]
    Interrupted,
}

impl HarnessError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }

    /// Create a launch error, singling out a missing program
    pub fn spawn(program: impl Into<PathBuf>, error: std::io::Error) -> Self {
        let program = program.into();
        if error.kind() == std::io::ErrorKind::NotFound {
            Self::ExecutableNotFound(program)
        } else {
            Self::Spawn { program, error }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_spawn_not_found_maps_to_missing_executable() {
        let err = HarnessError::spawn("/opt/godot", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, HarnessError::ExecutableNotFound(_)));
        assert_eq!(err.to_string(), "Godot binary not found at '/opt/godot'");
    }

    #[test]
    fn test_spawn_other_error_keeps_cause() {
        let err = HarnessError::spawn(
            "/opt/godot",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, HarnessError::Spawn { .. }));
        assert!(err.to_string().starts_with("Failed to launch '/opt/godot'"));
    }
}
