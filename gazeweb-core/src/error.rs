/// Error types shared by the gaze pipeline
use thiserror::Error;

/// Result alias used across the core crate
pub type Result<T> = std::result::Result<T, GazeError>;

/// Failures raised by the gaze pipeline.
///
/// `SingularMatrix`, `DegenerateGeometry` and `ResourceNotReady` are
/// recovered inside a frame. `ShaderProgram` and `Config` are fatal and
/// abort start-up.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GazeError {
    #[error("matrix is not invertible (determinant {determinant:e})")]
    SingularMatrix { determinant: f32 },

    #[error("degenerate geometry: {reason}")]
    DegenerateGeometry { reason: &'static str },

    #[error("resource not ready: {resource}")]
    ResourceNotReady { resource: &'static str },

    #[error("frame sequence violated: cannot {operation} while {phase}")]
    FrameSequence {
        operation: &'static str,
        phase: &'static str,
    },

    #[error("failed to create shader program `{program}`: {reason}")]
    ShaderProgram { program: &'static str, reason: String },

    #[error("invalid config: {0}")]
    Config(String),
}

impl GazeError {
    /// True for errors a frame recovers from by keeping the previous state.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SingularMatrix { .. }
                | Self::DegenerateGeometry { .. }
                | Self::ResourceNotReady { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classes() {
        assert!(GazeError::SingularMatrix { determinant: 0.0 }.is_recoverable());
        assert!(GazeError::ResourceNotReady { resource: "surface" }.is_recoverable());
        let fatal = GazeError::ShaderProgram {
            program: "pointer",
            reason: "link failed".to_string(),
        };
        assert!(!fatal.is_recoverable());
        assert!(!GazeError::Config("bad".to_string()).is_recoverable());
    }

    #[test]
    fn test_display_mentions_resource() {
        let err = GazeError::ResourceNotReady { resource: "content surface" };
        assert_eq!(err.to_string(), "resource not ready: content surface");
    }
}
