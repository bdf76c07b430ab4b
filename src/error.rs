/// Application-boundary error: a message plus the process exit code it maps to.
///
/// Exit codes: `2` for bad input or IO failures, `4` for computation failures.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Why a single sequence could not be fitted.
///
/// None of these abort a batch: the analyzer records them on the sequence's
/// result and moves on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("insufficient data: {found} events (need at least {required})")]
    InsufficientEvents { found: usize, required: usize },

    #[error("insufficient data: {found} non-empty rate bins (need at least {required})")]
    InsufficientBins { found: usize, required: usize },

    #[error("optimizer did not converge: {reason}")]
    NonConvergence { reason: String },

    #[error("fitted parameter {name}={value} is outside its bounds")]
    OutOfBounds { name: &'static str, value: f64 },

    #[error("non-finite value in {what}")]
    NonFinite { what: &'static str },

    #[error("singular least-squares step")]
    Singular,

    #[error("invalid rate curve: {0}")]
    InvalidRateCurve(&'static str),
}

impl FitError {
    /// Short machine-friendly label used in exports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FitError::InsufficientEvents { .. } | FitError::InsufficientBins { .. } => {
                "insufficient_data"
            }
            FitError::NonConvergence { .. }
            | FitError::OutOfBounds { .. }
            | FitError::NonFinite { .. }
            | FitError::Singular => "optimization_failure",
            FitError::InvalidRateCurve(_) => "invalid_input",
        }
    }
}

impl From<argmin::core::Error> for FitError {
    fn from(err: argmin::core::Error) -> Self {
        FitError::NonConvergence {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_error_kinds_follow_taxonomy() {
        let e = FitError::InsufficientEvents {
            found: 15,
            required: 20,
        };
        assert_eq!(e.kind(), "insufficient_data");
        assert!(e.to_string().contains("15 events"));

        let e = FitError::NonConvergence {
            reason: "max iterations".into(),
        };
        assert_eq!(e.kind(), "optimization_failure");
    }
}
