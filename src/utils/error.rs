use thiserror::Error;

#[derive(Error, Debug)]
pub enum DraftError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unknown country '{value}'")]
    UnknownRole { value: String },

    #[error("Roster is missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("Could not parse choice '{value}' for country {role} for player {participant}")]
    UnrecognizedRank {
        participant: String,
        role: String,
        value: String,
    },

    #[error("Roster contains no participants")]
    EmptyRoster,

    #[error("Self-referential group {members:?} has no combined game level")]
    EmptyTierIntersection { members: Vec<String> },

    #[error("Players {members:?} want to play with AND without {conflicting:?}")]
    PairingConflict {
        members: Vec<String>,
        conflicting: Vec<String>,
    },

    #[error("Not enough mixed players to fill {tier} games ({missing} short)")]
    InsufficientMixed { tier: String, missing: usize },

    #[error("Solver failed: {message}")]
    SolverFailed { message: String },

    #[error("Solver did not finish within {seconds} seconds")]
    SolverTimeout { seconds: u64 },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Parse,
    Configuration,
    Constraint,
    Solver,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DraftError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DraftError::IoError(_) => ErrorCategory::Io,
            DraftError::CsvError(_)
            | DraftError::MissingColumn { .. }
            | DraftError::UnrecognizedRank { .. } => ErrorCategory::Parse,
            DraftError::SerializationError(_) | DraftError::InternalError { .. } => {
                ErrorCategory::Internal
            }
            DraftError::ConfigError { .. }
            | DraftError::ConfigValidationError { .. }
            | DraftError::InvalidConfigValueError { .. }
            | DraftError::UnknownRole { .. } => ErrorCategory::Configuration,
            DraftError::EmptyRoster
            | DraftError::EmptyTierIntersection { .. }
            | DraftError::PairingConflict { .. }
            | DraftError::InsufficientMixed { .. } => ErrorCategory::Constraint,
            DraftError::SolverFailed { .. } | DraftError::SolverTimeout { .. } => {
                ErrorCategory::Solver
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Parse => ErrorSeverity::High,
            ErrorCategory::Constraint => ErrorSeverity::High,
            ErrorCategory::Solver => match self {
                DraftError::SolverTimeout { .. } => ErrorSeverity::Medium,
                _ => ErrorSeverity::High,
            },
            ErrorCategory::Io | ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            DraftError::MissingColumn { column } => {
                format!("Check that the export still contains the column \"{}\"", column)
            }
            DraftError::UnrecognizedRank { participant, .. } => format!(
                "Fix the ranking of {} in the roster; only 1st..5th or blank are accepted",
                participant
            ),
            DraftError::EmptyTierIntersection { .. } => {
                "Ask the group to agree on a shared skill level, or drop one of the play-with requests"
                    .to_string()
            }
            DraftError::PairingConflict { .. } => {
                "Remove either the play-with or the refuse-to-play-with entry".to_string()
            }
            DraftError::InsufficientMixed { .. } => {
                "Recruit more players open to mixed games, or relax skill levels".to_string()
            }
            DraftError::SolverFailed { .. } => {
                "Review exclusions and skill levels; the constraints cannot all hold at once"
                    .to_string()
            }
            DraftError::SolverTimeout { .. } => {
                "Raise the solver time limit or reduce the roster".to_string()
            }
            DraftError::EmptyRoster => "Check the input file path and its contents".to_string(),
            DraftError::UnknownRole { .. } => {
                "Use one of the country names exactly as listed in the rules".to_string()
            }
            DraftError::ConfigError { .. }
            | DraftError::ConfigValidationError { .. }
            | DraftError::InvalidConfigValueError { .. } => {
                "Check the command line flags or the TOML configuration".to_string()
            }
            DraftError::IoError(_) | DraftError::CsvError(_) => {
                "Check that the file exists, is readable and is valid CSV".to_string()
            }
            DraftError::SerializationError(_) | DraftError::InternalError { .. } => {
                "Re-run with --verbose and report the log".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Parse => format!("Could not read the roster: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Constraint => format!("The roster cannot be drafted: {}", self),
            ErrorCategory::Solver => format!("No assignment was found: {}", self),
            ErrorCategory::Io => format!("File access failed: {}", self),
            ErrorCategory::Internal => format!("Unexpected failure: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, DraftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_error_names_participant_role_and_value() {
        let err = DraftError::UnrecognizedRank {
            participant: "Alice".to_string(),
            role: "Spain".to_string(),
            value: "6th".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("Alice"));
        assert!(message.contains("Spain"));
        assert!(message.contains("6th"));
        assert_eq!(err.category(), ErrorCategory::Parse);
    }

    #[test]
    fn test_severity_by_category() {
        let timeout = DraftError::SolverTimeout { seconds: 30 };
        assert_eq!(timeout.severity(), ErrorSeverity::Medium);

        let infeasible = DraftError::SolverFailed {
            message: "Infeasible".to_string(),
        };
        assert_eq!(infeasible.severity(), ErrorSeverity::High);
        assert!(infeasible.user_friendly_message().contains("Infeasible"));

        let io = DraftError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, "x"));
        assert_eq!(io.severity(), ErrorSeverity::Critical);
    }
}
