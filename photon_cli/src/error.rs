use libphoton::UnknownApplication;
use photon_client::{DrainOutcome, ServerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid configuration file: {0}")]
    InvalidConfig(#[from] serde_yml::Error),
    #[error("{0}")]
    InvalidApplication(#[from] UnknownApplication),
    #[error("{0}")]
    Server(#[from] ServerError),
    #[error("Could not serialize the result. {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Usage and validation problems exit with 2, everything else with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidApplication(_) => 2,
            CliError::Server(err) if err.is_validation() => 2,
            _ => 1,
        }
    }
}

/// The exit code for a drain that ran to an end. A drain stopped by a malformed or refused answer exits with 2,
/// like any other validation problem.
pub fn drain_exit_code(outcome: &DrainOutcome) -> i32 {
    match outcome {
        DrainOutcome::Drained { .. } | DrainOutcome::TimedOut { .. } => 0,
        DrainOutcome::Failed { validation: true, .. } => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use photon_client::ValidationError;

    #[test]
    fn exit_codes() {
        let usage: CliError = "Lobby".parse::<libphoton::Application>().unwrap_err().into();
        assert_eq!(usage.exit_code(), 2);
        assert_eq!(usage.to_string(), "Application name should be Master or Game, got 'Lobby'");
        let validation: CliError =
            ServerError::from(ValidationError::UnexpectedShape("Invalid root element: {}".to_string())).into();
        assert_eq!(validation.exit_code(), 2);
        let connect: CliError = ServerError::ConnectFailure("refused".to_string()).into();
        assert_eq!(connect.exit_code(), 1);
    }

    #[test]
    fn drain_exit_codes() {
        assert_eq!(drain_exit_code(&DrainOutcome::TimedOut { actors: Some(3), polls: 4 }), 0);
        assert_eq!(drain_exit_code(&DrainOutcome::Cancelled { polls: 1 }), 1);
        let stage = photon_client::DrainStage::ResolvingRoot;
        let message = "No response".to_string();
        let unanswered = DrainOutcome::Failed { stage, message: message.clone(), validation: false };
        assert_eq!(drain_exit_code(&unanswered), 1);
        assert_eq!(drain_exit_code(&DrainOutcome::Failed { stage, message, validation: true }), 2);
    }
}
