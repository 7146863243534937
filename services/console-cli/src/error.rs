//! Console-specific error types

use thiserror::Error;

use crate::resources::Resource;

/// Usage errors detected before anything is sent to the backend.
///
/// Backend and session failures stay `console_gateway::GatewayError` so the
/// exit code can tell an expired session apart from a bad invocation.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("password required: pass --password or set SMARTGAS_PASSWORD")]
    MissingPassword,

    #[error("synchronizations are listed per job type: pass --type")]
    MissingSyncType,

    #[error("{} has no detail endpoint", .0.name())]
    NoDetailEndpoint(Resource),

    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("request body is not valid JSON: {0}")]
    InvalidBody(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages_are_descriptive() {
        assert!(CliError::MissingPassword.to_string().contains("SMARTGAS_PASSWORD"));
        assert_eq!(
            CliError::NoDetailEndpoint(Resource::Payments).to_string(),
            "payments has no detail endpoint"
        );
        assert!(
            CliError::InvalidBody("expected value at line 1".into())
                .to_string()
                .contains("line 1")
        );
    }
}
