// Named domain errors. Plumbing elsewhere uses anyhow.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("unknown alert rule '{0}'")]
    UnknownRule(String),
}

#[derive(Debug, Error)]
pub enum AckError {
    #[error("alert {0} not found")]
    NotFound(i64),
    #[error("alert {0} is already acknowledged")]
    AlreadyAcknowledged(i64),
    #[error("alert store: {0}")]
    Store(#[from] anyhow::Error),
}
