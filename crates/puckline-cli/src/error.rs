use puckline_core::{ApiError, ApiErrorKind};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] puckline_core::ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Warehouse(#[from] puckline_core::WarehouseError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Api(error) => match error.kind() {
                ApiErrorKind::InvalidRequest => 2,
                ApiErrorKind::NotFound => 3,
                ApiErrorKind::Storage => 5,
                ApiErrorKind::Cancelled => 130,
                _ => 6,
            },
            Self::Warehouse(_) => 5,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
