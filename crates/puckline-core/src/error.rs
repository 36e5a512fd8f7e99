use std::fmt::{Display, Formatter};

use puckline_warehouse::WarehouseError;
use thiserror::Error;

/// Validation errors for configuration values and caller input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("date must be formatted YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("player id cannot be negative: {id}")]
    NegativePlayerId { id: i64 },
    #[error("team abbreviation cannot be empty")]
    EmptyAbbreviation,
    #[error("invalid schema generation '{value}', expected one of legacy, locale-v1, locale-v2")]
    InvalidSchemaGeneration { value: String },
    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidSetting { name: &'static str, value: String },
    #[error("base url must start with http:// or https://: '{value}'")]
    InvalidBaseUrl { value: String },
}

/// Error classification for every core operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Upstream returned no usable data for the request.
    NotFound,
    /// Rate-limit retries were exhausted.
    RateLimited,
    /// Non-success HTTP status other than rate limiting.
    Upstream,
    /// Body was not JSON or did not have the expected shape.
    Parse,
    /// Network failure before a status was received.
    Transport,
    /// The fetch context was cancelled or its deadline passed.
    Cancelled,
    InvalidRequest,
    /// Persistence failure.
    Storage,
}

/// Structured error carried through the upstream client, cache and services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    kind: ApiErrorKind,
    message: String,
    status: Option<u16>,
    url: Option<String>,
}

impl ApiError {
    fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            url: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, message)
    }

    pub fn rate_limited(url: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::RateLimited, "rate limit retries exhausted")
            .with_status(429)
            .with_url(url)
    }

    pub fn upstream(status: u16, url: impl Into<String>) -> Self {
        Self::new(
            ApiErrorKind::Upstream,
            format!("upstream returned status {status}"),
        )
        .with_status(status)
        .with_url(url)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Transport, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Cancelled, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidRequest, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Storage, message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub const fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Upstream HTTP status, when one was received.
    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ApiErrorKind::NotFound => "upstream.not_found",
            ApiErrorKind::RateLimited => "upstream.rate_limited",
            ApiErrorKind::Upstream => "upstream.status",
            ApiErrorKind::Parse => "upstream.parse",
            ApiErrorKind::Transport => "upstream.transport",
            ApiErrorKind::Cancelled => "request.cancelled",
            ApiErrorKind::InvalidRequest => "request.invalid",
            ApiErrorKind::Storage => "storage.failure",
        }
    }

    /// Status an HTTP layer should answer with. Upstream statuses pass through.
    pub const fn http_status(&self) -> u16 {
        match self.kind {
            ApiErrorKind::NotFound => 404,
            ApiErrorKind::RateLimited => 429,
            ApiErrorKind::Upstream => match self.status {
                Some(status) => status,
                None => 502,
            },
            ApiErrorKind::Parse | ApiErrorKind::Transport => 502,
            ApiErrorKind::Cancelled => 499,
            ApiErrorKind::InvalidRequest => 400,
            ApiErrorKind::Storage => 500,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())?;
        if let Some(url) = &self.url {
            write!(f, " [{url}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        Self::invalid_request(error.to_string())
    }
}

impl From<WarehouseError> for ApiError {
    fn from(error: WarehouseError) -> Self {
        Self::storage(error.to_string())
    }
}
