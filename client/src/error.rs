use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Transport failure, non-2xx status, or an undecodable body.
    RequestFailed,
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed => f.write_str("request failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub detail: String,
}

impl GatewayError {
    pub fn request_failed(detail: impl Into<String>) -> Self {
        Self {
            kind: GatewayErrorKind::RequestFailed,
            detail: detail.into(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::request_failed(err.to_string())
    }
}
