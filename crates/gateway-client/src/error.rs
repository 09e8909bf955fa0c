//! Errors returned by [`GatewayClient`](crate::GatewayClient).
//!
//! The gateway answers 200 even when some tickers or scenarios failed, so
//! those never show up here; see
//! [`AnalysisResponse::partial_failures`](crate::AnalysisResponse::partial_failures).

use serde::Deserialize;
use thiserror::Error;


/// Client error types.
#[derive(Debug, Error)]
pub enum Error {
    /// The gateway could not be reached or the connection broke.
    #[error("gateway unreachable: {0}")]
    Http(#[from] reqwest::Error),

    /// A success response whose body is not the expected JSON.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid gateway URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The gateway refused the request before analyzing it (400 or 422).
    #[error("request rejected ({code}): {message}")]
    Rejected {
        /// Gateway error code, e.g. `INVALID_REQUEST`.
        code: String,
        /// Human-readable reason.
        message: String,
    },

    /// Any other non-success status.
    #[error("gateway returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
}

/// Error body the gateway sends with a 400.
#[derive(Debug, Deserialize)]
struct RejectionBody {
    error: String,
    code: String,
}

impl Error {
    /// Classifies a non-success response from its status and body.
    ///
    /// 422 bodies come from the JSON extractor and are plain text; they are
    /// reported with the code `UNPROCESSABLE_BODY`.
    #[must_use]
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 | 422 => match serde_json::from_str::<RejectionBody>(&body) {
                Ok(rejection) => Error::Rejected {
                    code: rejection.code,
                    message: rejection.error,
                },
                Err(_) => Error::Rejected {
                    code: if status == 422 {
                        "UNPROCESSABLE_BODY".to_string()
                    } else {
                        "BAD_REQUEST".to_string()
                    },
                    message: body,
                },
            },
            _ => Error::Status { status, body },
        }
    }
}
