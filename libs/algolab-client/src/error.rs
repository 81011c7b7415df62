use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Server unreachable, connection reset, request timed out
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response; `message` is the server-provided text when present
    #[error("{message} (HTTP {status})")]
    Server { status: StatusCode, message: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("gave up after {0} status checks")]
    PollLimit(u32),
}

impl ApiError {
    /// Whether a failed poll tick should be retried on the next tick.
    ///
    /// Network failures, 5xx, 408 and 429 are transient. Any other
    /// 4xx means the job id or credentials are wrong and polling stops.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Server { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Decode(_) | ApiError::PollLimit(_) => false,
        }
    }

    pub fn server(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Server {
            status,
            message: message.into(),
        }
    }
}
