use poem::error::ResponseError;
use poem::http::StatusCode;
use poem::Response;
use serde_json::json;

/// Error taxonomy shared by every component boundary in the agent.
///
/// Mirrors `WarpgateError`'s shape (one `thiserror` enum per crate boundary,
/// `#[from]` conversions for the ambient I/O and serialization errors) but
/// maps to the `{"detail": "..."}` response body mandated rather
/// than the teacher's blanket 500.
#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limited, retry after {retry_after_secs:.3}s")]
    RateLimited { retry_after_secs: f64 },

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AgentError {
    fn status(&self) -> StatusCode {
        match self {
            AgentError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AgentError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AgentError::Forbidden => StatusCode::FORBIDDEN,
            AgentError::NotFound(_) => StatusCode::NOT_FOUND,
            AgentError::Conflict(_) => StatusCode::CONFLICT,
            AgentError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AgentError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AgentError::Io(_) | AgentError::Json(_) | AgentError::Anyhow(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl ResponseError for AgentError {
    fn status(&self) -> StatusCode {
        AgentError::status(self)
    }

    fn as_response(&self) -> Response {
        let body = json!({ "detail": self.to_string() }).to_string();
        let mut resp = Response::builder()
            .status(self.status())
            .content_type("application/json")
            .body(body);
        if let AgentError::RateLimited { retry_after_secs } = self {
            resp.headers_mut().insert(
                "Retry-After",
                poem::http::HeaderValue::from_str(&retry_after_secs.ceil().to_string())
                    .unwrap_or_else(|_| poem::http::HeaderValue::from_static("1")),
            );
        }
        resp
    }
}

pub type AgentResult<T> = Result<T, AgentError>;
