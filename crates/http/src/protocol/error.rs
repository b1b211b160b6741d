use thiserror::Error;

/// Errors raised while building the route table.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("route table is sealed, can not register {route}")]
    Sealed { route: String },

    #[error("fallback endpoint is already registered")]
    FallbackAlreadySet,
}

impl TransportError {
    pub fn sealed<S: ToString>(route: S) -> Self {
        Self::Sealed { route: route.to_string() }
    }
}

/// Errors raised while writing a response.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("response has already been sent")]
    AlreadySent,

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("invalid response: {source}")]
    InvalidResponse {
        #[from]
        source: http::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }
}
