/// Failure of the external completion call. Fatal for the turn that raised it.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("could not decode completion response: {0}")]
    Parse(String),

    #[error("completion response contained no choices")]
    EmptyResponse,
}


#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("transcript io error: {0}")]
    Io(#[from] std::io::Error),
}


/// Errors raised while delivering a reply back to the user.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("invalid recipient id: {0}")]
    InvalidRecipient(String),

    #[error("discord error: {0}")]
    Discord(#[from] serenity::Error),
}
