/// Result alias that carries the custom [`PuppetError`] type.
pub type Result<T> = std::result::Result<T, PuppetError>;

/// Common error type for the core crate.
///
/// The per-tick pipeline never produces these; they are reserved for user
/// actions (saving, selecting sequences) and for configuration and IO.
#[derive(Debug, thiserror::Error)]
pub enum PuppetError {
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// A configuration value is out of its accepted range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A sequence must contain at least one pose.
    #[error("a sequence needs at least one pose")]
    EmptySequence,
    /// No sequence with the given id exists in the library.
    #[error("unknown sequence `{0}`")]
    UnknownSequence(String),
    /// A recorder operation that needs an active recording was called without one.
    #[error("the recorder is not running")]
    NotRecording,
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration (de)serialisation failures.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// The FFT backend rejected a buffer.
    #[error("fft failure: {0}")]
    Fft(String),
}

impl PuppetError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Shorthand for [`PuppetError::InvalidConfig`].
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl From<&str> for PuppetError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for PuppetError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl From<realfft::FftError> for PuppetError {
    fn from(value: realfft::FftError) -> Self {
        Self::Fft(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_readable() {
        let err = PuppetError::UnknownSequence("abc".into());
        assert_eq!(err.to_string(), "unknown sequence `abc`");

        let err: PuppetError = "boom".into();
        assert_eq!(err.to_string(), "boom");
    }
}
