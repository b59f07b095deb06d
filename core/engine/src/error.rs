use std::borrow::Cow;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone)]
pub struct PlayerError {
    message: Cow<'static, str>,
}

impl PlayerError {
    pub fn new<T>(message: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        Self {
            message: message.into(),
        }
    }

    /// Fetch-layer failure (network/HTTP). The pipeline retries before this
    /// reaches a caller.
    pub fn fetch<T: Display>(url: &str, cause: T) -> Self {
        Self::new(format!("fetch failed for {}: {}", url, cause))
    }

    /// Audio decode failure for a single chunk.
    pub fn decode<T: Display>(cause: T) -> Self {
        Self::new(format!("audio decode failed: {}", cause))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for PlayerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for PlayerError {}

pub type PlayerResult<T> = Result<T, PlayerError>;
