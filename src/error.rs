//! Error types and the fail-open policy for non-critical paths.
//!
//! The drill loop propagates errors with `?`. Dashboard analytics instead log
//! a warning and fall back to an empty or default value through [`FailOpen`].

use thiserror::Error;

use crate::models::{Mood, TenseSelection};

#[derive(Error, Debug)]
pub enum ConjugaError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {message}")]
    Config { message: String },

    /// A specific mood/tense pair has no coverage in the corpus at all.
    #[error("not enough verbs for {mood} {tense}: no forms match this combination")]
    NoEligibleForms { mood: Mood, tense: TenseSelection },

    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("operation '{key}' was cancelled by a newer request")]
    Cancelled { key: String },

    #[error("operation '{key}' exceeded its {budget_ms}ms budget")]
    Timeout { key: String, budget_ms: u64 },
}

pub type Result<T> = std::result::Result<T, ConjugaError>;

impl ConjugaError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Message suitable for showing to the learner.
    pub fn user_message(&self) -> String {
        match self {
            ConjugaError::NoEligibleForms { .. } => {
                "Not enough verbs for this combination. Try another tense or widen your settings."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for ConjugaError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

/// Log-and-default handling for analytics and other non-critical loaders.
pub trait FailOpen<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                log::warn!("{}: {} (using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                log::warn!("{}: {} (using fallback)", context, err);
                fallback
            }
        }
    }
}
