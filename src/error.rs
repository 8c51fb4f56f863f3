use thiserror::Error;

use crate::models::TopicId;

#[derive(Debug, Error)]
pub enum InterpretError {
    /// Document has no token list at inference time.
    #[error("document has no tokens")]
    MissingTokens,

    /// Document has no persisted topic distribution at aggregation time.
    #[error("document has no topic distribution")]
    MissingTopics,

    #[error("topic id {id} is outside the model's range 0..{k}")]
    InvalidTopicId { id: TopicId, k: usize },

    /// Persisted topic key that does not parse as a topic id.
    #[error("invalid persisted topic key '{0}'")]
    InvalidTopicKey(String),

    #[error("invalid probability for topic key '{0}'")]
    InvalidProbability(String),

    #[error("cannot select a dominant topic from an empty distribution")]
    EmptyDistribution,

    #[error("group {0} has no member documents")]
    EmptyGroup(String),

    #[error("record is missing field '{0}'")]
    MissingField(String),

    #[error("field '{field}' has an invalid value: {value}")]
    InvalidField { field: String, value: String },

    #[error("model error: {0}")]
    Model(String),

    #[error("label error: {0}")]
    Label(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl InterpretError {
    /// Errors that mean the persisted data or the model output is corrupt,
    /// as opposed to a missing file or a bad setting. The CLI exits with a
    /// distinct status for these.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            InterpretError::InvalidTopicId { .. }
                | InterpretError::InvalidTopicKey(_)
                | InterpretError::InvalidProbability(_)
                | InterpretError::EmptyDistribution
        )
    }
}

pub type Result<T> = std::result::Result<T, InterpretError>;
