pub mod aggregate;
pub mod codec;
pub mod config;
pub mod dominant;
pub mod error;
pub mod export;
pub mod inference;
pub mod labels;
pub mod models;
pub mod report;
pub mod store;
pub mod topic_modeling;

pub use config::AnalysisConfig;
pub use error::{InterpretError, Result};
pub use models::{CumulativeDistribution, DenseTopicVector, GroupKey, PublicationRecord, TopicDistribution, TopicId};
pub use store::{DocumentStore, JsonlStore, MemoryStore};
pub use topic_modeling::{LdaModel, ModelKey, TopicModel};
