use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_json::Value;

use crate::error::{InterpretError, Result};
use crate::models::TopicId;

/// Human labels per topic id, one per topic of the active model.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicLabels {
    labels: Vec<String>,
}

impl TopicLabels {
    pub fn new(labels: Vec<String>) -> Self {
        TopicLabels { labels }
    }

    /// "Topic 0", "Topic 1", ... for runs where topics are not labelled yet.
    pub fn numbered(k: usize) -> Self {
        TopicLabels::new((0..k).map(|id| format!("Topic {}", id)).collect())
    }

    /// Reads a JSON array of labels, or an object keyed by topic id, and
    /// checks that it covers exactly `k` topics.
    pub fn load(path: &Path, k: usize) -> Result<Self> {
        let value: Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        let labels = match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(label) => Ok(label),
                    other => Err(InterpretError::Label(format!("label {} is not a string", other))),
                })
                .collect::<Result<Vec<_>>>()?,
            Value::Object(map) => {
                let mut labels = vec![None; map.len()];
                for (key, item) in map {
                    let id = key
                        .parse::<TopicId>()
                        .map_err(|_| InterpretError::InvalidTopicKey(key.clone()))?;
                    let label = item
                        .as_str()
                        .ok_or_else(|| InterpretError::Label(format!("label for topic {} is not a string", id)))?;
                    let slot = labels
                        .get_mut(id)
                        .ok_or_else(|| InterpretError::Label(format!("labels skip ids before topic {}", id)))?;
                    *slot = Some(label.to_string());
                }
                labels.into_iter().flatten().collect()
            }
            _ => return Err(InterpretError::Label("expected an array or object of labels".to_string())),
        };

        if labels.len() != k {
            return Err(InterpretError::Label(format!(
                "{} labels for a model with {} topics",
                labels.len(),
                k
            )));
        }
        Ok(TopicLabels::new(labels))
    }

    pub fn label_for(&self, topic: TopicId) -> Result<&str> {
        self.labels
            .get(topic)
            .map(String::as_str)
            .ok_or(InterpretError::InvalidTopicId { id: topic, k: self.labels.len() })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
