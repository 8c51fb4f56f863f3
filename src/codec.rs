//! Conversion between sparse topic distributions and dense, id-ordered
//! vectors, plus the string-keyed form used at the store boundary.

use serde_json::{Map, Value};

use crate::error::{InterpretError, Result};
use crate::models::{DenseTopicVector, TopicDistribution, TopicId};

/// Dense vector of length `k`; index i is the probability of topic i, 0.0
/// when absent. An id `>= k` is a data-integrity error, never clamped.
pub fn densify(sparse: &TopicDistribution, k: usize) -> Result<DenseTopicVector> {
    let mut dense = DenseTopicVector::zeros(k);
    let slots = dense.as_mut_slice();
    for (id, probability) in sparse.iter() {
        if id >= k {
            return Err(InterpretError::InvalidTopicId { id, k });
        }
        slots[id] = probability;
    }
    Ok(dense)
}

/// Sparse form of a dense vector; exact zeros are dropped.
pub fn sparsify(dense: &DenseTopicVector) -> TopicDistribution {
    dense
        .as_slice()
        .iter()
        .enumerate()
        .filter(|(_, &p)| p != 0.0)
        .map(|(id, &p)| (id, p))
        .collect()
}

/// Sparse distribution from a model's `(topic, probability)` list.
pub fn from_topic_list(topics: &[(TopicId, f64)], k: usize) -> Result<TopicDistribution> {
    let mut dist = TopicDistribution::new();
    for &(id, probability) in topics {
        if id >= k {
            return Err(InterpretError::InvalidTopicId { id, k });
        }
        dist.insert(id, probability);
    }
    Ok(dist)
}

/// String-keyed map for persistence; the store rejects non-string keys.
pub fn to_persisted(dist: &TopicDistribution) -> Map<String, Value> {
    dist.iter()
        .map(|(id, probability)| (id.to_string(), Value::from(probability)))
        .collect()
}

/// Inverse of `to_persisted`. Only canonical decimal keys ("3", not " 3",
/// "+3" or "03") are accepted, so two keys can never name the same topic.
pub fn from_persisted(map: &Map<String, Value>) -> Result<TopicDistribution> {
    let mut dist = TopicDistribution::new();
    for (key, value) in map {
        let id = key
            .parse::<TopicId>()
            .ok()
            .filter(|id| id.to_string() == *key)
            .ok_or_else(|| InterpretError::InvalidTopicKey(key.clone()))?;
        let probability = value
            .as_f64()
            .ok_or_else(|| InterpretError::InvalidProbability(key.clone()))?;
        dist.insert(id, probability);
    }
    Ok(dist)
}
