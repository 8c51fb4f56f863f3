//! Grouping of documents by categorical key and reduction of each group to
//! its mean topic vector.

use std::collections::BTreeMap;

use tracing::debug;

use crate::codec::densify;
use crate::dominant::dominant;
use crate::error::{InterpretError, Result};
use crate::models::{CumulativeDistribution, DenseTopicVector, GroupKey, PublicationRecord};

pub type Buckets = BTreeMap<GroupKey, Vec<DenseTopicVector>>;

/// Buckets dense topic vectors by `key_fn`. Documents without topics are
/// skipped. Within a bucket, vectors keep input document order.
///
/// The first corruption error (bad topic id, empty distribution in a key
/// function) aborts the whole grouping.
pub fn group_by<F>(documents: &[PublicationRecord], key_fn: F, k: usize) -> Result<Buckets>
where
    F: Fn(&PublicationRecord) -> Result<GroupKey>,
{
    let mut buckets = Buckets::new();
    let mut skipped = 0usize;

    for (i, document) in documents.iter().enumerate() {
        let Some(topics) = &document.topics else {
            debug!(index = i, title = %document.title, "skipping document without topics");
            skipped += 1;
            continue;
        };

        let key = key_fn(document)?;
        let vector = densify(topics, k)?;
        buckets.entry(key).or_default().push(vector);
    }

    if skipped > 0 {
        debug!(skipped, "documents excluded from grouping");
    }
    Ok(buckets)
}

/// Element-wise mean per bucket.
pub fn reduce(buckets: &Buckets) -> Result<CumulativeDistribution> {
    let mut cumulative = CumulativeDistribution::new();
    for (key, vectors) in buckets {
        cumulative.insert(key.clone(), mean(key, vectors)?);
    }
    Ok(cumulative)
}

fn mean(key: &GroupKey, vectors: &[DenseTopicVector]) -> Result<DenseTopicVector> {
    let first = vectors
        .first()
        .ok_or_else(|| InterpretError::EmptyGroup(key.to_string()))?;

    let mut sums = vec![0.0; first.len()];
    for vector in vectors {
        debug_assert_eq!(vector.len(), sums.len());
        for (sum, value) in sums.iter_mut().zip(vector.as_slice()) {
            *sum += value;
        }
    }

    let n = vectors.len() as f64;
    Ok(sums.into_iter().map(|sum| sum / n).collect::<Vec<_>>().into())
}

pub fn by_year(document: &PublicationRecord) -> Result<GroupKey> {
    Ok(GroupKey::Year(document.year))
}

pub fn by_journal(document: &PublicationRecord) -> Result<GroupKey> {
    Ok(GroupKey::Journal(document.journal.clone()))
}

pub fn by_dominant_topic(document: &PublicationRecord) -> Result<GroupKey> {
    let topics = document.topics.as_ref().ok_or(InterpretError::MissingTopics)?;
    let (topic, _) = dominant(topics)?;
    Ok(GroupKey::DominantTopic(topic))
}

pub fn year_distribution(documents: &[PublicationRecord], k: usize) -> Result<CumulativeDistribution> {
    reduce(&group_by(documents, by_year, k)?)
}

pub fn journal_distribution(documents: &[PublicationRecord], k: usize) -> Result<CumulativeDistribution> {
    reduce(&group_by(documents, by_journal, k)?)
}

pub fn dominant_topic_distribution(
    documents: &[PublicationRecord],
    k: usize,
) -> Result<CumulativeDistribution> {
    reduce(&group_by(documents, by_dominant_topic, k)?)
}

/// Zeroes entry `t` of the vector keyed by `DominantTopic(t)`, so a topic's
/// own share does not swamp a co-occurrence view. Other keys are untouched.
/// Only the co-occurrence report applies this.
pub fn suppress_self(cumulative: &CumulativeDistribution) -> CumulativeDistribution {
    let mut suppressed = cumulative.clone();
    for (key, vector) in suppressed.iter_mut() {
        if let GroupKey::DominantTopic(topic) = key {
            if let Some(slot) = vector.as_mut_slice().get_mut(*topic) {
                *slot = 0.0;
            }
        }
    }
    suppressed
}
