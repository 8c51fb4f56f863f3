use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::codec;
use crate::error::{InterpretError, Result};

pub type TopicId = usize;

/// Sparse document-topic distribution. Ids absent from the map have
/// probability 0. Keys are kept as integers in memory; string keys only
/// exist at the store boundary (see `codec::to_persisted`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicDistribution(BTreeMap<TopicId, f64>);

impl TopicDistribution {
    pub fn new() -> Self {
        TopicDistribution(BTreeMap::new())
    }

    pub fn insert(&mut self, topic: TopicId, probability: f64) {
        self.0.insert(topic, probability);
    }

    pub fn get(&self, topic: TopicId) -> Option<f64> {
        self.0.get(&topic).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in ascending topic id order.
    pub fn iter(&self) -> impl Iterator<Item = (TopicId, f64)> + '_ {
        self.0.iter().map(|(&id, &p)| (id, p))
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }
}

impl FromIterator<(TopicId, f64)> for TopicDistribution {
    fn from_iter<I: IntoIterator<Item = (TopicId, f64)>>(iter: I) -> Self {
        TopicDistribution(iter.into_iter().collect())
    }
}

/// Dense topic vector: index i holds the probability of topic i.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DenseTopicVector(Vec<f64>);

impl DenseTopicVector {
    pub fn zeros(k: usize) -> Self {
        DenseTopicVector(vec![0.0; k])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, topic: TopicId) -> Option<f64> {
        self.0.get(topic).copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.0
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }
}

impl From<Vec<f64>> for DenseTopicVector {
    fn from(values: Vec<f64>) -> Self {
        DenseTopicVector(values)
    }
}

/// One publication, either pre-inference (tokens) or post-inference (topics).
#[derive(Debug, Clone, PartialEq)]
pub struct PublicationRecord {
    pub journal: String,
    pub year: i32,
    pub title: String,
    pub tokens: Option<Vec<String>>,
    pub topics: Option<TopicDistribution>,
}

impl PublicationRecord {
    /// Parse an untyped store record. `journal`, `year` and `title` are
    /// required; `tokens` and `topics` are optional.
    pub fn from_value(record: &Value) -> Result<Self> {
        let journal = required_str(record, "journal")?;
        let title = required_str(record, "title")?;
        let year = parse_year(record.get("year"))?;

        let tokens = match record.get("tokens") {
            None | Some(Value::Null) => None,
            Some(value) => Some(serde_json::from_value::<Vec<String>>(value.clone())?),
        };

        let topics = match record.get("topics") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(codec::from_persisted(map)?),
            Some(other) => {
                return Err(InterpretError::InvalidField {
                    field: "topics".to_string(),
                    value: format!("expected an object, got {}", other),
                })
            }
        };

        Ok(PublicationRecord {
            journal,
            year,
            title,
            tokens,
            topics,
        })
    }

    /// Derived record for the store: metadata plus string-keyed topics.
    /// Tokens are not carried over.
    pub fn to_persisted(&self) -> Value {
        let mut record = Map::new();
        record.insert("journal".to_string(), json!(self.journal));
        record.insert("year".to_string(), json!(self.year));
        record.insert("title".to_string(), json!(self.title));
        if let Some(topics) = &self.topics {
            record.insert("topics".to_string(), Value::Object(codec::to_persisted(topics)));
        }
        Value::Object(record)
    }
}

fn required_str(record: &Value, field: &str) -> Result<String> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| InterpretError::MissingField(field.to_string()))
}

// Years arrive as integers, whole floats or numeric strings depending on
// the importer.
fn parse_year(value: Option<&Value>) -> Result<i32> {
    let value = match value {
        None | Some(Value::Null) => return Err(InterpretError::MissingField("year".to_string())),
        Some(value) => value,
    };
    let year = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|y| y.fract() == 0.0).map(|y| y as i64))
            .and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    };
    year.ok_or_else(|| InterpretError::InvalidField {
        field: "year".to_string(),
        value: value.to_string(),
    })
}

/// Categorical key documents are grouped by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Year(i32),
    Journal(String),
    DominantTopic(TopicId),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Year(year) => write!(f, "year {}", year),
            GroupKey::Journal(journal) => write!(f, "journal '{}'", journal),
            GroupKey::DominantTopic(topic) => write!(f, "dominant topic {}", topic),
        }
    }
}

/// Mean topic vector per group, keys in ascending order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CumulativeDistribution(BTreeMap<GroupKey, DenseTopicVector>);

impl CumulativeDistribution {
    pub fn new() -> Self {
        CumulativeDistribution(BTreeMap::new())
    }

    pub fn insert(&mut self, key: GroupKey, vector: DenseTopicVector) {
        self.0.insert(key, vector);
    }

    pub fn get(&self, key: &GroupKey) -> Option<&DenseTopicVector> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &DenseTopicVector)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&GroupKey, &mut DenseTopicVector)> {
        self.0.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_raw_record_with_tokens() {
        let value = json!({
            "journal": "Fish and Fisheries",
            "year": "2016",
            "title": "Narrow lenses",
            "tokens": ["stock", "assessment"]
        });
        let record = PublicationRecord::from_value(&value).unwrap();
        assert_eq!(record.year, 2016);
        assert_eq!(record.tokens.unwrap(), vec!["stock", "assessment"]);
        assert!(record.topics.is_none());
    }

    #[test]
    fn parses_derived_record_with_string_keys() {
        let value = json!({
            "journal": "ICES", "year": 1999, "title": "t",
            "topics": {"2": 0.75, "0": 0.25}
        });
        let record = PublicationRecord::from_value(&value).unwrap();
        let topics = record.topics.unwrap();
        assert_eq!(topics.iter().collect::<Vec<_>>(), vec![(0, 0.25), (2, 0.75)]);
    }

    #[test]
    fn missing_metadata_is_an_error() {
        let value = json!({"journal": "ICES", "title": "no year"});
        let err = PublicationRecord::from_value(&value).unwrap_err();
        assert!(matches!(err, InterpretError::MissingField(field) if field == "year"));
    }

    #[test]
    fn whole_float_year_is_accepted() {
        let value = json!({"journal": "ICES", "year": 2016.0, "title": "t"});
        assert_eq!(PublicationRecord::from_value(&value).unwrap().year, 2016);
    }

    #[test]
    fn malformed_year_is_not_reported_as_missing() {
        for year in [json!(2016.5), json!("sometime"), json!([2016])] {
            let value = json!({"journal": "ICES", "year": year, "title": "t"});
            let err = PublicationRecord::from_value(&value).unwrap_err();
            assert!(matches!(err, InterpretError::InvalidField { ref field, .. } if field == "year"), "{:?}", err);
        }
    }

    #[test]
    fn topics_must_be_an_object() {
        let value = json!({"journal": "ICES", "year": 1999, "title": "t", "topics": [0.5, 0.5]});
        let err = PublicationRecord::from_value(&value).unwrap_err();
        assert!(matches!(err, InterpretError::InvalidField { ref field, .. } if field == "topics"));
    }

    #[test]
    fn non_numeric_topic_key_is_rejected() {
        let value = json!({
            "journal": "ICES", "year": 1999, "title": "t",
            "topics": {"zero": 1.0}
        });
        let err = PublicationRecord::from_value(&value).unwrap_err();
        assert!(matches!(err, InterpretError::InvalidTopicKey(_)));
    }

    #[test]
    fn persisted_record_drops_tokens() {
        let record = PublicationRecord {
            journal: "ICES".to_string(),
            year: 2001,
            title: "t".to_string(),
            tokens: Some(vec!["cod".to_string()]),
            topics: Some([(1, 0.5)].into_iter().collect()),
        };
        let value = record.to_persisted();
        assert!(value.get("tokens").is_none());
        assert_eq!(value["topics"]["1"], json!(0.5));
        assert_eq!(value["year"], json!(2001));
    }

    #[test]
    fn group_keys_order_within_variant() {
        assert!(GroupKey::Year(1990) < GroupKey::Year(2016));
        assert!(GroupKey::DominantTopic(2) < GroupKey::DominantTopic(10));
        assert!(GroupKey::Journal("A".into()) < GroupKey::Journal("B".into()));
    }
}
