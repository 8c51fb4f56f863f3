//! Report tables built from the persisted topic distributions. These are
//! the numeric structures the plotting side draws from; all aggregation
//! happens here and in `aggregate`.

use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::{dominant_topic_distribution, journal_distribution, suppress_self, year_distribution};
use crate::dominant::dominant;
use crate::error::{InterpretError, Result};
use crate::inference::log_document;
use crate::labels::TopicLabels;
use crate::models::{CumulativeDistribution, GroupKey, PublicationRecord, TopicId};
use crate::store::DocumentStore;
use crate::topic_modeling::TopicModel;

/// Reads and parses a derived collection. Malformed records abort.
pub fn load_publications<S: DocumentStore>(store: &S, collection: &str) -> Result<Vec<PublicationRecord>> {
    let records = store.read_collection(collection)?;
    let total = records.len();
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            if i % 1000 == 0 {
                log_document(i, total, record);
            }
            PublicationRecord::from_value(record)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleRow {
    pub year: i32,
    pub title: String,
    pub journal: String,
    pub dominant_topic_id: TopicId,
    pub dominant_topic_probability: f64,
}

/// Dominant topic of every document, in store order. Reading the titles
/// per topic helps when labelling topics.
pub fn title_table(documents: &[PublicationRecord]) -> Result<Vec<TitleRow>> {
    info!("Start title_table");
    let mut rows = Vec::with_capacity(documents.len());
    for document in documents {
        let Some(topics) = &document.topics else {
            debug!(title = %document.title, "no topics, leaving out of title table");
            continue;
        };
        let (dominant_topic_id, dominant_topic_probability) = dominant(topics)?;
        rows.push(TitleRow {
            year: document.year,
            title: document.title.clone(),
            journal: document.journal.clone(),
            dominant_topic_id,
            dominant_topic_probability,
        });
    }
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicSeries {
    pub topic_id: TopicId,
    pub label: String,
    pub values: Vec<f64>,
}

/// Mean share of every topic per year: one series per topic, aligned
/// with `years`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicsOverTime {
    pub years: Vec<i32>,
    pub series: Vec<TopicSeries>,
}

pub fn topics_over_time(
    documents: &[PublicationRecord],
    k: usize,
    labels: &TopicLabels,
) -> Result<TopicsOverTime> {
    info!("Start topics_over_time");
    let stacked = topics_stacked(documents, k, labels)?;

    let years = stacked.rows.iter().map(|row| row.year).collect();
    let series = stacked
        .labels
        .into_iter()
        .enumerate()
        .map(|(topic_id, label)| TopicSeries {
            topic_id,
            label,
            values: stacked.rows.iter().map(|row| row.shares[topic_id]).collect(),
        })
        .collect();

    Ok(TopicsOverTime { years, series })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearShares {
    pub year: i32,
    pub shares: Vec<f64>,
}

/// Same data as `TopicsOverTime`, one row per year, for stacked areas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackedTopics {
    pub labels: Vec<String>,
    pub rows: Vec<YearShares>,
}

pub fn topics_stacked(documents: &[PublicationRecord], k: usize, labels: &TopicLabels) -> Result<StackedTopics> {
    let labels = topic_labels(labels, k)?;
    let cumulative = year_distribution(documents, k)?;

    let rows = cumulative
        .iter()
        .filter_map(|(key, vector)| match key {
            GroupKey::Year(year) => Some(YearShares {
                year: *year,
                shares: vector.as_slice().to_vec(),
            }),
            _ => None,
        })
        .collect();

    Ok(StackedTopics { labels, rows })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapRow {
    pub label: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    pub column_labels: Vec<String>,
    pub rows: Vec<HeatmapRow>,
}

/// Which topics show up in documents dominated by another topic.
///
/// One row per topic (all K), one column per observed dominant-topic group.
/// Cells are the topic's mean share in that group in percent, with a
/// group's own topic zeroed. Row labels carry the topic's largest share
/// before zeroing, rows run from the largest share down (ties by topic id)
/// and columns are sorted by label.
pub fn co_occurrence(documents: &[PublicationRecord], k: usize, labels: &TopicLabels) -> Result<Heatmap> {
    info!("Start co_occurrence");
    let labels = topic_labels(labels, k)?;
    let cumulative = dominant_topic_distribution(documents, k)?;
    let suppressed = suppress_self(&cumulative);

    let mut groups: Vec<TopicId> = cumulative
        .iter()
        .filter_map(|(key, _)| match key {
            GroupKey::DominantTopic(topic) => Some(*topic),
            _ => None,
        })
        .collect();
    groups.sort_by(|a, b| labels[*a].cmp(&labels[*b]).then(a.cmp(b)));

    let share = |distribution: &CumulativeDistribution, group: TopicId, topic: TopicId| {
        distribution
            .get(&GroupKey::DominantTopic(group))
            .and_then(|vector| vector.get(topic))
            .unwrap_or(0.0)
            * 100.0
    };

    let mut rows: Vec<(TopicId, f64, HeatmapRow)> = (0..k)
        .map(|topic| {
            let max = groups
                .iter()
                .map(|&group| share(&cumulative, group, topic))
                .fold(0.0, f64::max);
            let values = groups.iter().map(|&group| share(&suppressed, group, topic)).collect();
            let label = format!("{} ({:.2}%)", labels[topic], max);
            (topic, max, HeatmapRow { label, values })
        })
        .collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    Ok(Heatmap {
        column_labels: groups.iter().map(|&group| labels[group].clone()).collect(),
        rows: rows.into_iter().map(|(_, _, row)| row).collect(),
    })
}

/// Mean topic distribution per journal, journals by name, topics by id.
pub fn journal_heatmap(documents: &[PublicationRecord], k: usize, labels: &TopicLabels) -> Result<Heatmap> {
    info!("Start journal_heatmap");
    let column_labels = topic_labels(labels, k)?;
    let cumulative = journal_distribution(documents, k)?;

    let rows = cumulative
        .iter()
        .filter_map(|(key, vector)| match key {
            GroupKey::Journal(journal) => Some(HeatmapRow {
                label: journal.clone(),
                values: vector.as_slice().to_vec(),
            }),
            _ => None,
        })
        .collect();

    Ok(Heatmap { column_labels, rows })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordWeight {
    pub word: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicWords {
    pub topic_id: TopicId,
    pub label: String,
    pub words: Vec<WordWeight>,
}

pub fn top_words_table<M: TopicModel>(model: &M, labels: &TopicLabels, n: usize) -> Result<Vec<TopicWords>> {
    let labels = topic_labels(labels, model.num_topics())?;
    labels
        .into_iter()
        .enumerate()
        .map(|(topic_id, label)| {
            let words = model
                .top_words(topic_id, n)?
                .into_iter()
                .map(|(word, weight)| WordWeight { word, weight })
                .collect();
            Ok(TopicWords { topic_id, label, words })
        })
        .collect()
}

fn topic_labels(labels: &TopicLabels, k: usize) -> Result<Vec<String>> {
    if labels.len() != k {
        return Err(InterpretError::Label(format!("{} labels for {} topics", labels.len(), k)));
    }
    (0..k).map(|topic| labels.label_for(topic).map(str::to_string)).collect()
}
