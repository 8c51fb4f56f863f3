//! Per-document topic inference. Raw records are read once, each document
//! with tokens is run through the model, and the result is appended to a
//! separate derived collection. Raw records are never modified.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::codec;
use crate::error::{InterpretError, Result};
use crate::models::PublicationRecord;
use crate::store::DocumentStore;
use crate::topic_modeling::TopicModel;

/// Counts for one inference pass over a collection.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceSummary {
    pub source: String,
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub processed: usize,
    pub skipped_missing_tokens: usize,
    pub failed: usize,
}

/// Derived record for one raw document: metadata plus inferred topics,
/// without tokens. Fails with `MissingTokens` when there is nothing to
/// infer from, and with `Model` when the model assigns no topic at all.
pub fn infer_document<M: TopicModel>(model: &M, record: &Value) -> Result<PublicationRecord> {
    let document = PublicationRecord::from_value(record)?;
    let tokens = document.tokens.as_ref().ok_or(InterpretError::MissingTokens)?;

    let bow = model.doc_to_bow(tokens);
    let topics = model.infer_topics(&bow)?;
    if topics.is_empty() {
        return Err(InterpretError::Model(format!(
            "no topic above the reporting threshold for '{}'",
            document.title
        )));
    }
    let topics = codec::from_topic_list(&topics, model.num_topics())?;

    Ok(PublicationRecord {
        tokens: None,
        topics: Some(topics),
        ..document
    })
}

/// What happened to one document of an inference pass.
#[derive(Debug)]
pub enum Inferred {
    Persisted(PublicationRecord),
    /// No tokens; nothing written.
    Skipped,
    /// Inference failed for this document only; nothing written.
    Failed(InterpretError),
}

/// Infers one document and appends it to `target`. Problems with the
/// document itself come back as `Skipped`/`Failed`; only a store error is
/// returned as `Err`.
pub fn infer_and_persist<S, M>(store: &mut S, model: &M, target: &str, record: &Value) -> Result<Inferred>
where
    S: DocumentStore,
    M: TopicModel,
{
    match infer_document(model, record) {
        Ok(derived) => {
            store.insert_one(target, derived.to_persisted())?;
            Ok(Inferred::Persisted(derived))
        }
        Err(InterpretError::MissingTokens) => {
            debug!("no tokens for {}, skipping", describe(record));
            Ok(Inferred::Skipped)
        }
        Err(e) => {
            warn!("inference failed for {}: {}", describe(record), e);
            Ok(Inferred::Failed(e))
        }
    }
}

/// Runs inference over every record of `source`. A failing document is
/// logged and counted; only store errors stop the pass.
pub fn run_inference_pass<S, M>(
    store: &mut S,
    model: &M,
    source: &str,
    target: &str,
) -> Result<InferenceSummary>
where
    S: DocumentStore,
    M: TopicModel,
{
    info!("Start inference pass {} -> {}", source, target);
    let started_at = Utc::now();

    let records = store.read_collection(source)?;
    let total = records.len();
    let mut processed = 0;
    let mut skipped_missing_tokens = 0;
    let mut failed = 0;

    for (i, record) in records.iter().enumerate() {
        log_document(i, total, record);

        match infer_and_persist(store, model, target, record)? {
            Inferred::Persisted(_) => processed += 1,
            Inferred::Skipped => skipped_missing_tokens += 1,
            Inferred::Failed(_) => failed += 1,
        }

        if (i + 1) % 1000 == 0 {
            info!("Inferred {}/{} documents", i + 1, total);
        }
    }

    let summary = InferenceSummary {
        source: source.to_string(),
        target: target.to_string(),
        started_at,
        finished_at: Utc::now(),
        total,
        processed,
        skipped_missing_tokens,
        failed,
    };
    info!(
        "Inference done: {} processed, {} without tokens, {} failed of {}",
        processed, skipped_missing_tokens, failed, total
    );
    Ok(summary)
}

fn describe(record: &Value) -> String {
    match record.get("title").and_then(Value::as_str) {
        Some(title) => format!("'{}'", title),
        None => "untitled record".to_string(),
    }
}

pub(crate) fn log_document(i: usize, total: usize, record: &Value) {
    let field = |name: &str| record.get(name).map(Value::to_string).unwrap_or_default();
    debug!("processing file: {}/{}", i + 1, total);
    debug!(journal = %field("journal"), year = %field("year"), title = %field("title"));
}
