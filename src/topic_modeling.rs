use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use counter::Counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{InterpretError, Result};
use crate::models::TopicId;

/// Bag of words: `(word_id, count)` pairs sorted by word id.
pub type Bow = Vec<(usize, usize)>;

/// A trained topic model. Inference must be a deterministic function of
/// the tokens for a fixed set of model parameters.
pub trait TopicModel {
    fn num_topics(&self) -> usize;

    fn doc_to_bow(&self, tokens: &[String]) -> Bow;

    /// Sparse `(topic, probability)` list; near-zero topics may be omitted.
    fn infer_topics(&self, bow: &Bow) -> Result<Vec<(TopicId, f64)>>;

    /// The `n` highest-weight words of a topic, strongest first.
    fn top_words(&self, topic: TopicId, n: usize) -> Result<Vec<(String, f64)>>;
}

/// Hyperparameters identifying one trained model. Picked once after the
/// coherence evaluation and used as an opaque handle afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelKey {
    pub k: usize,
    pub dir_prior: String,
    pub random_state: u64,
    pub num_pass: u32,
    pub iteration: u32,
}

impl Default for ModelKey {
    fn default() -> Self {
        ModelKey {
            k: 10,
            dir_prior: "auto".to_string(),
            random_state: 42,
            num_pass: 15,
            iteration: 200,
        }
    }
}

impl ModelKey {
    /// `<models>/<k>/<prior>/<seed>/<passes>/<iterations>/model.json`
    pub fn artifact_path(&self, models_folder: &Path) -> PathBuf {
        models_folder
            .join(self.k.to_string())
            .join(&self.dir_prior)
            .join(self.random_state.to_string())
            .join(self.num_pass.to_string())
            .join(self.iteration.to_string())
            .join("model.json")
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "K={} prior={} seed={} passes={} iterations={}",
            self.k, self.dir_prior, self.random_state, self.num_pass, self.iteration
        )
    }
}

/// Serialized form of a trained LDA model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdaArtifact {
    pub num_topics: usize,
    /// Document-topic prior, one entry per topic.
    pub alpha: Vec<f64>,
    /// Word list; the position of a word is its id.
    pub vocabulary: Vec<String>,
    /// Topics x words.
    pub topic_word: Vec<Vec<f64>>,
}

pub struct InferenceConfig {
    pub iterations: usize,
    pub gamma_threshold: f64,
    pub minimum_probability: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        InferenceConfig {
            iterations: 50,
            gamma_threshold: 0.001,
            minimum_probability: 0.01,
        }
    }
}

pub struct LdaModel {
    artifact: LdaArtifact,
    word_ids: HashMap<String, usize>,
    config: InferenceConfig,
}

impl LdaModel {
    pub fn new(artifact: LdaArtifact, config: InferenceConfig) -> Result<Self> {
        validate_artifact(&artifact)?;
        let word_ids = artifact
            .vocabulary
            .iter()
            .enumerate()
            .map(|(i, word)| (word.clone(), i))
            .collect();
        Ok(LdaModel {
            artifact,
            word_ids,
            config,
        })
    }

    /// Loads the artifact for `key` and checks it has `key.k` topics.
    pub fn load(models_folder: &Path, key: &ModelKey) -> Result<Self> {
        let path = key.artifact_path(models_folder);
        info!("Loading LDA model {} from {}", key, path.display());

        let reader = BufReader::new(File::open(&path)?);
        let artifact: LdaArtifact = serde_json::from_reader(reader)?;
        if artifact.num_topics != key.k {
            return Err(InterpretError::Model(format!(
                "artifact {} has {} topics, expected {}",
                path.display(),
                artifact.num_topics,
                key.k
            )));
        }

        let config = InferenceConfig {
            iterations: key.iteration as usize,
            ..InferenceConfig::default()
        };
        LdaModel::new(artifact, config)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.artifact.vocabulary.len()
    }

    // Variational fold-in of one document: alternate phi (per word) and
    // gamma (per topic) updates until gamma settles.
    fn infer_gamma(&self, bow: &Bow) -> Vec<f64> {
        let alpha = &self.artifact.alpha;
        let k = self.artifact.num_topics;
        let total: usize = bow.iter().map(|(_, count)| count).sum();

        if bow.is_empty() {
            return alpha.clone();
        }

        let mut gamma: Vec<f64> = alpha.iter().map(|a| a + total as f64 / k as f64).collect();
        let mut weights = vec![0.0; k];

        for iteration in 0..self.config.iterations {
            // exp(E[log theta]); the digamma(sum gamma) term cancels in the
            // per-word normalisation below.
            let exp_elog_theta: Vec<f64> = gamma.iter().map(|&g| digamma(g).exp()).collect();
            let mut next = alpha.clone();

            for &(word, count) in bow {
                for (topic, weight) in weights.iter_mut().enumerate() {
                    *weight = exp_elog_theta[topic] * self.artifact.topic_word[topic][word];
                }
                let norm = weights.iter().sum::<f64>() + 1e-100;
                for (slot, weight) in next.iter_mut().zip(&weights) {
                    *slot += count as f64 * weight / norm;
                }
            }

            let change = gamma
                .iter()
                .zip(&next)
                .map(|(old, new)| (old - new).abs())
                .sum::<f64>()
                / k as f64;
            gamma = next;

            if change < self.config.gamma_threshold {
                debug!(iteration, "document inference converged");
                break;
            }
        }

        gamma
    }
}

impl TopicModel for LdaModel {
    fn num_topics(&self) -> usize {
        self.artifact.num_topics
    }

    fn doc_to_bow(&self, tokens: &[String]) -> Bow {
        let mut counts: Counter<usize> = Counter::new();
        for token in tokens {
            if let Some(&id) = self.word_ids.get(token) {
                counts[&id] += 1;
            }
        }
        let mut bow: Bow = counts.into_iter().collect();
        bow.sort_unstable();
        bow
    }

    fn infer_topics(&self, bow: &Bow) -> Result<Vec<(TopicId, f64)>> {
        if let Some(&(word, _)) = bow.iter().find(|(word, _)| *word >= self.vocabulary_size()) {
            return Err(InterpretError::Model(format!("word id {} is not in the vocabulary", word)));
        }

        let gamma = self.infer_gamma(bow);
        let norm: f64 = gamma.iter().sum();

        Ok(gamma
            .into_iter()
            .map(|g| g / norm)
            .enumerate()
            .filter(|(_, p)| *p >= self.config.minimum_probability)
            .collect())
    }

    fn top_words(&self, topic: TopicId, n: usize) -> Result<Vec<(String, f64)>> {
        let k = self.artifact.num_topics;
        let row = self
            .artifact
            .topic_word
            .get(topic)
            .ok_or(InterpretError::InvalidTopicId { id: topic, k })?;

        let mut word_probs: Vec<(usize, f64)> = row.iter().copied().enumerate().collect();
        word_probs.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        word_probs.truncate(n);

        Ok(word_probs
            .into_iter()
            .map(|(word, prob)| (self.artifact.vocabulary[word].clone(), prob))
            .collect())
    }
}

fn validate_artifact(artifact: &LdaArtifact) -> Result<()> {
    let k = artifact.num_topics;
    let vocab = artifact.vocabulary.len();

    if k == 0 {
        return Err(InterpretError::Model("model has no topics".to_string()));
    }
    if artifact.alpha.len() != k {
        return Err(InterpretError::Model(format!(
            "alpha has {} entries for {} topics",
            artifact.alpha.len(),
            k
        )));
    }
    if artifact.alpha.iter().any(|a| !a.is_finite() || *a <= 0.0) {
        return Err(InterpretError::Model("alpha must be positive".to_string()));
    }
    if artifact.topic_word.len() != k {
        return Err(InterpretError::Model(format!(
            "topic-word matrix has {} rows for {} topics",
            artifact.topic_word.len(),
            k
        )));
    }
    for (topic, row) in artifact.topic_word.iter().enumerate() {
        if row.len() != vocab {
            return Err(InterpretError::Model(format!(
                "topic {} has {} word weights for a vocabulary of {}",
                topic,
                row.len(),
                vocab
            )));
        }
        if row.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(InterpretError::Model(format!("topic {} has invalid word weights", topic)));
        }
    }
    Ok(())
}

// Asymptotic expansion after shifting x above 6.
fn digamma(mut x: f64) -> f64 {
    let mut result = 0.0;
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    result + x.ln() - 0.5 * inv
        - inv2 * (1.0 / 12.0 - inv2 * (1.0 / 120.0 - inv2 * (1.0 / 252.0 - inv2 * (1.0 / 240.0 - inv2 / 132.0))))
}
