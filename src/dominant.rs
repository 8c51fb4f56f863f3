use crate::error::{InterpretError, Result};
use crate::models::{TopicDistribution, TopicId};

/// Topic with the highest probability. Ties go to the lowest topic id.
pub fn dominant(dist: &TopicDistribution) -> Result<(TopicId, f64)> {
    pick_max(dist.iter())
}

// Input must be in ascending id order; only a strictly greater value
// replaces the current best, so the first (lowest) id wins a tie.
fn pick_max<I>(entries: I) -> Result<(TopicId, f64)>
where
    I: Iterator<Item = (TopicId, f64)>,
{
    let mut best: Option<(TopicId, f64)> = None;
    for (id, probability) in entries {
        match best {
            Some((_, top)) if probability <= top => {}
            _ => best = Some((id, probability)),
        }
    }
    best.ok_or(InterpretError::EmptyDistribution)
}
