use crate::detection::ResultHistory;
use crate::processing::Classification;
use serde::{Deserialize, Serialize};

/// When a sentinel detection switches over to image classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerPolicy {
    /// The current window alone decides
    #[default]
    LatestOnly,
    /// The last `required` windows must all carry the sentinel
    Debounced { required: usize },
}

#[derive(Debug, Clone)]
pub struct TriggerDetector {
    sentinel: String,
    threshold: f32,
    policy: TriggerPolicy,
}

impl TriggerDetector {
    pub fn new(sentinel: impl Into<String>, threshold: f32, policy: TriggerPolicy) -> Self {
        Self {
            sentinel: sentinel.into(),
            threshold,
            policy,
        }
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    pub fn policy(&self) -> TriggerPolicy {
        self.policy
    }

    fn fires(&self, top: Option<&Classification>) -> bool {
        top.is_some_and(|c| c.label == self.sentinel && c.score > self.threshold)
    }

    /// `current` is this window's unfiltered ranking; `history` already holds
    /// this window's result as its newest entry.
    pub fn evaluate(&self, current: &[Classification], history: &ResultHistory) -> bool {
        if !self.fires(current.first()) {
            return false;
        }

        match self.policy {
            TriggerPolicy::LatestOnly => true,
            TriggerPolicy::Debounced { required } => {
                history.len() >= required
                    && history
                        .iter()
                        .rev()
                        .take(required)
                        .all(|result| self.fires(result.top()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::KwsResult;

    fn ranking(label: &str, score: f32) -> Vec<Classification> {
        vec![Classification {
            label: label.to_string(),
            score,
            index: 0,
        }]
    }

    #[test]
    fn test_latest_only_needs_sentinel_strictly_above_threshold() {
        let detector = TriggerDetector::new("_silence_", 0.8, TriggerPolicy::LatestOnly);
        let history = ResultHistory::new(4);

        assert!(detector.evaluate(&ranking("_silence_", 0.92), &history));
        assert!(!detector.evaluate(&ranking("_silence_", 0.8), &history));
        assert!(!detector.evaluate(&ranking("yes", 0.99), &history));
        assert!(!detector.evaluate(&[], &history));
    }

    #[test]
    fn test_debounced_needs_consecutive_hits() {
        let detector = TriggerDetector::new("_silence_", 0.8, TriggerPolicy::Debounced { required: 2 });
        let mut history = ResultHistory::new(4);

        let hit = ranking("_silence_", 0.9);
        history.push(KwsResult::new(hit.clone(), 0.0, 0, 0.8));
        assert!(!detector.evaluate(&hit, &history));

        history.push(KwsResult::new(hit.clone(), 0.5, 1, 0.8));
        assert!(detector.evaluate(&hit, &history));

        history.push(KwsResult::new(ranking("no", 0.95), 1.0, 2, 0.8));
        history.push(KwsResult::new(hit.clone(), 1.5, 3, 0.8));
        assert!(!detector.evaluate(&hit, &history));
    }

    #[test]
    fn test_policy_from_json() {
        let policy: TriggerPolicy = serde_json::from_str(r#"{"kind":"debounced","required":3}"#).unwrap();
        assert_eq!(policy, TriggerPolicy::Debounced { required: 3 });
        let policy: TriggerPolicy = serde_json::from_str(r#"{"kind":"latest_only"}"#).unwrap();
        assert_eq!(policy, TriggerPolicy::LatestOnly);
    }
}
