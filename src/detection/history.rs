use crate::processing::Classification;
use std::collections::VecDeque;

/// Outcome of one KWS window
#[derive(Debug, Clone, PartialEq)]
pub struct KwsResult {
    /// Classifications scoring at or above `threshold`, best first
    pub classifications: Vec<Classification>,
    /// Seconds since streaming started
    pub timestamp: f32,
    pub index: u64,
    pub threshold: f32,
}

impl KwsResult {
    pub fn new(classifications: Vec<Classification>, timestamp: f32, index: u64, threshold: f32) -> Self {
        let classifications = classifications
            .into_iter()
            .filter(|c| c.score >= threshold)
            .collect();
        Self {
            classifications,
            timestamp,
            index,
            threshold,
        }
    }

    pub fn top(&self) -> Option<&Classification> {
        self.classifications.first()
    }
}

/// The last `capacity` KWS results, oldest first
#[derive(Debug, Clone)]
pub struct ResultHistory {
    entries: VecDeque<KwsResult>,
    capacity: usize,
}

impl ResultHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, result: KwsResult) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(result);
    }

    pub fn snapshot(&self) -> Vec<KwsResult> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &KwsResult> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&KwsResult> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification(label: &str, score: f32) -> Classification {
        Classification {
            label: label.to_string(),
            score,
            index: 0,
        }
    }

    #[test]
    fn test_result_keeps_scores_at_threshold() {
        let result = KwsResult::new(
            vec![
                classification("yes", 0.9),
                classification("no", 0.7),
                classification("up", 0.69),
            ],
            0.5,
            1,
            0.7,
        );
        let labels: Vec<&str> = result.classifications.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["yes", "no"]);
        assert_eq!(result.top().unwrap().label, "yes");

        let empty = KwsResult::new(vec![classification("up", 0.1)], 0.0, 0, 0.7);
        assert!(empty.top().is_none());
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut history = ResultHistory::new(2);
        assert!(history.is_empty());
        for i in 0..3 {
            history.push(KwsResult::new(Vec::new(), i as f32, i, 0.5));
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.capacity(), 2);
        let indices: Vec<u64> = history.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(history.latest().unwrap().index, 2);
    }

    #[test]
    fn test_history_iterates_newest_first_in_reverse() {
        let mut history = ResultHistory::new(4);
        for i in 0..6 {
            history.push(KwsResult::new(Vec::new(), i as f32, i, 0.5));
        }
        let newest: Vec<u64> = history.iter().rev().take(3).map(|r| r.index).collect();
        assert_eq!(newest, vec![5, 4, 3]);
    }
}
