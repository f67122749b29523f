//! Announces sentinel detections to whoever listens outside the pipeline.

use crate::detection::KwsResult;

pub trait LabelNotifier {
    fn notify(&mut self, label: &str);
}

/// Announces labels in the log
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LabelNotifier for LogNotifier {
    fn notify(&mut self, label: &str) {
        log::info!("📣 Label change: {}", label);
    }
}

/// Notifies once each time the top label changes to the sentinel
#[derive(Debug, Clone)]
pub struct LabelChangeTracker {
    sentinel: String,
    last_label: Option<String>,
}

impl LabelChangeTracker {
    pub fn new(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
            last_label: None,
        }
    }

    pub fn last_label(&self) -> Option<&str> {
        self.last_label.as_deref()
    }

    /// Returns whether `notifier` was called
    pub fn observe(&mut self, result: &KwsResult, notifier: &mut dyn LabelNotifier) -> bool {
        let Some(top) = result.top() else {
            self.last_label = None;
            return false;
        };

        if self.last_label.as_deref() == Some(top.label.as_str()) {
            return false;
        }

        let sent = top.label == self.sentinel;
        if sent {
            notifier.notify(&top.label);
        }
        self.last_label = Some(top.label.clone());
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::Classification;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl LabelNotifier for Recorder {
        fn notify(&mut self, label: &str) {
            self.0.push(label.to_string());
        }
    }

    fn result(label: Option<&str>) -> KwsResult {
        let classifications = label
            .map(|l| {
                vec![Classification {
                    label: l.to_string(),
                    score: 0.9,
                    index: 0,
                }]
            })
            .unwrap_or_default();
        KwsResult::new(classifications, 0.0, 0, 0.5)
    }

    #[test]
    fn test_notifies_on_change_to_sentinel_only() {
        let mut tracker = LabelChangeTracker::new("_silence_");
        let mut recorder = Recorder::default();

        assert!(!tracker.observe(&result(Some("yes")), &mut recorder));
        assert!(tracker.observe(&result(Some("_silence_")), &mut recorder));
        assert!(!tracker.observe(&result(Some("_silence_")), &mut recorder));
        assert!(!tracker.observe(&result(Some("no")), &mut recorder));
        assert!(tracker.observe(&result(Some("_silence_")), &mut recorder));
        assert_eq!(recorder.0.len(), 2);
    }

    #[test]
    fn test_empty_result_clears_memory() {
        let mut tracker = LabelChangeTracker::new("_silence_");
        let mut recorder = Recorder::default();

        tracker.observe(&result(Some("_silence_")), &mut recorder);
        tracker.observe(&result(None), &mut recorder);
        assert_eq!(tracker.last_label(), None);
        assert!(tracker.observe(&result(Some("_silence_")), &mut recorder));
        assert_eq!(recorder.0, vec!["_silence_", "_silence_"]);
    }
}
