use crate::error::{EdgeError, Result};
use crate::models::TensorView;
use crate::processing::{Classification, PostProcess};

/// Top-K scoring of a classification output tensor
#[derive(Debug, Clone)]
pub struct ClassifierPostProcess {
    labels: Vec<String>,
    top_k: usize,
    softmax: bool,
}

impl ClassifierPostProcess {
    pub fn new(labels: Vec<String>, top_k: usize) -> Self {
        Self {
            labels,
            top_k: top_k.max(1),
            softmax: false,
        }
    }

    /// Normalise scores with a softmax before ranking
    pub fn with_softmax(mut self, softmax: bool) -> Self {
        self.softmax = softmax;
        self
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

fn softmax_in_place(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > 0.0 {
        for v in values.iter_mut() {
            *v /= sum;
        }
    }
}

impl PostProcess for ClassifierPostProcess {
    fn process(&mut self, output: &TensorView<'_>) -> Result<Vec<Classification>> {
        let mut scores = output.to_f32_vec();
        if scores.len() != self.labels.len() {
            return Err(EdgeError::ProcessingError(format!(
                "Output has {} scores but there are {} labels",
                scores.len(),
                self.labels.len()
            )));
        }

        if self.softmax {
            softmax_in_place(&mut scores);
        }

        let mut ranked: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(ranked
            .into_iter()
            .take(self.top_k)
            .map(|(index, score)| Classification {
                label: self.labels[index].clone(),
                score,
                index,
            })
            .collect())
    }
}
