//! Per-stage timing of both pipelines.

use crate::error::Result;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use strum::{Display, EnumIter, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
pub enum Stage {
    #[strum(serialize = "Preprocessing")]
    PreProcess,
    #[strum(serialize = "Inference")]
    Inference,
    #[strum(serialize = "Postprocessing")]
    PostProcess,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageStats {
    pub count: u64,
    pub total: Duration,
    pub max: Duration,
}

impl StageStats {
    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total / self.count as u32
        }
    }

    fn record(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
        self.max = self.max.max(elapsed);
    }
}

#[derive(Debug, Default)]
pub struct Profiler {
    stats: BTreeMap<(String, Stage), StageStats>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time `f` as `stage` of `pipeline`; failed runs are not recorded
    pub fn measure<T>(
        &mut self,
        pipeline: &str,
        stage: Stage,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let start = Instant::now();
        let value = f()?;
        let elapsed = start.elapsed();
        log::info!(
            "[{}] {} time = {:.3} ms",
            pipeline,
            stage,
            elapsed.as_secs_f64() * 1000.0
        );
        self.stats
            .entry((pipeline.to_string(), stage))
            .or_default()
            .record(elapsed);
        Ok(value)
    }

    pub fn stats(&self, pipeline: &str, stage: Stage) -> Option<StageStats> {
        self.stats.get(&(pipeline.to_string(), stage)).copied()
    }

    pub fn log_summary(&self) {
        if self.stats.is_empty() {
            return;
        }
        log::info!("📊 Profiling summary:");
        let pipelines: Vec<&String> = {
            let mut names: Vec<&String> = self.stats.keys().map(|(p, _)| p).collect();
            names.dedup();
            names
        };
        for pipeline in pipelines {
            for stage in Stage::iter() {
                if let Some(s) = self.stats.get(&(pipeline.clone(), stage)) {
                    log::info!(
                        "   [{}] {}: {} runs, mean {:.3} ms, max {:.3} ms",
                        pipeline,
                        stage,
                        s.count,
                        s.mean().as_secs_f64() * 1000.0,
                        s.max.as_secs_f64() * 1000.0
                    );
                }
            }
        }
    }
}
