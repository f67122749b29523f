//! Dual-pipeline orchestrator
//!
//! Keyword spotting runs continuously over an overlapping audio window. When
//! the trigger label is detected, audio capture stops, the image model takes
//! over the shared arena for a short camera burst, and keyword spotting then
//! reclaims the arena and resumes listening.
//!
//! ```text
//! Priming ──► Listening ──(trigger)──► Classifying
//!                 ▲  │                     │
//!                 │  └─(single-shot)─► Stopped ◄─(single-shot)
//!                 └────────────────────────┘
//! ```

pub mod burst;

pub use burst::{run_burst, BurstReport};

use crate::arena::{Lease, SharedArena};
use crate::audio::{AudioDriver, AudioStreamBuffer};
use crate::camera::CameraDriver;
use crate::config::UseCaseConfig;
use crate::detection::{KwsResult, ResultHistory, TriggerDetector};
use crate::display::{self, Color, DisplayDriver};
use crate::error::Result;
use crate::models::ModelContext;
use crate::notify::{LabelChangeTracker, LabelNotifier};
use crate::platform::Delay;
use crate::processing::{AudioPreProcess, Classification, ImagePreProcess, PostProcess};
use crate::profiler::{Profiler, Stage};
use std::time::Duration;

/// Profiler names of the two pipelines
pub const KWS_PIPELINE: &str = "kws";
pub const IMG_PIPELINE: &str = "img";

pub struct KwsPipeline {
    pub context: ModelContext,
    pub pre: Box<dyn AudioPreProcess>,
    pub post: Box<dyn PostProcess>,
}

impl KwsPipeline {
    pub fn new(
        context: ModelContext,
        pre: Box<dyn AudioPreProcess>,
        post: Box<dyn PostProcess>,
    ) -> Self {
        Self { context, pre, post }
    }
}

pub struct ImagePipeline {
    pub context: ModelContext,
    pub pre: Box<dyn ImagePreProcess>,
    pub post: Box<dyn PostProcess>,
    pub score_threshold: f32,
}

impl ImagePipeline {
    pub fn new(
        context: ModelContext,
        pre: Box<dyn ImagePreProcess>,
        post: Box<dyn PostProcess>,
        score_threshold: f32,
    ) -> Self {
        Self {
            context,
            pre,
            post,
            score_threshold,
        }
    }
}

/// Everything the application owns, assembled once at startup
pub struct UseCase {
    pub arena: SharedArena,
    pub kws: KwsPipeline,
    pub image: ImagePipeline,
}

/// Devices the orchestrator drives
pub struct Peripherals {
    pub audio: Box<dyn AudioDriver>,
    pub camera: Box<dyn CameraDriver>,
    pub display: Box<dyn DisplayDriver>,
    pub notifier: Box<dyn LabelNotifier>,
    pub delay: Box<dyn Delay>,
}

#[derive(Debug)]
pub enum PipelineState {
    /// Nothing claimed yet, audio not started
    Priming,
    /// KWS owns the arena through `lease`
    Listening { lease: Lease },
    /// Trigger seen; the image burst runs on the next step
    Classifying { trigger: Classification },
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Finished,
}

pub struct Orchestrator {
    state: PipelineState,
    use_case: UseCase,
    peripherals: Peripherals,
    audio: AudioStreamBuffer,
    history: ResultHistory,
    trigger: TriggerDetector,
    labels: LabelChangeTracker,
    profiler: Profiler,
    sample_rate: u32,
    kws_threshold: f32,
    max_frames: usize,
    settling_delay: Duration,
    single_shot: bool,
    audio_initialized: bool,
    index: u64,
    bursts: u64,
    last_burst: Option<BurstReport>,
}

impl Orchestrator {
    pub fn new(config: &UseCaseConfig, use_case: UseCase, peripherals: Peripherals) -> Result<Self> {
        config.validate()?;
        let kws = &config.kws;

        Ok(Self {
            state: PipelineState::Priming,
            use_case,
            peripherals,
            audio: AudioStreamBuffer::new(kws.window_len, kws.hop_len)?,
            history: ResultHistory::new(config.history_capacity),
            trigger: TriggerDetector::new(kws.sentinel_label.clone(), kws.score_threshold, kws.trigger),
            labels: LabelChangeTracker::new(kws.sentinel_label.clone()),
            profiler: Profiler::new(),
            sample_rate: kws.sample_rate,
            kws_threshold: kws.score_threshold,
            max_frames: config.image.max_frames,
            settling_delay: config.settling_delay(),
            single_shot: config.single_shot,
            audio_initialized: false,
            index: 0,
            bursts: 0,
            last_burst: None,
        })
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// The live KWS lease while listening
    pub fn kws_lease(&self) -> Option<&Lease> {
        match &self.state {
            PipelineState::Listening { lease } => Some(lease),
            _ => None,
        }
    }

    pub fn arena(&self) -> &SharedArena {
        &self.use_case.arena
    }

    pub fn history(&self) -> &ResultHistory {
        &self.history
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    /// Index of the next KWS window
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn bursts(&self) -> u64 {
        self.bursts
    }

    /// Report of the most recent burst that completed without error
    pub fn last_burst(&self) -> Option<&BurstReport> {
        self.last_burst.as_ref()
    }

    /// Run until single-shot completion or a fatal error
    pub fn run(&mut self) -> Result<()> {
        log::info!("🚀 Starting keyword-triggered image classification");
        loop {
            match self.step() {
                Ok(StepOutcome::Continue) => {}
                Ok(StepOutcome::Finished) => break,
                Err(e) => {
                    log::error!("❌ Pipeline stopped: {}", e);
                    self.peripherals.audio.stop();
                    self.profiler.log_summary();
                    return Err(e);
                }
            }
        }
        self.profiler.log_summary();
        Ok(())
    }

    /// Advance the state machine by one transition. After an error the
    /// orchestrator is left `Stopped`.
    pub fn step(&mut self) -> Result<StepOutcome> {
        let state = std::mem::replace(&mut self.state, PipelineState::Stopped);
        self.state = match state {
            PipelineState::Priming => self.prime()?,
            PipelineState::Listening { lease } => self.listen(lease)?,
            PipelineState::Classifying { trigger } => self.classify(trigger)?,
            PipelineState::Stopped => return Ok(StepOutcome::Finished),
        };

        Ok(match self.state {
            PipelineState::Stopped => StepOutcome::Finished,
            _ => StepOutcome::Continue,
        })
    }

    fn prime(&mut self) -> Result<PipelineState> {
        let lease = self
            .use_case
            .kws
            .context
            .initialize(&mut self.use_case.arena, None)
            .inspect_err(|e| log::error!("KWS model init failed: {}", e))?;

        if !self.audio_initialized {
            self.peripherals.audio.init(self.sample_rate)?;
            self.audio_initialized = true;
            log::info!("🎤 Audio initialized at {} Hz", self.sample_rate);
        }

        self.audio.prime(self.peripherals.audio.as_mut())?;
        Ok(PipelineState::Listening { lease })
    }

    fn listen(&mut self, lease: Lease) -> Result<PipelineState> {
        let input = lease.input(0)?;
        let output = lease.output(0)?;

        let driver = self.peripherals.audio.as_mut();
        self.audio.wait_for_next_chunk(driver)?;
        self.audio.advance()?;
        self.audio.request_next(driver)?;

        let index = self.index;
        let arena = &mut self.use_case.arena;
        let kws = &mut self.use_case.kws;
        let window = self.audio.window();

        self.profiler.measure(KWS_PIPELINE, Stage::PreProcess, || {
            let mut view = arena.view_mut(&input)?;
            kws.pre.process(window, index, &mut view)
        })?;
        self.profiler.measure(KWS_PIPELINE, Stage::Inference, || {
            kws.context.infer(arena, &lease)
        })?;
        let ranking = self.profiler.measure(KWS_PIPELINE, Stage::PostProcess, || {
            let view = arena.view(&output)?;
            kws.post.process(&view)
        })?;

        let seconds_per_hop = self.audio.hop_len() as f32 / self.sample_rate as f32;
        let result = KwsResult::new(
            ranking.clone(),
            index as f32 * seconds_per_hop,
            index,
            self.kws_threshold,
        );
        self.labels.observe(&result, self.peripherals.notifier.as_mut());
        self.history.push(result);
        self.present_history();

        match ranking.first() {
            Some(top) => log::info!(
                "Inference #{}: Label={}, Score={:.2}%",
                index,
                top.label,
                top.score * 100.0
            ),
            None => log::info!("Inference #{}: None", index),
        }

        if self.trigger.evaluate(&ranking, &self.history) {
            if let Some(top) = ranking.into_iter().next() {
                log::info!("🔔 Trigger '{}' detected! Switching to image classification", top.label);
                self.peripherals.audio.stop();
                self.audio.abandon_capture();
                return Ok(PipelineState::Classifying { trigger: top });
            }
        }

        self.index += 1;
        if self.single_shot {
            return Ok(PipelineState::Stopped);
        }
        Ok(PipelineState::Listening { lease })
    }

    fn classify(&mut self, trigger: Classification) -> Result<PipelineState> {
        log::debug!("Image burst triggered by '{}' ({:.2})", trigger.label, trigger.score);
        self.bursts += 1;

        let UseCase { arena, kws, image } = &mut self.use_case;
        let outcome = run_burst(
            image,
            arena,
            kws.context.allocator(),
            self.peripherals.camera.as_mut(),
            self.peripherals.display.as_mut(),
            &mut self.profiler,
            self.max_frames,
        );

        match outcome {
            Ok(report) => {
                if report.processed == 0 {
                    log::info!(
                        "Images skipped! Waiting {:?} for hardware to settle",
                        self.settling_delay
                    );
                    self.peripherals.delay.delay(self.settling_delay);
                }
                self.last_burst = Some(report);
            }
            Err(e) => log::error!("Image classification failed: {}", e),
        }

        log::info!("Returning to KWS, re-initializing model");
        let lease = kws
            .context
            .initialize(arena, None)
            .inspect_err(|e| log::error!("KWS re-init failed: {}", e))?;
        kws.pre.reset();

        log::info!("Restarting audio capture");
        self.audio.resume(self.peripherals.audio.as_mut())?;
        if let Err(e) = self.peripherals.display.clear(Color::Black) {
            log::warn!("Display clear failed: {}", e);
        }

        if self.single_shot {
            return Ok(PipelineState::Stopped);
        }
        Ok(PipelineState::Listening { lease })
    }

    fn present_history(&mut self) {
        let screen = self.peripherals.display.as_mut();
        let drawn = screen
            .clear(Color::Black)
            .and_then(|_| display::present_kws_results(screen, self.history.iter()));
        if let Err(e) = drawn {
            log::warn!("Failed to present KWS results: {}", e);
        }
    }
}
