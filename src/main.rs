use anyhow::{Context, Result};
use clap::Parser;
use kws_img::{
    arena::SharedArena,
    audio::{WavAudioConfig, WavAudioDriver},
    camera::FrameSequenceCamera,
    config::UseCaseConfig,
    display::LogDisplay,
    models::{ModelBlob, ModelContext, TfliteBackend},
    notify::LogNotifier,
    pipeline::{ImagePipeline, KwsPipeline, Orchestrator, Peripherals, UseCase},
    platform::ThreadDelay,
    processing::{load_labels, ClassifierPostProcess, ImagePreProcessor, MfccPreProcessor},
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kws-img")]
#[command(about = "Keyword-triggered image classification on a shared tensor arena")]
struct Args {
    /// JSON configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// WAV file used as the microphone
    #[arg(short, long)]
    audio: PathBuf,

    /// Directory of raw RGB888 frames used as the camera
    #[arg(short, long)]
    frames: PathBuf,

    #[arg(long)]
    kws_model: Option<PathBuf>,

    #[arg(long)]
    kws_labels: Option<PathBuf>,

    #[arg(long)]
    img_model: Option<PathBuf>,

    #[arg(long)]
    img_labels: Option<PathBuf>,

    /// KWS score threshold
    #[arg(short, long)]
    threshold: Option<f32>,

    /// Tensor arena size in bytes
    #[arg(long)]
    arena_size: Option<usize>,

    /// Inference threads per model
    #[arg(long)]
    threads: Option<usize>,

    /// Stop after one listening step
    #[arg(long)]
    single_shot: bool,

    /// Restart the WAV file when it ends
    #[arg(long)]
    loop_audio: bool,

    /// Pace audio chunks in real time
    #[arg(long)]
    realtime: bool,
}

impl Args {
    fn resolve_config(&self) -> Result<UseCaseConfig> {
        let mut config = match &self.config {
            Some(path) => UseCaseConfig::from_json_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => UseCaseConfig::default(),
        };

        if let Some(path) = &self.kws_model {
            config.kws.model = path.clone();
        }
        if let Some(path) = &self.kws_labels {
            config.kws.labels = path.clone();
        }
        if let Some(path) = &self.img_model {
            config.image.model = path.clone();
        }
        if let Some(path) = &self.img_labels {
            config.image.labels = path.clone();
        }
        if let Some(threshold) = self.threshold {
            config.kws.score_threshold = threshold;
        }
        if let Some(size) = self.arena_size {
            config.arena_size = size;
        }
        if let Some(threads) = self.threads {
            config.thread_count = threads;
        }
        config.single_shot |= self.single_shot;

        config.validate()?;
        Ok(config)
    }
}

fn build_use_case(config: &UseCaseConfig) -> Result<UseCase> {
    let threads = i32::try_from(config.thread_count).context("Thread count out of range")?;

    let kws_blob = ModelBlob::from_file(&config.kws.model)?;
    let kws_labels = load_labels(&config.kws.labels)?;
    let kws = KwsPipeline::new(
        ModelContext::new("kws", kws_blob, Box::new(TfliteBackend::new(threads, 0))),
        Box::new(MfccPreProcessor::new(
            config.kws.mfcc(),
            config.kws.frame_stride,
            config.kws.hop_len,
        )?),
        Box::new(ClassifierPostProcess::new(kws_labels, 1).with_softmax(true)),
    );

    let img_blob = ModelBlob::from_file(&config.image.model)?;
    let img_labels = load_labels(&config.image.labels)?;
    let image = ImagePipeline::new(
        ModelContext::new("img", img_blob, Box::new(TfliteBackend::new(threads, 0))),
        Box::new(ImagePreProcessor::new()),
        Box::new(ClassifierPostProcess::new(img_labels, config.image.top_k)),
        config.image.score_threshold,
    );

    Ok(UseCase {
        arena: SharedArena::new(config.arena_size),
        kws,
        image,
    })
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = args.resolve_config()?;

    log::info!("🧠 KWS model: {}", config.kws.model.display());
    log::info!("🖼️ Image model: {}", config.image.model.display());
    log::info!("🎯 KWS threshold: {}", config.kws.score_threshold);

    let use_case = build_use_case(&config).context("Failed to set up models")?;

    let audio = WavAudioDriver::open(
        &args.audio,
        WavAudioConfig {
            looping: args.loop_audio,
            realtime: args.realtime,
        },
    )
    .with_context(|| format!("Failed to open audio {}", args.audio.display()))?;
    let camera = FrameSequenceCamera::from_dir(&args.frames)
        .with_context(|| format!("Failed to open frames {}", args.frames.display()))?;

    let peripherals = Peripherals {
        audio: Box::new(audio),
        camera: Box::new(camera),
        display: Box::new(LogDisplay),
        notifier: Box::new(LogNotifier),
        delay: Box::new(ThreadDelay),
    };

    let mut orchestrator = Orchestrator::new(&config, use_case, peripherals)?;
    if let Err(e) = orchestrator.run() {
        log::error!("❌ kws-img failed: {}", e);
        std::process::exit(1);
    }

    log::info!("👋 Done");
    Ok(())
}
