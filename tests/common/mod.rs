//! Scripted backends and drivers shared by the integration tests.
#![allow(dead_code)]

use kws_img::{
    arena::SharedArena,
    audio::AudioDriver,
    camera::{CameraDriver, CameraMode, ColourFormat},
    config::UseCaseConfig,
    display::{Color, DisplayDriver, ImagePlacement},
    error::{EdgeError, Result},
    models::{
        DataType, InferenceBackend, MemoryPlan, ModelBlob, ModelContext, ModelRequirements,
        TensorSpec, TensorViewMut,
    },
    notify::LabelNotifier,
    pipeline::{ImagePipeline, KwsPipeline, Orchestrator, Peripherals, UseCase},
    platform::Delay,
    processing::{AudioPreProcess, ClassifierPostProcess, ImagePreProcessor},
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

pub const WINDOW: usize = 16000;
pub const HOP: usize = 8000;
pub const KWS_LABELS: [&str; 3] = ["_silence_", "_unknown_", "yes"];
pub const IMG_LABELS: [&str; 2] = ["cat", "dog"];
/// Bytes of one 2x2 RGB888 frame
pub const FRAME_BYTES: usize = 12;

pub const SILENCE_HIT: [f32; 3] = [0.92, 0.05, 0.03];
pub const SILENCE_WEAK: [f32; 3] = [0.5, 0.3, 0.2];
pub const YES: [f32; 3] = [0.05, 0.05, 0.9];

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    AudioInit(u32),
    AudioRequest(usize),
    AudioChunk,
    AudioStop,
    CameraInit,
    CameraStart,
    CameraStop,
    Delay(Duration),
    Notify(String),
}

#[derive(Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.0.borrow().iter().position(|e| e == event)
    }

    pub fn count(&self, event: &Event) -> usize {
        self.0.borrow().iter().filter(|e| *e == event).count()
    }
}

/// Backend whose outputs are scripted score vectors, one per invocation
pub struct ScriptedBackend {
    input: TensorSpec,
    output_len: usize,
    scratch: usize,
    scores: Rc<RefCell<VecDeque<Vec<f32>>>>,
    fallback: Vec<f32>,
    fail_load: Rc<Cell<bool>>,
    fail_invoke: Rc<Cell<bool>>,
}

impl InferenceBackend for ScriptedBackend {
    fn load(&mut self, _blob: &[u8]) -> Result<ModelRequirements> {
        if self.fail_load.get() {
            return Err(EdgeError::TfLite("corrupt flatbuffer".to_string()));
        }
        Ok(ModelRequirements {
            inputs: vec![self.input.clone()],
            outputs: vec![TensorSpec::new(vec![1, self.output_len], DataType::Float32)],
            scratch_bytes: self.scratch,
        })
    }

    fn invoke(&mut self, arena: &mut [u8], plan: &MemoryPlan) -> Result<()> {
        if self.fail_invoke.get() {
            return Err(EdgeError::Inference("delegate crashed".to_string()));
        }
        let scores = self
            .scores
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        let bytes: Vec<u8> = scores.iter().flat_map(|v| v.to_le_bytes()).collect();
        let out = plan.outputs[0].range();
        if bytes.len() != out.len() {
            return Err(EdgeError::Inference("scripted scores do not fit".to_string()));
        }
        arena[out].copy_from_slice(&bytes);
        Ok(())
    }
}

/// Records every window it is handed and writes its first sample
pub struct RecordingPreProcess {
    windows: Rc<RefCell<Vec<(u64, Vec<i16>)>>>,
    resets: Rc<Cell<usize>>,
    fail: Rc<Cell<bool>>,
}

impl AudioPreProcess for RecordingPreProcess {
    fn process(&mut self, window: &[i16], index: u64, input: &mut TensorViewMut<'_>) -> Result<()> {
        if self.fail.get() {
            return Err(EdgeError::ProcessingError("feature extraction failed".to_string()));
        }
        self.windows.borrow_mut().push((index, window.to_vec()));
        input.write_f32(0, &[window[0] as f32])
    }

    fn reset(&mut self) {
        self.resets.set(self.resets.get() + 1);
    }
}

/// Microphone producing a ramp; sample n has value `n % 30000`
pub struct RampAudio {
    log: EventLog,
    next: i64,
    requested: Option<usize>,
    /// Chunks delivered before capture fails
    budget: Option<usize>,
}

impl RampAudio {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            next: 0,
            requested: None,
            budget: None,
        }
    }
}

impl AudioDriver for RampAudio {
    fn init(&mut self, sample_rate: u32) -> Result<()> {
        self.log.push(Event::AudioInit(sample_rate));
        Ok(())
    }

    fn request_chunk(&mut self, len: usize) -> Result<()> {
        self.log.push(Event::AudioRequest(len));
        self.requested = Some(len);
        Ok(())
    }

    fn wait_for_chunk(&mut self, buffer: &mut [i16]) -> Result<()> {
        if self.requested.take().is_none() {
            return Err(EdgeError::Audio("no capture in progress".to_string()));
        }
        if let Some(budget) = self.budget.as_mut() {
            if *budget == 0 {
                return Err(EdgeError::Audio("device lost".to_string()));
            }
            *budget -= 1;
        }
        for sample in buffer.iter_mut() {
            *sample = (self.next % 30000) as i16;
            self.next += 1;
        }
        self.log.push(Event::AudioChunk);
        Ok(())
    }

    fn stop(&mut self) {
        self.requested = None;
        self.log.push(Event::AudioStop);
    }
}

pub struct ScriptedCamera {
    log: EventLog,
    frames: VecDeque<Vec<u8>>,
    armed: bool,
    current: Vec<u8>,
}

impl CameraDriver for ScriptedCamera {
    fn init(&mut self) -> Result<()> {
        self.log.push(Event::CameraInit);
        Ok(())
    }

    fn configure(&mut self, cols: usize, rows: usize, mode: CameraMode, format: ColourFormat) -> Result<()> {
        assert_eq!((cols, rows), (2, 2));
        assert_eq!(mode, CameraMode::SingleFrame);
        assert_eq!(format, ColourFormat::Rgb888);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.log.push(Event::CameraStart);
        self.armed = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.armed = false;
        self.log.push(Event::CameraStop);
    }

    fn captured_frame(&mut self) -> Option<&[u8]> {
        if !std::mem::take(&mut self.armed) {
            return None;
        }
        self.current = self.frames.pop_front()?;
        Some(&self.current)
    }
}

#[derive(Clone, Default)]
pub struct RecordingDisplay {
    pub texts: Rc<RefCell<Vec<String>>>,
    pub images: Rc<Cell<usize>>,
}

impl DisplayDriver for RecordingDisplay {
    fn clear(&mut self, _color: Color) -> Result<()> {
        Ok(())
    }

    fn draw_image(&mut self, data: &[u8], cols: usize, rows: usize, channels: usize, _placement: ImagePlacement) -> Result<()> {
        assert_eq!(data.len(), cols * rows * channels);
        self.images.set(self.images.get() + 1);
        Ok(())
    }

    fn draw_text(&mut self, text: &str, _x: u32, _y: u32, _color: Color) -> Result<()> {
        self.texts.borrow_mut().push(text.to_string());
        Ok(())
    }
}

pub struct RecordingDelay(EventLog);

impl Delay for RecordingDelay {
    fn delay(&mut self, duration: Duration) {
        self.0.push(Event::Delay(duration));
    }
}

pub struct RecordingNotifier(EventLog);

impl LabelNotifier for RecordingNotifier {
    fn notify(&mut self, label: &str) {
        self.0.push(Event::Notify(label.to_string()));
    }
}

/// What a test scripts before building the orchestrator
pub struct Script {
    pub config: UseCaseConfig,
    pub kws_scores: Vec<[f32; 3]>,
    pub img_scores: Vec<[f32; 2]>,
    pub frames: Vec<Vec<u8>>,
    pub audio_budget: Option<usize>,
}

impl Default for Script {
    fn default() -> Self {
        let mut config = UseCaseConfig::default();
        config.arena_size = 4096;
        config.kws.window_len = WINDOW;
        config.kws.hop_len = HOP;
        config.kws.score_threshold = 0.8;
        Self {
            config,
            kws_scores: Vec::new(),
            img_scores: Vec::new(),
            frames: Vec::new(),
            audio_budget: None,
        }
    }
}

/// Handles onto the shared state of the mocks
pub struct Probe {
    pub log: EventLog,
    pub windows: Rc<RefCell<Vec<(u64, Vec<i16>)>>>,
    pub resets: Rc<Cell<usize>>,
    pub display: RecordingDisplay,
    pub kws_fail_load: Rc<Cell<bool>>,
    pub img_fail_load: Rc<Cell<bool>>,
    pub kws_fail_invoke: Rc<Cell<bool>>,
    pub img_fail_invoke: Rc<Cell<bool>>,
    pub pre_fail: Rc<Cell<bool>>,
}

fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub fn frame(value: u8) -> Vec<u8> {
    vec![value; FRAME_BYTES]
}

pub fn build(script: Script) -> (Orchestrator, Probe) {
    let log = EventLog::default();
    let windows = Rc::new(RefCell::new(Vec::new()));
    let resets = Rc::new(Cell::new(0));
    let display = RecordingDisplay::default();
    let kws_fail_load = Rc::new(Cell::new(false));
    let img_fail_load = Rc::new(Cell::new(false));
    let kws_fail_invoke = Rc::new(Cell::new(false));
    let img_fail_invoke = Rc::new(Cell::new(false));
    let pre_fail = Rc::new(Cell::new(false));

    let kws_backend = ScriptedBackend {
        input: TensorSpec::new(vec![1, 4, 2, 1], DataType::Int8),
        output_len: KWS_LABELS.len(),
        scratch: 64,
        scores: Rc::new(RefCell::new(script.kws_scores.iter().map(|s| s.to_vec()).collect())),
        fallback: vec![0.1, 0.8, 0.1],
        fail_load: Rc::clone(&kws_fail_load),
        fail_invoke: Rc::clone(&kws_fail_invoke),
    };
    let img_backend = ScriptedBackend {
        input: TensorSpec::new(vec![1, 2, 2, 3], DataType::UInt8),
        output_len: IMG_LABELS.len(),
        scratch: 128,
        scores: Rc::new(RefCell::new(script.img_scores.iter().map(|s| s.to_vec()).collect())),
        fallback: vec![0.6, 0.4],
        fail_load: Rc::clone(&img_fail_load),
        fail_invoke: Rc::clone(&img_fail_invoke),
    };

    let kws = KwsPipeline::new(
        ModelContext::new("kws", ModelBlob::from_bytes(b"KWS".to_vec()), Box::new(kws_backend)),
        Box::new(RecordingPreProcess {
            windows: Rc::clone(&windows),
            resets: Rc::clone(&resets),
            fail: Rc::clone(&pre_fail),
        }),
        Box::new(ClassifierPostProcess::new(labels(&KWS_LABELS), 1)),
    );
    let image = ImagePipeline::new(
        ModelContext::new("img", ModelBlob::from_bytes(b"IMG".to_vec()), Box::new(img_backend)),
        Box::new(ImagePreProcessor::new()),
        Box::new(ClassifierPostProcess::new(labels(&IMG_LABELS), 2)),
        0.5,
    );
    let use_case = UseCase {
        arena: SharedArena::new(script.config.arena_size),
        kws,
        image,
    };

    let peripherals = Peripherals {
        audio: Box::new(RampAudio {
            log: log.clone(),
            next: 0,
            requested: None,
            budget: script.audio_budget,
        }),
        camera: Box::new(ScriptedCamera {
            log: log.clone(),
            frames: script.frames.into_iter().collect(),
            armed: false,
            current: Vec::new(),
        }),
        display: Box::new(display.clone()),
        notifier: Box::new(RecordingNotifier(log.clone())),
        delay: Box::new(RecordingDelay(log.clone())),
    };

    let orchestrator = Orchestrator::new(&script.config, use_case, peripherals)
        .expect("valid orchestrator setup");
    (
        orchestrator,
        Probe {
            log,
            windows,
            resets,
            display,
            kws_fail_load,
            img_fail_load,
            kws_fail_invoke,
            img_fail_invoke,
            pre_fail,
        },
    )
}
