//! Bounded camera capture and image classification run between two
//! listening phases.

use crate::arena::{Lease, SharedArena};
use crate::camera::{CameraDriver, CameraMode, ColourFormat};
use crate::display::{self, Color, DisplayDriver, IMAGE_PLACEMENT};
use crate::error::Result;
use crate::models::{ArenaAllocator, INPUT_CHANNELS_IDX, INPUT_COLS_IDX, INPUT_ROWS_IDX};
use crate::pipeline::{ImagePipeline, IMG_PIPELINE};
use crate::processing::Classification;
use crate::profiler::{Profiler, Stage};

/// What one burst did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BurstReport {
    /// Frames probed, including the one that found the camera empty
    pub attempted: usize,
    /// Frames classified
    pub processed: usize,
    /// Ranking of each classified frame, in capture order
    pub results: Vec<Vec<Classification>>,
}

struct FrameGeometry {
    rows: usize,
    cols: usize,
    channels: usize,
}

/// Claim the arena for the image model and classify up to `max_frames`
/// camera frames.
///
/// Running out of frames ends the burst early and is not an error. The
/// camera is stopped on every exit once it has been touched.
pub fn run_burst(
    image: &mut ImagePipeline,
    arena: &mut SharedArena,
    allocator_from: Option<&ArenaAllocator>,
    camera: &mut dyn CameraDriver,
    display: &mut dyn DisplayDriver,
    profiler: &mut Profiler,
    max_frames: usize,
) -> Result<BurstReport> {
    let lease = image.context.initialize(arena, allocator_from)?;
    let input = lease.input(0)?;
    let geometry = FrameGeometry {
        rows: input.spec().dim(INPUT_ROWS_IDX)?,
        cols: input.spec().dim(INPUT_COLS_IDX)?,
        channels: input.spec().dim(INPUT_CHANNELS_IDX)?,
    };
    log::info!(
        "📷 Image burst: up to {} frames of {}x{}x{}",
        max_frames,
        geometry.cols,
        geometry.rows,
        geometry.channels
    );

    camera.stop();
    let outcome = capture_and_classify(
        image, arena, &lease, &geometry, camera, display, profiler, max_frames,
    );
    camera.stop();

    if let Ok(report) = &outcome {
        log::info!(
            "Image burst done: {} of {} attempted frames classified",
            report.processed,
            report.attempted
        );
    }
    outcome
}

#[allow(clippy::too_many_arguments)]
fn capture_and_classify(
    image: &mut ImagePipeline,
    arena: &mut SharedArena,
    lease: &Lease,
    geometry: &FrameGeometry,
    camera: &mut dyn CameraDriver,
    display: &mut dyn DisplayDriver,
    profiler: &mut Profiler,
    max_frames: usize,
) -> Result<BurstReport> {
    let input = lease.input(0)?;
    let output = lease.output(0)?;

    camera.init()?;
    camera.configure(
        geometry.cols,
        geometry.rows,
        CameraMode::SingleFrame,
        ColourFormat::Rgb888,
    )?;

    let mut report = BurstReport::default();
    for _ in 0..max_frames {
        report.attempted += 1;
        if let Err(e) = display.clear(Color::Black) {
            log::warn!("Display clear failed: {}", e);
        }

        camera.start()?;
        let frame = match camera.captured_frame() {
            Some(frame) if !frame.is_empty() => frame,
            _ => {
                log::info!("No more images available");
                break;
            }
        };

        if let Err(e) = display.draw_image(
            frame,
            geometry.cols,
            geometry.rows,
            geometry.channels,
            IMAGE_PLACEMENT,
        ) {
            log::warn!("Failed to draw frame: {}", e);
        }

        let len = input.byte_len().min(frame.len());
        let pre = &mut image.pre;
        profiler.measure(IMG_PIPELINE, Stage::PreProcess, || {
            let mut view = arena.view_mut(&input)?;
            pre.process(&frame[..len], &mut view)
        })?;

        let context = &mut image.context;
        profiler.measure(IMG_PIPELINE, Stage::Inference, || {
            context.infer(arena, lease)
        })?;

        let post = &mut image.post;
        let ranking = profiler.measure(IMG_PIPELINE, Stage::PostProcess, || {
            let view = arena.view(&output)?;
            post.process(&view)
        })?;

        match ranking.first() {
            Some(top) if top.score >= image.score_threshold => {
                log::info!("Frame {}: {} ({:.2}%)", report.processed, top.label, top.score * 100.0)
            }
            Some(top) => log::info!(
                "Frame {}: {} ({:.2}%, low confidence)",
                report.processed,
                top.label,
                top.score * 100.0
            ),
            None => log::info!("Frame {}: no result", report.processed),
        }
        if let Err(e) = display::present_image_results(display, &ranking) {
            log::warn!("Failed to present image results: {}", e);
        }

        report.processed += 1;
        report.results.push(ranking);
    }

    Ok(report)
}
