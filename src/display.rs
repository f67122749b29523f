//! Display seam plus the result presentation used by both pipelines.

use crate::detection::KwsResult;
use crate::error::Result;
use crate::processing::Classification;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Color {
    Black,
    White,
    Green,
    Red,
}

/// Screen position and scale of a drawn image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePlacement {
    pub x: u32,
    pub y: u32,
    pub scale: u32,
}

pub trait DisplayDriver {
    fn clear(&mut self, color: Color) -> Result<()>;

    fn draw_image(
        &mut self,
        data: &[u8],
        cols: usize,
        rows: usize,
        channels: usize,
        placement: ImagePlacement,
    ) -> Result<()>;

    fn draw_text(&mut self, text: &str, x: u32, y: u32, color: Color) -> Result<()>;
}

/// Writes everything that would be drawn to the log
#[derive(Debug, Default)]
pub struct LogDisplay;

impl DisplayDriver for LogDisplay {
    fn clear(&mut self, color: Color) -> Result<()> {
        log::trace!("[display] clear {}", color);
        Ok(())
    }

    fn draw_image(
        &mut self,
        data: &[u8],
        cols: usize,
        rows: usize,
        channels: usize,
        placement: ImagePlacement,
    ) -> Result<()> {
        log::debug!(
            "[display] image {}x{}x{} ({} bytes) at ({}, {}) x{}",
            cols,
            rows,
            channels,
            data.len(),
            placement.x,
            placement.y,
            placement.scale
        );
        Ok(())
    }

    fn draw_text(&mut self, text: &str, x: u32, y: u32, _color: Color) -> Result<()> {
        log::info!("[display] ({}, {}) {}", x, y, text);
        Ok(())
    }
}

const KWS_TEXT_X: u32 = 20;
const KWS_TEXT_Y: u32 = 30;
const KWS_LINE_HEIGHT: u32 = 16;
const IMG_TEXT_X: u32 = 150;
const IMG_TEXT_Y: u32 = 60;

/// Where captured frames are drawn during a burst
pub const IMAGE_PLACEMENT: ImagePlacement = ImagePlacement {
    x: 10,
    y: 35,
    scale: 2,
};

fn percent(score: f32) -> i32 {
    (score * 100.0) as i32
}

/// One history line, e.g. `@1.5s: yes (93%)`
pub fn format_kws_line(result: &KwsResult) -> String {
    let (label, score) = match result.top() {
        Some(top) => (top.label.as_str(), top.score),
        None => ("<none>", 0.0),
    };
    format!("@{}s: {} ({}%)", result.timestamp, label, percent(score))
}

/// Text for the top image classification, e.g. `Label: cat (71%)`
pub fn format_image_line(results: &[Classification]) -> String {
    match results.first() {
        Some(top) => format!("Label: {} ({}%)", top.label, percent(top.score)),
        None => "Label: None".to_string(),
    }
}

/// Draw the history oldest-to-newest, one line per result
pub fn present_kws_results<'a, I>(display: &mut dyn DisplayDriver, results: I) -> Result<()>
where
    I: IntoIterator<Item = &'a KwsResult>,
{
    let mut row = KWS_TEXT_Y + 2 * KWS_LINE_HEIGHT;
    for result in results {
        display.draw_text(&format_kws_line(result), KWS_TEXT_X, row, Color::Green)?;
        row += KWS_LINE_HEIGHT;
    }
    Ok(())
}

pub fn present_image_results(
    display: &mut dyn DisplayDriver,
    results: &[Classification],
) -> Result<()> {
    display.draw_text(
        &format_image_line(results),
        IMG_TEXT_X,
        IMG_TEXT_Y,
        Color::Green,
    )
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
    fn test_kws_line_formatting() {
        let hit = KwsResult::new(vec![classification("yes", 0.934)], 1.5, 3, 0.7);
        assert_eq!(format_kws_line(&hit), "@1.5s: yes (93%)");

        let miss = KwsResult::new(vec![classification("no", 0.2)], 2.0, 4, 0.7);
        assert_eq!(format_kws_line(&miss), "@2s: <none> (0%)");
    }

    #[test]
    fn test_image_line_formatting() {
        assert_eq!(format_image_line(&[]), "Label: None");
        assert_eq!(
            format_image_line(&[classification("tabby", 0.71), classification("lynx", 0.2)]),
            "Label: tabby (71%)"
        );
    }
}
