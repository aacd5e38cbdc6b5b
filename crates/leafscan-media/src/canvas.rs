//! Drawing surfaces.
//!
//! `Canvas` mirrors the small subset of a 2D canvas API the overlay needs:
//! size sync, clearing, blitting a frame, rectangles and label text.
//! `RasterCanvas` draws into an RGBA buffer; `RecordingCanvas` keeps a log of
//! operations and backs headless runs and tests.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use leafscan_models::{PixelRect, Size};

use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;

/// Average glyph advance relative to the font size, used when no font is loaded.
const FALLBACK_ADVANCE: f64 = 0.55;

/// A 2D drawing surface.
pub trait Canvas: Send {
    /// Current surface size in pixels.
    fn size(&self) -> (u32, u32);

    /// Resize the surface. Like an HTML canvas, resizing discards content.
    fn resize(&mut self, width: u32, height: u32);

    /// Clear every pixel to transparent.
    fn clear(&mut self);

    /// Draw `frame` stretched over the whole surface.
    fn draw_frame(&mut self, frame: &Frame);

    fn stroke_rect(&mut self, rect: PixelRect, color: Rgba<u8>, line_width: u32);

    fn fill_rect(&mut self, rect: PixelRect, color: Rgba<u8>);

    /// Draw `text` with its baseline at `y`.
    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: Rgba<u8>, size_px: f64);

    /// Advance width of `text` at `size_px`.
    fn measure_text(&self, text: &str, size_px: f64) -> f64 {
        text.chars().count() as f64 * size_px * FALLBACK_ADVANCE
    }

    fn display_size(&self) -> Size {
        let (width, height) = self.size();
        Size::from_pixels(width, height)
    }
}

/// Canvas backed by an in-memory RGBA image.
pub struct RasterCanvas {
    buffer: RgbaImage,
    font: Option<FontArc>,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: RgbaImage::new(width, height),
            font: None,
        }
    }

    /// Enable label glyph rendering. Without a font only label backgrounds
    /// are painted.
    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// Load a TrueType/OpenType font from disk.
    pub fn load_font(path: &Path) -> MediaResult<FontArc> {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        FontArc::try_from_vec(bytes).map_err(|e| MediaError::Font(e.to_string()))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.buffer
    }

    pub fn save(&self, path: &Path) -> MediaResult<()> {
        self.buffer.save(path)?;
        Ok(())
    }

    fn to_rect(rect: PixelRect) -> Option<Rect> {
        let width = rect.width.round();
        let height = rect.height.round();
        if width < 1.0 || height < 1.0 {
            return None;
        }
        Some(Rect::at(rect.x.round() as i32, rect.y.round() as i32).of_size(width as u32, height as u32))
    }
}

impl Canvas for RasterCanvas {
    fn size(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.buffer = RgbaImage::new(width, height);
    }

    fn clear(&mut self) {
        for pixel in self.buffer.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    fn draw_frame(&mut self, frame: &Frame) {
        if frame.is_empty() || self.buffer.width() == 0 || self.buffer.height() == 0 {
            return;
        }
        if frame.image().dimensions() == self.buffer.dimensions() {
            self.buffer.copy_from_slice(frame.image().as_raw());
        } else {
            self.buffer = imageops::resize(
                frame.image(),
                self.buffer.width(),
                self.buffer.height(),
                FilterType::Triangle,
            );
        }
    }

    fn stroke_rect(&mut self, rect: PixelRect, color: Rgba<u8>, line_width: u32) {
        // The stroke is centered on the path, as on an HTML canvas.
        let half = (line_width / 2) as f64;
        for ring in 0..line_width.max(1) {
            let inset = ring as f64 - half;
            let ring_rect = PixelRect::new(
                rect.x + inset,
                rect.y + inset,
                rect.width - 2.0 * inset,
                rect.height - 2.0 * inset,
            );
            if let Some(r) = Self::to_rect(ring_rect) {
                draw_hollow_rect_mut(&mut self.buffer, r, color);
            }
        }
    }

    fn fill_rect(&mut self, rect: PixelRect, color: Rgba<u8>) {
        if let Some(r) = Self::to_rect(rect) {
            draw_filled_rect_mut(&mut self.buffer, r, color);
        }
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: Rgba<u8>, size_px: f64) {
        let Some(font) = &self.font else {
            return;
        };
        let scale = PxScale::from(size_px as f32);
        let top = (y - size_px).round() as i32;
        draw_text_mut(&mut self.buffer, color, x.round() as i32, top, scale, font, text);
    }

    fn measure_text(&self, text: &str, size_px: f64) -> f64 {
        match &self.font {
            Some(font) => text_size(PxScale::from(size_px as f32), font, text).0 as f64,
            None => text.chars().count() as f64 * size_px * FALLBACK_ADVANCE,
        }
    }
}

/// A single recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Resize { width: u32, height: u32 },
    Clear,
    Frame { width: u32, height: u32 },
    StrokeRect { rect: PixelRect, color: Rgba<u8>, line_width: u32 },
    FillRect { rect: PixelRect, color: Rgba<u8> },
    Text { text: String, x: f64, y: f64, color: Rgba<u8>, size_px: f64 },
}

/// Canvas that records operations instead of rasterizing.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    width: u32,
    height: u32,
    ops: Vec<DrawOp>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    /// True when nothing has been drawn since the last clear.
    pub fn is_cleared(&self) -> bool {
        matches!(self.ops.last(), Some(DrawOp::Clear))
    }

    /// Number of frames drawn so far.
    pub fn frames_drawn(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Frame { .. }))
            .count()
    }
}

impl Canvas for RecordingCanvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.ops.push(DrawOp::Resize { width, height });
    }

    fn clear(&mut self) {
        self.ops.push(DrawOp::Clear);
    }

    fn draw_frame(&mut self, frame: &Frame) {
        self.ops.push(DrawOp::Frame {
            width: frame.width(),
            height: frame.height(),
        });
    }

    fn stroke_rect(&mut self, rect: PixelRect, color: Rgba<u8>, line_width: u32) {
        self.ops.push(DrawOp::StrokeRect {
            rect,
            color,
            line_width,
        });
    }

    fn fill_rect(&mut self, rect: PixelRect, color: Rgba<u8>) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: Rgba<u8>, size_px: f64) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            x,
            y,
            color,
            size_px,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);

    #[test]
    fn test_raster_stroke_rect() {
        let mut canvas = RasterCanvas::new(100, 100);
        canvas.stroke_rect(PixelRect::new(10.0, 10.0, 40.0, 50.0), GREEN, 3);

        let image = canvas.image();
        assert_eq!(*image.get_pixel(10, 30), GREEN);
        assert_eq!(*image.get_pixel(9, 30), GREEN);
        assert_eq!(*image.get_pixel(11, 30), GREEN);
        assert_eq!(*image.get_pixel(30, 30), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_raster_clear_and_frame() {
        let mut canvas = RasterCanvas::new(4, 4);
        let frame = Frame::new(RgbaImage::from_pixel(4, 4, GREEN));
        canvas.draw_frame(&frame);
        assert_eq!(*canvas.image().get_pixel(2, 2), GREEN);

        canvas.clear();
        assert!(canvas.image().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_raster_scales_frame() {
        let mut canvas = RasterCanvas::new(2, 2);
        canvas.draw_frame(&Frame::new(RgbaImage::from_pixel(8, 8, GREEN)));
        assert_eq!(canvas.size(), (2, 2));
        assert_eq!(*canvas.image().get_pixel(1, 1), GREEN);
    }

    #[test]
    fn test_degenerate_rects_ignored() {
        let mut canvas = RasterCanvas::new(10, 10);
        canvas.fill_rect(PixelRect::new(2.0, 2.0, 0.0, 5.0), GREEN);
        canvas.stroke_rect(PixelRect::new(2.0, 2.0, 0.2, 0.2), GREEN, 1);
        assert!(canvas.image().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_raster_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.png");

        let mut canvas = RasterCanvas::new(8, 8);
        canvas.fill_rect(PixelRect::new(0.0, 0.0, 4.0, 4.0), GREEN);
        canvas.save(&path).unwrap();

        let saved = image::open(&path).unwrap().to_rgba8();
        assert_eq!(*saved.get_pixel(1, 1), GREEN);
        assert_eq!(saved.get_pixel(6, 6).0[3], 0);
    }

    #[test]
    fn test_missing_font() {
        let err = RasterCanvas::load_font(Path::new("/nonexistent/font.ttf")).err().unwrap();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[test]
    fn test_recording_canvas() {
        let mut canvas = RecordingCanvas::new();
        canvas.resize(640, 480);
        canvas.draw_frame(&Frame::new(RgbaImage::new(640, 480)));
        assert_eq!(canvas.frames_drawn(), 1);
        assert!(!canvas.is_cleared());

        canvas.clear();
        assert!(canvas.is_cleared());
        assert_eq!(canvas.display_size(), Size::new(640.0, 480.0));
    }
}
