//! Detection overlay rendering.

use image::Rgba;
use leafscan_models::{DetectionResult, PixelRect, Scale};

use crate::canvas::Canvas;

/// Visual parameters for boxes and labels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub box_color: Rgba<u8>,
    pub text_color: Rgba<u8>,
    pub line_width: u32,
    pub font_px: f64,
    /// Height of the label background drawn above each box
    pub label_height: f64,
    /// Horizontal offset of the label background relative to the box edge
    pub label_offset_x: f64,
    /// Horizontal offset of the label text relative to the box edge
    pub text_offset_x: f64,
}

impl OverlayStyle {
    /// Green boxes over the live camera feed.
    pub const LIVE: OverlayStyle = OverlayStyle {
        box_color: Rgba([0, 255, 0, 255]),
        text_color: Rgba([255, 255, 255, 255]),
        line_width: 3,
        font_px: 25.0,
        label_height: 30.0,
        label_offset_x: -2.0,
        text_offset_x: 3.0,
    };

    /// Red boxes over an uploaded still image.
    pub const STILL: OverlayStyle = OverlayStyle {
        box_color: Rgba([255, 0, 0, 255]),
        text_color: Rgba([255, 255, 255, 255]),
        line_width: 3,
        font_px: 16.0,
        label_height: 20.0,
        label_offset_x: 0.0,
        text_offset_x: 5.0,
    };

    /// Text baseline distance above the box top edge.
    const BASELINE_LIFT: f64 = 5.0;
    /// Extra label background width beyond the measured text.
    const LABEL_PADDING: f64 = 10.0;
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self::LIVE
    }
}

/// Draw every prediction of `result` onto `canvas`.
///
/// Box coordinates are in source-image pixels and are multiplied by `scale`
/// to reach canvas pixels. Nothing is cleared first; callers draw the frame
/// (or clear) before calling this.
pub fn draw_detections(
    canvas: &mut dyn Canvas,
    result: &DetectionResult,
    scale: Scale,
    style: &OverlayStyle,
) {
    for prediction in result {
        let rect = prediction.bbox.scaled(scale);
        let label = prediction.label();

        canvas.stroke_rect(rect, style.box_color, style.line_width);

        let text_width = canvas.measure_text(&label, style.font_px);
        canvas.fill_rect(
            PixelRect::new(
                rect.x + style.label_offset_x,
                rect.y - style.label_height,
                text_width + OverlayStyle::LABEL_PADDING,
                style.label_height,
            ),
            style.box_color,
        );

        canvas.fill_text(
            &label,
            rect.x + style.text_offset_x,
            rect.y - OverlayStyle::BASELINE_LIFT,
            style.text_color,
            style.font_px,
        );
    }
}
