//! Display geometry: sizes, scale factors and the crop rectangle.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Width/height pair. Natural image sizes are whole pixels, display sizes may
/// be fractional after fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::new(width as f64, height as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Fit into `max` preserving aspect ratio. Sizes already inside `max` are
    /// left untouched (never upscaled).
    pub fn fit_within(&self, max: Size) -> Size {
        let mut width = self.width;
        let mut height = self.height;

        if width > max.width {
            let ratio = max.width / width;
            width = max.width;
            height *= ratio;
        }

        if height > max.height {
            let ratio = max.height / height;
            height = max.height;
            width *= ratio;
        }

        Size { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Per-axis scale factor between two coordinate spaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scale {
    pub x: f64,
    pub y: f64,
}

impl Scale {
    pub const IDENTITY: Scale = Scale { x: 1.0, y: 1.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Scale mapping coordinates in `from` space to `to` space.
    pub fn between(from: Size, to: Size) -> Self {
        if from.is_empty() {
            return Self::IDENTITY;
        }
        Self {
            x: to.width / from.width,
            y: to.height / from.height,
        }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Axis-aligned rectangle (top-left origin) in some pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn scaled(&self, scale: Scale) -> PixelRect {
        PixelRect {
            x: self.x * scale.x,
            y: self.y * scale.y,
            width: self.width * scale.x,
            height: self.height * scale.y,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether the rectangle lies fully inside `bounds` (origin at 0,0).
    pub fn is_within(&self, bounds: Size) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.right() <= bounds.width + 0.001 // float slack
            && self.bottom() <= bounds.height + 0.001
    }
}

/// Crop rectangle handle being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    N,
    S,
    E,
    W,
    Ne,
    Nw,
    Se,
    Sw,
}

impl ResizeHandle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResizeHandle::N => "n",
            ResizeHandle::S => "s",
            ResizeHandle::E => "e",
            ResizeHandle::W => "w",
            ResizeHandle::Ne => "ne",
            ResizeHandle::Nw => "nw",
            ResizeHandle::Se => "se",
            ResizeHandle::Sw => "sw",
        }
    }

    fn moves(&self, edge: char) -> bool {
        self.as_str().contains(edge)
    }
}

impl fmt::Display for ResizeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResizeHandle {
    type Err = ResizeHandleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "n" => Ok(ResizeHandle::N),
            "s" => Ok(ResizeHandle::S),
            "e" => Ok(ResizeHandle::E),
            "w" => Ok(ResizeHandle::W),
            "ne" => Ok(ResizeHandle::Ne),
            "nw" => Ok(ResizeHandle::Nw),
            "se" => Ok(ResizeHandle::Se),
            "sw" => Ok(ResizeHandle::Sw),
            _ => Err(ResizeHandleParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown resize handle: {0}")]
pub struct ResizeHandleParseError(String);

/// User-adjustable crop rectangle in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CropRect {
    pub rect: PixelRect,
}

impl CropRect {
    /// Smallest side a resize may produce, in display pixels.
    pub const MIN_SIDE: f64 = 50.0;

    /// Share of the display area covered by the initial rectangle.
    pub const INITIAL_COVERAGE: f64 = 0.8;

    pub fn new(rect: PixelRect) -> Self {
        Self { rect }
    }

    /// Centered rectangle covering 80% of each display dimension.
    pub fn initial(display: Size) -> Self {
        let width = display.width * Self::INITIAL_COVERAGE;
        let height = display.height * Self::INITIAL_COVERAGE;
        Self::new(PixelRect::new(
            (display.width - width) / 2.0,
            (display.height - height) / 2.0,
            width,
            height,
        ))
    }

    /// Move the top-left corner, clamped so the rectangle stays in bounds.
    pub fn move_to(&mut self, x: f64, y: f64, bounds: Size) {
        self.rect.x = x.min(bounds.width - self.rect.width).max(0.0);
        self.rect.y = y.min(bounds.height - self.rect.height).max(0.0);
    }

    /// Drag `handle` to the pointer position (display coordinates).
    pub fn resize(&mut self, handle: ResizeHandle, pointer_x: f64, pointer_y: f64, bounds: Size) {
        let current = self.rect;
        let mut next = current;

        if handle.moves('e') {
            next.width = (pointer_x - current.x)
                .min(bounds.width - current.x)
                .max(Self::MIN_SIDE);
        }
        if handle.moves('s') {
            next.height = (pointer_y - current.y)
                .min(bounds.height - current.y)
                .max(Self::MIN_SIDE);
        }
        if handle.moves('w') {
            let width = current.width + (current.x - pointer_x);
            if width > Self::MIN_SIDE && pointer_x >= 0.0 {
                next.width = width;
                next.x = pointer_x;
            }
        }
        if handle.moves('n') {
            let height = current.height + (current.y - pointer_y);
            if height > Self::MIN_SIDE && pointer_y >= 0.0 {
                next.height = height;
                next.y = pointer_y;
            }
        }

        self.rect = next;
    }

    /// The rectangle mapped to natural image coordinates.
    pub fn to_natural(&self, display: Size, natural: Size) -> PixelRect {
        self.rect.scaled(Scale::between(display, natural))
    }
}
