//! Seal geometry.
//!
//! Pure math converting a relative seal position and size into pixel
//! geometry for a given canvas. The seal graphic is the QR square plus an
//! identity caption strip below it; safe margins account for both so the
//! graphic never clips outside the canvas. Deterministic, no side effects.

use serde::{Deserialize, Serialize};

/// Smallest allowed seal size, percent of the shorter canvas dimension.
pub const MIN_SIZE_PERCENT: f64 = 10.0;

/// Largest allowed seal size, percent of the shorter canvas dimension.
pub const MAX_SIZE_PERCENT: f64 = 35.0;

/// Height of the identity caption strip relative to the QR side.
pub const CAPTION_HEIGHT_RATIO: f64 = 0.22;

/// Canvas dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn shorter(&self) -> f64 {
        f64::from(self.width.min(self.height))
    }
}

/// Requested seal placement: the center of the QR square in percent of the
/// canvas, and the QR side in percent of the shorter canvas dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SealPlacement {
    pub x_percent: f64,
    pub y_percent: f64,
    pub size_percent: f64,
}

/// Pixel rectangle covering the whole seal graphic (QR square + caption).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Minimum relative distance the seal center must keep from each canvas
/// edge so the graphic stays fully inside. Bottom exceeds top by the
/// caption strip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafeMargins {
    pub left_percent: f64,
    pub right_percent: f64,
    pub top_percent: f64,
    pub bottom_percent: f64,
}

/// Named corner positions pre-computed to respect the safe margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CornerAnchor {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl CornerAnchor {
    pub const ALL: [CornerAnchor; 4] = [
        CornerAnchor::TopLeft,
        CornerAnchor::TopRight,
        CornerAnchor::BottomLeft,
        CornerAnchor::BottomRight,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
        }
    }
}

fn clamp_size_percent(size_percent: f64) -> f64 {
    size_percent.clamp(MIN_SIZE_PERCENT, MAX_SIZE_PERCENT)
}

/// Safe margins for a seal of the given size on the given canvas.
pub fn safe_margins(size_percent: f64, canvas: CanvasSize) -> SafeMargins {
    if canvas.width == 0 || canvas.height == 0 {
        return SafeMargins {
            left_percent: 0.0,
            right_percent: 0.0,
            top_percent: 0.0,
            bottom_percent: 0.0,
        };
    }

    let qr_side = canvas.shorter() * clamp_size_percent(size_percent) / 100.0;
    let caption = qr_side * CAPTION_HEIGHT_RATIO;
    let half = qr_side / 2.0;

    SafeMargins {
        left_percent: half / f64::from(canvas.width) * 100.0,
        right_percent: half / f64::from(canvas.width) * 100.0,
        top_percent: half / f64::from(canvas.height) * 100.0,
        bottom_percent: (half + caption) / f64::from(canvas.height) * 100.0,
    }
}

/// Pixel rectangle for a seal at the requested placement.
///
/// Size is first normalized into `[MIN_SIZE_PERCENT, MAX_SIZE_PERCENT]`,
/// then shrunk further if the graphic would clip at the requested center:
/// the position is honored exactly, the size gives way.
pub fn seal_rect(placement: SealPlacement, canvas: CanvasSize) -> PixelRect {
    if canvas.width == 0 || canvas.height == 0 {
        return PixelRect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
    }

    let width = f64::from(canvas.width);
    let height = f64::from(canvas.height);
    let cx = width * placement.x_percent / 100.0;
    let cy = height * placement.y_percent / 100.0;

    let desired = canvas.shorter() * clamp_size_percent(placement.size_percent) / 100.0;

    // Largest QR side that keeps the graphic inside the canvas at (cx, cy).
    let horizontal_limit = 2.0 * cx.min(width - cx);
    let top_limit = 2.0 * cy;
    let bottom_limit = (height - cy) / (0.5 + CAPTION_HEIGHT_RATIO);
    let qr_side = desired
        .min(horizontal_limit)
        .min(top_limit)
        .min(bottom_limit)
        .max(0.0);

    let caption = qr_side * CAPTION_HEIGHT_RATIO;
    let x = (cx - qr_side / 2.0).max(0.0).round() as u32;
    let y = (cy - qr_side / 2.0).max(0.0).round() as u32;

    PixelRect {
        x,
        y,
        width: qr_side.round() as u32,
        height: (qr_side + caption).round() as u32,
    }
}

/// The four corner placements for the given size, each sitting exactly on
/// the safe margins for the current canvas.
pub fn corner_anchors(size_percent: f64, canvas: CanvasSize) -> [(CornerAnchor, SealPlacement); 4] {
    let size = clamp_size_percent(size_percent);
    let m = safe_margins(size, canvas);

    let place = |x, y| SealPlacement {
        x_percent: x,
        y_percent: y,
        size_percent: size,
    };

    [
        (CornerAnchor::TopLeft, place(m.left_percent, m.top_percent)),
        (
            CornerAnchor::TopRight,
            place(100.0 - m.right_percent, m.top_percent),
        ),
        (
            CornerAnchor::BottomLeft,
            place(m.left_percent, 100.0 - m.bottom_percent),
        ),
        (
            CornerAnchor::BottomRight,
            place(100.0 - m.right_percent, 100.0 - m.bottom_percent),
        ),
    ]
}
