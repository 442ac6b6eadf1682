//! Scaled copies of the displayed frame shown while a zoom redraw is pending.
//!
//! The preview is stored in map pixels of the zoom it was produced for.
//! Map pixels of one zoom level are the previous level's scaled by two, so
//! scaling the frame's origin by the same factor as its pixels keeps every
//! geographic point where it was, in both zoom directions.

use crate::core::{geo::Point, transform::CoordinateTransform};
use image::{imageops, imageops::FilterType, RgbaImage};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ScaledPreview {
    image: Arc<RgbaImage>,
    /// Map pixel of the image's top-left corner at `zoom`
    origin_px: Point,
    zoom: i32,
}

impl ScaledPreview {
    /// Scales `frame`, whose top-left corner sits at `frame_origin_px` in map
    /// pixels of the previous zoom, by `factor` into a preview for `zoom`.
    /// Returns `None` for empty frames.
    pub fn from_frame(frame: &RgbaImage, frame_origin_px: &Point, factor: f64, zoom: i32) -> Option<Self> {
        let width = (frame.width() as f64 * factor).round() as u32;
        let height = (frame.height() as f64 * factor).round() as u32;
        if width == 0 || height == 0 {
            return None;
        }
        let image = imageops::resize(frame, width, height, FilterType::Triangle);
        Some(Self {
            image: Arc::new(image),
            origin_px: frame_origin_px.multiply(factor),
            zoom,
        })
    }

    pub fn image(&self) -> &Arc<RgbaImage> {
        &self.image
    }

    pub fn origin_px(&self) -> Point {
        self.origin_px
    }

    pub fn zoom(&self) -> i32 {
        self.zoom
    }

    /// Where the preview's top-left corner lands in the viewport, `None`
    /// when the preview belongs to another zoom level
    pub fn viewport_origin(&self, transform: &CoordinateTransform<'_>) -> Option<Point> {
        (transform.zoom() == self.zoom).then(|| transform.map_px_to_viewport(&self.origin_px))
    }
}
