//! The drawing surface abstraction layers and overlays paint through.
//!
//! The engine never talks to a concrete rendering backend. Layers receive a
//! `&mut dyn DrawingSurface` that accepts translate, scale and clip state
//! plus a small set of primitive draws.

use crate::core::{
    bounds::Bounds,
    geo::{Point, Size},
};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// RGBA colour with straight (non-premultiplied) alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn from_array(rgba: [u8; 4]) -> Self {
        Self::new(rgba[0], rgba[1], rgba[2], rgba[3])
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl From<Rgba<u8>> for Color {
    fn from(pixel: Rgba<u8>) -> Self {
        Self::from_array(pixel.0)
    }
}

/// Stroke settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pen {
    pub color: Color,
    pub width: f64,
}

impl Pen {
    pub fn new(color: Color, width: f64) -> Self {
        Self { color, width }
    }
}

impl Default for Pen {
    fn default() -> Self {
        Self::new(Color::BLACK, 1.0)
    }
}

/// Uniform scale followed by a translation: `device = user * scale + offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceTransform {
    pub scale: f64,
    pub offset: Point,
}

impl SurfaceTransform {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            offset: Point::default(),
        }
    }

    pub fn map(&self, point: &Point) -> Point {
        point.multiply(self.scale).add(&self.offset)
    }

    pub fn map_bounds(&self, rect: &Bounds) -> Bounds {
        Bounds::from_corners(self.map(&rect.min), self.map(&rect.max))
    }

    /// Translation expressed in the current user space
    pub fn translate(&mut self, delta: &Point) {
        self.offset = self.offset.add(&delta.multiply(self.scale));
    }

    pub fn scale_by(&mut self, factor: f64) {
        self.scale *= factor;
    }
}

impl Default for SurfaceTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Transform and clip state with a save/restore stack, shared by surface
/// implementations
#[derive(Debug, Clone, Default)]
pub struct SurfaceState {
    pub transform: SurfaceTransform,
    /// Clip rectangle in device pixels
    pub clip: Option<Bounds>,
    stack: Vec<(SurfaceTransform, Option<Bounds>)>,
}

impl SurfaceState {
    pub fn save(&mut self) {
        self.stack.push((self.transform, self.clip));
    }

    pub fn restore(&mut self) {
        if let Some((transform, clip)) = self.stack.pop() {
            self.transform = transform;
            self.clip = clip;
        }
    }

    /// Sets the clip from a user-space rectangle, intersected with any
    /// clip already active
    pub fn set_clip(&mut self, rect: Option<&Bounds>) {
        self.clip = match rect {
            None => None,
            Some(rect) => {
                let device = self.transform.map_bounds(rect);
                match self.clip {
                    Some(existing) => Some(
                        existing
                            .intersection(&device)
                            .unwrap_or_else(|| Bounds::new(device.min, device.min)),
                    ),
                    None => Some(device),
                }
            }
        };
    }
}

/// Primitive drawing operations consumed by layers, geometries and overlays
pub trait DrawingSurface {
    fn size(&self) -> Size;

    /// Pushes the current transform and clip
    fn save(&mut self);

    /// Pops the transform and clip pushed by the matching [`Self::save`]
    fn restore(&mut self);

    fn translate(&mut self, offset: &Point);

    fn scale(&mut self, factor: f64);

    /// Restricts drawing to a user-space rectangle, `None` removes the clip
    fn set_clip(&mut self, rect: Option<&Bounds>);

    /// Replaces every pixel inside the clip with `color`
    fn fill(&mut self, color: Color);

    fn draw_line(&mut self, from: &Point, to: &Point, pen: &Pen);

    fn draw_polyline(&mut self, points: &[Point], pen: &Pen) {
        for segment in points.windows(2) {
            self.draw_line(&segment[0], &segment[1], pen);
        }
    }

    fn draw_rect(&mut self, rect: &Bounds, pen: Option<&Pen>, fill: Option<Color>);

    fn draw_ellipse(&mut self, rect: &Bounds, pen: Option<&Pen>, fill: Option<Color>);

    /// Blits `image` with its top-left corner at `position`
    fn draw_image(&mut self, position: &Point, image: &RgbaImage);

    /// Text is optional; raster backends without a font may ignore it
    fn draw_text(&mut self, _position: &Point, _text: &str, _color: Color) {}
}
