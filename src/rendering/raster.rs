//! CPU raster implementation of [`DrawingSurface`] over an [`RgbaImage`].

use crate::{
    core::{
        bounds::Bounds,
        geo::{Point, Size},
    },
    rendering::surface::{Color, DrawingSurface, Pen, SurfaceState},
};
use image::{Rgba, RgbaImage};
use std::f64::consts::PI;

/// Segments used to approximate an ellipse outline
const ELLIPSE_SEGMENTS: usize = 64;

/// Paints onto a borrowed RGBA image with source-over blending.
///
/// Primitives are sampled at pixel centres without anti-aliasing.
pub struct RasterSurface<'a> {
    image: &'a mut RgbaImage,
    state: SurfaceState,
}

impl<'a> RasterSurface<'a> {
    pub fn new(image: &'a mut RgbaImage) -> Self {
        Self {
            image,
            state: SurfaceState::default(),
        }
    }

    /// Inclusive pixel index range whose centres fall inside `rect` and the clip
    fn pixel_range(&self, rect: &Bounds) -> Option<(u32, u32, u32, u32)> {
        let mut area = Bounds::from_coords(
            0.0,
            0.0,
            self.image.width() as f64,
            self.image.height() as f64,
        )
        .intersection(rect)?;
        if let Some(clip) = &self.state.clip {
            area = area.intersection(clip)?;
        }

        let x0 = (area.min.x - 0.5).ceil().max(0.0);
        let y0 = (area.min.y - 0.5).ceil().max(0.0);
        let x1 = (area.max.x - 0.5).floor();
        let y1 = (area.max.y - 0.5).floor();
        if x1 < x0 || y1 < y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    fn blend(&mut self, x: u32, y: u32, color: Color) {
        let dst = self.image.get_pixel_mut(x, y);
        *dst = blend_over(*dst, color.to_rgba());
    }

    fn fill_where(&mut self, rect: &Bounds, color: Color, inside: impl Fn(&Point) -> bool) {
        if color.a == 0 {
            return;
        }
        let Some((x0, y0, x1, y1)) = self.pixel_range(rect) else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if inside(&center) {
                    self.blend(x, y, color);
                }
            }
        }
    }

    fn ellipse_outline(rect: &Bounds) -> Vec<Point> {
        let center = rect.center();
        let rx = rect.width() / 2.0;
        let ry = rect.height() / 2.0;
        (0..=ELLIPSE_SEGMENTS)
            .map(|i| {
                let angle = i as f64 / ELLIPSE_SEGMENTS as f64 * 2.0 * PI;
                Point::new(center.x + rx * angle.cos(), center.y + ry * angle.sin())
            })
            .collect()
    }
}

/// Source-over compositing of straight-alpha pixels
pub fn blend_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let src_a = src.0[3] as f64 / 255.0;
    if src_a >= 1.0 {
        return src;
    }
    if src_a <= 0.0 {
        return dst;
    }
    let dst_a = dst.0[3] as f64 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    let channel = |i: usize| {
        let value = (src.0[i] as f64 * src_a + dst.0[i] as f64 * dst_a * (1.0 - src_a)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Distance from `p` to the segment `a`-`b`
pub fn distance_to_segment(p: &Point, a: &Point, b: &Point) -> f64 {
    let ab = b.subtract(a);
    let length_sq = ab.dot(&ab);
    if length_sq == 0.0 {
        return p.distance_to(a);
    }
    let t = (p.subtract(a).dot(&ab) / length_sq).clamp(0.0, 1.0);
    p.distance_to(&a.add(&ab.multiply(t)))
}

impl DrawingSurface for RasterSurface<'_> {
    fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }

    fn save(&mut self) {
        self.state.save();
    }

    fn restore(&mut self) {
        self.state.restore();
    }

    fn translate(&mut self, offset: &Point) {
        self.state.transform.translate(offset);
    }

    fn scale(&mut self, factor: f64) {
        self.state.transform.scale_by(factor);
    }

    fn set_clip(&mut self, rect: Option<&Bounds>) {
        self.state.set_clip(rect);
    }

    fn fill(&mut self, color: Color) {
        let full = Bounds::from_coords(
            0.0,
            0.0,
            self.image.width() as f64,
            self.image.height() as f64,
        );
        let Some((x0, y0, x1, y1)) = self.pixel_range(&full) else {
            return;
        };
        let pixel = color.to_rgba();
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.image.put_pixel(x, y, pixel);
            }
        }
    }

    fn draw_line(&mut self, from: &Point, to: &Point, pen: &Pen) {
        let a = self.state.transform.map(from);
        let b = self.state.transform.map(to);
        let half = (pen.width * self.state.transform.scale).max(1.0) / 2.0;
        let rect = Bounds::from_corners(a, b).expanded(half);
        self.fill_where(&rect, pen.color, |p| distance_to_segment(p, &a, &b) <= half);
    }

    fn draw_rect(&mut self, rect: &Bounds, pen: Option<&Pen>, fill: Option<Color>) {
        if let Some(color) = fill {
            let device = self.state.transform.map_bounds(rect);
            self.fill_where(&device, color, |p| device.contains(p));
        }
        if let Some(pen) = pen {
            let corners = [
                rect.min,
                Point::new(rect.max.x, rect.min.y),
                rect.max,
                Point::new(rect.min.x, rect.max.y),
                rect.min,
            ];
            self.draw_polyline(&corners, pen);
        }
    }

    fn draw_ellipse(&mut self, rect: &Bounds, pen: Option<&Pen>, fill: Option<Color>) {
        if let Some(color) = fill {
            let device = self.state.transform.map_bounds(rect);
            let center = device.center();
            let rx = device.width() / 2.0;
            let ry = device.height() / 2.0;
            if rx > 0.0 && ry > 0.0 {
                self.fill_where(&device, color, |p| {
                    let dx = (p.x - center.x) / rx;
                    let dy = (p.y - center.y) / ry;
                    dx * dx + dy * dy <= 1.0
                });
            }
        }
        if let Some(pen) = pen {
            let outline = Self::ellipse_outline(rect);
            self.draw_polyline(&outline, pen);
        }
    }

    fn draw_image(&mut self, position: &Point, image: &RgbaImage) {
        if image.width() == 0 || image.height() == 0 {
            return;
        }
        let scale = self.state.transform.scale;
        if scale <= 0.0 {
            return;
        }
        let origin = self.state.transform.map(position);
        let device = Bounds::new(
            origin,
            origin.add(&Point::new(
                image.width() as f64 * scale,
                image.height() as f64 * scale,
            )),
        );
        let Some((x0, y0, x1, y1)) = self.pixel_range(&device) else {
            return;
        };
        for y in y0..=y1 {
            let sy = ((y as f64 + 0.5 - origin.y) / scale).floor();
            if sy < 0.0 || sy >= image.height() as f64 {
                continue;
            }
            for x in x0..=x1 {
                let sx = ((x as f64 + 0.5 - origin.x) / scale).floor();
                if sx < 0.0 || sx >= image.width() as f64 {
                    continue;
                }
                let src = *image.get_pixel(sx as u32, sy as u32);
                let dst = self.image.get_pixel_mut(x, y);
                *dst = blend_over(*dst, src);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Color::WHITE.to_rgba())
    }

    #[test]
    fn test_fill_respects_clip() {
        let mut image = canvas(10, 10);
        {
            let mut surface = RasterSurface::new(&mut image);
            surface.set_clip(Some(&Bounds::from_coords(0.0, 0.0, 5.0, 10.0)));
            surface.fill(Color::RED);
        }
        assert_eq!(*image.get_pixel(2, 2), Color::RED.to_rgba());
        assert_eq!(*image.get_pixel(7, 2), Color::WHITE.to_rgba());
    }

    #[test]
    fn test_translated_rect_fill() {
        let mut image = canvas(20, 20);
        {
            let mut surface = RasterSurface::new(&mut image);
            surface.translate(&Point::new(10.0, 10.0));
            surface.draw_rect(&Bounds::from_coords(0.0, 0.0, 5.0, 5.0), None, Some(Color::BLUE));
        }
        assert_eq!(*image.get_pixel(12, 12), Color::BLUE.to_rgba());
        assert_eq!(*image.get_pixel(2, 2), Color::WHITE.to_rgba());
    }

    #[test]
    fn test_line_has_pen_width() {
        let mut image = canvas(20, 20);
        {
            let mut surface = RasterSurface::new(&mut image);
            let pen = Pen::new(Color::BLACK, 3.0);
            surface.draw_line(&Point::new(0.0, 10.0), &Point::new(20.0, 10.0), &pen);
        }
        assert_eq!(*image.get_pixel(5, 10), Color::BLACK.to_rgba());
        assert_eq!(*image.get_pixel(5, 9), Color::BLACK.to_rgba());
        assert_eq!(*image.get_pixel(5, 14), Color::WHITE.to_rgba());
    }

    #[test]
    fn test_ellipse_fill_stays_inside_rect() {
        let mut image = canvas(20, 20);
        {
            let mut surface = RasterSurface::new(&mut image);
            surface.draw_ellipse(&Bounds::from_coords(0.0, 0.0, 20.0, 20.0), None, Some(Color::RED));
        }
        assert_eq!(*image.get_pixel(10, 10), Color::RED.to_rgba());
        assert_eq!(*image.get_pixel(0, 0), Color::WHITE.to_rgba());
    }

    #[test]
    fn test_scaled_image_blit() {
        let source = RgbaImage::from_pixel(2, 2, Color::RED.to_rgba());
        let mut image = canvas(10, 10);
        {
            let mut surface = RasterSurface::new(&mut image);
            surface.scale(2.0);
            surface.draw_image(&Point::new(1.0, 1.0), &source);
        }
        assert_eq!(*image.get_pixel(2, 2), Color::RED.to_rgba());
        assert_eq!(*image.get_pixel(5, 5), Color::RED.to_rgba());
        assert_eq!(*image.get_pixel(6, 6), Color::WHITE.to_rgba());
        assert_eq!(*image.get_pixel(1, 1), Color::WHITE.to_rgba());
    }

    #[test]
    fn test_blend_over_half_alpha() {
        let out = blend_over(Color::WHITE.to_rgba(), Color::new(0, 0, 0, 128).to_rgba());
        assert_eq!(out.0[3], 255);
        assert!(out.0[0] > 120 && out.0[0] < 135);
    }

    #[test]
    fn test_segment_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_eq!(distance_to_segment(&Point::new(5.0, 3.0), &a, &b), 3.0);
        assert_eq!(distance_to_segment(&Point::new(-4.0, 3.0), &a, &b), 5.0);
    }
}
