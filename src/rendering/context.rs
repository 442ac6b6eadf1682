use crate::{
    core::{
        bounds::Bounds,
        geo::{Point, Size},
    },
    rendering::surface::{Color, DrawingSurface, Pen, SurfaceState},
};
use image::RgbaImage;

/// Commands recorded by a [`RenderContext`], in device coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Fill {
        color: Color,
        clip: Option<Bounds>,
    },
    Line {
        points: Vec<Point>,
        pen: Pen,
    },
    Rect {
        bounds: Bounds,
        pen: Option<Pen>,
        fill: Option<Color>,
    },
    Ellipse {
        bounds: Bounds,
        pen: Option<Pen>,
        fill: Option<Color>,
    },
    Image {
        bounds: Bounds,
    },
    Text {
        position: Point,
        text: String,
        color: Color,
    },
}

/// A drawing surface that records primitives instead of rasterizing them
///
/// Useful to inspect what a layer or overlay would paint, and as the model
/// for backends that forward primitives to another painter.
pub struct RenderContext {
    pub width: u32,
    pub height: u32,
    /// Drawing primitives queue
    pub drawing_queue: Vec<DrawCommand>,
    state: SurfaceState,
}

impl RenderContext {
    /// Create a new render context
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            drawing_queue: Vec::new(),
            state: SurfaceState::default(),
        }
    }

    /// Begin a frame
    pub fn begin_frame(&mut self) {
        self.drawing_queue.clear();
        self.state = SurfaceState::default();
    }

    /// Get the current drawing queue
    pub fn get_drawing_queue(&self) -> &[DrawCommand] {
        &self.drawing_queue
    }

    /// Current clip rectangle in device coordinates
    pub fn clip_bounds(&self) -> Option<Bounds> {
        self.state.clip
    }

    /// Drops primitives lying completely outside the clip
    fn visible(&self, bounds: &Bounds) -> bool {
        match &self.state.clip {
            Some(clip) => clip.intersects(bounds),
            None => true,
        }
    }

    fn scaled_pen(&self, pen: &Pen) -> Pen {
        Pen::new(pen.color, pen.width * self.state.transform.scale)
    }
}

impl DrawingSurface for RenderContext {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
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
        self.drawing_queue.push(DrawCommand::Fill {
            color,
            clip: self.state.clip,
        });
    }

    fn draw_line(&mut self, from: &Point, to: &Point, pen: &Pen) {
        self.draw_polyline(&[*from, *to], pen);
    }

    fn draw_polyline(&mut self, points: &[Point], pen: &Pen) {
        let points: Vec<Point> = points.iter().map(|p| self.state.transform.map(p)).collect();
        let Some(bounds) = Bounds::from_points(&points) else {
            return;
        };
        if self.visible(&bounds.expanded(pen.width / 2.0)) {
            let pen = self.scaled_pen(pen);
            self.drawing_queue.push(DrawCommand::Line { points, pen });
        }
    }

    fn draw_rect(&mut self, rect: &Bounds, pen: Option<&Pen>, fill: Option<Color>) {
        let bounds = self.state.transform.map_bounds(rect);
        if self.visible(&bounds) {
            let pen = pen.map(|p| self.scaled_pen(p));
            self.drawing_queue.push(DrawCommand::Rect { bounds, pen, fill });
        }
    }

    fn draw_ellipse(&mut self, rect: &Bounds, pen: Option<&Pen>, fill: Option<Color>) {
        let bounds = self.state.transform.map_bounds(rect);
        if self.visible(&bounds) {
            let pen = pen.map(|p| self.scaled_pen(p));
            self.drawing_queue.push(DrawCommand::Ellipse { bounds, pen, fill });
        }
    }

    fn draw_image(&mut self, position: &Point, image: &RgbaImage) {
        let size = Point::new(image.width() as f64, image.height() as f64);
        let bounds = self
            .state
            .transform
            .map_bounds(&Bounds::new(*position, position.add(&size)));
        if self.visible(&bounds) {
            self.drawing_queue.push(DrawCommand::Image { bounds });
        }
    }

    fn draw_text(&mut self, position: &Point, text: &str, color: Color) {
        self.drawing_queue.push(DrawCommand::Text {
            position: self.state.transform.map(position),
            text: text.to_string(),
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_device_space() {
        let mut context = RenderContext::new(100, 100);
        context.translate(&Point::new(-50.0, -50.0));
        context.draw_rect(&Bounds::from_coords(60.0, 60.0, 70.0, 70.0), None, Some(Color::RED));

        assert_eq!(
            context.get_drawing_queue(),
            &[DrawCommand::Rect {
                bounds: Bounds::from_coords(10.0, 10.0, 20.0, 20.0),
                pen: None,
                fill: Some(Color::RED),
            }]
        );
    }

    #[test]
    fn test_clipped_primitives_are_dropped() {
        let mut context = RenderContext::new(100, 100);
        context.set_clip(Some(&Bounds::from_coords(0.0, 0.0, 50.0, 50.0)));
        context.draw_line(&Point::new(60.0, 60.0), &Point::new(80.0, 80.0), &Pen::default());
        context.draw_line(&Point::new(10.0, 10.0), &Point::new(80.0, 80.0), &Pen::default());
        assert_eq!(context.get_drawing_queue().len(), 1);
    }

    #[test]
    fn test_begin_frame_resets() {
        let mut context = RenderContext::new(10, 10);
        context.translate(&Point::new(1.0, 1.0));
        context.fill(Color::WHITE);
        context.begin_frame();
        assert!(context.get_drawing_queue().is_empty());
        context.draw_text(&Point::new(1.0, 1.0), "x", Color::BLACK);
        assert!(matches!(
            &context.get_drawing_queue()[0],
            DrawCommand::Text { position, .. } if *position == Point::new(1.0, 1.0)
        ));
    }
}
