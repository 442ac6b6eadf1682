//! Decorations painted over the map in viewport pixels.

use crate::{
    core::{
        bounds::Bounds,
        constants::{
            CROSSHAIR_ARM_PX, DRAG_SHAPE_COLOUR, METRES_PER_PIXEL_AT_Z18, SCALEBAR_DISTANCES_M,
        },
        geo::{Point, Size},
    },
    rendering::surface::{Color, DrawingSurface, Pen},
    spatial::selection::SelectionArea,
};

/// Distance from the viewport's left and bottom edges to the scalebar
const SCALEBAR_MARGIN_PX: f64 = 10.0;
const SCALEBAR_BASELINE_PX: f64 = 20.0;
const SCALEBAR_TICK_PX: f64 = 5.0;

/// Scalebar length in pixels and the distance it stands for, `None` for
/// zoom levels without a table entry
pub fn scalebar(zoom: i32) -> Option<(f64, f64)> {
    let metres = *SCALEBAR_DISTANCES_M.get(usize::try_from(zoom).ok()?)?;
    let length_px = metres / 2f64.powi(18 - zoom) / METRES_PER_PIXEL_AT_Z18;
    Some((length_px, metres))
}

/// Human readable scalebar distance, kilometres from 1000 m up
pub fn scalebar_label(metres: f64) -> String {
    if metres >= 1000.0 {
        format!("{} km", metres / 1000.0)
    } else {
        format!("{} m", metres)
    }
}

pub fn draw_viewport_border(surface: &mut dyn DrawingSurface, size: Size, colour: Color) {
    let rect = Bounds::new(Point::default(), size.to_point());
    surface.draw_rect(&rect, Some(&Pen::new(colour, 1.0)), None);
}

pub fn draw_crosshairs(surface: &mut dyn DrawingSurface, size: Size, colour: Color) {
    draw_cross(surface, &size.center(), CROSSHAIR_ARM_PX, colour);
}

fn draw_cross(surface: &mut dyn DrawingSurface, at: &Point, arm: f64, colour: Color) {
    let pen = Pen::new(colour, 1.0);
    surface.draw_line(&Point::new(at.x, at.y - arm), &Point::new(at.x, at.y + arm), &pen);
    surface.draw_line(&Point::new(at.x - arm, at.y), &Point::new(at.x + arm, at.y), &pen);
}

pub fn draw_scalebar(surface: &mut dyn DrawingSurface, size: Size, zoom: i32, colour: Color) {
    let Some((length_px, metres)) = scalebar(zoom) else {
        return;
    };
    let pen = Pen::new(colour, 1.0);
    let baseline = size.height as f64 - SCALEBAR_BASELINE_PX;
    let start = SCALEBAR_MARGIN_PX;
    let end = length_px;

    surface.draw_line(&Point::new(start, baseline), &Point::new(end, baseline), &pen);
    for x in [start, end] {
        surface.draw_line(
            &Point::new(x, baseline - SCALEBAR_TICK_PX),
            &Point::new(x, baseline + SCALEBAR_TICK_PX),
            &pen,
        );
    }
    surface.draw_text(
        &Point::new(end + SCALEBAR_MARGIN_PX, baseline + SCALEBAR_TICK_PX),
        &scalebar_label(metres),
        colour,
    );
}

/// In-progress drag shape, translucent. Origin centred drags also mark the
/// press point.
pub fn draw_drag_shape(
    surface: &mut dyn DrawingSurface,
    area: &SelectionArea,
    pressed: Option<&Point>,
    overlay_colour: Color,
) {
    if let Some(pressed) = pressed {
        draw_cross(surface, pressed, 1.0, overlay_colour);
    }

    let colour = Color::from_array(DRAG_SHAPE_COLOUR);
    match area {
        SelectionArea::Rect(rect) => {
            surface.draw_rect(rect, Some(&Pen::new(colour, 1.0)), Some(colour));
        }
        SelectionArea::Line { from, to, width } => {
            surface.draw_line(from, to, &Pen::new(colour, *width));
        }
        SelectionArea::Ellipse(rect) => {
            surface.draw_ellipse(rect, Some(&Pen::new(colour, 1.0)), Some(colour));
        }
    }
}
