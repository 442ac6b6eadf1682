use crate::{
    core::{
        geo::{Point, Size},
        map::MapControl,
    },
    input::events::{InputEvent, KeyCode, KeyModifiers, MouseButton},
};
use egui::{Color32, ColorImage, Pos2, Rect, Response, Sense, TextureHandle, TextureOptions, Ui, Widget};
use std::time::Instant;

/// egui adapter around a [`MapControl`].
///
/// The widget forwards pointer, wheel and key input into the control, drives
/// its update loop and paints the composed frame as a texture. Listeners
/// registered with [`MapControl::on`] are called from `ui`.
///
/// ```rust,ignore
/// let mut view = MapView::new(MapBuilder::new().build()?);
/// ui.add(&mut view);
/// ```
pub struct MapView {
    map: MapControl,
    texture: Option<TextureHandle>,
    interactive: bool,
    dirty: bool,
}

impl MapView {
    pub fn new(map: MapControl) -> Self {
        Self {
            map,
            texture: None,
            interactive: true,
            dirty: true,
        }
    }

    /// Set whether input is forwarded to the map (default: true)
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn map(&self) -> &MapControl {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut MapControl {
        self.dirty = true;
        &mut self.map
    }

    fn forward_input(&mut self, ui: &Ui, rect: Rect, response: &Response) {
        let to_viewport = |pos: Pos2| Point::new((pos.x - rect.min.x) as f64, (pos.y - rect.min.y) as f64);
        let tracking = response.hovered() || self.map.interaction().is_dragging();

        let events = ui.input(|i| i.events.clone());
        for event in events {
            let input = match event {
                egui::Event::PointerButton {
                    pos,
                    button,
                    pressed,
                    ..
                } if tracking => {
                    let button = mouse_button(button);
                    if pressed {
                        InputEvent::PointerPressed {
                            position: to_viewport(pos),
                            button,
                        }
                    } else {
                        InputEvent::PointerReleased {
                            position: to_viewport(pos),
                            button,
                        }
                    }
                }
                egui::Event::PointerMoved(pos) if tracking => InputEvent::PointerMoved {
                    position: to_viewport(pos),
                },
                egui::Event::Key {
                    key,
                    pressed: true,
                    modifiers,
                    ..
                } if response.hovered() => {
                    let Some(key) = key_code(key) else {
                        continue;
                    };
                    InputEvent::KeyPress {
                        key,
                        modifiers: KeyModifiers {
                            shift: modifiers.shift,
                            ctrl: modifiers.ctrl,
                            alt: modifiers.alt,
                            meta: modifiers.mac_cmd,
                        },
                    }
                }
                _ => continue,
            };
            self.map.handle_input(input);
            self.dirty = true;
        }

        if let Some(pos) = response.hover_pos() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll.abs() > 0.1 {
                self.map.handle_input(InputEvent::Wheel {
                    delta: scroll as f64,
                    position: to_viewport(pos),
                });
                self.dirty = true;
            }
        }
    }

    fn upload_frame(&mut self, ui: &Ui) {
        let frame = match self.map.render_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::debug!("no frame to show: {}", err);
                return;
            }
        };
        let size = [frame.width() as usize, frame.height() as usize];
        let image = ColorImage::from_rgba_unmultiplied(size, frame.as_raw());
        match &mut self.texture {
            Some(texture) => texture.set(image, TextureOptions::default()),
            None => {
                self.texture = Some(ui.ctx().load_texture("mapframe", image, TextureOptions::default()));
            }
        }
        self.dirty = false;
    }
}

impl Widget for &mut MapView {
    fn ui(self, ui: &mut Ui) -> Response {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());

        let size = Size::new(rect.width().max(0.0) as u32, rect.height().max(0.0) as u32);
        if size != self.map.viewport_size() {
            self.map.handle_input(InputEvent::Resize { size });
            self.dirty = true;
        }

        if self.interactive {
            self.forward_input(ui, rect, &response);
        }

        self.dirty |= self.map.update(Instant::now());
        self.map.process_events();

        if self.dirty {
            self.upload_frame(ui);
        }
        if let Some(texture) = &self.texture {
            ui.painter_at(rect).image(
                texture.id(),
                rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        if self.map.is_redrawing() || self.map.is_animating() || self.map.scaled_preview().is_some() {
            ui.ctx().request_repaint();
        }
        response
    }
}

fn mouse_button(button: egui::PointerButton) -> MouseButton {
    match button {
        egui::PointerButton::Primary => MouseButton::Left,
        egui::PointerButton::Secondary => MouseButton::Right,
        egui::PointerButton::Middle => MouseButton::Middle,
        egui::PointerButton::Extra1 => MouseButton::Other(1),
        egui::PointerButton::Extra2 => MouseButton::Other(2),
    }
}

fn key_code(key: egui::Key) -> Option<KeyCode> {
    Some(match key {
        egui::Key::ArrowUp => KeyCode::ArrowUp,
        egui::Key::ArrowDown => KeyCode::ArrowDown,
        egui::Key::ArrowLeft => KeyCode::ArrowLeft,
        egui::Key::ArrowRight => KeyCode::ArrowRight,
        egui::Key::Plus => KeyCode::Plus,
        egui::Key::Minus => KeyCode::Minus,
        egui::Key::Escape => KeyCode::Escape,
        _ => return None,
    })
}
