use std::sync::Arc;

use iced::mouse;
use iced::widget::canvas::{self, Action, Cache, Event, Frame, Geometry, LineCap, Path, Stroke};
use iced::{border, Color, Point, Rectangle, Renderer, Size, Theme};

use crate::audio::AudioEngine;
use crate::config::{LayoutConfig, WaveformConfig};
use crate::player::{FrameError, FrameInfo, PlaybackController};
use crate::ui::scene::{Layer, Node, NodeId, Scene, Shape};
use crate::waveform_cache::PeakEnvelope;

/// Playhead width in pixels.
pub const CURSOR_WIDTH: f32 = 3.0;

const fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color { r, g, b, a: 1.0 }
}

const BACKGROUND: Color = Color::WHITE;
const BUTTON: Color = rgb(0.867, 0.867, 0.867); // #ddd
const BUTTON_HOVER: Color = rgb(0.8, 0.8, 0.8); // #ccc
const WAVEFORM_BG: Color = BUTTON;
const INK: Color = Color::BLACK;
const CURSOR: Color = rgb(0.392, 0.584, 0.929); // cornflowerblue

/// What a click landed on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitTarget {
    PlayButton,
    /// Fraction of the waveform width, left edge = 0.
    Waveform { fraction: f64 },
}

/// Interactions on the player canvas.
#[derive(Debug, Clone)]
pub enum CanvasMessage {
    Click(Point),
    /// Pointer entered (`true`) or left (`false`) the play/stop button.
    Hover(bool),
}

/// Scene nodes the view mutates after building.
struct Handles {
    button: NodeId,
    play_icon: NodeId,
    stop_icon: NodeId,
    cursor: NodeId,
}

/// The player picture: background, play/stop button, waveform and playhead.
pub struct WaveformView {
    layout: LayoutConfig,
    style: WaveformConfig,
    scene: Scene,
    handles: Option<Handles>,
    strokes: Vec<NodeId>,
    envelope: Option<Arc<PeakEnvelope>>,
    static_cache: Cache,
    cached_revision: Option<u64>,
}

impl WaveformView {
    pub fn new(layout: LayoutConfig, style: WaveformConfig) -> Self {
        let mut view = Self {
            layout,
            style,
            scene: Scene::new(),
            handles: None,
            strokes: Vec::new(),
            envelope: None,
            static_cache: Cache::new(),
            cached_revision: None,
        };
        view.build();
        view
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Envelope dimensions this layout needs, as `(width, height)` pixels.
    pub fn envelope_size(&self) -> (u32, u32) {
        let rect = self.layout.waveform_rect();
        (rect.width.round() as u32, rect.height.round() as u32)
    }

    fn build(&mut self) {
        let layout = self.layout;
        let margin = layout.margin;
        let icon = layout.icon_size();
        let rect = layout.waveform_rect();
        let scene = &mut self.scene;

        scene.add(Node::new(
            Point::ORIGIN,
            Shape::RoundedRect {
                size: layout.size(),
                radius: 8.0,
            },
            BACKGROUND,
            Layer::Static,
        ));

        let button = scene.add(
            Node::new(
                Point::new(margin, margin),
                Shape::RoundedRect {
                    size: Size::new(icon, icon),
                    radius: 5.0,
                },
                BUTTON,
                Layer::Static,
            )
            .listening(),
        );

        let play_icon = scene.add(Node::new(
            Point::new(23.0, layout.height / 2.0),
            Shape::regular_triangle(layout.height * 0.25, 90.0),
            INK,
            Layer::Static,
        ));

        let stop_side = (layout.height - margin * 4.0).max(0.0);
        let stop_icon = scene.add(
            Node::new(
                Point::new(margin * 2.0, margin * 2.0),
                Shape::RoundedRect {
                    size: Size::new(stop_side, stop_side),
                    radius: 3.0,
                },
                INK,
                Layer::Static,
            )
            .hidden(),
        );

        scene.add(
            Node::new(
                rect.position(),
                Shape::RoundedRect {
                    size: rect.size(),
                    radius: 5.0,
                },
                WAVEFORM_BG,
                Layer::Static,
            )
            .listening(),
        );

        // Cursor goes last so it paints above the waveform strokes.
        let cursor = scene.add(
            Node::new(
                rect.position(),
                Shape::RoundedRect {
                    size: Size::new(CURSOR_WIDTH, rect.height),
                    radius: 2.0,
                },
                CURSOR,
                Layer::Overlay,
            )
            .hidden(),
        );

        self.handles = Some(Handles {
            button,
            play_icon,
            stop_icon,
            cursor,
        });
    }

    /// Replace the waveform strokes with `envelope`.
    pub fn set_envelope(&mut self, envelope: Arc<PeakEnvelope>) {
        self.clear_envelope();
        let rect = self.layout.waveform_rect();
        let stride = self.style.column_stride.max(1);

        for segment in envelope.segments.iter().step_by(stride) {
            let id = self.scene.add(Node::new(
                rect.position(),
                Shape::Polyline {
                    points: vec![
                        Point::new(segment.x, segment.y_top),
                        Point::new(segment.x, segment.y_bottom),
                    ],
                    width: self.style.stroke_width,
                    round_cap: true,
                },
                INK,
                Layer::Static,
            ));
            self.strokes.push(id);
        }
        self.envelope = Some(envelope);
    }

    pub fn clear_envelope(&mut self) {
        for id in self.strokes.drain(..) {
            self.scene.remove(id);
        }
        self.envelope = None;
    }

    pub fn envelope(&self) -> Option<&Arc<PeakEnvelope>> {
        self.envelope.as_ref()
    }

    /// Swap play/stop icons; the cursor is hidden whenever nothing plays.
    pub fn sync_transport(&mut self, is_playing: bool) {
        let Some(h) = &self.handles else {
            return;
        };
        self.scene.set_visible(h.play_icon, !is_playing);
        self.scene.set_visible(h.stop_icon, is_playing);
        if !is_playing {
            self.scene.set_visible(h.cursor, false);
        }
    }

    pub fn set_hovered(&mut self, hovered: bool) {
        if let Some(h) = &self.handles {
            self.scene
                .set_color(h.button, if hovered { BUTTON_HOVER } else { BUTTON });
        }
    }

    /// X coordinate of the cursor's left edge for `fraction`.
    pub fn cursor_x(&self, fraction: f64) -> f32 {
        let rect = self.layout.waveform_rect();
        rect.x + fraction as f32 * rect.width
    }

    pub fn show_cursor_at(&mut self, fraction: f64) -> Result<(), FrameError> {
        let cursor = self.cursor_id()?;
        let x = self.cursor_x(fraction);
        self.scene.set_x(cursor, x);
        self.scene.set_visible(cursor, true);
        Ok(())
    }

    pub fn hide_cursor(&mut self) {
        if let Ok(cursor) = self.cursor_id() {
            self.scene.set_visible(cursor, false);
        }
    }

    /// `(x, visible)` of the playhead.
    pub fn cursor(&self) -> Option<(f32, bool)> {
        let node = self.scene.node(self.cursor_id().ok()?)?;
        Some((node.position.x, node.visible))
    }

    /// Per-frame playhead update.
    ///
    /// Stops playback once the cursor would leave the waveform, which can
    /// happen slightly before the clock reaches the end of the buffer.
    pub fn advance<E: AudioEngine>(
        &mut self,
        controller: &mut PlaybackController<E>,
        _frame: FrameInfo,
    ) -> Result<(), FrameError> {
        let cursor = self.cursor_id()?;

        let Some(position) = controller.current_position() else {
            self.scene.set_visible(cursor, false);
            return Ok(());
        };

        let x = self.cursor_x(position);
        let rect = self.layout.waveform_rect();
        self.scene.set_x(cursor, x);

        if x + CURSOR_WIDTH > rect.x + rect.width {
            self.scene.set_visible(cursor, false);
            controller.stop();
        } else {
            self.scene.set_visible(cursor, true);
        }
        Ok(())
    }

    pub fn hit(&self, point: Point) -> Option<HitTarget> {
        let h = self.handles.as_ref()?;
        let id = self.scene.hit(point)?;
        if id == h.button {
            return Some(HitTarget::PlayButton);
        }
        let rect = self.layout.waveform_rect();
        if rect.width > 0.0 && rect.contains(point) {
            let fraction = ((point.x - rect.x) / rect.width) as f64;
            return Some(HitTarget::Waveform { fraction });
        }
        None
    }

    fn cursor_id(&self) -> Result<NodeId, FrameError> {
        self.handles
            .as_ref()
            .map(|h| h.cursor)
            .filter(|id| self.scene.node(*id).is_some())
            .ok_or(FrameError::MissingPrimitive("cursor"))
    }

    /// Drop the cached static layer if the scene changed since it was drawn.
    pub fn refresh_cache(&mut self) {
        let revision = self.scene.static_revision();
        if self.cached_revision != Some(revision) {
            self.static_cache.clear();
            self.cached_revision = Some(revision);
        }
    }
}

fn paint(frame: &mut Frame, node: &Node) {
    match &node.shape {
        Shape::Rect { size } => frame.fill_rectangle(node.position, *size, node.color),
        Shape::RoundedRect { size, radius } => {
            let path = Path::rounded_rectangle(node.position, *size, border::Radius::from(*radius));
            frame.fill(&path, node.color);
        }
        Shape::Polyline {
            points,
            width,
            round_cap,
        } => {
            let origin = node.position;
            let path = Path::new(|b| {
                for (i, p) in points.iter().enumerate() {
                    let p = Point::new(origin.x + p.x, origin.y + p.y);
                    if i == 0 {
                        b.move_to(p);
                    } else {
                        b.line_to(p);
                    }
                }
            });
            let cap = if *round_cap {
                LineCap::Round
            } else {
                LineCap::Butt
            };
            frame.stroke(
                &path,
                Stroke::default()
                    .with_color(node.color)
                    .with_width(*width)
                    .with_line_cap(cap),
            );
        }
        Shape::Triangle { vertices } => {
            let origin = node.position;
            let path = Path::new(|b| {
                b.move_to(Point::new(origin.x + vertices[0].x, origin.y + vertices[0].y));
                b.line_to(Point::new(origin.x + vertices[1].x, origin.y + vertices[1].y));
                b.line_to(Point::new(origin.x + vertices[2].x, origin.y + vertices[2].y));
                b.close();
            });
            frame.fill(&path, node.color);
        }
    }
}

impl canvas::Program<CanvasMessage> for WaveformView {
    /// Whether the pointer is over the play/stop button.
    type State = bool;

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        // Layer 1: cached static scene
        let background = self.static_cache.draw(renderer, bounds.size(), |frame| {
            for node in self.scene.layer(Layer::Static) {
                paint(frame, node);
            }
        });

        // Layer 2: playhead
        let overlay = {
            let mut frame = Frame::new(renderer, bounds.size());
            for node in self.scene.layer(Layer::Overlay) {
                paint(&mut frame, node);
            }
            frame.into_geometry()
        };

        vec![background, overlay]
    }

    fn update(
        &self,
        hovering: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<Action<CanvasMessage>> {
        match event {
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                let position = cursor.position_in(bounds)?;
                Some(Action::publish(CanvasMessage::Click(position)).and_capture())
            }
            Event::Mouse(mouse::Event::CursorMoved { .. } | mouse::Event::CursorLeft) => {
                let over_button = cursor
                    .position_in(bounds)
                    .and_then(|p| self.hit(p))
                    .is_some_and(|t| t == HitTarget::PlayButton);
                if over_button != *hovering {
                    *hovering = over_button;
                    Some(Action::publish(CanvasMessage::Hover(over_button)))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn mouse_interaction(
        &self,
        _state: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        match cursor.position_in(bounds).and_then(|p| self.hit(p)) {
            Some(_) => mouse::Interaction::Pointer,
            None => mouse::Interaction::default(),
        }
    }
}
