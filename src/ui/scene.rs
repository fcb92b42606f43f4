//! Retained drawable primitives.
//!
//! The player builds its picture once as a list of nodes and then only moves,
//! shows or recolours them. Rendering walks the list in insertion order.

use iced::{Color, Point, Rectangle, Size, Vector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect { size: Size },
    RoundedRect { size: Size, radius: f32 },
    /// Stroked open path through `points`, relative to the node position.
    Polyline {
        points: Vec<Point>,
        width: f32,
        round_cap: bool,
    },
    /// Filled triangle, vertices relative to the node position.
    Triangle { vertices: [Point; 3] },
}

impl Shape {
    /// Regular triangle inscribed in a circle of `radius`, first vertex at
    /// `rotation_deg` clockwise from straight up.
    pub fn regular_triangle(radius: f32, rotation_deg: f32) -> Self {
        let rotation = rotation_deg.to_radians();
        let vertex = |i: usize| {
            let theta = std::f32::consts::TAU * i as f32 / 3.0 + rotation;
            Point::new(radius * theta.sin(), -radius * theta.cos())
        };
        Shape::Triangle {
            vertices: [vertex(0), vertex(1), vertex(2)],
        }
    }
}

/// Nodes on `Static` change rarely and can be cached; `Overlay` is redrawn every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Static,
    Overlay,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub position: Point,
    pub shape: Shape,
    pub color: Color,
    pub visible: bool,
    pub layer: Layer,
    /// Whether the node takes part in hit testing.
    pub listening: bool,
}

impl Node {
    pub fn new(position: Point, shape: Shape, color: Color, layer: Layer) -> Self {
        Self {
            position,
            shape,
            color,
            visible: true,
            layer,
            listening: false,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn listening(mut self) -> Self {
        self.listening = true;
        self
    }

    /// Axis-aligned bounds in scene coordinates.
    pub fn bounds(&self) -> Rectangle {
        let local = match &self.shape {
            Shape::Rect { size } | Shape::RoundedRect { size, .. } => {
                Rectangle::new(Point::ORIGIN, *size)
            }
            Shape::Polyline { points, .. } => bounding_box(points),
            Shape::Triangle { vertices } => bounding_box(vertices),
        };
        local + Vector::new(self.position.x, self.position.y)
    }
}

fn bounding_box(points: &[Point]) -> Rectangle {
    let Some(first) = points.first() else {
        return Rectangle::new(Point::ORIGIN, Size::ZERO);
    };
    let (mut min, mut max) = (*first, *first);
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    Rectangle::new(min, Size::new(max.x - min.x, max.y - min.y))
}

#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<Option<Node>>,
    static_revision: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        self.touch(node.layer);
        self.nodes.push(Some(node));
        NodeId(self.nodes.len() - 1)
    }

    pub fn remove(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) {
            self.touch(node.layer);
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Move a node horizontally. Returns false if the node is gone.
    pub fn set_x(&mut self, id: NodeId, x: f32) -> bool {
        self.update(id, |node| node.position.x = x)
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        self.update(id, |node| node.visible = visible)
    }

    pub fn set_color(&mut self, id: NodeId, color: Color) -> bool {
        self.update(id, |node| node.color = color)
    }

    /// Visible nodes of `layer`, in paint order.
    pub fn layer(&self, layer: Layer) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .flatten()
            .filter(move |n| n.visible && n.layer == layer)
    }

    /// Topmost visible listening node containing `point`.
    pub fn hit(&self, point: Point) -> Option<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, node)| match node {
                Some(n) if n.visible && n.listening && n.bounds().contains(point) => {
                    Some(NodeId(i))
                }
                _ => None,
            })
    }

    /// Bumped whenever a static node changes.
    pub fn static_revision(&self) -> u64 {
        self.static_revision
    }

    fn update(&mut self, id: NodeId, f: impl FnOnce(&mut Node)) -> bool {
        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::as_mut) else {
            return false;
        };
        let before = node.clone();
        f(node);
        let layer = node.layer;
        if *node != before {
            self.touch(layer);
        }
        true
    }

    fn touch(&mut self, layer: Layer) {
        if layer == Layer::Static {
            self.static_revision += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f32, y: f32, w: f32, h: f32, layer: Layer) -> Node {
        Node::new(
            Point::new(x, y),
            Shape::Rect {
                size: Size::new(w, h),
            },
            Color::BLACK,
            layer,
        )
    }

    #[test]
    fn test_hit_prefers_topmost_listening_node() {
        let mut scene = Scene::new();
        let below = scene.add(rect(0.0, 0.0, 100.0, 100.0, Layer::Static).listening());
        let above = scene.add(rect(10.0, 10.0, 20.0, 20.0, Layer::Static).listening());
        scene.add(rect(0.0, 0.0, 100.0, 100.0, Layer::Overlay));

        assert_eq!(scene.hit(Point::new(15.0, 15.0)), Some(above));
        assert_eq!(scene.hit(Point::new(50.0, 50.0)), Some(below));
        assert_eq!(scene.hit(Point::new(150.0, 50.0)), None);

        scene.set_visible(above, false);
        assert_eq!(scene.hit(Point::new(15.0, 15.0)), Some(below));
    }

    #[test]
    fn test_overlay_changes_keep_static_revision() {
        let mut scene = Scene::new();
        let cursor = scene.add(rect(0.0, 0.0, 3.0, 10.0, Layer::Overlay));
        let revision = scene.static_revision();
        scene.set_x(cursor, 42.0);
        scene.set_visible(cursor, false);
        assert_eq!(scene.static_revision(), revision);
        assert_eq!(scene.node(cursor).unwrap().position.x, 42.0);
    }

    #[test]
    fn test_static_changes_bump_revision() {
        let mut scene = Scene::new();
        let bg = scene.add(rect(0.0, 0.0, 3.0, 10.0, Layer::Static));
        let revision = scene.static_revision();
        scene.set_color(bg, Color::WHITE);
        assert!(scene.static_revision() > revision);

        let revision = scene.static_revision();
        scene.set_color(bg, Color::WHITE);
        assert_eq!(scene.static_revision(), revision);
    }

    #[test]
    fn test_removed_node_is_gone() {
        let mut scene = Scene::new();
        let id = scene.add(rect(0.0, 0.0, 3.0, 10.0, Layer::Static));
        scene.remove(id);
        assert!(scene.node(id).is_none());
        assert!(!scene.set_x(id, 1.0));
        assert_eq!(scene.layer(Layer::Static).count(), 0);
    }

    #[test]
    fn test_play_triangle_points_right() {
        let Shape::Triangle { vertices } = Shape::regular_triangle(10.0, 90.0) else {
            panic!("expected triangle");
        };
        assert!((vertices[0].x - 10.0).abs() < 1e-4);
        assert!(vertices[0].y.abs() < 1e-4);
        assert!(vertices[1].x < 0.0 && vertices[2].x < 0.0);
    }

    #[test]
    fn test_polyline_bounds_follow_position() {
        let node = Node::new(
            Point::new(50.0, 7.0),
            Shape::Polyline {
                points: vec![Point::new(2.0, 10.0), Point::new(2.0, 26.0)],
                width: 2.0,
                round_cap: true,
            },
            Color::BLACK,
            Layer::Static,
        );
        let bounds = node.bounds();
        assert_eq!(bounds.x, 52.0);
        assert_eq!(bounds.y, 17.0);
        assert_eq!(bounds.height, 16.0);
    }
}
