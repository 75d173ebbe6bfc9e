use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::graph_utils::graph::{EntityId, ViewEdge, ViewNode};
use crate::viz::style::{Color, ShapeKind};

/// One resolved style field written to a node the host already holds.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeAttribute {
    Color(Color),
    Shape(ShapeKind),
    Size(f32),
    FontSize(f32),
    Caption(String),
}

/// Events the rendering host and the window system feed back into the view.
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    NodeClick(EntityId),
    EdgeClick(EntityId),
    // Click on the canvas with no subject under the pointer
    EmptyClick,
    SidebarAnimationEnd,
    // Completion of a fullscreen request or exit; Err carries the rejection reason
    FullscreenSettled(Result<(), String>),
}

/// What the view needs from whatever draws the graph.
pub trait RenderingHost {
    /// Full replacement of everything drawn; called once per ingestion pass.
    fn replace_graph(&mut self, nodes: &[ViewNode], edges: &[ViewEdge]);
    fn set_node_attribute(&mut self, node_id: &str, attribute: NodeAttribute);
    fn render(&mut self);
    fn recenter(&mut self);
    /// Recenter once `after` has elapsed, letting layout settle first.
    fn schedule_recenter(&mut self, after: Duration);
}

/// Window-system fullscreen. Requests complete asynchronously through
/// `HostEvent::FullscreenSettled`.
pub trait FullscreenCapability {
    fn is_supported(&self) -> bool;
    fn is_fullscreen(&self) -> bool;
    fn request_fullscreen(&mut self);
    fn exit_fullscreen(&mut self);
}

/// Built-in look used for anything no override sets.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HostDefaults {
    pub node_size: f32,
    pub node_color: Color,
    pub node_font_size: f32,
    pub node_shape: ShapeKind,
    pub shadow_size: f32,
    pub edge_color: Color,
    pub edge_width: f32,
    pub edge_font_size: f32,
    pub arrow_size: f32,
    pub font_color: Color,
}

impl HostDefaults {
    pub fn for_theme(dark_mode: bool) -> Self {
        Self {
            node_size: 5.0,
            node_color: Color::rgb(0x1D, 0x87, 0xC9),
            node_font_size: 4.0,
            node_shape: ShapeKind::Circle,
            shadow_size: 5.0,
            edge_color: Color::rgb(0xAB, 0xAB, 0xAB),
            edge_width: 0.3,
            edge_font_size: 4.0,
            arrow_size: 1.0,
            font_color: if dark_mode { Color::rgb(0xFF, 0xFF, 0xFF) } else { Color::rgb(0, 0, 0) },
        }
    }
}

impl Default for HostDefaults {
    fn default() -> Self { Self::for_theme(true) }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SceneNode {
    pub id: EntityId,
    pub caption: String,
    pub color: Color,
    pub shape: ShapeKind,
    pub size: f32,
    pub font_size: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SceneEdge {
    pub id: EntityId,
    pub start: EntityId,
    pub end: EntityId,
    pub caption: String,
    pub color: Color,
    pub width: f32,
    pub font_size: f32,
}

/// Retained scene: the drawable state of the graph with host defaults filled
/// in. The desktop frontend paints from it; headless runs and tests inspect it.
#[derive(Debug, Default)]
pub struct SceneHost {
    defaults: HostDefaults,
    nodes: Vec<SceneNode>,
    node_index: HashMap<EntityId, usize>,
    edges: Vec<SceneEdge>,
    generation: u64,
    frames: u64,
    recenters: u64,
    attribute_writes: u64,
    scheduled_recenters: u64,
    pending_recenters: Vec<Instant>,
    recenter_requested: bool,
    fullscreen_supported: bool,
    fullscreen: bool,
    fullscreen_request: Option<bool>,
}

impl SceneHost {
    pub fn new(defaults: HostDefaults) -> Self {
        Self { defaults, fullscreen_supported: true, ..Self::default() }
    }

    pub fn defaults(&self) -> &HostDefaults { &self.defaults }
    pub fn nodes(&self) -> &[SceneNode] { &self.nodes }
    pub fn edges(&self) -> &[SceneEdge] { &self.edges }

    pub fn node(&self, id: &str) -> Option<&SceneNode> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    /// Bumped on every full replacement so frontends can re-seed layout.
    pub fn generation(&self) -> u64 { self.generation }
    pub fn frames(&self) -> u64 { self.frames }
    pub fn recenter_count(&self) -> u64 { self.recenters }
    pub fn attribute_writes(&self) -> u64 { self.attribute_writes }
    pub fn scheduled_recenter_count(&self) -> u64 { self.scheduled_recenters }
    pub fn has_pending_recenter(&self) -> bool { !self.pending_recenters.is_empty() }

    /// Consume every deferred recenter that is due at `now`. Returns true if
    /// the frontend should recenter this frame.
    pub fn take_due_recenter(&mut self, now: Instant) -> bool {
        let before = self.pending_recenters.len();
        self.pending_recenters.retain(|deadline| *deadline > now);
        if self.pending_recenters.len() < before {
            self.recenters += 1;
            self.recenter_requested = true;
        }
        std::mem::take(&mut self.recenter_requested)
    }

    pub fn set_fullscreen_supported(&mut self, supported: bool) { self.fullscreen_supported = supported; }

    /// Record the window's observed fullscreen state.
    pub fn set_fullscreen(&mut self, on: bool) { self.fullscreen = on; }

    /// The fullscreen state most recently requested and not yet forwarded to the window.
    pub fn take_fullscreen_request(&mut self) -> Option<bool> { self.fullscreen_request.take() }

    fn scene_node(&self, node: &ViewNode) -> SceneNode {
        SceneNode {
            id: node.id.clone(),
            caption: node.caption.clone(),
            color: node.style.color.unwrap_or(self.defaults.node_color),
            shape: node.style.shape.unwrap_or(self.defaults.node_shape),
            size: node.style.size.unwrap_or(self.defaults.node_size),
            font_size: node.style.font_size.unwrap_or(self.defaults.node_font_size),
        }
    }

    fn scene_edge(&self, edge: &ViewEdge) -> SceneEdge {
        SceneEdge {
            id: edge.id.clone(),
            start: edge.start_id.clone(),
            end: edge.end_id.clone(),
            caption: edge.label.clone(),
            color: edge.style.color.unwrap_or(self.defaults.edge_color),
            width: self.defaults.edge_width,
            font_size: edge.style.font_size.unwrap_or(self.defaults.edge_font_size),
        }
    }
}

impl RenderingHost for SceneHost {
    fn replace_graph(&mut self, nodes: &[ViewNode], edges: &[ViewEdge]) {
        self.nodes = nodes.iter().map(|n| self.scene_node(n)).collect();
        self.node_index = self.nodes.iter().enumerate().map(|(i, n)| (n.id.clone(), i)).collect();
        self.edges = edges.iter().map(|e| self.scene_edge(e)).collect();
        self.generation += 1;
    }

    fn set_node_attribute(&mut self, node_id: &str, attribute: NodeAttribute) {
        let Some(&i) = self.node_index.get(node_id) else {
            log::debug!("attribute write for unknown node {}", node_id);
            return;
        };
        let node = &mut self.nodes[i];
        match attribute {
            NodeAttribute::Color(c) => node.color = c,
            NodeAttribute::Shape(s) => node.shape = s,
            NodeAttribute::Size(v) => node.size = v,
            NodeAttribute::FontSize(v) => node.font_size = v,
            NodeAttribute::Caption(text) => node.caption = text,
        }
        self.attribute_writes += 1;
    }

    fn render(&mut self) {
        self.frames += 1;
    }

    fn recenter(&mut self) {
        self.recenters += 1;
        self.recenter_requested = true;
    }

    fn schedule_recenter(&mut self, after: Duration) {
        self.scheduled_recenters += 1;
        self.pending_recenters.push(Instant::now() + after);
    }
}

impl FullscreenCapability for SceneHost {
    fn is_supported(&self) -> bool { self.fullscreen_supported }
    fn is_fullscreen(&self) -> bool { self.fullscreen }

    fn request_fullscreen(&mut self) {
        self.fullscreen_request = Some(true);
    }

    fn exit_fullscreen(&mut self) {
        self.fullscreen_request = Some(false);
    }
}
