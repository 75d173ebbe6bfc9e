use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::graph_utils::graph::{EntityId, ResultRow, ViewEdge, ViewNode};
use crate::persistence::persist::StyleStore;
use crate::viz::extract::{extract, CountTable, Extraction};
use crate::viz::host::{FullscreenCapability, HostEvent, RenderingHost};
use crate::viz::resolver::StyleResolver;
use crate::viz::style::{Color, LabelStyleOverrides, StyleEdit};
use crate::viz::viewport::{Selection, SidebarPhase, ViewportController, ViewportEffect};

/// The entity shown in the sidebar detail panel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Detail<'a> {
    Node(&'a ViewNode),
    Edge(&'a ViewEdge),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelSummary {
    pub label: String,
    pub count: usize,
    pub color: Option<Color>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TypeSummary {
    pub rel_type: String,
    pub count: usize,
}

/// One interactive graph view: ingests result sets, keeps their styles and
/// drives the rendering host.
pub struct GraphView<H: RenderingHost, S: StyleStore> {
    host: H,
    resolver: StyleResolver<S>,
    viewport: ViewportController,
    nodes: Vec<ViewNode>,
    edges: Vec<ViewEdge>,
    node_index: HashMap<EntityId, usize>,
    edge_index: HashMap<EntityId, usize>,
    label_counts: CountTable,
    type_counts: CountTable,
}

impl<H: RenderingHost, S: StyleStore> GraphView<H, S> {
    pub fn new(host: H, store: S, recenter_delay: Duration) -> Self {
        Self {
            host,
            resolver: StyleResolver::load(store),
            viewport: ViewportController::new(recenter_delay),
            nodes: Vec::new(),
            edges: Vec::new(),
            node_index: HashMap::new(),
            edge_index: HashMap::new(),
            label_counts: CountTable::new(),
            type_counts: CountTable::new(),
        }
    }

    /// One ingestion pass. Replaces everything from the previous pass.
    pub fn ingest(&mut self, rows: &[ResultRow]) {
        let Extraction { mut nodes, edges, label_counts, type_counts } = extract(rows);

        self.viewport.reset_for_ingestion();
        self.resolver.resolve_labels(&label_counts);
        self.resolver.style_nodes(&mut nodes);

        self.host.replace_graph(&nodes, &edges);
        self.node_index = nodes.iter().enumerate().map(|(i, n)| (n.id.clone(), i)).collect();
        self.edge_index = edges.iter().enumerate().map(|(i, e)| (e.id.clone(), i)).collect();
        self.nodes = nodes;
        self.edges = edges;
        self.label_counts = label_counts;
        self.type_counts = type_counts;

        self.host.render();
        self.host.recenter();
    }

    pub fn handle_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::NodeClick(id) => {
                if self.node_index.contains_key(&id) {
                    self.viewport.select_node(id);
                } else {
                    log::debug!("click on unknown node {}", id);
                }
            }
            HostEvent::EdgeClick(id) => {
                if self.edge_index.contains_key(&id) {
                    self.viewport.select_edge(id);
                } else {
                    log::debug!("click on unknown relationship {}", id);
                }
            }
            HostEvent::EmptyClick => self.viewport.clear_selection(),
            HostEvent::SidebarAnimationEnd => {
                let effect = self.viewport.animation_finished();
                self.perform(effect);
            }
            HostEvent::FullscreenSettled(result) => {
                let effect = self.viewport.fullscreen_settled(result);
                self.perform(effect);
            }
        }
    }

    fn perform(&mut self, effect: Option<ViewportEffect>) {
        match effect {
            Some(ViewportEffect::Recenter { after }) => self.host.schedule_recenter(after),
            Some(other) => log::debug!("ignoring {:?} outside a fullscreen toggle", other),
            None => {}
        }
    }

    pub fn toggle_sidebar(&mut self) {
        self.viewport.toggle_sidebar();
    }

    pub fn recenter(&mut self) {
        self.host.recenter();
    }

    /// Open the style editor for a label of the current pass.
    pub fn open_style_editor(&mut self, label: &str) -> bool {
        if !self.label_counts.contains(label) {
            return false;
        }
        self.viewport.open_style_editor(label);
        true
    }

    pub fn close_style_editor(&mut self) {
        self.viewport.close_style_editor();
    }

    /// Commit edits for the label in the style editor, then close it.
    pub fn commit_style_edits(&mut self, edits: &[StyleEdit]) -> Result<usize> {
        let label = self
            .viewport
            .style_editor_target()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("no label is being edited"))?;
        let touched = self.edit_label_style(&label, edits)?;
        self.viewport.close_style_editor();
        Ok(touched)
    }

    /// Persist edits for `label` and re-style its nodes on the host.
    pub fn edit_label_style(&mut self, label: &str, edits: &[StyleEdit]) -> Result<usize> {
        self.resolver.apply_edits(label, edits)?;
        let touched = self.resolver.repush_label(label, &mut self.nodes, edits, &mut self.host);
        self.host.render();
        log::debug!("restyled {} nodes with label {}", touched, label);
        Ok(touched)
    }

    pub fn nodes(&self) -> &[ViewNode] { &self.nodes }
    pub fn edges(&self) -> &[ViewEdge] { &self.edges }
    pub fn label_counts(&self) -> &CountTable { &self.label_counts }
    pub fn type_counts(&self) -> &CountTable { &self.type_counts }
    pub fn overrides(&self) -> &LabelStyleOverrides { self.resolver.overrides() }
    pub fn viewport(&self) -> &ViewportController { &self.viewport }
    pub fn sidebar_phase(&self) -> SidebarPhase { self.viewport.sidebar_phase() }
    pub fn host(&self) -> &H { &self.host }
    pub fn host_mut(&mut self) -> &mut H { &mut self.host }
    pub fn store(&self) -> &S { self.resolver.store() }

    pub fn node(&self, id: &str) -> Option<&ViewNode> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn edge(&self, id: &str) -> Option<&ViewEdge> {
        self.edge_index.get(id).map(|&i| &self.edges[i])
    }

    pub fn detail(&self) -> Option<Detail<'_>> {
        match self.viewport.detail()? {
            Selection::Node(id) => self.node(id).map(Detail::Node),
            Selection::Edge(id) => self.edge(id).map(Detail::Edge),
        }
    }

    pub fn sidebar_header(&self) -> &'static str {
        match self.detail() {
            Some(Detail::Node(_)) => "Node",
            Some(Detail::Edge(_)) => "Relationship",
            None => "Overview",
        }
    }

    pub fn label_summary(&self) -> Vec<LabelSummary> {
        self.label_counts
            .iter()
            .map(|(label, count)| LabelSummary {
                label: label.to_string(),
                count,
                color: self.resolver.overrides().get(label).and_then(|s| s.color),
            })
            .collect()
    }

    pub fn type_summary(&self) -> Vec<TypeSummary> {
        self.type_counts
            .iter()
            .map(|(rel_type, count)| TypeSummary { rel_type: rel_type.to_string(), count })
            .collect()
    }

    /// Property keys offered as caption sources for `label`: those of the
    /// first node carrying it as primary label.
    pub fn label_fields(&self, label: &str) -> Vec<String> {
        self.nodes
            .iter()
            .find(|n| n.primary_label() == Some(label))
            .map(|n| n.properties.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl<H: RenderingHost + FullscreenCapability, S: StyleStore> GraphView<H, S> {
    pub fn fullscreen_available(&self) -> bool {
        self.host.is_supported()
    }

    /// Enter or leave fullscreen; the recenter follows the asynchronous
    /// `FullscreenSettled` event.
    pub fn toggle_fullscreen(&mut self) {
        if !self.host.is_supported() {
            return;
        }
        match self.viewport.toggle_fullscreen(self.host.is_fullscreen()) {
            Some(ViewportEffect::EnterFullscreen) => self.host.request_fullscreen(),
            Some(ViewportEffect::ExitFullscreen) => self.host.exit_fullscreen(),
            Some(ViewportEffect::Recenter { after }) => self.host.schedule_recenter(after),
            None => log::debug!("fullscreen change already in flight"),
        }
    }
}
