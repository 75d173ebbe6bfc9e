use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, Pos2, Rect, Sense, Stroke, Vec2};

use crate::graph_utils::graph::{display_value, EntityId, Properties};
use crate::graph_utils::rows::load_rows_from_path;
use crate::persistence::export;
use crate::persistence::persist::{self, StyleStore};
use crate::persistence::settings::AppSettings;
use crate::viz::engine::{Detail, GraphView};
use crate::viz::host::{FullscreenCapability, HostDefaults, HostEvent, SceneHost};
use crate::viz::style::{Color, LabelSource, ShapeKind, StyleEdit};
use crate::viz::viewport::{Selection, SidebarPhase};

const SIDEBAR_WIDTH: f32 = 300.0;
// Screen pixels per host style unit at zoom 1.0
const UNIT_PX: f32 = 2.5;
const SPIRAL_SPACING: f32 = 40.0;
const FULLSCREEN_TIMEOUT: Duration = Duration::from_secs(1);

pub type DesktopView = GraphView<SceneHost, Box<dyn StyleStore>>;

#[derive(Clone, Debug, PartialEq, Eq)]
enum CaptionChoice {
    Unchanged,
    Id,
    Property(String),
}

// Editable copy of one label's style while the editor window is open
struct StyleDraft {
    label: String,
    color: [u8; 3],
    shape: ShapeKind,
    size: f32,
    font_size: f32,
    caption: CaptionChoice,
    fields: Vec<String>,
    initial: ([u8; 3], ShapeKind, f32, f32),
}

impl StyleDraft {
    fn edits(&self) -> Vec<StyleEdit> {
        let (color, shape, size, font_size) = self.initial;
        let mut out = Vec::new();
        if self.color != color {
            out.push(StyleEdit::Color(Color::rgb(self.color[0], self.color[1], self.color[2])));
        }
        if self.shape != shape { out.push(StyleEdit::Shape(self.shape)); }
        if self.size != size { out.push(StyleEdit::Size(self.size)); }
        if self.font_size != font_size { out.push(StyleEdit::FontSize(self.font_size)); }
        match &self.caption {
            CaptionChoice::Unchanged => {}
            CaptionChoice::Id => out.push(StyleEdit::Label(LabelSource::Id)),
            CaptionChoice::Property(key) => out.push(StyleEdit::Label(LabelSource::Property(key.clone()))),
        }
        out
    }
}

pub struct GraphViewApp {
    view: DesktopView,
    settings: AppSettings,
    rows_path: Option<PathBuf>,
    // World-space positions, re-seeded whenever the scene is replaced
    positions: HashMap<EntityId, Pos2>,
    layout_generation: u64,
    pan: Vec2,
    zoom: f32,
    last_canvas_rect: Option<Rect>,
    // Requested fullscreen state and when it was asked for
    fullscreen_wait: Option<(bool, Instant)>,
    style_draft: Option<StyleDraft>,
    status: Option<String>,
    error: Option<String>,
}

impl GraphViewApp {
    pub fn new(settings: AppSettings, rows_path: Option<PathBuf>) -> Self {
        let host = SceneHost::new(HostDefaults::for_theme(settings.dark_mode));
        let store = persist::open_style_store(&settings);
        let view = GraphView::new(host, store, settings.recenter_delay());
        let mut app = Self {
            view,
            settings,
            rows_path,
            positions: HashMap::new(),
            layout_generation: 0,
            pan: Vec2::ZERO,
            zoom: 1.0,
            last_canvas_rect: None,
            fullscreen_wait: None,
            style_draft: None,
            status: None,
            error: None,
        };
        app.reload();
        app
    }

    fn reload(&mut self) {
        let Some(path) = self.rows_path.clone() else {
            self.view.ingest(&[]);
            return;
        };
        match load_rows_from_path(&path) {
            Ok(rows) => {
                self.view.ingest(&rows);
                self.error = None;
                self.status = Some(format!(
                    "{} nodes, {} relationships from {}",
                    self.view.nodes().len(),
                    self.view.edges().len(),
                    path.display()
                ));
            }
            Err(e) => {
                log::error!("failed to load {}: {:#}", path.display(), e);
                self.error = Some(format!("Load failed: {:#}", e));
            }
        }
    }

    fn export_json(&mut self) {
        let path = export::timestamped_export_path(&self.settings, "json");
        match export::export_view_json(self.view.nodes(), self.view.edges(), &path) {
            Ok(()) => self.status = Some(format!("Exported to {}", path.display())),
            Err(e) => self.error = Some(format!("Export failed: {:#}", e)),
        }
    }

    fn sync_layout(&mut self) {
        let generation = self.view.host().generation();
        if generation == self.layout_generation {
            return;
        }
        self.positions = self
            .view
            .host()
            .nodes()
            .iter()
            .enumerate()
            .map(|(k, n)| (n.id.clone(), golden_spiral_position(k as u32)))
            .collect();
        self.layout_generation = generation;
    }

    fn fit_to_view(&mut self) {
        let Some(rect) = self.last_canvas_rect else { return };
        let mut points = self.positions.values();
        let Some(first) = points.next() else {
            self.pan = Vec2::ZERO;
            self.zoom = 1.0;
            return;
        };
        let mut bounds = Rect::from_min_max(*first, *first);
        for p in points {
            bounds.extend_with(*p);
        }
        let bounds = bounds.expand(SPIRAL_SPACING);
        self.zoom = (rect.width() / bounds.width()).min(rect.height() / bounds.height()).clamp(0.1, 4.0);
        self.pan = -bounds.center().to_vec2() * self.zoom;
    }

    fn sync_fullscreen(&mut self, ctx: &egui::Context) {
        if let Some(target) = self.view.host_mut().take_fullscreen_request() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(target));
            self.fullscreen_wait = Some((target, Instant::now()));
        }
        let observed = ctx.input(|i| i.viewport().fullscreen).unwrap_or(false);
        self.view.host_mut().set_fullscreen(observed);
        if let Some((target, since)) = self.fullscreen_wait {
            if observed == target {
                self.fullscreen_wait = None;
                self.view.handle_event(HostEvent::FullscreenSettled(Ok(())));
            } else if since.elapsed() > FULLSCREEN_TIMEOUT {
                self.fullscreen_wait = None;
                self.view.handle_event(HostEvent::FullscreenSettled(Err("window system did not switch".into())));
            } else {
                ctx.request_repaint_after(Duration::from_millis(16));
            }
        }
    }

    fn toolbar_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let phase = self.view.sidebar_phase();
            let chevron = if phase.target_visible() { "▶ Sidebar" } else { "◀ Sidebar" };
            if ui.add_enabled(!phase.is_animating(), egui::Button::new(chevron)).clicked() {
                self.view.toggle_sidebar();
            }
            if self.view.fullscreen_available() {
                let text = if self.view.host().is_fullscreen() { "Exit fullscreen" } else { "Fullscreen" };
                if ui.button(text).clicked() {
                    self.view.toggle_fullscreen();
                }
            }
            if ui.button("Recenter").clicked() {
                self.view.recenter();
            }
            ui.separator();
            if ui.button("Reload").clicked() {
                self.reload();
            }
            if ui.button("Export JSON").clicked() {
                self.export_json();
            }
            ui.menu_button("Settings", |ui| {
                let mut changed = ui.checkbox(&mut self.settings.persist_styles, "Keep label styles between runs").changed();
                changed |= ui.checkbox(&mut self.settings.dark_mode, "Dark canvas").changed();
                if changed {
                    match self.settings.save() {
                        Ok(()) => self.status = Some("Settings saved; restart to apply".into()),
                        Err(e) => self.error = Some(format!("Saving settings failed: {:#}", e)),
                    }
                }
            });
            ui.separator();
            if let Some(err) = &self.error {
                ui.colored_label(Color32::RED, err);
            } else if let Some(status) = &self.status {
                ui.small(status);
            }
        });
    }

    fn sidebar_ui(&mut self, ui: &mut egui::Ui) {
        let mut edit_label: Option<String> = None;
        ui.heading(self.view.sidebar_header());
        ui.separator();
        egui::ScrollArea::vertical().show(ui, |ui| match self.view.detail() {
            Some(Detail::Node(node)) => {
                ui.monospace(format!("id: {}", node.id));
                ui.horizontal_wrapped(|ui| {
                    for label in &node.source_labels {
                        if ui.button(format!(":{}", label)).clicked() {
                            edit_label = Some(label.clone());
                        }
                    }
                });
                properties_ui(ui, &node.properties);
            }
            Some(Detail::Edge(edge)) => {
                ui.monospace(format!("id: {}", edge.id));
                ui.label(egui::RichText::new(&edge.label).strong());
                ui.small(format!("{} -> {}", edge.start_id, edge.end_id));
                properties_ui(ui, &edge.properties);
            }
            None => {
                ui.strong("Labels");
                for summary in self.view.label_summary() {
                    ui.horizontal(|ui| {
                        let fill = summary.color.map(to_color32).unwrap_or(Color32::GRAY);
                        let (swatch, _) = ui.allocate_exact_size(Vec2::splat(12.0), Sense::hover());
                        ui.painter().rect_filled(swatch, 2.0, fill);
                        if ui.link(format!(":{}", summary.label)).clicked() {
                            edit_label = Some(summary.label.clone());
                        }
                        ui.small(format!("({})", summary.count));
                    });
                }
                ui.add_space(8.0);
                ui.strong("Relationship types");
                for summary in self.view.type_summary() {
                    ui.small(format!(":{} ({})", summary.rel_type, summary.count));
                }
            }
        });
        if let Some(label) = edit_label {
            self.view.open_style_editor(&label);
        }
    }

    fn style_editor_ui(&mut self, ctx: &egui::Context) {
        let Some(label) = self.view.viewport().style_editor_target().map(str::to_string) else {
            self.style_draft = None;
            return;
        };
        if self.style_draft.as_ref().map(|d| d.label.as_str()) != Some(label.as_str()) {
            self.style_draft = Some(self.new_draft(&label));
        }
        let Some(draft) = self.style_draft.as_mut() else { return };

        let mut apply = false;
        let mut cancel = false;
        egui::Window::new(format!("Style :{}", label))
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                egui::Grid::new("style_grid").num_columns(2).show(ui, |ui| {
                    ui.label("Color");
                    ui.color_edit_button_srgb(&mut draft.color);
                    ui.end_row();

                    ui.label("Shape");
                    egui::ComboBox::from_id_salt("style_shape")
                        .selected_text(draft.shape.name())
                        .show_ui(ui, |ui| {
                            for shape in ShapeKind::ALL {
                                ui.selectable_value(&mut draft.shape, shape, shape.name());
                            }
                        });
                    ui.end_row();

                    ui.label("Size");
                    ui.add(egui::DragValue::new(&mut draft.size).range(1.0..=50.0).speed(0.1));
                    ui.end_row();

                    ui.label("Font size");
                    ui.add(egui::DragValue::new(&mut draft.font_size).range(1.0..=30.0).speed(0.1));
                    ui.end_row();

                    ui.label("Caption");
                    let current = match &draft.caption {
                        CaptionChoice::Unchanged => "(unchanged)".to_string(),
                        CaptionChoice::Id => "#id".to_string(),
                        CaptionChoice::Property(key) => key.clone(),
                    };
                    egui::ComboBox::from_id_salt("style_caption")
                        .selected_text(current)
                        .show_ui(ui, |ui| {
                            ui.selectable_value(&mut draft.caption, CaptionChoice::Id, "#id");
                            for field in &draft.fields {
                                ui.selectable_value(&mut draft.caption, CaptionChoice::Property(field.clone()), field);
                            }
                        });
                    ui.end_row();
                });
                ui.separator();
                ui.horizontal(|ui| {
                    apply = ui.button("Apply").clicked();
                    cancel = ui.button("Cancel").clicked();
                });
            });

        if apply {
            let edits = draft.edits();
            match self.view.commit_style_edits(&edits) {
                Ok(n) => self.status = Some(format!("Restyled {} nodes", n)),
                Err(e) => self.error = Some(format!("Style update failed: {:#}", e)),
            }
            self.style_draft = None;
        } else if cancel {
            self.view.close_style_editor();
            self.style_draft = None;
        }
    }

    fn new_draft(&self, label: &str) -> StyleDraft {
        let defaults = self.view.host().defaults();
        let style = self.view.overrides().get(label).cloned().unwrap_or_default();
        let color = style.color.unwrap_or(defaults.node_color);
        let color = [color.r, color.g, color.b];
        let shape = style.shape.unwrap_or(defaults.node_shape);
        let size = style.size.unwrap_or(defaults.node_size);
        let font_size = style.font_size.unwrap_or(defaults.node_font_size);
        StyleDraft {
            label: label.to_string(),
            color,
            shape,
            size,
            font_size,
            caption: CaptionChoice::Unchanged,
            fields: self.view.label_fields(label),
            initial: (color, shape, size, font_size),
        }
    }

    fn canvas_ui(&mut self, ui: &mut egui::Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.last_canvas_rect = Some(rect);

        if response.dragged() {
            self.pan += response.drag_delta();
        }
        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let pointer = response.hover_pos().unwrap_or_else(|| rect.center());
                let world_before = (pointer - rect.center() - self.pan) / self.zoom;
                let factor = (1.0 + scroll * 0.0015).clamp(0.85, 1.15);
                self.zoom = (self.zoom * factor).clamp(0.1, 6.0);
                self.pan = pointer - rect.center() - world_before * self.zoom;
            }
        }

        let center = rect.center();
        let (pan, zoom) = (self.pan, self.zoom);
        let to_screen = move |p: Pos2| center + pan + p.to_vec2() * zoom;

        let painter = ui.painter_at(rect);
        let dark = self.settings.dark_mode;
        painter.rect_filled(rect, 0.0, if dark { Color32::from_gray(24) } else { Color32::from_gray(245) });

        let scene = self.view.host();
        let font_color = to_color32(scene.defaults().font_color);
        let selected = self.view.viewport().detail().cloned();

        // Edges first so nodes draw over them
        let mut edge_hits: Vec<(EntityId, Pos2, Pos2)> = Vec::with_capacity(scene.edges().len());
        for edge in scene.edges() {
            let (Some(a), Some(b)) = (self.positions.get(&edge.start), self.positions.get(&edge.end)) else {
                continue;
            };
            let (a, b) = (to_screen(*a), to_screen(*b));
            let is_sel = matches!(&selected, Some(Selection::Edge(id)) if *id == edge.id);
            let width = if is_sel { 3.0 } else { (edge.width * UNIT_PX * zoom).max(1.0) };
            let color = if is_sel { Color32::from_rgb(255, 200, 80) } else { to_color32(edge.color) };
            painter.line_segment([a, b], Stroke::new(width, color));
            draw_arrow_head(&painter, a, b, scene.defaults().arrow_size * UNIT_PX * 2.0 * zoom, color);
            if zoom >= 0.6 {
                painter.text(
                    a + (b - a) * 0.5,
                    egui::Align2::CENTER_BOTTOM,
                    &edge.caption,
                    egui::FontId::proportional((edge.font_size * UNIT_PX * zoom).clamp(8.0, 20.0)),
                    font_color,
                );
            }
            edge_hits.push((edge.id.clone(), a, b));
        }

        let mut node_hits: Vec<(EntityId, Pos2, f32)> = Vec::with_capacity(scene.nodes().len());
        for node in scene.nodes() {
            let Some(p) = self.positions.get(&node.id) else { continue };
            let p = to_screen(*p);
            let r = (node.size * UNIT_PX * zoom).max(2.0);
            draw_node_shape(&painter, p, r, node.shape, to_color32(node.color));
            if matches!(&selected, Some(Selection::Node(id)) if *id == node.id) {
                painter.circle_stroke(p, r + 3.0, Stroke::new(2.0, Color32::from_rgb(120, 220, 255)));
            }
            painter.text(
                p + Vec2::new(0.0, r + 2.0),
                egui::Align2::CENTER_TOP,
                &node.caption,
                egui::FontId::proportional((node.font_size * UNIT_PX * zoom).clamp(8.0, 24.0)),
                font_color,
            );
            node_hits.push((node.id.clone(), p, r));
        }

        if response.clicked() {
            if let Some(pointer) = response.interact_pointer_pos() {
                let event = hit_node(&node_hits, pointer)
                    .map(HostEvent::NodeClick)
                    .or_else(|| hit_edge(&edge_hits, pointer).map(HostEvent::EdgeClick))
                    .unwrap_or(HostEvent::EmptyClick);
                self.view.handle_event(event);
            }
        }
    }
}

impl eframe::App for GraphViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_layout();
        self.sync_fullscreen(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar_ui(ui));

        // Sidebar slide; completion is reported back once the animation lands
        let phase = self.view.sidebar_phase();
        let progress = ctx.animate_bool_with_time(
            egui::Id::new("graph_sidebar"),
            phase.target_visible(),
            self.settings.sidebar_animation_secs,
        );
        let landed = match phase {
            SidebarPhase::AnimatingOut => progress <= 0.0,
            SidebarPhase::AnimatingIn => progress >= 1.0,
            SidebarPhase::Hidden | SidebarPhase::Visible => false,
        };
        if landed {
            self.view.handle_event(HostEvent::SidebarAnimationEnd);
        } else if phase.is_animating() {
            ctx.request_repaint();
        }
        if self.view.sidebar_phase().is_shown() && progress > 0.0 {
            egui::SidePanel::right("graph_sidebar_panel")
                .resizable(false)
                .exact_width(SIDEBAR_WIDTH * progress)
                .show(ctx, |ui| self.sidebar_ui(ui));
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.canvas_ui(ui));

        self.style_editor_ui(ctx);

        if self.view.host_mut().take_due_recenter(Instant::now()) {
            self.fit_to_view();
        }
        if self.view.host().has_pending_recenter() {
            ctx.request_repaint_after(Duration::from_millis(16));
        }
    }
}

fn properties_ui(ui: &mut egui::Ui, properties: &Properties) {
    ui.add_space(6.0);
    if properties.is_empty() {
        ui.small("(no properties)");
        return;
    }
    egui::Grid::new("detail_props").num_columns(2).striped(true).show(ui, |ui| {
        for (key, value) in properties {
            ui.strong(key);
            ui.label(display_value(value));
            ui.end_row();
        }
    });
}

fn to_color32(c: Color) -> Color32 {
    Color32::from_rgb(c.r, c.g, c.b)
}

fn hit_node(hits: &[(EntityId, Pos2, f32)], pointer: Pos2) -> Option<EntityId> {
    hits.iter()
        .filter_map(|(id, p, r)| {
            let d = p.distance(pointer);
            (d <= r + 3.0).then_some((id, d))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id.clone())
}

fn hit_edge(hits: &[(EntityId, Pos2, Pos2)], pointer: Pos2) -> Option<EntityId> {
    hits.iter()
        .filter_map(|(id, a, b)| {
            let d = point_segment_distance(pointer, *a, *b);
            (d <= 4.0).then_some((id, d))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id.clone())
}

fn draw_node_shape(painter: &egui::Painter, p: Pos2, r: f32, shape: ShapeKind, fill: Color32) {
    let polygon = |points: Vec<Pos2>| egui::Shape::convex_polygon(points, fill, Stroke::NONE);
    match shape {
        ShapeKind::Circle => { painter.circle_filled(p, r, fill); }
        ShapeKind::Dot => { painter.circle_filled(p, r * 0.5, fill); }
        ShapeKind::Square => { painter.rect_filled(Rect::from_center_size(p, Vec2::splat(r * 2.0)), 0.0, fill); }
        ShapeKind::Diamond => {
            painter.add(polygon(vec![p + Vec2::new(0.0, -r), p + Vec2::new(r, 0.0), p + Vec2::new(0.0, r), p + Vec2::new(-r, 0.0)]));
        }
        ShapeKind::Triangle => { painter.add(polygon(regular_points(p, r, 3, -90.0))); }
        ShapeKind::TriangleDown => { painter.add(polygon(regular_points(p, r, 3, 90.0))); }
        ShapeKind::Hexagon => { painter.add(polygon(regular_points(p, r, 6, 0.0))); }
        ShapeKind::Star => {
            // Convex core plus one triangle per spike
            let outer = regular_points(p, r, 5, -90.0);
            let inner = regular_points(p, r * 0.45, 5, -54.0);
            painter.add(polygon(inner.clone()));
            for i in 0..5 {
                let spike = vec![inner[(i + 4) % 5], outer[i], inner[i]];
                painter.add(polygon(spike));
            }
        }
    }
}

fn regular_points(center: Pos2, r: f32, n: usize, start_deg: f32) -> Vec<Pos2> {
    (0..n)
        .map(|i| {
            let a = (start_deg + 360.0 * i as f32 / n as f32).to_radians();
            center + Vec2::new(a.cos(), a.sin()) * r
        })
        .collect()
}

fn draw_arrow_head(painter: &egui::Painter, a: Pos2, b: Pos2, size: f32, color: Color32) {
    let dir = b - a;
    let len = dir.length();
    if len <= f32::EPSILON || size < 2.0 {
        return;
    }
    let dir = dir / len;
    let tip = a + dir * (len * 0.5 + size);
    let base = tip - dir * size * 1.5;
    let normal = Vec2::new(-dir.y, dir.x) * size * 0.6;
    painter.add(egui::Shape::convex_polygon(vec![tip, base + normal, base - normal], color, Stroke::NONE));
}

// Geometry helper: distance from point P to segment AB in screen space
fn point_segment_distance(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ap = p - a;
    let ab = b - a;
    let ab_len2 = ab.length_sq();
    if ab_len2 <= f32::EPSILON {
        return ap.length();
    }
    let t = (ap.dot(ab) / ab_len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).length()
}

// Golden-angle spiral placement around the world origin.
// k is the 0-based index along the spiral.
fn golden_spiral_position(k: u32) -> Pos2 {
    let golden_angle = std::f32::consts::TAU * (1.0 - 1.0 / 1.618_033_9);
    let t = k as f32;
    // sqrt growth keeps the density roughly uniform
    let r = SPIRAL_SPACING * t.sqrt();
    let theta = t * golden_angle;
    Pos2::new(r * theta.cos(), r * theta.sin())
}
