use std::time::{Duration, Instant};

use graph_lens::graph_utils::graph::{GraphNode, GraphRelationship, Properties, ResultRow, RowValue, ViewNode};
use graph_lens::graph_utils::rows::parse_rows;
use graph_lens::persistence::export::{export_view_csv, export_view_json};
use graph_lens::persistence::persist::{load_overrides, FileStyleStore, SessionStore, StyleStore, NODE_STYLES_KEY};
use graph_lens::persistence::settings::AppSettings;
use graph_lens::viz::engine::{Detail, GraphView};
use graph_lens::viz::extract::extract;
use graph_lens::viz::host::{FullscreenCapability, HostDefaults, HostEvent, RenderingHost, SceneHost};
use graph_lens::viz::resolver::{caption_for, StyleResolver};
use graph_lens::viz::style::{palette_color, Color, LabelSource, ShapeKind, StyleEdit, StyleSet, PALETTE};
use graph_lens::viz::viewport::{SidebarPhase, ViewportController, ViewportEffect};
use serde_json::json;

fn props(value: serde_json::Value) -> Properties {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Properties::new(),
    }
}

fn node(id: &str, labels: &[&str], properties: serde_json::Value) -> RowValue {
    RowValue::Node(GraphNode {
        identity: id.to_string(),
        labels: labels.iter().map(|l| l.to_string()).collect(),
        properties: props(properties),
    })
}

fn rel(id: &str, start: &str, end: &str, rel_type: &str) -> RowValue {
    RowValue::Relationship(GraphRelationship {
        identity: id.to_string(),
        start: start.to_string(),
        end: end.to_string(),
        rel_type: rel_type.to_string(),
        properties: Properties::new(),
    })
}

fn knows_rows() -> Vec<ResultRow> {
    vec![ResultRow::new()
        .with("a", node("1", &["Person"], json!({"name": "Ada"})))
        .with("r", rel("10", "1", "2", "KNOWS"))
        .with("b", node("2", &["Person"], json!({"name": "Grace"})))]
}

fn labelled_rows(labels: &[&str]) -> Vec<ResultRow> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| ResultRow::new().with("n", node(&format!("n{}", i), &[*label], json!({}))))
        .collect()
}

fn new_view() -> GraphView<SceneHost, SessionStore> {
    new_view_with(SessionStore::new())
}

fn new_view_with<S: StyleStore>(store: S) -> GraphView<SceneHost, S> {
    GraphView::new(SceneHost::new(HostDefaults::default()), store, Duration::from_millis(100))
}

struct FailingStore;

impl StyleStore for FailingStore {
    fn get(&self, _key: &str) -> Option<String> { None }
    fn set(&mut self, _key: &str, _value: String) -> anyhow::Result<()> {
        anyhow::bail!("quota exceeded")
    }
}

#[test]
fn extract_two_people_and_one_relationship() {
    let out = extract(&knows_rows());
    assert_eq!(out.nodes.len(), 2);
    assert_eq!(out.edges.len(), 1);
    assert_eq!(out.label_counts.get("Person"), Some(2));
    assert_eq!(out.label_counts.len(), 1);
    assert_eq!(out.type_counts.get("KNOWS"), Some(1));
    assert_eq!(out.edges[0].label, ":KNOWS");
    assert_eq!(out.nodes[0].label, ":Person");
}

#[test]
fn extract_first_occurrence_wins_and_ids_are_unique() {
    let rows = vec![
        ResultRow::new().with("n", node("1", &["Person"], json!({"name": "first"}))),
        ResultRow::new()
            .with("n", node("1", &["Person"], json!({"name": "second"})))
            .with("m", node("2", &["Movie"], json!({})))
            .with("r", rel("7", "1", "2", "ACTED_IN")),
        ResultRow::new().with("r", rel("7", "1", "2", "ACTED_IN")),
    ];
    let out = extract(&rows);
    assert_eq!(out.nodes.len(), 2);
    assert_eq!(out.nodes[0].properties.get("name"), Some(&json!("first")));
    assert_eq!(out.edges.len(), 1);
    assert_eq!(out.label_counts.get("Person"), Some(1));
    assert_eq!(out.type_counts.get("ACTED_IN"), Some(1));
}

#[test]
fn extract_drops_dangling_relationships_without_counting_them() {
    let rows = vec![ResultRow::new()
        .with("a", node("1", &["Person"], json!({})))
        .with("r", rel("10", "1", "99", "KNOWS"))];
    let out = extract(&rows);
    assert_eq!(out.nodes.len(), 1);
    assert!(out.edges.is_empty());
    assert!(!out.type_counts.contains("KNOWS"));
}

#[test]
fn extract_relationship_endpoints_may_appear_in_later_rows() {
    let rows = vec![
        ResultRow::new().with("r", rel("10", "1", "2", "KNOWS")),
        ResultRow::new().with("a", node("1", &["Person"], json!({}))).with("b", node("2", &["Person"], json!({}))),
    ];
    let out = extract(&rows);
    assert_eq!(out.edges.len(), 1);
}

#[test]
fn extract_counts_primary_label_only_and_skips_label_less_nodes() {
    let rows = vec![ResultRow::new()
        .with("a", node("1", &["Person", "Actor"], json!({})))
        .with("b", node("2", &[], json!({})))
        .with("x", RowValue::Scalar(json!(42)))];
    let out = extract(&rows);
    assert_eq!(out.nodes.len(), 2);
    assert_eq!(out.nodes[0].label, ":Person:Actor");
    assert_eq!(out.label_counts.get("Person"), Some(1));
    assert!(!out.label_counts.contains("Actor"));
    assert_eq!(out.label_counts.len(), 1);
    assert_eq!(out.label_counts.position("Person"), Some(0));
}

#[test]
fn thirteenth_label_wraps_to_first_palette_colour() {
    let labels: Vec<String> = (0..13).map(|i| format!("L{}", i)).collect();
    let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
    let mut view = new_view();
    view.ingest(&labelled_rows(&refs));
    let overrides = view.overrides();
    assert_eq!(overrides.get("L0").and_then(|s| s.color), Some(PALETTE[0]));
    assert_eq!(overrides.get("L1").and_then(|s| s.color), Some(PALETTE[1]));
    assert_eq!(overrides.get("L11").and_then(|s| s.color), Some(PALETTE[11]));
    assert_eq!(overrides.get("L12").and_then(|s| s.color), Some(PALETTE[0]));
    assert_eq!(palette_color(12), PALETTE[0]);
}

#[test]
fn assigned_colours_stay_stable_across_passes() {
    let mut view = new_view();
    view.ingest(&labelled_rows(&["Person", "Movie"]));
    let movie = view.overrides().get("Movie").and_then(|s| s.color);
    assert_eq!(movie, Some(PALETTE[1]));

    view.ingest(&labelled_rows(&["Movie", "Genre"]));
    assert_eq!(view.overrides().get("Movie").and_then(|s| s.color), movie);
    // Slot 0 is free again once Person has been pruned
    assert_eq!(view.overrides().get("Genre").and_then(|s| s.color), Some(PALETTE[0]));
}

#[test]
fn user_colour_survives_reingestion() {
    let mut view = new_view();
    view.ingest(&knows_rows());
    let red = Color::parse_hex("#FF0000").unwrap();
    view.edit_label_style("Person", &[StyleEdit::Color(red)]).unwrap();

    view.ingest(&knows_rows());
    assert_eq!(view.overrides().get("Person").and_then(|s| s.color), Some(red));
    assert_eq!(view.node("1").and_then(|n| n.style.color), Some(red));
    assert_eq!(view.host().node("1").map(|n| n.color), Some(red));
}

#[test]
fn labels_missing_from_a_pass_are_pruned_from_store() {
    let mut view = new_view();
    view.ingest(&labelled_rows(&["Person", "Temp"]));
    view.edit_label_style("Temp", &[StyleEdit::Size(9.0)]).unwrap();
    assert!(view.overrides().contains("Temp"));

    view.ingest(&labelled_rows(&["Person"]));
    assert!(!view.overrides().contains("Temp"));
    let persisted = load_overrides(view.store());
    assert!(!persisted.contains("Temp"));
    assert!(persisted.contains("Person"));
}

#[test]
fn reingesting_the_same_rows_is_idempotent() {
    let mut view = new_view();
    view.ingest(&knows_rows());
    let nodes = view.nodes().to_vec();
    let edges = view.edges().to_vec();
    let overrides = view.overrides().clone();

    view.ingest(&knows_rows());
    assert_eq!(view.nodes(), nodes.as_slice());
    assert_eq!(view.edges(), edges.as_slice());
    assert_eq!(view.overrides(), &overrides);
}

#[test]
fn every_drawn_edge_references_drawn_nodes() {
    let rows = vec![
        ResultRow::new()
            .with("a", node("1", &["A"], json!({})))
            .with("r1", rel("10", "1", "2", "T"))
            .with("r2", rel("11", "1", "3", "T")),
        ResultRow::new().with("b", node("2", &["B"], json!({}))),
    ];
    let mut view = new_view();
    view.ingest(&rows);
    for edge in view.host().edges() {
        assert!(view.host().node(&edge.start).is_some());
        assert!(view.host().node(&edge.end).is_some());
    }
    assert_eq!(view.type_counts().get("T"), Some(1));
}

#[test]
fn corrupt_persisted_styles_start_fresh() {
    let store = SessionStore::new().with_entry(NODE_STYLES_KEY, "{not json");
    let mut view = new_view_with(store);
    assert!(view.overrides().is_empty());
    view.ingest(&knows_rows());
    assert_eq!(view.overrides().get("Person").and_then(|s| s.color), Some(PALETTE[0]));
    // The corrupt entry is overwritten by the first successful save
    assert!(load_overrides(view.store()).contains("Person"));
}

#[test]
fn persisted_styles_are_loaded_on_start() {
    let store = SessionStore::new().with_entry(NODE_STYLES_KEY, r##"{"Person":{"color":"#00FF00","shape":"star"}}"##);
    let mut view = new_view_with(store);
    view.ingest(&knows_rows());
    let person = view.overrides().get("Person").cloned().unwrap_or_default();
    assert_eq!(person.color, Color::parse_hex("#00ff00").ok());
    assert_eq!(person.shape, Some(ShapeKind::Star));
    assert_eq!(view.host().node("2").map(|n| n.shape), Some(ShapeKind::Star));
}

#[test]
fn store_failure_does_not_block_ingestion_but_rejects_edits() {
    let mut view = new_view_with(FailingStore);
    view.ingest(&knows_rows());
    assert_eq!(view.nodes().len(), 2);
    assert_eq!(view.overrides().get("Person").and_then(|s| s.color), Some(PALETTE[0]));

    let before = view.overrides().clone();
    let result = view.edit_label_style("Person", &[StyleEdit::Shape(ShapeKind::Square)]);
    assert!(result.is_err());
    assert_eq!(view.overrides(), &before);
    assert_eq!(view.host().node("1").map(|n| n.shape), Some(ShapeKind::Circle));
}

#[test]
fn style_edit_repushes_only_edited_fields_to_matching_nodes() {
    let rows = vec![ResultRow::new()
        .with("a", node("1", &["Person"], json!({})))
        .with("b", node("2", &["Person"], json!({})))
        .with("m", node("3", &["Movie"], json!({})))];
    let mut view = new_view();
    view.ingest(&rows);
    let writes_before = view.host().attribute_writes();

    let touched = view.edit_label_style("Person", &[StyleEdit::Shape(ShapeKind::Square)]).unwrap();
    assert_eq!(touched, 2);
    assert_eq!(view.host().attribute_writes() - writes_before, 2);
    assert_eq!(view.host().node("1").map(|n| n.shape), Some(ShapeKind::Square));
    assert_eq!(view.host().node("3").map(|n| n.shape), Some(ShapeKind::Circle));
    // Colour from the palette is kept alongside the new shape
    let person = view.overrides().get("Person").cloned().unwrap_or_default();
    assert_eq!(person.color, Some(PALETTE[0]));
    assert_eq!(person.shape, Some(ShapeKind::Square));
}

#[test]
fn editing_a_label_outside_the_current_pass_fails() {
    let mut view = new_view();
    view.ingest(&knows_rows());
    assert!(view.edit_label_style("Movie", &[StyleEdit::Size(3.0)]).is_err());
    assert!(!view.overrides().contains("Movie"));
}

#[test]
fn caption_follows_label_source() {
    let mut view = new_view();
    let rows = vec![ResultRow::new()
        .with("a", node("1", &["Person"], json!({"name": "Ada"})))
        .with("b", node("2", &["Person"], json!({"born": 1815})))];
    view.ingest(&rows);
    assert_eq!(view.host().node("1").map(|n| n.caption.as_str()), Some(":Person"));

    view.edit_label_style("Person", &[StyleEdit::Label(LabelSource::Property("name".into()))]).unwrap();
    assert_eq!(view.host().node("1").map(|n| n.caption.as_str()), Some("Ada"));
    // Node without the property falls back to its label string
    assert_eq!(view.host().node("2").map(|n| n.caption.as_str()), Some(":Person"));

    view.edit_label_style("Person", &[StyleEdit::Label(LabelSource::Id)]).unwrap();
    assert_eq!(view.host().node("2").map(|n| n.caption.as_str()), Some("2"));
}

#[test]
fn caption_for_renders_non_string_properties() {
    let node = match node("5", &["Person"], json!({"born": 1815, "big": {"low": 1, "high": 1}})) {
        RowValue::Node(n) => ViewNode::from_graph_node(&n),
        _ => unreachable!(),
    };
    let born = StyleSet { label_source: Some(LabelSource::Property("born".into())), ..StyleSet::default() };
    assert_eq!(caption_for(&node, &born), "1815");
    let big = StyleSet { label_source: Some(LabelSource::Property("big".into())), ..StyleSet::default() };
    assert_eq!(caption_for(&node, &big), "4294967297");
    assert_eq!(caption_for(&node, &StyleSet::default()), ":Person");
}

#[test]
fn label_less_nodes_use_host_defaults() {
    let mut view = new_view();
    view.ingest(&[ResultRow::new().with("n", node("1", &[], json!({})))]);
    assert!(view.label_counts().is_empty());
    assert!(view.overrides().is_empty());
    let drawn = view.host().node("1").cloned().unwrap();
    let defaults = HostDefaults::default();
    assert_eq!(drawn.color, defaults.node_color);
    assert_eq!(drawn.size, defaults.node_size);
}

#[test]
fn sidebar_toggle_ignored_while_animating_and_recenters_once() {
    let mut view = new_view();
    view.ingest(&knows_rows());
    assert_eq!(view.sidebar_phase(), SidebarPhase::Visible);

    view.toggle_sidebar();
    assert_eq!(view.sidebar_phase(), SidebarPhase::AnimatingOut);
    view.toggle_sidebar();
    assert_eq!(view.sidebar_phase(), SidebarPhase::AnimatingOut);

    view.handle_event(HostEvent::SidebarAnimationEnd);
    assert_eq!(view.sidebar_phase(), SidebarPhase::Hidden);
    assert_eq!(view.host().scheduled_recenter_count(), 1);

    // Stray completion while stable
    view.handle_event(HostEvent::SidebarAnimationEnd);
    assert_eq!(view.sidebar_phase(), SidebarPhase::Hidden);
    assert_eq!(view.host().scheduled_recenter_count(), 1);

    view.toggle_sidebar();
    assert_eq!(view.sidebar_phase(), SidebarPhase::AnimatingIn);
    view.toggle_sidebar();
    assert_eq!(view.sidebar_phase(), SidebarPhase::AnimatingIn);
    view.handle_event(HostEvent::SidebarAnimationEnd);
    assert_eq!(view.sidebar_phase(), SidebarPhase::Visible);
    assert_eq!(view.host().scheduled_recenter_count(), 2);
}

#[test]
fn controller_reports_recenter_delay_on_animation_end() {
    let mut vc = ViewportController::new(Duration::from_millis(100));
    assert_eq!(vc.animation_finished(), None);
    vc.toggle_sidebar();
    assert_eq!(vc.animation_finished(), Some(ViewportEffect::Recenter { after: Duration::from_millis(100) }));
    assert_eq!(vc.sidebar_phase(), SidebarPhase::Hidden);
}

#[test]
fn clicks_drive_the_detail_panel() {
    let mut view = new_view();
    view.ingest(&knows_rows());
    assert_eq!(view.sidebar_header(), "Overview");

    view.handle_event(HostEvent::NodeClick("1".into()));
    assert!(matches!(view.detail(), Some(Detail::Node(n)) if n.id == "1"));
    assert_eq!(view.sidebar_header(), "Node");

    view.handle_event(HostEvent::EdgeClick("10".into()));
    assert!(matches!(view.detail(), Some(Detail::Edge(e)) if e.id == "10"));
    assert_eq!(view.sidebar_header(), "Relationship");

    // Unknown ids leave the selection alone
    view.handle_event(HostEvent::NodeClick("404".into()));
    assert_eq!(view.sidebar_header(), "Relationship");

    view.handle_event(HostEvent::EmptyClick);
    assert!(view.detail().is_none());
    assert_eq!(view.sidebar_header(), "Overview");
}

#[test]
fn ingestion_clears_selection_and_editor_but_keeps_sidebar() {
    let mut view = new_view();
    view.ingest(&knows_rows());
    view.handle_event(HostEvent::NodeClick("1".into()));
    assert!(view.open_style_editor("Person"));
    view.toggle_sidebar();
    view.handle_event(HostEvent::SidebarAnimationEnd);

    view.ingest(&knows_rows());
    assert!(view.detail().is_none());
    assert!(view.viewport().style_editor_target().is_none());
    assert_eq!(view.sidebar_phase(), SidebarPhase::Hidden);
}

#[test]
fn style_editor_commit_and_guards() {
    let mut view = new_view();
    view.ingest(&knows_rows());
    assert!(!view.open_style_editor("Movie"));
    assert!(view.commit_style_edits(&[StyleEdit::Size(8.0)]).is_err());

    assert!(view.open_style_editor("Person"));
    let touched = view.commit_style_edits(&[StyleEdit::Size(8.0), StyleEdit::FontSize(6.0)]).unwrap();
    assert_eq!(touched, 2);
    assert!(view.viewport().style_editor_target().is_none());
    assert_eq!(view.host().node("1").map(|n| (n.size, n.font_size)), Some((8.0, 6.0)));
}

#[test]
fn fullscreen_recenters_after_successful_settle() {
    let mut view = new_view();
    view.ingest(&knows_rows());
    assert!(view.fullscreen_available());

    view.toggle_fullscreen();
    assert_eq!(view.host_mut().take_fullscreen_request(), Some(true));
    // A second toggle while the first is in flight is ignored
    view.toggle_fullscreen();
    assert_eq!(view.host_mut().take_fullscreen_request(), None);

    view.host_mut().set_fullscreen(true);
    view.handle_event(HostEvent::FullscreenSettled(Ok(())));
    assert_eq!(view.host().scheduled_recenter_count(), 1);

    view.toggle_fullscreen();
    assert_eq!(view.host_mut().take_fullscreen_request(), Some(false));
}

#[test]
fn fullscreen_rejection_does_not_recenter() {
    let mut view = new_view();
    view.ingest(&knows_rows());
    view.toggle_fullscreen();
    view.handle_event(HostEvent::FullscreenSettled(Err("denied".into())));
    assert_eq!(view.host().scheduled_recenter_count(), 0);
    assert!(!view.host().is_fullscreen());
    assert!(!view.viewport().fullscreen_pending());

    // Settle without a request in flight is ignored
    view.handle_event(HostEvent::FullscreenSettled(Ok(())));
    assert_eq!(view.host().scheduled_recenter_count(), 0);
}

#[test]
fn fullscreen_unsupported_is_a_no_op() {
    let mut host = SceneHost::new(HostDefaults::default());
    host.set_fullscreen_supported(false);
    let mut view = GraphView::new(host, SessionStore::new(), Duration::from_millis(100));
    assert!(!view.fullscreen_available());
    view.toggle_fullscreen();
    assert_eq!(view.host_mut().take_fullscreen_request(), None);
    assert!(!view.viewport().fullscreen_pending());
}

#[test]
fn ingest_renders_and_recenters_immediately() {
    let mut view = new_view();
    view.ingest(&knows_rows());
    assert_eq!(view.host().generation(), 1);
    assert_eq!(view.host().frames(), 1);
    assert!(view.host_mut().take_due_recenter(Instant::now()));
    assert!(!view.host_mut().take_due_recenter(Instant::now()));
}

#[test]
fn deferred_recenter_fires_after_its_delay() {
    let mut host = SceneHost::new(HostDefaults::default());
    host.schedule_recenter(Duration::from_millis(100));
    assert!(host.has_pending_recenter());
    assert!(!host.take_due_recenter(Instant::now()));
    assert!(host.take_due_recenter(Instant::now() + Duration::from_millis(150)));
    assert!(!host.has_pending_recenter());
    assert_eq!(host.recenter_count(), 1);
}

#[test]
fn overview_summaries_follow_first_seen_order() {
    let rows = vec![ResultRow::new()
        .with("m", node("3", &["Movie"], json!({"title": "Heat", "year": 1995})))
        .with("a", node("1", &["Person"], json!({})))
        .with("r", rel("10", "1", "3", "ACTED_IN"))];
    let mut view = new_view();
    view.ingest(&rows);
    let labels: Vec<String> = view.label_summary().into_iter().map(|s| s.label).collect();
    assert_eq!(labels, vec!["Movie", "Person"]);
    assert_eq!(view.label_summary()[0].color, Some(PALETTE[0]));
    assert_eq!(view.type_summary()[0].rel_type, "ACTED_IN");
    assert_eq!(view.label_fields("Movie"), vec!["title".to_string(), "year".to_string()]);
    assert!(view.label_fields("Nobody").is_empty());
}

#[test]
fn parse_rows_accepts_plain_objects_records_and_wrapped_rows() {
    let plain = r#"[{"n": {"identity": "1", "labels": ["Person"], "properties": {"name": "Ada"}}, "count": 3}]"#;
    let rows = parse_rows(plain).unwrap();
    assert_eq!(rows.len(), 1);
    assert!(matches!(rows[0].get("n"), Some(RowValue::Node(n)) if n.identity == "1"));
    assert!(matches!(rows[0].get("count"), Some(RowValue::Scalar(_))));

    let records = r#"[{"keys": ["a", "r", "b"], "_fields": [
        {"identity": {"low": 1, "high": 0}, "labels": ["Person"], "properties": {}},
        {"identity": 10, "start": {"low": 1, "high": 0}, "end": 2, "type": "KNOWS", "properties": {}},
        {"identity": 2, "labels": ["Person"], "properties": {}}
    ]}]"#;
    let rows = parse_rows(records).unwrap();
    assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["a", "r", "b"]);
    let out = extract(&rows);
    assert_eq!(out.nodes.len(), 2);
    assert_eq!(out.edges.len(), 1);
    assert_eq!(out.edges[0].start_id, "1");

    let wrapped = r#"{"rows": [{"x": 1}, {"x": 2}]}"#;
    assert_eq!(parse_rows(wrapped).unwrap().len(), 2);
}

#[test]
fn parse_rows_recombines_split_identities() {
    let text = r#"[{"n": {"identity": {"low": 1, "high": 1}, "labels": ["Big"], "properties": {}}}]"#;
    let rows = parse_rows(text).unwrap();
    assert!(matches!(rows[0].get("n"), Some(RowValue::Node(n)) if n.identity == "4294967297"));
}

#[test]
fn parse_rows_rejects_malformed_input() {
    assert!(parse_rows("42").is_err());
    assert!(parse_rows(r#"{"data": []}"#).is_err());
    assert!(parse_rows("[1, 2]").is_err());
    assert!(parse_rows(r#"[{"keys": ["a"], "_fields": []}]"#).is_err());
}

#[test]
fn file_style_store_round_trips_and_survives_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("styles.json");
    {
        let mut store = FileStyleStore::open(&path);
        assert!(store.get(NODE_STYLES_KEY).is_none());
        store.set(NODE_STYLES_KEY, "{}".to_string()).unwrap();
    }
    let store = FileStyleStore::open(&path);
    assert_eq!(store.get(NODE_STYLES_KEY).as_deref(), Some("{}"));

    std::fs::write(&path, "garbage").unwrap();
    let store = FileStyleStore::open(&path);
    assert!(store.get(NODE_STYLES_KEY).is_none());
}

#[test]
fn file_backed_styles_carry_over_to_a_new_view() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("styles.json");
    let blue = Color::rgb(0, 0, 255);
    {
        let mut view = new_view_with(FileStyleStore::open(&path));
        view.ingest(&knows_rows());
        view.edit_label_style("Person", &[StyleEdit::Color(blue)]).unwrap();
    }
    let mut view = new_view_with(FileStyleStore::open(&path));
    assert_eq!(view.overrides().get("Person").and_then(|s| s.color), Some(blue));
    view.ingest(&knows_rows());
    assert_eq!(view.host().node("1").map(|n| n.color), Some(blue));
}

#[test]
fn export_view_json_writes_styled_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("view.json");
    let mut view = new_view();
    view.ingest(&knows_rows());
    export_view_json(view.nodes(), view.edges(), &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.ends_with('\n'));
    let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(doc["nodes"].as_array().map(Vec::len), Some(2));
    assert_eq!(doc["nodes"][0]["color"], json!(PALETTE[0].to_hex()));
    assert_eq!(doc["edges"][0]["type"], json!("KNOWS"));
}

#[test]
fn export_view_csv_writes_node_and_edge_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut view = new_view();
    view.ingest(&knows_rows());
    let (nodes_path, edges_path) = export_view_csv(view.nodes(), view.edges(), &dir.path().join("view.csv")).unwrap();
    assert!(nodes_path.ends_with("view_nodes.csv"));
    let nodes = std::fs::read_to_string(nodes_path).unwrap();
    assert!(nodes.starts_with("id,caption,labels,color,properties_json"));
    assert_eq!(nodes.lines().count(), 3);
    let edges = std::fs::read_to_string(edges_path).unwrap();
    assert!(edges.lines().nth(1).is_some_and(|l| l.starts_with("10,1,2,KNOWS")));
}

#[test]
fn colour_parsing_and_style_serialization() {
    assert_eq!(Color::parse_hex("#ff0000").unwrap().to_hex(), "#FF0000");
    assert_eq!(Color::parse_hex("#abc").unwrap(), Color::rgb(0xAA, 0xBB, 0xCC));
    assert!(Color::parse_hex("red").is_err());
    assert!(Color::parse_hex("#12345").is_err());

    let style = StyleSet {
        color: Some(Color::rgb(1, 2, 3)),
        font_size: Some(4.0),
        label_source: Some(LabelSource::Id),
        ..StyleSet::default()
    };
    let v = serde_json::to_value(&style).unwrap();
    assert_eq!(v, json!({"color": "#010203", "fontSize": 4.0, "label": "#id"}));
    let back: StyleSet = serde_json::from_value(v).unwrap();
    assert_eq!(back, style);
}

#[test]
fn sidebar_phase_transitions() {
    assert_eq!(SidebarPhase::Visible.on_toggle(), SidebarPhase::AnimatingOut);
    assert_eq!(SidebarPhase::Hidden.on_toggle(), SidebarPhase::AnimatingIn);
    assert_eq!(SidebarPhase::AnimatingIn.on_toggle(), SidebarPhase::AnimatingIn);
    assert_eq!(SidebarPhase::AnimatingOut.on_animation_end(), SidebarPhase::Hidden);
    assert_eq!(SidebarPhase::Visible.on_animation_end(), SidebarPhase::Visible);
    assert!(SidebarPhase::AnimatingOut.is_shown());
    assert!(!SidebarPhase::Hidden.is_shown());
    assert!(!SidebarPhase::AnimatingOut.target_visible());
}

#[test]
fn newcomer_label_gets_an_unused_palette_colour() {
    let mut view = new_view();
    view.ingest(&labelled_rows(&["A", "B"]));
    view.ingest(&labelled_rows(&["A", "B", "C"]));
    let color = |label: &str| view.overrides().get(label).and_then(|s| s.color);
    assert_eq!(color("A"), Some(PALETTE[0]));
    assert_eq!(color("B"), Some(PALETTE[1]));
    assert_eq!(color("C"), Some(PALETTE[2]));
}

#[test]
fn newcomer_skips_slots_of_user_and_persisted_colours() {
    let store = SessionStore::new().with_entry(NODE_STYLES_KEY, format!(r#"{{"B":{{"color":"{}"}}}}"#, PALETTE[0].to_hex()));
    let mut view = new_view_with(store);
    view.ingest(&labelled_rows(&["A", "B", "C"]));
    let color = |label: &str| view.overrides().get(label).and_then(|s| s.color);
    assert_eq!(color("B"), Some(PALETTE[0]));
    assert_eq!(color("A"), Some(PALETTE[1]));
    assert_eq!(color("C"), Some(PALETTE[2]));
}

#[test]
fn id_caption_prefers_a_property_named_hash_id() {
    let mut view = new_view();
    view.ingest(&[ResultRow::new()
        .with("a", node("7", &["Thing"], json!({"#id": "custom"})))
        .with("b", node("8", &["Thing"], json!({})))]);
    view.edit_label_style("Thing", &[StyleEdit::Label(LabelSource::Id)]).unwrap();
    assert_eq!(view.host().node("7").map(|n| n.caption.as_str()), Some("custom"));
    assert_eq!(view.host().node("8").map(|n| n.caption.as_str()), Some("8"));
}

#[test]
fn resolver_assigns_styles_for_every_label_of_the_pass() {
    let out = extract(&labelled_rows(&["Person", "Movie"]));
    let mut resolver = StyleResolver::load(SessionStore::new());
    resolver.resolve_labels(&out.label_counts);
    assert!(resolver.has_label("Person"));
    assert_eq!(resolver.effective_style("Movie").color, Some(PALETTE[1]));
    assert_eq!(load_overrides(resolver.store()), *resolver.overrides());
}

#[test]
fn settings_fill_missing_fields_with_defaults() {
    let settings: AppSettings = serde_json::from_str(r#"{"persist_styles": true}"#).unwrap();
    assert!(settings.persist_styles);
    assert_eq!(settings.recenter_delay(), Duration::from_millis(100));
    assert!(settings.dark_mode);
    assert_eq!(settings.style_store_dir(), AppSettings::style_store_default_dir());
}
