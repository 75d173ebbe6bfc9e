use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use time::macros::format_description;
use time::OffsetDateTime;

use super::settings::AppSettings;
use crate::graph_utils::graph::{Properties, ViewEdge, ViewNode};
use crate::viz::style::{Color, ShapeKind};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeOut<'a> {
    id: &'a str,
    caption: &'a str,
    labels: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shape: Option<ShapeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    font_size: Option<f32>,
    properties: &'a Properties,
}

#[derive(Serialize)]
struct EdgeOut<'a> {
    id: &'a str,
    start: &'a str,
    end: &'a str,
    #[serde(rename = "type")]
    rel_type: &'a str,
    properties: &'a Properties,
}

#[derive(Serialize)]
struct ViewOut<'a> {
    nodes: Vec<NodeOut<'a>>,
    edges: Vec<EdgeOut<'a>>,
}

/// Write the styled view as pretty JSON.
pub fn export_view_json(nodes: &[ViewNode], edges: &[ViewEdge], path: &Path) -> anyhow::Result<()> {
    let out = ViewOut {
        nodes: nodes
            .iter()
            .map(|n| NodeOut {
                id: &n.id,
                caption: &n.caption,
                labels: &n.source_labels,
                color: n.style.color,
                shape: n.style.shape,
                size: n.style.size,
                font_size: n.style.font_size,
                properties: &n.properties,
            })
            .collect(),
        edges: edges
            .iter()
            .map(|e| EdgeOut { id: &e.id, start: &e.start_id, end: &e.end_id, rel_type: &e.rel_type, properties: &e.properties })
            .collect(),
    };
    if let Some(parent) = path.parent() { fs::create_dir_all(parent)?; }
    let f = File::create(path)?;
    serde_json::to_writer_pretty(f, &out)?;
    // ensure newline at end
    let mut f2 = OpenOptions::new().append(true).open(path)?;
    f2.write_all(b"\n")?;
    Ok(())
}

/// Write `{stem}_nodes.csv` and `{stem}_edges.csv` next to `base_path`.
pub fn export_view_csv(nodes: &[ViewNode], edges: &[ViewEdge], base_path: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
    let parent = base_path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let stem = base_path.file_stem().and_then(|s| s.to_str()).unwrap_or("view");
    let nodes_path = parent.join(format!("{}_nodes.csv", stem));
    let edges_path = parent.join(format!("{}_edges.csv", stem));
    {
        let mut wtr = csv::Writer::from_path(&nodes_path)?;
        wtr.write_record(["id", "caption", "labels", "color", "properties_json"])?;
        for n in nodes {
            let props = serde_json::to_string(&n.properties)?;
            let color = n.style.color.map(|c| c.to_hex()).unwrap_or_default();
            wtr.write_record([n.id.as_str(), n.caption.as_str(), n.source_labels.join(":").as_str(), color.as_str(), props.as_str()])?;
        }
        wtr.flush()?;
    }
    {
        let mut wtr = csv::Writer::from_path(&edges_path)?;
        wtr.write_record(["id", "start", "end", "type", "properties_json"])?;
        for e in edges {
            let props = serde_json::to_string(&e.properties)?;
            wtr.write_record([e.id.as_str(), e.start_id.as_str(), e.end_id.as_str(), e.rel_type.as_str(), props.as_str()])?;
        }
        wtr.flush()?;
    }
    Ok((nodes_path, edges_path))
}

/// `{export_dir}/view_YYYYMMDD_HHMMSS.{ext}` in UTC.
pub fn timestamped_export_path(settings: &AppSettings, ext: &str) -> PathBuf {
    let now = OffsetDateTime::now_utc();
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    let stamp = now.format(fmt).unwrap_or_else(|_| "unknown".to_string());
    settings.export_dir().join(format!("view_{}.{}", stamp, ext))
}
