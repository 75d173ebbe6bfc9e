use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};
use eframe::egui;

use graph_lens::graph_utils::rows::load_rows_from_path;
use graph_lens::gui::frontend::GraphViewApp;
use graph_lens::persistence::export;
use graph_lens::persistence::persist;
use graph_lens::persistence::settings::AppSettings;
use graph_lens::viz::engine::GraphView;
use graph_lens::viz::host::{HostDefaults, SceneHost};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = Command::new("Graph-Lens")
        .about("Interactive viewer for property graph query results")
        .arg(Arg::new("rows").value_name("ROWS").help("JSON file with query result rows"))
        .arg(Arg::new("headless").long("headless").action(ArgAction::SetTrue).help("Ingest and print an overview without opening a window"))
        .arg(Arg::new("export").long("export").value_name("PATH").help("Write the styled view to PATH (headless only)"))
        .arg(Arg::new("csv").long("csv").action(ArgAction::SetTrue).help("Export as CSV node/edge files instead of JSON"))
        .get_matches();

    let rows_path = matches.get_one::<String>("rows").map(PathBuf::from);
    let settings = AppSettings::load().unwrap_or_else(|e| {
        log::warn!("using default settings: {:#}", e);
        AppSettings::default()
    });

    if matches.get_flag("headless") {
        let export_path = matches.get_one::<String>("export").map(PathBuf::from);
        if let Err(e) = run_headless(settings, rows_path, export_path, matches.get_flag("csv")) {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    let dark_mode = settings.dark_mode;
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 760.0])
            .with_min_inner_size([700.0, 420.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "Graph-Lens",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(if dark_mode { egui::Visuals::dark() } else { egui::Visuals::light() });
            Ok(Box::new(GraphViewApp::new(settings, rows_path)) as Box<dyn eframe::App>)
        }),
    )
    .map_err(|e| anyhow::anyhow!("window failed: {}", e))
}

fn run_headless(settings: AppSettings, rows_path: Option<PathBuf>, export_path: Option<PathBuf>, csv: bool) -> anyhow::Result<()> {
    let Some(path) = rows_path else {
        anyhow::bail!("--headless needs a ROWS file");
    };
    let rows = load_rows_from_path(&path)?;
    let host = SceneHost::new(HostDefaults::for_theme(settings.dark_mode));
    let mut view = GraphView::new(host, persist::open_style_store(&settings), settings.recenter_delay());
    view.ingest(&rows);

    println!("{} nodes, {} relationships", view.nodes().len(), view.edges().len());
    for summary in view.label_summary() {
        let color = summary.color.map(|c| c.to_hex()).unwrap_or_else(|| "-".to_string());
        println!("  :{} ({}) {}", summary.label, summary.count, color);
    }
    for summary in view.type_summary() {
        println!("  :{} ({})", summary.rel_type, summary.count);
    }

    if let Some(out) = export_path {
        if csv {
            let (nodes_path, edges_path) = export::export_view_csv(view.nodes(), view.edges(), &out)?;
            println!("wrote {} and {}", nodes_path.display(), edges_path.display());
        } else {
            export::export_view_json(view.nodes(), view.edges(), &out)?;
            println!("wrote {}", out.display());
        }
    }
    Ok(())
}
