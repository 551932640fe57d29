use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;

use masonry_layout::config::EngineConfig;
use masonry_layout::handler::{LayoutRequestHandler, LayoutResponse, OrderingResponse};
use masonry_layout::layout::skyline::PlacementRequest;
use masonry_layout::layout::ColumnVariant;
use masonry_layout::source::JsonDirSource;

const USAGE: &str = "usage:
  masonry-layout order <item-set.json> [config.toml]
  masonry-layout place <placement-request.json>";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderOutput {
    item_set: String,
    #[serde(flatten)]
    ordering: OrderingResponse,
    layouts: Vec<LayoutResponse>,
}

fn main() -> Result<()> {
    // Logs go to stderr, stdout carries JSON only
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("masonry_layout=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("order") => {
            let Some(items) = args.get(1) else {
                bail!("missing item set file\n{}", USAGE);
            };
            let config = match args.get(2) {
                Some(path) => EngineConfig::load(Path::new(path))?,
                None => EngineConfig::default(),
            };
            order(Path::new(items), config)
        }
        Some("place") => {
            let Some(request) = args.get(1) else {
                bail!("missing placement request file\n{}", USAGE);
            };
            place(Path::new(request))
        }
        _ => bail!("{}", USAGE),
    }
}

/// Order an item-set file for both grids and place it at the configured viewports.
fn order(path: &Path, config: EngineConfig) -> Result<()> {
    let item_set = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("cannot derive an item set id from {}", path.display()))?
        .to_string();
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    tracing::info!("Ordering item set '{}' from {}", item_set, dir.display());
    let handler = LayoutRequestHandler::new(JsonDirSource::new(dir), config);

    let ordering = handler.get_ordering(&item_set);
    let layouts = ColumnVariant::ALL
        .iter()
        .map(|&variant| {
            let geometry = handler.config().ordering.geometry(variant);
            handler
                .layout(&item_set, &geometry, None)
                .with_context(|| format!("failed to place the {} grid", variant))
        })
        .collect::<Result<Vec<_>>>()?;

    let output = OrderOutput {
        item_set,
        ordering,
        layouts,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Run the skyline placer on an explicit ordering and dimension map.
fn place(path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let request: PlacementRequest = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse placement request {}", path.display()))?;
    let placement = request.place()?;
    println!("{}", serde_json::to_string_pretty(&placement)?);
    Ok(())
}
