/// Diagnostic tool to verify the item set → ordering → placement pipeline
use masonry_layout::config::EngineConfig;
use masonry_layout::handler::LayoutRequestHandler;
use masonry_layout::items::build_item_set;
use masonry_layout::items::set::ItemId;
use masonry_layout::layout::skyline::LayoutItem;
use masonry_layout::layout::ColumnVariant;
use masonry_layout::source::{load_item_file, MemorySource};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

const EPS: f64 = 1e-6;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("masonry_layout=debug".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let items_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("items.json"));
    let config = match args.next() {
        Some(path) => EngineConfig::load(Path::new(&path))?,
        None => EngineConfig::default(),
    };

    println!("=== DIAGNOSTIC: Item set → Ordering → Placement ===");
    println!("Loading: {}", items_path.display());

    // Load
    let rows = load_item_file(&items_path)?;
    println!("\n[1] Loaded {} rows", rows.len());

    // Build item set
    let built = build_item_set(&rows);
    println!(
        "\n[2] Item set built: {} items, {} excluded, fingerprint {}",
        built.set.len(),
        built.excluded.len(),
        built.set.fingerprint()
    );
    for excluded in built.excluded.iter().take(10) {
        println!("    excluded '{}': {:?}", excluded.id, excluded.reason);
    }

    // Classification
    let mut wide = 0usize;
    for item in built.set.items() {
        if item.class(&config.classifier)?.is_wide() {
            wide += 1;
        }
    }
    println!(
        "\n[3] Classification (threshold {:.4}): {} wide, {} narrow",
        config.classifier.wide_threshold,
        wide,
        built.set.len() - wide
    );

    let source = MemorySource::new();
    source.insert("debug", rows);
    let handler = LayoutRequestHandler::new(source, config);

    // Orderings
    let response = handler.get_ordering("debug");
    println!("\n[4] Orderings computed (source {:?})", response.source);
    for variant in ColumnVariant::ALL {
        let ids: Vec<&str> = response.ids(variant).iter().map(ItemId::as_str).collect();
        println!("    {}: {}", variant, preview(&ids, 20));
    }

    // Placement
    println!("\n[5] Placement at configured viewports:");
    let mut anomalies = 0usize;
    for variant in ColumnVariant::ALL {
        let geometry = handler.config().ordering.geometry(variant);
        let layout = handler.layout("debug", &geometry, None)?;
        let placement = &layout.placement;
        let wide_placed = placement
            .layout_items
            .iter()
            .filter(|item| item.spans_columns > 1)
            .count();
        println!(
            "    {}: {} placed ({} wide), {} skipped, container {:.1}px at {:.0}px wide",
            variant,
            placement.layout_items.len(),
            wide_placed,
            placement.skipped.len(),
            placement.container_height,
            geometry.container_width
        );

        let overlaps = count_overlaps(&placement.layout_items);
        let adjacent = wide_runs(&layout.ordered_ids, &placement.layout_items);
        if overlaps > 0 {
            println!("    ! {} overlapping pairs", overlaps);
        }
        if adjacent > 0 {
            println!("    ! {} adjacent wide pairs in ordering", adjacent);
        }
        anomalies += overlaps;
    }

    // Anomalies
    println!("\n[6] Overlap anomalies: {}", anomalies);

    // Cache
    handler.get_ordering("debug");
    let stats = handler.cache().stats();
    println!(
        "\n[7] Cache: {} entries, {} hits, {} misses, {} computes, {} evictions",
        handler.cache().len(),
        stats.hits,
        stats.misses,
        stats.computes,
        stats.evictions
    );

    Ok(())
}

fn preview(ids: &[&str], limit: usize) -> String {
    let shown = ids.iter().take(limit).copied().collect::<Vec<_>>().join(", ");
    if ids.len() > limit {
        format!("[{}, ... +{}]", shown, ids.len() - limit)
    } else {
        format!("[{}]", shown)
    }
}

fn count_overlaps(items: &[LayoutItem]) -> usize {
    let mut count = 0;
    for (i, a) in items.iter().enumerate() {
        for b in &items[i + 1..] {
            let apart = a.right() <= b.x + EPS
                || b.right() <= a.x + EPS
                || a.bottom() <= b.y + EPS
                || b.bottom() <= a.y + EPS;
            if !apart {
                count += 1;
            }
        }
    }
    count
}

/// Consecutive wide pairs in the ordering. Expected only once narrow items run out.
fn wide_runs(ordered: &[ItemId], items: &[LayoutItem]) -> usize {
    let spans: FxHashMap<&ItemId, u8> = items
        .iter()
        .map(|item| (&item.id, item.spans_columns))
        .collect();
    ordered
        .windows(2)
        .filter(|pair| {
            pair.iter()
                .all(|id| spans.get(id).is_some_and(|&span| span > 1))
        })
        .count()
}
