//! Headless viewer run against an in-process fake backend
//!
//! Loads a record, zooms into the bottom surface, waits for tiles and prints
//! what each frame would draw.
//!
//! ```sh
//! RUST_LOG=mosaic_viewer=debug cargo run --example headless
//! ```

use async_trait::async_trait;
use mosaic_viewer::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

/// Serves synthetic metadata, defects and tile bytes
struct FakeBackend {
    tile_fetches: AtomicU64,
}

#[async_trait]
impl ViewerBackend for FakeBackend {
    async fn fetch_metadata(&self, _seq_id: i64) -> mosaic_viewer::Result<MosaicMeta> {
        MosaicMeta::from_json_str(
            r#"{
                "tile": {"default_tile_size": 1024, "max_level": 2, "min_level": 0},
                "perSurface": [
                    {"surface": "top", "frameWidth": 16384, "frameHeight": 1024, "frameCount": 40},
                    {"surface": "bottom", "frameWidth": 16384, "frameHeight": 1024, "frameCount": 36}
                ]
            }"#,
        )
    }

    async fn fetch_defects(
        &self,
        seq_id: i64,
        _surface: Option<Surface>,
    ) -> mosaic_viewer::Result<Vec<Defect>> {
        let list: DefectList = serde_json::from_value(serde_json::json!({
            "seq_no": seq_id,
            "defects": [
                {"defect_id": "101", "defect_type": "scratch", "severity": "high",
                 "x": 5000, "y": 300, "width": 400, "height": 80, "confidence": 1.0,
                 "surface": "top", "image_index": 3},
                {"defect_id": "102", "defect_type": "scale", "severity": "medium",
                 "x": 12000, "y": 700, "width": 120, "height": 120, "confidence": 1.0,
                 "surface": "bottom", "image_index": 10}
            ],
            "total_count": 2
        }))?;
        Ok(list.into_defects())
    }
}

#[async_trait]
impl TileFetcher for FakeBackend {
    async fn fetch(&self, key: &TileKey) -> mosaic_viewer::Result<Vec<u8>> {
        self.tile_fetches.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(format!("{key:?}").into_bytes())
    }
}

async fn settle(viewer: &mut MosaicViewer) {
    for _ in 0..200 {
        viewer.tick(Instant::now());
        if !viewer.is_busy() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn summarize(label: &str, ctx: &RenderContext) {
    let (mut images, mut placeholders, mut boxes, mut texts) = (0, 0, 0, 0);
    for command in ctx.get_drawing_queue() {
        match command {
            DrawCommand::Image { .. } => images += 1,
            DrawCommand::FillRect { .. } => placeholders += 1,
            DrawCommand::StrokeRect { .. } => boxes += 1,
            DrawCommand::Text { .. } => texts += 1,
            _ => {}
        }
    }
    println!("{label}: {images} image(s), {placeholders} fill(s), {boxes} outline(s), {texts} label(s)");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let backend = Arc::new(FakeBackend {
        tile_fetches: AtomicU64::new(0),
    });
    let mut config = ViewerProfile::Balanced.resolve();
    config.overlay.show_debug = true;

    let mut viewer = MosaicViewer::new(config, backend.clone());
    let events = viewer.subscribe();
    viewer.set_container_size(Size::new(1280.0, 720.0));
    viewer.load_record(backend.as_ref(), 20240611).await;

    let layout = viewer.layout();
    println!(
        "record {:?}: {} surface(s), world {}x{}, {} defect(s)",
        viewer.seq_id(),
        layout.surfaces.len(),
        layout.world_width,
        layout.world_height,
        viewer.overlay().len()
    );

    let mut ctx = RenderContext::new(1280, 720);
    settle(&mut viewer).await;
    viewer.frame(Instant::now(), &mut ctx);
    summarize("fit", &ctx);

    // zoom close to 1:1 around the screen centre
    viewer.zoom_around(Point::new(640.0, 360.0), 0.6);
    settle(&mut viewer).await;
    viewer.frame(Instant::now(), &mut ctx);
    summarize("zoomed", &ctx);

    if viewer.focus_defect("102") {
        settle(&mut viewer).await;
        viewer.frame(Instant::now(), &mut ctx);
        summarize("defect 102", &ctx);
    }

    let stats = viewer.cache_stats();
    println!(
        "fetches {}, cached {}, hit rate {:.0}%, level {}",
        backend.tile_fetches.load(Ordering::Relaxed),
        stats.size,
        stats.hit_rate() * 100.0,
        viewer.selection().level
    );
    println!("{} viewer event(s)", events.try_iter().count());
    Ok(())
}
