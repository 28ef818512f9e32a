//! Host-facing viewer context
//!
//! [`MosaicViewer`] owns every piece of viewer state (selected record, layout,
//! transform, planned tiles, defects) and is driven by the host: input events
//! in, [`tick`](MosaicViewer::tick) once per animation frame, and
//! [`frame`](MosaicViewer::frame) to record draw commands.

use crate::core::{
    bounds::Rect,
    config::ViewerConfig,
    geo::{Point, Size},
    viewport::{ViewportController, ViewportTransform},
};
use crate::data::{api::MosaicMeta, backend::ViewerBackend};
use crate::input::{
    events::InputEvent,
    gestures::{GestureAction, GestureConfig, GestureRecognizer},
};
use crate::layout::{Layout, Orientation, SurfaceFilter};
use crate::overlay::{Defect, DefectOverlay};
use crate::prelude::{Arc, Duration, HashSet, Instant};
use crate::rendering::{
    context::RenderContext,
    render_loop::RenderLoop,
    renderer::{compose_frame, FrameSnapshot, TileContent, TileDraw},
};
use crate::tiles::{
    address::{TileAddress, TileAddressMapper},
    cache::TileKey,
    loader::{TileLoader, TilePriority, TileStatus},
    lod::{Tile, TileSelection, TileSelector},
    source::TileFetcher,
};
use crate::traits::{CacheStats, Configurable, GeometryOps};
use crate::{MosaicError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Notifications for the host
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// A tap hit a defect box
    DefectTapped(String),
    ViewChanged(ViewportTransform),
    /// Record, orientation or surface filter changed
    LayoutChanged,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Rebuild {
    Clean,
    Now,
    /// Debounced since the last view change
    After(Instant),
}

#[derive(Debug, Clone)]
struct PlannedTile {
    tile: Tile,
    address: Option<TileAddress>,
    key: Option<TileKey>,
    parent: Option<(Tile, TileKey)>,
    /// Not requested because it is too small on screen
    suppressed: bool,
}

pub struct MosaicViewer {
    config: ViewerConfig,
    seq_id: Option<i64>,
    meta: MosaicMeta,
    orientation: Orientation,
    filter: SurfaceFilter,
    layout: Layout,
    viewport: ViewportController,
    selector: TileSelector,
    mapper: TileAddressMapper,
    selection: TileSelection,
    planned: Vec<PlannedTile>,
    draws: Vec<TileDraw>,
    rebuild: Rebuild,
    loader: TileLoader,
    defects: Vec<Defect>,
    overlay: DefectOverlay,
    selected_defect: Option<String>,
    gestures: GestureRecognizer,
    render_loop: RenderLoop,
    subscribers: Vec<Sender<ViewerEvent>>,
}

impl MosaicViewer {
    pub fn new(config: ViewerConfig, fetcher: Arc<dyn TileFetcher>) -> Self {
        let meta = MosaicMeta::default();
        Self {
            seq_id: None,
            orientation: config.layout.orientation,
            filter: config.layout.surface_filter,
            layout: Layout::empty(config.layout.orientation),
            viewport: ViewportController::new(),
            selector: TileSelector::new(
                meta.default_tile_size,
                meta.max_level,
                config.tile_loading.prefetch_margin,
            ),
            mapper: TileAddressMapper::new(meta.default_tile_size),
            selection: TileSelection::default(),
            planned: Vec::new(),
            draws: Vec::new(),
            rebuild: Rebuild::Clean,
            loader: TileLoader::new(config.tile_loading.clone(), fetcher),
            defects: Vec::new(),
            overlay: DefectOverlay::default(),
            selected_defect: None,
            gestures: GestureRecognizer::with_config(GestureConfig::from(&config.interaction)),
            render_loop: RenderLoop::new(&config.frame_timing),
            subscribers: Vec::new(),
            meta,
            config,
        }
    }

    /// Receive [`ViewerEvent`]s; dropped receivers are forgotten
    pub fn subscribe(&mut self) -> Receiver<ViewerEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: ViewerEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    // ---- record, layout, defects ------------------------------------------

    /// Switch to another record. Without metadata the layout is empty and the
    /// viewer stays responsive.
    pub fn set_selected_record(&mut self, seq_id: i64, meta: Option<MosaicMeta>) {
        let meta = match meta {
            Some(meta) => meta,
            None => {
                log::warn!("no metadata for record {seq_id}, showing an empty layout");
                MosaicMeta::default()
            }
        };
        log::info!(
            "record {seq_id}: tile size {}, max level {}, {} surface(s)",
            meta.default_tile_size,
            meta.max_level,
            meta.per_surface.len()
        );

        self.seq_id = Some(seq_id);
        self.selector = TileSelector::new(
            meta.default_tile_size,
            meta.max_level,
            self.config.tile_loading.prefetch_margin,
        );
        self.mapper = TileAddressMapper::new(meta.default_tile_size);
        self.meta = meta;
        self.defects.clear();
        self.selected_defect = None;
        self.loader.reset();
        self.rebuild_layout();
    }

    /// Fetch metadata and defects of a record and show it.
    ///
    /// Failures are logged: missing metadata gives an empty layout, missing
    /// defects an empty overlay.
    pub async fn load_record(&mut self, backend: &dyn ViewerBackend, seq_id: i64) {
        let meta = match backend.fetch_metadata(seq_id).await {
            Ok(meta) => Some(meta),
            Err(e) => {
                log::warn!("metadata for record {seq_id} unavailable: {e}");
                None
            }
        };
        self.set_selected_record(seq_id, meta);

        match backend.fetch_defects(seq_id, None).await {
            Ok(defects) => self.set_defects(defects),
            Err(e) => log::warn!("defects for record {seq_id} unavailable: {e}"),
        }
    }

    pub fn set_surface_filter(&mut self, filter: SurfaceFilter) {
        if self.filter != filter {
            self.filter = filter;
            self.rebuild_layout();
        }
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        if self.orientation != orientation {
            self.orientation = orientation;
            self.rebuild_layout();
        }
    }

    fn rebuild_layout(&mut self) {
        self.layout = Layout::build(
            self.orientation,
            self.filter,
            &self.meta.per_surface,
            self.config.layout.surface_gap,
        );
        log::debug!(
            "layout {} {:?}: {} surface(s), world {}x{}",
            self.orientation,
            self.filter,
            self.layout.surfaces.len(),
            self.layout.world_width,
            self.layout.world_height
        );
        self.viewport.set_mosaic_size(self.layout.world_size());
        self.viewport.fit();
        self.overlay = DefectOverlay::build(&self.defects, &self.layout);
        self.planned.clear();
        self.draws.clear();
        self.rebuild = Rebuild::Now;
        self.render_loop.invalidate();
        self.emit(ViewerEvent::LayoutChanged);
    }

    pub fn set_defects(&mut self, defects: Vec<Defect>) {
        self.defects = defects;
        self.overlay = DefectOverlay::build(&self.defects, &self.layout);
        if let Some(id) = &self.selected_defect {
            if self.overlay.get(id).is_none() {
                self.selected_defect = None;
            }
        }
        self.render_loop.invalidate();
    }

    pub fn set_selected_defect(&mut self, id: Option<String>) {
        if self.selected_defect != id {
            self.selected_defect = id;
            self.render_loop.invalidate();
        }
    }

    /// Select a defect and centre it at the current scale; false if unknown
    pub fn focus_defect(&mut self, id: &str) -> bool {
        let Some(center) = self.overlay.get(id).map(|d| d.rect.center()) else {
            return false;
        };
        self.set_selected_defect(Some(id.to_string()));
        let t = self.viewport.transform();
        let container = self.viewport.container_size();
        self.viewport.set_transform(ViewportTransform::new(
            container.width / 2.0 - center.x * t.scale,
            container.height / 2.0 - center.y * t.scale,
            t.scale,
        ));
        self.view_changed(Instant::now());
        true
    }

    // ---- viewport ---------------------------------------------------------

    pub fn set_container_size(&mut self, size: Size) {
        if self.viewport.container_size() == size {
            return;
        }
        let first = self.viewport.container_size().is_degenerate();
        self.viewport.set_container_size(size);
        if first {
            self.viewport.fit();
        }
        self.rebuild = Rebuild::Now;
        self.render_loop.invalidate();
    }

    /// Feed one pointer, wheel or resize event
    pub fn handle_input(&mut self, event: InputEvent, now: Instant) {
        if let InputEvent::Resize { size } = event {
            self.set_container_size(size);
            return;
        }
        for action in self.gestures.process(event, now) {
            match action {
                GestureAction::Pan { dx, dy } => {
                    self.viewport.pan(dx, dy);
                    self.view_changed(now);
                }
                GestureAction::ZoomAround { anchor, factor } => {
                    self.viewport.zoom_by(anchor, factor);
                    self.view_changed(now);
                }
                GestureAction::Tap { position } => self.tap(position),
            }
        }
    }

    fn tap(&mut self, position: Point) {
        let t = self.viewport.transform();
        let world = t.screen_to_world(position);
        let tolerance = self.config.interaction.drag_threshold / t.scale;
        let Some(id) = self.overlay.hit_test(world, tolerance).map(|d| d.id.clone()) else {
            return;
        };
        log::debug!("defect {id} tapped");
        self.set_selected_defect(Some(id.clone()));
        self.emit(ViewerEvent::DefectTapped(id));
    }

    fn view_changed(&mut self, now: Instant) {
        // an immediate rebuild stays immediate
        if self.rebuild != Rebuild::Now {
            self.rebuild = Rebuild::After(now);
        }
        self.render_loop.invalidate();
        let transform = self.viewport.transform();
        self.emit(ViewerEvent::ViewChanged(transform));
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.viewport.pan(dx, dy);
        self.view_changed(Instant::now());
    }

    pub fn zoom_around(&mut self, anchor: Point, scale: f64) {
        self.viewport.zoom_around(anchor, scale);
        self.view_changed(Instant::now());
    }

    pub fn zoom_by(&mut self, anchor: Point, factor: f64) {
        self.viewport.zoom_by(anchor, factor);
        self.view_changed(Instant::now());
    }

    pub fn center(&mut self) {
        self.viewport.center();
        self.view_changed(Instant::now());
    }

    pub fn fit(&mut self) {
        self.viewport.fit();
        self.view_changed(Instant::now());
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset_view();
        self.view_changed(Instant::now());
    }

    // ---- per-frame work ---------------------------------------------------

    /// Advance loading: apply finished fetches, run a due tile rebuild, retry
    /// and start fetches. Returns true when the next frame will differ.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = self.loader.poll_results(now) > 0;

        let debounce = Duration::from_millis(self.config.interaction.debounce_ms);
        let due = match self.rebuild {
            Rebuild::Clean => false,
            Rebuild::Now => true,
            Rebuild::After(since) => now.saturating_duration_since(since) >= debounce,
        };
        if due {
            self.rebuild = Rebuild::Clean;
            self.plan_tiles(now);
            changed = true;
        } else if changed {
            self.resolve_draws();
        }

        self.loader.retry_due(now);
        self.loader.dispatch();

        if changed {
            self.render_loop.invalidate();
        }
        changed
    }

    /// Select tiles for the current view and request what is missing
    fn plan_tiles(&mut self, now: Instant) {
        let transform = self.viewport.transform();
        let container = self.viewport.container_size();
        self.selection = self.selector.select(&transform, container, &self.layout);

        let tiling = &self.config.tile_loading;
        let format = tiling.format;
        let tile_size = self.meta.default_tile_size;
        let seq_id = self.seq_id;
        let orientation = self.layout.orientation;
        let screen_tile = self.selection.virtual_size * transform.scale;
        let suppress = tiling
            .min_request_tile_pixels
            .is_some_and(|min_px| screen_tile < min_px);

        let mut wanted: HashSet<TileKey> = HashSet::default();
        let mut planned = Vec::with_capacity(self.selection.tiles.len());

        for tile in &self.selection.tiles {
            let address = self.mapper.map_tile(tile, &self.layout);
            let key = match (address, seq_id) {
                (Some(address), Some(seq)) => Some(TileKey::from_address(
                    address,
                    seq,
                    orientation,
                    format,
                    tile_size,
                )),
                _ => None,
            };

            if let Some(key) = key {
                if !suppress {
                    let priority = if self.selection.is_visible(tile) {
                        TilePriority::Visible
                    } else {
                        TilePriority::Prefetch
                    };
                    self.loader.request(key, priority, now);
                    wanted.insert(key);
                }
            }

            let parent = match (tiling.show_parent_tiles, seq_id) {
                (true, Some(seq)) => self.layout.surface(tile.surface).and_then(|surface| {
                    let parent = tile.parent(surface)?;
                    if parent.level > self.selector.max_level {
                        return None;
                    }
                    let address = self.mapper.map_tile(&parent, &self.layout)?;
                    Some((
                        parent,
                        TileKey::from_address(address, seq, orientation, format, tile_size),
                    ))
                }),
                _ => None,
            };

            planned.push(PlannedTile {
                tile: *tile,
                address,
                key,
                parent,
                suppressed: suppress,
            });
        }

        let coarser = self.selection.level + 1;
        if tiling.prefetch_coarser_level && coarser <= self.selector.max_level {
            if let Some(seq) = seq_id {
                let rect = self.selection.visible_rect;
                for tile in self.selector.tiles_in_rect(&self.layout, coarser, &rect) {
                    let Some(address) = self.mapper.map_tile(&tile, &self.layout) else {
                        continue;
                    };
                    let key = TileKey::from_address(address, seq, orientation, format, tile_size);
                    self.loader.request(key, TilePriority::Background, now);
                    wanted.insert(key);
                }
            }
        }

        self.loader.prune(&wanted);
        log::debug!(
            "planned {} tile(s) at level {} ({} queued, {} in flight)",
            planned.len(),
            self.selection.level,
            self.loader.pending_count(),
            self.loader.in_flight_count()
        );
        self.planned = planned;
        self.resolve_draws();
    }

    /// Refresh what each planned tile shows from the loader's current state
    fn resolve_draws(&mut self) {
        let loader = &self.loader;
        self.draws = self
            .planned
            .iter()
            .map(|plan| {
                let status = match plan.key {
                    Some(key) => loader.status(&key),
                    None => TileStatus::Failed,
                };
                let content = match status {
                    TileStatus::Ready(image) => TileContent::Image(image),
                    other => {
                        let parent = plan.parent.and_then(|(parent, key)| {
                            loader.status(&key).image().cloned().map(|image| (parent, image))
                        });
                        match parent {
                            Some((parent, image)) => TileContent::Parent { image, parent },
                            None => TileContent::Placeholder {
                                status: if plan.key.is_none() {
                                    "n/a"
                                } else if plan.suppressed {
                                    "skipped"
                                } else {
                                    other.label()
                                },
                            },
                        }
                    }
                };
                TileDraw {
                    tile: plan.tile,
                    address: plan.address,
                    content,
                }
            })
            .collect();
    }

    /// Everything the next frame draws
    pub fn frame_snapshot(&self) -> FrameSnapshot<'_> {
        FrameSnapshot {
            transform: self.viewport.transform(),
            container: self.viewport.container_size(),
            orientation: self.layout.orientation,
            surfaces: &self.layout.surfaces,
            tiles: &self.draws,
            defects: self.overlay.items(),
            selected: self.selected_defect.as_deref(),
            style: &self.config.overlay,
            level: self.selection.level,
            stats: self.loader.stats(),
        }
    }

    /// Record the frame if the render loop says one is due
    pub fn frame(&mut self, now: Instant, ctx: &mut RenderContext) -> bool {
        if !self.render_loop.should_render(now) {
            return false;
        }
        self.compose(ctx);
        self.render_loop.mark_rendered(now);
        true
    }

    /// Record the frame unconditionally
    pub fn compose(&self, ctx: &mut RenderContext) {
        compose_frame(&self.frame_snapshot(), ctx);
    }

    /// Work is outstanding and the host should keep ticking
    pub fn is_busy(&self) -> bool {
        self.rebuild != Rebuild::Clean || !self.loader.is_idle()
    }

    // ---- accessors --------------------------------------------------------

    pub fn seq_id(&self) -> Option<i64> {
        self.seq_id
    }

    pub fn meta(&self) -> &MosaicMeta {
        &self.meta
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn surface_filter(&self) -> SurfaceFilter {
        self.filter
    }

    pub fn transform(&self) -> ViewportTransform {
        self.viewport.transform()
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn selection(&self) -> &TileSelection {
        &self.selection
    }

    pub fn tile_draws(&self) -> &[TileDraw] {
        &self.draws
    }

    pub fn defects(&self) -> &[Defect] {
        &self.defects
    }

    pub fn overlay(&self) -> &DefectOverlay {
        &self.overlay
    }

    pub fn selected_defect(&self) -> Option<&str> {
        self.selected_defect.as_deref()
    }

    pub fn loader(&self) -> &TileLoader {
        &self.loader
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.loader.stats()
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    /// World rect currently inside the container
    pub fn visible_world_rect(&self) -> Rect {
        self.viewport
            .transform()
            .visible_world_rect(self.viewport.container_size(), 0.0)
    }
}

impl Configurable for MosaicViewer {
    type Config = ViewerConfig;

    fn config(&self) -> &ViewerConfig {
        &self.config
    }

    fn set_config(&mut self, config: ViewerConfig) -> Result<()> {
        Self::validate_config(&config)?;
        // The fetcher and its cache are bound to the backend for the loader's life
        if config.api != self.config.api {
            return Err(MosaicError::Config(
                "api settings are fixed for a viewer; build a new one to change them".into(),
            ));
        }
        self.loader.set_config(config.tile_loading.clone())?;
        self.gestures
            .set_config(GestureConfig::from(&config.interaction));
        self.render_loop.set_config(&config.frame_timing);
        self.selector = TileSelector::new(
            self.meta.default_tile_size,
            self.meta.max_level,
            config.tile_loading.prefetch_margin,
        );

        let layout_changed = config.layout != self.config.layout;
        self.orientation = config.layout.orientation;
        self.filter = config.layout.surface_filter;
        self.config = config;
        if layout_changed {
            self.rebuild_layout();
        } else {
            self.rebuild = Rebuild::Now;
            self.render_loop.invalidate();
        }
        Ok(())
    }

    fn validate_config(config: &ViewerConfig) -> Result<()> {
        config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TileLoadingConfig;
    use crate::layout::{Surface, SurfaceMeta};
    use crate::overlay::Severity;
    use async_trait::async_trait;

    struct EmptyFetcher;

    #[async_trait]
    impl TileFetcher for EmptyFetcher {
        async fn fetch(&self, _key: &TileKey) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn viewer() -> MosaicViewer {
        let config = ViewerConfig {
            tile_loading: TileLoadingConfig::for_testing(),
            ..ViewerConfig::default()
        };
        MosaicViewer::new(config, Arc::new(EmptyFetcher))
    }

    fn meta() -> MosaicMeta {
        MosaicMeta::new(
            1024,
            2,
            vec![
                SurfaceMeta::new(Surface::Top, 16384, 1024, 100),
                SurfaceMeta::new(Surface::Bottom, 16384, 1024, 80),
            ],
        )
    }

    #[test]
    fn test_record_without_metadata_is_empty_and_responsive() {
        let mut v = viewer();
        let events = v.subscribe();
        v.set_container_size(Size::new(800.0, 600.0));
        v.set_selected_record(42, None);
        assert!(v.layout().is_empty());
        assert_eq!(events.try_recv().unwrap(), ViewerEvent::LayoutChanged);

        v.pan(10.0, 10.0);
        v.tick(Instant::now() + Duration::from_secs(1));
        assert!(v.tile_draws().is_empty());
        let mut ctx = RenderContext::new(800, 600);
        assert!(v.frame(Instant::now() + Duration::from_secs(2), &mut ctx));
    }

    #[test]
    fn test_record_fits_and_plans_tiles() {
        let mut v = viewer();
        v.set_container_size(Size::new(800.0, 600.0));
        v.set_selected_record(1, Some(meta()));
        let (min, _) = v.viewport().scale_bounds();
        assert_eq!(v.transform().scale, min);

        // no runtime here: fetches cannot start, requests stay queued
        v.tick(Instant::now());
        assert_eq!(v.selection().level, 2);
        assert!(!v.tile_draws().is_empty());
        assert!(v
            .tile_draws()
            .iter()
            .all(|d| matches!(d.content, TileContent::Placeholder { .. })));
        assert!(v.is_busy());
    }

    #[test]
    fn test_filter_and_orientation_relayout() {
        let mut v = viewer();
        v.set_container_size(Size::new(800.0, 600.0));
        v.set_selected_record(1, Some(meta()));
        assert_eq!(v.layout().surfaces.len(), 2);

        v.set_surface_filter(SurfaceFilter::Bottom);
        assert_eq!(v.layout().surfaces.len(), 1);
        assert_eq!(v.layout().surfaces[0].surface, Surface::Bottom);

        v.set_orientation(Orientation::Horizontal);
        assert_eq!(v.layout().world_width, 80.0 * 1024.0);
        assert_eq!(v.layout().world_height, 16384.0);
    }

    #[test]
    fn test_tap_selects_defect() {
        let mut v = viewer();
        let events = v.subscribe();
        v.set_container_size(Size::new(1000.0, 1000.0));
        v.set_selected_record(
            1,
            Some(MosaicMeta::new(1024, 2, vec![SurfaceMeta::new(Surface::Top, 1000, 1000, 1)])),
        );
        v.set_defects(vec![Defect {
            id: "d7".into(),
            surface: Surface::Top,
            image_index: 1,
            x: 100.0,
            y: 100.0,
            width: 50.0,
            height: 50.0,
            severity: Severity::High,
            defect_type: "scratch".into(),
            confidence: 1.0,
        }]);
        assert_eq!(v.transform().scale, 1.0);
        while events.try_recv().is_ok() {}

        let t = Instant::now();
        let at = Point::new(120.0 + v.transform().x, 120.0 + v.transform().y);
        v.handle_input(InputEvent::PointerDown { id: 0, position: at }, t);
        v.handle_input(InputEvent::PointerUp { id: 0, position: at }, t + Duration::from_millis(50));

        assert_eq!(v.selected_defect(), Some("d7"));
        assert_eq!(events.try_recv().unwrap(), ViewerEvent::DefectTapped("d7".into()));
    }

    #[test]
    fn test_debounced_rebuild() {
        let mut v = viewer();
        v.set_container_size(Size::new(800.0, 600.0));
        v.set_selected_record(1, Some(meta()));
        let t0 = Instant::now();
        v.tick(t0);
        let first = v.selection().visible_rect;

        v.handle_input(InputEvent::Wheel { delta_y: -500.0, position: Point::new(400.0, 300.0) }, t0);
        // within the debounce window nothing is re-planned
        v.tick(t0 + Duration::from_millis(5));
        assert_eq!(v.selection().visible_rect, first);

        v.tick(t0 + Duration::from_millis(500));
        assert_ne!(v.selection().visible_rect, first);
    }

    #[test]
    fn test_set_config_rejects_invalid() {
        let mut v = viewer();
        let mut bad = v.config().clone();
        bad.tile_loading.max_concurrent = 0;
        assert!(v.set_config(bad).is_err());
        v.update_config(|c| c.layout.surface_gap = 0.0).unwrap();
        assert_eq!(v.config().layout.surface_gap, 0.0);
    }

    #[test]
    fn test_set_config_rejects_backend_view_change() {
        let mut v = viewer();
        let mut other = v.config().clone();
        other.api.view = "3D".into();
        assert!(matches!(v.set_config(other), Err(MosaicError::Config(_))));
        assert_ne!(v.config().api.view, "3D");
    }
}
