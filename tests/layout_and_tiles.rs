use mosaic_viewer::prelude::*;

fn metas() -> Vec<SurfaceMeta> {
    vec![
        SurfaceMeta::new(Surface::Top, 16384, 1024, 100),
        SurfaceMeta::new(Surface::Bottom, 15000, 1024, 90),
    ]
}

#[test]
fn tiles_stay_inside_their_surface() {
    for orientation in [Orientation::Vertical, Orientation::Horizontal] {
        let layout = Layout::build(orientation, SurfaceFilter::All, &metas(), 256.0);
        let selector = TileSelector::new(1024, 2, 200.0);
        for scale in [0.004, 0.02, 0.3, 0.6, 1.0] {
            let transform = ViewportTransform::new(-300.0, -200.0, scale);
            let selection = selector.select(&transform, Size::new(1920.0, 1080.0), &layout);
            for tile in &selection.tiles {
                let bounds = layout.surface(tile.surface).unwrap().bounds();
                assert!(
                    bounds.contains_rect(&tile.rect(), 1e-6),
                    "{tile:?} escapes {bounds:?}"
                );
            }
        }
    }
}

#[test]
fn every_selected_tile_maps_and_round_trips() {
    for orientation in [Orientation::Vertical, Orientation::Horizontal] {
        let layout = Layout::build(orientation, SurfaceFilter::All, &metas(), 256.0);
        let selector = TileSelector::new(1024, 2, 0.0);
        let mapper = TileAddressMapper::new(1024);
        let world = layout.world_size();
        // whole world on screen at every level
        for level in 0..=2u8 {
            for tile in selector.tiles_in_rect(&layout, level, &Rect::new(0.0, 0.0, world.width, world.height)) {
                let address = mapper
                    .map_tile(&tile, &layout)
                    .unwrap_or_else(|| panic!("no address for {tile:?}"));
                assert_eq!(address.level, level);
                let rebuilt = mapper.tile_for_address(&address, &layout).unwrap();
                assert_eq!(rebuilt, tile);
            }
        }
    }
}

#[test]
fn second_surface_columns_start_at_zero() {
    let layout = Layout::build(Orientation::Vertical, SurfaceFilter::All, &metas(), 256.0);
    let bottom = *layout.surface(Surface::Bottom).unwrap();
    assert_eq!(bottom.ordinal, 1);
    assert_eq!(bottom.offset_x, 16384.0 + 256.0);

    let selector = TileSelector::new(1024, 2, 0.0);
    let mapper = TileAddressMapper::new(1024);
    let first_column: Vec<TileAddress> = selector
        .tiles_in_rect(&layout, 0, &bottom.bounds())
        .iter()
        .filter(|t| t.surface == Surface::Bottom && t.tile_x == 0)
        .filter_map(|t| mapper.map_tile(t, &layout))
        .collect();
    assert!(!first_column.is_empty());
    assert!(first_column.iter().all(|a| a.tile_x == 0));
}

#[test]
fn level_follows_scale() {
    assert_eq!(pyramid_level(1.0, 2), 0);
    assert_eq!(pyramid_level(0.6, 2), 0);
    assert_eq!(pyramid_level(0.5, 2), 1);
    assert_eq!(pyramid_level(0.3, 2), 1);
    assert_eq!(pyramid_level(0.25, 2), 2);
    assert_eq!(pyramid_level(0.001, 2), 2);
    assert_eq!(pyramid_level(2.0, 2), 0);
}

#[test]
fn defects_follow_layout_orientation() {
    let defect = Defect {
        id: "7".into(),
        surface: Surface::Bottom,
        image_index: 3,
        x: 10.0,
        y: 20.0,
        width: 30.0,
        height: 40.0,
        severity: Severity::Medium,
        defect_type: "scale".into(),
        confidence: 1.0,
    };
    let metas = [
        SurfaceMeta::new(Surface::Top, 4000, 2000, 5),
        SurfaceMeta::new(Surface::Bottom, 4000, 2000, 5),
    ];

    let vertical = Layout::build(Orientation::Vertical, SurfaceFilter::All, &metas, 256.0);
    let overlay = DefectOverlay::build(std::slice::from_ref(&defect), &vertical);
    assert_eq!(overlay.items()[0].rect, Rect::new(4256.0 + 10.0, 4020.0, 30.0, 40.0));

    let horizontal = Layout::build(Orientation::Horizontal, SurfaceFilter::All, &metas, 256.0);
    let overlay = DefectOverlay::build(std::slice::from_ref(&defect), &horizontal);
    assert_eq!(overlay.items()[0].rect, Rect::new(4020.0, 4256.0 + 10.0, 40.0, 30.0));

    let top_only = Layout::build(Orientation::Vertical, SurfaceFilter::Top, &metas, 256.0);
    assert!(DefectOverlay::build(&[defect], &top_only).is_empty());
}
