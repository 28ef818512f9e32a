use crate::core::constants::DEFAULT_VIEW;
use crate::tiles::cache::TileKey;
use crate::Result;
use async_trait::async_trait;

/// Trait representing anything that can produce tile URLs for a given key.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `key`.
    fn url(&self, key: &TileKey) -> String;
}

/// Fetches the encoded bytes of one tile
#[async_trait]
pub trait TileFetcher: Send + Sync {
    async fn fetch(&self, key: &TileKey) -> Result<Vec<u8>>;
}

/// The inspection backend's `/api/images/tile` route
///
/// `view` is fixed at construction; a different view needs a new source and
/// with it a new loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiTileSource {
    base_url: String,
    view: String,
}

impl ApiTileSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_view(base_url, DEFAULT_VIEW)
    }

    pub fn with_view(base_url: impl Into<String>, view: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            view: view.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn view(&self) -> &str {
        &self.view
    }
}

impl TileSource for ApiTileSource {
    fn url(&self, key: &TileKey) -> String {
        format!(
            "{}/api/images/tile?surface={}&seq_no={}&view={}&level={}&tile_x={}&tile_y={}&tile_size={}&orientation={}&fmt={}",
            self.base_url,
            key.surface,
            key.seq_id,
            self.view,
            key.level,
            key.tile_x,
            key.tile_y,
            key.tile_size,
            key.orientation,
            key.format.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Orientation, Surface};
    use crate::tiles::cache::TileFormat;

    #[test]
    fn test_api_tile_url() {
        let source = ApiTileSource::new("http://inspect.local:8000/");
        let key = TileKey {
            surface: Surface::Bottom,
            seq_id: 1234,
            level: 2,
            tile_x: 3,
            tile_y: 7,
            orientation: Orientation::Horizontal,
            format: TileFormat::Jpeg,
            tile_size: 1024,
        };
        assert_eq!(
            source.url(&key),
            "http://inspect.local:8000/api/images/tile?surface=bottom&seq_no=1234&view=2D&level=2&tile_x=3&tile_y=7&tile_size=1024&orientation=horizontal&fmt=JPEG"
        );

        // same key, other view: the view comes from the source, not the key
        let other = ApiTileSource::with_view("http://inspect.local:8000", "3D");
        assert_eq!(other.view(), "3D");
        assert_ne!(other.url(&key), source.url(&key));
        assert!(other.url(&key).contains("&view=3D&"));
    }
}
