use crate::core::config::ApiConfig;
use crate::data::api::{DefectList, MosaicMeta};
use crate::layout::Surface;
use crate::overlay::Defect;
use crate::prelude::Duration;
use crate::tiles::cache::TileKey;
use crate::tiles::source::{ApiTileSource, TileFetcher, TileSource};
use crate::{MosaicError, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;

/// Shared async HTTP client for every backend request
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(concat!("mosaic-viewer/", env!("CARGO_PKG_VERSION")))
        .tcp_keepalive(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(16)
        .build()
        .expect("failed to build reqwest async client")
});

/// Record-level queries the viewer needs besides tiles
#[async_trait]
pub trait ViewerBackend: Send + Sync {
    async fn fetch_metadata(&self, seq_id: i64) -> Result<MosaicMeta>;

    /// Defects of a record, optionally restricted to one surface
    async fn fetch_defects(&self, seq_id: i64, surface: Option<Surface>) -> Result<Vec<Defect>>;
}

/// reqwest client for the inspection backend's HTTP API
#[derive(Debug, Clone)]
pub struct HttpBackend {
    source: ApiTileSource,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            source: ApiTileSource::with_view(config.base_url.clone(), config.view.clone()),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    pub fn base_url(&self) -> &str {
        self.source.base_url()
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        log::debug!("GET {url}");
        let response = HTTP_CLIENT.get(url).timeout(self.timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MosaicError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ViewerBackend for HttpBackend {
    async fn fetch_metadata(&self, seq_id: i64) -> Result<MosaicMeta> {
        let url = format!("{}/api/ui/meta?seq_no={seq_id}", self.base_url());
        let value: serde_json::Value = self.get(&url).await?.json().await?;
        let meta = MosaicMeta::from_value(value)?;
        if meta.per_surface.is_empty() {
            log::warn!("metadata for record {seq_id} carries no per-surface frame info");
        }
        Ok(meta)
    }

    async fn fetch_defects(&self, seq_id: i64, surface: Option<Surface>) -> Result<Vec<Defect>> {
        let mut url = format!("{}/api/ui/defects/{seq_id}", self.base_url());
        if let Some(surface) = surface {
            url.push_str(&format!("?surface={surface}"));
        }
        let body = self.get(&url).await?.bytes().await?;
        let list: DefectList = serde_json::from_slice(&body)?;
        Ok(list.into_defects())
    }
}

#[async_trait]
impl TileFetcher for HttpBackend {
    async fn fetch(&self, key: &TileKey) -> Result<Vec<u8>> {
        let url = self.source.url(key);
        let bytes = self.get(&url).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

impl TileSource for HttpBackend {
    fn url(&self, key: &TileKey) -> String {
        self.source.url(key)
    }
}
