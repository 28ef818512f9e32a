//! Backend data access: wire types and the HTTP client

pub mod api;
pub mod backend;

pub use api::{DefectList, MosaicMeta};
pub use backend::{HttpBackend, ViewerBackend};
