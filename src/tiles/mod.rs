pub mod address;
pub mod cache;
pub mod loader;
pub mod lod;
pub mod source;

// Re-exports for convenience
pub use address::{TileAddress, TileAddressMapper};
pub use cache::{TileCache, TileFormat, TileImage, TileKey};
pub use loader::{TileLoader, TilePriority, TileStatus};
pub use lod::{Tile, TileSelection, TileSelector};
pub use source::{ApiTileSource, TileFetcher, TileSource};
