//! HTTP API handlers for soundraiser-preview

pub mod health;
pub mod preview;
pub mod sitemap;

pub use health::health_routes;
pub use preview::preview_routes;
pub use sitemap::sitemap_routes;
