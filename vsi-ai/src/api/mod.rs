//! HTTP API handlers for vsi-ai
//!
//! - `GET /health`
//! - `POST /api/analyze` (multipart photo batch → run result)

pub mod analyze;
pub mod health;

pub use analyze::analyze_routes;
pub use health::health_routes;
