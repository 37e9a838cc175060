//! HTTP API handlers for callboard-ps

pub mod auth;
pub mod buildinfo;
pub mod entities;
pub mod fields;
pub mod health;
pub mod options;
pub mod schema;
pub mod values;

pub use auth::auth_middleware;
pub use buildinfo::get_build_info;
pub use health::health_routes;
