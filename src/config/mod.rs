//! Service Configuration Module
//!
//! ## Loading Order (highest wins)
//!
//! 1. CLI flags (each with an environment variable fallback, see `main.rs`)
//! 2. TOML file from `--config` / `STAGECAST_CONFIG`
//! 3. Built-in defaults (`defaults`)
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0:3001"
//! cors_origins = ["http://localhost:3000"]
//! call_timeout_secs = 120
//!
//! [services.primary]
//! endpoint = "https://image.mcp.atxp.ai"
//! tool_name = "image_create_image"
//!
//! [services.dependent]
//! endpoint = "https://filestore.mcp.atxp.ai"
//! ```

mod app_config;
pub mod defaults;

pub use app_config::*;
