//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Server
// ============================================================================

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3001";

/// Origins allowed to call the API cross-origin (dev frontend and the server itself).
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:3001"];

/// Largest accepted request body (bytes).
pub const MAX_BODY_BYTES: usize = 64 * 1024;

// ============================================================================
// Progress Channel
// ============================================================================

/// Interval between SSE keep-alive comments (seconds).
pub const DEFAULT_KEEPALIVE_SECS: u64 = 15;

/// Frames buffered per observer before new frames are dropped.
///
/// One request emits at most 8 stage events.
pub const DEFAULT_OBSERVER_BUFFER: usize = 64;

// ============================================================================
// Remote Tool Services
// ============================================================================

/// Network the account settles on.
pub const DEFAULT_NETWORK: &str = "base";

pub const DEFAULT_IMAGE_ENDPOINT: &str = "https://image.mcp.atxp.ai";
pub const DEFAULT_IMAGE_TOOL: &str = "image_create_image";

pub const DEFAULT_FILESTORE_ENDPOINT: &str = "https://filestore.mcp.atxp.ai";
pub const DEFAULT_FILESTORE_TOOL: &str = "filestore_write";

/// Stage reported when image generation fails as a dependent step.
pub const IMAGE_FALLBACK_STAGE: &str = "image-error";

/// Stage reported when file storage fails and the request falls back to the
/// primary artifact. Observers key on this exact name.
pub const FILESTORE_FALLBACK_STAGE: &str = "filestore-error";
