//! Stage identifiers reported to observers

pub const INITIALIZING: &str = "initializing";
pub const CREATING_CLIENTS: &str = "creating-clients";
pub const CALLING_PRIMARY_TOOL: &str = "calling-primary-tool";
pub const CALLING_DEPENDENT_TOOL: &str = "calling-dependent-tool";
/// Stage of the `final` event, on both the full and the degraded path
pub const COMPLETED: &str = "completed";
