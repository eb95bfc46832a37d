// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod bank;
pub mod config;
pub mod error;
pub mod exam;
pub mod runtime;
pub mod session;
pub mod store;
pub mod timer;
pub mod typing;
pub mod util;
pub mod words;

/// Event loop tick interval shared by the runner and every countdown.
pub const TICK_RATE_MS: u64 = 100;
