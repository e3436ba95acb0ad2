//! mudlark: a multi-agent text world
//!
//! The library side of the binary: configuration, the audit trail, the
//! console player and the built-in demo world.

pub mod audit;
pub mod config;
pub mod console;
pub mod demo;

pub use audit::AuditLog;
pub use config::MudlarkConfig;
