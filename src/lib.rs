pub mod audit;
pub mod config;
pub mod error;
pub mod launcher;
pub mod process;
pub mod readiness;
pub mod runtime;
pub mod setup;
