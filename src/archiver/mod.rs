pub mod config;
pub mod job;
pub mod pdf;
pub mod watcher;
