pub mod bridge;
pub mod config;
pub mod launcher;
pub mod lifecycle;
pub mod runner;
pub mod utils;
