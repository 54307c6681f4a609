pub mod app;
pub mod artwork;
pub mod config;
pub mod logging;
pub mod player;
pub mod reconciler;
pub mod service;
pub mod utils;
