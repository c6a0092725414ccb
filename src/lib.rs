pub mod body;
pub mod config;
pub mod error;
pub mod flip_words;
pub mod grid;
pub mod loader;
pub mod renderer;
pub mod simulation;
pub mod text;
pub mod trail;
pub mod vectors;
pub mod widget;

#[cfg(not(target_arch = "wasm32"))]
pub mod app;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::FloatingLogosConfig;
pub use widget::{FloatingLogos, Host};
