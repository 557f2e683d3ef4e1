//! Rendering engine capability consumed by the `resonance` facade.
//!
//! - `types` holds the wire types shared with the C ABI (enums and the two
//!   fixed-layout property structs) plus the per-source parameter snapshot.
//! - `engine` defines the `RenderingEngine` trait the facade drives.
//! - `renderer` is a small pure-Rust implementation of that trait.

pub mod engine;
pub mod error;
pub mod renderer;
pub mod room;
pub mod spatializer;
pub mod types;

pub use engine::{AudioBlock, EngineSourceId, RenderingEngine};
pub use error::EngineError;
pub use renderer::Renderer;
pub use types::*;
