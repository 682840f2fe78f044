//! Helio Core - renderer-agnostic scene data and the sky model.
//!
//! This crate provides:
//!
//! - **Scene data**: `Mesh`, `Scene`, `TrianglePositions`, `VertexAttributes` -
//!   the flat arrays a renderer consumes. Scene files are parsed elsewhere;
//!   the core only receives loader output.
//! - **Sky model**: `SkyParams`, `SkyState` - analytic sky dome radiance
//!   driven by solar elevation, turbidity and ground albedo.
//!
//! # Example
//!
//! ```
//! use helio_core::sky::{SkyParams, SkyState};
//!
//! let state = SkyState::new(&SkyParams::default()).unwrap();
//! let zenith = state.radiance(0.0, 0.0, helio_core::sky::Channel::R);
//! assert!(zenith.is_finite());
//! ```

pub mod mesh;
pub mod scene;
pub mod sky;
pub mod texture;

// Re-export commonly used types
pub use mesh::Mesh;
pub use scene::{Scene, TrianglePositions, VertexAttributes};
pub use texture::TextureDescriptor;
