//! Helio Renderer - the CPU core of a progressive path tracer.
//!
//! Owns everything the per-frame render loop needs on the host side:
//!
//! - **Spatial index**: flat-arena triangle BVH, built once per scene
//!   (`Bvh::build`), queried per pixel (`Bvh::intersect`).
//! - **Camera**: immutable look-at snapshot generating primary rays with
//!   optional lens defocus.
//! - **Accumulation**: the convergence state machine deciding when the
//!   progressive estimate must restart (`SampleAccumulator`).
//! - **Upload layouts**: Pod mirrors of index, camera, sky state and frame
//!   data for the external compute backend.
//! - **Preview**: a headless primary-ray renderer for diagnostics.
//!
//! Scene data and the sky model live in `helio_core`; windowing, UI and GPU
//! dispatch are the host application's problem.

mod accumulation;
mod bvh;
mod camera;
mod intersect;
mod layout;
mod preview;
mod triangle;

pub use accumulation::{FrameState, RenderParameters, SampleAccumulator, SamplingParams};
pub use bvh::{reorder_attributes, Bvh, BvhNode};
pub use camera::{pick, sample_in_unit_disk, Camera};
pub use intersect::{BvhStats, Intersection};
pub use layout::{GpuAabb, GpuBvhNode, GpuCamera, GpuFrameData, GpuSkyState, GpuTriangle};
pub use preview::{expose, render, ImageBuffer, PreviewConfig};
pub use triangle::{Triangle, TriangleHit};

/// Re-export common math types from helio_math
pub use helio_math::{Aabb, Interval, Ray, Vec3};
