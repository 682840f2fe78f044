//! GPU upload layouts.
//!
//! `#[repr(C)]` Pod mirrors of the core state, padded to the 16-byte vector
//! alignment a parallel compute backend expects. The core never owns a
//! device; it hands these buffers to whoever does.

use bytemuck::{Pod, Zeroable};
use helio_core::sky::SkyState;
use helio_math::Vec3;

use crate::accumulation::{FrameState, RenderParameters};
use crate::bvh::{Bvh, BvhNode};
use crate::camera::Camera;
use crate::triangle::Triangle;

/// 32-byte bounding box, vec3 lanes padded to 16 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuAabb {
    pub min: [f32; 3],
    pub pad0: f32,
    pub max: [f32; 3],
    pub pad1: f32,
}

/// 48-byte BVH node matching [`BvhNode`] field for field.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuBvhNode {
    pub aabb: GpuAabb,
    pub triangles_offset: u32,
    pub second_child_offset: u32,
    pub triangle_count: u32,
    pub split_axis: u32,
}

/// 48-byte compact triangle: vertex plus two edges.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuTriangle {
    pub v0: [f32; 3],
    pub pad0: f32,
    pub e1: [f32; 3],
    pub pad1: f32,
    pub e2: [f32; 3],
    pub pad2: f32,
}

/// 160-byte sky state: 27 shape coefficients, sky and solar radiance per
/// channel, and the sun direction the angles were derived from.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuSkyState {
    pub params: [f32; 27],
    pub sky_radiance: [f32; 3],
    pub solar_radiance: [f32; 3],
    pub pad0: [f32; 3],
    pub sun_direction: [f32; 3],
    pub pad1: f32,
}

/// 96-byte camera: basis vectors in padded vec3 lanes, lens radius in the
/// origin's pad lane.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuCamera {
    pub origin: [f32; 3],
    pub lens_radius: f32,
    pub lower_left_corner: [f32; 3],
    pub pad0: f32,
    pub horizontal: [f32; 3],
    pub pad1: f32,
    pub vertical: [f32; 3],
    pub pad2: f32,
    pub u: [f32; 3],
    pub pad3: f32,
    pub v: [f32; 3],
    pub pad4: f32,
}

/// 32-byte per-frame data: framebuffer extent, counters and sampling
/// parameters the integrator reads every dispatch.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuFrameData {
    pub framebuffer_size: [u32; 2],
    pub frame_number: u32,
    pub accumulated_samples: u32,
    pub samples_per_pixel: u32,
    pub num_bounces: u32,
    pub exposure: f32,
    pub pad0: u32,
}

impl From<&BvhNode> for GpuBvhNode {
    fn from(node: &BvhNode) -> Self {
        Self {
            aabb: GpuAabb {
                min: node.aabb.min.to_array(),
                pad0: 0.0,
                max: node.aabb.max.to_array(),
                pad1: 0.0,
            },
            triangles_offset: node.triangles_offset,
            second_child_offset: node.second_child_offset,
            triangle_count: node.triangle_count,
            split_axis: node.split_axis,
        }
    }
}

impl From<&Triangle> for GpuTriangle {
    fn from(triangle: &Triangle) -> Self {
        Self {
            v0: triangle.v0().to_array(),
            pad0: 0.0,
            e1: triangle.edge1().to_array(),
            pad1: 0.0,
            e2: triangle.edge2().to_array(),
            pad2: 0.0,
        }
    }
}

impl GpuSkyState {
    pub fn new(state: &SkyState, sun_direction: Vec3) -> Self {
        Self {
            params: state.params,
            sky_radiance: state.sky_radiance,
            solar_radiance: state.solar_radiance,
            pad0: [0.0; 3],
            sun_direction: sun_direction.to_array(),
            pad1: 0.0,
        }
    }
}

impl From<&Camera> for GpuCamera {
    fn from(camera: &Camera) -> Self {
        Self {
            origin: camera.origin.to_array(),
            lens_radius: camera.lens_radius,
            lower_left_corner: camera.lower_left_corner.to_array(),
            pad0: 0.0,
            horizontal: camera.horizontal.to_array(),
            pad1: 0.0,
            vertical: camera.vertical.to_array(),
            pad2: 0.0,
            u: camera.u.to_array(),
            pad3: 0.0,
            v: camera.v.to_array(),
            pad4: 0.0,
        }
    }
}

impl GpuFrameData {
    pub fn new(params: &RenderParameters, frame: FrameState) -> Self {
        Self {
            framebuffer_size: params.framebuffer_size.to_array(),
            frame_number: frame.frame_number,
            accumulated_samples: frame.accumulated_samples,
            samples_per_pixel: params.sampling.samples_per_pixel,
            num_bounces: params.sampling.num_bounces,
            exposure: params.exposure,
            pad0: 0,
        }
    }
}

impl Bvh {
    /// The node arena as an upload-ready buffer.
    pub fn node_buffer(&self) -> Vec<GpuBvhNode> {
        self.nodes.iter().map(GpuBvhNode::from).collect()
    }

    /// The leaf-ordered triangles as an upload-ready buffer.
    pub fn triangle_buffer(&self) -> Vec<GpuTriangle> {
        self.triangles.iter().map(GpuTriangle::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helio_core::sky::{sun_direction, SkyParams};
    use helio_core::TrianglePositions;
    use std::mem::size_of;

    #[test]
    fn test_layout_sizes_are_pinned() {
        assert_eq!(size_of::<GpuAabb>(), 32);
        assert_eq!(size_of::<GpuBvhNode>(), 48);
        assert_eq!(size_of::<GpuTriangle>(), 48);
        assert_eq!(size_of::<GpuSkyState>(), 160);
        assert_eq!(size_of::<GpuCamera>(), 96);
        assert_eq!(size_of::<GpuFrameData>(), 32);
    }

    #[test]
    fn test_buffers_cast_to_bytes() {
        let bvh = Bvh::build(&[TrianglePositions::new(
            helio_math::Vec3::ZERO,
            helio_math::Vec3::X,
            helio_math::Vec3::Y,
        )]);

        let nodes = bvh.node_buffer();
        let triangles = bvh.triangle_buffer();

        let node_bytes: &[u8] = bytemuck::cast_slice(&nodes);
        let triangle_bytes: &[u8] = bytemuck::cast_slice(&triangles);
        assert_eq!(node_bytes.len(), nodes.len() * 48);
        assert_eq!(triangle_bytes.len(), triangles.len() * 48);
    }

    #[test]
    fn test_sky_state_layout_roundtrip() {
        let state = SkyState::new(&SkyParams::default()).unwrap();
        let gpu = GpuSkyState::new(&state, sun_direction(0.5, 0.0));

        let bytes = bytemuck::bytes_of(&gpu);
        let restored: &GpuSkyState = bytemuck::from_bytes(bytes);
        assert_eq!(*restored, gpu);

        // Shape coefficients occupy the first 27 floats
        let floats: &[f32] = bytemuck::cast_slice(bytes);
        assert_eq!(&floats[..27], &state.params[..]);
        assert_eq!(&floats[27..30], &state.sky_radiance[..]);
        assert_eq!(&floats[30..33], &state.solar_radiance[..]);
    }
}
