//! Flattened scene arrays.
//!
//! Renderers and GPU backends consume the scene as flat, parallel arrays:
//! one entry of triangle positions, vertex attributes and a base-color
//! texture reference per triangle. `Scene` performs that flattening from
//! indexed meshes; it owns no GPU resources and parses no files.

use helio_math::{Aabb, Vec3};

use crate::mesh::Mesh;
use crate::texture::TextureDescriptor;

/// Three triangle vertices, unpacked from the source mesh's index buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrianglePositions {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
}

impl TrianglePositions {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Bounding box over the three vertices.
    pub fn aabb(&self) -> Aabb {
        Aabb::EMPTY.grow(self.v0).grow(self.v1).grow(self.v2)
    }

    /// Surface area; zero for degenerate (collinear or duplicate-vertex)
    /// triangles.
    pub fn area(&self) -> f32 {
        0.5 * (self.v1 - self.v0).cross(self.v2 - self.v0).length()
    }
}

/// Per-corner shading attributes for one triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexAttributes {
    /// Shading normals at the three corners
    pub normals: [Vec3; 3],

    /// UV coordinates at the three corners
    pub uvs: [[f32; 2]; 3],
}

/// A scene flattened into renderer-facing parallel arrays.
///
/// `positions`, `attributes` and `texture_indices` are index-aligned: entry
/// `i` of each describes triangle `i`. Texture indices refer into
/// `textures`, whose descriptors locate texels in an external array the
/// core never inspects.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub positions: Vec<TrianglePositions>,
    pub attributes: Vec<VertexAttributes>,
    pub texture_indices: Vec<u32>,
    pub textures: Vec<TextureDescriptor>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a base-color texture and return its index.
    pub fn add_texture(&mut self, descriptor: TextureDescriptor) -> u32 {
        let index = self.textures.len() as u32;
        self.textures.push(descriptor);
        index
    }

    /// Flatten a mesh's indexed triangles into the scene arrays.
    ///
    /// Every triangle is tagged with `texture_index`. Missing normals fall
    /// back to the face normal, missing UVs to zero.
    pub fn add_mesh(&mut self, mesh: &Mesh, texture_index: u32) {
        let triangle_count = mesh.triangle_count();
        self.positions.reserve(triangle_count);
        self.attributes.reserve(triangle_count);
        self.texture_indices.reserve(triangle_count);

        for face in mesh.indices.chunks_exact(3) {
            let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];

            let positions = TrianglePositions::new(
                mesh.positions[i0],
                mesh.positions[i1],
                mesh.positions[i2],
            );

            let normals = match &mesh.normals {
                Some(normals) => [normals[i0], normals[i1], normals[i2]],
                None => {
                    let face_normal = (positions.v1 - positions.v0)
                        .cross(positions.v2 - positions.v0)
                        .normalize_or_zero();
                    [face_normal; 3]
                }
            };

            let uvs = match &mesh.uvs {
                Some(uvs) => [uvs[i0], uvs[i1], uvs[i2]],
                None => [[0.0, 0.0]; 3],
            };

            self.positions.push(positions);
            self.attributes.push(VertexAttributes { normals, uvs });
            self.texture_indices.push(texture_index);
        }

        log::debug!(
            "flattened mesh: {} triangles ({} total)",
            triangle_count,
            self.positions.len()
        );
    }

    /// Total number of triangles in the scene.
    pub fn triangle_count(&self) -> usize {
        self.positions.len()
    }

    /// Bounding box over all triangles.
    pub fn bounds(&self) -> Aabb {
        self.positions
            .iter()
            .fold(Aabb::EMPTY, |acc, tri| acc.merge(&tri.aabb()))
    }
}
