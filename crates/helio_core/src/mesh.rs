//! Mesh geometry as it arrives from a scene loader.
//!
//! A `Mesh` is indexed vertex data in flat arrays. The core does not parse
//! any file format; loaders populate these fields and hand the mesh over for
//! flattening into renderer-facing triangle arrays (see [`crate::scene`]).

use helio_math::{Aabb, Vec3};

/// A mesh consisting of vertex positions, optional attributes, and triangle
/// indices.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional - call `compute_normals` to derive them)
    pub normals: Option<Vec<Vec3>>,

    /// UV coordinates (optional - one [u, v] per vertex)
    pub uvs: Option<Vec<[f32; 2]>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box over the positions
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        let bounds = Self::compute_bounds(&positions);
        Self {
            positions,
            normals,
            uvs: None,
            indices,
            bounds,
        }
    }

    /// Create a new mesh with UV coordinates.
    pub fn with_uvs(
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        normals: Option<Vec<Vec3>>,
        uvs: Option<Vec<[f32; 2]>>,
    ) -> Self {
        let bounds = Self::compute_bounds(&positions);
        Self {
            positions,
            normals,
            uvs,
            indices,
            bounds,
        }
    }

    /// Number of triangles described by the index array.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn compute_bounds(positions: &[Vec3]) -> Aabb {
        positions.iter().fold(Aabb::EMPTY, |acc, p| acc.grow(*p))
    }

    /// Compute smooth vertex normals by averaging face normals.
    ///
    /// Replaces any existing normals. Each vertex normal is the normalized
    /// sum of the area-weighted normals of the faces sharing that vertex.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let i0 = face[0] as usize;
            let i1 = face[1] as usize;
            let i2 = face[2] as usize;

            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let p0 = self.positions[i0];
            let p1 = self.positions[i1];
            let p2 = self.positions[i2];

            // Cross product length is twice the face area, which gives the
            // area weighting for free.
            let face_normal = (p1 - p0).cross(p2 - p0);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            let len = normal.length();
            if len > 0.0 {
                *normal /= len;
            }
        }

        self.normals = Some(normals);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_quad() -> Mesh {
        Mesh::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
            None,
        )
    }

    #[test]
    fn test_mesh_bounds() {
        let mesh = unit_quad();

        assert_eq!(mesh.bounds.min, Vec3::ZERO);
        assert_eq!(mesh.bounds.max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_mesh_triangle_count() {
        assert_eq!(unit_quad().triangle_count(), 2);
    }

    #[test]
    fn test_compute_normals_planar() {
        let mut mesh = unit_quad();
        mesh.compute_normals();

        let normals = mesh.normals.as_ref().unwrap();
        assert_eq!(normals.len(), 4);
        for n in normals {
            // Counter-clockwise quad in the XY plane faces +Z
            assert!((*n - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn test_empty_mesh_bounds() {
        let mesh = Mesh::new(vec![], vec![], None);
        assert!(mesh.bounds.is_empty());
    }
}
