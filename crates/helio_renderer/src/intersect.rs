//! Nearest-hit ray queries against the BVH.
//!
//! Traversal is iterative with an explicit stack, so query cost never rides
//! on call-stack depth, and all state lives on the caller's frame - any
//! number of threads may query the same index concurrently.

use helio_math::{Aabb, Interval, Ray, Vec3};

use crate::bvh::Bvh;

/// Self-intersection guard: hits closer than this are discarded.
const EPSILON: f32 = 1e-5;

/// Fixed traversal stack depth; SAH trees stay far below this.
const STACK_SIZE: usize = 64;

/// A resolved nearest hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    /// World-space hit point, `ray.at(t)`
    pub p: Vec3,
    /// Geometric normal, oriented against the ray direction
    pub normal: Vec3,
    /// Ray parameter of the hit
    pub t: f32,
    /// Index into the leaf-ordered triangle array; combined with the BVH's
    /// reorder map this recovers per-triangle attributes
    pub triangle_index: u32,
}

/// Traversal statistics for the diagnostics query.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BvhStats {
    /// Number of BVH nodes popped during the query
    pub nodes_visited: u32,
}

/// Ray data precomputed once per query for the slab test.
struct RayAabbIntersector {
    origin: Vec3,
    inv_dir: Vec3,
    dir_neg: [usize; 3],
}

impl RayAabbIntersector {
    fn new(ray: &Ray) -> Self {
        let inv_dir = Vec3::ONE / ray.direction;
        Self {
            origin: ray.origin,
            inv_dir,
            dir_neg: [
                (inv_dir.x < 0.0) as usize,
                (inv_dir.y < 0.0) as usize,
                (inv_dir.z < 0.0) as usize,
            ],
        }
    }

    /// Slab test against one box, limited to `(0, t_max)`.
    fn intersects(&self, aabb: &Aabb, t_max: f32) -> bool {
        let bounds = [aabb.min, aabb.max];

        let mut t_min = (bounds[self.dir_neg[0]].x - self.origin.x) * self.inv_dir.x;
        let mut t_far = (bounds[1 - self.dir_neg[0]].x - self.origin.x) * self.inv_dir.x;

        let ty_min = (bounds[self.dir_neg[1]].y - self.origin.y) * self.inv_dir.y;
        let ty_max = (bounds[1 - self.dir_neg[1]].y - self.origin.y) * self.inv_dir.y;

        if t_min > ty_max || ty_min > t_far {
            return false;
        }
        t_min = t_min.max(ty_min);
        t_far = t_far.min(ty_max);

        let tz_min = (bounds[self.dir_neg[2]].z - self.origin.z) * self.inv_dir.z;
        let tz_max = (bounds[1 - self.dir_neg[2]].z - self.origin.z) * self.inv_dir.z;

        if t_min > tz_max || tz_min > t_far {
            return false;
        }
        t_min = t_min.max(tz_min);
        t_far = t_far.min(tz_max);

        t_min < t_max && t_far > 0.0
    }
}

impl Bvh {
    /// Nearest hit along `ray` with `t` in `(epsilon, t_max)`.
    ///
    /// "No hit" is a normal outcome, not an error. Safe to call from many
    /// threads at once.
    pub fn intersect(&self, ray: &Ray, t_max: f32) -> Option<Intersection> {
        self.traverse(ray, t_max, None)
    }

    /// Like [`Bvh::intersect`], additionally reporting traversal statistics.
    pub fn intersect_with_stats(
        &self,
        ray: &Ray,
        t_max: f32,
        stats: &mut BvhStats,
    ) -> Option<Intersection> {
        self.traverse(ray, t_max, Some(stats))
    }

    fn traverse(
        &self,
        ray: &Ray,
        t_max: f32,
        stats: Option<&mut BvhStats>,
    ) -> Option<Intersection> {
        let intersector = RayAabbIntersector::new(ray);

        let mut nodes_visited = 0u32;
        let mut stack = [0usize; STACK_SIZE];
        let mut stack_len = 0usize;
        let mut current = 0usize;

        let mut best_t = t_max;
        let mut best_triangle = None;

        loop {
            nodes_visited += 1;
            let node = &self.nodes[current];

            if intersector.intersects(&node.aabb, best_t) {
                if node.is_leaf() {
                    for i in 0..node.triangle_count as usize {
                        let triangle_index = node.triangles_offset as usize + i;
                        let t_range = Interval::new(EPSILON, best_t);
                        if let Some(hit) = self.triangles[triangle_index].intersect(ray, t_range) {
                            // Strictly-closer keeps the lowest index on ties
                            best_t = hit.t;
                            best_triangle = Some(triangle_index);
                        }
                    }
                    if stack_len == 0 {
                        break;
                    }
                    stack_len -= 1;
                    current = stack[stack_len];
                } else {
                    // Descend into the nearer child first, deferring the other
                    debug_assert!(stack_len < STACK_SIZE);
                    if intersector.dir_neg[node.split_axis as usize] == 1 {
                        stack[stack_len] = current + 1;
                        current = node.second_child_offset as usize;
                    } else {
                        stack[stack_len] = node.second_child_offset as usize;
                        current += 1;
                    }
                    stack_len += 1;
                }
            } else {
                if stack_len == 0 {
                    break;
                }
                stack_len -= 1;
                current = stack[stack_len];
            }
        }

        if let Some(stats) = stats {
            stats.nodes_visited = nodes_visited;
        }

        best_triangle.map(|triangle_index| {
            let triangle = &self.triangles[triangle_index];
            let mut normal = triangle.geometric_normal();
            if normal.dot(ray.direction) > 0.0 {
                normal = -normal;
            }
            Intersection {
                p: ray.at(best_t),
                normal,
                t: best_t,
                triangle_index: triangle_index as u32,
            }
        })
    }
}
