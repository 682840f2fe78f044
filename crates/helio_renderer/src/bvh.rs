//! Bounding volume hierarchy over the scene's triangles.
//!
//! Built once per scene, then only traversed. Nodes live in a flat arena
//! indexed by array position - an interior node's first child sits directly
//! after it, the second child at `second_child_offset` - so the finished
//! tree doubles as the upload buffer for a parallel compute backend.
//! Triangles are reordered into leaf-contiguous ranges during the build;
//! `triangle_indices` records the permutation so per-triangle attribute
//! arrays can be reordered to match.

use helio_core::TrianglePositions;
use helio_math::{Aabb, Vec3};

use crate::triangle::Triangle;

/// Primitives per leaf beyond which a node must split regardless of cost.
const MAX_TRIANGLES_IN_NODE: usize = 255;
/// Centroid buckets evaluated by the surface-area heuristic.
const NUM_BUCKETS: usize = 12;
const TRAVERSAL_COST: f32 = 0.5;
const INTERSECTION_COST: f32 = 1.0;

/// Flat BVH node. Leaf iff `split_axis == u32::MAX`.
///
/// Interior nodes store only the second child; the first child is the node
/// immediately following in the arena.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BvhNode {
    pub aabb: Aabb,
    /// Leaf: first triangle in the leaf-ordered array
    pub triangles_offset: u32,
    /// Interior: arena index of the second child
    pub second_child_offset: u32,
    /// Leaf: number of triangles; 0 for interior nodes
    pub triangle_count: u32,
    /// Interior: axis the children were partitioned on; `u32::MAX` marks a leaf
    pub split_axis: u32,
}

impl BvhNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.split_axis == u32::MAX
    }

    fn leaf(aabb: Aabb, triangles_offset: u32, triangle_count: u32) -> Self {
        Self {
            aabb,
            triangles_offset,
            second_child_offset: 0,
            triangle_count,
            split_axis: u32::MAX,
        }
    }

    fn interior(aabb: Aabb, split_axis: usize, second_child_offset: u32) -> Self {
        Self {
            aabb,
            triangles_offset: 0,
            second_child_offset,
            triangle_count: 0,
            split_axis: split_axis as u32,
        }
    }
}

/// An immutable triangle BVH.
///
/// Queries go through [`Bvh::intersect`]; the flat buffers are exposed for
/// upload through [`Bvh::nodes`] and [`Bvh::triangles`].
pub struct Bvh {
    pub(crate) nodes: Vec<BvhNode>,
    pub(crate) triangles: Vec<Triangle>,
    triangle_indices: Vec<u32>,
}

/// Working data for one input triangle during construction.
struct BuildPrimitive {
    aabb: Aabb,
    centroid: Vec3,
    triangle_index: usize,
}

fn axis_value(v: Vec3, axis: usize) -> f32 {
    match axis {
        0 => v.x,
        1 => v.y,
        _ => v.z,
    }
}

impl Bvh {
    /// Build the hierarchy over a scene's triangles.
    ///
    /// Zero-area (or NaN) triangles keep their slot in the primitive order
    /// but contribute an empty box, so malformed geometry cannot poison
    /// ancestor bounds. An empty input produces a single empty-box leaf.
    pub fn build(positions: &[TrianglePositions]) -> Bvh {
        if positions.is_empty() {
            return Bvh {
                nodes: vec![BvhNode::leaf(Aabb::EMPTY, 0, 0)],
                triangles: Vec::new(),
                triangle_indices: Vec::new(),
            };
        }

        let mut primitives: Vec<BuildPrimitive> = positions
            .iter()
            .enumerate()
            .map(|(triangle_index, tri)| {
                // NaN area fails the comparison too, landing in the
                // degenerate branch.
                if tri.area() > 0.0 {
                    let aabb = tri.aabb();
                    BuildPrimitive {
                        aabb,
                        centroid: aabb.centroid(),
                        triangle_index,
                    }
                } else {
                    BuildPrimitive {
                        aabb: Aabb::EMPTY,
                        centroid: Vec3::ZERO,
                        triangle_index,
                    }
                }
            })
            .collect();

        let mut bvh = Bvh {
            nodes: Vec::with_capacity(2 * positions.len()),
            triangles: Vec::with_capacity(positions.len()),
            triangle_indices: vec![0; positions.len()],
        };
        bvh.build_recursive(positions, &mut primitives);

        log::debug!(
            "built bvh: {} nodes, {} leaves over {} triangles",
            bvh.nodes.len(),
            bvh.nodes.iter().filter(|n| n.is_leaf()).count(),
            bvh.triangles.len()
        );

        bvh
    }

    /// The flat node arena; element 0 is the root.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Triangles in leaf-contiguous order.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// For input triangle `i`, `triangle_indices()[i]` is its position in
    /// the leaf-ordered array. Feed this to [`reorder_attributes`].
    pub fn triangle_indices(&self) -> &[u32] {
        &self.triangle_indices
    }

    fn build_recursive(
        &mut self,
        positions: &[TrianglePositions],
        primitives: &mut [BuildPrimitive],
    ) -> usize {
        debug_assert!(!primitives.is_empty());

        // Reserve the node slot up front; children allocate after it.
        let node_index = self.nodes.len();
        self.nodes.push(BvhNode::leaf(Aabb::EMPTY, 0, 0));

        let mut node_aabb = Aabb::EMPTY;
        let mut centroid_aabb = Aabb::EMPTY;
        for prim in primitives.iter() {
            node_aabb = node_aabb.merge(&prim.aabb);
            centroid_aabb = centroid_aabb.grow(prim.centroid);
        }
        let split_axis = centroid_aabb.max_dimension();

        // Degenerate bounds or a single primitive terminate as a leaf.
        let centroid_extent =
            axis_value(centroid_aabb.max, split_axis) - axis_value(centroid_aabb.min, split_axis);
        if node_aabb.surface_area() == 0.0 || centroid_extent == 0.0 || primitives.len() == 1 {
            self.build_leaf(node_index, node_aabb, positions, primitives);
            return node_index;
        }

        let split_index = if primitives.len() < 3 {
            // Not worth evaluating SAH for so few primitives; equal-count split.
            let mid = primitives.len() / 2;
            primitives.select_nth_unstable_by(mid, |a, b| {
                axis_value(a.centroid, split_axis)
                    .partial_cmp(&axis_value(b.centroid, split_axis))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            mid
        } else {
            match choose_sah_split(primitives, &node_aabb, &centroid_aabb, split_axis) {
                Some(split_index) => split_index,
                None => {
                    // Splitting costs more than intersecting the leaf as-is.
                    self.build_leaf(node_index, node_aabb, positions, primitives);
                    return node_index;
                }
            }
        };

        let (left, right) = primitives.split_at_mut(split_index);
        self.build_recursive(positions, left);
        let second_child_offset = self.build_recursive(positions, right);

        self.nodes[node_index] =
            BvhNode::interior(node_aabb, split_axis, second_child_offset as u32);

        node_index
    }

    fn build_leaf(
        &mut self,
        node_index: usize,
        node_aabb: Aabb,
        positions: &[TrianglePositions],
        primitives: &[BuildPrimitive],
    ) {
        let triangles_offset = self.triangles.len() as u32;
        for prim in primitives {
            self.triangle_indices[prim.triangle_index] = self.triangles.len() as u32;
            self.triangles
                .push(Triangle::from(&positions[prim.triangle_index]));
        }
        self.nodes[node_index] =
            BvhNode::leaf(node_aabb, triangles_offset, primitives.len() as u32);
    }
}

/// Partition `primitives` with the surface-area heuristic.
///
/// Returns the split point, or `None` when keeping the node as a leaf is
/// cheaper (never for nodes over the forced-split size).
fn choose_sah_split(
    primitives: &mut [BuildPrimitive],
    node_aabb: &Aabb,
    centroid_aabb: &Aabb,
    split_axis: usize,
) -> Option<usize> {
    let centroid_min = axis_value(centroid_aabb.min, split_axis);
    let centroid_extent = axis_value(centroid_aabb.max, split_axis) - centroid_min;
    let bucket_of = |prim: &BuildPrimitive| -> usize {
        let scaled =
            NUM_BUCKETS as f32 * (axis_value(prim.centroid, split_axis) - centroid_min)
                / centroid_extent;
        (scaled as usize).min(NUM_BUCKETS - 1)
    };

    let mut bucket_counts = [0usize; NUM_BUCKETS];
    let mut bucket_aabbs = [Aabb::EMPTY; NUM_BUCKETS];
    for prim in primitives.iter() {
        let bucket = bucket_of(prim);
        bucket_counts[bucket] += 1;
        bucket_aabbs[bucket] = bucket_aabbs[bucket].merge(&prim.aabb);
    }

    // Sweep once from each end to accumulate the cost of the NUM_BUCKETS-1
    // candidate splits.
    const NUM_SPLITS: usize = NUM_BUCKETS - 1;
    let mut costs = [0.0f32; NUM_SPLITS];

    let mut count_below = 0;
    let mut aabb_below = Aabb::EMPTY;
    for i in 0..NUM_SPLITS {
        count_below += bucket_counts[i];
        aabb_below = aabb_below.merge(&bucket_aabbs[i]);
        costs[i] += INTERSECTION_COST * count_below as f32 * aabb_below.surface_area();
    }

    let mut count_above = 0;
    let mut aabb_above = Aabb::EMPTY;
    for i in (1..=NUM_SPLITS).rev() {
        count_above += bucket_counts[i];
        aabb_above = aabb_above.merge(&bucket_aabbs[i]);
        costs[i - 1] += INTERSECTION_COST * count_above as f32 * aabb_above.surface_area();
    }

    let mut min_cost = f32::MAX;
    let mut split_bucket = 0;
    for (i, &cost) in costs.iter().enumerate() {
        if cost < min_cost {
            min_cost = cost;
            split_bucket = i;
        }
    }

    // Split probability comes from the child/parent surface area ratio.
    let leaf_cost = INTERSECTION_COST * primitives.len() as f32;
    let split_cost = TRAVERSAL_COST + min_cost / node_aabb.surface_area();

    if primitives.len() <= MAX_TRIANGLES_IN_NODE && split_cost >= leaf_cost {
        return None;
    }

    // In-place partition: everything in buckets <= split_bucket first.
    let mut split_index = 0;
    for i in 0..primitives.len() {
        if bucket_of(&primitives[i]) <= split_bucket {
            primitives.swap(i, split_index);
            split_index += 1;
        }
    }

    // The extreme centroids land in the outermost buckets, so neither
    // side can be empty.
    debug_assert!(split_index > 0 && split_index < primitives.len());
    Some(split_index)
}

/// Permute a per-triangle attribute array into the BVH's leaf order.
///
/// `triangle_indices` is the map returned by [`Bvh::triangle_indices`];
/// attribute `i` of the input ends up at `triangle_indices[i]`.
pub fn reorder_attributes<T: Clone>(attributes: &[T], triangle_indices: &[u32]) -> Vec<T> {
    assert_eq!(attributes.len(), triangle_indices.len());
    let mut reordered = attributes.to_vec();
    for (i, attribute) in attributes.iter().enumerate() {
        reordered[triangle_indices[i] as usize] = attribute.clone();
    }
    reordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use helio_math::Ray;

    /// A jittered grid of small triangles facing +Z, deterministic layout.
    fn triangle_grid(side: usize) -> Vec<TrianglePositions> {
        let mut triangles = Vec::with_capacity(side * side);
        for j in 0..side {
            for i in 0..side {
                let x = i as f32 - side as f32 / 2.0;
                let y = j as f32 - side as f32 / 2.0;
                let z = ((i * 7 + j * 13) % 5) as f32 * 0.25;
                triangles.push(TrianglePositions::new(
                    Vec3::new(x, y, z),
                    Vec3::new(x + 0.8, y, z),
                    Vec3::new(x, y + 0.8, z),
                ));
            }
        }
        triangles
    }

    fn box_contains(outer: &Aabb, inner: &Aabb) -> bool {
        inner.is_empty()
            || (inner.min.cmpge(outer.min).all() && inner.max.cmple(outer.max).all())
    }

    fn node_contains_subtree(bvh: &Bvh, index: usize) -> bool {
        let node = &bvh.nodes[index];
        if node.is_leaf() {
            (0..node.triangle_count as usize).all(|i| {
                let tri = &bvh.triangles[node.triangles_offset as usize + i];
                let bounds = Aabb::EMPTY
                    .grow(tri.v0())
                    .grow(tri.v0() + tri.edge1())
                    .grow(tri.v0() + tri.edge2());
                box_contains(&node.aabb, &bounds)
            })
        } else {
            let first = &bvh.nodes[index + 1];
            let second = &bvh.nodes[node.second_child_offset as usize];
            box_contains(&node.aabb, &first.aabb) && box_contains(&node.aabb, &second.aabb)
        }
    }

    #[test]
    fn test_build_empty() {
        let bvh = Bvh::build(&[]);

        assert_eq!(bvh.nodes().len(), 1);
        assert!(bvh.nodes()[0].is_leaf());
        assert_eq!(bvh.nodes()[0].triangle_count, 0);
        assert!(bvh.nodes()[0].aabb.is_empty());

        // An empty index reports no hit rather than failing
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(bvh.intersect(&ray, 1000.0).is_none());
    }

    #[test]
    fn test_build_single_triangle() {
        let tri = TrianglePositions::new(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        );
        let bvh = Bvh::build(&[tri]);

        assert_eq!(bvh.nodes().len(), 1);
        assert_eq!(bvh.nodes()[0].triangle_count, 1);
        assert_eq!(bvh.triangle_indices(), &[0]);
    }

    #[test]
    fn test_every_triangle_in_exactly_one_leaf() {
        let triangles = triangle_grid(16);
        let bvh = Bvh::build(&triangles);

        assert_eq!(bvh.triangles().len(), triangles.len());

        // The reorder map is a permutation: every output slot hit once
        let mut seen = vec![false; triangles.len()];
        for &new_index in bvh.triangle_indices() {
            assert!(!seen[new_index as usize]);
            seen[new_index as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));

        // Leaf ranges tile the triangle array without overlap
        let mut covered = vec![false; triangles.len()];
        for node in bvh.nodes() {
            if node.is_leaf() {
                for i in 0..node.triangle_count as usize {
                    let index = node.triangles_offset as usize + i;
                    assert!(!covered[index]);
                    covered[index] = true;
                }
            }
        }
        assert!(covered.iter().all(|&c| c));
    }

    #[test]
    fn test_node_boxes_contain_their_subtrees() {
        let bvh = Bvh::build(&triangle_grid(8));
        for index in 0..bvh.nodes().len() {
            assert!(node_contains_subtree(&bvh, index));
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let triangles = triangle_grid(12);
        let a = Bvh::build(&triangles);
        let b = Bvh::build(&triangles);

        assert_eq!(a.nodes(), b.nodes());
        assert_eq!(a.triangle_indices(), b.triangle_indices());
    }

    #[test]
    fn test_zero_area_triangles_excluded_from_bounds() {
        let mut triangles = triangle_grid(4);
        // A degenerate triangle far outside the real scene
        triangles.push(TrianglePositions::new(
            Vec3::splat(1e9),
            Vec3::splat(1e9),
            Vec3::splat(1e9),
        ));
        let bvh = Bvh::build(&triangles);

        // The degenerate triangle keeps its slot in the primitive order...
        assert_eq!(bvh.triangles().len(), triangles.len());
        // ...but no node box stretches out to reach it
        for node in bvh.nodes() {
            if !node.aabb.is_empty() {
                assert!(node.aabb.max.x < 1e6);
                assert!(node.aabb.min.x > -1e6);
            }
        }
    }

    #[test]
    fn test_nan_positions_do_not_poison_bounds() {
        let mut triangles = triangle_grid(4);
        triangles.push(TrianglePositions::new(
            Vec3::new(f32::NAN, 0.0, 0.0),
            Vec3::new(1.0, f32::NAN, 0.0),
            Vec3::ZERO,
        ));
        let bvh = Bvh::build(&triangles);

        let root = &bvh.nodes()[0];
        assert!(root.aabb.min.is_finite());
        assert!(root.aabb.max.is_finite());
    }

    #[test]
    fn test_reorder_attributes_matches_triangle_order() {
        let triangles = triangle_grid(8);
        let bvh = Bvh::build(&triangles);

        // Reordering the identity produces, at position triangle_indices[i],
        // the original index i.
        let identity: Vec<u32> = (0..triangles.len() as u32).collect();
        let reordered = reorder_attributes(&identity, bvh.triangle_indices());

        for (original_index, &new_index) in bvh.triangle_indices().iter().enumerate() {
            assert_eq!(reordered[new_index as usize], original_index as u32);
        }
    }
}
