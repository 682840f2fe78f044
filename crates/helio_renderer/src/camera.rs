//! Camera ray generation.
//!
//! A `Camera` is an immutable snapshot: the image-plane basis is derived
//! once from the look-at parameters and a new value is built whenever any
//! input changes. Randomness for depth of field stays outside - the caller
//! passes a unit-disk sample into `generate_ray`.

use helio_math::{Ray, Vec2, Vec3};
use rand::RngCore;

use crate::bvh::Bvh;
use crate::intersect::Intersection;

/// World-space camera snapshot.
///
/// `u` and `v` span the lens plane; `lower_left_corner`, `horizontal` and
/// `vertical` describe the focus-plane rectangle that screen coordinates
/// map onto.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub origin: Vec3,
    pub lower_left_corner: Vec3,
    pub horizontal: Vec3,
    pub vertical: Vec3,
    pub u: Vec3,
    pub v: Vec3,
    pub lens_radius: f32,
}

impl Camera {
    /// Derive a camera from look-at parameters.
    ///
    /// `vfov` is the vertical field of view in degrees; the horizontal
    /// extent follows from the `viewport_width / viewport_height` aspect
    /// ratio. The focus plane sits `focus_distance` along the view
    /// direction; `aperture` is the lens diameter.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        origin: Vec3,
        look_at: Vec3,
        aperture: f32,
        focus_distance: f32,
        vfov: f32,
        viewport_width: f32,
        viewport_height: f32,
    ) -> Self {
        let theta = vfov.to_radians();
        let half_height = focus_distance * (0.5 * theta).tan();
        let half_width = (viewport_width / viewport_height) * half_height;

        let world_up = Vec3::Y;
        let forward = (look_at - origin).normalize();
        let u = forward.cross(world_up).normalize();
        let v = u.cross(forward);

        let lower_left_corner =
            origin - half_width * u - half_height * v + focus_distance * forward;
        let horizontal = 2.0 * half_width * u;
        let vertical = 2.0 * half_height * v;

        Self {
            origin,
            lower_left_corner,
            horizontal,
            vertical,
            u,
            v,
            lens_radius: 0.5 * aperture,
        }
    }

    /// Generate the ray through screen coordinates `(s, t)`.
    ///
    /// `(0, 0)` is the lower-left corner of the screen rectangle and
    /// `(1, 1)` the upper-right; values outside `[0, 1]` extrapolate past
    /// the rectangle. `lens_sample` is a point in the unit disk (from any
    /// external source); it is scaled by the lens radius to defocus the
    /// ray. Never fails.
    pub fn generate_ray(&self, s: f32, t: f32, lens_sample: Vec2) -> Ray {
        let lens_offset =
            self.lens_radius * (lens_sample.x * self.u + lens_sample.y * self.v);
        let origin = self.origin + lens_offset;
        let direction =
            self.lower_left_corner + s * self.horizontal + t * self.vertical - origin;

        Ray::new(origin, direction.normalize())
    }
}

/// Uniform sample in the unit disk, by rejection.
pub fn sample_in_unit_disk(rng: &mut dyn RngCore) -> Vec2 {
    loop {
        let p = Vec2::new(gen_f32(rng) * 2.0 - 1.0, gen_f32(rng) * 2.0 - 1.0);
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// Uniform `f32` in `[0, 1)` from the top 24 bits of the generator.
pub(crate) fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    (rng.next_u32() >> 8) as f32 * (1.0 / 16_777_216.0)
}

/// Screen-space scene probe: trace the ray through `(s, t)` with no lens
/// offset and return the nearest hit.
///
/// Drives interactive focus picking in the host application; not part of
/// the rendering path.
pub fn pick(camera: &Camera, bvh: &Bvh, s: f32, t: f32) -> Option<Intersection> {
    let ray = camera.generate_ray(s, t, Vec2::ZERO);
    bvh.intersect(&ray, f32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_camera(vfov: f32) -> Camera {
        Camera::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(-4.0, 0.0, 8.0),
            0.0,
            2.5,
            vfov,
            800.0,
            450.0,
        )
    }

    #[test]
    fn test_center_ray_points_at_look_at() {
        let origin = Vec3::new(1.0, 2.0, 3.0);
        let look_dir = (Vec3::new(-4.0, 0.0, 8.0) - origin).normalize();

        // Independent of field of view
        for vfov in [30.0, 70.0, 110.0] {
            let camera = test_camera(vfov);
            let ray = camera.generate_ray(0.5, 0.5, Vec2::ZERO);

            assert!((ray.origin - origin).length() < 1e-6);
            assert!((ray.direction - look_dir).length() < 1e-5);
        }
    }

    #[test]
    fn test_corner_rays_span_the_viewport() {
        let camera = test_camera(90.0);

        let lower_left = camera.generate_ray(0.0, 0.0, Vec2::ZERO);
        let upper_right = camera.generate_ray(1.0, 1.0, Vec2::ZERO);

        // Opposite corners diverge symmetrically around the view axis
        let center = camera.generate_ray(0.5, 0.5, Vec2::ZERO);
        let to_ll = lower_left.direction.dot(center.direction);
        let to_ur = upper_right.direction.dot(center.direction);
        assert!((to_ll - to_ur).abs() < 1e-5);
        assert!(to_ll < 1.0);
    }

    #[test]
    fn test_out_of_range_coordinates_extrapolate() {
        let camera = test_camera(60.0);
        let ray = camera.generate_ray(-0.5, 1.5, Vec2::ZERO);

        assert!(ray.direction.is_finite());
        assert!(ray.direction.length() > 0.9);
    }

    #[test]
    fn test_zero_aperture_ignores_lens_sample() {
        let camera = test_camera(60.0);

        let centered = camera.generate_ray(0.3, 0.7, Vec2::ZERO);
        let offset = camera.generate_ray(0.3, 0.7, Vec2::new(0.9, -0.4));

        assert_eq!(centered, offset);
    }

    #[test]
    fn test_aperture_offsets_ray_origin() {
        let camera = Camera::new(
            Vec3::ZERO,
            Vec3::NEG_Z,
            0.5,
            5.0,
            60.0,
            1.0,
            1.0,
        );
        let ray = camera.generate_ray(0.5, 0.5, Vec2::new(1.0, 0.0));

        // Offset by lens_radius along the lens basis
        assert!((ray.origin.length() - 0.25).abs() < 1e-6);

        // A defocused center ray still converges on the focus point
        let focus_point = Vec3::new(0.0, 0.0, -5.0);
        let to_focus = (focus_point - ray.origin).normalize();
        assert!((ray.direction - to_focus).length() < 1e-6);
    }

    #[test]
    fn test_disk_samples_inside_unit_disk() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let p = sample_in_unit_disk(&mut rng);
            assert!(p.length_squared() < 1.0);
        }
    }

    #[test]
    fn test_pick_probes_scene_through_screen_point() {
        use helio_core::TrianglePositions;

        let bvh = Bvh::build(&[TrianglePositions::new(
            Vec3::new(-5.0, -5.0, -3.0),
            Vec3::new(5.0, -5.0, -3.0),
            Vec3::new(0.0, 5.0, -3.0),
        )]);
        let camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, 0.2, 3.0, 60.0, 1.0, 1.0);

        // Center of the screen looks straight at the wall; the pick ray
        // ignores the lens even though the aperture is open.
        let hit = pick(&camera, &bvh, 0.5, 0.5).unwrap();
        assert!((hit.t - 3.0).abs() < 1e-4);

        // A point far off screen extrapolates past the wall
        assert!(pick(&camera, &bvh, 12.0, 0.5).is_none());
    }
}
