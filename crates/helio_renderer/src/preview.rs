//! Headless primary-ray preview renderer.
//!
//! Mirrors the external GPU path at miniature scale: one camera ray per
//! pixel, a nearest-hit query, sky radiance where the ray escapes and a
//! flat sun-lit shade where it doesn't. No bounces - global illumination
//! belongs to the compute backend. Useful for diagnostics and as an
//! end-to-end exercise of camera, index and sky together.

use helio_core::sky::{Channel, SkyState};
use helio_math::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::bvh::Bvh;
use crate::camera::{gen_f32, sample_in_unit_disk, Camera};

/// Preview output settings.
#[derive(Clone, Copy, Debug)]
pub struct PreviewConfig {
    pub width: u32,
    pub height: u32,
    /// Unit vector toward the sun, see [`helio_core::sky::sun_direction`]
    pub sun_direction: Vec3,
    /// Sigmoid tone-map strength
    pub exposure: f32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            sun_direction: Vec3::new(0.0, 1.0, 0.0),
            exposure: 1.0,
        }
    }
}

/// Linear HDR framebuffer with row 0 at the bottom of the screen.
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Vec3>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec3::ZERO; (width * height) as usize],
        }
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Vec3 {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Vec3) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Convert to 8-bit RGBA bytes.
    ///
    /// Rows are emitted top-first to match image file conventions, so the
    /// buffer's bottom-up row order is flipped here.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity((self.width * self.height * 4) as usize);
        for y in (0..self.height).rev() {
            for x in 0..self.width {
                let color = self.get(x, y);
                bytes.push((255.0 * color.x.clamp(0.0, 1.0)) as u8);
                bytes.push((255.0 * color.y.clamp(0.0, 1.0)) as u8);
                bytes.push((255.0 * color.z.clamp(0.0, 1.0)) as u8);
                bytes.push(255);
            }
        }
        bytes
    }

    /// Write the buffer to a PNG file.
    pub fn save_png(&self, path: impl AsRef<std::path::Path>) -> image::ImageResult<()> {
        image::save_buffer(
            path,
            &self.to_rgba8(),
            self.width,
            self.height,
            image::ColorType::Rgba8,
        )
    }
}

/// Sigmoid exposure tone map, per channel: `2 / (1 + exp(-exposure * x)) - 1`.
///
/// Maps `[0, inf)` onto `[0, 1)` monotonically.
pub fn expose(color: Vec3, exposure: f32) -> Vec3 {
    Vec3::new(
        2.0 / (1.0 + (-exposure * color.x).exp()) - 1.0,
        2.0 / (1.0 + (-exposure * color.y).exp()) - 1.0,
        2.0 / (1.0 + (-exposure * color.z).exp()) - 1.0,
    )
}

/// Sky radiance for a world-space view direction.
fn sky_color(sky: &SkyState, sun_direction: Vec3, direction: Vec3) -> Vec3 {
    let dir = direction.normalize();
    let theta = dir.y.clamp(-1.0, 1.0).acos();
    let gamma = dir.dot(sun_direction).clamp(-1.0, 1.0).acos();

    Vec3::new(
        sky.radiance(theta, gamma, Channel::R),
        sky.radiance(theta, gamma, Channel::G),
        sky.radiance(theta, gamma, Channel::B),
    )
}

/// Flat diffuse shade for a surface hit.
fn shade_hit(normal: Vec3, sun_direction: Vec3) -> Vec3 {
    // 18% gray with a small ambient floor so shadowed faces stay visible
    let base_color = Vec3::splat(0.18);
    let diffuse = normal.dot(sun_direction).max(0.0);
    base_color * (0.15 + diffuse)
}

/// Render one preview frame.
///
/// Rows are traced in parallel; each row seeds its own generator, so the
/// output is identical run to run regardless of thread scheduling.
pub fn render(camera: &Camera, bvh: &Bvh, sky: &SkyState, config: &PreviewConfig) -> ImageBuffer {
    let mut image = ImageBuffer::new(config.width, config.height);
    let width = config.width as usize;
    let (fw, fh) = (config.width as f32, config.height as f32);

    image
        .pixels
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let mut rng = StdRng::seed_from_u64(y as u64);
            for (x, pixel) in row.iter_mut().enumerate() {
                let s = (x as f32 + gen_f32(&mut rng)) / fw;
                let t = (y as f32 + gen_f32(&mut rng)) / fh;
                let lens_sample = sample_in_unit_disk(&mut rng);
                let ray = camera.generate_ray(s, t, lens_sample);

                let color = match bvh.intersect(&ray, f32::MAX) {
                    Some(hit) => shade_hit(hit.normal, config.sun_direction),
                    None => sky_color(sky, config.sun_direction, ray.direction),
                };

                *pixel = expose(color, config.exposure);
            }
        });

    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use helio_core::sky::{sun_direction, SkyParams};
    use helio_core::TrianglePositions;

    fn test_setup() -> (Camera, SkyState, PreviewConfig) {
        let camera = Camera::new(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 1.5, -10.0), // slightly above the horizon
            0.0,
            10.0,
            60.0,
            64.0,
            48.0,
        );
        let sky = SkyState::new(&SkyParams::default()).unwrap();
        let config = PreviewConfig {
            width: 64,
            height: 48,
            sun_direction: sun_direction(30.0_f32.to_radians(), 0.0),
            exposure: 1.0,
        };
        (camera, sky, config)
    }

    #[test]
    fn test_empty_scene_shows_sky() {
        let (camera, sky, config) = test_setup();
        let bvh = Bvh::build(&[]);

        let image = render(&camera, &bvh, &sky, &config);

        // Every pixel escaped to the sky: finite, positive radiance
        for pixel in &image.pixels {
            assert!(pixel.is_finite());
            assert!(pixel.min_element() > 0.0);
            assert!(pixel.max_element() < 1.0); // tone map bounds output
        }
    }

    #[test]
    fn test_geometry_occludes_sky() {
        let (camera, sky, config) = test_setup();

        // A wall filling the view at z = -5
        let wall = [
            TrianglePositions::new(
                Vec3::new(-50.0, -50.0, -5.0),
                Vec3::new(50.0, -50.0, -5.0),
                Vec3::new(0.0, 50.0, -5.0),
            ),
        ];
        let with_wall = render(&camera, &Bvh::build(&wall), &sky, &config);
        let without = render(&camera, &Bvh::build(&[]), &sky, &config);

        let center = (config.width / 2, config.height / 2);
        assert_ne!(
            with_wall.get(center.0, center.1),
            without.get(center.0, center.1)
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let (camera, sky, config) = test_setup();
        let bvh = Bvh::build(&[]);

        let first = render(&camera, &bvh, &sky, &config);
        let second = render(&camera, &bvh, &sky, &config);

        assert_eq!(first.pixels, second.pixels);
    }

    #[test]
    fn test_expose_is_bounded_and_monotonic() {
        assert_eq!(expose(Vec3::ZERO, 1.0), Vec3::ZERO);

        let mut last = -1.0;
        for i in 0..100 {
            let x = i as f32 * 0.5;
            let value = expose(Vec3::splat(x), 1.0).x;
            assert!(value > last);
            assert!(value < 1.0);
            last = value;
        }
    }

    #[test]
    fn test_rgba_conversion_flips_rows() {
        let mut image = ImageBuffer::new(2, 2);
        image.set(0, 0, Vec3::ZERO); // bottom-left
        image.set(0, 1, Vec3::ONE); // top-left

        let bytes = image.to_rgba8();
        // Top row is written first
        assert_eq!(bytes[0], 255);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 255]);
    }
}
