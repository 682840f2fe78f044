//! Renders a small procedural scene against the analytic sky and writes a
//! PNG next to the working directory.
//!
//! Run with `cargo run --example sky_preview` (add `RUST_LOG=debug` for
//! build statistics).

use anyhow::Result;
use helio_core::sky::{sun_direction, SkyParams, SkyState};
use helio_core::{Mesh, Scene, TextureDescriptor};
use helio_renderer::{render, Bvh, Camera, PreviewConfig, Vec3};
use std::f32::consts::FRAC_PI_2;

fn main() -> Result<()> {
    env_logger::init();

    let scene = build_scene();
    let bvh = Bvh::build(&scene.positions);
    log::info!(
        "scene: {} triangles, {} bvh nodes",
        scene.triangle_count(),
        bvh.nodes().len()
    );

    let sun_zenith = 55.0_f32.to_radians();
    let sun_azimuth = 205.0_f32.to_radians();
    let sky = SkyState::new(&SkyParams {
        elevation: FRAC_PI_2 - sun_zenith,
        turbidity: 2.4,
        albedo: [0.3, 0.25, 0.2],
    })?;

    let camera = Camera::new(
        Vec3::new(7.0, 2.5, 9.0),
        Vec3::new(0.0, 1.0, 0.0),
        0.04,
        11.0,
        55.0,
        960.0,
        540.0,
    );

    let config = PreviewConfig {
        width: 960,
        height: 540,
        sun_direction: sun_direction(sun_zenith, sun_azimuth),
        exposure: 1.4,
    };

    let image = render(&camera, &bvh, &sky, &config);
    image.save_png("sky_preview.png")?;
    log::info!("wrote sky_preview.png");

    Ok(())
}

/// A ground slab with a loose ring of pyramids on top.
fn build_scene() -> Scene {
    let mut scene = Scene::new();
    let texture = scene.add_texture(TextureDescriptor::new(1, 1, 0));

    scene.add_mesh(&quad_mesh(60.0), texture);

    for i in 0..7 {
        let angle = i as f32 * std::f32::consts::TAU / 7.0;
        let center = Vec3::new(4.0 * angle.cos(), 0.0, 4.0 * angle.sin());
        let height = 1.0 + 0.35 * i as f32;
        scene.add_mesh(&pyramid_mesh(center, 1.2, height), texture);
    }

    scene
}

fn quad_mesh(half_extent: f32) -> Mesh {
    Mesh::new(
        vec![
            Vec3::new(-half_extent, 0.0, -half_extent),
            Vec3::new(half_extent, 0.0, -half_extent),
            Vec3::new(half_extent, 0.0, half_extent),
            Vec3::new(-half_extent, 0.0, half_extent),
        ],
        vec![0, 2, 1, 0, 3, 2],
        None,
    )
}

fn pyramid_mesh(center: Vec3, half_base: f32, height: f32) -> Mesh {
    let apex = center + Vec3::new(0.0, height, 0.0);
    let corners = [
        center + Vec3::new(-half_base, 0.0, -half_base),
        center + Vec3::new(half_base, 0.0, -half_base),
        center + Vec3::new(half_base, 0.0, half_base),
        center + Vec3::new(-half_base, 0.0, half_base),
    ];

    let mut mesh = Mesh::new(
        vec![corners[0], corners[1], corners[2], corners[3], apex],
        vec![
            0, 1, 4, // sides
            1, 2, 4,
            2, 3, 4,
            3, 0, 4,
            0, 2, 1, // base
            0, 3, 2,
        ],
        None,
    );
    mesh.compute_normals();
    mesh
}
