//! Analytic sky dome radiance model.
//!
//! Builds a [`SkyState`] - 9 radiance-distribution coefficients plus a sky
//! and a solar radiance scalar per RGB channel - from three physical
//! inputs: solar elevation, atmospheric turbidity and ground albedo. The
//! coefficients come from dataset tables sampled at 10 turbidity levels and
//! 2 albedo extremes, interpolated with a quintic Bernstein polynomial in a
//! remapped elevation parameter and blended bilinearly across the
//! turbidity/albedo grid.
//!
//! Construction validates its inputs; evaluation is a pure function of the
//! state and is safe to call from any number of threads.

mod data;

use std::f32::consts::{FRAC_PI_2, PI};

use helio_math::Vec3;
use thiserror::Error;

/// Errors produced by [`SkyState::new`] for out-of-range parameters.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SkyError {
    #[error("sun elevation {0} is outside [0, pi] radians")]
    ElevationOutOfRange(f32),

    #[error("turbidity {0} is outside [1, 10]")]
    TurbidityOutOfRange(f32),

    #[error("albedo component {0} is outside [0, 1]")]
    AlbedoOutOfRange(f32),
}

/// Physical inputs of the sky model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyParams {
    /// Solar elevation above the horizon, in radians. Must be in `[0, pi]`.
    pub elevation: f32,

    /// Atmospheric haziness. Must be in `[1, 10]`.
    pub turbidity: f32,

    /// Ground albedo per RGB channel. Each component must be in `[0, 1]`.
    pub albedo: [f32; 3],
}

impl Default for SkyParams {
    fn default() -> Self {
        // Clear sky, bright ground, sun 60 degrees above the horizon.
        Self {
            elevation: FRAC_PI_2 - 30.0_f32.to_radians(),
            turbidity: 1.0,
            albedo: [1.0, 1.0, 1.0],
        }
    }
}

/// Color channel selector for radiance evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    R = 0,
    G = 1,
    B = 2,
}

/// Radiance distribution state derived from [`SkyParams`].
///
/// A plain value: 27 shape coefficients (9 per channel) plus sky and solar
/// radiance scalars per channel. Field order matches the layout uploaded to
/// rendering backends.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyState {
    pub params: [f32; 27],
    pub sky_radiance: [f32; 3],
    pub solar_radiance: [f32; 3],
}

impl SkyState {
    /// Derive the radiance state for the given parameters.
    ///
    /// Fails with a distinct error per out-of-range input; an unconstructed
    /// state can never be evaluated.
    pub fn new(params: &SkyParams) -> Result<SkyState, SkyError> {
        let SkyParams {
            elevation,
            turbidity,
            albedo,
        } = *params;

        if !(0.0..=PI).contains(&elevation) {
            return Err(SkyError::ElevationOutOfRange(elevation));
        }
        if !(1.0..=10.0).contains(&turbidity) {
            return Err(SkyError::TurbidityOutOfRange(turbidity));
        }
        for component in albedo {
            if !(0.0..=1.0).contains(&component) {
                return Err(SkyError::AlbedoOutOfRange(component));
            }
        }

        // Remap elevation so dataset resolution concentrates near the
        // horizon, where the radiance function varies fastest.
        let t = (elevation / FRAC_PI_2).powf(1.0 / 3.0);

        let mut state = SkyState {
            params: [0.0; 27],
            sky_radiance: [0.0; 3],
            solar_radiance: [0.0; 3],
        };

        let channel_params = [&data::PARAMS_R, &data::PARAMS_G, &data::PARAMS_B];
        let sky_tables = [
            &data::SKY_RADIANCE_R,
            &data::SKY_RADIANCE_G,
            &data::SKY_RADIANCE_B,
        ];
        let solar_tables = [
            &data::SOLAR_RADIANCE_R,
            &data::SOLAR_RADIANCE_G,
            &data::SOLAR_RADIANCE_B,
        ];

        for channel in 0..3 {
            init_params(
                &mut state.params[9 * channel..9 * (channel + 1)],
                channel_params[channel],
                turbidity,
                albedo[channel],
                t,
            );
            state.sky_radiance[channel] =
                blend_radiance(sky_tables[channel], turbidity, albedo[channel], t);
            state.solar_radiance[channel] =
                blend_radiance(solar_tables[channel], turbidity, albedo[channel], t);
        }

        Ok(state)
    }

    /// Evaluate sky radiance for a view direction.
    ///
    /// `theta` is the angle from the zenith, `gamma` the angle from the sun
    /// direction, both in radians. Finite over the whole domain; the
    /// near-grazing singularity at the horizon is damped by the `+0.01`
    /// term in the zenith falloff.
    pub fn radiance(&self, theta: f32, gamma: f32, channel: Channel) -> f32 {
        let channel_idx = channel as usize;
        let r = self.sky_radiance[channel_idx];
        let p = &self.params[9 * channel_idx..9 * (channel_idx + 1)];

        let cos_gamma = gamma.cos();
        let cos_gamma2 = cos_gamma * cos_gamma;
        let cos_theta = theta.cos().abs();

        let exp_m = (p[4] * gamma).exp();
        let ray_m = cos_gamma2;
        let mie_m = (1.0 + cos_gamma2) / (1.0 + p[8] * p[8] - 2.0 * p[8] * cos_gamma).powf(1.5);
        let zenith = cos_theta.sqrt();

        let radiance_lhs = 1.0 + p[0] * (p[1] / (cos_theta + 0.01)).exp();
        let radiance_rhs = p[2] + p[3] * exp_m + p[5] * ray_m + p[6] * mie_m + p[7] * zenith;

        r * radiance_lhs * radiance_rhs
    }
}

/// World-space unit vector toward the sun given its spherical angles.
///
/// `zenith` is measured from straight up, `azimuth` counter-clockwise from
/// +X, with +Y up; matches the direction uploaded alongside the sky state.
pub fn sun_direction(zenith: f32, azimuth: f32) -> Vec3 {
    Vec3::new(
        zenith.sin() * azimuth.cos(),
        zenith.cos(),
        -zenith.sin() * azimuth.sin(),
    )
    .normalize()
}

/// Quintic Bernstein interpolation over 6 control points spaced `stride`
/// apart in `data`.
fn quintic(data: &[f32], stride: usize, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t2 * t2;
    let t5 = t4 * t;

    let inv_t = 1.0 - t;
    let inv_t2 = inv_t * inv_t;
    let inv_t3 = inv_t2 * inv_t;
    let inv_t4 = inv_t2 * inv_t2;
    let inv_t5 = inv_t4 * inv_t;

    data[0] * inv_t5
        + data[stride] * 5.0 * inv_t4 * t
        + data[2 * stride] * 10.0 * inv_t3 * t2
        + data[3 * stride] * 10.0 * inv_t2 * t3
        + data[4 * stride] * 5.0 * inv_t * t4
        + data[5 * stride] * t5
}

/// Bilinear weights over the (turbidity, albedo) dataset grid.
///
/// Returns the two turbidity slice indices (0-based into the 10 stored
/// levels) and the four blend weights.
fn dataset_weights(turbidity: f32, albedo: f32) -> (usize, usize, [f32; 4]) {
    let turbidity_int = turbidity.trunc() as usize;
    let turbidity_rem = turbidity.fract();
    let turbidity_min = turbidity_int.saturating_sub(1);
    let turbidity_max = turbidity_int.min(9);

    let s0 = (1.0 - albedo) * (1.0 - turbidity_rem);
    let s1 = (1.0 - albedo) * turbidity_rem;
    let s2 = albedo * (1.0 - turbidity_rem);
    let s3 = albedo * turbidity_rem;

    (turbidity_min, turbidity_max, [s0, s1, s2, s3])
}

/// Blend the 9 shape coefficients for one channel.
///
/// `data` layout: `[albedo][turbidity][control point][coefficient]`, i.e.
/// 540 floats per albedo slice, 54 per turbidity level, stride 9 between
/// control points of one coefficient.
fn init_params(out: &mut [f32], data: &[f32; 1080], turbidity: f32, albedo: f32, t: f32) {
    let (turbidity_min, turbidity_max, s) = dataset_weights(turbidity, albedo);

    let p0 = &data[9 * 6 * turbidity_min..];
    let p1 = &data[9 * 6 * turbidity_max..];
    let p2 = &data[9 * 6 * 10 + 9 * 6 * turbidity_min..];
    let p3 = &data[9 * 6 * 10 + 9 * 6 * turbidity_max..];

    for i in 0..9 {
        out[i] = s[0] * quintic(&p0[i..], 9, t)
            + s[1] * quintic(&p1[i..], 9, t)
            + s[2] * quintic(&p2[i..], 9, t)
            + s[3] * quintic(&p3[i..], 9, t);
    }
}

/// Blend one radiance scalar for one channel.
///
/// `data` layout: `[albedo][turbidity][control point]`, 60 floats per
/// albedo slice, 6 per turbidity level, stride 1.
fn blend_radiance(data: &[f32; 120], turbidity: f32, albedo: f32, t: f32) -> f32 {
    let (turbidity_min, turbidity_max, s) = dataset_weights(turbidity, albedo);

    let p0 = &data[6 * turbidity_min..];
    let p1 = &data[6 * turbidity_max..];
    let p2 = &data[6 * 10 + 6 * turbidity_min..];
    let p3 = &data[6 * 10 + 6 * turbidity_max..];

    s[0] * quintic(p0, 1, t)
        + s[1] * quintic(p1, 1, t)
        + s[2] * quintic(p2, 1, t)
        + s[3] * quintic(p3, 1, t)
}
