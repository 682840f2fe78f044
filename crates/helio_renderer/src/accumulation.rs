//! Progressive accumulation control.
//!
//! The renderer averages one new sample per pixel per frame until the
//! pixel estimate converges. The accumulator owns the two counters that
//! drive this: a session-long frame counter (seeds the backend's
//! per-frame randomness) and the number of samples already accumulated,
//! which must drop back to zero whenever anything that affects the image
//! changes.

use helio_core::sky::SkyParams;
use helio_math::UVec2;

use crate::camera::Camera;

/// Per-frame sampling limits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplingParams {
    /// Accumulation target; progress saturates here
    pub samples_per_pixel: u32,
    /// Path depth used by the integrator
    pub num_bounces: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            samples_per_pixel: 128,
            num_bounces: 4,
        }
    }
}

/// Everything that affects the rendered image, compared structurally.
///
/// A changed value - any field - invalidates the accumulated estimate.
/// Captured by value before a frame is dispatched so a concurrent edit
/// cannot tear the comparison.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderParameters {
    pub framebuffer_size: UVec2,
    pub camera: Camera,
    pub sampling: SamplingParams,
    pub sky: SkyParams,
    pub exposure: f32,
}

/// Counters a frame should be rendered with.
///
/// `accumulated_samples` is the number of samples already in the estimate
/// (0 on the first frame after a reset); `frame_number` starts at 0 and
/// never repeats within a session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameState {
    pub frame_number: u32,
    pub accumulated_samples: u32,
}

/// Convergence state machine for the progressive estimator.
///
/// Accumulating while `accumulated_samples() < samples_per_pixel`,
/// converged once they are equal. Owns nothing but its counters; all
/// transitions happen in [`SampleAccumulator::begin_frame`].
#[derive(Debug)]
pub struct SampleAccumulator {
    params: RenderParameters,
    frame_count: u32,
    accumulated_samples: u32,
}

impl SampleAccumulator {
    pub fn new(params: RenderParameters) -> Self {
        Self {
            params,
            frame_count: 0,
            accumulated_samples: 0,
        }
    }

    /// Advance one frame.
    ///
    /// If `params` differs structurally from the previous frame the
    /// accumulated estimate is stale: the sample counter resets before the
    /// frame is processed. Otherwise it counts one more sample, saturating
    /// at `samples_per_pixel`. The frame counter increments regardless and
    /// is never part of the comparison.
    pub fn begin_frame(&mut self, params: &RenderParameters) -> FrameState {
        if *params != self.params {
            self.params = *params;
            self.accumulated_samples = 0; // reset the temporal accumulation
        }

        let state = FrameState {
            frame_number: self.frame_count,
            accumulated_samples: self.accumulated_samples,
        };

        self.frame_count += 1;
        self.accumulated_samples =
            (self.accumulated_samples + 1).min(self.params.sampling.samples_per_pixel);

        state
    }

    /// Samples accumulated so far, in `[0, samples_per_pixel]`.
    pub fn accumulated_samples(&self) -> u32 {
        self.accumulated_samples
    }

    /// Frames begun this session.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// The parameters the estimate is valid for.
    pub fn render_parameters(&self) -> &RenderParameters {
        &self.params
    }

    pub fn is_converged(&self) -> bool {
        self.accumulated_samples == self.params.sampling.samples_per_pixel
    }

    /// Convergence progress in `[0, 100]`.
    pub fn progress_percentage(&self) -> f32 {
        100.0 * self.accumulated_samples as f32 / self.params.sampling.samples_per_pixel as f32
    }
}
