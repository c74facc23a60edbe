//! Simulation timing and delta time.
//!
//! The [`Time`] resource is updated by the scheduler before each phase runs.
//! Systems read [`Time::delta_secs`] and get the right step for whatever
//! phase they are in: the constant fixed delta inside `fixed`, the frame
//! delta inside `simulation` and `draw`.
//!
//! Time here is driven entirely by the deltas handed to
//! [`Runtime::step`](crate::Runtime::step); nothing reads a wall clock, so a
//! simulation replays identically from the same inputs.

/// Frame timing resource. Inserted by the runtime and updated every tick.
#[derive(Debug, Clone, Copy)]
pub struct Time {
    /// Delta seen by the phase currently running.
    delta: f32,
    /// Delta of the current frame, as passed to `step` (after clamping).
    frame_delta: f32,
    /// The constant step used by the fixed phase.
    fixed_delta: f32,
    /// Total simulated time.
    elapsed: f64,
    /// Frame counter.
    frame_count: u64,
    /// Number of fixed steps run so far.
    fixed_step_count: u64,
    in_fixed_step: bool,
}

impl Time {
    pub(crate) fn new(fixed_delta: f32) -> Self {
        Self {
            delta: 0.0,
            frame_delta: 0.0,
            fixed_delta,
            elapsed: 0.0,
            frame_count: 0,
            fixed_step_count: 0,
            in_fixed_step: false,
        }
    }

    /// Called at the start of each frame.
    pub(crate) fn begin_frame(&mut self, frame_delta: f32) {
        self.frame_delta = frame_delta;
        self.delta = frame_delta;
        self.elapsed += f64::from(frame_delta);
        self.frame_count += 1;
        self.in_fixed_step = false;
    }

    pub(crate) fn set_fixed_delta(&mut self, fixed_delta: f32) {
        self.fixed_delta = fixed_delta;
    }

    pub(crate) fn begin_fixed_step(&mut self) {
        self.delta = self.fixed_delta;
        self.fixed_step_count += 1;
        self.in_fixed_step = true;
    }

    pub(crate) fn end_fixed_steps(&mut self) {
        self.delta = self.frame_delta;
        self.in_fixed_step = false;
    }

    /// Delta time in seconds for the running phase.
    pub fn delta_secs(&self) -> f32 {
        self.delta
    }

    /// This frame's delta regardless of phase.
    pub fn frame_delta_secs(&self) -> f32 {
        self.frame_delta
    }

    /// The fixed-phase step length.
    pub fn fixed_delta_secs(&self) -> f32 {
        self.fixed_delta
    }

    /// Total simulated time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed
    }

    /// Number of frames stepped so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn fixed_step_count(&self) -> u64 {
        self.fixed_step_count
    }

    /// `true` while fixed-phase systems are running.
    pub fn in_fixed_step(&self) -> bool {
        self.in_fixed_step
    }
}
