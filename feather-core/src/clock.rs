use std::time::{Duration, Instant};

/// Fixed-timestep frame clock.
///
/// Turns a target framerate into a constant `dt` and paces a frame loop,
/// sleeping away whatever is left of each frame's budget.
#[derive(Debug, Clone)]
pub struct FrameClock {
    frame_duration: Duration,
    paced: bool,
    frame_start: Option<Instant>,
}

impl FrameClock {
    /// A clock that sleeps between frames to hold `framerate` frames per second.
    ///
    /// `framerate` must be non-zero; the configuration layer rejects zero.
    pub fn new(framerate: u32) -> Self {
        Self {
            frame_duration: Duration::from_secs_f64(1.0 / framerate.max(1) as f64),
            paced: true,
            frame_start: None,
        }
    }

    /// Same fixed `dt`, but never sleeps. Used for headless batch runs and benchmarks.
    pub fn unpaced(framerate: u32) -> Self {
        Self {
            paced: false,
            ..Self::new(framerate)
        }
    }

    /// Simulation time step in seconds.
    pub fn dt(&self) -> f32 {
        self.frame_duration.as_secs_f32()
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    pub fn is_paced(&self) -> bool {
        self.paced
    }

    /// Marks the start of a frame.
    pub fn begin_frame(&mut self) {
        self.frame_start = Some(Instant::now());
    }

    /// Ends the current frame, sleeping out the rest of the budget if paced.
    ///
    /// Returns how far the frame ran over budget, if it did.
    pub fn finish_frame(&mut self) -> Option<Duration> {
        let elapsed = self.frame_start.take()?.elapsed();

        if elapsed > self.frame_duration {
            return Some(elapsed - self.frame_duration);
        }

        if self.paced {
            spin_sleep::sleep(self.frame_duration - elapsed);
        }
        None
    }
}
