/*
 * Frame Driver Module
 *
 * Bridges a render loop (or a headless runner) to the simulation. Each call
 * to `frame` measures the wall-clock time since the previous frame, scales
 * it by the speed multiplier and ticks the simulation once with that dt.
 * Pausing keeps frames flowing with a zero dt and no physics.
 */

use std::time::{Duration, Instant};

use crate::config::DriverConfig;
use crate::error::Result;
use crate::physics::TickSummary;
use crate::simulation::Simulation;

pub const MAX_SPEED_MULTIPLIER: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub dt: f32,
    pub physics_ran: bool,
    pub summary: TickSummary,
    // When the caller should run the next frame
    pub next_deadline: Instant,
}

#[derive(Debug, Clone)]
pub struct FrameDriver {
    frame_interval: Duration,
    speed_multiplier: f32,
    paused: bool,
    last_frame: Option<Instant>,
    frames: u64,
}

impl FrameDriver {
    pub fn new(config: &DriverConfig) -> Self {
        let default_rate = DriverConfig::default().frame_rate;
        let frame_rate = if config.frame_rate.is_finite() && config.frame_rate > 0.0 {
            config.frame_rate
        } else {
            default_rate
        };
        // Rates so low the interval overflows a Duration fall back as well
        let frame_interval = Duration::try_from_secs_f32(1.0 / frame_rate).unwrap_or_else(|_| {
            tracing::warn!(frame_rate, "frame rate out of range, using the default");
            Duration::from_secs_f32(1.0 / default_rate)
        });

        let mut driver = Self {
            frame_interval,
            speed_multiplier: 1.0,
            paused: config.start_paused,
            last_frame: None,
            frames: 0,
        };
        driver.set_speed_multiplier(config.speed_multiplier);
        driver
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    // Clamped to [0, MAX_SPEED_MULTIPLIER]; NaN leaves the multiplier alone
    pub fn set_speed_multiplier(&mut self, multiplier: f32) {
        if multiplier.is_nan() {
            return;
        }
        self.speed_multiplier = multiplier.clamp(0.0, MAX_SPEED_MULTIPLIER);
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    // Run one frame at `now`. The first frame has no predecessor and uses
    // the nominal frame interval.
    pub fn frame(&mut self, sim: &mut Simulation, now: Instant) -> Result<FrameReport> {
        let elapsed = match self.last_frame {
            Some(previous) => now.saturating_duration_since(previous),
            None => self.frame_interval,
        };
        self.last_frame = Some(now);
        self.frames += 1;

        let dt = if self.paused {
            0.0
        } else {
            elapsed.as_secs_f32() * self.speed_multiplier
        };

        let physics_ran = dt > 0.0;
        let summary = if physics_ran { sim.tick(dt)? } else { TickSummary::default() };

        tracing::trace!(frame = self.frames, dt, physics_ran, "frame");
        Ok(FrameReport {
            frame: self.frames,
            dt,
            physics_ran,
            summary,
            next_deadline: now + self.frame_interval,
        })
    }
}
