//! Reel scrubbing: turns a pointer drag around the reel center into tape time.
use std::f64::consts::{PI, TAU};
use std::time::{Duration, Instant};

use reel_shared::{ScrubConfig, ScrubPolicy};

/// Wrap an angle difference into (-PI, PI], the shortest signed path
pub fn wrap_angle(delta: f64) -> f64 {
    let mut d = delta % TAU;
    if d > PI {
        d -= TAU;
    } else if d <= -PI {
        d += TAU;
    }
    d
}

pub struct ScrubController {
    surface_radius: f64,
    seconds_per_rotation: f64,
    min_emit_interval: Duration,
    half_life: Duration,
    policy: ScrubPolicy,

    dragging: bool,
    grab_radius: f64,
    last_angle: f64,
    /// Accumulated reel rotation in radians, 0 = start of tape
    finger_angle: f64,
    pressed_at: Option<Instant>,
    last_emit: Option<Instant>,
    last_emitted: f64,
}

impl ScrubController {
    pub fn new(config: &ScrubConfig) -> Self {
        Self {
            surface_radius: config.surface_radius,
            seconds_per_rotation: config.seconds_per_rotation.max(0.0),
            min_emit_interval: Duration::from_millis(config.min_emit_interval_ms),
            half_life: Duration::from_millis(config.smoothing_half_life_ms),
            policy: config.policy,
            dragging: false,
            grab_radius: 0.0,
            last_angle: 0.0,
            finger_angle: 0.0,
            pressed_at: None,
            last_emit: None,
            last_emitted: 0.0,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Distance from the center where the current drag started
    pub fn grab_radius(&self) -> f64 {
        self.grab_radius
    }

    pub fn set_seconds_per_rotation(&mut self, seconds: f64) {
        self.seconds_per_rotation = seconds.max(0.0);
    }

    /// Reel rotation in radians, for drawing
    pub fn reel_angle(&self) -> f64 {
        self.finger_angle
    }

    /// Raw tape time for the current reel rotation
    pub fn tape_time(&self) -> f64 {
        self.seconds_per_rotation * self.finger_angle / TAU
    }

    /// Follow the transport while nobody is holding the reel
    pub fn sync(&mut self, tape_time: f64) {
        if self.dragging || self.seconds_per_rotation <= 0.0 {
            return;
        }
        self.finger_angle = (tape_time / self.seconds_per_rotation * TAU).max(0.0);
    }

    /// Pointer pressed. Starts a drag only inside the reel surface.
    pub fn begin(&mut self, angle: f64, radius: f64, now: Instant) -> bool {
        if !(radius <= self.surface_radius) {
            return false;
        }
        self.dragging = true;
        self.grab_radius = radius;
        self.last_angle = angle;
        self.pressed_at = Some(now);
        self.last_emit = None;
        self.last_emitted = self.tape_time();
        true
    }

    /// Pointer moved. Returns the tape time to emit, if any.
    pub fn drag(&mut self, angle: f64, now: Instant) -> Option<f64> {
        if !self.dragging {
            return None;
        }
        let delta = wrap_angle(angle - self.last_angle);
        self.last_angle = angle;
        // The tape cannot be wound past its start
        self.finger_angle = (self.finger_angle + delta).max(0.0);
        let raw = self.tape_time();

        match self.policy {
            ScrubPolicy::RateLimited => {
                if let Some(last) = self.last_emit {
                    if now.saturating_duration_since(last) < self.min_emit_interval {
                        return None;
                    }
                }
                self.emit(raw, now)
            }
            ScrubPolicy::Smoothed => {
                let since = self.last_emit.or(self.pressed_at).unwrap_or(now);
                let dt = now.saturating_duration_since(since).as_secs_f64();
                let half_life = self.half_life.as_secs_f64();
                let alpha = if half_life > 0.0 {
                    1.0 - 0.5f64.powf(dt / half_life)
                } else {
                    1.0
                };
                let smoothed = self.last_emitted + (raw - self.last_emitted) * alpha;
                self.emit(smoothed, now)
            }
        }
    }

    fn emit(&mut self, tape_time: f64, now: Instant) -> Option<f64> {
        self.last_emit = Some(now);
        self.last_emitted = tape_time;
        Some(tape_time)
    }

    /// Pointer released
    pub fn end(&mut self) {
        self.dragging = false;
        self.pressed_at = None;
    }
}
