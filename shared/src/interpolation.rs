//! Smooth rendering of entities this process does not control

use crate::math::Vector3;
use std::collections::VecDeque;

/// An authoritative position broadcast for a remote entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemotePositionSample {
    pub position: Vector3,
    pub time: f32,
}

/// Buffers broadcast positions of one remote entity and renders it one input
/// frame behind, interpolating between consecutive samples.
#[derive(Debug, Clone)]
pub struct RemoteInterpolator {
    samples: VecDeque<RemotePositionSample>,
    frame_interval: f32,
    sample_interval: f32,
    velocity_sample: RemotePositionSample,
    velocity_sampled_at: Option<f32>,
    velocity: Vector3,
}

impl RemoteInterpolator {
    pub fn new(frame_interval: f32, sample_interval: f32) -> Self {
        Self {
            samples: VecDeque::new(),
            frame_interval,
            sample_interval,
            velocity_sample: RemotePositionSample {
                position: Vector3::ZERO,
                time: 0.0,
            },
            velocity_sampled_at: None,
            velocity: Vector3::ZERO,
        }
    }

    /// Appends a broadcast sample. Samples older than the newest buffered one
    /// are out of order and dropped.
    pub fn push(&mut self, position: Vector3, time: f32) {
        if let Some(last) = self.samples.back() {
            if time <= last.time {
                return;
            }
        }
        self.samples.push_back(RemotePositionSample { position, time });
    }

    /// Forgets every buffered sample, e.g. after a respawn teleport.
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Approximate velocity, for animation only.
    pub fn velocity(&self) -> Vector3 {
        self.velocity
    }

    /// Returns the position to render at `now`, or `None` when fewer than two
    /// samples are buffered or all have expired.
    ///
    /// Expired samples (more than one frame old) are popped as a side effect.
    pub fn sample(&mut self, now: f32) -> Option<Vector3> {
        while self.samples.len() >= 2 {
            let from = self.samples[0];
            let to = self.samples[1];
            let elapsed = now - from.time;

            if elapsed >= self.frame_interval {
                self.samples.pop_front();
                continue;
            }

            self.update_velocity(to, now);
            return Some(from.position.lerp(&to.position, elapsed / self.frame_interval));
        }
        None
    }

    /// Newest buffered position, used when interpolation has run dry.
    pub fn latest(&self) -> Option<Vector3> {
        self.samples.back().map(|s| s.position)
    }

    fn update_velocity(&mut self, to: RemotePositionSample, now: f32) {
        let due = self
            .velocity_sampled_at
            .map_or(true, |at| now - at >= self.sample_interval);
        if !due {
            return;
        }
        if self.velocity_sampled_at.is_some() {
            self.velocity = (to.position - self.velocity_sample.position).scale(1.0 / self.frame_interval);
        }
        self.velocity_sampled_at = Some(now);
        self.velocity_sample = to;
    }
}
