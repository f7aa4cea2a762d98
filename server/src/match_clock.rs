//! Timed matches: wait for players, play for a fixed duration, show results

use shared::MatchPhase;

/// Seconds the results stay up before the next match starts
pub const INTERMISSION: f32 = 10.0;

/// How often the match state is broadcast
pub const BROADCAST_INTERVAL: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct MatchClock {
    phase: MatchPhase,
    duration: f32,
    remaining: f32,
    since_broadcast: f32,
}

impl MatchClock {
    pub fn new(duration: f32) -> Self {
        Self {
            phase: MatchPhase::Waiting,
            duration,
            remaining: duration,
            since_broadcast: BROADCAST_INTERVAL,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Seconds left in the current phase
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Advances the clock. Returns the new phase when it changed.
    pub fn update(&mut self, delta_time: f32, players: usize) -> Option<MatchPhase> {
        self.since_broadcast += delta_time;

        let next = match self.phase {
            MatchPhase::Waiting if players > 0 => Some(MatchPhase::Playing),
            MatchPhase::Waiting => None,
            MatchPhase::Playing if players == 0 => Some(MatchPhase::Waiting),
            MatchPhase::Playing => {
                self.remaining = (self.remaining - delta_time).max(0.0);
                (self.remaining == 0.0).then_some(MatchPhase::Finished)
            }
            MatchPhase::Finished => {
                self.remaining = (self.remaining - delta_time).max(0.0);
                (self.remaining == 0.0).then_some(if players > 0 {
                    MatchPhase::Playing
                } else {
                    MatchPhase::Waiting
                })
            }
        }?;

        self.phase = next;
        self.remaining = match next {
            MatchPhase::Finished => INTERMISSION,
            _ => self.duration,
        };
        self.since_broadcast = BROADCAST_INTERVAL;
        Some(next)
    }

    /// True once per broadcast interval, and right after a phase change.
    pub fn should_broadcast(&mut self) -> bool {
        if self.since_broadcast >= BROADCAST_INTERVAL {
            self.since_broadcast = 0.0;
            true
        } else {
            false
        }
    }
}
