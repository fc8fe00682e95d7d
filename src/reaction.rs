//! Single-slot reaction overlay.
//!
//! ```text
//! Empty ──show──▶ Active ──expiry──▶ Empty
//!                   │  ▲
//!                   └──┘ show (supersedes immediately)
//! ```
//!
//! Newer reactions replace older ones outright; nothing is queued.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub description: String,
    pub created_at: Instant,
}

#[derive(Debug)]
enum Slot {
    Empty,
    Active {
        reaction: Reaction,
        expires_at: Instant,
        generation: u64,
    },
}

#[derive(Debug)]
pub struct ReactionController {
    slot: Slot,
    display: Duration,
    generation: u64,
}

impl ReactionController {
    pub fn new(display: Duration) -> Self {
        Self {
            slot: Slot::Empty,
            display,
            generation: 0,
        }
    }

    pub fn display_duration(&self) -> Duration {
        self.display
    }

    /// Activate a reaction, replacing any current one. Returns the
    /// generation the caller's expiry timer must carry.
    pub fn show(&mut self, description: impl Into<String>, now: Instant) -> u64 {
        self.generation += 1;
        let reaction = Reaction {
            description: description.into(),
            created_at: now,
        };
        if let Slot::Active { reaction: old, .. } = &self.slot {
            tracing::debug!(old = %old.description, "reaction superseded");
        }
        self.slot = Slot::Active {
            reaction,
            expires_at: now + self.display,
            generation: self.generation,
        };
        self.generation
    }

    /// Timer callback. Ignored unless `generation` is still the active one
    /// and its deadline has passed.
    pub fn expire(&mut self, generation: u64, now: Instant) -> bool {
        match &self.slot {
            Slot::Active {
                expires_at,
                generation: active,
                ..
            } if *active == generation && now >= *expires_at => {
                self.slot = Slot::Empty;
                true
            }
            _ => false,
        }
    }

    /// Clear the slot if its deadline has passed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match &self.slot {
            Slot::Active { expires_at, .. } if now >= *expires_at => {
                self.slot = Slot::Empty;
                true
            }
            _ => false,
        }
    }

    /// The visible reaction at `now`, if any.
    pub fn active(&self, now: Instant) -> Option<&Reaction> {
        match &self.slot {
            Slot::Active {
                reaction,
                expires_at,
                ..
            } if now < *expires_at => Some(reaction),
            _ => None,
        }
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match &self.slot {
            Slot::Active { expires_at, .. } => expires_at.checked_duration_since(now),
            Slot::Empty => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIX: Duration = Duration::from_secs(6);

    #[test]
    fn starts_empty() {
        let ctl = ReactionController::new(SIX);
        assert!(ctl.active(Instant::now()).is_none());
    }

    #[test]
    fn latest_wins_without_queueing() {
        let t0 = Instant::now();
        let mut ctl = ReactionController::new(SIX);
        let g1 = ctl.show("first", t0);
        let g2 = ctl.show("second", t0 + Duration::from_secs(1));
        assert_ne!(g1, g2);

        let visible = ctl.active(t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(visible.description, "second");

        // first's timer fires: no effect on second
        assert!(!ctl.expire(g1, t0 + SIX));
        assert_eq!(ctl.active(t0 + SIX).unwrap().description, "second");

        // second expires on its own schedule, and nothing from the first comes back
        assert!(ctl.expire(g2, t0 + Duration::from_secs(7)));
        assert!(ctl.active(t0 + Duration::from_secs(7)).is_none());
    }

    #[test]
    fn expires_exactly_at_display_duration() {
        let t0 = Instant::now();
        let mut ctl = ReactionController::new(SIX);
        let g = ctl.show("hi", t0);

        let just_before = t0 + SIX - Duration::from_millis(1);
        assert!(ctl.active(just_before).is_some());
        assert!(!ctl.expire(g, just_before));
        assert!(!ctl.tick(just_before));

        assert!(ctl.active(t0 + SIX).is_none());
        assert!(ctl.expire(g, t0 + SIX));
    }

    #[test]
    fn tick_clears_after_deadline() {
        let t0 = Instant::now();
        let mut ctl = ReactionController::new(SIX);
        ctl.show("hi", t0);
        assert!(ctl.tick(t0 + Duration::from_secs(10)));
        assert!(!ctl.tick(t0 + Duration::from_secs(11)));
        assert_eq!(ctl.remaining(t0), None);
    }

    #[test]
    fn supersession_restarts_the_clock() {
        let t0 = Instant::now();
        let mut ctl = ReactionController::new(SIX);
        ctl.show("a", t0);
        ctl.show("b", t0 + Duration::from_secs(5));
        assert_eq!(
            ctl.remaining(t0 + Duration::from_secs(5)),
            Some(SIX)
        );
        assert!(ctl.active(t0 + Duration::from_secs(10)).is_some());
    }
}
