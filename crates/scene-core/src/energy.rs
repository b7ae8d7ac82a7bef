//! Scheduling guard for the per-frame energy sampling loop.
//!
//! The host owns the actual frame callback (requestAnimationFrame on the
//! web). This type only answers two questions: "should a new loop be
//! scheduled?" and "is this scheduled frame still the live one?". Stopping
//! bumps a generation counter, so a frame that was already queued when the
//! loop stopped finds its ticket stale and does nothing.

/// Proof that the holder scheduled the current loop generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTicket(u64);

#[derive(Debug, Default)]
pub struct EnergyLoop {
    running: bool,
    generation: u64,
}

impl EnergyLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a ticket only when the loop was idle; a running loop is never
    /// scheduled twice.
    pub fn start(&mut self) -> Option<FrameTicket> {
        if self.running {
            return None;
        }
        self.running = true;
        Some(FrameTicket(self.generation))
    }

    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.generation = self.generation.wrapping_add(1);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_current(&self, ticket: FrameTicket) -> bool {
        self.running && ticket.0 == self.generation
    }
}
