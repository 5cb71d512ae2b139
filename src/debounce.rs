/// Single-slot debounce
///
/// Each `arm` supersedes the previous one and hands out a fresh ticket. Only
/// the wake-up holding the latest ticket fires; stale wake-ups do nothing.
/// Firing never consults a clock, so a timer that wakes early still runs the
/// save it was scheduled for.
#[derive(Debug, Clone, PartialEq)]
pub struct Debouncer {
    window_ms: u32,
    generation: u64,
    armed: bool,
}

/// Proof of one `arm` call, redeemed by the matching wake-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTicket {
    generation: u64,
    /// How long the holder should wait before redeeming
    pub delay_ms: u32,
}

impl Debouncer {
    pub fn new(window_ms: u32) -> Self {
        Debouncer {
            window_ms,
            generation: 0,
            armed: false,
        }
    }

    /// (Re)start the window, invalidating every earlier ticket
    pub fn arm(&mut self) -> DebounceTicket {
        self.generation += 1;
        self.armed = true;
        DebounceTicket {
            generation: self.generation,
            delay_ms: self.window_ms,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Disarm and return true if `ticket` is the latest one issued
    pub fn take_if_current(&mut self, ticket: DebounceTicket) -> bool {
        if self.armed && ticket.generation == self.generation {
            self.armed = false;
            true
        } else {
            false
        }
    }
}
