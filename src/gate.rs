use std::cell::Cell;

/// Identifies one in-flight request issued through a [`RequestGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Last-write-wins guard for one request target. Every new request
/// supersedes the previous ones; only the holder of the latest ticket may
/// apply its result.
#[derive(Debug, Default)]
pub struct RequestGate {
    latest: Cell<u64>,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        let next = self.latest.get().wrapping_add(1);
        self.latest.set(next);
        Ticket(next)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.get() == ticket.0
    }
}
