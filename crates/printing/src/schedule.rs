use std::time::Duration;

use serde::Serialize;

/// Shortest interval a repeating timer may use.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Handle to a scheduled timer. Cancelling it guarantees it never fires
/// again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Ticket(u64);

#[derive(Debug, Clone)]
struct Timer<E> {
    ticket: Ticket,
    deadline: Duration,
    interval: Option<Duration>,
    event: E,
}

/// Timer set driven by a virtual clock.
///
/// Nothing fires on its own: the owner advances time and receives the due
/// events in deadline order. Timers sharing a deadline fire in the order they
/// were scheduled.
#[derive(Debug, Clone)]
pub struct Scheduler<E> {
    now: Duration,
    next_ticket: u64,
    timers: Vec<Timer<E>>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_ticket: 1,
            timers: Vec::new(),
        }
    }
}

impl<E: Clone> Scheduler<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    pub fn is_scheduled(&self, ticket: Ticket) -> bool {
        self.timers.iter().any(|timer| timer.ticket == ticket)
    }

    pub fn schedule_once(&mut self, delay: Duration, event: E) -> Ticket {
        self.insert(delay, None, event)
    }

    pub fn schedule_every(&mut self, interval: Duration, event: E) -> Ticket {
        let interval = interval.max(MIN_INTERVAL);
        self.insert(interval, Some(interval), event)
    }

    fn insert(&mut self, delay: Duration, interval: Option<Duration>, event: E) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.timers.push(Timer {
            ticket,
            deadline: self.now + delay,
            interval,
            event,
        });
        ticket
    }

    /// Returns `false` when the ticket already fired (one-shot) or was
    /// cancelled before.
    pub fn cancel(&mut self, ticket: Ticket) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.ticket != ticket);
        self.timers.len() != before
    }

    /// Fires the earliest timer due at or before `until`, moving the clock to
    /// its deadline. Returns `None` once nothing is due; the clock is then
    /// left at `until`.
    ///
    /// Callers that react to events by cancelling other timers should use
    /// this instead of [`Scheduler::advance`], so a cancellation takes effect
    /// before the next event is picked.
    pub fn fire_next(&mut self, until: Duration) -> Option<(Ticket, E)> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.deadline <= until)
            .min_by_key(|(_, timer)| (timer.deadline, timer.ticket))
            .map(|(index, _)| index);

        let Some(index) = index else {
            self.now = self.now.max(until);
            return None;
        };

        let timer = &mut self.timers[index];
        self.now = self.now.max(timer.deadline);
        let fired = (timer.ticket, timer.event.clone());
        match timer.interval {
            Some(interval) => timer.deadline += interval,
            None => drop(self.timers.remove(index)),
        }
        Some(fired)
    }

    /// Advances the clock by `by` and returns every event that came due.
    pub fn advance(&mut self, by: Duration) -> Vec<E> {
        let until = self.now + by;
        let mut fired = Vec::new();
        while let Some((_, event)) = self.fire_next(until) {
            fired.push(event);
        }
        fired
    }
}
