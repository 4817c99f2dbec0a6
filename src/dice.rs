//! Dice rolling and delayed reveal.
//!
//! `roll` is stateless. `RollTracker` gives every on-screen roller (a
//! "channel") a cancellable pending reveal: starting a new roll on a channel
//! invalidates the previous ticket, so a late reveal request for the old
//! ticket renders nothing instead of overwriting the newer result.

use rand::Rng;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CompanionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DieKind {
    /// One six-sided die, 1..=6.
    D6,
    /// Sum of two d6, 2..=12.
    TwoD6,
    /// Two d6 read as tens and units, 11..=66 with both digits in 1..=6.
    D66,
}

impl DieKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DieKind::D6 => "d6",
            DieKind::TwoD6 => "2d6",
            DieKind::D66 => "d66",
        }
    }
}

impl fmt::Display for DieKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DieKind {
    type Err = CompanionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "d6" => Ok(DieKind::D6),
            "2d6" => Ok(DieKind::TwoD6),
            "d66" => Ok(DieKind::D66),
            other => Err(CompanionError::UnknownDie(other.to_string())),
        }
    }
}

fn d6<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.gen_range(1..=6)
}

/// Roll a die of the given kind.
pub fn roll<R: Rng + ?Sized>(kind: DieKind, rng: &mut R) -> u8 {
    match kind {
        DieKind::D6 => d6(rng),
        DieKind::TwoD6 => d6(rng) + d6(rng),
        DieKind::D66 => {
            let tens = d6(rng);
            let units = d6(rng);
            tens * 10 + units
        }
    }
}

/// Handle for one pending reveal on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollTicket(pub u64);

/// Channels not rolled on within this many tickets are forgotten.
const CHANNEL_RETENTION: u64 = 256;

#[derive(Debug, Default)]
struct Channel {
    pending: Option<(RollTicket, DieKind)>,
    displayed: Option<u8>,
    last_ticket: u64,
}

#[derive(Debug, Default)]
pub struct RollTracker {
    next_ticket: u64,
    channels: HashMap<String, Channel>,
}

impl RollTracker {
    /// Start a roll on `channel`, cancelling whatever was pending there.
    /// The displayed result is cleared until the new ticket is revealed.
    pub fn begin(&mut self, channel: &str, kind: DieKind) -> RollTicket {
        self.next_ticket += 1;
        let ticket = RollTicket(self.next_ticket);
        let entry = self.channels.entry(channel.to_string()).or_default();
        if let Some((old, _)) = entry.pending.replace((ticket, kind)) {
            tracing::debug!(channel, old = old.0, new = ticket.0, "pending roll superseded");
        }
        entry.displayed = None;
        entry.last_ticket = ticket.0;
        if self.channels.len() as u64 > CHANNEL_RETENTION {
            let cutoff = ticket.0.saturating_sub(CHANNEL_RETENTION);
            self.channels.retain(|_, c| c.last_ticket > cutoff);
        }
        ticket
    }

    /// Settle `ticket`. Returns the rolled value only if the ticket is still
    /// the live one for `channel`.
    pub fn reveal<R: Rng + ?Sized>(
        &mut self,
        channel: &str,
        ticket: RollTicket,
        rng: &mut R,
    ) -> Option<u8> {
        let entry = self.channels.get_mut(channel)?;
        match entry.pending {
            Some((live, kind)) if live == ticket => {
                let value = roll(kind, rng);
                entry.pending = None;
                entry.displayed = Some(value);
                Some(value)
            }
            _ => None,
        }
    }

    /// Drop the pending reveal on `channel`, if any.
    pub fn cancel(&mut self, channel: &str) {
        if let Some(entry) = self.channels.get_mut(channel) {
            entry.pending = None;
        }
    }

    pub fn displayed(&self, channel: &str) -> Option<u8> {
        self.channels.get(channel).and_then(|c| c.displayed)
    }

    pub fn is_pending(&self, channel: &str) -> bool {
        self.pending_ticket(channel).is_some()
    }

    /// Live ticket on `channel`, if a reveal is outstanding.
    pub fn pending_ticket(&self, channel: &str) -> Option<RollTicket> {
        self.channels
            .get(channel)
            .and_then(|c| c.pending.map(|(ticket, _)| ticket))
    }
}

thread_local! {
    static ROLLS: RefCell<RollTracker> = RefCell::new(RollTracker::default());
}

pub fn with_rolls<F, R>(f: F) -> R
where
    F: FnOnce(&RollTracker) -> R,
{
    ROLLS.with(|r| f(&r.borrow()))
}

pub fn with_rolls_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut RollTracker) -> R,
{
    ROLLS.with(|r| f(&mut r.borrow_mut()))
}

pub fn reset_rolls() {
    ROLLS.with(|r| *r.borrow_mut() = RollTracker::default());
}
