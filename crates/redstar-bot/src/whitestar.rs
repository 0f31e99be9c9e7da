//! WhiteStar events and ship readiness.
//!
//! A WhiteStar is a time-boxed event bound to one channel. Its name comes
//! from the channel name (`ws-alpha` → `alpha`), its deadline is the "nova
//! time", and it tracks when each friendly pilot's and each enemy's ships are
//! ready again.
//!
//! # Ship slots
//!
//! Every pilot has two slots: the main slot holds the battleship, the support
//! slot holds a transport or miner. A slot has an optional ship in play and an
//! optional time at which it is ready again.
//!
//! # Lifecycle
//!
//! Events are created by `ws add`, updated by `ws ship` and the periodic
//! status tick, and removed 30 seconds after the deadline, when their channel
//! disappears, or by `ws remove`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::{ChannelId, MemberId, MessageId, RoleId};
use crate::table::{Align, Table};
use crate::timefmt;

/// Grace period after the deadline before an event is over.
pub const GRACE_SECS: i64 = 30;

/// Shortest accepted time to the deadline.
pub const MIN_DURATION_SECS: i64 = 60;

/// Longest accepted time to the deadline.
pub const MAX_DURATION_SECS: i64 = 5 * 86_400;

/// Longest pilot name shown in ship tables.
const NAME_WIDTH: usize = 11;

/// Event name from a channel name: the trailing `-<letters><digits>` part.
///
/// ```
/// use redstar_bot::whitestar::event_name;
///
/// assert_eq!(event_name("ws-alpha2").as_deref(), Some("alpha2"));
/// assert_eq!(event_name("general"), None);
/// ```
#[must_use]
pub fn event_name(channel_name: &str) -> Option<String> {
    let (_, tail) = channel_name.rsplit_once('-')?;
    let letters = tail.trim_end_matches(|c: char| c.is_ascii_digit());
    let valid = !letters.is_empty() && letters.chars().all(|c| c.is_ascii_alphabetic());
    valid.then(|| tail.to_string())
}

// =============================================================================
// Ships
// =============================================================================

/// Ship type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipKind {
    /// Battleship, the main slot.
    Battleship,
    /// Transport, a support ship.
    Transport,
    /// Miner, a support ship.
    Miner,
}

impl ShipKind {
    /// Recognises a ship word. The flag is set for flagship words.
    #[must_use]
    pub fn from_word(word: &str) -> Option<(Self, bool)> {
        match word {
            "bs" | "bat" | "battleship" => Some((Self::Battleship, false)),
            "fs" | "flagship" => Some((Self::Battleship, true)),
            "ts" | "tr" | "tran" | "trans" | "transport" => Some((Self::Transport, false)),
            "ms" | "mn" | "mr" | "min" | "miner" => Some((Self::Miner, false)),
            _ => None,
        }
    }

    /// One-letter marker used in ship tables.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Battleship => 'b',
            Self::Transport => 't',
            Self::Miner => 'm',
        }
    }

    /// True for the ship of the main slot.
    #[must_use]
    pub const fn is_main(self) -> bool {
        matches!(self, Self::Battleship)
    }
}

/// Readiness of one pilot's two slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipStatus {
    /// Battleship in play.
    #[serde(default)]
    pub main_ship: Option<ShipKind>,
    /// When the main slot is ready again.
    #[serde(default)]
    pub main_ready_at: Option<DateTime<Utc>>,
    /// Support ship in play.
    #[serde(default)]
    pub support_ship: Option<ShipKind>,
    /// When the support slot is ready again.
    #[serde(default)]
    pub support_ready_at: Option<DateTime<Utc>>,
}

impl ShipStatus {
    /// Forgets ready times already passed. Returns true if any was cleared.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        let mut cleared = false;
        for ready_at in [&mut self.main_ready_at, &mut self.support_ready_at] {
            if ready_at.is_some_and(|at| at <= now) {
                *ready_at = None;
                cleared = true;
            }
        }
        cleared
    }

    /// Table cells: main slot, then support slot.
    #[must_use]
    pub fn cells(&self, now: DateTime<Utc>) -> [String; 2] {
        [
            slot_cell(self.main_ship, self.main_ready_at, now),
            slot_cell(self.support_ship, self.support_ready_at, now),
        ]
    }
}

fn slot_cell(ship: Option<ShipKind>, ready_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let delay = ready_at
        .filter(|at| *at > now)
        .map(|at| timefmt::clock((at - now).num_seconds() + 15))
        .unwrap_or_default();
    let marker = match ship {
        Some(kind) => kind.letter(),
        None if delay.is_empty() => '!',
        None => ' ',
    };
    format!("{marker} {delay:>5}")
}

// =============================================================================
// Ship orders
// =============================================================================

/// Action of a `ws ship` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipCommand {
    /// Ship enters play; ready two hours after the given time.
    In,
    /// Ship leaves play.
    Out,
    /// Only sets the ready time.
    Timer,
    /// Ship destroyed; ready 18 hours later, 16 for a flagship.
    Dead,
    /// Adds an enemy.
    Add,
    /// Removes an enemy.
    Remove,
}

impl ShipCommand {
    /// Every command word, in help order.
    pub const WORDS: [&'static str; 6] = ["in", "out", "dead", "timer", "add", "remove"];

    fn from_word(word: &str) -> Option<Self> {
        match word {
            "in" => Some(Self::In),
            "out" => Some(Self::Out),
            "timer" => Some(Self::Timer),
            "dead" => Some(Self::Dead),
            "add" => Some(Self::Add),
            "remove" => Some(Self::Remove),
            _ => None,
        }
    }
}

/// How the given duration relates to now and the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWord {
    /// Before the deadline.
    At,
    /// Before the deadline.
    Nova,
    /// Before now.
    Ago,
    /// After now.
    Hence,
}

impl TimeWord {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "at" => Some(Self::At),
            "nova" => Some(Self::Nova),
            "ago" => Some(Self::Ago),
            "hence" => Some(Self::Hence),
            _ => None,
        }
    }
}

/// Words of a `ws ship` order after member references were taken out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipOrder {
    /// Last command word given.
    pub command: Option<ShipCommand>,
    /// Last ship word given.
    pub ship: Option<ShipKind>,
    /// A flagship word was given.
    pub flagship: bool,
    /// Last time word given.
    pub time_word: Option<TimeWord>,
    /// `!Name` of an enemy, case kept.
    pub enemy: Option<String>,
    /// Everything else, read as durations.
    pub durations: Vec<String>,
}

impl ShipOrder {
    /// Classifies order words, ignoring case.
    #[must_use]
    pub fn parse(words: &[String]) -> Self {
        let mut order = Self::default();
        for raw in words {
            let word = raw.to_lowercase();
            if let Some(command) = ShipCommand::from_word(&word) {
                order.command = Some(command);
            } else if let Some((ship, flagship)) = ShipKind::from_word(&word) {
                order.ship = Some(ship);
                order.flagship |= flagship;
            } else if let Some(time_word) = TimeWord::from_word(&word) {
                order.time_word = Some(time_word);
            } else if raw.starts_with('!') {
                order.enemy = Some(raw.clone());
            } else {
                order.durations.push(word);
            }
        }
        order
    }

    /// Ready time for a slot update, capped at the deadline.
    ///
    /// Without durations the order means "now". Otherwise `ago` counts back
    /// from now; `timer` counts forward from now unless `at`/`nova` says
    /// "before the deadline"; the other commands count back from the deadline
    /// unless `hence` says "from now". `None` when the durations leave the
    /// range of representable times.
    #[must_use]
    pub fn ready_at(
        &self,
        command: ShipCommand,
        now: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let (time_word, given) = if self.durations.is_empty() {
            (Some(TimeWord::Hence), 0)
        } else {
            (self.time_word, timefmt::parse_duration(&self.durations)?)
        };
        let given = Duration::try_seconds(given)?;

        let at = match (time_word, command) {
            (Some(TimeWord::Ago), _) => now.checked_sub_signed(given)?,
            (Some(TimeWord::At | TimeWord::Nova), ShipCommand::Timer) => deadline.checked_sub_signed(given)?,
            (_, ShipCommand::Timer) | (Some(TimeWord::Hence), _) => now.checked_add_signed(given)?,
            _ => deadline.checked_sub_signed(given)?,
        };

        let delay = match command {
            ShipCommand::In => Duration::hours(2),
            ShipCommand::Dead if self.flagship => Duration::hours(16),
            ShipCommand::Dead => Duration::hours(18),
            _ => Duration::zero(),
        };

        Some(at.checked_add_signed(delay)?.min(deadline))
    }
}

// =============================================================================
// Events
// =============================================================================

/// One WhiteStar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhiteStar {
    /// Event name, from the channel name.
    pub name: String,
    /// Nova time.
    pub deadline: DateTime<Utc>,
    /// Role of the event leaders.
    #[serde(default)]
    pub leader_role: Option<RoleId>,
    /// Role of the participating pilots.
    #[serde(default)]
    pub pilot_role: Option<RoleId>,
    /// Group holding the leaders.
    #[serde(default)]
    pub assist_group: Option<String>,
    /// Channel of the event.
    pub channel: ChannelId,
    /// Status message kept up to date by the tick.
    #[serde(default)]
    pub status_message: Option<MessageId>,
    /// Friendly pilots.
    #[serde(default)]
    pub friends: BTreeMap<MemberId, ShipStatus>,
    /// Enemies by `!Name`.
    #[serde(default)]
    pub enemies: BTreeMap<String, ShipStatus>,
    /// Friendly pilots in status table order, fixed on first listing.
    #[serde(default)]
    pub pilot_order: Option<Vec<MemberId>>,
    /// Set once the event is over.
    #[serde(default)]
    pub done: bool,
    /// Last status content sent.
    #[serde(default)]
    pub last_content: String,
}

impl WhiteStar {
    /// Creates an event without roles.
    #[must_use]
    pub fn new(name: &str, deadline: DateTime<Utc>, channel: ChannelId) -> Self {
        Self {
            name: name.to_string(),
            deadline,
            leader_role: None,
            pilot_role: None,
            assist_group: None,
            channel,
            status_message: None,
            friends: BTreeMap::new(),
            enemies: BTreeMap::new(),
            pilot_order: None,
            done: false,
            last_content: String::new(),
        }
    }

    /// Name of the leaders' group for an event.
    #[must_use]
    pub fn assist_group_name(name: &str) -> String {
        format!("ws_{name}_assist")
    }

    /// True once the grace period after the deadline has passed.
    #[must_use]
    pub fn is_over(&self, now: DateTime<Utc>) -> bool {
        self.deadline + Duration::seconds(GRACE_SECS) < now
    }

    /// Time left, rounded up to the minute, or `over`.
    #[must_use]
    pub fn nova_label(&self, now: DateTime<Utc>) -> String {
        if self.is_over(now) {
            "over".to_string()
        } else {
            let left = self.deadline + Duration::seconds(GRACE_SECS) - now;
            timefmt::compact(left.num_seconds(), false)
        }
    }

    /// Creates blank entries for listed pilots without one and forgets passed
    /// ready times. Returns true if anything changed.
    pub fn refresh_ships(&mut self, now: DateTime<Utc>) -> bool {
        let mut changed = false;
        for id in self.pilot_order.iter().flatten() {
            if !self.friends.contains_key(id) {
                self.friends.insert(*id, ShipStatus::default());
                changed = true;
            }
        }
        for status in self.friends.values_mut().chain(self.enemies.values_mut()) {
            changed |= status.expire(now);
        }
        changed
    }

    /// Ship table: listed friends in pilot order, then enemies by name.
    ///
    /// `None` before the pilot order is fixed or when there is nobody to
    /// show.
    #[must_use]
    pub fn ship_table(&self, now: DateTime<Utc>, name_of: impl Fn(MemberId) -> String) -> Option<Table> {
        let order = self.pilot_order.as_ref()?;
        let mut table = Table::new(["Ships", "BS", "Supp"], &Align::columns("lll"));

        let blank = ShipStatus::default();
        for id in order {
            let status = self.friends.get(id).unwrap_or(&blank);
            let [main, support] = status.cells(now);
            table.push_row([short_name(&name_of(*id)), main, support]);
        }
        for (name, status) in &self.enemies {
            let [main, support] = status.cells(now);
            table.push_row([short_name(name), main, support]);
        }

        (!table.is_empty()).then_some(table)
    }
}

fn short_name(name: &str) -> String {
    name.chars().take(NAME_WIDTH).collect()
}

impl fmt::Display for WhiteStar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WhiteStar {}", self.name)
    }
}

// =============================================================================
// Board
// =============================================================================

/// Every live event by name.
#[derive(Debug, Clone, Default)]
pub struct WhiteStarBoard {
    events: BTreeMap<String, WhiteStar>,
    dirty: bool,
}

impl WhiteStarBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores saved events.
    #[must_use]
    pub fn from_saved(events: BTreeMap<String, WhiteStar>) -> Self {
        Self {
            events,
            dirty: false,
        }
    }

    /// Adds or replaces an event.
    pub fn insert(&mut self, event: WhiteStar) {
        self.events.insert(event.name.clone(), event);
        self.dirty = true;
    }

    /// Removes an event.
    pub fn remove(&mut self, name: &str) -> Option<WhiteStar> {
        let removed = self.events.remove(name);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Event by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&WhiteStar> {
        self.events.get(name)
    }

    /// Event by name, for changes. Call [`WhiteStarBoard::mark_dirty`] after
    /// changing it.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut WhiteStar> {
        self.events.get_mut(name)
    }

    /// Events in name order.
    pub fn iter(&self) -> impl Iterator<Item = &WhiteStar> {
        self.events.values()
    }

    /// Event names in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.events.keys().cloned().collect()
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when no event exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Persisted form.
    #[must_use]
    pub fn saved(&self) -> &BTreeMap<String, WhiteStar> {
        &self.events
    }

    /// Flags a change made through [`WhiteStarBoard::get_mut`].
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// True when events changed since the last save.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag after a save.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
