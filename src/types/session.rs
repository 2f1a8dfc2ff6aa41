use serde::{Deserialize, Serialize};

use super::{PendingLocation, Prayer, ReminderEntry};

/// What the user's next input means. Replaces the old implicit pair of
/// `lastPrayer` + `pendingLocation` fields with one tagged variant, so the
/// free-text handler never has to guess between a city query and an offset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ConversationStep {
    /// Next free text is a city name to geocode.
    #[default]
    AwaitingCity,
    /// A geocoded city is staged; waiting for confirm/reject.
    AwaitingLocationConfirmation { pending: PendingLocation },
    /// Main menu; waiting for a prayer button.
    AwaitingPrayerSelection,
    /// A prayer (or all) was picked; next input is a minute offset.
    AwaitingOffsetSelection { target: ReminderTarget },
}

/// Which reminder rows an offset selection applies to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderTarget {
    Single(Prayer),
    All,
}

/// Ephemeral per-user conversation state, stored as JSON in the sessions
/// table and replaced wholesale on every upsert (last writer wins).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub lang: super::Lang,
    #[serde(default)]
    pub step: ConversationStep,
    #[serde(default)]
    pub reminders: Vec<ReminderEntry>,
}
