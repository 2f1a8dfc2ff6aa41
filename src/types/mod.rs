use serde::{Deserialize, Serialize};

mod session;
pub use session::*;

/// The six daily prayer events tracked by the bot. Sunrise is not itself a
/// prayer but is computed and announced alongside the other five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prayer {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    pub const ALL: [Prayer; 6] = [
        Prayer::Fajr,
        Prayer::Sunrise,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Prayer::Fajr => "fajr",
            Prayer::Sunrise => "sunrise",
            Prayer::Dhuhr => "dhuhr",
            Prayer::Asr => "asr",
            Prayer::Maghrib => "maghrib",
            Prayer::Isha => "isha",
        }
    }

    pub fn parse(s: &str) -> Option<Prayer> {
        match s {
            "fajr" => Some(Prayer::Fajr),
            "sunrise" => Some(Prayer::Sunrise),
            "dhuhr" => Some(Prayer::Dhuhr),
            "asr" => Some(Prayer::Asr),
            "maghrib" => Some(Prayer::Maghrib),
            "isha" => Some(Prayer::Isha),
            _ => None,
        }
    }
}

/// Supported interface languages. A closed enum so every message lookup is
/// an exhaustive match instead of a string-keyed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Ar,
}

impl Lang {
    pub fn code(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Ar => "ar",
        }
    }

    pub fn from_code(code: &str) -> Option<Lang> {
        match code {
            "en" => Some(Lang::En),
            "ar" => Some(Lang::Ar),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Lang {
        match self {
            Lang::En => Lang::Ar,
            Lang::Ar => Lang::En,
        }
    }
}

/// A registered user with a confirmed location.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub full_name: Option<String>,
    pub username: Option<String>,
}

impl User {
    /// The user's IANA timezone, falling back to UTC if the stored name no
    /// longer parses against the bundled tz database.
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or_else(|_| {
            log::warn!("user {}: unknown timezone {:?}, using UTC", self.telegram_id, self.timezone);
            chrono_tz::Tz::UTC
        })
    }
}

/// One stored reminder: fire `offset_minutes` before `prayer`'s azan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderEntry {
    pub prayer: Prayer,
    pub offset_minutes: i64,
}

/// A geocoded city staged in the session until the user confirms it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingLocation {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub display_name: String,
}

/// The chat identity a handler sees; captured into the User row at
/// location-confirmation time and never re-synced afterwards.
#[derive(Debug, Clone)]
pub struct ChatIdentity {
    pub telegram_id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl ChatIdentity {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}
