use std::fmt;

#[derive(Debug)]
pub enum BotError {
    Db(tokio_rusqlite::Error),
    Serde(serde_json::Error),
    Http(reqwest::Error),
    /// Sun never reaches a required angle at this latitude/date.
    SunNeverReaches { prayer: &'static str },
    /// A required credential or setting is absent from the environment.
    Config(&'static str),
    /// A stored row holds a value the closed enums no longer accept.
    CorruptRow(String),
}

impl std::error::Error for BotError {}

impl fmt::Display for BotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotError::Db(e) => write!(f, "database error: {}", e),
            BotError::Serde(e) => write!(f, "serialization error: {}", e),
            BotError::Http(e) => write!(f, "http error: {}", e),
            BotError::SunNeverReaches { prayer } => {
                write!(f, "sun never reaches the {} angle at this location/date", prayer)
            }
            BotError::Config(var) => write!(f, "missing configuration: {}", var),
            BotError::CorruptRow(what) => write!(f, "corrupt row: {}", what),
        }
    }
}

impl From<tokio_rusqlite::Error> for BotError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        BotError::Db(err)
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Serde(err)
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::Http(err)
    }
}
