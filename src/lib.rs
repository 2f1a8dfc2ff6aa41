pub mod api;
pub mod commands;
pub mod error;
pub mod flow;
pub mod handlers;
pub mod keyboard;
pub mod locale;
pub mod location;
pub mod praytime;
pub mod state;
pub mod store;
pub mod types;

pub use commands::*;
pub use error::*;
pub use state::*;
pub use types::*;
