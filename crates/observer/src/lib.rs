//! Gamewire Observer - observable game state fed by relay channels.
//!
//! [`GameState`] subscribes to a bot's "state" channel (and optionally its
//! "game update" channel), folds every incoming message into a local
//! snapshot, and broadcasts a [`GameEvent`] for each change. Application
//! code reads the snapshot at any time and reacts to events without ever
//! touching the broker directly.

pub mod events;
pub mod state;

pub use events::GameEvent;
pub use state::{GameSnapshot, GameState};
