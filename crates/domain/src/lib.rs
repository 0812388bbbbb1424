//! Gamewire Domain - shared vocabulary for the relay and its consumers
//!
//! This crate contains the data types that cross the pub/sub wire:
//! - Game phase/type enums and the tagged state-message union
//! - Turn-by-turn game update payloads
//! - Bot identity and log-safe anonymization helpers
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - serde plus small hashing/random utilities
//! 2. **No business logic** - pure data types and serialization
//! 3. **Exhaustive unions** - inbound message kinds are a sum type so an
//!    unhandled kind is a compile error, not a silently ignored string key

pub mod game;
pub mod ids;
pub mod util;

pub use game::{GamePhase, GameStart, GameType, GameUpdate, PlayerScore, StateMessage};
pub use ids::BotId;
pub use util::{anonymize_user_id, random_in};
