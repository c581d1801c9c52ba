//! Real-time trivia rooms for the Astralis astronomy site.
//!
//! Clients talk JSON over a WebSocket. A single coordinator task owns every
//! room, so commands and countdown ticks for a room are applied one at a time.

pub mod cards;
pub mod config;
pub mod coordinator;
pub mod countdown;
pub mod error;
pub mod messages;
pub mod room;
pub mod server;
