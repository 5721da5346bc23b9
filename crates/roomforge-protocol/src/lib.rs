//! Shared vocabulary for Roomforge.
//!
//! This crate defines the types that every other layer speaks:
//!
//! - **Types** ([`Room`], [`RoomCode`], [`Endpoint`], [`CreateRoom`],
//!   [`StatusReport`]): the records and request/response bodies that
//!   travel between the API, the registry, and the game-server instances.
//! - **Codes** ([`CodeGenerator`]): short, human-shareable room codes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while parsing or
//!   validating those types.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about containers, storage, or HTTP.
//! It only knows what a room looks like and which inputs are acceptable.
//!
//! ```text
//! API (JSON) → Protocol (CreateRoom → ValidCreateRoom) → Orchestrator (Room)
//! ```

mod code;
mod error;
mod types;

pub use code::{CodeGenerator, CODE_ALPHABET, DEFAULT_CODE_LENGTH};
pub use error::ProtocolError;
pub use types::{
    epoch_secs, CreateRoom, Endpoint, Room, RoomCode, StatusReport,
    ValidCreateRoom, DEFAULT_MAX_PLAYERS, MAX_NAME_LEN,
};
