//! Core Roomforge types.
//!
//! Everything in this module is plain data: it can be serialized to JSON
//! for the HTTP API, stored in the registry, and compared in tests. None
//! of it performs I/O.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Player capacity used when a request leaves it unset or non-positive.
pub const DEFAULT_MAX_PLAYERS: u32 = 2;

/// Longest accepted game-server name, in bytes.
pub const MAX_NAME_LEN: usize = 128;

/// Longest accepted room code.
const MAX_CODE_LEN: usize = 32;

/// Current Unix time in whole seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// The short public identifier of a room.
///
/// A newtype over `String` so a room code can't be confused with a
/// game-server name or an address. It is also the instance name in the
/// compute backend, which is why only ASCII letters are accepted.
///
/// Serialized as a bare JSON string: `"aBcDeF"`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Parses a code supplied from outside (URL path, stored record).
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidCode`] unless the input is 1–32
    /// ASCII letters.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_CODE_LEN
            && raw.bytes().all(|b| b.is_ascii_alphabetic());
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(ProtocolError::InvalidCode(raw.to_string()))
        }
    }

    /// Wraps a code produced by [`CodeGenerator`](crate::CodeGenerator),
    /// which only ever emits valid codes.
    pub(crate) fn from_generated(code: String) -> Self {
        Self(code)
    }

    /// Borrows the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl AsRef<str> for RoomCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Where a running instance can be reached.
///
/// Returned by the launcher at spawn time. The query port serves the
/// status endpoint; the game port is what players connect to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub address: String,
    pub query_port: u16,
    pub game_port: u16,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, query_port: u16, game_port: u16) -> Self {
        Self {
            address: address.into(),
            query_port,
            game_port,
        }
    }

    /// `host:port` of the status channel.
    pub fn query_addr(&self) -> String {
        format!("{}:{}", self.address, self.query_port)
    }

    /// `host:port` of the game channel.
    pub fn game_addr(&self) -> String {
        format!("{}:{}", self.address, self.game_port)
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A registered room backed by one live game-server instance.
///
/// `code` and the connection fields never change after creation.
/// Timestamps are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub code: RoomCode,
    pub address: String,
    pub query_port: u16,
    pub game_port: u16,
    /// The game-server image/build the instance runs.
    pub name: String,
    pub max_players: u32,
    pub private: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Room {
    /// Builds the record for a freshly spawned instance.
    pub fn new(code: RoomCode, endpoint: Endpoint, request: &ValidCreateRoom) -> Self {
        let now = epoch_secs();
        Self {
            code,
            address: endpoint.address,
            query_port: endpoint.query_port,
            game_port: endpoint.game_port,
            name: request.name.clone(),
            max_players: request.max_players,
            private: request.private,
            created_at: now,
            updated_at: now,
        }
    }

    /// The instance's connection metadata.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.address.clone(), self.query_port, self.game_port)
    }
}

// ---------------------------------------------------------------------------
// CreateRoom
// ---------------------------------------------------------------------------

/// Body of a room-creation request: `{"name", "maxPlayers"?, "private"?}`.
///
/// Every field is optional at the serde level so that a missing `name`
/// surfaces as a [`ProtocolError::Validation`] rather than a decoder error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoom {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub max_players: Option<i64>,
    #[serde(default)]
    pub private: Option<bool>,
}

impl CreateRoom {
    /// A request for `name` with every other field defaulted.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_max_players(mut self, max_players: i64) -> Self {
        self.max_players = Some(max_players);
        self
    }

    pub fn with_private(mut self, private: bool) -> Self {
        self.private = Some(private);
        self
    }

    /// Validates with the standard capacity default of
    /// [`DEFAULT_MAX_PLAYERS`].
    pub fn validate(&self) -> Result<ValidCreateRoom, ProtocolError> {
        self.validate_with_default(DEFAULT_MAX_PLAYERS)
    }

    /// Validates and normalises the request.
    ///
    /// - `name` is trimmed and must be non-empty, at most
    ///   [`MAX_NAME_LEN`] bytes, free of whitespace and control
    ///   characters, and must not start with `-` (it ends up as a
    ///   command-line argument to the compute backend).
    /// - `max_players` unset or `<= 0` becomes `default_max_players`.
    /// - `private` unset becomes `false`.
    pub fn validate_with_default(
        &self,
        default_max_players: u32,
    ) -> Result<ValidCreateRoom, ProtocolError> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ProtocolError::Validation("name is required".into()))?;

        if name.len() > MAX_NAME_LEN {
            return Err(ProtocolError::Validation(format!(
                "name must be at most {MAX_NAME_LEN} bytes"
            )));
        }
        if name.starts_with('-') {
            return Err(ProtocolError::Validation(
                "name must not start with '-'".into(),
            ));
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ProtocolError::Validation(
                "name must not contain whitespace".into(),
            ));
        }

        let max_players = match self.max_players {
            None => default_max_players,
            Some(n) if n <= 0 => default_max_players,
            Some(n) => u32::try_from(n).map_err(|_| {
                ProtocolError::Validation(format!("maxPlayers {n} is too large"))
            })?,
        };

        Ok(ValidCreateRoom {
            name: name.to_string(),
            max_players,
            private: self.private.unwrap_or(false),
        })
    }
}

/// A creation request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCreateRoom {
    pub name: String,
    pub max_players: u32,
    pub private: bool,
}

// ---------------------------------------------------------------------------
// StatusReport
// ---------------------------------------------------------------------------

/// What an instance's status endpoint returns: `{"players": n}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub players: u32,
}

impl StatusReport {
    /// `true` when nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.players == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid(name: &str) -> ValidCreateRoom {
        CreateRoom::named(name).validate().unwrap()
    }

    #[test]
    fn test_room_code_parse_accepts_letters() {
        let code = RoomCode::parse("aBcDeF").unwrap();
        assert_eq!(code.as_str(), "aBcDeF");
        assert_eq!(code.to_string(), "aBcDeF");
    }

    #[test]
    fn test_room_code_parse_rejects_bad_input() {
        assert!(RoomCode::parse("").is_err());
        assert!(RoomCode::parse("abc12").is_err());
        assert!(RoomCode::parse("ab-cd").is_err());
        assert!(RoomCode::parse(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_room_code_serializes_as_plain_string() {
        let code = RoomCode::parse("qwerty").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"qwerty\"");
        let back: RoomCode = serde_json::from_str("\"qwerty\"").unwrap();
        assert_eq!(back, code);
        assert!(serde_json::from_str::<RoomCode>("\"no way\"").is_err());
    }

    #[test]
    fn test_validate_defaults() {
        let v = valid("arena");
        assert_eq!(v.name, "arena");
        assert_eq!(v.max_players, DEFAULT_MAX_PLAYERS);
        assert!(!v.private);
    }

    #[test]
    fn test_validate_non_positive_max_players_uses_default() {
        let v = CreateRoom::named("arena").with_max_players(0).validate().unwrap();
        assert_eq!(v.max_players, 2);
        let v = CreateRoom::named("arena").with_max_players(-5).validate().unwrap();
        assert_eq!(v.max_players, 2);
        let v = CreateRoom::named("arena")
            .with_max_players(-1)
            .validate_with_default(8)
            .unwrap();
        assert_eq!(v.max_players, 8);
    }

    #[test]
    fn test_validate_keeps_explicit_values() {
        let v = CreateRoom::named("arena")
            .with_max_players(4)
            .with_private(true)
            .validate()
            .unwrap();
        assert_eq!(v.max_players, 4);
        assert!(v.private);
    }

    #[test]
    fn test_validate_requires_name() {
        let err = CreateRoom::default().validate().unwrap_err();
        assert!(matches!(err, ProtocolError::Validation(_)));
        assert!(CreateRoom::named("   ").validate().is_err());
    }

    #[test]
    fn test_validate_rejects_flag_like_and_spaced_names() {
        assert!(CreateRoom::named("--privileged").validate().is_err());
        assert!(CreateRoom::named("my game").validate().is_err());
        assert!(CreateRoom::named("a".repeat(MAX_NAME_LEN + 1)).validate().is_err());
        assert!(CreateRoom::named("registry.local/echo:1.2").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_oversized_max_players() {
        let err = CreateRoom::named("arena")
            .with_max_players(i64::from(u32::MAX) + 1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Validation(_)));
    }

    #[test]
    fn test_create_room_json_uses_camel_case() {
        let req: CreateRoom =
            serde_json::from_str(r#"{"name":"arena","maxPlayers":4,"private":true}"#).unwrap();
        assert_eq!(req.name.as_deref(), Some("arena"));
        assert_eq!(req.max_players, Some(4));
        assert_eq!(req.private, Some(true));

        let req: CreateRoom = serde_json::from_str("{}").unwrap();
        assert_eq!(req, CreateRoom::default());
    }

    #[test]
    fn test_room_new_copies_endpoint_and_request() {
        let code = RoomCode::parse("abcdef").unwrap();
        let room = Room::new(code.clone(), Endpoint::new("10.0.0.1", 40001, 40002), &valid("arena"));
        assert_eq!(room.code, code);
        assert_eq!(room.address, "10.0.0.1");
        assert_eq!(room.query_port, 40001);
        assert_eq!(room.game_port, 40002);
        assert_eq!(room.created_at, room.updated_at);
        assert_eq!(room.endpoint().query_addr(), "10.0.0.1:40001");
        assert_eq!(room.endpoint().game_addr(), "10.0.0.1:40002");
    }

    #[test]
    fn test_room_json_shape() {
        let code = RoomCode::parse("abcdef").unwrap();
        let room = Room::new(code, Endpoint::new("10.0.0.1", 40001, 40002), &valid("arena"));
        let json = serde_json::to_value(&room).unwrap();
        assert_eq!(json["code"], "abcdef");
        assert_eq!(json["queryPort"], 40001);
        assert_eq!(json["gamePort"], 40002);
        assert_eq!(json["maxPlayers"], 2);
        assert_eq!(json["private"], false);
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_status_report_decodes() {
        let report: StatusReport = serde_json::from_str(r#"{"players":3}"#).unwrap();
        assert_eq!(report.players, 3);
        assert!(!report.is_empty());
        assert!(StatusReport::default().is_empty());
    }
}
