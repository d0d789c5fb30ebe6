//! LiveP2000 wire protocol.
//!
//! Every WebSocket message is JSON text in one of two shapes:
//!
//! - a **control frame**: an object whose `COM` field carries an integer
//!   [`Command`] code, plus command-specific fields;
//! - a **data batch**: an array of raw alert objects ([`RawAlert`]).
//!
//! Outbound requests are always control frames; see [`Request`].

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// Name of the command-code field on every control frame.
pub const COMMAND_FIELD: &str = "COM";

// ── Command ──────────────────────────────────────────────────────────

/// Protocol command codes.
///
/// The server defines more commands than a read-only client ever sends or
/// acts on; they are all listed so logs can name what arrived. Codes the
/// table does not know decode to [`Command::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    ConnectionClose,
    ConnectionOpen,
    RoomJoined,
    RoomLeft,
    RoomOpened,
    RoomClosed,
    /// Authentication request (client → server).
    AuthRequest,
    /// Authentication accepted (server → client).
    AuthResponse,
    AuthByPin,
    AuthByCookie,
    AuthAnonymous,
    FirstRequest,
    /// Ask the server to start streaming data.
    DataRequest,
    DataResponse,
    MapRequest,
    MapResponse,
    DictionaryRequest,
    DictionaryResponse,
    Logoff,
    LeaveRoom,
    JoinRoom,
    CapcodeHistoryRequest,
    CapcodeHistoryResponse,
    GracefulRestart,
    /// Server permits data batch delivery from now on.
    Unlock,
    Ready,
    CitiesRequest,
    CitiesResponse,
    Reporter,
    SpiRequest,
    SpiResponse,
    CityNamesRequest,
    CityNamesResponse,
    /// Liveness probe (client → server).
    PingRequest,
    /// Liveness probe reply (server → client).
    PingResponse,
    /// A code outside the known table.
    Unknown(i64),
}

/// Every known command, in code order. [`Command::from_code`] resolves
/// codes against this table.
pub const KNOWN_COMMANDS: [Command; 35] = [
    Command::ConnectionClose,
    Command::ConnectionOpen,
    Command::RoomJoined,
    Command::RoomLeft,
    Command::RoomOpened,
    Command::RoomClosed,
    Command::AuthRequest,
    Command::AuthResponse,
    Command::AuthByPin,
    Command::AuthByCookie,
    Command::AuthAnonymous,
    Command::FirstRequest,
    Command::DataRequest,
    Command::DataResponse,
    Command::MapRequest,
    Command::MapResponse,
    Command::DictionaryRequest,
    Command::DictionaryResponse,
    Command::Logoff,
    Command::LeaveRoom,
    Command::JoinRoom,
    Command::CapcodeHistoryRequest,
    Command::CapcodeHistoryResponse,
    Command::GracefulRestart,
    Command::Unlock,
    Command::Ready,
    Command::CitiesRequest,
    Command::CitiesResponse,
    Command::Reporter,
    Command::SpiRequest,
    Command::SpiResponse,
    Command::CityNamesRequest,
    Command::CityNamesResponse,
    Command::PingRequest,
    Command::PingResponse,
];

impl Command {
    /// Resolve a wire code. Unknown codes are preserved, not rejected.
    pub fn from_code(code: i64) -> Self {
        KNOWN_COMMANDS
            .iter()
            .copied()
            .find(|cmd| cmd.code() == code)
            .unwrap_or(Self::Unknown(code))
    }

    /// The integer code sent in the `COM` field.
    pub fn code(self) -> i64 {
        match self {
            Self::ConnectionClose => 0,
            Self::ConnectionOpen => 1,
            Self::RoomJoined => 2,
            Self::RoomLeft => 3,
            Self::RoomOpened => 4,
            Self::RoomClosed => 5,
            Self::AuthRequest => 6,
            Self::AuthResponse => 7,
            Self::AuthByPin => 8,
            Self::AuthByCookie => 9,
            Self::AuthAnonymous => 10,
            Self::FirstRequest => 11,
            Self::DataRequest => 12,
            Self::DataResponse => 13,
            Self::MapRequest => 14,
            Self::MapResponse => 15,
            Self::DictionaryRequest => 16,
            Self::DictionaryResponse => 17,
            Self::Logoff => 18,
            Self::LeaveRoom => 19,
            Self::JoinRoom => 20,
            Self::CapcodeHistoryRequest => 21,
            Self::CapcodeHistoryResponse => 22,
            Self::GracefulRestart => 25,
            Self::Unlock => 29,
            Self::Ready => 30,
            Self::CitiesRequest => 31,
            Self::CitiesResponse => 32,
            Self::Reporter => 33,
            Self::SpiRequest => 34,
            Self::SpiResponse => 35,
            Self::CityNamesRequest => 36,
            Self::CityNamesResponse => 37,
            Self::PingRequest => 38,
            Self::PingResponse => 39,
            Self::Unknown(code) => code,
        }
    }

    /// The server's four-letter mnemonic, e.g. `"AUTq"`.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::ConnectionClose => "CNCe",
            Self::ConnectionOpen => "CNOe",
            Self::RoomJoined => "JOIe",
            Self::RoomLeft => "LEAe",
            Self::RoomOpened => "ROOe",
            Self::RoomClosed => "ROCe",
            Self::AuthRequest => "AUTq",
            Self::AuthResponse => "AUTr",
            Self::AuthByPin => "AUPq",
            Self::AuthByCookie => "AUCq",
            Self::AuthAnonymous => "AUAq",
            Self::FirstRequest => "FRQc",
            Self::DataRequest => "DATq",
            Self::DataResponse => "DATr",
            Self::MapRequest => "MAPq",
            Self::MapResponse => "MAPr",
            Self::DictionaryRequest => "WDBq",
            Self::DictionaryResponse => "WDBr",
            Self::Logoff => "LGFq",
            Self::LeaveRoom => "LEAc",
            Self::JoinRoom => "JOIc",
            Self::CapcodeHistoryRequest => "CAPq",
            Self::CapcodeHistoryResponse => "CAPr",
            Self::GracefulRestart => "GRAc",
            Self::Unlock => "STAc",
            Self::Ready => "RDYr",
            Self::CitiesRequest => "CTYq",
            Self::CitiesResponse => "CTYr",
            Self::Reporter => "RDWe",
            Self::SpiRequest => "SPIq",
            Self::SpiResponse => "SPIr",
            Self::CityNamesRequest => "CTRq",
            Self::CityNamesResponse => "CTRr",
            Self::PingRequest => "PINq",
            Self::PingResponse => "PINr",
            Self::Unknown(_) => "????",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown command {code}"),
            known => write!(f, "{} ({})", known.mnemonic(), known.code()),
        }
    }
}

// ── Inbound frames ───────────────────────────────────────────────────

/// One inbound WebSocket message, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Session-management frame. `payload` holds every field except `COM`.
    Control {
        command: Command,
        payload: Map<String, Value>,
    },
    /// A batch of raw alert objects, undecoded.
    Batch(Vec<Value>),
}

impl Frame {
    /// Classify a text frame.
    ///
    /// Anything that is not JSON, not an object or array, or an object
    /// without an integer `COM` is a protocol violation.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::protocol(format!("frame is not JSON: {e}")))?;

        match value {
            Value::Array(items) => Ok(Self::Batch(items)),
            Value::Object(mut payload) => {
                let code = payload
                    .remove(COMMAND_FIELD)
                    .as_ref()
                    .and_then(Value::as_i64)
                    .ok_or_else(|| {
                        Error::protocol("control frame without an integer COM field")
                    })?;
                Ok(Self::Control {
                    command: Command::from_code(code),
                    payload,
                })
            }
            other => Err(Error::protocol(format!(
                "frame is neither a control object nor a batch: {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Outbound requests ────────────────────────────────────────────────

/// An outbound control frame.
///
/// `Debug` lists field names only: the handshake carries the session token.
#[derive(Clone, PartialEq)]
pub struct Request {
    command: Command,
    payload: Map<String, Value>,
}

impl Request {
    pub fn new(command: Command, payload: Map<String, Value>) -> Self {
        Self { command, payload }
    }

    /// Handshake: announce an anonymous viewer holding `token`.
    pub fn auth(token: &SecretString) -> Self {
        let mut payload = Map::new();
        payload.insert("TYP".into(), Value::from("ANN"));
        payload.insert("UID".into(), Value::from("0"));
        payload.insert("COO".into(), Value::from(token.expose_secret()));
        Self::new(Command::AuthRequest, payload)
    }

    /// Ask for the live data stream.
    pub fn data() -> Self {
        let mut payload = Map::new();
        payload.insert("FRQ".into(), Value::Bool(true));
        Self::new(Command::DataRequest, payload)
    }

    /// Liveness probe.
    pub fn ping() -> Self {
        Self::new(Command::PingRequest, Map::new())
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Serialize to the JSON text sent over the socket.
    pub fn encode(&self) -> String {
        let mut body = self.payload.clone();
        body.insert(COMMAND_FIELD.into(), Value::from(self.command.code()));
        Value::Object(body).to_string()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("command", &self.command)
            .field("fields", &self.payload.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ── Raw alert shapes ─────────────────────────────────────────────────

/// One element of a data batch, as the server sends it.
///
/// Fields are kept loosely typed: the feed is not consistent about
/// numbers vs. numeric strings, and interpretation (with defaults) is the
/// decoder's job in `p2000-core`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAlert {
    /// Latitude, number or numeric string; null when unknown.
    #[serde(rename = "LAT", default)]
    pub lat: Option<Value>,

    /// Longitude, number or numeric string; null when unknown.
    #[serde(rename = "LON", default)]
    pub lon: Option<Value>,

    /// Originating service type code.
    #[serde(rename = "DII", default)]
    pub dii: Option<Value>,

    /// Packed digit string: timestamp, origin code, region code.
    #[serde(rename = "SPI", default)]
    pub spi: Option<Value>,

    /// Message text with embedded markup.
    #[serde(rename = "TXT", default)]
    pub txt: Option<Value>,

    /// Units paged for this alert.
    #[serde(default)]
    pub capcodes: Option<Vec<RawCapcode>>,

    /// All remaining fields the server sends.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A capcode entry inside a [`RawAlert`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCapcode {
    /// Pager address, number or numeric string.
    #[serde(rename = "CPI", default)]
    pub cpi: Option<Value>,

    /// Unit description with embedded markup.
    #[serde(rename = "CTT", default)]
    pub ctt: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawAlert {
    pub fn latitude(&self) -> Option<f64> {
        self.lat.as_ref().and_then(lenient_f64)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.lon.as_ref().and_then(lenient_f64)
    }

    pub fn service_code(&self) -> Option<i64> {
        self.dii.as_ref().and_then(lenient_i64)
    }

    pub fn spi(&self) -> Option<&str> {
        self.spi.as_ref().and_then(Value::as_str)
    }

    pub fn text(&self) -> Option<&str> {
        self.txt.as_ref().and_then(Value::as_str)
    }
}

impl RawCapcode {
    pub fn code(&self) -> Option<i64> {
        self.cpi.as_ref().and_then(lenient_i64)
    }

    pub fn description(&self) -> Option<&str> {
        self.ctt.as_ref().and_then(Value::as_str)
    }
}

fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn every_known_command_resolves_to_itself() {
        for cmd in KNOWN_COMMANDS {
            assert_eq!(Command::from_code(cmd.code()), cmd, "{cmd}");
        }
    }

    #[test]
    fn unknown_codes_are_preserved() {
        assert_eq!(Command::from_code(23), Command::Unknown(23));
        assert_eq!(Command::from_code(99).code(), 99);
    }

    #[test]
    fn handshake_codes_match_the_server() {
        assert_eq!(Command::AuthRequest.code(), 6);
        assert_eq!(Command::AuthResponse.code(), 7);
        assert_eq!(Command::DataRequest.code(), 12);
        assert_eq!(Command::Unlock.code(), 29);
        assert_eq!(Command::PingRequest.code(), 38);
        assert_eq!(Command::PingResponse.code(), 39);
        assert_eq!(Command::Unlock.mnemonic(), "STAc");
    }

    #[test]
    fn parse_control_frame() {
        let frame = Frame::parse(r#"{"COM":7,"UID":"42"}"#).unwrap();
        let Frame::Control { command, payload } = frame else {
            panic!("expected control frame");
        };
        assert_eq!(command, Command::AuthResponse);
        assert_eq!(payload["UID"], "42");
        assert!(!payload.contains_key(COMMAND_FIELD));
    }

    #[test]
    fn parse_batch_frame() {
        let frame = Frame::parse(r#"[{"SPI":"21031214093028"},{"SPI":"21031214093101"}]"#).unwrap();
        let Frame::Batch(items) = frame else {
            panic!("expected batch");
        };
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn parse_rejects_other_shapes() {
        for text in ["42", "\"hello\"", "null", "not json", r#"{"UID":"1"}"#, r#"{"COM":"7"}"#] {
            let err = Frame::parse(text).unwrap_err();
            assert!(matches!(err, Error::Protocol { .. }), "{text}: {err}");
        }
    }

    #[test]
    fn encode_auth_request() {
        let token = SecretString::from("tok-123".to_owned());
        let encoded = Request::auth(&token).encode();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(
            value,
            json!({ "TYP": "ANN", "UID": "0", "COO": "tok-123", "COM": 6 })
        );
    }

    #[test]
    fn encode_data_and_ping_requests() {
        let data: Value = serde_json::from_str(&Request::data().encode()).unwrap();
        assert_eq!(data, json!({ "FRQ": true, "COM": 12 }));

        let ping: Value = serde_json::from_str(&Request::ping().encode()).unwrap();
        assert_eq!(ping, json!({ "COM": 38 }));
    }

    #[test]
    fn request_debug_hides_values() {
        let token = SecretString::from("very-secret".to_owned());
        let debug = format!("{:?}", Request::auth(&token));
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("COO"));
    }

    #[test]
    fn raw_alert_accessors_are_lenient() {
        let raw: RawAlert = serde_json::from_value(json!({
            "LAT": "52.37",
            "LON": null,
            "DII": "2",
            "SPI": "21031214093028",
            "TXT": "A1 Dam",
            "capcodes": [{ "CPI": "0123456", "CTT": "Ambu 13-101" }],
            "ID": 991
        }))
        .unwrap();

        assert_eq!(raw.latitude(), Some(52.37));
        assert_eq!(raw.longitude(), None);
        assert_eq!(raw.service_code(), Some(2));
        assert_eq!(raw.spi(), Some("21031214093028"));
        assert_eq!(raw.text(), Some("A1 Dam"));
        assert_eq!(raw.extra["ID"], 991);

        let capcodes = raw.capcodes.unwrap();
        assert_eq!(capcodes[0].code(), Some(123_456));
        assert_eq!(capcodes[0].description(), Some("Ambu 13-101"));
    }
}
