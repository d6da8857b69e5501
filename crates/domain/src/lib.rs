// Rust guideline compliant 2026-10-16

//! Shared domain types for the fraud-case synchronization core.
//!
//! Defines `FraudCase`, `DashboardStats`, `PushEvent`, `ConnectionState`, the
//! error taxonomy, and the hexagonal port traits: `PushTransport`,
//! `PushConnection`, `SnapshotSource`, `StatusWriter`, and `Clock`.
//! All component crates depend on this crate; no component crate is imported here.

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, IntoDeserializer as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Outbound liveness ping frame, sent verbatim on the push channel.
pub const PING: &str = "ping";

/// Inbound liveness acknowledgement frame.
pub const PONG: &str = "pong";

/// Field carrying the event discriminator in every structured push frame.
pub const EVENT_TAG: &str = "event";

/// Stable primary key of a fraud case.
pub type CaseId = u64;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Lifecycle status of a fraud case.
///
/// The backend emits either the English or the Spanish spelling; both decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    /// Initial state, assigned by the backend at creation.
    #[serde(alias = "PENDIENTE")]
    Pending,
    /// Under active review by an analyst.
    #[serde(alias = "INVESTIGANDO")]
    Investigating,
    /// Fraud confirmed.
    #[serde(alias = "CONFIRMADO")]
    Confirmed,
    /// Dismissed as a false positive. Terminal.
    #[serde(alias = "RECHAZADO", alias = "FALSE_POSITIVE")]
    Rejected,
    /// Closed after follow-up. Terminal.
    #[serde(alias = "RESUELTO")]
    Resolved,
}

impl CaseStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Investigating,
        Self::Confirmed,
        Self::Rejected,
        Self::Resolved,
    ];

    /// Canonical wire spelling (e.g. `"PENDING"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Investigating => "INVESTIGATING",
            Self::Confirmed => "CONFIRMED",
            Self::Rejected => "REJECTED",
            Self::Resolved => "RESOLVED",
        }
    }

    /// Spelling the backend accepts on status writes (e.g. `"CONFIRMADO"`).
    ///
    /// Reads accept both spellings; the write endpoint validates against
    /// this one only.
    #[must_use]
    pub fn backend_code(self) -> &'static str {
        match self {
            Self::Pending => "PENDIENTE",
            Self::Investigating => "INVESTIGANDO",
            Self::Confirmed => "CONFIRMADO",
            Self::Rejected => "RECHAZADO",
            Self::Resolved => "RESUELTO",
        }
    }
}

/// Severity of a fraud case. Ordered: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Informational; no follow-up expected.
    #[serde(alias = "BAJO")]
    Low,
    /// The backend's default when a record has no severity.
    #[serde(alias = "MEDIO")]
    Medium,
    /// Needs review within the day.
    #[serde(alias = "ALTO")]
    High,
    /// Needs immediate review.
    #[serde(alias = "CRITICO")]
    Critical,
}

impl Severity {
    /// Every severity, lowest first.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Canonical wire spelling (e.g. `"CRITICAL"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Detector that raised a fraud case.
///
/// Closed enumeration covering both generations of the detection backend.
/// `Unknown` is the backend's placeholder for cases with no recorded detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectorType {
    /// Invoice totals or lines that deviate from the client's history.
    #[serde(alias = "ANOMALIA_FACTURA")]
    InvoiceAnomaly,
    /// Fuel dispensed beyond what the vehicle or tank can hold.
    #[serde(alias = "ROBO_COMBUSTIBLE")]
    FuelTheft,
    /// Records edited after the fact.
    #[serde(alias = "MANIPULACION_DATOS")]
    DataManipulation,
    /// The same transaction booked more than once.
    #[serde(alias = "TRANSACCION_DUPLICADA")]
    DuplicateTransaction,
    /// Discounts above the allowed ceiling.
    #[serde(alias = "DESCUENTO_EXCESIVO")]
    ExcessiveDiscount,
    /// Operations outside business hours.
    #[serde(alias = "AFTERHOURS", alias = "FUERA_HORARIO")]
    AfterHours,
    /// Suspiciously round amounts.
    #[serde(alias = "MONTO_REDONDO")]
    RoundAmount,
    /// Gaps in document numbering.
    #[serde(alias = "SECUENCIA_FALTANTE")]
    SequenceGap,
    /// Consumption above the assigned quota.
    QuotaAbuse,
    /// Irregular settlement of accounts.
    LiquidationFraud,
    /// Recurring transaction pattern flagged by the pattern detector.
    TransactionPattern,
    /// Operations at night.
    NightOperation,
    /// No detector recorded.
    Unknown,
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Parse a wire code case-insensitively through the serde spellings and aliases.
fn parse_code<T: DeserializeOwned>(raw: &str) -> Result<T, DecodeError> {
    let upper = raw.trim().to_uppercase();
    T::deserialize(upper.as_str().into_deserializer()).map_err(
        |e: serde::de::value::Error| DecodeError::Invalid { reason: e.to_string() },
    )
}

impl FromStr for CaseStatus {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_code(s)
    }
}

impl FromStr for Severity {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_code(s)
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Lenient timestamp decoding.
///
/// Accepts RFC 3339 and the offset-less ISO form the backend emits for naive
/// database columns; the latter is taken as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize as _, Deserializer};

    /// Parse one timestamp string.
    ///
    /// # Errors
    ///
    /// Returns the `chrono` parse error of the naive fallback when neither form matches.
    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
                    .map(|naive| naive.and_utc())
            })
    }

    /// `deserialize_with` helper for required timestamps.
    ///
    /// # Errors
    ///
    /// Fails when the value is not a string or does not parse.
    pub fn required<'de, D: Deserializer<'de>>(de: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(de)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    /// `deserialize_with` helper for optional timestamps (`null` or absent is `None`).
    ///
    /// # Errors
    ///
    /// Fails when a present value is not a string or does not parse.
    pub fn optional<'de, D: Deserializer<'de>>(de: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<String>::deserialize(de)?
            .map(|raw| parse(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// FraudCase
// ---------------------------------------------------------------------------

const fn default_status() -> CaseStatus {
    CaseStatus::Pending
}

/// A fraud case as reported by the detection backend.
///
/// `id` is the primary key; `case_number` is the human-readable identifier and
/// is unique across the live collection. `updated_at` drives last-writer-wins
/// reconciliation and is never allowed to move backwards once cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudCase {
    /// Stable primary key.
    pub id: CaseId,
    /// Human-readable unique identifier (e.g. `"FRD-2024-00017"`).
    pub case_number: String,
    /// Detector that raised the case.
    pub detector_type: DetectorType,
    /// Ordered severity.
    pub severity: Severity,
    /// Lifecycle status; the backend defaults missing values to `Pending`.
    #[serde(default = "default_status")]
    pub status: CaseStatus,
    /// Short headline.
    #[serde(default)]
    pub title: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Monetary amount involved, non-negative.
    #[serde(default, alias = "amount_involved")]
    pub amount: Option<f64>,
    /// Detector confidence in `[0, 100]`.
    #[serde(default)]
    pub confidence_score: Option<f64>,
    /// Client code of the involved entity.
    #[serde(default)]
    pub client_code: Option<String>,
    /// Client name of the involved entity.
    #[serde(default)]
    pub client_name: Option<String>,
    /// When the detector raised the case.
    #[serde(deserialize_with = "timestamp::required")]
    pub detection_date: DateTime<Utc>,
    /// Backend creation time.
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
    /// Backend last-modification time; `None` means "unknown, always newer".
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl FraudCase {
    /// Check the value-range invariants of a decoded case.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Invalid`] for an empty `case_number`, a negative
    /// or non-finite `amount`, or a `confidence_score` outside `[0, 100]`.
    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.case_number.trim().is_empty() {
            return Err(DecodeError::Invalid {
                reason: format!("case {} has an empty case_number", self.id),
            });
        }
        if let Some(amount) = self.amount
            && !(amount.is_finite() && amount >= 0.0)
        {
            return Err(DecodeError::Invalid {
                reason: format!("case {} has invalid amount {amount}", self.id),
            });
        }
        if let Some(score) = self.confidence_score
            && !(0.0..=100.0).contains(&score)
        {
            return Err(DecodeError::Invalid {
                reason: format!("case {} has confidence_score {score} outside [0, 100]", self.id),
            });
        }
        Ok(())
    }

    /// Decode and validate one case from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Invalid`] when the value does not match the
    /// `FraudCase` shape or fails [`validate`](Self::validate).
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let case: Self = serde_json::from_value(value)
            .map_err(|e| DecodeError::Invalid { reason: e.to_string() })?;
        case.validate()?;
        Ok(case)
    }
}

// ---------------------------------------------------------------------------
// DashboardStats
// ---------------------------------------------------------------------------

/// Summary statistics derived from the live case collection.
///
/// Never mutated on its own: every instance is produced by folding a case
/// collection. `Default` is the fold of the empty collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    /// Number of cases in the collection.
    pub total_cases: usize,
    /// Case count per status; every status is present, zero included.
    pub cases_by_status: BTreeMap<CaseStatus, usize>,
    /// Case count per severity; every severity is present, zero included.
    pub cases_by_severity: BTreeMap<Severity, usize>,
    /// Case count per detector; only detectors with at least one case.
    pub cases_by_detector: BTreeMap<DetectorType, usize>,
    /// Sum of all known case amounts.
    pub total_amount: f64,
    /// Cases detected since the start of the current UTC day.
    pub detection_rate_today: usize,
    /// Cases detected since seven days before the start of the current UTC day.
    pub detection_rate_week: usize,
    /// Ids of the most recently detected cases, newest first.
    pub recent_cases: Vec<CaseId>,
}

impl DashboardStats {
    /// Case count for one status.
    #[must_use]
    pub fn status_count(&self, status: CaseStatus) -> usize {
        self.cases_by_status.get(&status).copied().unwrap_or(0)
    }

    /// Case count for one severity.
    #[must_use]
    pub fn severity_count(&self, severity: Severity) -> usize {
        self.cases_by_severity.get(&severity).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn pending_cases(&self) -> usize {
        self.status_count(CaseStatus::Pending)
    }

    #[must_use]
    pub fn confirmed_cases(&self) -> usize {
        self.status_count(CaseStatus::Confirmed)
    }

    #[must_use]
    pub fn rejected_cases(&self) -> usize {
        self.status_count(CaseStatus::Rejected)
    }
}

impl Default for DashboardStats {
    fn default() -> Self {
        Self {
            total_cases: 0,
            cases_by_status: CaseStatus::ALL.iter().map(|s| (*s, 0)).collect(),
            cases_by_severity: Severity::ALL.iter().map(|s| (*s, 0)).collect(),
            cases_by_detector: BTreeMap::new(),
            total_amount: 0.0,
            detection_rate_today: 0,
            detection_rate_week: 0,
            recent_cases: vec![],
        }
    }
}

// ---------------------------------------------------------------------------
// Push events
// ---------------------------------------------------------------------------

/// Kind of a structured push event; the routing key of the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A detector raised a new case (`"new_case"` or `"auto_detection"` on the wire).
    NewCaseDetected,
    /// An existing case changed status (`"status_updated"` on the wire).
    CaseStatusChanged,
}

impl EventKind {
    /// Map a wire discriminator to a kind. `None` for unrecognised discriminators.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "new_case" | "auto_detection" => Some(Self::NewCaseDetected),
            "status_updated" => Some(Self::CaseStatusChanged),
            _ => None,
        }
    }
}

/// Payload of a `status_updated` frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusChange {
    /// Case whose status changed.
    pub case_id: CaseId,
    /// Status after the change.
    pub new_status: CaseStatus,
    /// Actor reported by the backend.
    #[serde(default)]
    pub user: Option<String>,
    /// Modification time; absent means "always newer".
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Identity of a newly detected case, as announced by detection broadcasts.
///
/// The backend's detection runs push only these fields; severity, status,
/// and dates arrive with the next snapshot.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaseSummary {
    pub id: CaseId,
    pub case_number: String,
    /// Detector key as reported by the detection run; free-form.
    #[serde(default)]
    pub detector_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// A newly detected case, as complete as the frame that announced it.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectedCase {
    /// Full record; merged directly.
    Complete(FraudCase),
    /// Identity only; the full record must be fetched.
    Summary(CaseSummary),
}

impl DetectedCase {
    /// Fields whose presence marks a full record.
    const RECORD_FIELDS: [&'static str; 2] = ["severity", "detection_date"];

    /// Decode the `case` object of a new-case frame.
    ///
    /// An object carrying the record fields must decode as a full
    /// [`FraudCase`]; anything else decodes as a [`CaseSummary`].
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Invalid`] when the object matches neither
    /// shape, or has an empty `case_number`.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let complete = value
            .as_object()
            .is_some_and(|fields| Self::RECORD_FIELDS.iter().all(|f| fields.contains_key(*f)));
        if complete {
            return FraudCase::from_value(value).map(Self::Complete);
        }
        let summary: CaseSummary = serde_json::from_value(value)
            .map_err(|e| DecodeError::Invalid { reason: e.to_string() })?;
        if summary.case_number.trim().is_empty() {
            return Err(DecodeError::Invalid {
                reason: format!("case {} has an empty case_number", summary.id),
            });
        }
        Ok(Self::Summary(summary))
    }

    /// Id of the detected case.
    #[must_use]
    pub fn id(&self) -> CaseId {
        match self {
            Self::Complete(case) => case.id,
            Self::Summary(summary) => summary.id,
        }
    }

    /// Human-readable case number.
    #[must_use]
    pub fn case_number(&self) -> &str {
        match self {
            Self::Complete(case) => &case.case_number,
            Self::Summary(summary) => &summary.case_number,
        }
    }
}

/// Closed set of push payloads. Every variant is handled exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// A newly detected case, full record or summary.
    NewCaseDetected(DetectedCase),
    /// Status change of an existing case.
    CaseStatusChanged(StatusChange),
}

/// A decoded push-channel frame: typed payload plus optional server time.
#[derive(Debug, Clone, PartialEq)]
pub struct PushEvent {
    pub payload: EventPayload,
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl PushEvent {
    /// Decode one structured text frame.
    ///
    /// Liveness frames are not structured and must be filtered before calling this.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] for non-JSON or non-object frames,
    /// [`DecodeError::MissingKind`] without a string discriminator,
    /// [`DecodeError::UnknownKind`] for an unrecognised discriminator, and
    /// [`DecodeError::Invalid`] when the payload does not match its kind.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| DecodeError::Malformed { reason: e.to_string() })?;
        let Value::Object(mut fields) = value else {
            return Err(DecodeError::Malformed { reason: "frame is not a JSON object".to_owned() });
        };

        let Some(Value::String(tag)) = fields.remove(EVENT_TAG) else {
            return Err(DecodeError::MissingKind);
        };
        let Some(kind) = EventKind::from_tag(&tag) else {
            return Err(DecodeError::UnknownKind { kind: tag });
        };

        let server_timestamp = match fields
            .remove("server_timestamp")
            .or_else(|| fields.remove("serverTimestamp"))
        {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => Some(timestamp::parse(&raw).map_err(|e| {
                DecodeError::Invalid { reason: format!("server_timestamp: {e}") }
            })?),
            Some(other) => {
                return Err(DecodeError::Invalid {
                    reason: format!("server_timestamp must be a string, got {other}"),
                });
            }
        };

        let payload = match kind {
            EventKind::NewCaseDetected => {
                let case = fields.remove("case").ok_or_else(|| DecodeError::Invalid {
                    reason: format!("{tag} frame without a case payload"),
                })?;
                EventPayload::NewCaseDetected(DetectedCase::from_value(case)?)
            }
            EventKind::CaseStatusChanged => EventPayload::CaseStatusChanged(
                serde_json::from_value(Value::Object(fields))
                    .map_err(|e| DecodeError::Invalid { reason: e.to_string() })?,
            ),
        };

        Ok(Self { payload, server_timestamp })
    }

    /// Routing kind of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self.payload {
            EventPayload::NewCaseDetected(_) => EventKind::NewCaseDetected,
            EventPayload::CaseStatusChanged(_) => EventKind::CaseStatusChanged,
        }
    }

    /// Id of the case this event concerns.
    #[must_use]
    pub fn case_id(&self) -> CaseId {
        match &self.payload {
            EventPayload::NewCaseDetected(case) => case.id(),
            EventPayload::CaseStatusChanged(change) => change.case_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Connection state + status writes
// ---------------------------------------------------------------------------

/// Lifecycle of the push-channel connection, exposed as a connectivity indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// First connection attempt in progress.
    Connecting,
    /// Handshake succeeded; frames flow.
    Open,
    /// Lost the channel; waiting for or performing a reconnect attempt.
    Reconnecting,
    /// Explicitly shut down. Terminal.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Reconnecting => "RECONNECTING",
            Self::Closed => "CLOSED",
        })
    }
}

/// A status write request sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub case_id: CaseId,
    pub status: CaseStatus,
    /// Audit notes; recorded, never validated.
    pub notes: Option<String>,
    /// Acting analyst; recorded, never validated.
    pub actor: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Transient push-channel failures. Always recovered by reconnecting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The handshake could not be completed.
    #[error("connect failed: {reason}")]
    ConnectFailed {
        /// Human-readable description.
        reason: String,
    },
    /// Reading or writing a frame failed.
    #[error("transport error: {reason}")]
    Transport {
        /// Human-readable description.
        reason: String,
    },
    /// The peer closed the channel.
    #[error("channel closed by peer")]
    Closed,
}

/// Per-frame decode failures. The frame is dropped; the channel survives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Not JSON, or not a JSON object.
    #[error("malformed frame: {reason}")]
    Malformed {
        /// Human-readable description.
        reason: String,
    },
    /// No string discriminator field.
    #[error("frame has no event discriminator")]
    MissingKind,
    /// Discriminator not in the closed set of event kinds.
    #[error("unknown event kind: {kind}")]
    UnknownKind {
        /// The unrecognised discriminator.
        kind: String,
    },
    /// Payload does not match its kind or violates a value invariant.
    #[error("invalid payload: {reason}")]
    Invalid {
        /// Human-readable description.
        reason: String,
    },
}

/// Snapshot fetch failures. The previous snapshot is retained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The backend could not be reached or answered with an error status.
    #[error("snapshot source unavailable: {reason}")]
    Unavailable {
        /// Human-readable description.
        reason: String,
    },
    /// The response body was not a case collection.
    #[error("invalid snapshot response: {reason}")]
    InvalidResponse {
        /// Human-readable description.
        reason: String,
    },
}

/// Status write failures. The cache is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    /// The backend refused the write.
    #[error("status write rejected (HTTP {status}): {reason}")]
    Rejected {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Response body or description.
        reason: String,
    },
    /// The backend could not be reached.
    #[error("status write unreachable: {reason}")]
    Unreachable {
        /// Human-readable description.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Hexagonal port: establishes push-channel connections.
///
/// The Connection Manager depends exclusively on this trait; the websocket
/// adapter lives in the binary crate.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait PushTransport {
    /// Connection produced by a successful handshake.
    type Connection: PushConnection;

    /// Perform one connection handshake.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::ConnectFailed`] when the handshake fails.
    async fn connect(&self) -> Result<Self::Connection, ChannelError>;
}

/// Hexagonal port: one live push-channel connection carrying text frames.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait PushConnection {
    /// Send one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Transport`] when the frame cannot be written.
    async fn send_text(&mut self, text: &str) -> Result<(), ChannelError>;

    /// Wait for the next inbound text frame.
    ///
    /// Returns `None` once the peer has closed the channel. Must be
    /// cancel-safe: dropping the future loses no frame.
    async fn next_text(&mut self) -> Option<Result<String, ChannelError>>;

    /// Close the channel; best-effort, never fails.
    async fn close(&mut self);
}

/// Hexagonal port: full-collection snapshot fetch.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait SnapshotSource {
    /// Fetch the complete current case collection.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the collection cannot be obtained.
    async fn fetch_all(&self) -> Result<Vec<FraudCase>, FetchError>;
}

/// Hexagonal port: remote case-status write.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait StatusWriter {
    /// Persist a status change. Treated as atomic; never auto-retried.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError`] when the backend rejects or cannot receive the write.
    async fn write_status(&self, update: &StatusUpdate) -> Result<(), WriteError>;
}

/// Hexagonal port: wall-clock time, injectable for deterministic tests.
pub trait Clock {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}
