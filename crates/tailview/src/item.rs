#![forbid(unsafe_code)]

//! Log items and their identity.
//!
//! Every cache in the engine keys on [`ItemId`], never on array position, so
//! heights and "already rendered" status survive appends and front eviction.
//!
//! Ids are produced per stream session. [`SessionIds`] mixes the wall clock,
//! the process id and a per-instance random hasher key into the session half
//! of the id, so two viewers running side by side never hand out the same id.

use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::BuildHasher;
use std::time::{SystemTime, UNIX_EPOCH};

/// FNV-1a 64-bit offset basis.
const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
/// FNV-1a 64-bit prime.
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv_hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(FNV_PRIME);
    }
}

/// Stable identity of one displayed item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId {
    /// Stream session the id was minted in.
    pub session: u64,
    /// Sequence number within the session.
    pub seq: u64,
}

impl ItemId {
    /// Create an id from its raw parts.
    #[must_use]
    pub const fn new(session: u64, seq: u64) -> Self {
        Self { session, seq }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}:{}", self.session, self.seq)
    }
}

/// Source of fresh item ids.
///
/// Callers that already have unique keys (database rows, stream offsets)
/// implement this themselves; everyone else uses [`SessionIds`].
pub trait IdSource {
    /// Produce an id never returned before by this source.
    fn next_id(&mut self) -> ItemId;
}

/// Monotonic id generator scoped to one stream session.
#[derive(Debug, Clone)]
pub struct SessionIds {
    session: u64,
    next: u64,
}

impl SessionIds {
    /// Start a new session with a freshly derived session key.
    #[must_use]
    pub fn new() -> Self {
        Self::with_session(derive_session_key())
    }

    /// Start a session with a fixed key (deterministic ids for tests and replays).
    #[must_use]
    pub const fn with_session(session: u64) -> Self {
        Self { session, next: 0 }
    }

    /// Session key shared by every id from this generator.
    #[must_use]
    pub const fn session(&self) -> u64 {
        self.session
    }

    /// Number of ids handed out so far.
    #[must_use]
    pub const fn issued(&self) -> u64 {
        self.next
    }
}

impl Default for SessionIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for SessionIds {
    fn next_id(&mut self) -> ItemId {
        let id = ItemId::new(self.session, self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}

fn derive_session_key() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut hash = FNV_OFFSET_BASIS;
    fnv_hash_bytes(&mut hash, &nanos.to_le_bytes());
    fnv_hash_bytes(&mut hash, &std::process::id().to_le_bytes());
    // Each RandomState carries distinct keys, so sessions created within the
    // same clock tick still diverge.
    hash ^ RandomState::new().hash_one(hash)
}

/// Severity tag attached to a log line. Display-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name, case-insensitively. Accepts common aliases.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" | "trc" => Some(Self::Trace),
            "debug" | "dbg" => Some(Self::Debug),
            "info" | "inf" => Some(Self::Info),
            "warn" | "warning" | "wrn" => Some(Self::Warn),
            "error" | "err" | "fatal" => Some(Self::Error),
            _ => None,
        }
    }

    /// Sniff a level from the first few tokens of a line, e.g. `"[WARN] disk 91%"`.
    #[must_use]
    pub fn sniff(line: &str) -> Option<Self> {
        line.split(|c: char| c.is_whitespace() || matches!(c, '[' | ']' | '|'))
            .map(|token| token.trim_matches(':'))
            .filter(|token| !token.is_empty())
            .take(3)
            .find_map(Self::parse)
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of displayable log content.
#[derive(Debug, Clone, PartialEq)]
pub struct LogItem {
    pub id: ItemId,
    /// Text payload; may span several lines.
    pub content: String,
    pub timestamp: SystemTime,
    pub level: Option<LogLevel>,
    pub source: Option<String>,
}

impl LogItem {
    /// Create an item stamped with the current time.
    #[must_use]
    pub fn new(id: ItemId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            timestamp: SystemTime::now(),
            level: None,
            source: None,
        }
    }

    /// Set the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the level tag.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Set the source tag.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Anything the list can key on.
pub trait Keyed {
    fn key(&self) -> ItemId;
}

impl Keyed for LogItem {
    fn key(&self) -> ItemId {
        self.id
    }
}

impl Keyed for ItemId {
    fn key(&self) -> ItemId {
        *self
    }
}

impl<T: Keyed + ?Sized> Keyed for &T {
    fn key(&self) -> ItemId {
        (**self).key()
    }
}
