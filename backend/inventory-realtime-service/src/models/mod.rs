use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Inventory mutation payload. Passed through the hub untouched.
pub type InventoryChangeEvent = serde_json::Value;

/// Household/account identifier supplied by the client after authentication.
///
/// Always non-empty; surrounding whitespace is stripped on parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(UserId(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport-level identifier for one live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        ConnectionId(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Broadcast channel scoped to exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelKey {
    Inventory(UserId),
    Expiry(UserId),
}

impl ChannelKey {
    pub fn user_id(&self) -> &UserId {
        match self {
            ChannelKey::Inventory(user_id) | ChannelKey::Expiry(user_id) => user_id,
        }
    }

    /// Channel family, used for metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelKey::Inventory(_) => "inventory",
            ChannelKey::Expiry(_) => "expiry",
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.user_id())
    }
}

impl FromStr for ChannelKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, user) = s
            .split_once(':')
            .ok_or_else(|| format!("channel key {:?} has no family prefix", s))?;
        let user_id =
            UserId::parse(user).ok_or_else(|| format!("channel key {:?} has no user id", s))?;

        match kind {
            "inventory" => Ok(ChannelKey::Inventory(user_id)),
            "expiry" => Ok(ChannelKey::Expiry(user_id)),
            other => Err(format!("unknown channel family {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

impl AlertLevel {
    /// `critical` at one day or less, `warning` up to three days, `info` beyond.
    pub fn from_days_remaining(days_remaining: i64) -> Self {
        if days_remaining <= 1 {
            AlertLevel::Critical
        } else if days_remaining <= 3 {
            AlertLevel::Warning
        } else {
            AlertLevel::Info
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
        }
    }
}

/// Alert pushed to `expiry:<user>` subscribers. Derived per scan, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpiryAlertEvent {
    pub product: String,
    pub expiry_date: DateTime<Utc>,
    pub days_remaining: i64,
    pub alert_level: AlertLevel,
}

impl ExpiryAlertEvent {
    pub fn for_item(item: &ExpiringItem, now: DateTime<Utc>) -> Self {
        let days_remaining = days_remaining(item.expiry_date, now);
        Self {
            product: item.product_name.clone(),
            expiry_date: item.expiry_date,
            days_remaining,
            alert_level: AlertLevel::from_days_remaining(days_remaining),
        }
    }
}

/// Whole days until `expiry_date`, rounded up. Twelve hours left counts as one day.
pub fn days_remaining(expiry_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    let millis = (expiry_date - now).num_milliseconds();
    let whole = millis.div_euclid(DAY_MS);
    if millis.rem_euclid(DAY_MS) > 0 {
        whole + 1
    } else {
        whole
    }
}

/// Active inventory record joined with its product name and owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct ExpiringItem {
    pub user_id: String,
    pub product_id: String,
    pub product_name: String,
    pub expiry_date: DateTime<Utc>,
    pub status: String,
    pub quantity: i32,
}

/// Inclusive time range searched by one scan cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ScanWindow {
    pub fn starting_at(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: now,
            end: now + Duration::days(days),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}
