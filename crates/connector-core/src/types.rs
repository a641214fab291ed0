use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a peer account (the next hop of a route is one of these).
pub type AccountId = String;

/// Static ledger properties of a peer account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Asset code, e.g. "USD" or "XRP".
    pub asset_code: String,
    /// Number of decimal places the account's integer amounts are shifted by.
    pub asset_scale: u8,
}

impl AccountInfo {
    pub fn new(asset_code: impl Into<String>, asset_scale: u8) -> Self {
        Self {
            asset_code: asset_code.into(),
            asset_scale,
        }
    }
}

/// A 32-byte execution condition. A packet is fulfilled by revealing the
/// preimage whose BLAKE3 hash equals the condition.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionCondition(pub [u8; 32]);

impl ExecutionCondition {
    /// Derive the condition for a fulfillment preimage.
    pub fn from_fulfillment(fulfillment: &[u8]) -> Self {
        Self(*blake3::hash(fulfillment).as_bytes())
    }

    /// Returns true if `fulfillment` hashes to this condition.
    pub fn is_fulfilled_by(&self, fulfillment: &[u8]) -> bool {
        *blake3::hash(fulfillment).as_bytes() == self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ExecutionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ExecutionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExecutionCondition({})", hex::encode(self.0))
    }
}

/// A prepare packet: a conditional transfer offer travelling toward
/// `destination`. Forwarding rewrites only `amount` and `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparePacket {
    /// Amount in the receiving account's integer units.
    pub amount: u64,
    /// Condition the receiver must fulfill before `expires_at`.
    pub execution_condition: ExecutionCondition,
    /// Instant after which the offer is void.
    pub expires_at: DateTime<Utc>,
    /// Final destination address.
    pub destination: String,
    /// Opaque end-to-end payload.
    pub data: Bytes,
}

impl PreparePacket {
    /// Returns true if the packet has expired relative to `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}
