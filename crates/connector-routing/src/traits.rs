use async_trait::async_trait;
use chrono::{DateTime, Utc};
use connector_core::{AccountId, AccountInfo};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::curve::LiquidityCurve;
use crate::error::BackendError;

/// The routing-table entry a destination resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// The peer account a payment toward the destination is forwarded to.
    pub next_hop: AccountId,
}

impl Route {
    pub fn new(next_hop: impl Into<AccountId>) -> Self {
        Self {
            next_hop: next_hop.into(),
        }
    }
}

/// Maps address prefixes to routes.
pub trait RoutingTable: Send + Sync {
    /// The route for the longest table prefix `address` starts with.
    fn resolve(&self, address: &str) -> Option<Route>;

    /// Shortest prefix of `address`, at least as long as `prefix`, under
    /// which no more specific route exists, so a quote computed for
    /// `address` holds for every address sharing it.
    fn shortest_unambiguous_prefix(&self, address: &str, prefix: &str) -> String;
}

/// Ledger facts about peer accounts.
pub trait AccountRegistry: Send + Sync {
    /// Asset code of the account, or `None` if the account is unknown.
    fn asset_code(&self, account: &str) -> Option<String>;

    fn info(&self, account: &str) -> Option<AccountInfo>;

    /// Whether the account's plugin currently has a live connection.
    fn is_connected(&self, account: &str) -> bool;
}

/// Local exchange-rate source.
#[async_trait]
pub trait RateBackend: Send + Sync {
    /// Rate to apply to an amount received from `source` when sending it to
    /// `destination`, already adjusted for asset scale and spread.
    async fn get_rate(&self, source: &str, destination: &str) -> Result<Decimal, BackendError>;
}

/// A liquidity curve advertised by a next hop for destinations beyond it.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityQuote {
    /// Maps amounts arriving at the next hop to amounts delivered.
    pub curve: LiquidityCurve,
    /// Address prefix the curve applies to.
    pub prefix: String,
    /// Time the downstream path needs between its commitments (ms).
    pub min_message_window_ms: u64,
    pub expires_at: DateTime<Utc>,
}

/// Fetches remote liquidity for destinations past the next hop.
#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    /// Returns `None` when no curve is known for the destination through
    /// `next_hop`.
    async fn quote_liquidity(&self, next_hop: &str, destination: &str) -> Option<LiquidityQuote>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
