use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use crate::traits::{Clock, LiquidityQuote, QuoteFetcher};

/// Composite key: (next hop account, address prefix).
type QuoteKey = (String, String);

/// Remote liquidity quotes received from peers, keyed by next hop and prefix.
///
/// Lookups pick the longest unexpired prefix matching the destination among
/// the quotes advertised by the requested next hop.
pub struct CurveCache {
    quotes: DashMap<QuoteKey, LiquidityQuote>,
    clock: Arc<dyn Clock>,
}

impl CurveCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            quotes: DashMap::new(),
            clock,
        }
    }

    /// Insert or replace the quote `next_hop` advertised for `quote.prefix`.
    pub fn insert(&self, next_hop: impl Into<String>, quote: LiquidityQuote) -> Option<LiquidityQuote> {
        let key = (next_hop.into(), quote.prefix.clone());
        tracing::debug!(next_hop = %key.0, prefix = %key.1, expires_at = %quote.expires_at, "liquidity curve cached");
        self.quotes.insert(key, quote)
    }

    /// Drop every quote that expired at or before `now`. Returns the number
    /// removed.
    pub fn remove_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.quotes.len();
        self.quotes.retain(|_key, quote| quote.expires_at > now);
        before - self.quotes.len()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[async_trait]
impl QuoteFetcher for CurveCache {
    async fn quote_liquidity(&self, next_hop: &str, destination: &str) -> Option<LiquidityQuote> {
        let now = self.clock.now();
        let found = self
            .quotes
            .iter()
            .filter(|entry| {
                let (hop, prefix) = entry.key();
                hop == next_hop
                    && destination.starts_with(prefix.as_str())
                    && entry.value().expires_at > now
            })
            .max_by_key(|entry| entry.key().1.len())
            .map(|entry| entry.value().clone());

        if found.is_none() {
            tracing::debug!(%next_hop, %destination, "no cached liquidity curve");
        }
        found
    }
}
