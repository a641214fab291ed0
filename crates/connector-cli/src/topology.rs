//! Assembles the in-memory collaborators described by a `ConnectorConfig`.

use anyhow::Context;
use chrono::{Duration, Utc};
use connector_core::ConnectorConfig;
use connector_routing::{
    build_backend, CurveCache, InMemoryAccounts, LiquidityCurve, LiquidityQuote,
    PrefixRoutingTable, Route, RouteBuilder, SystemClock,
};
use std::sync::Arc;

pub fn build(config: &ConnectorConfig) -> anyhow::Result<RouteBuilder> {
    let accounts = Arc::new(InMemoryAccounts::from_config(&config.accounts));

    let table = Arc::new(PrefixRoutingTable::new());
    for route in &config.routes {
        table.insert(route.prefix.clone(), Route::new(route.next_hop.clone()));
    }

    let quotes = Arc::new(CurveCache::new(Arc::new(SystemClock)));
    let now = Utc::now();
    for remote in &config.remote_curves {
        let curve = LiquidityCurve::from_pairs(remote.points.iter().map(|[x, y]| (*x, *y)))
            .with_context(|| format!("invalid remote curve for {}", remote.prefix))?;
        let ttl = Duration::milliseconds(i64::try_from(remote.ttl_ms).unwrap_or(i64::MAX));
        let expires_at = now
            .checked_add_signed(ttl)
            .with_context(|| format!("ttl_ms out of range for {}", remote.prefix))?;
        quotes.insert(
            remote.next_hop.clone(),
            LiquidityQuote {
                curve,
                prefix: remote.prefix.clone(),
                min_message_window_ms: remote.min_message_window_ms,
                expires_at,
            },
        );
    }

    let backend = build_backend(&config.routing, accounts.clone(), &config.rates);

    tracing::info!(
        accounts = accounts.len(),
        routes = table.len(),
        remote_curves = quotes.len(),
        "connector assembled"
    );

    Ok(RouteBuilder::new(
        table,
        accounts,
        backend,
        quotes,
        config.routing.clone(),
    ))
}
