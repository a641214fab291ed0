//! Shared fixtures for cross-crate connector tests.
//!
//! The network is two connectors in a line. Connector A serves the sender
//! account `g.a.alice` (USD) and peers with B over `g.b` (EUR). Connector B
//! peers back with A over `g.a` (EUR) and reaches `g.c` (JPY) directly.
//! Addresses under `g.c` are remote for A and local for B.

use chrono::{DateTime, Utc};
use connector_core::ConnectorConfig;
use connector_routing::{
    build_backend, CurveCache, FixedClock, InMemoryAccounts, LiquidityCurve, LiquidityQuote,
    LiquidityQuoteResponse, PrefixRoutingTable, Route, RouteBuilder,
};
use std::sync::Arc;

pub const ALICE: &str = "g.a.alice";
pub const A_TO_B: &str = "g.b";
pub const B_TO_A: &str = "g.a";
pub const B_TO_C: &str = "g.c";
pub const DAVE: &str = "g.c.dave";

pub const CONNECTOR_A: &str = r#"
[routing]
backend = "static"

[[accounts]]
id = "g.a.alice"
asset_code = "USD"
asset_scale = 2

[[accounts]]
id = "g.b"
asset_code = "EUR"
asset_scale = 2

[[routes]]
prefix = "g.a.alice"
next_hop = "g.a.alice"

[[routes]]
prefix = "g.b"
next_hop = "g.b"

[[routes]]
prefix = "g.c"
next_hop = "g.b"

[rates]
USD = "1"
EUR = "0.9"
"#;

pub const CONNECTOR_B: &str = r#"
[routing]
backend = "static"

[[accounts]]
id = "g.a"
asset_code = "EUR"
asset_scale = 2

[[accounts]]
id = "g.c"
asset_code = "JPY"
asset_scale = 0

[[routes]]
prefix = "g.a"
next_hop = "g.a"

[[routes]]
prefix = "g.c"
next_hop = "g.c"

[rates]
EUR = "1"
JPY = "150"
"#;

/// One connector with handles on its in-memory collaborators.
pub struct Connector {
    pub accounts: Arc<InMemoryAccounts>,
    pub table: Arc<PrefixRoutingTable>,
    pub quotes: Arc<CurveCache>,
    pub builder: RouteBuilder,
}

impl Connector {
    pub fn new(config: &ConnectorConfig, clock: Arc<FixedClock>) -> Self {
        let accounts = Arc::new(InMemoryAccounts::from_config(&config.accounts));
        let table = Arc::new(PrefixRoutingTable::new());
        for route in &config.routes {
            table.insert(route.prefix.clone(), Route::new(route.next_hop.clone()));
        }
        let quotes = Arc::new(CurveCache::new(clock.clone()));
        let backend = build_backend(&config.routing, accounts.clone(), &config.rates);
        let builder = RouteBuilder::new(
            table.clone(),
            accounts.clone(),
            backend,
            quotes.clone(),
            config.routing.clone(),
        )
        .with_clock(clock);

        Self {
            accounts,
            table,
            quotes,
            builder,
        }
    }

    /// Cache a liquidity quote the peer behind `next_hop` issued for a
    /// destination hold of `destination_hold` ms.
    pub fn learn(&self, next_hop: &str, quote: &LiquidityQuoteResponse, destination_hold: u64) {
        let curve = LiquidityCurve::from_bytes(&quote.liquidity_curve).expect("peer curve decodes");
        self.quotes.insert(
            next_hop,
            LiquidityQuote {
                curve,
                prefix: quote.applies_to_prefix.clone(),
                min_message_window_ms: quote.source_hold_duration - destination_hold,
                expires_at: quote.expires_at,
            },
        );
    }
}

pub struct Network {
    pub now: DateTime<Utc>,
    pub clock: Arc<FixedClock>,
    pub a: Connector,
    pub b: Connector,
}

/// The two-connector network with default routing parameters.
pub fn network() -> Network {
    network_with(|_| {}, |_| {})
}

/// The two-connector network, letting the caller adjust either config.
pub fn network_with(
    adjust_a: impl FnOnce(&mut ConnectorConfig),
    adjust_b: impl FnOnce(&mut ConnectorConfig),
) -> Network {
    let now = Utc::now();
    let clock = Arc::new(FixedClock::new(now));

    let mut config_a = ConnectorConfig::from_toml(CONNECTOR_A).expect("connector A config is valid");
    let mut config_b = ConnectorConfig::from_toml(CONNECTOR_B).expect("connector B config is valid");
    adjust_a(&mut config_a);
    adjust_b(&mut config_b);

    Network {
        now,
        a: Connector::new(&config_a, clock.clone()),
        b: Connector::new(&config_b, clock.clone()),
        clock,
    }
}
