//! Connector Routing: route resolution and quote construction.
//!
//! This crate provides:
//! - [`LiquidityCurve`]: an immutable piecewise-linear amount mapping with exact
//!   composition, used to quote across several hops at once.
//! - [`RouteBuilder`]: answers liquidity, by-source and by-destination quotes and
//!   builds the outbound packet for a forwarded prepare.
//! - The collaborator contracts the builder consumes ([`RoutingTable`],
//!   [`AccountRegistry`], [`RateBackend`], [`QuoteFetcher`], [`Clock`]) and
//!   in-memory implementations of each.

pub mod accounts;
pub mod backend;
pub mod builder;
pub mod clock;
pub mod curve;
pub mod error;
pub mod quoter;
pub mod table;
pub mod traits;

// Re-exports for convenience.
pub use accounts::InMemoryAccounts;
pub use backend::{build_backend, OneToOneBackend, StaticRateBackend};
pub use builder::{
    LiquidityQuoteRequest, LiquidityQuoteResponse, LocalQuote, NextHopPacket,
    QuoteByDestinationRequest, QuoteByDestinationResponse, QuoteBySourceRequest,
    QuoteBySourceResponse, RouteBuilder,
};
pub use clock::{FixedClock, SystemClock};
pub use curve::{LiquidityCurve, Point, REFERENCE_AMOUNT};
pub use error::{BackendError, CurveError, RouteBuilderError};
pub use quoter::CurveCache;
pub use table::PrefixRoutingTable;
pub use traits::{
    AccountRegistry, Clock, LiquidityQuote, QuoteFetcher, RateBackend, Route, RoutingTable,
};
