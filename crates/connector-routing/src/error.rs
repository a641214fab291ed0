use rust_decimal::Decimal;

/// Reasons the route builder refuses a quote or a forward.
///
/// None of these are retried by the builder; the caller owns retry policy.
#[derive(Debug, thiserror::Error)]
pub enum RouteBuilderError {
    #[error("no route found: {0}")]
    NoRouteFound(String),

    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    #[error("invalid amount specified: {0}")]
    InvalidAmountSpecified(String),

    #[error("unacceptable amount: {0}")]
    UnacceptableAmount(String),

    #[error("unacceptable expiry: {0}")]
    UnacceptableExpiry(String),

    #[error("insufficient timeout: {0}")]
    InsufficientTimeout(String),

    #[error("ledger not connected: {0}")]
    LedgerNotConnected(String),

    #[error("rate backend error: {0}")]
    RateBackend(#[from] BackendError),

    #[error("liquidity curve error: {0}")]
    Curve(#[from] CurveError),
}

/// Rate backend failures.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("no rate configured for asset {0}")]
    MissingRate(String),

    #[error("invalid rate: {0}")]
    InvalidRate(String),
}

/// Liquidity curve construction and decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CurveError {
    #[error("curve must contain at least one point")]
    Empty,

    #[error("negative coordinate at point {index}")]
    NegativeCoordinate { index: usize },

    #[error("input amounts must be strictly increasing (point {index})")]
    UnorderedInput { index: usize },

    #[error("output amounts must be non-decreasing (point {index})")]
    DecreasingOutput { index: usize },

    #[error("rate must be positive, got {0}")]
    InvalidRate(Decimal),

    #[error("malformed curve encoding: {0}")]
    Malformed(String),
}
