//! Quote and forwarding-packet construction.
//!
//! Every operation is a single request/response flow. The only suspension
//! points are the rate lookup and the remote liquidity fetch; the builder
//! itself holds no mutable state, so one instance can serve any number of
//! concurrent requests.

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use connector_core::config::RoutingConfig;
use connector_core::{AccountId, PreparePacket};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::clock::SystemClock;
use crate::curve::LiquidityCurve;
use crate::error::RouteBuilderError;
use crate::traits::{
    AccountRegistry, Clock, LiquidityQuote, QuoteFetcher, RateBackend, RoutingTable,
};

/// Request for a liquidity curve from `source_account` to `destination_account`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityQuoteRequest {
    pub source_account: AccountId,
    pub destination_account: String,
    /// Time the final receiver needs to hold the payment (ms).
    pub destination_hold_duration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityQuoteResponse {
    /// Encoded [`LiquidityCurve`] from source amount to destination amount.
    pub liquidity_curve: Bytes,
    /// Shortest prefix of the destination the curve is valid for.
    pub applies_to_prefix: String,
    /// Hold time the sender must grant this connector (ms).
    pub source_hold_duration: u64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteBySourceRequest {
    pub source_account: AccountId,
    pub destination_account: String,
    pub source_amount: u64,
    pub destination_hold_duration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteBySourceResponse {
    pub destination_amount: u64,
    pub source_hold_duration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteByDestinationRequest {
    pub source_account: AccountId,
    pub destination_account: String,
    pub destination_amount: u64,
    pub destination_hold_duration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteByDestinationResponse {
    pub source_amount: u64,
    pub source_hold_duration: u64,
}

/// The next hop for a destination and the local rate toward it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalQuote {
    pub next_hop: AccountId,
    pub rate: Decimal,
}

/// Where to send a forwarded prepare and what to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextHopPacket {
    pub next_hop: AccountId,
    pub next_hop_packet: PreparePacket,
}

/// Builds quotes and outbound packets from the routing table, account
/// registry, rate backend and remote quote fetcher it is constructed with.
pub struct RouteBuilder {
    routing_table: Arc<dyn RoutingTable>,
    accounts: Arc<dyn AccountRegistry>,
    backend: Arc<dyn RateBackend>,
    quoter: Arc<dyn QuoteFetcher>,
    config: RoutingConfig,
    clock: Arc<dyn Clock>,
}

impl RouteBuilder {
    pub fn new(
        routing_table: Arc<dyn RoutingTable>,
        accounts: Arc<dyn AccountRegistry>,
        backend: Arc<dyn RateBackend>,
        quoter: Arc<dyn QuoteFetcher>,
        config: RoutingConfig,
    ) -> Self {
        Self {
            routing_table,
            accounts,
            backend,
            quoter,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Resolve the next hop for `destination`, applying the reflection rule.
    fn resolve_next_hop(&self, source: &str, destination: &str) -> Result<AccountId, NextHopFailure> {
        let route = self.routing_table.resolve(destination).ok_or_else(|| {
            NextHopFailure::NoRoute(format!(
                "no route found. source={} destination={}",
                source, destination
            ))
        })?;
        if !self.config.reflect_payments && route.next_hop == source {
            return Err(NextHopFailure::Reflected(format!(
                "refusing to route payments back to sender. sourceAccount={} destinationAccount={}",
                source, destination
            )));
        }
        Ok(route.next_hop)
    }

    /// The next hop a payment from `source` to `destination` goes to.
    pub fn get_next_hop(&self, source: &str, destination: &str) -> Result<AccountId, RouteBuilderError> {
        self.resolve_next_hop(source, destination).map_err(|failure| {
            let reason = failure.into_reason();
            tracing::warn!(%source, %destination, %reason, "no next hop");
            RouteBuilderError::NoRouteFound(reason)
        })
    }

    /// Resolve the next hop and fetch the local rate toward it.
    pub async fn quote_local(&self, source: &str, destination: &str) -> Result<LocalQuote, RouteBuilderError> {
        if self.accounts.asset_code(source).is_none() {
            return Err(RouteBuilderError::NoRouteFound(format!(
                "source account is unavailable. sourceAccount={}",
                source
            )));
        }

        let next_hop = self.get_next_hop(source, destination)?;
        if self.accounts.asset_code(&next_hop).is_none() {
            return Err(RouteBuilderError::NoRouteFound(format!(
                "next hop account is unavailable. nextHop={}",
                next_hop
            )));
        }

        let rate = self.backend.get_rate(source, &next_hop).await?;
        tracing::debug!(%source, %destination, %next_hop, %rate, "local quote");
        Ok(LocalQuote { next_hop, rate })
    }

    /// Quote a liquidity curve the sender can cache and evaluate for any
    /// amount toward addresses under the returned prefix.
    pub async fn quote_liquidity(
        &self,
        request: &LiquidityQuoteRequest,
    ) -> Result<LiquidityQuoteResponse, RouteBuilderError> {
        let source = request.source_account.as_str();
        let destination = request.destination_account.as_str();
        let destination_hold = request.destination_hold_duration;
        let window = self.config.min_message_window_ms;

        let LocalQuote { next_hop, rate } = self.quote_local(source, destination).await?;
        let local_curve = LiquidityCurve::from_rate(rate)?;
        let local_expiry = offset(self.clock.now(), self.config.quote_expiry())?;

        let (curve, prefix, source_hold, expires_at) = if is_local(destination, &next_hop) {
            tracing::debug!(%destination, %next_hop, "local destination");
            (
                local_curve,
                next_hop.clone(),
                destination_hold.saturating_add(window),
                local_expiry,
            )
        } else {
            let remote = self.fetch_remote_quote(&next_hop, destination).await?;
            tracing::debug!(%destination, %next_hop, prefix = %remote.prefix, "remote destination");
            (
                local_curve.join(&remote.curve),
                remote.prefix,
                destination_hold
                    .saturating_add(remote.min_message_window_ms)
                    .saturating_add(window),
                remote.expires_at.min(local_expiry),
            )
        };

        self.verify_connected(&next_hop)?;
        self.validate_hold_durations(source_hold, destination_hold)?;

        // Bias the input axis so that rounding downstream never lets a sender
        // relying on the cached curve come up one unit short.
        let shift = self.scale_adjustment(source, &next_hop)?;
        let curve = curve.shift_x(shift);
        let applies_to_prefix = self
            .routing_table
            .shortest_unambiguous_prefix(destination, &prefix);

        tracing::info!(
            %source,
            %destination,
            %next_hop,
            %applies_to_prefix,
            source_hold_duration = source_hold,
            %expires_at,
            "quoted liquidity"
        );

        Ok(LiquidityQuoteResponse {
            liquidity_curve: curve.to_bytes(),
            applies_to_prefix,
            source_hold_duration: source_hold,
            expires_at,
        })
    }

    /// Quote how much arrives at the destination for a fixed source amount.
    pub async fn quote_by_source(
        &self,
        request: &QuoteBySourceRequest,
    ) -> Result<QuoteBySourceResponse, RouteBuilderError> {
        if request.source_amount == 0 {
            return Err(RouteBuilderError::InvalidAmountSpecified(
                "sourceAmount must be positive".into(),
            ));
        }

        let source = request.source_account.as_str();
        let destination = request.destination_account.as_str();
        let destination_hold = request.destination_hold_duration;
        let window = self.config.min_message_window_ms;

        let LocalQuote { next_hop, rate } = self.quote_local(source, destination).await?;

        let (destination_amount, source_hold) = if is_local(destination, &next_hop) {
            let next_amount = floor_amount(scale_amount(request.source_amount, rate)?)?;
            (next_amount, destination_hold.saturating_add(window))
        } else {
            let remote = self.fetch_remote_quote(&next_hop, destination).await?;
            let remote_amount = remote
                .curve
                .amount_at(Decimal::from(request.source_amount))
                .checked_mul(rate)
                .ok_or_else(|| {
                    RouteBuilderError::UnacceptableAmount(format!(
                        "quoted amount overflows. sourceAmount={} rate={}",
                        request.source_amount, rate
                    ))
                })?;
            (
                floor_amount(remote_amount)?,
                destination_hold
                    .saturating_add(remote.min_message_window_ms)
                    .saturating_add(window),
            )
        };

        if destination_amount == 0 {
            return Err(RouteBuilderError::UnacceptableAmount(format!(
                "quoted destination is lower than minimum amount allowed. sourceAmount={} destination={}",
                request.source_amount, destination
            )));
        }

        self.verify_connected(source)?;
        self.verify_connected(&next_hop)?;
        self.validate_hold_durations(source_hold, destination_hold)?;

        tracing::info!(
            %source,
            %destination,
            %next_hop,
            source_amount = request.source_amount,
            destination_amount,
            "quoted by source amount"
        );

        Ok(QuoteBySourceResponse {
            destination_amount,
            source_hold_duration: source_hold,
        })
    }

    /// Quote how much the sender must send for a fixed destination amount.
    pub async fn quote_by_destination(
        &self,
        request: &QuoteByDestinationRequest,
    ) -> Result<QuoteByDestinationResponse, RouteBuilderError> {
        if request.destination_amount == 0 {
            return Err(RouteBuilderError::InvalidAmountSpecified(
                "destinationAmount must be positive".into(),
            ));
        }

        let source = request.source_account.as_str();
        let destination = request.destination_account.as_str();
        let destination_hold = request.destination_hold_duration;
        let window = self.config.min_message_window_ms;

        let LocalQuote { next_hop, rate } = self.quote_local(source, destination).await?;

        let (next_hop_amount, next_hop_hold) = if is_local(destination, &next_hop) {
            (Decimal::from(request.destination_amount), destination_hold)
        } else {
            let remote = self.fetch_remote_quote(&next_hop, destination).await?;
            let amount = remote
                .curve
                .amount_reverse(Decimal::from(request.destination_amount))
                .ok_or_else(|| {
                    RouteBuilderError::UnacceptableAmount(format!(
                        "destination amount exceeds available liquidity. destinationAmount={} destination={}",
                        request.destination_amount, destination
                    ))
                })?;
            (
                amount,
                destination_hold.saturating_add(remote.min_message_window_ms),
            )
        };

        let source_amount = next_hop_amount
            .checked_div(rate)
            .ok_or_else(|| {
                RouteBuilderError::UnacceptableAmount(format!(
                    "cannot convert amount at rate. amount={} rate={}",
                    next_hop_amount, rate
                ))
            })
            .and_then(ceil_amount)?;
        let source_hold = next_hop_hold.saturating_add(window);

        if source_amount == 0 {
            return Err(RouteBuilderError::UnacceptableAmount(format!(
                "source amount rounded to zero. destinationAmount={} destination={}",
                request.destination_amount, destination
            )));
        }

        self.verify_connected(source)?;
        self.verify_connected(&next_hop)?;
        self.validate_hold_durations(source_hold, destination_hold)?;

        tracing::info!(
            %source,
            %destination,
            %next_hop,
            source_amount,
            destination_amount = request.destination_amount,
            "quoted by destination amount"
        );

        Ok(QuoteByDestinationResponse {
            source_amount,
            source_hold_duration: source_hold,
        })
    }

    /// Build the outbound packet for a prepare received from `source_account`.
    /// Only the amount and expiry are rewritten.
    pub async fn get_next_hop_packet(
        &self,
        source_account: &str,
        packet: &PreparePacket,
    ) -> Result<NextHopPacket, RouteBuilderError> {
        if packet.destination.is_empty() {
            return Err(RouteBuilderError::InvalidPacket(
                "missing destination.".into(),
            ));
        }

        // A missing route is a mid-transfer failure; refused reflection
        // behaves as it does when quoting.
        let next_hop = self
            .resolve_next_hop(source_account, &packet.destination)
            .map_err(|failure| {
                tracing::warn!(source = %source_account, destination = %packet.destination, ?failure, "cannot forward");
                match failure {
                    NextHopFailure::NoRoute(reason) => RouteBuilderError::Unreachable(reason),
                    NextHopFailure::Reflected(reason) => RouteBuilderError::NoRouteFound(reason),
                }
            })?;

        let rate = self.backend.get_rate(source_account, &next_hop).await?;
        self.verify_connected(&next_hop)?;

        let amount = floor_amount(scale_amount(packet.amount, rate)?)?;
        let expires_at = self.destination_expiry(packet.expires_at)?;

        tracing::info!(
            source = %source_account,
            destination = %packet.destination,
            %next_hop,
            source_amount = packet.amount,
            destination_amount = amount,
            %expires_at,
            "forwarding prepare"
        );

        Ok(NextHopPacket {
            next_hop,
            next_hop_packet: PreparePacket {
                amount,
                execution_condition: packet.execution_condition,
                expires_at,
                destination: packet.destination.clone(),
                data: packet.data.clone(),
            },
        })
    }

    async fn fetch_remote_quote(
        &self,
        next_hop: &str,
        destination: &str,
    ) -> Result<LiquidityQuote, RouteBuilderError> {
        self.quoter
            .quote_liquidity(next_hop, destination)
            .await
            .ok_or_else(|| {
                RouteBuilderError::NoRouteFound(format!(
                    "no quote found. nextHop={} destination={}",
                    next_hop, destination
                ))
            })
    }

    /// 0 when source and next hop share a scale and rates are exact powers
    /// of ten, 1 otherwise.
    fn scale_adjustment(&self, source: &str, next_hop: &str) -> Result<u64, RouteBuilderError> {
        let source_scale = self.asset_scale(source)?;
        let next_hop_scale = self.asset_scale(next_hop)?;
        Ok(if source_scale == next_hop_scale && self.config.is_trivial_rate() {
            0
        } else {
            1
        })
    }

    fn asset_scale(&self, account: &str) -> Result<u8, RouteBuilderError> {
        self.accounts
            .info(account)
            .map(|info| info.asset_scale)
            .ok_or_else(|| {
                RouteBuilderError::NoRouteFound(format!("account info unavailable. account={}", account))
            })
    }

    fn verify_connected(&self, account: &str) -> Result<(), RouteBuilderError> {
        if !self.accounts.is_connected(account) {
            tracing::warn!(%account, "plugin not connected");
            return Err(RouteBuilderError::LedgerNotConnected(format!(
                "no connection to account. account={}",
                account
            )));
        }
        Ok(())
    }

    fn validate_hold_durations(
        &self,
        source_hold: u64,
        destination_hold: u64,
    ) -> Result<(), RouteBuilderError> {
        if destination_hold > self.config.max_hold_time_ms {
            return Err(RouteBuilderError::UnacceptableExpiry(format!(
                "destination expiry duration is too long. destinationHoldDuration={} maxHoldTime={}",
                destination_hold, self.config.max_hold_time_ms
            )));
        }

        if source_hold.saturating_sub(destination_hold) < self.config.min_message_window_ms {
            return Err(RouteBuilderError::UnacceptableExpiry(format!(
                "the difference between the destination hold duration and the source hold duration is insufficient. \
                 sourceHoldDuration={} destinationHoldDuration={} minMessageWindow={}",
                source_hold, destination_hold, self.config.min_message_window_ms
            )));
        }

        Ok(())
    }

    /// Expiry for the outbound packet: the inbound expiry minus our message
    /// window, capped at the maximum hold time from now.
    fn destination_expiry(&self, source_expiry: DateTime<Utc>) -> Result<DateTime<Utc>, RouteBuilderError> {
        let now = self.clock.now();
        if source_expiry < now {
            return Err(RouteBuilderError::InsufficientTimeout(format!(
                "source transfer has already expired. sourceExpiry={} currentTime={}",
                source_expiry.to_rfc3339(),
                now.to_rfc3339()
            )));
        }

        let window = self.config.min_message_window();
        let by_window = source_expiry.checked_sub_signed(window).ok_or_else(|| {
            RouteBuilderError::InvalidPacket(format!(
                "expiry out of range. expiresAt={}",
                source_expiry.to_rfc3339()
            ))
        })?;
        let by_hold_time = offset(now, self.config.max_hold_time())?;
        let destination_expiry = by_window.min(by_hold_time);

        // Also catches a candidate already in the past (negative remainder).
        let remaining = destination_expiry - now;
        if remaining < window {
            return Err(RouteBuilderError::InsufficientTimeout(format!(
                "source transfer expires too soon to complete payment. sourceExpiry={} remainingMs={} minMessageWindow={}",
                source_expiry.to_rfc3339(),
                remaining.num_milliseconds(),
                self.config.min_message_window_ms
            )));
        }

        Ok(destination_expiry)
    }
}

/// Why a destination has no usable next hop.
#[derive(Debug)]
enum NextHopFailure {
    NoRoute(String),
    Reflected(String),
}

impl NextHopFailure {
    fn into_reason(self) -> String {
        match self {
            Self::NoRoute(reason) | Self::Reflected(reason) => reason,
        }
    }
}

/// A destination is local when it lies in the next hop's own address space.
fn is_local(destination: &str, next_hop: &str) -> bool {
    destination.starts_with(next_hop)
}

fn offset(at: DateTime<Utc>, by: Duration) -> Result<DateTime<Utc>, RouteBuilderError> {
    at.checked_add_signed(by).ok_or_else(|| {
        RouteBuilderError::UnacceptableExpiry(format!(
            "expiry out of range. from={} offsetMs={}",
            at.to_rfc3339(),
            by.num_milliseconds()
        ))
    })
}

fn scale_amount(amount: u64, rate: Decimal) -> Result<Decimal, RouteBuilderError> {
    Decimal::from(amount).checked_mul(rate).ok_or_else(|| {
        RouteBuilderError::UnacceptableAmount(format!(
            "amount overflows at rate. amount={} rate={}",
            amount, rate
        ))
    })
}

fn floor_amount(value: Decimal) -> Result<u64, RouteBuilderError> {
    value
        .floor()
        .to_u64()
        .ok_or_else(|| RouteBuilderError::UnacceptableAmount(format!("amount out of range: {}", value)))
}

fn ceil_amount(value: Decimal) -> Result<u64, RouteBuilderError> {
    value
        .ceil()
        .to_u64()
        .ok_or_else(|| RouteBuilderError::UnacceptableAmount(format!("amount out of range: {}", value)))
}
