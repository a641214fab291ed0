//! Local exchange-rate backends.
//!
//! Both backends subtract the configured spread from every rate, so that
//! `source_amount * rate * (1 - spread) = destination_amount` leaves the
//! connector slightly ahead whichever side of the payment is fixed.

use async_trait::async_trait;
use connector_core::config::RoutingConfig;
use connector_core::{AccountInfo, BackendType};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::BackendError;
use crate::traits::{AccountRegistry, RateBackend};

/// Rates are rounded to this many significant digits.
const RATE_PRECISION: u32 = 15;

/// Largest power of ten a decimal can represent.
const MAX_SCALE_DIFF: u32 = 28;

/// `10^diff`, for the scale difference between two accounts.
fn scale_factor(diff: i32) -> Result<Decimal, BackendError> {
    let magnitude = diff.unsigned_abs();
    if magnitude > MAX_SCALE_DIFF {
        return Err(BackendError::InvalidRate(format!(
            "asset scale difference {} is out of range",
            diff
        )));
    }
    Ok(if diff >= 0 {
        Decimal::from_i128_with_scale(10i128.pow(magnitude), 0)
    } else {
        Decimal::new(1, magnitude)
    })
}

fn lookup(accounts: &dyn AccountRegistry, account: &str) -> Result<AccountInfo, BackendError> {
    accounts
        .info(account)
        .ok_or_else(|| BackendError::UnknownAccount(account.to_string()))
}

/// `base * 10^(dest_scale - src_scale) * (1 - spread)`, rounded.
fn finish_rate(
    base: Decimal,
    source: &AccountInfo,
    destination: &AccountInfo,
    spread: Decimal,
) -> Result<Decimal, BackendError> {
    let factor = scale_factor(i32::from(destination.asset_scale) - i32::from(source.asset_scale))?;
    let rate = base
        .checked_mul(factor)
        .and_then(|r| r.checked_mul(Decimal::ONE - spread))
        .ok_or_else(|| {
            BackendError::InvalidRate(format!(
                "rate overflow converting {} to {}",
                source.asset_code, destination.asset_code
            ))
        })?;
    Ok(rate.round_sf(RATE_PRECISION).unwrap_or(rate).normalize())
}

/// Treats every asset as equal value; only scale and spread change the rate.
pub struct OneToOneBackend {
    accounts: Arc<dyn AccountRegistry>,
    spread: Decimal,
}

impl OneToOneBackend {
    pub fn new(accounts: Arc<dyn AccountRegistry>, spread: Decimal) -> Self {
        Self { accounts, spread }
    }
}

#[async_trait]
impl RateBackend for OneToOneBackend {
    async fn get_rate(&self, source: &str, destination: &str) -> Result<Decimal, BackendError> {
        let source_info = lookup(self.accounts.as_ref(), source)?;
        let destination_info = lookup(self.accounts.as_ref(), destination)?;
        let rate = finish_rate(Decimal::ONE, &source_info, &destination_info, self.spread)?;
        tracing::trace!(%source, %destination, %rate, "one-to-one rate");
        Ok(rate)
    }
}

/// Fixed rates per asset code, each expressed against a common base asset.
pub struct StaticRateBackend {
    accounts: Arc<dyn AccountRegistry>,
    rates: HashMap<String, Decimal>,
    spread: Decimal,
}

impl StaticRateBackend {
    pub fn new(
        accounts: Arc<dyn AccountRegistry>,
        rates: HashMap<String, Decimal>,
        spread: Decimal,
    ) -> Self {
        Self {
            accounts,
            rates,
            spread,
        }
    }

    fn rate_for(&self, asset_code: &str) -> Result<Decimal, BackendError> {
        self.rates
            .get(asset_code)
            .copied()
            .filter(|rate| *rate > Decimal::ZERO)
            .ok_or_else(|| BackendError::MissingRate(asset_code.to_string()))
    }
}

#[async_trait]
impl RateBackend for StaticRateBackend {
    async fn get_rate(&self, source: &str, destination: &str) -> Result<Decimal, BackendError> {
        let source_info = lookup(self.accounts.as_ref(), source)?;
        let destination_info = lookup(self.accounts.as_ref(), destination)?;
        let source_rate = self.rate_for(&source_info.asset_code)?;
        let destination_rate = self.rate_for(&destination_info.asset_code)?;

        let base = destination_rate.checked_div(source_rate).ok_or_else(|| {
            BackendError::InvalidRate(format!(
                "cannot divide {} by {}",
                destination_rate, source_rate
            ))
        })?;
        let rate = finish_rate(base, &source_info, &destination_info, self.spread)?;
        tracing::trace!(%source, %destination, %rate, "static rate");
        Ok(rate)
    }
}

/// Build the backend selected in the routing config.
pub fn build_backend(
    config: &RoutingConfig,
    accounts: Arc<dyn AccountRegistry>,
    rates: &BTreeMap<String, Decimal>,
) -> Arc<dyn RateBackend> {
    tracing::info!(backend = %config.backend, spread = %config.spread, "rate backend selected");
    match config.backend {
        BackendType::OneToOne => Arc::new(OneToOneBackend::new(accounts, config.spread)),
        BackendType::Static => Arc::new(StaticRateBackend::new(
            accounts,
            rates.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            config.spread,
        )),
    }
}
