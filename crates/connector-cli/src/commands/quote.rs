//! `connector quote-*`: liquidity, by-source and by-destination quotes.

use clap::Args;
use connector_routing::{
    LiquidityCurve, LiquidityQuoteRequest, QuoteByDestinationRequest, QuoteBySourceRequest,
    RouteBuilder,
};
use serde::Serialize;

use super::print_json;

#[derive(Args, Debug)]
pub struct LiquidityArgs {
    /// Account the payment arrives from.
    #[arg(short, long)]
    pub from: String,

    /// Destination address.
    #[arg(short, long)]
    pub to: String,

    /// Hold time the receiver needs (ms).
    #[arg(long, default_value_t = 5_000)]
    pub hold: u64,
}

#[derive(Args, Debug)]
pub struct AmountArgs {
    /// Account the payment arrives from.
    #[arg(short, long)]
    pub from: String,

    /// Destination address.
    #[arg(short, long)]
    pub to: String,

    /// Fixed amount (source or destination, in atomic units).
    #[arg(short, long)]
    pub amount: u64,

    /// Hold time the receiver needs (ms).
    #[arg(long, default_value_t = 5_000)]
    pub hold: u64,
}

#[derive(Serialize)]
struct LiquidityOutput {
    applies_to_prefix: String,
    source_hold_duration: u64,
    expires_at: String,
    curve: String,
    points: Vec<[String; 2]>,
}

#[derive(Serialize)]
struct AmountOutput {
    source_amount: u64,
    destination_amount: u64,
    source_hold_duration: u64,
}

pub async fn liquidity(builder: &RouteBuilder, args: &LiquidityArgs, json: bool) -> anyhow::Result<()> {
    let quote = builder
        .quote_liquidity(&LiquidityQuoteRequest {
            source_account: args.from.clone(),
            destination_account: args.to.clone(),
            destination_hold_duration: args.hold,
        })
        .await?;
    let curve = LiquidityCurve::from_bytes(&quote.liquidity_curve)?;

    let output = LiquidityOutput {
        applies_to_prefix: quote.applies_to_prefix,
        source_hold_duration: quote.source_hold_duration,
        expires_at: quote.expires_at.to_rfc3339(),
        curve: hex::encode(&quote.liquidity_curve),
        points: curve
            .points()
            .iter()
            .map(|p| [p.input.to_string(), p.output.to_string()])
            .collect(),
    };

    if json {
        return print_json(&output);
    }

    println!("Liquidity quote:");
    println!("  Prefix:       {}", output.applies_to_prefix);
    println!("  Source hold:  {} ms", output.source_hold_duration);
    println!("  Expires:      {}", output.expires_at);
    println!("  Curve:");
    for [x, y] in &output.points {
        println!("    {:>24} -> {}", x, y);
    }
    Ok(())
}

pub async fn by_source(builder: &RouteBuilder, args: &AmountArgs, json: bool) -> anyhow::Result<()> {
    let quote = builder
        .quote_by_source(&QuoteBySourceRequest {
            source_account: args.from.clone(),
            destination_account: args.to.clone(),
            source_amount: args.amount,
            destination_hold_duration: args.hold,
        })
        .await?;

    print_amounts(
        AmountOutput {
            source_amount: args.amount,
            destination_amount: quote.destination_amount,
            source_hold_duration: quote.source_hold_duration,
        },
        json,
    )
}

pub async fn by_destination(builder: &RouteBuilder, args: &AmountArgs, json: bool) -> anyhow::Result<()> {
    let quote = builder
        .quote_by_destination(&QuoteByDestinationRequest {
            source_account: args.from.clone(),
            destination_account: args.to.clone(),
            destination_amount: args.amount,
            destination_hold_duration: args.hold,
        })
        .await?;

    print_amounts(
        AmountOutput {
            source_amount: quote.source_amount,
            destination_amount: args.amount,
            source_hold_duration: quote.source_hold_duration,
        },
        json,
    )
}

fn print_amounts(output: AmountOutput, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&output);
    }
    println!("Quote:");
    println!("  Send:         {}", output.source_amount);
    println!("  Deliver:      {}", output.destination_amount);
    println!("  Source hold:  {} ms", output.source_hold_duration);
    Ok(())
}
