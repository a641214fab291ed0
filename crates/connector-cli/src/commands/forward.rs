//! `connector forward`: build the outbound packet for an incoming prepare.

use anyhow::Context;
use bytes::Bytes;
use chrono::{Duration, Utc};
use clap::Args;
use connector_core::{ExecutionCondition, PreparePacket};
use connector_routing::RouteBuilder;
use serde::Serialize;

use super::print_json;

#[derive(Args, Debug)]
pub struct ForwardArgs {
    /// Account the prepare arrived from.
    #[arg(short, long)]
    pub from: String,

    /// Destination address carried by the prepare.
    #[arg(short, long)]
    pub to: String,

    /// Incoming amount (in atomic units).
    #[arg(short, long)]
    pub amount: u64,

    /// Time until the incoming prepare expires (ms).
    #[arg(long, default_value_t = 10_000)]
    pub expires_in: u64,

    /// Hex fulfillment whose hash becomes the execution condition.
    #[arg(long, default_value = "")]
    pub fulfillment: String,

    /// Opaque data carried end to end.
    #[arg(long, default_value = "")]
    pub data: String,
}

#[derive(Serialize)]
struct ForwardOutput {
    next_hop: String,
    amount: u64,
    expires_at: String,
    destination: String,
    execution_condition: String,
    data: String,
}

pub async fn run(builder: &RouteBuilder, args: &ForwardArgs, json: bool) -> anyhow::Result<()> {
    let fulfillment = hex::decode(&args.fulfillment).context("fulfillment must be hex")?;
    let expires_in = i64::try_from(args.expires_in).context("expires_in out of range")?;

    let packet = PreparePacket {
        amount: args.amount,
        execution_condition: ExecutionCondition::from_fulfillment(&fulfillment),
        expires_at: Utc::now()
            .checked_add_signed(Duration::milliseconds(expires_in))
            .context("expires_in out of range")?,
        destination: args.to.clone(),
        data: Bytes::from(args.data.clone().into_bytes()),
    };

    let forwarded = builder.get_next_hop_packet(&args.from, &packet).await?;
    let outbound = forwarded.next_hop_packet;
    let output = ForwardOutput {
        next_hop: forwarded.next_hop,
        amount: outbound.amount,
        expires_at: outbound.expires_at.to_rfc3339(),
        destination: outbound.destination,
        execution_condition: outbound.execution_condition.to_string(),
        data: hex::encode(&outbound.data),
    };

    if json {
        return print_json(&output);
    }

    println!("Forward to {}:", output.next_hop);
    println!("  Amount:       {} (received {})", output.amount, args.amount);
    println!("  Expires:      {}", output.expires_at);
    println!("  Destination:  {}", output.destination);
    println!("  Condition:    {}", output.execution_condition);
    Ok(())
}
