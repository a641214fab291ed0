//! Integration test: quotes across two connectors.
//!
//! B quotes its local liquidity toward `g.c`, A caches that curve and answers
//! quotes for `g.c` destinations by composing it with its own rate. The
//! quoted amounts are then checked against what forwarding actually delivers.

use std::sync::Arc;

use chrono::Duration;
use connector_core::{ExecutionCondition, PreparePacket};
use connector_integration_tests::*;
use connector_routing::{
    Clock, LiquidityCurve, LiquidityQuoteRequest, QuoteByDestinationRequest, QuoteBySourceRequest,
    RouteBuilderError,
};
use rust_decimal::Decimal;

const HOLD: u64 = 5_000;

/// Have B quote `g.c` and hand the result to A.
async fn share_liquidity(network: &Network) {
    let quote = network
        .b
        .builder
        .quote_liquidity(&LiquidityQuoteRequest {
            source_account: B_TO_A.into(),
            destination_account: DAVE.into(),
            destination_hold_duration: HOLD,
        })
        .await
        .expect("B quotes its local destination");
    network.a.learn(A_TO_B, &quote, HOLD);
}

/// Push `amount` from alice through both connectors; returns what reaches `g.c`.
async fn deliver(network: &Network, amount: u64) -> u64 {
    let packet = PreparePacket {
        amount,
        execution_condition: ExecutionCondition::from_fulfillment(b"secret"),
        expires_at: network.now + Duration::seconds(20),
        destination: DAVE.into(),
        data: Default::default(),
    };
    let at_b = network.a.builder.get_next_hop_packet(ALICE, &packet).await.unwrap();
    assert_eq!(at_b.next_hop, A_TO_B);
    let at_c = network
        .b
        .builder
        .get_next_hop_packet(B_TO_A, &at_b.next_hop_packet)
        .await
        .unwrap();
    assert_eq!(at_c.next_hop, B_TO_C);
    at_c.next_hop_packet.amount
}

fn by_source(amount: u64) -> QuoteBySourceRequest {
    QuoteBySourceRequest {
        source_account: ALICE.into(),
        destination_account: DAVE.into(),
        source_amount: amount,
        destination_hold_duration: HOLD,
    }
}

// =========================================================================
// Liquidity at the last hop
// =========================================================================

#[tokio::test]
async fn test_last_hop_liquidity_quote() {
    let network = network();
    let quote = network
        .b
        .builder
        .quote_liquidity(&LiquidityQuoteRequest {
            source_account: B_TO_A.into(),
            destination_account: DAVE.into(),
            destination_hold_duration: HOLD,
        })
        .await
        .unwrap();

    assert_eq!(quote.applies_to_prefix, B_TO_C);
    assert_eq!(quote.source_hold_duration, HOLD + 1_000);
    assert_eq!(quote.expires_at, network.now + Duration::seconds(45));

    // EUR cents to whole yen at 150 per euro, shifted one unit to the right.
    let curve = LiquidityCurve::from_bytes(&quote.liquidity_curve).unwrap();
    assert_eq!(curve.points()[0].input, Decimal::ONE);
    let yen = curve.amount_at(Decimal::from(101));
    assert!((yen - Decimal::from(150)).abs() < Decimal::new(1, 9), "got {}", yen);
}

// =========================================================================
// Two-hop quotes
// =========================================================================

#[tokio::test]
async fn test_quote_by_source_through_peer() {
    let network = network();
    share_liquidity(&network).await;

    let quote = network.a.builder.quote_by_source(&by_source(10_000)).await.unwrap();
    assert_eq!(quote.source_hold_duration, HOLD + 1_000 + 1_000);

    let delivered = deliver(&network, 10_000).await;
    assert_eq!(delivered, 13_500);
    assert!(quote.destination_amount <= delivered);
    assert!(delivered - quote.destination_amount <= 3);
}

#[tokio::test]
async fn test_quote_by_destination_through_peer() {
    let network = network();
    share_liquidity(&network).await;

    let quote = network
        .a
        .builder
        .quote_by_destination(&QuoteByDestinationRequest {
            source_account: ALICE.into(),
            destination_account: DAVE.into(),
            destination_amount: 13_500,
            destination_hold_duration: HOLD,
        })
        .await
        .unwrap();
    assert_eq!(quote.source_amount, 10_002);
    assert_eq!(quote.source_hold_duration, HOLD + 1_000 + 1_000);

    // Sending the quoted amount delivers at least what was asked for.
    assert!(deliver(&network, quote.source_amount).await >= 13_500);
}

#[tokio::test]
async fn test_composed_liquidity_curve_is_conservative() {
    let network = network();
    share_liquidity(&network).await;

    let quote = network
        .a
        .builder
        .quote_liquidity(&LiquidityQuoteRequest {
            source_account: ALICE.into(),
            destination_account: DAVE.into(),
            destination_hold_duration: HOLD,
        })
        .await
        .unwrap();
    assert_eq!(quote.applies_to_prefix, B_TO_C);
    assert_eq!(quote.source_hold_duration, HOLD + 1_000 + 1_000);
    assert_eq!(quote.expires_at, network.now + Duration::seconds(45));

    let curve = LiquidityCurve::from_bytes(&quote.liquidity_curve).unwrap();
    for amount in [100u64, 999, 10_000, 123_457] {
        let promised = curve.amount_at(Decimal::from(amount)).floor();
        let delivered = Decimal::from(deliver(&network, amount).await);
        assert!(
            promised <= delivered,
            "curve promises {} for {}, forwarding delivers {}",
            promised,
            amount,
            delivered
        );
    }
}

// =========================================================================
// Cached liquidity lifetime and failures
// =========================================================================

#[tokio::test]
async fn test_peer_curve_expires() {
    let network = network();
    share_liquidity(&network).await;
    assert!(network.a.builder.quote_by_source(&by_source(100)).await.is_ok());

    network.clock.advance(Duration::seconds(45));
    let result = network.a.builder.quote_by_source(&by_source(100)).await;
    assert!(matches!(result, Err(RouteBuilderError::NoRouteFound(_))));
    assert_eq!(network.a.quotes.remove_expired(network.clock.now()), 1);

    // A fresh quote from B restores the route.
    share_liquidity(&network).await;
    assert!(network.a.builder.quote_by_source(&by_source(100)).await.is_ok());
}

#[tokio::test]
async fn test_unknown_destination() {
    let network = network();
    let result = network
        .a
        .builder
        .quote_by_source(&QuoteBySourceRequest {
            source_account: ALICE.into(),
            destination_account: "g.z.nobody".into(),
            source_amount: 100,
            destination_hold_duration: HOLD,
        })
        .await;
    assert!(matches!(result, Err(RouteBuilderError::NoRouteFound(_))));
}

#[tokio::test]
async fn test_hold_duration_limits() {
    let network = network();
    share_liquidity(&network).await;

    let mut request = by_source(100);
    request.destination_hold_duration = 30_001;
    let result = network.a.builder.quote_by_source(&request).await;
    assert!(matches!(result, Err(RouteBuilderError::UnacceptableExpiry(_))));
}

#[tokio::test]
async fn test_peer_disconnected() {
    let network = network();
    share_liquidity(&network).await;
    network.a.accounts.set_connected(A_TO_B, false);

    let result = network.a.builder.quote_by_source(&by_source(100)).await;
    assert!(matches!(result, Err(RouteBuilderError::LedgerNotConnected(_))));
}

#[tokio::test]
async fn test_concurrent_quotes_agree() {
    let network = Arc::new(network());
    share_liquidity(&network).await;
    let expected = network.a.builder.quote_by_source(&by_source(5_000)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let network = Arc::clone(&network);
        handles.push(tokio::spawn(async move {
            network.a.builder.quote_by_source(&by_source(5_000)).await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), expected);
    }
}
