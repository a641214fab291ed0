//! Integration test: a prepare forwarded across two connectors.

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use connector_core::{ExecutionCondition, PreparePacket};
use connector_integration_tests::*;
use connector_routing::RouteBuilderError;

const FULFILLMENT: &[u8] = b"the preimage only dave knows";

fn prepare(destination: &str, amount: u64, expires_at: DateTime<Utc>) -> PreparePacket {
    PreparePacket {
        amount,
        execution_condition: ExecutionCondition::from_fulfillment(FULFILLMENT),
        expires_at,
        destination: destination.into(),
        data: Bytes::from_static(b"invoice-42"),
    }
}

#[tokio::test]
async fn test_packet_crosses_both_connectors() {
    let network = network();
    let original = prepare(DAVE, 10_000, network.now + Duration::seconds(20));

    let at_b = network.a.builder.get_next_hop_packet(ALICE, &original).await.unwrap();
    assert_eq!(at_b.next_hop, A_TO_B);
    assert_eq!(at_b.next_hop_packet.amount, 9_000);
    assert_eq!(at_b.next_hop_packet.expires_at, network.now + Duration::seconds(19));

    let at_c = network
        .b
        .builder
        .get_next_hop_packet(B_TO_A, &at_b.next_hop_packet)
        .await
        .unwrap();
    assert_eq!(at_c.next_hop, B_TO_C);
    assert_eq!(at_c.next_hop_packet.amount, 13_500);
    assert_eq!(at_c.next_hop_packet.expires_at, network.now + Duration::seconds(18));

    // Everything but amount and expiry travels unchanged.
    let delivered = &at_c.next_hop_packet;
    assert_eq!(delivered.destination, original.destination);
    assert_eq!(delivered.data, original.data);
    assert_eq!(delivered.execution_condition, original.execution_condition);
    assert!(delivered.execution_condition.is_fulfilled_by(FULFILLMENT));
}

#[tokio::test]
async fn test_expiry_capped_at_every_hop() {
    let network = network();
    let original = prepare(DAVE, 100, network.now + Duration::seconds(60));

    let at_b = network.a.builder.get_next_hop_packet(ALICE, &original).await.unwrap();
    assert_eq!(at_b.next_hop_packet.expires_at, network.now + Duration::seconds(30));

    let at_c = network
        .b
        .builder
        .get_next_hop_packet(B_TO_A, &at_b.next_hop_packet)
        .await
        .unwrap();
    assert_eq!(at_c.next_hop_packet.expires_at, network.now + Duration::seconds(29));
}

#[tokio::test]
async fn test_second_hop_runs_out_of_time() {
    let network = network();
    let original = prepare(DAVE, 100, network.now + Duration::milliseconds(2_500));

    let at_b = network.a.builder.get_next_hop_packet(ALICE, &original).await.unwrap();
    assert_eq!(
        at_b.next_hop_packet.expires_at,
        network.now + Duration::milliseconds(1_500)
    );

    let result = network
        .b
        .builder
        .get_next_hop_packet(B_TO_A, &at_b.next_hop_packet)
        .await;
    assert!(matches!(result, Err(RouteBuilderError::InsufficientTimeout(_))));
}

#[tokio::test]
async fn test_packet_expires_in_flight() {
    let network = network();
    let original = prepare(DAVE, 100, network.now + Duration::seconds(20));
    let at_b = network.a.builder.get_next_hop_packet(ALICE, &original).await.unwrap();

    // B only sees the packet after it has expired.
    network.clock.advance(Duration::seconds(20));
    let result = network
        .b
        .builder
        .get_next_hop_packet(B_TO_A, &at_b.next_hop_packet)
        .await;
    assert!(matches!(result, Err(RouteBuilderError::InsufficientTimeout(_))));
}

#[tokio::test]
async fn test_unreachable_destination() {
    let network = network();
    let result = network
        .a
        .builder
        .get_next_hop_packet(ALICE, &prepare("g.z.nobody", 100, network.now + Duration::seconds(20)))
        .await;
    assert!(matches!(result, Err(RouteBuilderError::Unreachable(_))));
}

#[tokio::test]
async fn test_reflection_refused_when_disabled() {
    let strict = network_with(|_| {}, |b| b.routing.reflect_payments = false);
    let bounced = prepare("g.a.alice", 100, strict.now + Duration::seconds(20));

    let result = strict.b.builder.get_next_hop_packet(B_TO_A, &bounced).await;
    assert!(matches!(result, Err(RouteBuilderError::NoRouteFound(_))));

    // Default config lets it through.
    let forwarded = network().b.builder.get_next_hop_packet(B_TO_A, &bounced).await.unwrap();
    assert_eq!(forwarded.next_hop, B_TO_A);
}

#[tokio::test]
async fn test_last_hop_disconnected() {
    let network = network();
    network.b.accounts.set_connected(B_TO_C, false);

    let original = prepare(DAVE, 100, network.now + Duration::seconds(20));
    let at_b = network.a.builder.get_next_hop_packet(ALICE, &original).await.unwrap();
    let result = network
        .b
        .builder
        .get_next_hop_packet(B_TO_A, &at_b.next_hop_packet)
        .await;
    assert!(matches!(result, Err(RouteBuilderError::LedgerNotConnected(_))));
}

#[tokio::test]
async fn test_spread_reduces_forwarded_amount() {
    let network = network_with(|a| a.routing.spread = "0.01".parse().unwrap(), |_| {});
    let original = prepare(DAVE, 10_000, network.now + Duration::seconds(20));
    let at_b = network.a.builder.get_next_hop_packet(ALICE, &original).await.unwrap();
    // 10000 * 0.9 * 0.99
    assert_eq!(at_b.next_hop_packet.amount, 8_910);
}
