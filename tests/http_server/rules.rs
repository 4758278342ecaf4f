use herald::{
    models::Rule,
    persistence::AppRepository,
    subscription::{BackpressurePolicy, SubscriptionCommand},
};
use serde_json::json;

use crate::helpers::*;

fn usdc_transfer_rule(active: bool) -> serde_json::Value {
    json!({
        "contract_address": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
        "event_signature": "Transfer(address indexed from, address indexed to, uint256 value)",
        "chain": "ethereum",
        "adapter": "telegram",
        "adapter_value": "-100123",
        "active": active,
    })
}

#[tokio::test]
async fn rules_endpoint_returns_empty_list() {
    let server = TestServer::new(create_test_repo().await).await;

    let resp = server.get("/rules").await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["rules"], json!([]));

    server.cleanup().await;
}

#[tokio::test]
async fn create_rule_normalizes_and_subscribes() {
    let repo = create_test_repo().await;
    let mut server = TestServer::new(repo.clone()).await;

    let resp = server.post("/rules").json(&usdc_transfer_rule(true)).send().await.unwrap();

    assert_eq!(resp.status(), 201);
    let rule: Rule = resp.json().await.expect("Failed to parse rule");
    assert_eq!(rule.contract_address, "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    assert_eq!(rule.event_signature, "Transfer(address,address,uint256)");
    assert!(rule.active);

    match server.commands.try_recv().expect("No subscription requested") {
        SubscriptionCommand::Add(requested) => assert_eq!(requested.id, rule.id),
        other => panic!("unexpected command {other:?}"),
    }
    assert_eq!(repo.get_rules().await.unwrap().len(), 1);

    server.cleanup().await;
}

#[tokio::test]
async fn create_rule_defaults_to_inactive() {
    let mut server = TestServer::new(create_test_repo().await).await;
    let mut body = usdc_transfer_rule(true);
    body.as_object_mut().unwrap().remove("active");

    let resp = server.post("/rules").json(&body).send().await.unwrap();

    assert_eq!(resp.status(), 201);
    let rule: Rule = resp.json().await.unwrap();
    assert!(!rule.active);
    assert!(server.commands.try_recv().is_err());

    server.cleanup().await;
}

#[tokio::test]
async fn create_rule_requires_api_key() {
    let server = TestServer::new(create_test_repo().await).await;

    let resp = server.client.post(server.url("/rules")).json(&usdc_transfer_rule(true)).send().await.unwrap();

    assert_eq!(resp.status(), 401);
    server.cleanup().await;
}

#[tokio::test]
async fn create_rule_rejects_unknown_adapter() {
    let server = TestServer::new(create_test_repo().await).await;
    let mut body = usdc_transfer_rule(true);
    body["adapter"] = json!("slack");

    let resp = server.post("/rules").json(&body).send().await.unwrap();

    assert_eq!(resp.status(), 422);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
    server.cleanup().await;
}

#[tokio::test]
async fn create_active_rule_requires_destination() {
    let server = TestServer::new(create_test_repo().await).await;
    let mut body = usdc_transfer_rule(true);
    body["adapter_value"] = json!("  ");

    let resp = server.post("/rules").json(&body).send().await.unwrap();

    assert_eq!(resp.status(), 422);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "adapter_value must not be empty for an active rule");
    server.cleanup().await;
}

#[tokio::test]
async fn create_rule_returns_503_and_rolls_back_when_queue_is_full() {
    let repo = create_test_repo().await;
    let server = TestServer::with_queue(repo.clone(), 1, BackpressurePolicy::Reject).await;

    let first = server.post("/rules").json(&usdc_transfer_rule(true)).send().await.unwrap();
    assert_eq!(first.status(), 201);
    let second = server.post("/rules").json(&usdc_transfer_rule(true)).send().await.unwrap();
    assert_eq!(second.status(), 503);

    assert_eq!(repo.get_rules().await.unwrap().len(), 1);
    server.cleanup().await;
}

#[tokio::test]
async fn delete_rule_waits_for_queue_room_under_reject_policy() {
    let repo = create_test_repo().await;
    let mut server = TestServer::with_queue(repo.clone(), 1, BackpressurePolicy::Reject).await;
    let created: Rule =
        server.post("/rules").json(&usdc_transfer_rule(true)).send().await.unwrap().json().await.unwrap();

    let delete = tokio::spawn(server.delete(&format!("/rules/{}", created.id)).send());
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(!delete.is_finished());

    assert!(matches!(server.commands.recv().await, Some(SubscriptionCommand::Add(rule)) if rule.id == created.id));
    let resp = delete.await.unwrap().unwrap();
    assert_eq!(resp.status(), 204);
    assert_eq!(server.commands.recv().await, Some(SubscriptionCommand::Remove(created.id)));
    server.cleanup().await;
}

#[tokio::test]
async fn rule_details_and_notifications() {
    let repo = create_test_repo().await;
    let server = TestServer::new(repo.clone()).await;
    let created: Rule =
        server.post("/rules").json(&usdc_transfer_rule(false)).send().await.unwrap().json().await.unwrap();

    let resp = server.get(&format!("/rules/{}", created.id)).await;
    assert_eq!(resp.status(), 200);
    let rule: Rule = resp.json().await.unwrap();
    assert_eq!(rule, created);

    let resp = server.get(&format!("/rules/{}/notifications", created.id)).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["notifications"], json!([]));

    assert_eq!(server.get("/rules/999").await.status(), 404);
    assert_eq!(server.get("/rules/999/notifications").await.status(), 404);
    server.cleanup().await;
}

#[tokio::test]
async fn delete_rule_retracts_subscription() {
    let repo = create_test_repo().await;
    let mut server = TestServer::new(repo.clone()).await;
    let created: Rule =
        server.post("/rules").json(&usdc_transfer_rule(true)).send().await.unwrap().json().await.unwrap();
    let _ = server.commands.try_recv();

    let resp = server.delete(&format!("/rules/{}", created.id)).send().await.unwrap();
    assert_eq!(resp.status(), 204);
    assert_eq!(server.commands.try_recv().unwrap(), SubscriptionCommand::Remove(created.id));
    assert!(repo.get_rule(created.id).await.unwrap().is_none());

    let resp = server.delete(&format!("/rules/{}", created.id)).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    server.cleanup().await;
}

#[tokio::test]
async fn rules_endpoint_handles_db_error() {
    let server = TestServer::new(create_test_repo_without_migrations().await).await;

    let resp = server.get("/rules").await;

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "An internal server error occurred");
    server.cleanup().await;
}
