// Copyright (c) 2024 Furchill

//! RPC Integration Tests
//!
//! Runs the JSON-RPC server against a journaled ledger and drives it with
//! real HTTP requests:
//! - Token issuance and fee handling
//! - Taxed transfers through a registered pool
//! - Owner-only methods and the admin key
//! - Observability endpoints

use std::{net::SocketAddr, sync::Arc, time::Duration};

use fur_taxed_token::ValidationRules;
use fur_token_types::{constants::NATIVE_UNIT, Address, EvmAddressCodec, Network};
use reqwest::Client;
use serde_json::{json, Value};
use serial_test::serial;
use tempfile::TempDir;
use tokio::net::TcpListener;

use launchpad::{
    ledger::Ledger,
    registry::FactorySettings,
    rpc::{RpcState, WsBroadcaster},
};

const ADMIN_KEY: &str = "test-admin-key";

// ============================================================================
// Test Helpers
// ============================================================================

fn addr_str(byte: u8) -> String {
    EvmAddressCodec::checksum(&Address::new([byte; 20]))
}

fn owner() -> String {
    addr_str(0xAA)
}

fn creator() -> String {
    addr_str(0xC1)
}

/// Spawn an RPC server on a random available port.
async fn spawn_test_rpc_server() -> (TempDir, SocketAddr, tokio::task::JoinHandle<()>) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let ledger_path = temp_dir.path().join("ledger.journal");

    let settings = FactorySettings {
        address: Address::new([0xFA; 20]),
        owner: Address::new([0xAA; 20]),
        deployment_fee: NATIVE_UNIT / 100,
        rules: ValidationRules::new(Network::Sepolia),
    };
    let ledger = Ledger::open(&ledger_path, settings).expect("Failed to open ledger");

    let state = Arc::new(
        RpcState::new(
            ledger,
            Network::Sepolia,
            vec!["*".to_string()],
            Some(ADMIN_KEY.to_string()),
            Arc::new(WsBroadcaster::new(100)),
        )
        .expect("Failed to create RPC state"),
    );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");
    drop(listener);

    let handle = tokio::spawn(async move {
        if let Err(e) = launchpad::rpc::start_rpc_server(addr, state).await {
            tracing::debug!("RPC server stopped: {}", e);
        }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    (temp_dir, addr, handle)
}

fn rpc_request(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1
    })
}

async fn rpc_call(client: &Client, addr: SocketAddr, method: &str, params: Value) -> Value {
    client
        .post(format!("http://{}", addr))
        .json(&rpc_request(method, params))
        .send()
        .await
        .expect("Failed to send request")
        .json::<Value>()
        .await
        .expect("Failed to parse response")
}

async fn admin_call(client: &Client, addr: SocketAddr, method: &str, params: Value) -> Value {
    client
        .post(format!("http://{}", addr))
        .header("X-API-Key", ADMIN_KEY)
        .json(&rpc_request(method, params))
        .send()
        .await
        .expect("Failed to send request")
        .json::<Value>()
        .await
        .expect("Failed to parse response")
}

fn token_params(payment: u128) -> Value {
    json!({
        "caller": creator(),
        "name": "Test",
        "symbol": "TEST",
        "totalSupply": "1000000",
        "buyTax": 500,
        "sellTax": 500,
        "lpPercentage": 8000,
        "marketingWallet": addr_str(0x3E),
        "marketingPercentage": 200,
        "wallets": [],
        "percentages": [],
        "payment": payment.to_string(),
    })
}

async fn create_token(client: &Client, addr: SocketAddr) -> String {
    let response = rpc_call(client, addr, "factory_createToken", token_params(NATIVE_UNIT / 100)).await;
    response["result"]["token"]
        .as_str()
        .expect("token handle in result")
        .to_string()
}

// ============================================================================
// Factory
// ============================================================================

#[tokio::test]
#[serial]
async fn test_create_token_scenario() {
    let (_dir, addr, handle) = spawn_test_rpc_server().await;
    let client = Client::new();

    let fee = rpc_call(&client, addr, "factory_deploymentFee", json!({})).await;
    assert_eq!(fee["result"]["fee"], "10000000000000000");

    let token = create_token(&client, addr).await;

    let info = rpc_call(&client, addr, "token_info", json!({ "token": token })).await;
    assert_eq!(info["result"]["buyTax"], 500);
    assert_eq!(info["result"]["lpPercentage"], 8000);
    assert_eq!(info["result"]["creator"], creator());

    let balance = rpc_call(
        &client,
        addr,
        "token_balanceOf",
        json!({ "token": token, "address": creator() }),
    )
    .await;
    assert_eq!(balance["result"]["balance"], "1000000");

    let tokens = rpc_call(
        &client,
        addr,
        "factory_getUserTokens",
        json!({ "address": creator() }),
    )
    .await;
    assert_eq!(tokens["result"]["tokens"], json!([token]));

    let fees = rpc_call(&client, addr, "factory_accumulatedFees", json!({})).await;
    assert_eq!(fees["result"]["fees"], "10000000000000000");

    handle.abort();
}

#[tokio::test]
#[serial]
async fn test_underpayment_creates_nothing() {
    let (_dir, addr, handle) = spawn_test_rpc_server().await;
    let client = Client::new();

    let response = rpc_call(
        &client,
        addr,
        "factory_createToken",
        token_params(9 * NATIVE_UNIT / 1000),
    )
    .await;
    assert_eq!(response["error"]["code"], -32011);

    let tokens = rpc_call(
        &client,
        addr,
        "factory_getUserTokens",
        json!({ "address": creator() }),
    )
    .await;
    assert_eq!(tokens["result"]["tokens"], json!([]));

    handle.abort();
}

#[tokio::test]
#[serial]
async fn test_validate_config_reports_fields() {
    let (_dir, addr, handle) = spawn_test_rpc_server().await;
    let client = Client::new();

    let mut params = token_params(0);
    params["buyTax"] = json!(2600);
    params["wallets"] = json!([addr_str(0x11)]);
    params["percentages"] = json!([2500]);

    let response = rpc_call(&client, addr, "factory_validateConfig", params).await;
    let result = &response["result"];
    assert_eq!(result["valid"], false);

    let fields: Vec<&str> = result["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"buy_tax"));
    assert!(fields.contains(&"additional_wallets[0].percentage"));
    assert!(fields.contains(&"allocation"));

    // Nothing was charged or issued
    let fees = rpc_call(&client, addr, "factory_accumulatedFees", json!({})).await;
    assert_eq!(fees["result"]["fees"], "0");

    handle.abort();
}

#[tokio::test]
#[serial]
async fn test_arity_mismatch() {
    let (_dir, addr, handle) = spawn_test_rpc_server().await;
    let client = Client::new();

    let mut params = token_params(NATIVE_UNIT);
    params["wallets"] = json!([addr_str(0x11), addr_str(0x12)]);
    params["percentages"] = json!([100]);

    let response = rpc_call(&client, addr, "factory_createToken", params).await;
    assert_eq!(response["error"]["code"], -32010);

    handle.abort();
}

// ============================================================================
// Transfers
// ============================================================================

#[tokio::test]
#[serial]
async fn test_sell_into_pool_is_taxed() {
    let (_dir, addr, handle) = spawn_test_rpc_server().await;
    let client = Client::new();
    let token = create_token(&client, addr).await;
    let pool = addr_str(0x77);

    let registered = rpc_call(
        &client,
        addr,
        "pool_register",
        json!({ "token": token, "caller": creator(), "pool": pool }),
    )
    .await;
    assert_eq!(registered["result"]["registered"], true);

    let receipt = rpc_call(
        &client,
        addr,
        "token_transfer",
        json!({ "token": token, "from": creator(), "to": pool, "amount": "10000" }),
    )
    .await;
    let receipt = &receipt["result"];
    assert_eq!(receipt["kind"], "sell");
    assert_eq!(receipt["tax"], "500");
    assert_eq!(receipt["netAmount"], "9500");

    let pool_balance = rpc_call(
        &client,
        addr,
        "token_balanceOf",
        json!({ "token": token, "address": pool }),
    )
    .await;
    assert_eq!(pool_balance["result"]["balance"], "9500");

    handle.abort();
}

#[tokio::test]
#[serial]
async fn test_transfer_from_needs_allowance() {
    let (_dir, addr, handle) = spawn_test_rpc_server().await;
    let client = Client::new();
    let token = create_token(&client, addr).await;
    let spender = addr_str(0x55);
    let recipient = addr_str(0x66);

    let denied = rpc_call(
        &client,
        addr,
        "token_transferFrom",
        json!({ "token": token, "spender": spender, "from": creator(), "to": recipient, "amount": "10" }),
    )
    .await;
    assert_eq!(denied["error"]["code"], -32014);

    rpc_call(
        &client,
        addr,
        "token_approve",
        json!({ "token": token, "owner": creator(), "spender": spender, "amount": "25" }),
    )
    .await;

    let receipt = rpc_call(
        &client,
        addr,
        "token_transferFrom",
        json!({ "token": token, "spender": spender, "from": creator(), "to": recipient, "amount": "10" }),
    )
    .await;
    assert_eq!(receipt["result"]["kind"], "plain");
    assert_eq!(receipt["result"]["netAmount"], "10");

    let allowance = rpc_call(
        &client,
        addr,
        "token_allowance",
        json!({ "token": token, "owner": creator(), "spender": spender }),
    )
    .await;
    assert_eq!(allowance["result"]["allowance"], "15");

    handle.abort();
}

// ============================================================================
// Owner-only methods
// ============================================================================

#[tokio::test]
#[serial]
async fn test_withdraw_requires_key_and_owner() {
    let (_dir, addr, handle) = spawn_test_rpc_server().await;
    let client = Client::new();
    create_token(&client, addr).await;

    // No key
    let response = rpc_call(
        &client,
        addr,
        "factory_withdrawFees",
        json!({ "caller": owner() }),
    )
    .await;
    assert_eq!(response["error"]["code"], -32012);

    // Key, but not the owner
    let response = admin_call(
        &client,
        addr,
        "factory_withdrawFees",
        json!({ "caller": creator() }),
    )
    .await;
    assert_eq!(response["error"]["code"], -32012);

    let response = admin_call(
        &client,
        addr,
        "factory_withdrawFees",
        json!({ "caller": owner() }),
    )
    .await;
    assert_eq!(response["result"]["amount"], "10000000000000000");

    let fees = rpc_call(&client, addr, "factory_accumulatedFees", json!({})).await;
    assert_eq!(fees["result"]["fees"], "0");

    handle.abort();
}

#[tokio::test]
#[serial]
async fn test_fee_update_and_ownership() {
    let (_dir, addr, handle) = spawn_test_rpc_server().await;
    let client = Client::new();
    let new_owner = addr_str(0xBB);

    let response = admin_call(
        &client,
        addr,
        "factory_setDeploymentFee",
        json!({ "caller": owner(), "fee": "1" }),
    )
    .await;
    assert_eq!(response["result"]["fee"], "1");

    let response = admin_call(
        &client,
        addr,
        "factory_transferOwnership",
        json!({ "caller": owner(), "newOwner": new_owner }),
    )
    .await;
    assert_eq!(response["result"]["owner"], new_owner);

    let response = rpc_call(&client, addr, "factory_owner", json!({})).await;
    assert_eq!(response["result"]["owner"], new_owner);

    handle.abort();
}

// ============================================================================
// Misc endpoints
// ============================================================================

#[tokio::test]
#[serial]
async fn test_address_validation() {
    let (_dir, addr, handle) = spawn_test_rpc_server().await;
    let client = Client::new();

    let response = rpc_call(
        &client,
        addr,
        "address_validate",
        json!({ "address": "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed" }),
    )
    .await;
    assert_eq!(response["result"]["valid"], true);
    assert_eq!(
        response["result"]["address"],
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
    );

    // Bad checksum
    let response = rpc_call(
        &client,
        addr,
        "address_validate",
        json!({ "address": "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed" }),
    )
    .await;
    assert_eq!(response["result"]["valid"], false);

    handle.abort();
}

#[tokio::test]
#[serial]
async fn test_parse_error_and_unknown_method() {
    let (_dir, addr, handle) = spawn_test_rpc_server().await;
    let client = Client::new();

    let response: Value = client
        .post(format!("http://{}", addr))
        .body("{not json")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response["error"]["code"], -32700);

    let response = rpc_call(&client, addr, "eth_sendTransaction", json!({})).await;
    assert_eq!(response["error"]["code"], -32601);

    handle.abort();
}

#[tokio::test]
#[serial]
async fn test_health_and_metrics() {
    let (_dir, addr, handle) = spawn_test_rpc_server().await;
    let client = Client::new();
    create_token(&client, addr).await;

    let health: Value = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["tokens"], 1);

    let metrics = client
        .get(format!("http://{}/metrics", addr))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("launchpad_tokens_created_total 1"));
    assert!(metrics.contains("launchpad_tokens 1"));

    handle.abort();
}
