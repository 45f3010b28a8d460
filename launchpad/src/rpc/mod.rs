// Copyright (c) 2024 Furchill

//! JSON-RPC Server for the launchpad
//!
//! Provides a JSON-RPC 2.0 API for token issuance and token operations.
//! Also supports WebSocket connections for real-time event streaming.

pub mod auth;
pub mod metrics;
pub mod websocket;

pub use metrics::{check_health, HealthResponse, HealthStatus, LaunchpadMetrics};
pub use websocket::WsBroadcaster;

use anyhow::Result;

/// JSON-RPC internal error code
const INTERNAL_ERROR: i32 = -32603;

/// Helper macro to acquire a read lock, returning a JSON-RPC error if poisoned
macro_rules! read_lock {
    ($lock:expr, $id:expr) => {
        match $lock.read() {
            Ok(guard) => guard,
            Err(_) => {
                return JsonRpcResponse::error($id, INTERNAL_ERROR, "Internal error: lock poisoned")
            }
        }
    };
}

/// Helper macro to acquire a write lock, returning a JSON-RPC error if poisoned
macro_rules! write_lock {
    ($lock:expr, $id:expr) => {
        match $lock.write() {
            Ok(guard) => guard,
            Err(_) => {
                return JsonRpcResponse::error($id, INTERNAL_ERROR, "Internal error: lock poisoned")
            }
        }
    };
}

/// Helper macro to unwrap a parameter, returning an invalid-params error
macro_rules! param {
    ($expr:expr, $id:expr) => {
        match $expr {
            Ok(value) => value,
            Err(message) => return JsonRpcResponse::error($id, INVALID_PARAMS, &message),
        }
    };
}

use fur_taxed_token::{remaining_allocation_bps, FieldError, TransferReceipt};
use fur_token_types::{Address, AddressCodec, BasisPoints, Network};
use http_body_util::{BodyExt, Full};
use hyper::{
    body::Bytes,
    header::{self, HeaderValue},
    server::conn::http1,
    service::service_fn,
    Method, Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, RwLock},
    time::{Instant, SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::{
    ledger::{Ledger, LedgerError},
    registry::{CreateTokenRequest, LaunchpadEvent, RegistryError},
};

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

pub const INVALID_CONFIGURATION: i32 = -32010;
pub const INSUFFICIENT_FEE: i32 = -32011;
pub const UNAUTHORIZED: i32 = -32012;
pub const INSUFFICIENT_BALANCE: i32 = -32013;
pub const INSUFFICIENT_ALLOWANCE: i32 = -32014;
pub const UNKNOWN_TOKEN: i32 = -32015;
pub const BALANCE_OVERFLOW: i32 = -32016;

/// Every method the dispatcher serves.
pub const METHODS: &[&str] = &[
    "factory_deploymentFee",
    "factory_accumulatedFees",
    "factory_owner",
    "factory_getUserTokens",
    "factory_validateConfig",
    "factory_createToken",
    "factory_setDeploymentFee",
    "factory_withdrawFees",
    "factory_transferOwnership",
    "token_info",
    "token_balanceOf",
    "token_allowance",
    "token_transfer",
    "token_approve",
    "token_transferFrom",
    "pool_register",
    "address_validate",
];

/// Metric label for a requested method. Unknown names share one label so
/// clients cannot grow the label set.
fn metrics_label(method: &str) -> &'static str {
    METHODS
        .iter()
        .find(|known| **known == method)
        .copied()
        .unwrap_or("unknown")
}

/// JSON-RPC request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

/// JSON-RPC response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

/// JSON-RPC error
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i32, message: &str) -> Self {
        Self::error_with_data(id, code, message, None)
    }

    pub fn error_with_data(id: Value, code: i32, message: &str, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.to_string(),
                data,
            }),
            id,
        }
    }
}

/// Shared RPC state
pub struct RpcState {
    pub ledger: Arc<RwLock<Ledger>>,
    /// Selects the address format of parameters and results
    pub network: Network,
    pub start_time: Instant,
    /// Allowed CORS origins (e.g., ["http://localhost", "http://127.0.0.1"])
    /// If contains "*", all origins are allowed (insecure)
    pub cors_origins: Vec<String>,
    /// Required in `X-API-Key` for owner-only methods, if set
    pub admin_api_key: Option<String>,
    pub ws_broadcaster: Arc<WsBroadcaster>,
    pub metrics: Arc<LaunchpadMetrics>,
}

impl RpcState {
    pub fn new(
        ledger: Ledger,
        network: Network,
        cors_origins: Vec<String>,
        admin_api_key: Option<String>,
        ws_broadcaster: Arc<WsBroadcaster>,
    ) -> prometheus::Result<Self> {
        Self::from_shared(
            Arc::new(RwLock::new(ledger)),
            network,
            cors_origins,
            admin_api_key,
            ws_broadcaster,
        )
    }

    /// Create RpcState from an already-shared ledger
    pub fn from_shared(
        ledger: Arc<RwLock<Ledger>>,
        network: Network,
        cors_origins: Vec<String>,
        admin_api_key: Option<String>,
        ws_broadcaster: Arc<WsBroadcaster>,
    ) -> prometheus::Result<Self> {
        Ok(Self {
            ledger,
            network,
            start_time: Instant::now(),
            cors_origins,
            admin_api_key,
            ws_broadcaster,
            metrics: Arc::new(LaunchpadMetrics::new()?),
        })
    }

    fn codec(&self) -> &'static dyn AddressCodec {
        self.network.address_codec()
    }

    fn format(&self, address: &Address) -> String {
        self.codec().format(address)
    }

    /// Record and broadcast committed events
    fn publish(&self, events: &[LaunchpadEvent]) {
        self.metrics.record_events(events);
        self.ws_broadcaster.send_all(events);
    }
}

/// Start the RPC server
pub async fn start_rpc_server(addr: SocketAddr, state: Arc<RpcState>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("RPC server listening on {} (WebSocket: /ws)", addr);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(|req| handle_request(req, state.clone()));

            if let Err(err) = http1::Builder::new()
                .serve_connection(io, service)
                .with_upgrades()
                .await
            {
                error!("Error serving connection: {:?}", err);
            }
        });
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<RpcState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let request_origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let allowed_origin = check_cors_origin(request_origin.as_deref(), &state.cors_origins);
    let allowed_origin_ref = allowed_origin.as_deref();

    if req.method() == Method::OPTIONS {
        return Ok(cors_response(
            Response::new(Full::new(Bytes::new())),
            allowed_origin_ref,
        ));
    }

    if req.method() == Method::GET && req.uri().path() == "/ws" {
        return handle_websocket_upgrade(req, state).await;
    }

    if req.method() == Method::GET {
        match req.uri().path() {
            "/health" => {
                let health = check_health(&state);
                let status = match health.status {
                    HealthStatus::Healthy => StatusCode::OK,
                    HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
                };
                let body = serde_json::to_string(&health).unwrap_or_default();
                return Ok(cors_response(
                    plain_response(status, "application/json", body),
                    allowed_origin_ref,
                ));
            }
            "/metrics" => {
                state.metrics.update_from_state(&state);
                let metrics_text = state.metrics.encode().unwrap_or_default();
                return Ok(cors_response(
                    plain_response(
                        StatusCode::OK,
                        "text/plain; version=0.0.4; charset=utf-8",
                        metrics_text,
                    ),
                    allowed_origin_ref,
                ));
            }
            _ => {}
        }
    }

    if req.method() != Method::POST {
        return Ok(cors_response(
            plain_response(
                StatusCode::METHOD_NOT_ALLOWED,
                "text/plain",
                "Method not allowed",
            ),
            allowed_origin_ref,
        ));
    }

    let api_key = req
        .headers()
        .get("X-API-Key")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let body_bytes = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!("Failed to read request body: {}", e);
            return Ok(cors_response(
                plain_response(StatusCode::BAD_REQUEST, "text/plain", "Failed to read body"),
                allowed_origin_ref,
            ));
        }
    };

    let rpc_request: JsonRpcRequest = match serde_json::from_slice(&body_bytes) {
        Ok(req) => req,
        Err(e) => {
            warn!("Failed to parse JSON-RPC request: {}", e);
            let response = JsonRpcResponse::error(Value::Null, PARSE_ERROR, "Parse error");
            return Ok(json_response(response, allowed_origin_ref));
        }
    };

    debug!(
        "RPC request: {} (id: {})",
        rpc_request.method, rpc_request.id
    );

    let label = metrics_label(&rpc_request.method);
    state.metrics.record_request(label);

    let response = handle_rpc_method(&rpc_request, api_key.as_deref(), &state);

    if response.error.is_some() {
        state.metrics.record_error(label);
    }

    Ok(json_response(response, allowed_origin_ref))
}

/// Handle WebSocket upgrade request
async fn handle_websocket_upgrade(
    req: Request<hyper::body::Incoming>,
    state: Arc<RpcState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let has_upgrade = req
        .headers()
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"));

    let has_connection = req
        .headers()
        .get(header::CONNECTION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_lowercase().contains("upgrade"));

    let accept_key = req
        .headers()
        .get(header::SEC_WEBSOCKET_KEY)
        .and_then(|v| v.to_str().ok())
        .map(compute_websocket_accept_key)
        .and_then(|key| HeaderValue::from_str(&key).ok());

    let accept_key = match accept_key {
        Some(key) if has_upgrade && has_connection => key,
        _ => {
            return Ok(plain_response(
                StatusCode::BAD_REQUEST,
                "text/plain",
                "Missing WebSocket headers",
            ))
        }
    };

    let broadcaster = state.ws_broadcaster.clone();
    tokio::spawn(async move {
        match hyper::upgrade::on(req).await {
            Ok(upgraded) => {
                websocket::handle_websocket(upgraded, broadcaster).await;
            }
            Err(e) => {
                error!("WebSocket upgrade failed: {}", e);
            }
        }
    });

    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    let headers = response.headers_mut();
    headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
    headers.insert(header::SEC_WEBSOCKET_ACCEPT, accept_key);
    Ok(response)
}

/// Compute the Sec-WebSocket-Accept header value
fn compute_websocket_accept_key(key: &str) -> String {
    use base64::Engine;
    use sha1::{Digest, Sha1};
    const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    let result = hasher.finalize();

    base64::engine::general_purpose::STANDARD.encode(result)
}

fn handle_rpc_method(
    request: &JsonRpcRequest,
    api_key: Option<&str>,
    state: &RpcState,
) -> JsonRpcResponse {
    let id = request.id.clone();

    if let Err(e) = auth::authorize(&request.method, state.admin_api_key.as_deref(), api_key) {
        warn!(method = %request.method, "Rejected owner-only call: {}", e);
        return JsonRpcResponse::error(id, UNAUTHORIZED, &e.to_string());
    }

    let params = Params::new(&request.params, state.codec());

    match request.method.as_str() {
        // Factory queries
        "factory_deploymentFee" => handle_deployment_fee(id, state),
        "factory_accumulatedFees" => handle_accumulated_fees(id, state),
        "factory_owner" => handle_owner(id, state),
        "factory_getUserTokens" => handle_get_user_tokens(id, &params, state),
        "factory_validateConfig" => handle_validate_config(id, &params, state),

        // Factory mutations
        "factory_createToken" => handle_create_token(id, &params, state),
        "factory_setDeploymentFee" => handle_set_deployment_fee(id, &params, state),
        "factory_withdrawFees" => handle_withdraw_fees(id, &params, state),
        "factory_transferOwnership" => handle_transfer_ownership(id, &params, state),

        // Token methods
        "token_info" => handle_token_info(id, &params, state),
        "token_balanceOf" => handle_balance_of(id, &params, state),
        "token_allowance" => handle_allowance(id, &params, state),
        "token_transfer" => handle_transfer(id, &params, state),
        "token_approve" => handle_approve(id, &params, state),
        "token_transferFrom" => handle_transfer_from(id, &params, state),

        "pool_register" => handle_register_pool(id, &params, state),
        "address_validate" => handle_validate_address(id, &params, state),

        _ => JsonRpcResponse::error(
            id,
            METHOD_NOT_FOUND,
            &format!("Method not found: {}", request.method),
        ),
    }
}

// ============================================================================
// Parameter decoding
// ============================================================================

/// Named parameters of one request
struct Params<'a> {
    params: &'a Value,
    codec: &'static dyn AddressCodec,
}

impl<'a> Params<'a> {
    fn new(params: &'a Value, codec: &'static dyn AddressCodec) -> Self {
        Self { params, codec }
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        self.params.get(name).filter(|v| !v.is_null())
    }

    fn str(&self, name: &str) -> Result<&'a str, String> {
        match self.get(name) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(format!("Invalid {} parameter: expected a string", name)),
            None => Err(format!("Missing {} parameter", name)),
        }
    }

    fn address(&self, name: &str) -> Result<Address, String> {
        let s = self.str(name)?;
        self.codec
            .parse(s)
            .map_err(|e| format!("Invalid {} parameter: {}", name, e))
    }

    /// Amounts are decimal strings; small values may also be JSON numbers
    fn amount(&self, name: &str) -> Result<u128, String> {
        match self.get(name) {
            Some(value) => parse_amount(value)
                .ok_or_else(|| format!("Invalid {} parameter: expected a decimal integer", name)),
            None => Err(format!("Missing {} parameter", name)),
        }
    }

    fn amount_or_zero(&self, name: &str) -> Result<u128, String> {
        match self.get(name) {
            Some(_) => self.amount(name),
            None => Ok(0),
        }
    }

    fn bps(&self, name: &str) -> Result<BasisPoints, String> {
        match self.get(name) {
            Some(value) => parse_bps(value)
                .ok_or_else(|| format!("Invalid {} parameter: expected basis points", name)),
            None => Err(format!("Missing {} parameter", name)),
        }
    }

    fn bps_or_zero(&self, name: &str) -> Result<BasisPoints, String> {
        match self.get(name) {
            Some(_) => self.bps(name),
            None => Ok(0),
        }
    }

    fn str_list(&self, name: &str) -> Result<Vec<String>, String> {
        let Some(value) = self.get(name) else {
            return Ok(Vec::new());
        };
        value
            .as_array()
            .and_then(|items| {
                items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
            })
            .ok_or_else(|| format!("Invalid {} parameter: expected an array of strings", name))
    }

    fn bps_list(&self, name: &str) -> Result<Vec<BasisPoints>, String> {
        let Some(value) = self.get(name) else {
            return Ok(Vec::new());
        };
        value
            .as_array()
            .and_then(|items| items.iter().map(parse_bps).collect::<Option<Vec<_>>>())
            .ok_or_else(|| format!("Invalid {} parameter: expected an array of basis points", name))
    }

    fn create_request(&self) -> Result<CreateTokenRequest, String> {
        Ok(CreateTokenRequest {
            name: self.str("name")?.to_string(),
            symbol: self.str("symbol")?.to_string(),
            total_supply: self.amount("totalSupply")?,
            buy_tax: self.bps_or_zero("buyTax")?,
            sell_tax: self.bps_or_zero("sellTax")?,
            lp_percentage: self.bps("lpPercentage")?,
            marketing_wallet: self.str("marketingWallet")?.to_string(),
            marketing_percentage: self.bps_or_zero("marketingPercentage")?,
            wallets: self.str_list("wallets")?,
            percentages: self.bps_list("percentages")?,
        })
    }
}

fn parse_amount(value: &Value) -> Option<u128> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64().map(u128::from),
        _ => None,
    }
}

fn parse_bps(value: &Value) -> Option<BasisPoints> {
    value.as_u64().and_then(|v| BasisPoints::try_from(v).ok())
}

// ============================================================================
// Error mapping
// ============================================================================

fn field_errors_json(errors: &[FieldError]) -> Value {
    Value::Array(
        errors
            .iter()
            .map(|e| json!({ "field": e.field(), "message": e.to_string() }))
            .collect(),
    )
}

fn registry_error(id: Value, err: &RegistryError) -> JsonRpcResponse {
    let (code, data) = match err {
        RegistryError::InvalidConfiguration(errors) => (
            INVALID_CONFIGURATION,
            Some(json!({ "errors": field_errors_json(errors) })),
        ),
        RegistryError::ArityMismatch { .. } => (
            INVALID_CONFIGURATION,
            Some(json!({ "errors": [{ "field": "percentages", "message": err.to_string() }] })),
        ),
        RegistryError::InsufficientFee { required, paid } => (
            INSUFFICIENT_FEE,
            Some(json!({ "required": required.to_string(), "paid": paid.to_string() })),
        ),
        RegistryError::Unauthorized => (UNAUTHORIZED, None),
        RegistryError::InsufficientBalance {
            available,
            requested,
        } => (
            INSUFFICIENT_BALANCE,
            Some(json!({ "available": available.to_string(), "requested": requested.to_string() })),
        ),
        RegistryError::InsufficientAllowance {
            available,
            requested,
        } => (
            INSUFFICIENT_ALLOWANCE,
            Some(json!({ "available": available.to_string(), "requested": requested.to_string() })),
        ),
        RegistryError::UnknownToken(_) => (UNKNOWN_TOKEN, None),
        RegistryError::BalanceOverflow { held, incoming } => (
            BALANCE_OVERFLOW,
            Some(json!({ "held": held.to_string(), "incoming": incoming.to_string() })),
        ),
    };
    JsonRpcResponse::error_with_data(id, code, &err.to_string(), data)
}

fn ledger_error(id: Value, err: &LedgerError) -> JsonRpcResponse {
    match err {
        LedgerError::Registry(e) => registry_error(id, e),
        LedgerError::Journal(e) => {
            error!("Ledger journal write failed: {}", e);
            JsonRpcResponse::error(id, INTERNAL_ERROR, "Internal error: journal write failed")
        }
    }
}

fn receipt_json(receipt: &TransferReceipt, state: &RpcState) -> Value {
    json!({
        "token": state.format(&receipt.token),
        "from": state.format(&receipt.from),
        "to": state.format(&receipt.to),
        "amount": receipt.amount.to_string(),
        "kind": receipt.kind.as_str(),
        "taxRateBps": receipt.tax_rate_bps,
        "tax": receipt.tax.to_string(),
        "netAmount": receipt.net_amount.to_string(),
        "lpPart": receipt.split.lp_part.to_string(),
        "credits": receipt
            .split
            .credits
            .iter()
            .map(|c| json!({ "recipient": state.format(&c.recipient), "amount": c.amount.to_string() }))
            .collect::<Vec<_>>(),
    })
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ============================================================================
// Factory handlers
// ============================================================================

fn handle_deployment_fee(id: Value, state: &RpcState) -> JsonRpcResponse {
    let ledger = read_lock!(state.ledger, id.clone());
    let fee = ledger.registry().deployment_fee();
    JsonRpcResponse::success(id, json!({ "fee": fee.to_string() }))
}

fn handle_accumulated_fees(id: Value, state: &RpcState) -> JsonRpcResponse {
    let ledger = read_lock!(state.ledger, id.clone());
    let fees = ledger.registry().accumulated_fees();
    JsonRpcResponse::success(id, json!({ "fees": fees.to_string() }))
}

fn handle_owner(id: Value, state: &RpcState) -> JsonRpcResponse {
    let ledger = read_lock!(state.ledger, id.clone());
    let owner = ledger.registry().owner();
    JsonRpcResponse::success(id, json!({ "owner": state.format(&owner) }))
}

fn handle_get_user_tokens(id: Value, params: &Params, state: &RpcState) -> JsonRpcResponse {
    let address = param!(params.address("address"), id);
    let ledger = read_lock!(state.ledger, id.clone());
    let tokens: Vec<String> = ledger
        .registry()
        .get_user_tokens(&address)
        .iter()
        .map(|t| state.format(t))
        .collect();
    JsonRpcResponse::success(id, json!({ "tokens": tokens }))
}

/// Advisory check of a configuration; nothing is charged or stored.
fn handle_validate_config(id: Value, params: &Params, state: &RpcState) -> JsonRpcResponse {
    let request = param!(params.create_request(), id);
    let config = match request.to_config() {
        Ok(config) => config,
        Err(e) => return registry_error(id, &e),
    };

    let ledger = read_lock!(state.ledger, id.clone());
    let result = ledger.registry().validate(&config);

    JsonRpcResponse::success(
        id,
        json!({
            "valid": result.is_valid(),
            "errors": field_errors_json(result.errors()),
            "remainingBps": remaining_allocation_bps(&config),
        }),
    )
}

fn handle_create_token(id: Value, params: &Params, state: &RpcState) -> JsonRpcResponse {
    let caller = param!(params.address("caller"), id);
    let payment = param!(params.amount_or_zero("payment"), id);
    let request = param!(params.create_request(), id);

    let committed = {
        let mut ledger = write_lock!(state.ledger, id.clone());
        match ledger.create_token(&request, payment, caller, unix_now()) {
            Ok(committed) => committed,
            Err(e) => return ledger_error(id, &e),
        }
    };

    info!(
        token = %state.format(&committed.value),
        creator = %state.format(&caller),
        symbol = %request.symbol,
        "Token created"
    );
    state.publish(&committed.events);

    JsonRpcResponse::success(id, json!({ "token": state.format(&committed.value) }))
}

fn handle_set_deployment_fee(id: Value, params: &Params, state: &RpcState) -> JsonRpcResponse {
    let caller = param!(params.address("caller"), id);
    let fee = param!(params.amount("fee"), id);

    let committed = {
        let mut ledger = write_lock!(state.ledger, id.clone());
        match ledger.set_deployment_fee(&caller, fee) {
            Ok(committed) => committed,
            Err(e) => return ledger_error(id, &e),
        }
    };

    info!(fee = %fee, "Deployment fee updated");
    state.publish(&committed.events);

    JsonRpcResponse::success(id, json!({ "fee": committed.value.to_string() }))
}

fn handle_withdraw_fees(id: Value, params: &Params, state: &RpcState) -> JsonRpcResponse {
    let caller = param!(params.address("caller"), id);

    let committed = {
        let mut ledger = write_lock!(state.ledger, id.clone());
        match ledger.withdraw_fees(&caller) {
            Ok(committed) => committed,
            Err(e) => return ledger_error(id, &e),
        }
    };

    info!(amount = %committed.value, "Fees withdrawn");
    state.publish(&committed.events);

    JsonRpcResponse::success(id, json!({ "amount": committed.value.to_string() }))
}

fn handle_transfer_ownership(id: Value, params: &Params, state: &RpcState) -> JsonRpcResponse {
    let caller = param!(params.address("caller"), id);
    let new_owner = param!(params.address("newOwner"), id);

    let committed = {
        let mut ledger = write_lock!(state.ledger, id.clone());
        match ledger.transfer_ownership(&caller, new_owner) {
            Ok(committed) => committed,
            Err(e) => return ledger_error(id, &e),
        }
    };

    info!(owner = %state.format(&new_owner), "Factory ownership transferred");
    state.publish(&committed.events);

    JsonRpcResponse::success(id, json!({ "owner": state.format(&committed.value) }))
}

// ============================================================================
// Token handlers
// ============================================================================

fn handle_token_info(id: Value, params: &Params, state: &RpcState) -> JsonRpcResponse {
    let handle = param!(params.address("token"), id);
    let ledger = read_lock!(state.ledger, id.clone());
    let registry = ledger.registry();

    let Some(token) = registry.token(&handle) else {
        return registry_error(id, &RegistryError::UnknownToken(handle));
    };

    let wallets: Vec<Value> = token
        .additional_wallets()
        .iter()
        .map(|w| json!({ "address": state.format(&w.address), "percentage": w.percentage }))
        .collect();
    let pools: Vec<String> = registry
        .pools()
        .pools_of(&handle)
        .iter()
        .map(|p| state.format(p))
        .collect();

    JsonRpcResponse::success(
        id,
        json!({
            "token": state.format(&token.address()),
            "name": token.name(),
            "symbol": token.symbol(),
            "decimals": token.decimals(),
            "totalSupply": token.total_supply().to_string(),
            "buyTax": token.buy_tax(),
            "sellTax": token.sell_tax(),
            "lpPercentage": token.lp_percentage(),
            "marketingWallet": state.format(&token.marketing_wallet()),
            "marketingPercentage": token.marketing_percentage(),
            "additionalWallets": wallets,
            "creatorShare": token.creator_share(),
            "creator": state.format(&token.creator()),
            "holders": token.holder_count(),
            "pools": pools,
        }),
    )
}

fn handle_balance_of(id: Value, params: &Params, state: &RpcState) -> JsonRpcResponse {
    let handle = param!(params.address("token"), id);
    let address = param!(params.address("address"), id);
    let ledger = read_lock!(state.ledger, id.clone());

    match ledger.registry().token(&handle) {
        Some(token) => JsonRpcResponse::success(
            id,
            json!({ "balance": token.balance_of(&address).to_string() }),
        ),
        None => registry_error(id, &RegistryError::UnknownToken(handle)),
    }
}

fn handle_allowance(id: Value, params: &Params, state: &RpcState) -> JsonRpcResponse {
    let handle = param!(params.address("token"), id);
    let owner = param!(params.address("owner"), id);
    let spender = param!(params.address("spender"), id);
    let ledger = read_lock!(state.ledger, id.clone());

    match ledger.registry().token(&handle) {
        Some(token) => JsonRpcResponse::success(
            id,
            json!({ "allowance": token.allowance(&owner, &spender).to_string() }),
        ),
        None => registry_error(id, &RegistryError::UnknownToken(handle)),
    }
}

fn handle_transfer(id: Value, params: &Params, state: &RpcState) -> JsonRpcResponse {
    let handle = param!(params.address("token"), id);
    let from = param!(params.address("from"), id);
    let to = param!(params.address("to"), id);
    let amount = param!(params.amount("amount"), id);

    let committed = {
        let mut ledger = write_lock!(state.ledger, id.clone());
        match ledger.transfer(&handle, from, to, amount) {
            Ok(committed) => committed,
            Err(e) => return ledger_error(id, &e),
        }
    };

    debug!(
        token = %state.format(&handle),
        kind = %committed.value.kind,
        tax = %committed.value.tax,
        "Transfer committed"
    );
    state.publish(&committed.events);

    JsonRpcResponse::success(id, receipt_json(&committed.value, state))
}

fn handle_approve(id: Value, params: &Params, state: &RpcState) -> JsonRpcResponse {
    let handle = param!(params.address("token"), id);
    let owner = param!(params.address("owner"), id);
    let spender = param!(params.address("spender"), id);
    let amount = param!(params.amount("amount"), id);

    let committed = {
        let mut ledger = write_lock!(state.ledger, id.clone());
        match ledger.approve(&handle, owner, spender, amount) {
            Ok(committed) => committed,
            Err(e) => return ledger_error(id, &e),
        }
    };

    state.publish(&committed.events);

    JsonRpcResponse::success(id, json!({ "allowance": committed.value.to_string() }))
}

fn handle_transfer_from(id: Value, params: &Params, state: &RpcState) -> JsonRpcResponse {
    let handle = param!(params.address("token"), id);
    let spender = param!(params.address("spender"), id);
    let from = param!(params.address("from"), id);
    let to = param!(params.address("to"), id);
    let amount = param!(params.amount("amount"), id);

    let committed = {
        let mut ledger = write_lock!(state.ledger, id.clone());
        match ledger.transfer_from(&handle, spender, from, to, amount) {
            Ok(committed) => committed,
            Err(e) => return ledger_error(id, &e),
        }
    };

    debug!(
        token = %state.format(&handle),
        kind = %committed.value.kind,
        tax = %committed.value.tax,
        "Delegated transfer committed"
    );
    state.publish(&committed.events);

    JsonRpcResponse::success(id, receipt_json(&committed.value, state))
}

fn handle_register_pool(id: Value, params: &Params, state: &RpcState) -> JsonRpcResponse {
    let handle = param!(params.address("token"), id);
    let caller = param!(params.address("caller"), id);
    let pool = param!(params.address("pool"), id);

    let committed = {
        let mut ledger = write_lock!(state.ledger, id.clone());
        match ledger.register_pool(&handle, &caller, pool) {
            Ok(committed) => committed,
            Err(e) => return ledger_error(id, &e),
        }
    };

    if committed.value {
        info!(
            token = %state.format(&handle),
            pool = %state.format(&pool),
            "Pool registered"
        );
    }
    state.publish(&committed.events);

    JsonRpcResponse::success(id, json!({ "registered": committed.value }))
}

/// Parse an address in the configured network's format
fn handle_validate_address(id: Value, params: &Params, state: &RpcState) -> JsonRpcResponse {
    let input = param!(params.str("address"), id);

    match state.codec().parse(input) {
        Ok(address) => JsonRpcResponse::success(
            id,
            json!({
                "valid": true,
                "address": state.format(&address),
                "network": state.network.display_name(),
                "format": state.codec().name(),
            }),
        ),
        Err(e) => JsonRpcResponse::success(
            id,
            json!({
                "valid": false,
                "error": e.to_string(),
                "address": input,
                "network": state.network.display_name(),
            }),
        ),
    }
}

// ============================================================================
// HTTP helpers
// ============================================================================

fn check_cors_origin(request_origin: Option<&str>, allowed_origins: &[String]) -> Option<String> {
    let origin = request_origin?;

    if allowed_origins.iter().any(|o| o == "*") {
        return Some(origin.to_string());
    }

    for allowed in allowed_origins {
        if origin == allowed {
            return Some(origin.to_string());
        }
        // "http://localhost" also matches "http://localhost:3000"
        if origin.starts_with(allowed.as_str())
            && (allowed.ends_with("localhost") || allowed.ends_with("127.0.0.1"))
        {
            let suffix = &origin[allowed.len()..];
            if suffix.is_empty() || suffix.starts_with(':') {
                return Some(origin.to_string());
            }
        }
    }

    None
}

fn cors_response(
    mut response: Response<Full<Bytes>>,
    allowed_origin: Option<&str>,
) -> Response<Full<Bytes>> {
    let Some(origin) = allowed_origin.and_then(|o| HeaderValue::from_str(o).ok()) else {
        return response;
    };

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, X-API-Key"),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));

    response
}

fn plain_response(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn json_response(response: JsonRpcResponse, allowed_origin: Option<&str>) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(&response).unwrap_or_default();
    cors_response(
        plain_response(StatusCode::OK, "application/json", body),
        allowed_origin,
    )
}
