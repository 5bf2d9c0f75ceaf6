//! JSON-RPC 2.0 transport over HTTP.
//!
//! Transactions travel as JSON envelopes; the gateway in front of the node
//! owns any binary framing.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use snafu::ResultExt;

use crate::{
    error::{Result, RpcSnafu, TransportSnafu},
    rpc::{
        AccountState, LedgerRpc, SendResponse, SignedTransaction, SimulationResponse, Transaction,
        TransactionStatus,
    },
};

/// HTTP implementation of [`LedgerRpc`].
#[derive(Debug, Clone)]
pub struct HttpRpc {
    client: reqwest::Client,
    url: String,
    next_id: Arc<AtomicU64>,
}

impl HttpRpc {
    /// Creates a transport for `url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Transport` if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build().context(TransportSnafu)?;
        Ok(Self { client, url: url.into(), next_id: Arc::new(AtomicU64::new(1)) })
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<P, R>(&self, method: &'static str, params: P) -> Result<R>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest { jsonrpc: "2.0", id, method, params };

        tracing::trace!(method, id, url = %self.url, "rpc request");

        let body: Value = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .context(TransportSnafu)?
            .error_for_status()
            .context(TransportSnafu)?
            .json()
            .await
            .context(TransportSnafu)?;

        decode_response(method, body)
    }
}

#[derive(Serialize)]
struct JsonRpcRequest<P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: P,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Extracts `result` from a JSON-RPC response body, mapping error objects.
fn decode_response<R: DeserializeOwned>(method: &str, mut body: Value) -> Result<R> {
    if let Some(error) = body.get_mut("error").map(Value::take).filter(|e| !e.is_null()) {
        let message = match serde_json::from_value::<JsonRpcError>(error.clone()) {
            Ok(JsonRpcError { code, message, data: Some(data) }) => {
                format!("{code}: {message} ({data})")
            },
            Ok(JsonRpcError { code, message, data: None }) => format!("{code}: {message}"),
            Err(_) => error.to_string(),
        };
        return RpcSnafu { method, message }.fail();
    }

    let Some(result) = body.get_mut("result").map(Value::take) else {
        return RpcSnafu { method, message: "response has neither result nor error" }.fail();
    };

    serde_json::from_value(result)
        .map_err(|e| RpcSnafu { method, message: format!("malformed result: {e}") }.build())
}

/// Accepts a sequence number encoded either as a JSON string or number.
fn parse_sequence(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

#[derive(Deserialize)]
struct AccountResult {
    sequence: Value,
}

#[derive(Deserialize)]
struct PreparedResult {
    transaction: Transaction,
}

#[derive(Debug, Deserialize)]
struct TransactionResult {
    status: TransactionStatus,
}

#[async_trait]
impl LedgerRpc for HttpRpc {
    async fn get_account(&self, address: &str) -> Result<AccountState> {
        let account: AccountResult = self.call("getAccount", json!({ "address": address })).await?;
        match parse_sequence(&account.sequence) {
            Some(sequence) => Ok(AccountState { sequence }),
            None => RpcSnafu {
                method: "getAccount",
                message: format!("invalid sequence {}", account.sequence),
            }
            .fail(),
        }
    }

    async fn prepare_transaction(&self, tx: Transaction) -> Result<Transaction> {
        let prepared: PreparedResult =
            self.call("prepareTransaction", json!({ "transaction": tx })).await?;
        Ok(prepared.transaction)
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<SendResponse> {
        self.call("sendTransaction", json!({ "transaction": tx })).await
    }

    async fn get_transaction(&self, hash: &str) -> Result<TransactionStatus> {
        let result: TransactionResult = self.call("getTransaction", json!({ "hash": hash })).await?;
        Ok(result.status)
    }

    async fn simulate_transaction(&self, tx: &Transaction) -> Result<SimulationResponse> {
        self.call("simulateTransaction", json!({ "transaction": tx })).await
    }
}
