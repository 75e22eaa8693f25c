use crate::{
    economy::ChainSnapshot,
    transactions::address_slice_boc,
};
use anyhow::{
    Context,
    Result,
    anyhow,
    ensure,
};
use base64::{
    Engine,
    engine::general_purpose::STANDARD,
};
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use std::{
    fmt,
    future::Future,
};

pub const DEFAULT_TESTNET_RPC_URL: &str = "https://testnet.toncenter.com/api/v2/jsonRPC";
pub const DEFAULT_MAINNET_RPC_URL: &str = "https://toncenter.com/api/v2/jsonRPC";

pub const PLAYER_INFO_METHOD: &str = "get_player_info";

pub trait ChainReader {
    fn fetch_player_info(
        &self,
        account: &str,
    ) -> impl Future<Output = Result<ChainSnapshot>>;
}

/// Runs get-methods on the staking contract through a toncenter v2
/// JSON-RPC endpoint.
#[derive(Clone)]
pub struct TonCenterClient {
    rpc_url: String,
    staking_contract: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl TonCenterClient {
    pub fn new(
        rpc_url: impl Into<String>,
        staking_contract: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client for RPC node")?;
        Ok(Self {
            rpc_url: rpc_url.into(),
            staking_contract: staking_contract.into(),
            api_key,
            http,
        })
    }

    pub async fn run_get_method(
        &self,
        method: &str,
        stack: Vec<(&str, String)>,
    ) -> Result<Vec<Vec<Value>>> {
        let request = JsonRpcRequest {
            id: "1",
            jsonrpc: "2.0",
            method: "runGetMethod",
            params: RunGetMethodParams {
                address: &self.staking_contract,
                method,
                stack,
            },
        };
        let mut call = self.http.post(&self.rpc_url).json(&request);
        if let Some(key) = &self.api_key {
            call = call.header("X-API-Key", key);
        }
        let res = call.send().await.context("RPC request failed")?;
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .context("failed to read RPC response body")?;
        let response: JsonRpcResponse = serde_json::from_slice(&bytes).with_context(|| {
            format!(
                "invalid RPC payload (status {status}): {}",
                String::from_utf8_lossy(&bytes)
            )
        })?;
        if !response.ok {
            return Err(anyhow!(
                "RPC node rejected {method}: {}",
                response.error.unwrap_or_else(|| status.to_string())
            ));
        }
        let result = response
            .result
            .ok_or_else(|| anyhow!("RPC response for {method} has no result"))?;
        ensure!(
            result.exit_code == 0 || result.exit_code == 1,
            "{method} exited with code {}",
            result.exit_code
        );
        Ok(result.stack)
    }
}

impl ChainReader for TonCenterClient {
    async fn fetch_player_info(&self, account: &str) -> Result<ChainSnapshot> {
        let boc = address_slice_boc(account)?;
        let stack = self
            .run_get_method(PLAYER_INFO_METHOD, vec![("tvm.Slice", STANDARD.encode(boc))])
            .await?;
        parse_player_info(&stack)
    }
}

impl fmt::Display for TonCenterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rpc_url)
    }
}

/// Reads `(hash_power, pending_rewards)` in that order.
pub fn parse_player_info(stack: &[Vec<Value>]) -> Result<ChainSnapshot> {
    ensure!(
        stack.len() >= 2,
        "get_player_info returned {} stack entries, expected 2",
        stack.len()
    );
    let hash_power = parse_stack_number(&stack[0]).context("reading hash power")?;
    let pending_rewards =
        parse_stack_number(&stack[1]).context("reading pending rewards")?;
    Ok(ChainSnapshot {
        hash_power,
        pending_rewards,
    })
}

fn parse_stack_number(entry: &[Value]) -> Result<u64> {
    let kind = entry.first().and_then(Value::as_str);
    ensure!(kind == Some("num"), "expected a num stack entry, got {entry:?}");
    let raw = entry
        .get(1)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("num stack entry has no value: {entry:?}"))?;
    ensure!(!raw.starts_with('-'), "negative value {raw}");
    match raw.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse::<u64>(),
    }
    .with_context(|| format!("value {raw} does not fit in u64"))
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    id: &'a str,
    jsonrpc: &'a str,
    method: &'a str,
    params: RunGetMethodParams<'a>,
}

#[derive(Serialize)]
struct RunGetMethodParams<'a> {
    address: &'a str,
    method: &'a str,
    stack: Vec<(&'a str, String)>,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    ok: bool,
    #[serde(default)]
    result: Option<RunResultDto>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct RunResultDto {
    exit_code: i64,
    #[serde(default)]
    stack: Vec<Vec<Value>>,
}
