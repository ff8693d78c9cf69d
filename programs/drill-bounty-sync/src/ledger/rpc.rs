use std::{str::FromStr, time::Duration};

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use super::{AccountSource, RawAccount};
use crate::{
    constant::USER_AGENT,
    errors::LedgerError,
    retry::{self, with_retry, RetryPolicy},
};

const JSONRPC_VERSION: &str = "2.0";

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a Value,
}

#[derive(Deserialize)]
struct JsonRpcResponse<R> {
    result: Option<R>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct AccountInfoResponse {
    value: Option<UiAccount>,
}

#[derive(Deserialize)]
struct UiAccount {
    data: (String, String),
    owner: String,
}

impl UiAccount {
    fn into_raw(self, address: &Pubkey) -> Result<RawAccount, LedgerError> {
        let (encoded, encoding) = self.data;
        if encoding != "base64" {
            return Err(LedgerError::decode(
                "account",
                *address,
                format!("unexpected encoding {encoding}"),
            ));
        }
        let data = BASE64
            .decode(encoded.as_bytes())
            .map_err(|err| LedgerError::decode("account", *address, err))?;
        let owner = Pubkey::from_str(&self.owner)
            .map_err(|err| LedgerError::decode("account", *address, err))?;

        Ok(RawAccount {
            owner,
            data,
        })
    }
}

/// Solana JSON-RPC reader for raw accounts.
#[derive(Clone)]
pub struct RpcAccountSource {
    inner: Client,
    url: Url,
    retry: RetryPolicy,
}

impl RpcAccountSource {
    pub fn new(url: Url, timeout: Duration, retry: RetryPolicy) -> Result<Self, LedgerError> {
        let inner = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { inner, url, retry })
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: &Value) -> Result<R, LedgerError> {
        let payload = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: 1,
            method,
            params,
        };

        let response = self.inner.post(self.url.clone()).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::HttpStatus {
                status,
                retry_after: retry::retry_after(response.headers()),
            });
        }

        let response: JsonRpcResponse<R> = serde_json::from_slice(&response.bytes().await?)?;
        if let Some(error) = response.error {
            return Err(LedgerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        response.result.ok_or(LedgerError::EmptyResponse)
    }
}

#[async_trait]
impl AccountSource for RpcAccountSource {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<RawAccount>, LedgerError> {
        let params = json!([
            address.to_string(),
            { "encoding": "base64", "commitment": "confirmed" }
        ]);
        let response: AccountInfoResponse = with_retry(&self.retry, "getAccountInfo", || {
            self.call("getAccountInfo", &params)
        })
        .await?;

        response
            .value
            .map(|account| account.into_raw(address))
            .transpose()
    }
}
