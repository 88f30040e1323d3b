use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::address::validate_address;
use super::jsonrpc::{RpcRequest, decode};
use super::{Error, HttpClient, HttpRequest, Result};

/// Target URL with the API key attached as `?key=`. An empty key leaves the URL untouched.
pub fn endpoint_url(base: &str, api_key: Option<&str>) -> Result<String> {
    let mut url = url::Url::parse(base).map_err(|_| Error::InvalidUrl(base.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::UnsupportedScheme(base.to_string()));
    }

    if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
        url.query_pairs_mut().append_pair("key", key);
    }
    Ok(url.into())
}

#[derive(Debug, Deserialize)]
struct KeyedAccount {
    pubkey: String,
}

/// JSON-RPC client for the account lookup methods of a Solana node.
///
/// Every call validates its addresses first, then succeeds only if the node answered
/// 2xx with a `result`.
#[derive(Debug)]
pub struct RpcClient {
    http: HttpClient,
    url: String,
    redacted: String,
    timeout: Option<Duration>,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self> {
        Self::with_http(HttpClient::default(), base_url, api_key)
    }

    pub fn with_http(http: HttpClient, base_url: &str, api_key: Option<&str>) -> Result<Self> {
        let url = endpoint_url(base_url, api_key)?;
        let redacted = endpoint_url(base_url, None)?;
        Ok(Self {
            http,
            url,
            redacted,
            timeout: None,
            next_id: AtomicU64::new(1),
        })
    }

    /// Upper bound for one whole call. Unset means the call may take as long as the node
    /// needs.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL without the API key, safe to print.
    pub fn display_url(&self) -> &str {
        &self.redacted
    }

    pub async fn get_account_info(&self, address: &str) -> Result<()> {
        validate_address(address)?;
        self.call::<_, IgnoredAny>(
            "getAccountInfo",
            json!([address, { "encoding": "base64" }]),
        )
        .await?;
        Ok(())
    }

    pub async fn get_multiple_accounts<S: AsRef<str>>(&self, addresses: &[S]) -> Result<()> {
        let mut keys = Vec::with_capacity(addresses.len());
        for a in addresses {
            let a = a.as_ref().trim();
            if a.is_empty() {
                continue;
            }
            validate_address(a)?;
            keys.push(a);
        }
        if keys.is_empty() {
            return Err(Error::EmptyBatch);
        }

        self.call::<_, IgnoredAny>(
            "getMultipleAccounts",
            json!([keys, { "encoding": "base64" }]),
        )
        .await?;
        Ok(())
    }

    pub async fn get_program_accounts(&self, program: &str) -> Result<()> {
        validate_address(program)?;
        self.call::<_, IgnoredAny>(
            "getProgramAccounts",
            json!([program, { "encoding": "base64" }]),
        )
        .await?;
        Ok(())
    }

    /// Public keys of every account owned by `program`, in the order the node returned them.
    pub async fn program_account_keys(&self, program: &str) -> Result<Vec<String>> {
        validate_address(program)?;
        let accounts: Vec<KeyedAccount> = self
            .call(
                "getProgramAccounts",
                json!([program, { "encoding": "base64", "dataSlice": { "offset": 0, "length": 0 } }]),
            )
            .await?;
        Ok(accounts.into_iter().map(|a| a.pubkey).collect())
    }

    async fn call<P: Serialize, T: DeserializeOwned>(&self, method: &str, params: P) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(method, id, "sending json-rpc request");
        let body = serde_json::to_vec(&RpcRequest::new(id, method, params)).map_err(Error::Encode)?;

        let req = HttpRequest::post_json(&self.url, Bytes::from(body)).with_timeout(self.timeout);
        let res = self.http.request(req).await?;
        decode(res.status, &res.body)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn api_key_is_appended_as_query_param() {
        let url = endpoint_url("https://rpc.example.com", Some("secret")).unwrap();
        assert_eq!(url, "https://rpc.example.com/?key=secret");

        let url = endpoint_url("http://127.0.0.1:8899/rpc?x=1", Some("k")).unwrap();
        assert_eq!(url, "http://127.0.0.1:8899/rpc?x=1&key=k");

        let url = endpoint_url("http://127.0.0.1:8899", Some("  ")).unwrap();
        assert_eq!(url, "http://127.0.0.1:8899/");
    }

    #[test]
    fn display_url_hides_the_key() {
        let client = RpcClient::new("https://rpc.example.com", Some("secret")).unwrap();
        assert_eq!(client.url, "https://rpc.example.com/?key=secret");
        assert!(!client.display_url().contains("secret"));
    }

    #[tokio::test]
    async fn invalid_addresses_fail_before_sending() {
        // Port 9 (discard) is never contacted: validation fails first.
        let client = RpcClient::new("http://127.0.0.1:9", None).unwrap();
        assert!(matches!(
            client.get_account_info("not-base58!").await,
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            client.get_multiple_accounts(&["", "  "]).await,
            Err(Error::EmptyBatch)
        ));
        assert!(matches!(
            client.get_program_accounts("0OIl").await,
            Err(Error::InvalidAddress(_))
        ));
    }
}
