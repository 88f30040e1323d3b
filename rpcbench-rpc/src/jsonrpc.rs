use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use super::util::snippet;
use super::{Error, Result};

const STATUS_BODY_SNIPPET: usize = 200;

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a, P> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: P,
}

impl<'a, P: Serialize> RpcRequest<'a, P> {
    pub fn new(id: u64, method: &'a str, params: P) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// JSON-RPC 2.0 response envelope.
///
/// `result` is `Some` whenever the member is present, even when its value is `null`.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct RpcResponse<T> {
    #[serde(default, deserialize_with = "present")]
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

fn present<'de, D, T>(d: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(d).map(Some)
}

impl<T> RpcResponse<T> {
    pub fn into_result(self) -> Result<T> {
        if let Some(err) = self.error {
            return Err(Error::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        self.result.ok_or(Error::MissingResult)
    }
}

/// Interprets an HTTP exchange as a JSON-RPC call: 2xx plus a `result` member and no
/// `error` member.
pub(crate) fn decode<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T> {
    if !(200..300).contains(&status) {
        return Err(Error::Status {
            status,
            body: snippet(body, STATUS_BODY_SNIPPET),
        });
    }

    let res: RpcResponse<T> = serde_json::from_slice(body).map_err(Error::Decode)?;
    res.into_result()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde::de::IgnoredAny;

    #[test]
    fn request_serializes_as_jsonrpc_2() {
        let req = RpcRequest::new(7, "getAccountInfo", ("Addr", ()));
        let v = serde_json::to_value(&req).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(v["jsonrpc"], "2.0");
        assert_eq!(v["id"], 7);
        assert_eq!(v["method"], "getAccountInfo");
        assert_eq!(v["params"][0], "Addr");
    }

    #[test]
    fn null_result_counts_as_present() {
        let ok: Result<IgnoredAny> = decode(200, br#"{"jsonrpc":"2.0","id":1,"result":null}"#);
        assert!(ok.is_ok());
    }

    #[test]
    fn typed_result_decodes() {
        let keys: Vec<String> =
            decode(200, br#"{"jsonrpc":"2.0","id":1,"result":["A","B"]}"#).unwrap();
        assert_eq!(keys, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn error_member_wins() {
        let err = decode::<IgnoredAny>(
            200,
            br#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"Invalid param"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Rpc { code: -32602, .. }));
    }

    #[test]
    fn missing_result_and_bad_status_fail() {
        let err = decode::<IgnoredAny>(200, br#"{"jsonrpc":"2.0","id":1}"#).unwrap_err();
        assert!(matches!(err, Error::MissingResult));

        let err = decode::<IgnoredAny>(503, b"overloaded").unwrap_err();
        assert!(matches!(err, Error::Status { status: 503, .. }));

        let err = decode::<IgnoredAny>(200, b"<html>").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
