#![forbid(unsafe_code)]

mod address;
mod client;
mod error;
mod jsonrpc;
mod solana;
mod types;
mod util;

pub use address::{is_valid_address, validate_address};
pub use client::HttpClient;
pub use error::{Error, Result};
pub use jsonrpc::{RpcErrorObject, RpcRequest, RpcResponse};
pub use solana::{RpcClient, endpoint_url};
pub use types::{HttpRequest, HttpResponse};
