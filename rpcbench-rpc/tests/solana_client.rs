#![allow(clippy::unwrap_used)]

use std::time::Duration;

use rpcbench_rpc::{Error, RpcClient};
use rpcbench_testserver::{DEFAULT_PROGRAM_ACCOUNTS, TestServer, TestServerConfig};

const ACCOUNT: &str = "7Xnw7aDxJu1CxPPEkz9ttfGSn2bpH3R1GYYziJxTCv3e";
const PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

#[tokio::test]
async fn every_method_succeeds_against_a_healthy_node() {
    let server = TestServer::start().await.unwrap();
    let client = RpcClient::new(server.base_url(), Some("k")).unwrap();

    client.get_account_info(ACCOUNT).await.unwrap();
    client
        .get_multiple_accounts(&[ACCOUNT, PROGRAM, ACCOUNT, PROGRAM, ACCOUNT])
        .await
        .unwrap();
    client.get_program_accounts(PROGRAM).await.unwrap();

    let stats = server.stats();
    assert_eq!(stats.requests_total(), 3);
    assert_eq!(stats.saw_api_key(), 3);
    assert_eq!(stats.method_total("getMultipleAccounts"), 1);
    assert_eq!(stats.batch_bounds(), Some((5, 5)));

    server.shutdown().await;
}

#[tokio::test]
async fn program_account_keys_lists_pubkeys() {
    let server = TestServer::start().await.unwrap();
    let client = RpcClient::new(server.base_url(), None).unwrap();

    let keys = client.program_account_keys(PROGRAM).await.unwrap();
    assert_eq!(keys, DEFAULT_PROGRAM_ACCOUNTS.to_vec());
    assert_eq!(server.stats().saw_api_key(), 0);

    server.shutdown().await;
}

#[tokio::test]
async fn rpc_errors_and_http_errors_are_failures() {
    let server = TestServer::start_with(TestServerConfig::default().failing("getAccountInfo"))
        .await
        .unwrap();
    let client = RpcClient::new(server.base_url(), None).unwrap();
    assert!(matches!(
        client.get_account_info(ACCOUNT).await,
        Err(Error::Rpc { code: -32000, .. })
    ));
    client.get_program_accounts(PROGRAM).await.unwrap();
    server.shutdown().await;

    let server = TestServer::start_with(TestServerConfig::default().with_http_status(503))
        .await
        .unwrap();
    let client = RpcClient::new(server.base_url(), None).unwrap();
    assert!(matches!(
        client.get_program_accounts(PROGRAM).await,
        Err(Error::Status { status: 503, .. })
    ));
    server.shutdown().await;
}

#[tokio::test]
async fn request_timeout_covers_slow_nodes() {
    let server = TestServer::start_with(
        TestServerConfig::default().with_latency(Duration::from_millis(500)),
    )
    .await
    .unwrap();
    let client = RpcClient::new(server.base_url(), None)
        .unwrap()
        .with_timeout(Some(Duration::from_millis(50)));

    assert!(matches!(
        client.get_account_info(ACCOUNT).await,
        Err(Error::Timeout(_))
    ));
    server.shutdown().await;
}
