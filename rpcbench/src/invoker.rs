use std::future::Future;

use rpcbench_core::{Call, Invoker};
use rpcbench_rpc::RpcClient;

/// Drives the core worker pools with real JSON-RPC calls.
#[derive(Debug)]
pub(crate) struct RpcInvoker {
    client: RpcClient,
}

impl RpcInvoker {
    pub(crate) fn new(client: RpcClient) -> Self {
        Self { client }
    }
}

impl Invoker for RpcInvoker {
    type Error = rpcbench_rpc::Error;

    fn invoke(&self, call: Call<'_>) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move {
            match call {
                Call::AccountInfo { account } => self.client.get_account_info(account).await,
                Call::MultipleAccounts { accounts } => {
                    self.client.get_multiple_accounts(accounts).await
                }
                Call::ProgramAccounts { program } => {
                    self.client.get_program_accounts(program).await
                }
            }
        }
    }
}
