use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::time::Duration;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut bind_addr: SocketAddr = "127.0.0.1:0".parse()?;
    let mut config = rpcbench_testserver::TestServerConfig::default();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bind" => {
                let addr = args.next().ok_or_else(|| {
                    anyhow::anyhow!("--bind requires an address, e.g. 127.0.0.1:0")
                })?;
                bind_addr = addr.parse()?;
            }
            "--latency-ms" => {
                let ms = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--latency-ms requires a number"))?;
                config = config.with_latency(Duration::from_millis(ms.parse()?));
            }
            "--fail" => {
                let method = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--fail requires a method name"))?;
                config = config.failing(&method);
            }
            "-h" | "--help" => {
                eprintln!(
                    "rpcbench-testserver\n\nUSAGE:\n  rpcbench-testserver [--bind 127.0.0.1:0] [--latency-ms N] [--fail METHOD]...\n\nOUTPUT:\n  Prints RPC_URL=<url> to stdout once ready."
                );
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown argument: {other}"));
            }
        }
    }

    let listener = TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    let stats = rpcbench_testserver::TestServerStats::default();
    let app = rpcbench_testserver::router(stats, config);

    println!("RPC_URL=http://{addr}");

    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
    });

    serve.await?;
    Ok(())
}
