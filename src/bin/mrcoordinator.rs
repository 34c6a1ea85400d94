use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use futures::StreamExt;
use mapreduce_rs::mr::coordinator::Coordinator;
use mapreduce_rs::mr::rpc::Coordinator as CoordinatorService;
use tarpc::{server::incoming::Incoming, tokio_serde::formats::Json};
use tokio::time::sleep;
use tracing::info;

/// Launch the MapReduce coordinator: hands out map/reduce tasks to workers
/// over TCP until every reduce task reports success.
#[derive(Parser, Debug)]
#[command(name = "mrcoordinator")]
struct Args {
    /// Input files, one map task per file.
    #[arg(required = true)]
    files: Vec<String>,

    /// Number of reduce tasks (fan-out).
    #[arg(long = "n-reduce", default_value_t = 10)]
    n_reduce: usize,

    /// Address to listen on for worker RPCs.
    #[arg(long, default_value = "127.0.0.1:1030")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    info!(
        map_tasks = args.files.len(),
        n_reduce = args.n_reduce,
        addr = %args.addr,
        "starting coordinator"
    );

    let coordinator = Coordinator::new(args.files, args.n_reduce)?;

    let server_transport = tarpc::serde_transport::tcp::listen(args.addr, Json::default).await?;
    let serve_handle = coordinator.clone();
    tokio::spawn(
        server_transport
            .filter_map(|r| async { r.ok() })
            .map(tarpc::server::BaseChannel::with_defaults)
            .execute(serve_handle.serve()),
    );

    info!("coordinator listening, waiting for workers");

    while !coordinator.is_done() {
        sleep(Duration::from_secs(1)).await;
    }

    info!("all tasks complete, shutting down");
    Ok(())
}
