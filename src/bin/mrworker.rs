use std::net::SocketAddr;

use clap::Parser;
use mapreduce_rs::mr::function::lookup;
use mapreduce_rs::mr::rpc::CoordinatorClient;
use mapreduce_rs::mr::worker;
use tarpc::{client, tokio_serde::formats::Json};
use tracing::{error, info};

/// Launch a MapReduce worker: repeatedly asks the coordinator for a task,
/// runs the named application's map/reduce callback, and writes output
/// atomically.
#[derive(Parser, Debug)]
#[command(name = "mrworker")]
struct Args {
    /// Name of the registered map/reduce application to run (see
    /// `mr::function`).
    #[arg(default_value = "wc")]
    app: String,

    /// Coordinator address to connect to.
    #[arg(long, default_value = "127.0.0.1:1030")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let app = lookup(&args.app)?;

    let client_transport = match tarpc::serde_transport::tcp::connect(args.addr, Json::default).await {
        Ok(t) => t,
        Err(e) => {
            // The coordinator almost certainly isn't up yet or has already
            // exited; a worker that can't connect simply exits cleanly.
            error!(error = %e, "failed to connect to coordinator");
            return Ok(());
        }
    };

    let client: CoordinatorClient =
        CoordinatorClient::new(client::Config::default(), client_transport).spawn();

    info!(app = %args.app, addr = %args.addr, "worker starting");
    worker::run(client, app).await
}
