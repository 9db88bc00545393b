use anyhow::{Result, anyhow};
use console::style;
use std::sync::Arc;
use tracing::info;

use crate::config::{ServeConfig, WorkerConfig};
use crate::core::consumer::PickWorker;
use crate::core::fanout::RequestFanout;
use crate::core::lookup::HttpPicklistClient;
use crate::core::salesforce::SalesforceClient;
use crate::core::store::PickStore;
use crate::core::transport::amqp::AmqpTransport;
use crate::interfaces::web::ApiServer;

fn print_help() {
    println!();
    println!(
        " {}  {}",
        style("pickstream").green().bold(),
        style("picklist enrichment pipeline").dim()
    );
    println!();
    println!(" {}", style("Commands").bold());
    println!(
        "   {}   Start the HTTP API that queries records and queues picklist lookups",
        style("serve").cyan()
    );
    println!(
        "   {}  Drain the lookup queue and merge values into program picks files",
        style("worker").cyan()
    );
    println!("   {}    Show this help text", style("help").cyan());
    println!(
        "\n {} {} <command>\n",
        style("Usage:").bold(),
        style("pickstream").green()
    );
}

async fn run_serve() -> Result<()> {
    crate::logging::init();
    let config = ServeConfig::from_env()?;

    let salesforce = Arc::new(SalesforceClient::authenticate(&config.salesforce).await?);
    let transport = Arc::new(AmqpTransport::connect(&config.amqp).await?);
    let fanout = Arc::new(RequestFanout::new(
        transport,
        salesforce.uiapi_url().to_string(),
    ));

    ApiServer::new(salesforce, fanout, config.http_addr)
        .serve()
        .await
}

async fn run_worker() -> Result<()> {
    crate::logging::init();
    let config = WorkerConfig::from_env()?;

    let transport = Arc::new(AmqpTransport::connect(&config.amqp).await?);
    let lookup = Arc::new(HttpPicklistClient::new()?);
    let store = Arc::new(PickStore::new(config.picks_dir));
    let worker = PickWorker::new(transport, lookup, store);

    tokio::select! {
        result = worker.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping worker");
            Ok(())
        }
    }
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = if args.len() > 1 { args[1].as_str() } else { "" };

    match cmd {
        "serve" => run_serve().await,
        "worker" => run_worker().await,
        "" | "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other => {
            print_help();
            Err(anyhow!("unknown command: {other}"))
        }
    }
}
