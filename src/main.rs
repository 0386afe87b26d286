use std::panic;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::channel;
use tracing_subscriber::EnvFilter;

use crate::config::JudgeConfig;
use crate::constants::CHANNEL_CAPACITY;
use crate::core::{judge::Judge, pipeline::running::handle_running, sampler::MemorySampler};
use crate::native::{executor::NativeExecutor, probe::probe_for_platform, staging::FileStager};
use crate::transport::{
    accepting::{accept_connections, bind},
    msg_handling::handle_messages,
    reading::read_sockets,
    responding::respond,
};

mod config;
mod constants;
mod core;
mod models;
mod native;
mod transport;

#[cfg(test)]
mod integration_test;

#[tokio::main]
#[tracing::instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    set_panic_hook();

    let config = JudgeConfig::from_env()?;
    tracing::info!("Configuration: {:?}", config);

    let runtime = config.runtime();
    let runtime_version = runtime.version().await;
    let executor = NativeExecutor::new(
        runtime,
        MemorySampler::new(probe_for_platform()),
        config.time_limit,
    )
    .output_limit(config.output_limit);
    let stager = FileStager::new(&config.staging_dir, &config.program_extension);
    let judge = Arc::new(Judge::new(
        Arc::new(executor),
        Arc::new(stager),
        runtime_version,
    ));

    let (read_tx, read_rx) = channel(CHANNEL_CAPACITY);
    let (msg_handle_tx, msg_handle_rx) = channel(CHANNEL_CAPACITY);
    let (run_tx, run_rx) = channel(CHANNEL_CAPACITY);
    let (res_tx, res_rx) = channel(CHANNEL_CAPACITY);
    let sockets = Arc::new(DashMap::new());

    respond(sockets.clone(), res_rx);
    handle_running(res_tx.clone(), run_rx, judge);
    handle_messages(res_tx, run_tx, msg_handle_rx);
    read_sockets(sockets, read_rx, msg_handle_tx);

    let listener = bind(&config.addr).await?;
    accept_connections(read_tx, listener).await??;

    Ok(())
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
