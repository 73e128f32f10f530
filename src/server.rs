// Proxy server assembly.
// Wires the CA, backend client, merge workers and interception hook into one running proxy.

use std::sync::Arc;

use hudsucker::Proxy;
use hudsucker::rustls::crypto::aws_lc_rs;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::backend::BackendClient;
use crate::cache::CacheMerger;
use crate::config::ServeConfig;
use crate::error::{Error, Result};
use crate::geocode::{GeocodeClient, LocalityResolver};
use crate::intercept::{InterceptHandler, InterceptTarget, RouteTable, ca};
use crate::pipeline::{self, BatchQueue};

/// Run the intercepting proxy until Ctrl-C. Bind and CA failures are fatal.
pub async fn run(config: ServeConfig) -> Result<()> {
    let ca_dir = config
        .ca_dir
        .clone()
        .or_else(ca::default_ca_dir)
        .ok_or_else(|| Error::Other("no CA directory available, pass --ca-dir".to_string()))?;
    let authority = ca::load_or_create(&ca_dir)?;

    let fetcher = BackendClient::new(&config.backend_url)?;
    let merger = Arc::new(CacheMerger::new(&config.data_dir, fetcher));
    let geocoder = config
        .geocode_key
        .as_deref()
        .map(GeocodeClient::new)
        .transpose()?;
    if geocoder.is_none() {
        info!("no geocode key, map queries are filed under the unknown locality");
    }

    let (queue, rx) = BatchQueue::bounded(config.queue_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers = pipeline::spawn_workers(
        config.workers,
        merger,
        LocalityResolver::new(geocoder),
        rx,
        shutdown_rx,
    );

    let handler = InterceptHandler::new(
        InterceptTarget::new(config.host.clone(), config.port),
        RouteTable::standard(),
        queue,
    );

    let proxy = Proxy::builder()
        .with_addr(config.listen)
        .with_ca(authority)
        .with_rustls_client(aws_lc_rs::default_provider())
        .with_http_handler(handler)
        .with_graceful_shutdown(shutdown_signal())
        .build()?;

    info!(
        listen = %config.listen,
        host = %config.host,
        data_dir = %config.data_dir.display(),
        ca_dir = %ca_dir.display(),
        "start serving"
    );
    let result = proxy.start().await;

    let _ = shutdown_tx.send(true);
    for worker in workers {
        if let Err(e) = worker.await {
            warn!(error = %e, "worker task failed");
        }
    }

    result.map_err(Error::from)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
