mod handlers;
mod router;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::core::fanout::RequestFanout;
use crate::core::salesforce::SalesforceClient;

/// Shared state behind every API handler.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) salesforce: Arc<SalesforceClient>,
    pub(crate) fanout: Arc<RequestFanout>,
}

pub struct ApiServer {
    salesforce: Arc<SalesforceClient>,
    fanout: Arc<RequestFanout>,
    addr: String,
}

impl ApiServer {
    pub fn new(
        salesforce: Arc<SalesforceClient>,
        fanout: Arc<RequestFanout>,
        addr: String,
    ) -> Self {
        Self {
            salesforce,
            fanout,
            addr,
        }
    }

    /// Bind and serve until ctrl-c, then let in-flight requests finish.
    pub async fn serve(self) -> Result<()> {
        let port = self
            .addr
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(9090);
        let state = AppState {
            salesforce: self.salesforce,
            fanout: self.fanout,
        };
        let app = router::build_api_router(state, port);

        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .with_context(|| format!("bind api server to {}", self.addr))?;
        info!("API Server running at http://{}", self.addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutting down API server");
            })
            .await
            .context("api server crashed")?;
        Ok(())
    }
}
