// ------------------------------------------------------------
// Module declarations
// ------------------------------------------------------------
//
// Each module represents a well-defined responsibility:
//
// - config:     Environment / file configuration and retry policy
// - error:      Error taxonomy shared by every stage
// - schema:     API payloads and the login set types
// - session:    Authenticated HTTP session with transient retries
// - collector:  Rate-limit gate and paginated login collection
// - graph:      FollowGraph trait and its GitHub implementation
// - reconcile:  Follow / unfollow planning and execution
// - metrics:    End-of-run summary
// - util:       Logging setup
//
mod config;
mod error;
mod schema;
mod session;
mod collector;
mod graph;
mod reconcile;
mod metrics;
mod util;

// ------------------------------------------------------------
// External dependencies
// ------------------------------------------------------------

use anyhow::anyhow;
use log::{error, info};
use rustls::crypto::{CryptoProvider, ring};

use config::Config;
use error::SyncError;
use graph::GithubGraph;
use metrics::RunSummary;
use reconcile::Reconciler;
use session::GithubSession;

// ------------------------------------------------------------
// Application entry point
// ------------------------------------------------------------
//
// One reconciliation pass for one account, then exit.
//
// Responsibilities:
// - Initialize logging and the rustls crypto backend
// - Load configuration (fatal before any request if incomplete)
// - Build the session and run the reconciler
// - Exit non-zero on the first unrecovered error
//
// Everything runs on a single thread and every request is
// awaited in turn; nothing is spawned.
//
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    util::init_logging();

    // rustls >= 0.23 requires an explicit process-wide provider
    CryptoProvider::install_default(ring::default_provider())
        .map_err(|_| anyhow!("failed to install rustls CryptoProvider"))?;

    match run().await {
        Ok(summary) => {
            info!("{}", summary);
            Ok(())
        }
        Err(e) => {
            let e = anyhow::Error::from(e);
            error!("Script failed: {:#}", e);
            Err(e)
        }
    }
}

async fn run() -> Result<RunSummary, SyncError> {
    let config = Config::load()?;
    info!(
        "Reconciling follow graph of {} via {}{}",
        config.account,
        config.api_base,
        if config.dry_run { " (dry run)" } else { "" }
    );

    let session = GithubSession::new(&config)?;
    let graph = GithubGraph::new(&session, &config);

    Reconciler::new(&graph, config.dry_run).run().await
}
