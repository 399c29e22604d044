//! Replace the local copy with the remote directory.

use anyhow::{Context, Result};
use mirror_client::{SyncEngine, UserSource};
use mirror_store::UserStore;

/// Run the refresh command.
pub async fn run<S: UserSource, St: UserStore>(
    engine: SyncEngine<S, St>,
    source_label: &str,
) -> Result<()> {
    println!("Refreshing from {}...", source_label);

    let report = engine.refresh().await.context("Refresh failed")?;

    println!("Synced {} users.", report.users);
    Ok(())
}
