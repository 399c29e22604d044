//! Show local copy status.

use anyhow::Result;
use mirror_store::UserStore;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Run the status command.
pub async fn run<St: UserStore + ?Sized>(
    store: &St,
    database: &Path,
    source_label: &str,
) -> Result<()> {
    println!("=== usermirror status ===");
    println!();
    println!("Local copy:");
    println!("  Database: {}", database.display());
    println!("  Users:    {}", store.count().await?);
    match store.last_synced_at().await? {
        Some(ts) => println!("  Synced:   {}", format_timestamp(ts)),
        None => {
            println!("  Synced:   NEVER");
            println!();
            println!("Run 'usermirror refresh' to mirror the directory.");
        }
    }
    println!();
    println!("Remote:");
    println!("  Source:   {}", source_label);

    Ok(())
}

/// Format a unix-millis timestamp relative to now.
fn format_timestamp(ts_millis: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let diff = now.saturating_sub(ts_millis / 1000).max(0);

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}
