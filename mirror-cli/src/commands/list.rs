//! Print the user list.

use anyhow::{anyhow, Result};
use mirror_client::{PaginationConfig, SyncEngine, UserSource, UsersController, ViewState};
use mirror_store::UserStore;
use tokio::sync::watch;

use super::summary_line;

/// Run the list command.
///
/// Starts a controller (which refreshes), applies the filter, then loads
/// up to `pages` pages and prints what is presented.
pub async fn run<S, St>(
    engine: SyncEngine<S, St>,
    pagination: &PaginationConfig,
    query: Option<&str>,
    pages: u32,
) -> Result<()>
where
    S: UserSource + 'static,
    St: UserStore + 'static,
{
    let controller =
        UsersController::start(engine, pagination.page_size, pagination.offset_advance);
    let mut states = controller.subscribe();

    let state = settle(&mut states, |s| !s.is_loading).await?;
    if let Some(error) = state.fatal_error {
        anyhow::bail!("No users available: {}", error);
    }
    if let Some(banner) = &state.degraded_error {
        eprintln!("warning: {} (showing the local copy)", banner);
    }

    if query.is_some() {
        controller.set_query(query);
    }

    for _ in 0..pages {
        if !controller.load_more() {
            break;
        }
        settle(&mut states, |s| !s.is_loading_more).await?;
    }

    let state = controller.state();
    print_state(&state);
    Ok(())
}

async fn settle(
    states: &mut watch::Receiver<ViewState>,
    ready: impl FnMut(&ViewState) -> bool,
) -> Result<ViewState> {
    let state = states
        .wait_for(ready)
        .await
        .map_err(|_| anyhow!("controller stopped"))?;
    Ok(state.clone())
}

fn print_state(state: &ViewState) {
    if state.users.is_empty() {
        match &state.query {
            Some(query) => println!("No users match \"{}\".", query),
            None => println!("No users."),
        }
        return;
    }

    for user in &state.users {
        println!("{}", summary_line(user));
    }
    println!();

    let more = if state.end_reached {
        " (end of list)"
    } else {
        ""
    };
    println!("{} users shown{}", state.users.len(), more);
}
