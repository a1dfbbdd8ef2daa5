//! Component 4.H's outer shell: one lightweight task per registered
//! transport protocol index, reading requests off that transport's
//! channel and handing them to the [`viss_registry::Dispatcher`].
//!
//! Running one loop per transport index (rather than a single loop
//! `select!`-ing across all of them) keeps the set of tasks static and
//! avoids pulling in a dynamic `select_all` — every supported protocol's
//! data server is bound at startup (spec.md §4.E), so the task count is
//! fixed before the first connection ever arrives.

use tokio::sync::mpsc;
use tracing::debug;

use crate::state::{AppState, DispatchRequest};

pub async fn run(state: AppState, mgr_index: u16, mut rx: mpsc::Receiver<DispatchRequest>) {
    debug!(mgr_index, "dispatch loop started");
    while let Some((request, reply_tx)) = rx.recv().await {
        let response = state.dispatcher.dispatch(request).await;
        let _ = reply_tx.send(response);
    }
    debug!(mgr_index, "dispatch loop ended, request channel closed");
}
