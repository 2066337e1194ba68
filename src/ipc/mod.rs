mod error;
mod handlers;
mod helpers;
mod router;
mod types;

pub use handlers::core::open_workspace;
pub use router::handle_request;
pub use types::{AppState, Request};

use crate::live::LiveEvent;

/// Snapshot events owed after the last request. Queued work is dropped when
/// no workspace is open.
pub fn drain_events(state: &mut AppState) -> Vec<LiveEvent> {
    if !state.live.has_pending() {
        return Vec::new();
    }
    match state.db.as_ref() {
        Some(conn) => state.live.flush(conn),
        None => {
            state.live.clear_pending();
            Vec::new()
        }
    }
}
