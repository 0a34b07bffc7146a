pub mod entries;
pub mod index;

use axum::routing::get;
use axum::Router;

use crate::state::SharedState;

pub use entries::{EntriesView, EntryCard};

pub fn view_routes() -> Router<SharedState> {
    Router::new().route("/", get(index::page))
}
