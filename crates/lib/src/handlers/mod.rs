//! Message handlers invoked by the router. Each one no-ops on payloads it does not own.

mod keyword;
mod view_once;

pub use keyword::{KeywordResponder, RepliedMessages};
pub use view_once::{compose_caption, RelayContext, RelayError, ViewOnceRelay};
