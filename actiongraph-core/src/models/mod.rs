pub mod action;
pub mod query;
pub mod session;
pub mod timestamp;

pub use action::{ActionResult, UIAction};
pub use query::{QueryRequest, DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT, MIN_QUERY_LIMIT};
pub use session::Session;
