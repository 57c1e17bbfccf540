pub mod error;
pub mod http;
pub mod lifecycle;
pub mod tracker;

pub use error::ApiError;
pub use lifecycle::Lifecycle;
pub use tracker::Tracker;
