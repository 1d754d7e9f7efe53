mod error;
mod routes;
mod server;

pub use error::ApiError;
pub use server::{router, start, ServerState, UiConfig};
