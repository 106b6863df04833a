mod error;
pub mod handlers;
mod routes;
pub mod static_files;

pub use error::{panic_response, ApiError, ErrorResponse};
pub use handlers::AppState;
pub use routes::create_router;
