pub mod app;
pub mod error;
pub mod handlers;
pub mod resolve;
pub mod state;

pub use app::build_router;
