//! CLI command implementations.

mod ask;
mod config;
mod delete;
mod extract;
mod list;
mod serve;
mod upload;

pub use ask::run_ask;
pub use config::run_config;
pub use delete::run_delete;
pub use extract::run_extract;
pub use list::run_list;
pub use serve::{build_router, run_serve, AppState};
pub use upload::run_upload;
