//! CLI command implementations.

mod captions;
mod config;
mod doctor;
mod generate;
mod list;
mod serve;

pub use captions::run_captions;
pub use config::run_config;
pub use doctor::run_doctor;
pub use generate::run_generate;
pub use list::{run_delete, run_list};
pub use serve::run_serve;
