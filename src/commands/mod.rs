pub mod config;
pub mod convert;

pub use config::{execute_config_create, execute_config_show};
pub use convert::{ConvertCommandArgs, execute_convert};
