#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod error;
pub mod pkg;
pub mod version;

pub use config::{Config, Environment, LogLevel};
pub use error::Error;
pub use pkg::{
    create, detect_package_manager, CommandResult, DetectOptions, PackageManager,
    PackageManagerKind,
};
pub use version::VERSION;
