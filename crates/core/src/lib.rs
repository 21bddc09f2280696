pub mod config;
pub mod error;
pub mod redirect;
pub mod types;

pub use config::{
    Configuration, CookieSettings, CredentialSource, EnvSource, FileSource, parse_config_toml,
    parse_config_toml_str,
};
pub use error::{Error, Result};
pub use types::*;
