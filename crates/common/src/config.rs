//! TOML config loading.
//!
//! Consumers define their own typed config struct and load it through
//! [`load_toml`]. Missing fields fall back to the struct's serde defaults.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Load a typed config from a TOML file path.
pub fn load_toml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let p = path.as_ref();
    let s = fs::read_to_string(p)
        .with_context(|| format!("reading config file {}", p.display()))?;
    parse_toml(&s).with_context(|| format!("parsing config file {}", p.display()))
}

/// Parse a typed config from TOML text.
pub fn parse_toml<T: DeserializeOwned>(text: &str) -> Result<T> {
    let cfg: T = toml::from_str(text)?;
    Ok(cfg)
}
