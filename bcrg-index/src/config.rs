//! Config persistence for the index
//!
//! Wraps [`bcrg_common::config::write_toml_config`] so that a filename
//! pattern which would fail every refresh never reaches the config file.

use bcrg_common::config::{write_toml_config, TomlConfig};
use std::path::Path;
use tracing::info;

use crate::error::IndexResult;
use crate::services::accept_template;

/// Validate the config's filename pattern, then write the config atomically
///
/// Nothing is written when the pattern is rejected.
pub fn save_config(config: &TomlConfig, path: &Path) -> IndexResult<()> {
    if let Some(template) = &config.filename_pattern {
        accept_template(template)?;
    }

    write_toml_config(config, path)?;
    info!(path = %path.display(), "Config saved");
    Ok(())
}
