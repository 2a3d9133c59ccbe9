//! # parley-settings
//!
//! Configuration for the Parley relay, loaded from three layers (in priority
//! order):
//! 1. **Compiled defaults**: [`ParleySettings::default()`]
//! 2. **Settings file**: `~/.parley/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `HOST`, `PORT`, `LOG_LEVEL`,
//!    `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_API_KEY` and `PARLEY_*`
//!
//! Call [`ParleySettings::validate`] before starting the server; the relay
//! cannot dial upstream without an endpoint and key.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings_from_path, settings_path,
};
pub use types::*;
