//! # mcpgw-settings
//!
//! Layered configuration for the gateway and the bundled math backend.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`GatewaySettings::default()`]
//! 2. **Settings file**: `~/.mcpgw/settings.json` or an explicit path,
//!    deep-merged over the defaults
//! 3. **Environment variables**: `MCPGW_*` overrides (highest priority)
//!
//! CLI flags in the `mcpgw` binary are applied on top of the loaded value.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_is_under_dot_mcpgw() {
        let path = settings_path();
        assert!(path.ends_with(".mcpgw/settings.json"));
    }
}
