//! Tool configuration.
//!
//! Consolidates configuration from tiers with field-by-field YAML merging:
//! 1. **Defaults** - Embedded in the binary
//! 2. **Project** - `$CWD/.profiles/config.yaml`
//! 3. **User** - `~/.profiles/config.yaml`
//! 4. **Environment** - Individual overrides
//!
//! Tiers are merged as [`ConfigTree`](crate::tree::ConfigTree)s, the same way
//! profile documents are, so later tiers override single fields without
//! erasing their siblings.
//!
//! ## Environment Variables
//! - `PROFILES_CONFIG_PATH` - Explicit config file (replaces the tiers)
//! - `PROFILES_PROJECT_DIR` - Project config dir (default: `./.profiles`)
//! - `PROFILES_USER_DIR` - User config dir (default: `~/.profiles`)
//! - `PROFILES_ROOT` - Profile root directory
//! - `PROFILES_CONFIGS_DIR` - Container configs directory

mod loader;
mod types;

pub use loader::{CONFIG_FILE, ConfigLoader, ConfigPaths, ConfigTier};
pub use types::*;
