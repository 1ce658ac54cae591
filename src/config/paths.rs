//! Where the reader keeps its settings and its offline scripture.
//!
//! ```text
//! <config>/achik-bible/settings.toml          AppConfig (no env-supplied key)
//! <local data>/achik-bible/cache/
//!     chapters/<BOOK>-<n>.json                one validated chapter each
//!     daily/<YYYY-MM-DD>.json                 verse of the day per date
//! ```
//!
//! `<config>` and `<local data>` come from [`dirs::config_dir`] and
//! [`dirs::data_local_dir`].  The cache root can be moved with
//! `storage.cache_dir` in the settings file; the subdirectories are created
//! by the content store.

use std::path::PathBuf;

const APP_DIR: &str = "achik-bible";
const SETTINGS_FILE: &str = "settings.toml";
const CACHE_DIR: &str = "cache";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    /// `settings.toml` inside `config_dir`.
    pub settings_file: PathBuf,
    /// Default root of the chapter and daily-verse store.
    pub cache_dir: PathBuf,
}

impl AppPaths {
    /// Resolve against the platform directories, or the working directory
    /// where the platform has none.
    pub fn new() -> Self {
        let under = |base: Option<PathBuf>| base.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR);

        let config_dir = under(dirs::config_dir());
        Self {
            settings_file: config_dir.join(SETTINGS_FILE),
            config_dir,
            cache_dir: under(dirs::data_local_dir()).join(CACHE_DIR),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
