pub mod config;
pub mod events;

pub use config::ConfigCommand;
pub use events::EventsCommand;

use std::sync::Arc;

use greencard_core::config::ConfigPaths;
use greencard_core::CachedAppConfig;

use crate::DataDir;

#[must_use]
pub fn cached_config(data_dir: &DataDir) -> Arc<CachedAppConfig> {
    Arc::new(CachedAppConfig::new(ConfigPaths::new(
        data_dir.files_dir(),
        data_dir.cache_dir(),
    )))
}
