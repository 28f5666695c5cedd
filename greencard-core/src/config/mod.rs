//! App configuration: wire model, on-device cache, status and refresh.

mod cache;
mod model;
mod paths;
mod refresh;
mod status;

pub use cache::CachedAppConfig;
pub use model::{AppConfig, ClKey, CodeName, PublicKeySet};
pub(crate) use model::resolve;
pub use paths::ConfigPaths;
pub use refresh::ConfigRefresher;
pub use status::{app_status, AppStatus, ConfigResult};
