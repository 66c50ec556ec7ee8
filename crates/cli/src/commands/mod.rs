pub mod chat;
pub mod doctor;
pub mod onboard;
pub mod serve;
pub mod status;

use finguru_config::AppConfig;

/// Load configuration, reporting failures as a domain configuration error.
fn load_config() -> finguru_core::Result<AppConfig> {
    AppConfig::load().map_err(|e| finguru_core::Error::Config {
        message: e.to_string(),
    })
}
