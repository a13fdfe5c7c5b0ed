use datacheck_config::load::{LoadConfigError, load_config};
use datacheck_config::shared::RunnerConfig;

/// Loads the runner configuration from the `configuration/` directory and
/// `APP_`-prefixed environment overrides.
pub fn load_runner_config() -> Result<RunnerConfig, LoadConfigError> {
    load_config::<RunnerConfig>()
}
