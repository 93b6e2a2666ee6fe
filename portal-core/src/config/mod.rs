use crate::error::AppError;
use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Environment variable selecting the optional per-environment overlay file.
pub const ENVIRONMENT_VAR: &str = "APP_ENVIRONMENT";

/// Load layered settings from `config_dir`.
///
/// Sources, lowest precedence first: `base.yaml`, `{APP_ENVIRONMENT}.yaml`,
/// then `APP_`-prefixed environment variables using `__` as the nesting
/// separator (e.g. `APP_API__BASE_URL`). Every file is optional so a
/// settings type with serde defaults can load from the environment alone.
pub fn load_settings<T: DeserializeOwned>(config_dir: &Path) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let mut builder = Config::builder()
        .add_source(File::from(config_dir.join("base.yaml")).required(false));

    if let Ok(environment) = std::env::var(ENVIRONMENT_VAR) {
        builder = builder.add_source(
            File::from(config_dir.join(format!("{}.yaml", environment.to_lowercase())))
                .required(false),
        );
    }

    let settings = builder
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
