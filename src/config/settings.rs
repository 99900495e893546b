use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{geo::DistanceUnit, locator::BuildStrategy, logging::LoggingConfig};

/// Файл дампа по умолчанию.
pub const DEFAULT_DATA_PATH: &str = "VehiclePositions.dat";

/// Настройки утилиты.
///
/// Источники по возрастанию приоритета: значения по умолчанию, TOML-файл
/// (`--config` или `vehpos.toml` в текущем каталоге, если есть), переменные
/// окружения с префиксом `VEHPOS_`. Вложенные ключи в окружении разделяются
/// двойным подчёркиванием: `VEHPOS_LOGGING__LEVEL=debug`. Короткие
/// `VEHPOS_LOG_LEVEL`, `VEHPOS_LOG_FORMAT` и `VEHPOS_LOG_DIR` применяются
/// последними.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub data_path: PathBuf,
    pub build_strategy: BuildStrategy,
    pub unit: DistanceUnit,
    pub logging: LoggingConfig,
}

impl Settings {
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("data_path", DEFAULT_DATA_PATH)?
            .set_default("build_strategy", BuildStrategy::default().as_str())?
            .set_default("unit", DistanceUnit::default().name())?;

        builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("vehpos").required(false)),
        };

        let cfg = builder
            .add_source(
                Environment::with_prefix("VEHPOS")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut settings: Settings = cfg.try_deserialize()?;
        settings.logging.apply_env_overrides();
        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            build_strategy: BuildStrategy::default(),
            unit: DistanceUnit::default(),
            logging: LoggingConfig::default(),
        }
    }
}
