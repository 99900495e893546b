//! Инициализация `tracing`: фильтр уровней, консоль (stderr) и опциональный
//! файл с ежедневной ротацией.

pub mod config;
mod filters;
mod formatter;
pub mod handle;
pub mod sinks;

pub use config::{ConsoleConfig, FileConfig, LogFormat, LoggingConfig};
pub use handle::LoggingHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

pub type LoggingResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Инициализация логирования с конфигурацией.
///
/// Переопределения из окружения уже должны быть применены
/// ([`LoggingConfig::apply_env_overrides`]); `RUST_LOG`, если задан, заменяет
/// директиву фильтра целиком.
///
/// Повторный вызов в том же процессе вернёт ошибку: глобальный subscriber
/// устанавливается один раз.
pub fn init_logging(config: LoggingConfig) -> LoggingResult<LoggingHandle> {
    config.validate()?;
    config.ensure_log_dir()?;

    let env_filter = filters::build_filter_from_config(&config);
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if config.console.enabled {
        layers.push(sinks::console::layer_with_config(&config));
    }

    let file_guard = if config.file.enabled {
        let (file_layer, guard) = sinks::file::layer_with_config(&config);
        layers.push(file_layer);
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        format = %config.format,
        log_dir = %config.log_dir.display(),
        console_enabled = config.console.enabled,
        file_enabled = config.file.enabled,
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
