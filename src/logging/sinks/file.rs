use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{layer::Layer as LayerTrait, registry::LookupSpan};

use crate::logging::{config::LoggingConfig, formatter};

/// File layer: ежедневная ротация в `log_dir`, неблокирующая запись.
///
/// Guard нужно держать до завершения программы, иначе хвост логов
/// потеряется.
pub fn layer_with_config<S>(
    config: &LoggingConfig
) -> (Box<dyn LayerTrait<S> + Send + Sync>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let appender = rolling::daily(&config.log_dir, &config.file.filename_prefix);
    let (writer, guard) = non_blocking(appender);
    let layer = formatter::build_formatter(config.format, &config.console, false, writer);
    (layer, guard)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tracing_subscriber::{prelude::*, registry::Registry};

    use super::*;

    #[test]
    fn test_file_layer_writes_into_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = LoggingConfig {
            log_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        cfg.file.enabled = true;

        let (layer, guard) = layer_with_config(&cfg);
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("written to file");
        });
        drop(guard);

        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let path = files[0].as_ref().unwrap().path();
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.contains("written to file"));
    }
}
