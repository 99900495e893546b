use std::time::{Duration, Instant};

use tracing_appender::non_blocking::WorkerGuard;

/// Сколько может длиться сброс файлового буфера, прежде чем об этом
/// стоит предупредить.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle для управления lifecycle логирования.
///
/// Держит guard файлового writer'а: пока handle жив, фоновый поток пишет
/// логи на диск; при drop буфер сбрасывается.
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self { file_guard }
    }

    /// Явное завершение: сбрасывает файловый буфер и сообщает, если это
    /// заняло подозрительно долго.
    pub fn shutdown(mut self) {
        let Some(guard) = self.file_guard.take() else {
            return;
        };

        tracing::debug!("Flushing file logs");
        let start = Instant::now();
        drop(guard);
        let elapsed = start.elapsed();

        if elapsed > FLUSH_TIMEOUT {
            eprintln!(
                "WARNING: Logging shutdown took {}ms (timeout: {}ms)",
                elapsed.as_millis(),
                FLUSH_TIMEOUT.as_millis()
            );
        }
    }
}
