use std::{fmt, io, path::PathBuf};

use thiserror::Error;
use vehpos_error::{ErrorExt, StatusCode};

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Поле записи дампа; используется в контексте ошибок.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Id,
    Label,
    Latitude,
    Longitude,
    RecordedAt,
}

#[derive(Error, Debug)]
pub enum DecodeError {
    /// Файл дампа не удалось открыть.
    #[error("Source unavailable: {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Поток закончился посреди записи.
    #[error(
        "Truncated record #{record_index} at offset {offset}: stream ended inside field `{field}`"
    )]
    TruncatedRecord {
        /// Порядковый номер записи (с нуля).
        record_index: u64,
        /// Смещение начала записи в байтах.
        offset: u64,
        field: RecordField,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl RecordField {
    pub fn name(self) -> &'static str {
        match self {
            RecordField::Id => "id",
            RecordField::Label => "label",
            RecordField::Latitude => "latitude",
            RecordField::Longitude => "longitude",
            RecordField::RecordedAt => "recorded_at",
        }
    }
}

impl DecodeError {
    pub fn is_truncated(&self) -> bool {
        matches!(self, DecodeError::TruncatedRecord { .. })
    }

    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, DecodeError::SourceUnavailable { .. })
    }
}

impl fmt::Display for RecordField {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ErrorExt for DecodeError {
    fn status_code(&self) -> StatusCode {
        match self {
            DecodeError::SourceUnavailable { .. } => StatusCode::SourceUnavailable,
            DecodeError::TruncatedRecord { .. } => StatusCode::TruncatedRecord,
            DecodeError::Io(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                StatusCode::PermissionDenied
            }
            DecodeError::Io(_) => StatusCode::Io,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use vehpos_error::StackError;

    use super::*;

    #[test]
    fn test_truncated_display_names_field_and_offset() {
        let err = DecodeError::TruncatedRecord {
            record_index: 2,
            offset: 57,
            field: RecordField::Longitude,
        };
        let msg = err.to_string();
        assert!(msg.contains("#2"));
        assert!(msg.contains("offset 57"));
        assert!(msg.contains("`longitude`"));
        assert!(err.is_truncated());
    }

    #[test]
    fn test_status_codes() {
        let unavailable = DecodeError::SourceUnavailable {
            path: PathBuf::from("missing.dat"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(unavailable.status_code(), StatusCode::SourceUnavailable);
        assert!(unavailable.is_source_unavailable());

        let io_err = DecodeError::Io(io::Error::other("boom"));
        assert_eq!(io_err.status_code(), StatusCode::Io);
    }

    /// Тест проверяет, что DecodeError поднимается в StackError с сохранением
    /// кода и остаётся доступной как источник.
    #[test]
    fn test_lift_into_stack_error() {
        let err = DecodeError::TruncatedRecord {
            record_index: 0,
            offset: 0,
            field: RecordField::Label,
        };
        let stack = StackError::from(err).context("Loading vehicle positions");
        assert_eq!(stack.status_code(), StatusCode::TruncatedRecord);
        let source = std::error::Error::source(&stack).and_then(|s| s.downcast_ref::<DecodeError>());
        assert!(source.is_some_and(DecodeError::is_truncated));
    }
}
