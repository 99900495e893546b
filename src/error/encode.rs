use std::io;

use thiserror::Error;
use vehpos_error::{ErrorExt, StatusCode};

/// Ошибки записи дампа.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Символ метки не представим одним байтом.
    #[error("Label of record {id} contains non-Latin-1 character {ch:?}")]
    UnencodableLabel { id: i32, ch: char },

    /// Нулевой байт внутри метки сломал бы разбиение на записи.
    #[error("Label of record {id} contains an embedded NUL byte")]
    EmbeddedNul { id: i32 },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ErrorExt for EncodeError {
    fn status_code(&self) -> StatusCode {
        match self {
            EncodeError::UnencodableLabel { .. } | EncodeError::EmbeddedNul { .. } => {
                StatusCode::EncodingError
            }
            EncodeError::Io(_) => StatusCode::Io,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
