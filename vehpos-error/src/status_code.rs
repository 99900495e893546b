use std::fmt;

use num_enum::TryFromPrimitive;
#[cfg(feature = "serde_repr")]
use serde_repr::{Deserialize_repr, Serialize_repr};
#[cfg(feature = "strum")]
use strum_macros::{AsRefStr, EnumIter};

/// Коды статуса для категоризации ошибок.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки и ошибки вызова
/// - 5xxx: Источник данных (файл дампа)
/// - 6xxx: IO
/// - 8xxx: Кодирование и декодирование записей
///
/// `TryFrom<u32>` выводится через `num_enum`. С feature `strum` добавляются
/// `AsRefStr`/`EnumIter`, с `serde_repr` код сериализуется числом.
#[cfg_attr(feature = "strum", derive(AsRefStr, EnumIter))]
#[cfg_attr(feature = "serde_repr", derive(Serialize_repr, Deserialize_repr))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Internal = 1003,
    InvalidArgs = 1004,
    InvalidConfig = 1005,

    // === 5xxx: Источник данных ===
    SourceUnavailable = 5000,

    // === 6xxx: IO ===
    Io = 6000,
    PermissionDenied = 6001,

    // === 8xxx: Записи дампа ===
    TruncatedRecord = 8000,
    EncodingError = 8003,
}

/// Уровень, на котором CLI сообщает об ошибке в лог.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Рекомендуемый уровень логирования для данного кода.
    ///
    /// Ошибки вызова и настроек не повод для `error`: их исправляет
    /// пользователь.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Debug,
            Self::InvalidArgs | Self::InvalidConfig => LogLevel::Info,
            Self::Io | Self::PermissionDenied => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    /// Код завершения процесса для CLI.
    ///
    /// Повторяет соглашения `sysexits.h`: 64 — неверный вызов, 65 — ошибка
    /// данных, 66 — нет входа, 74 — ошибка IO, 78 — ошибка конфигурации.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InvalidArgs => 64,
            Self::TruncatedRecord | Self::EncodingError => 65,
            Self::SourceUnavailable => 66,
            Self::Io | Self::PermissionDenied => 74,
            Self::InvalidConfig => 78,
            _ => 1,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        // Если включён feature "strum", используем human-readable имя (AsRefStr).
        // Иначе — Debug-имя.
        #[cfg(feature = "strum")]
        {
            write!(f, "{} ({})", self.as_ref(), self.code())
        }
        #[cfg(not(feature = "strum"))]
        {
            write!(f, "{:?} ({})", self, self.code())
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
