//! Чтение и запись бинарных дампов положений транспортных средств.
//!
//! ## Формат
//!
//! Дамп — это просто последовательность записей без заголовка, счётчика и
//! разделителей; конец файла является единственным признаком завершения.
//! Все числа little-endian:
//!
//! | Поле          | Размер     | Тип                          |
//! |---------------|------------|------------------------------|
//! | `id`          | 4          | `i32`                        |
//! | `label`       | переменный | текст, завершается байтом 0  |
//! | `latitude`    | 4          | `f32`                        |
//! | `longitude`   | 4          | `f32`                        |
//! | `recorded_at` | 8          | `u64`                        |
//!
//! ## Использование
//!
//! ```no_run
//! use vehpos::dump::decode_records;
//!
//! let records = decode_records("VehiclePositions.dat")?;
//! println!("{} records", records.len());
//! # Ok::<(), vehpos::error::DecodeError>(())
//! ```
//!
//! Для больших файлов есть ленивый [`RecordReader`]:
//!
//! ```no_run
//! use vehpos::dump::open_records;
//!
//! for record in open_records("VehiclePositions.dat")? {
//!     let record = record?;
//!     println!("{} {}", record.id, record.label);
//! }
//! # Ok::<(), vehpos::error::DecodeError>(())
//! ```
//!
//! ## Модули
//!
//! - [`decode`] — десериализация записей из потока
//! - [`encode`] — сериализация записей в поток
//! - [`format`] — константы формата
//! - [`synthetic`] — генерация синтетических наборов

pub mod decode;
pub mod encode;
pub mod format;
pub mod synthetic;

// Публичный экспорт функций из вложенных модулей, чтобы упростить доступ к
// ним из внешнего кода.
pub use decode::*;
pub use encode::*;
pub use format::*;
pub use synthetic::generate_records;
