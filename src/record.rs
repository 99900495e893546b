//! Типы данных: запись о положении транспортного средства и точка запроса.

use serde::{Deserialize, Serialize};

use crate::geo::Point;

/// Запись о положении транспортного средства, прочитанная из дампа.
///
/// Координаты хранятся в том виде, в каком они лежат в файле (`f32`, градусы),
/// без нормализации и проверки диапазонов.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Идентификатор ТС. Уникальность внутри файла не проверяется.
    pub id: i32,
    /// Регистрационный номер (метка). Может быть пустым.
    pub label: String,
    pub latitude: f32,
    pub longitude: f32,
    /// Время фиксации. Интерпретация (Unix epoch и т.п.) не навязывается.
    pub recorded_at: u64,
}

/// Координата запроса с порядковым номером для сопоставления ответа.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryCoordinate {
    pub sequence_number: u32,
    pub latitude: f64,
    pub longitude: f64,
}

impl PositionRecord {
    pub fn new(
        id: i32,
        label: impl Into<String>,
        latitude: f32,
        longitude: f32,
        recorded_at: u64,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            latitude,
            longitude,
            recorded_at,
        }
    }

    /// Точка для k-d дерева: `[latitude, longitude]`, расширенные до `f64`.
    #[inline]
    pub fn point(&self) -> Point {
        [f64::from(self.latitude), f64::from(self.longitude)]
    }
}

impl QueryCoordinate {
    pub const fn new(
        sequence_number: u32,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            sequence_number,
            latitude,
            longitude,
        }
    }

    #[inline]
    pub fn point(&self) -> Point {
        [self.latitude, self.longitude]
    }
}
