use std::{f64::consts::PI, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::Point;

/// Средний радиус Земли, км.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Единицы измерения расстояния для вывода результатов.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceUnit {
    #[serde(rename = "m")]
    Meters,
    #[default]
    #[serde(rename = "km")]
    Kilometers,
    #[serde(rename = "mi")]
    Miles,
    #[serde(rename = "nmi")]
    NauticalMiles,
}

impl DistanceUnit {
    /// Конвертирует километры в указанную единицу.
    pub fn convert_from_km(
        self,
        km: f64,
    ) -> f64 {
        match self {
            DistanceUnit::Meters => km * 1000.0,
            DistanceUnit::Kilometers => km,
            DistanceUnit::Miles => km / 1.609_344,
            DistanceUnit::NauticalMiles => km / 1.852,
        }
    }

    /// Название единицы.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceUnit::Meters => "m",
            DistanceUnit::Kilometers => "km",
            DistanceUnit::Miles => "mi",
            DistanceUnit::NauticalMiles => "nmi",
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "m" | "meters" => Ok(DistanceUnit::Meters),
            "km" | "kilometers" => Ok(DistanceUnit::Kilometers),
            "mi" | "miles" => Ok(DistanceUnit::Miles),
            "nmi" | "nautical-miles" => Ok(DistanceUnit::NauticalMiles),
            other => Err(format!("unknown distance unit: {other}")),
        }
    }
}

/// Расстояние по большому кругу (формула Гаверсина), км.
///
/// Координаты в градусах. Для конечных входных значений ошибок нет.
pub fn great_circle_distance(
    lat1: f64,
    lon1: f64,
    lat2: f64,
    lon2: f64,
) -> f64 {
    let to_rad = PI / 180.0;
    let dlat = (lat2 - lat1) * to_rad;
    let dlon = (lon2 - lon1) * to_rad;
    let lat1 = lat1 * to_rad;
    let lat2 = lat2 * to_rad;

    let a = (dlat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon * 0.5).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Евклидово расстояние между точками в «сырых» градусах.
///
/// Это метрика k-d дерева; для отчётов используется
/// [`great_circle_distance`].
#[inline]
pub fn euclidean_distance(
    a: Point,
    b: Point,
) -> f64 {
    let dlat = a[0] - b[0];
    let dlon = a[1] - b[1];
    (dlat * dlat + dlon * dlon).sqrt()
}
