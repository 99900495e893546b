//! Поиск ближайших транспортных средств для набора координат запроса.
//!
//! Связывает декодер дампа, k-d индекс и расстояние по большому кругу:
//! индекс выбирает кандидата по евклидовой метрике в градусах, а в отчёт
//! попадает расстояние Гаверсина в километрах.

use std::{fmt, path::Path, str::FromStr, time::Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vehpos_error::{ensure, ResultExt, StatusCode, VehposResult};

use crate::{
    dump::decode_records,
    geo::{great_circle_distance, is_closer, KdTree},
    PositionRecord, QueryCoordinate,
};

/// Десять координат запроса, с которыми работает утилита по умолчанию.
pub const DEFAULT_QUERIES: [QueryCoordinate; 10] = [
    QueryCoordinate::new(1, 34.544909, -102.100843),
    QueryCoordinate::new(2, 32.345544, -99.123124),
    QueryCoordinate::new(3, 33.234235, -100.214124),
    QueryCoordinate::new(4, 35.195739, -95.348899),
    QueryCoordinate::new(5, 31.895839, -97.789573),
    QueryCoordinate::new(6, 32.895839, -101.789573),
    QueryCoordinate::new(7, 34.115839, -100.225732),
    QueryCoordinate::new(8, 32.335839, -99.992232),
    QueryCoordinate::new(9, 33.535339, -94.792232),
    QueryCoordinate::new(10, 32.234235, -100.222222),
];

/// Способ построения индекса.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStrategy {
    /// Последовательная вставка в порядке файла.
    #[default]
    Sequential,
    /// Разбиение по медиане.
    Balanced,
}

/// Ответ на один запрос.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestMatch {
    pub query: QueryCoordinate,
    pub record: PositionRecord,
    /// Расстояние по большому кругу от точки запроса до записи, км.
    pub distance_km: f64,
}

/// Запрос, на который индекс и полный перебор по Гаверсину ответили по-разному.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Disagreement {
    pub query: QueryCoordinate,
    pub indexed: NearestMatch,
    pub brute_force: NearestMatch,
}

impl BuildStrategy {
    pub fn build(
        self,
        records: Vec<PositionRecord>,
    ) -> KdTree {
        match self {
            BuildStrategy::Sequential => KdTree::build(records),
            BuildStrategy::Balanced => KdTree::bulk_load(records),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStrategy::Sequential => "sequential",
            BuildStrategy::Balanced => "balanced",
        }
    }
}

impl fmt::Display for BuildStrategy {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(BuildStrategy::Sequential),
            "balanced" => Ok(BuildStrategy::Balanced),
            other => Err(format!("unknown build strategy: {other}")),
        }
    }
}

impl NearestMatch {
    /// Формирует ответ, вычисляя расстояние Гаверсина до записи.
    pub fn new(
        query: QueryCoordinate,
        record: PositionRecord,
    ) -> Self {
        let distance_km = great_circle_distance(
            query.latitude,
            query.longitude,
            f64::from(record.latitude),
            f64::from(record.longitude),
        );
        Self {
            query,
            record,
            distance_km,
        }
    }
}

/// Проверяет, что у всех запросов конечные координаты.
///
/// Записи дампа не проверяются, а запрос с NaN или бесконечностью не имеет
/// осмысленного ближайшего соседа.
pub fn check_queries(queries: &[QueryCoordinate]) -> VehposResult<()> {
    for query in queries {
        ensure!(
            query.latitude.is_finite() && query.longitude.is_finite(),
            StatusCode::InvalidArgs,
            "Query #{} has non-finite coordinates ({}, {})",
            query.sequence_number,
            query.latitude,
            query.longitude
        );
    }
    Ok(())
}

/// Отвечает на запросы через k-d индекс.
///
/// Возвращает по одному элементу на запрос в том же порядке. `None` означает,
/// что индекс пуст.
pub fn locate_with_index(
    index: &KdTree,
    queries: &[QueryCoordinate],
) -> Vec<Option<NearestMatch>> {
    queries
        .iter()
        .map(|query| {
            let found = index.nearest(query.point())?;
            debug!(
                query = query.sequence_number,
                id = found.record.id,
                visited = found.visited,
                "Index answered query"
            );
            Some(NearestMatch::new(*query, found.record.clone()))
        })
        .collect()
}

/// Полный перебор по расстоянию Гаверсина.
///
/// Результаты выровнены с `queries`, как у [`locate_with_index`]. При равных
/// расстояниях остаётся первая запись в порядке файла.
pub fn locate_brute_force(
    records: &[PositionRecord],
    queries: &[QueryCoordinate],
) -> Vec<Option<NearestMatch>> {
    queries
        .iter()
        .map(|query| {
            let mut best: Option<(&PositionRecord, f64)> = None;
            for record in records {
                let distance = great_circle_distance(
                    query.latitude,
                    query.longitude,
                    f64::from(record.latitude),
                    f64::from(record.longitude),
                );
                if is_closer(best.map(|(_, d)| d), distance) {
                    best = Some((record, distance));
                }
            }
            best.map(|(record, _)| NearestMatch::new(*query, record.clone()))
        })
        .collect()
}

/// Сравнивает ответы индекса и полного перебора по Гаверсину.
///
/// Расхождения возможны из-за разных метрик: индекс ищет в градусах без
/// учёта сходимости меридианов.
pub fn compare(
    records: &[PositionRecord],
    index: &KdTree,
    queries: &[QueryCoordinate],
) -> Vec<Disagreement> {
    let indexed = locate_with_index(index, queries);
    let brute_force = locate_brute_force(records, queries);

    let disagreements: Vec<Disagreement> = indexed
        .into_iter()
        .zip(brute_force)
        .filter_map(|pair| match pair {
            (Some(indexed), Some(brute_force)) if indexed.record != brute_force.record => {
                Some(Disagreement {
                    query: indexed.query,
                    indexed,
                    brute_force,
                })
            }
            _ => None,
        })
        .collect();

    if !disagreements.is_empty() {
        warn!(
            count = disagreements.len(),
            "Index and great-circle brute force disagree"
        );
    }
    disagreements
}

/// Читает дамп, строит индекс и отвечает на запросы.
pub fn locate(
    path: impl AsRef<Path>,
    queries: &[QueryCoordinate],
    strategy: BuildStrategy,
) -> VehposResult<Vec<Option<NearestMatch>>> {
    let path = path.as_ref();
    check_queries(queries)?;

    let started = Instant::now();
    let records = decode_records(path)
        .with_context(|| format!("Failed to read vehicle positions from {}", path.display()))?;
    let decoded_in = started.elapsed();

    let started = Instant::now();
    let index = strategy.build(records);
    let built_in = started.elapsed();

    let matches = locate_with_index(&index, queries);
    info!(
        records = index.len(),
        depth = index.depth(),
        strategy = %strategy,
        decode_ms = decoded_in.as_millis() as u64,
        build_ms = built_in.as_millis() as u64,
        answered = matches.iter().flatten().count(),
        "Located nearest vehicles"
    );
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(
        id: i32,
        lat: f32,
        lon: f32,
    ) -> PositionRecord {
        PositionRecord::new(id, format!("V{id}"), lat, lon, 0)
    }

    #[test]
    fn test_default_queries_are_numbered() {
        let seq: Vec<u32> = DEFAULT_QUERIES.iter().map(|q| q.sequence_number).collect();
        assert_eq!(seq, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_locate_with_empty_index_answers_none() {
        let index = KdTree::build(Vec::new());
        let indexed = locate_with_index(&index, &DEFAULT_QUERIES);
        assert_eq!(indexed.len(), DEFAULT_QUERIES.len());
        assert!(indexed.iter().all(Option::is_none));

        let brute = locate_brute_force(&[], &DEFAULT_QUERIES);
        assert_eq!(brute.len(), DEFAULT_QUERIES.len());
        assert!(brute.iter().all(Option::is_none));
    }

    #[test]
    fn test_match_reports_haversine() {
        let record = rec(1, 34.5, -102.0);
        let query = QueryCoordinate::new(1, 34.5, -102.0);
        let m = NearestMatch::new(query, record);
        assert_eq!(m.distance_km, 0.0);
    }

    #[test]
    fn test_brute_force_first_wins_on_tie() {
        let records = vec![rec(1, 0.0, 1.0), rec(2, 0.0, -1.0)];
        let q = [QueryCoordinate::new(1, 0.0, 0.0)];
        let found = locate_brute_force(&records, &q);
        assert_eq!(found[0].as_ref().map(|m| m.record.id), Some(1));
    }

    /// Тест проверяет, что запросы с одинаковым номером получают каждый свой
    /// ответ в порядке следования.
    #[test]
    fn test_duplicate_sequence_numbers_keep_own_answers() {
        let records = vec![rec(1, 0.0, 0.0), rec(2, 50.0, 50.0)];
        let queries = [QueryCoordinate::new(1, 0.0, 0.0), QueryCoordinate::new(1, 50.0, 50.0)];
        let index = KdTree::build(records.clone());

        for answers in [locate_with_index(&index, &queries), locate_brute_force(&records, &queries)] {
            let ids: Vec<Option<i32>> = answers.iter().map(|m| m.as_ref().map(|m| m.record.id)).collect();
            assert_eq!(ids, vec![Some(1), Some(2)]);
            assert_eq!(answers[1].as_ref().map(|m| m.query), Some(queries[1]));
        }
    }

    #[test]
    fn test_brute_force_skips_nan_record() {
        let records = vec![rec(1, f32::NAN, 0.0), rec(2, 10.0, 10.0)];
        let q = [QueryCoordinate::new(1, 10.0, 10.0)];
        let found = locate_brute_force(&records, &q);
        assert_eq!(found[0].as_ref().map(|m| m.record.id), Some(2));
    }

    /// Тест проверяет, что на высоких широтах евклидова метрика в градусах и
    /// расстояние по большому кругу могут выбрать разные записи.
    #[test]
    fn test_compare_reports_metric_mismatch() {
        // На широте 60° градус долготы вдвое короче градуса широты.
        let records = vec![rec(1, 60.9, 0.0), rec(2, 60.0, 1.0)];
        let q = [QueryCoordinate::new(1, 60.0, 0.0)];
        let index = KdTree::build(records.clone());

        let diffs = compare(&records, &index, &q);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].indexed.record.id, 1);
        assert_eq!(diffs[0].brute_force.record.id, 2);
    }

    #[test]
    fn test_build_strategy_parse() {
        assert_eq!("balanced".parse::<BuildStrategy>(), Ok(BuildStrategy::Balanced));
        assert_eq!("Sequential".parse::<BuildStrategy>(), Ok(BuildStrategy::Sequential));
        assert!("random".parse::<BuildStrategy>().is_err());
        assert_eq!(BuildStrategy::default().to_string(), "sequential");
    }

    #[test]
    fn test_check_queries_rejects_non_finite() {
        assert!(check_queries(&DEFAULT_QUERIES).is_ok());
        assert!(check_queries(&[]).is_ok());

        for (lat, lon) in [(f64::NAN, 0.0), (0.0, f64::INFINITY), (f64::NEG_INFINITY, 1.0)] {
            let queries = [DEFAULT_QUERIES[0], QueryCoordinate::new(11, lat, lon)];
            let err = check_queries(&queries).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::InvalidArgs);
            assert!(err.to_string().contains("#11"));
        }
    }

    /// Тест проверяет, что неверный запрос отклоняется до чтения файла.
    #[test]
    fn test_locate_rejects_nan_query_before_reading() {
        let queries = [QueryCoordinate::new(1, f64::NAN, 0.0)];
        let err = locate("/no/such/VehiclePositions.dat", &queries, BuildStrategy::Sequential)
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidArgs);
    }

    #[test]
    fn test_locate_missing_file() {
        let err = locate("/no/such/VehiclePositions.dat", &DEFAULT_QUERIES, BuildStrategy::Sequential)
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::SourceUnavailable);
        assert!(!err.contexts().is_empty());
    }
}
