//! Генерация синтетических наборов записей для тестов, бенчмарков и
//! команды `generate`.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::PositionRecord;

/// Область генерации по широте (градусы).
pub const LATITUDE_RANGE: (f32, f32) = (31.0, 36.0);
/// Область генерации по долготе (градусы).
pub const LONGITUDE_RANGE: (f32, f32) = (-103.0, -94.0);

const LABEL_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPRSTUVWXYZ0123456789";
const EPOCH_BASE: u64 = 1_600_000_000;

/// Генерирует `count` записей с последовательными id начиная с 1.
///
/// Одинаковый `seed` всегда даёт одинаковый набор.
pub fn generate_records(
    count: usize,
    seed: u64,
) -> Vec<PositionRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (1..=count)
        .map(|i| {
            let label_len = rng.gen_range(5..=8);
            let label: String = (0..label_len)
                .map(|_| char::from(LABEL_ALPHABET[rng.gen_range(0..LABEL_ALPHABET.len())]))
                .collect();
            PositionRecord {
                id: i32::try_from(i).unwrap_or(i32::MAX),
                label,
                latitude: rng.gen_range(LATITUDE_RANGE.0..LATITUDE_RANGE.1),
                longitude: rng.gen_range(LONGITUDE_RANGE.0..LONGITUDE_RANGE.1),
                recorded_at: EPOCH_BASE + rng.gen_range(0..31_536_000),
            }
        })
        .collect()
}
