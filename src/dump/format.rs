/// Терминатор текстовой метки.
pub const LABEL_TERMINATOR: u8 = 0;

/// Размер фиксированного заголовка записи (`id`).
pub const HEADER_LEN: usize = 4;

/// Размер фиксированного хвоста записи (`latitude`, `longitude`,
/// `recorded_at`).
pub const TAIL_LEN: usize = 4 + 4 + 8;

/// Минимальный размер записи: пустая метка из одного терминатора.
pub const MIN_RECORD_LEN: usize = HEADER_LEN + 1 + TAIL_LEN;

/// Размер записи в байтах для метки длиной `label_len` символов.
#[inline]
pub const fn record_len(label_len: usize) -> usize {
    MIN_RECORD_LEN + label_len
}
