//! Сериализация записей [`PositionRecord`] в бинарный формат дампа.
//!
//! Используется генератором синтетических наборов и тестами. Метка пишется
//! по одному байту на символ, поэтому допустимы только символы Latin-1 без
//! нулевого байта.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::debug;

use super::{record_len, LABEL_TERMINATOR};
use crate::{error::EncodeError, PositionRecord};

/// Кодирует метку в байты Latin-1 (без терминатора).
pub fn encode_label(
    id: i32,
    label: &str,
) -> Result<Vec<u8>, EncodeError> {
    label
        .chars()
        .map(|ch| match u8::try_from(u32::from(ch)) {
            Ok(0) => Err(EncodeError::EmbeddedNul { id }),
            Ok(b) => Ok(b),
            Err(_) => Err(EncodeError::UnencodableLabel { id, ch }),
        })
        .collect()
}

/// Записывает одну запись в поток.
///
/// Метка проверяется до записи первого байта, так что при ошибке
/// кодирования поток не получает частичную запись.
pub fn write_record<W: Write>(
    w: &mut W,
    record: &PositionRecord,
) -> Result<(), EncodeError> {
    let label = encode_label(record.id, &record.label)?;

    w.write_i32::<LittleEndian>(record.id)?;
    w.write_all(&label)?;
    w.write_u8(LABEL_TERMINATOR)?;
    w.write_f32::<LittleEndian>(record.latitude)?;
    w.write_f32::<LittleEndian>(record.longitude)?;
    w.write_u64::<LittleEndian>(record.recorded_at)?;
    Ok(())
}

/// Записывает последовательность записей, возвращает число записанных байт.
pub fn write_records<'a, W, I>(
    w: &mut W,
    records: I,
) -> Result<usize, EncodeError>
where
    W: Write,
    I: IntoIterator<Item = &'a PositionRecord>,
{
    let mut written = 0;
    for record in records {
        write_record(w, record)?;
        written += record_len(record.label.chars().count());
    }
    Ok(written)
}

/// Сериализует записи в буфер в памяти.
pub fn encode_records(records: &[PositionRecord]) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    write_records(&mut buf, records)?;
    Ok(buf)
}

/// Создаёт (или перезаписывает) файл дампа.
pub fn write_dump(
    path: impl AsRef<Path>,
    records: &[PositionRecord],
) -> Result<usize, EncodeError> {
    let path = path.as_ref();
    let mut w = BufWriter::new(File::create(path)?);
    let written = write_records(&mut w, records)?;
    w.flush()?;
    debug!(
        path = %path.display(),
        records = records.len(),
        bytes = written,
        "Wrote vehicle position dump"
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_single_record_layout() {
        let rec = PositionRecord::new(7, "ABC", 10.0, 20.0, 100);
        let buf = encode_records(&[rec]).unwrap();

        let mut expected: Vec<u8> = Vec::new();
        expected.extend(&7i32.to_le_bytes());
        expected.extend(b"ABC\0");
        expected.extend(&10.0f32.to_le_bytes());
        expected.extend(&20.0f32.to_le_bytes());
        expected.extend(&100u64.to_le_bytes());

        assert_eq!(buf, expected);
        assert_eq!(buf.len(), record_len(3));
    }

    #[test]
    fn test_encode_latin1_label() {
        let bytes = encode_label(1, "Ñ-1").unwrap();
        assert_eq!(bytes, vec![0xD1, b'-', b'1']);
    }

    #[test]
    fn test_reject_non_latin1_label() {
        let err = encode_label(3, "Ж").unwrap_err();
        assert!(matches!(err, EncodeError::UnencodableLabel { id: 3, ch: 'Ж' }));
    }

    #[test]
    fn test_reject_embedded_nul() {
        let rec = PositionRecord::new(4, "A\0B", 0.0, 0.0, 0);
        let mut buf = Vec::new();
        let err = write_record(&mut buf, &rec).unwrap_err();

        assert!(matches!(err, EncodeError::EmbeddedNul { id: 4 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_write_records_counts_bytes() {
        let records = vec![
            PositionRecord::new(1, "", 0.0, 0.0, 0),
            PositionRecord::new(2, "XY", 0.0, 0.0, 0),
        ];
        let mut buf = Vec::new();
        let written = write_records(&mut buf, &records).unwrap();

        assert_eq!(written, buf.len());
        assert_eq!(written, 21 + 23);
    }
}
