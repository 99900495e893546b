//! Десериализация записей [`PositionRecord`] из бинарного потока.
//!
//! Каждая итерация потребляет ровно одну запись. Конец потока допустим только
//! на границе записей; обрыв внутри записи даёт
//! [`DecodeError::TruncatedRecord`], и частичная запись наружу не отдаётся.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Read},
    iter::FusedIterator,
    path::Path,
};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::debug;

use super::{HEADER_LEN, LABEL_TERMINATOR, TAIL_LEN};
use crate::{
    error::{DecodeError, DecodeResult, RecordField},
    PositionRecord,
};

/// Итератор по записям дампа.
///
/// Читает из `inner` по одной записи, пока поток не закончится. После первой
/// ошибки итератор больше ничего не возвращает.
pub struct RecordReader<R: BufRead> {
    inner: R,
    offset: u64,
    index: u64,
    done: bool,
}

impl<R: BufRead> RecordReader<R> {
    /// Создаёт reader поверх буферизованного источника.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            index: 0,
            done: false,
        }
    }

    /// Количество успешно прочитанных записей.
    pub fn records_read(&self) -> u64 {
        self.index
    }

    /// Смещение (в байтах) начала следующей записи.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn at_end(&mut self) -> io::Result<bool> {
        Ok(self.inner.fill_buf()?.is_empty())
    }

    /// Читает одну запись целиком.
    fn read_record(&mut self) -> DecodeResult<PositionRecord> {
        let (index, start) = (self.index, self.offset);
        let r = &mut self.inner;

        let id = r
            .read_i32::<LittleEndian>()
            .map_err(truncated(index, start, RecordField::Id))?;
        let (label, label_len) =
            read_label(r).map_err(truncated(index, start, RecordField::Label))?;
        let latitude = r
            .read_f32::<LittleEndian>()
            .map_err(truncated(index, start, RecordField::Latitude))?;
        let longitude = r
            .read_f32::<LittleEndian>()
            .map_err(truncated(index, start, RecordField::Longitude))?;
        let recorded_at = r
            .read_u64::<LittleEndian>()
            .map_err(truncated(index, start, RecordField::RecordedAt))?;

        self.offset += (HEADER_LEN + label_len + TAIL_LEN) as u64;
        self.index += 1;

        Ok(PositionRecord {
            id,
            label,
            latitude,
            longitude,
            recorded_at,
        })
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = DecodeResult<PositionRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        // Конец потока на границе записи — штатное завершение.
        match self.at_end() {
            Ok(true) => {
                self.done = true;
                return None;
            }
            Ok(false) => {}
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        }

        let result = self.read_record();
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

impl<R: BufRead> FusedIterator for RecordReader<R> {}

/// Маппинг ошибки чтения поля: `UnexpectedEof` превращается в
/// [`DecodeError::TruncatedRecord`], остальное остаётся IO-ошибкой.
fn truncated(
    record_index: u64,
    offset: u64,
    field: RecordField,
) -> impl Fn(io::Error) -> DecodeError {
    move |e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::TruncatedRecord {
                record_index,
                offset,
                field,
            }
        } else {
            DecodeError::Io(e)
        }
    }
}

/// Читает метку до нулевого байта включительно.
///
/// Возвращает строку (без терминатора) и количество потреблённых байт.
/// Каждый байт — один символ (Latin-1).
pub fn read_label<R: BufRead>(r: &mut R) -> io::Result<(String, usize)> {
    let mut buf = Vec::new();
    let consumed = r.read_until(LABEL_TERMINATOR, &mut buf)?;
    if buf.pop() != Some(LABEL_TERMINATOR) {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "label is not NUL-terminated",
        ));
    }
    Ok((buf.into_iter().map(char::from).collect(), consumed))
}

/// Читает все записи из произвольного источника.
pub fn read_records<R: Read>(r: R) -> DecodeResult<Vec<PositionRecord>> {
    RecordReader::new(BufReader::new(r)).collect()
}

/// Открывает файл дампа для ленивого чтения.
pub fn open_records(path: impl AsRef<Path>) -> DecodeResult<RecordReader<BufReader<File>>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DecodeError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(RecordReader::new(BufReader::new(file)))
}

/// Читает все записи из файла дампа.
///
/// Файл закрывается при выходе из функции как при успехе, так и при ошибке.
pub fn decode_records(path: impl AsRef<Path>) -> DecodeResult<Vec<PositionRecord>> {
    let path = path.as_ref();
    let records = open_records(path)?.collect::<DecodeResult<Vec<_>>>()?;
    debug!(
        path = %path.display(),
        records = records.len(),
        "Decoded vehicle positions"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn raw_record(
        id: i32,
        label: &[u8],
        lat: f32,
        lon: f32,
        ts: u64,
    ) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend(&id.to_le_bytes());
        data.extend(label);
        data.push(0);
        data.extend(&lat.to_le_bytes());
        data.extend(&lon.to_le_bytes());
        data.extend(&ts.to_le_bytes());
        data
    }

    #[test]
    fn test_read_single_record() {
        let data = raw_record(7, b"ABC", 10.0, 20.0, 100);
        let records = read_records(Cursor::new(data)).unwrap();

        assert_eq!(records, vec![PositionRecord::new(7, "ABC", 10.0, 20.0, 100)]);
    }

    #[test]
    fn test_read_empty_input() {
        let records = read_records(Cursor::new(Vec::new())).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_read_empty_label() {
        let data = raw_record(-1, b"", -33.5, 151.25, u64::MAX);
        let records = read_records(Cursor::new(data)).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, -1);
        assert_eq!(records[0].label, "");
        assert_eq!(records[0].recorded_at, u64::MAX);
    }

    /// Тест проверяет, что байты метки выше 0x7F читаются как Latin-1, а не
    /// как UTF-8.
    #[test]
    fn test_label_is_latin1() {
        let data = raw_record(1, &[0x41, 0xC9, 0xFF], 0.0, 0.0, 0);
        let records = read_records(Cursor::new(data)).unwrap();
        assert_eq!(records[0].label, "A\u{C9}\u{FF}");
    }

    #[test]
    fn test_records_in_file_order() {
        let mut data = raw_record(3, b"C", 3.0, 3.0, 3);
        data.extend(raw_record(1, b"A", 1.0, 1.0, 1));
        data.extend(raw_record(2, b"B", 2.0, 2.0, 2));

        let ids: Vec<i32> = read_records(Cursor::new(data))
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_duplicate_ids_are_kept() {
        let mut data = raw_record(5, b"X", 1.0, 1.0, 1);
        data.extend(raw_record(5, b"X", 1.0, 1.0, 1));
        assert_eq!(read_records(Cursor::new(data)).unwrap().len(), 2);
    }

    #[test]
    fn test_truncated_in_id() {
        let data = vec![1u8, 0];
        let err = read_records(Cursor::new(data)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TruncatedRecord {
                field: RecordField::Id,
                record_index: 0,
                offset: 0,
            }
        ));
    }

    #[test]
    fn test_missing_label_terminator() {
        let mut data = Vec::new();
        data.extend(&9i32.to_le_bytes());
        data.extend(b"NO-TERMINATOR");
        let err = read_records(Cursor::new(data)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TruncatedRecord {
                field: RecordField::Label,
                ..
            }
        ));
    }

    /// Тест проверяет, что обрыв во второй записи сообщает её индекс и
    /// смещение начала.
    #[test]
    fn test_truncated_second_record_reports_offset() {
        let first = raw_record(1, b"AB", 1.0, 2.0, 3);
        let first_len = first.len() as u64;
        let mut data = first;
        let second = raw_record(2, b"CD", 1.0, 2.0, 3);
        data.extend(&second[..second.len() - 3]);

        let err = read_records(Cursor::new(data)).unwrap_err();
        match err {
            DecodeError::TruncatedRecord {
                record_index,
                offset,
                field,
            } => {
                assert_eq!(record_index, 1);
                assert_eq!(offset, first_len);
                assert_eq!(field, RecordField::RecordedAt);
            }
            other => panic!("Expected TruncatedRecord, got {other:?}"),
        }
    }

    /// Тест проверяет, что после ошибки ленивый reader больше ничего не
    /// возвращает, а валидные записи до обрыва успевают выйти.
    #[test]
    fn test_reader_fuses_after_error() {
        let mut data = raw_record(1, b"A", 1.0, 1.0, 1);
        data.extend(&[0xAA, 0xBB]);

        let mut reader = RecordReader::new(Cursor::new(data));
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
        assert!(reader.next().is_none());
        assert_eq!(reader.records_read(), 1);
    }

    #[test]
    fn test_reader_tracks_offset() {
        let mut data = raw_record(1, b"ABC", 1.0, 1.0, 1);
        data.extend(raw_record(2, b"", 1.0, 1.0, 1));
        let total = data.len() as u64;

        let mut reader = RecordReader::new(Cursor::new(data));
        reader.next().unwrap().unwrap();
        assert_eq!(reader.offset(), 24);
        reader.next().unwrap().unwrap();
        assert_eq!(reader.offset(), total);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_read_label_consumed_bytes() {
        let mut cursor = Cursor::new(b"XYZ\0rest".to_vec());
        let (label, consumed) = read_label(&mut cursor).unwrap();
        assert_eq!(label, "XYZ");
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_decode_missing_file() {
        let err = decode_records("/definitely/not/here/VehiclePositions.dat").unwrap_err();
        assert!(err.is_source_unavailable());
    }
}
