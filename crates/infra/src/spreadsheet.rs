//! Spreadsheet codec.
//!
//! A workbook is a single CSV sheet whose first row holds the column headers.
//! Rows are (de)serialized with serde, so the header names come from the row
//! type's field renames.

use csv::{ByteRecord, StringRecord};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use jurnal_accounting::ImportRow;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("spreadsheet could not be read: {0}")]
    Read(String),

    #[error("spreadsheet could not be written: {0}")]
    Write(String),
}

/// Why a single data row could not be read. The rest of the sheet is
/// unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowReadError {
    #[error("row is not valid UTF-8")]
    Encoding,

    #[error("row could not be read: {0}")]
    Malformed(String),
}

/// Parse workbook bytes into rows, one result per data row in sheet order.
///
/// Only the header row has to be readable; a row that fails to decode is
/// returned as its own error. Cells are passed through untrimmed; the caller
/// decides what blank means.
pub fn parse_workbook<R: DeserializeOwned>(
    bytes: &[u8],
) -> Result<Vec<Result<R, RowReadError>>, SpreadsheetError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| SpreadsheetError::Read(e.to_string()))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record.map_err(|e| SpreadsheetError::Read(e.to_string()))?;
        rows.push(decode_row(record, &headers));
    }
    Ok(rows)
}

fn decode_row<R: DeserializeOwned>(record: ByteRecord, headers: &StringRecord) -> Result<R, RowReadError> {
    let record = StringRecord::from_byte_record(record).map_err(|_| RowReadError::Encoding)?;
    record
        .deserialize(Some(headers))
        .map_err(|e| RowReadError::Malformed(e.to_string()))
}

/// Write rows as a workbook with a header row.
pub fn build_workbook<R: Serialize>(rows: &[R]) -> Result<Vec<u8>, SpreadsheetError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| SpreadsheetError::Write(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| SpreadsheetError::Write(e.to_string()))
}

/// The downloadable import template: header plus one example row.
pub fn template() -> Result<Vec<u8>, SpreadsheetError> {
    build_workbook(&[ImportRow::template_example()])
}

/// Read just the header row.
pub fn headers(bytes: &[u8]) -> Result<Vec<String>, SpreadsheetError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| SpreadsheetError::Read(e.to_string()))?;
    Ok(headers.iter().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(bytes: &[u8]) -> Vec<ImportRow> {
        parse_workbook::<ImportRow>(bytes)
            .unwrap()
            .into_iter()
            .map(Result::unwrap)
            .collect()
    }

    #[test]
    fn template_round_trips_through_the_codec() {
        let bytes = template().unwrap();

        assert_eq!(
            headers(&bytes).unwrap(),
            vec!["Tanggal", "Deskripsi", "Akun Debit", "Akun Kredit", "Jumlah"]
        );
        let rows = parse_workbook::<ImportRow>(&bytes).unwrap();
        assert_eq!(rows, vec![Ok(ImportRow::template_example())]);
    }

    #[test]
    fn blank_cells_and_missing_columns_become_none() {
        let sheet = "Tanggal,Deskripsi,Akun Debit,Akun Kredit,Jumlah\n2025-01-01,,Kas,,\n";
        let rows = read_all(sheet.as_bytes());

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date.as_deref(), Some("2025-01-01"));
        assert_eq!(rows[0].debit_account.as_deref(), Some("Kas"));
        // Empty CSV fields deserialize as None for Option<String>.
        assert_eq!(rows[0].description, None);
        assert_eq!(rows[0].amount, None);
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"Tanggal,Deskripsi,Akun Debit,Akun Kredit,Jumlah\n2025-01-01,Gaji,Beban Gaji,Kas,8000000\n");

        let rows = read_all(&bytes);
        assert_eq!(rows[0].amount.as_deref(), Some("8000000"));
    }

    #[test]
    fn header_only_sheet_has_no_rows() {
        let rows = read_all(b"Tanggal,Deskripsi,Akun Debit,Akun Kredit,Jumlah\n");
        assert!(rows.is_empty());
    }

    #[test]
    fn undecodable_row_does_not_hide_its_neighbours() {
        let mut sheet = b"Tanggal,Deskripsi,Akun Debit,Akun Kredit,Jumlah\n".to_vec();
        sheet.extend_from_slice(b"2025-01-01,Gaji,Beban Gaji,Kas,100\n");
        // Latin-1 "Caf\xe9", as spreadsheet exports often write it.
        sheet.extend_from_slice(b"2025-01-02,Caf\xe9,Beban Konsumsi,Kas,50\n");
        sheet.extend_from_slice(b"2025-01-03,Listrik,Beban Listrik,Kas,75\n");

        let rows = parse_workbook::<ImportRow>(&sheet).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].as_ref().unwrap().description.as_deref(), Some("Gaji"));
        assert_eq!(rows[1], Err(RowReadError::Encoding));
        assert_eq!(rows[2].as_ref().unwrap().amount.as_deref(), Some("75"));
    }

    #[test]
    fn unreadable_header_fails_the_sheet() {
        let err = parse_workbook::<ImportRow>(b"Tanggal,Deskrip\xffsi\n2025-01-01,Gaji\n").unwrap_err();
        assert!(matches!(err, SpreadsheetError::Read(_)));
    }
}
