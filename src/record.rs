use crate::format;
use crate::parser::ParsedFile;
use tracing::warn;

/// Minimum columns a document header (BKPF-style) row must carry.
pub const HEADER_MIN_COLUMNS: usize = 13;
/// Minimum columns a line item (BSEG-style) row must carry.
pub const LINE_MIN_COLUMNS: usize = 14;
/// SAP document numbers are padded to this width before key comparison,
/// so `1234` and `0000001234` refer to the same document.
pub const DOCUMENT_NUMBER_WIDTH: usize = 10;

/// Debit marker in the D/H indicator column ("Soll").
pub const DEBIT_INDICATOR: &str = "S";
/// Credit marker in the D/H indicator column ("Haber").
pub const CREDIT_INDICATOR: &str = "H";

/// Join key for header and line records of the same document.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct MergeKey {
    pub business_unit: String,
    pub fiscal_year: String,
    pub document_number: String,
}

/// Left-pad a document number with zeros to [`DOCUMENT_NUMBER_WIDTH`].
pub fn pad_document_number(doc: &str) -> String {
    format!("{:0>width$}", doc.trim(), width = DOCUMENT_NUMBER_WIDTH)
}

/// One BKPF-style document header row, read by fixed column position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeaderRecord {
    pub business_unit: String,
    pub fiscal_year: String,
    pub document_number: String,
    pub posting_date: String,
    pub entry_date: String,
    pub time: String,
    pub user: String,
    pub header_text: String,
    pub currency: String,
    pub reversal_flag: String,
    pub transaction_code: String,
    pub reversal_reference: String,
    pub document_type: String,
    pub document_date: String,
    pub changed_at: String,
}

impl HeaderRecord {
    /// Read a header record off a positionally aligned row. Rows shorter
    /// than [`HEADER_MIN_COLUMNS`] are rejected; the two trailing columns
    /// are optional in the wild and default to blank.
    pub fn from_fields(fields: &[String]) -> Option<HeaderRecord> {
        if fields.len() < HEADER_MIN_COLUMNS {
            return None;
        }
        let at = |i: usize| fields.get(i).map(String::as_str).unwrap_or("").to_string();
        Some(HeaderRecord {
            business_unit: at(0),
            fiscal_year: at(1),
            document_number: at(2),
            posting_date: format::normalize_date(&at(3)),
            entry_date: format::normalize_date(&at(4)),
            time: at(5),
            user: at(6),
            header_text: at(7),
            currency: at(8),
            reversal_flag: at(9),
            transaction_code: at(10),
            reversal_reference: at(11),
            document_type: at(12),
            document_date: format::normalize_date(&at(13)),
            changed_at: at(14),
        })
    }

    pub fn merge_key(&self) -> MergeKey {
        MergeKey {
            business_unit: self.business_unit.clone(),
            fiscal_year: self.fiscal_year.clone(),
            document_number: pad_document_number(&self.document_number),
        }
    }
}

/// One BSEG-style line item row, read by fixed column position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineRecord {
    pub business_unit: String,
    pub fiscal_year: String,
    pub document_number: String,
    pub position: String,
    pub dc_indicator: String,
    pub local_amount: f64,
    pub amount: f64,
    pub ledger_account: String,
    pub line_text: String,
    pub clearing_document: String,
    pub clearing_date: String,
    pub clearing_number: String,
    pub vendor: String,
    pub type_code: String,
}

impl LineRecord {
    /// Read a line record off a positionally aligned row. Rows shorter than
    /// [`LINE_MIN_COLUMNS`] are rejected; an unparseable amount reads as
    /// zero here (the validation engine flags it separately).
    pub fn from_fields(fields: &[String]) -> Option<LineRecord> {
        if fields.len() < LINE_MIN_COLUMNS {
            return None;
        }
        let at = |i: usize| fields.get(i).map(String::as_str).unwrap_or("").to_string();
        Some(LineRecord {
            business_unit: at(0),
            fiscal_year: at(1),
            document_number: at(2),
            position: at(3),
            dc_indicator: at(4),
            local_amount: format::parse_amount(&at(5)).unwrap_or_default(),
            amount: format::parse_amount(&at(6)).unwrap_or_default(),
            ledger_account: at(7),
            line_text: at(8),
            clearing_document: at(9),
            clearing_date: format::normalize_date(&at(10)),
            clearing_number: at(11),
            vendor: at(12),
            type_code: at(13),
        })
    }

    pub fn merge_key(&self) -> MergeKey {
        MergeKey {
            business_unit: self.business_unit.clone(),
            fiscal_year: self.fiscal_year.clone(),
            document_number: pad_document_number(&self.document_number),
        }
    }

    pub fn is_debit(&self) -> bool {
        self.dc_indicator == DEBIT_INDICATOR
    }

    pub fn is_credit(&self) -> bool {
        self.dc_indicator == CREDIT_INDICATOR
    }
}

/// Extract header records from a parsed export, skipping short rows.
pub fn header_records(file: &ParsedFile) -> Vec<HeaderRecord> {
    typed_records(file, HeaderRecord::from_fields, "header")
}

/// Extract line records from a parsed export, skipping short rows.
pub fn line_records(file: &ParsedFile) -> Vec<LineRecord> {
    typed_records(file, LineRecord::from_fields, "line")
}

fn typed_records<R>(
    file: &ParsedFile,
    read: fn(&[String]) -> Option<R>,
    kind: &'static str,
) -> Vec<R> {
    let mut records = Vec::with_capacity(file.rows.len());
    for (n, row) in file.rows.iter().enumerate() {
        match read(row) {
            Some(record) => records.push(record),
            None => warn!(row = n, kind, "skipping row with too few columns for record"),
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_fields() -> Vec<String> {
        [
            "OIVE", "2024", "1234", "1", "S", "50,00", "50,00", "430000", "Venta", "", "",
            "", "", "",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }

    #[test]
    fn document_number_padding() {
        assert_eq!(pad_document_number("1234"), "0000001234");
        assert_eq!(pad_document_number("0000001234"), "0000001234");
        assert_eq!(pad_document_number(" 1234 "), "0000001234");
    }

    #[test]
    fn padded_keys_join() {
        let mut header_fields: Vec<String> = vec![String::new(); 15];
        header_fields[0] = "OIVE".to_string();
        header_fields[1] = "2024".to_string();
        header_fields[2] = "0000001234".to_string();
        let header = HeaderRecord::from_fields(&header_fields).unwrap();
        let line = LineRecord::from_fields(&line_fields()).unwrap();
        assert_eq!(header.merge_key(), line.merge_key());
    }

    #[test]
    fn line_record_amounts_and_indicator() {
        let line = LineRecord::from_fields(&line_fields()).unwrap();
        assert_eq!(line.local_amount, 50.0);
        assert!(line.is_debit());
        assert!(!line.is_credit());
    }

    #[test]
    fn header_record_normalizes_dates() {
        let mut fields: Vec<String> = vec![String::new(); 15];
        fields[3] = "31.12.2024".to_string();
        let header = HeaderRecord::from_fields(&fields).unwrap();
        assert_eq!(header.posting_date, "2024-12-31");
    }

    #[test]
    fn short_rows_are_rejected() {
        assert!(HeaderRecord::from_fields(&vec![String::new(); 12]).is_none());
        assert!(LineRecord::from_fields(&vec![String::new(); 13]).is_none());
    }
}
