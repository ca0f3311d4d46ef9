use crate::error::MergeError;
use crate::record::{pad_document_number, HeaderRecord, LineRecord, MergeKey};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

/// Sentinel account used when a journal must be produced from header
/// records alone. That path loses accounting meaning and exists only so a
/// partial upload does not hard-fail.
pub const PLACEHOLDER_ACCOUNT: &str = "999999";

/// Currency assumed when the document header does not carry one.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Which of the two complementary SAP exports a file is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    /// Document headers (BKPF-style).
    Header,
    /// Document line items (BSEG-style).
    Line,
}

/// Classify an uploaded file as header- or line-kind. Filename keywords
/// first, then content phrase fragments; line-kind wins when nothing is
/// conclusive since line-item files are the more common upload.
pub fn classify(file_name: &str, content: &str) -> FileKind {
    let name = file_name.to_uppercase();
    if name.contains("BKPF") {
        return FileKind::Header;
    }
    if name.contains("BSEG") {
        return FileKind::Line;
    }

    // only the start of the file is probed
    let probe = content.get(..2000).unwrap_or(content);
    if ["Texto cab.documento", "Fe.contab.", "Nombre del usuario"]
        .iter()
        .any(|phrase| probe.contains(phrase))
    {
        debug!(file = file_name, "classified as header by content");
        return FileKind::Header;
    }
    if ["D/H|", "Pos|", "Importe ML"]
        .iter()
        .any(|marker| probe.contains(marker))
    {
        debug!(file = file_name, "classified as line by content");
        return FileKind::Line;
    }

    FileKind::Line
}

/// One row of the unified journal, derived from a line record joined with
/// its document header (or defaults when the header is absent).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JournalEntry {
    pub fecha: String,
    pub asiento: String,
    pub cuenta: String,
    pub subcuenta: String,
    pub descripcion: String,
    pub debe: f64,
    pub haber: f64,
    pub documento: String,
    pub referencia: String,
    pub moneda: String,
    pub usuario: String,
    pub fecha_documento: String,
    pub clase_documento: String,
}

/// Join line records onto header records and derive the journal.
///
/// Lines only: entries come from the lines alone, header-derived fields
/// blank. Headers only: degenerate entries with the placeholder account
/// and zero amounts. Neither: [`MergeError::NoRecords`]. Output order
/// follows line input order; the join is a lookup, not a reordering.
pub fn merge(
    headers: &[HeaderRecord],
    lines: &[LineRecord],
) -> Result<Vec<JournalEntry>, MergeError> {
    match (headers.is_empty(), lines.is_empty()) {
        (true, true) => Err(MergeError::NoRecords),
        (true, false) => Ok(lines.iter().map(entry_from_line_only).collect()),
        (false, true) => Ok(headers.iter().map(entry_from_header_only).collect()),
        (false, false) => {
            let by_key: IndexMap<MergeKey, &HeaderRecord> = headers
                .iter()
                .map(|h| (h.merge_key(), h))
                .collect();
            Ok(lines
                .iter()
                .map(|line| entry_from_join(line, by_key.get(&line.merge_key()).copied()))
                .collect())
        }
    }
}

fn debit_credit(line: &LineRecord) -> (f64, f64) {
    let debit = if line.is_debit() { line.local_amount } else { 0.0 };
    let credit = if line.is_credit() { line.local_amount } else { 0.0 };
    (debit, credit)
}

fn entry_from_join(line: &LineRecord, header: Option<&HeaderRecord>) -> JournalEntry {
    let (debe, haber) = debit_credit(line);
    let descripcion = if line.line_text.is_empty() {
        header.map(|h| h.header_text.clone()).unwrap_or_default()
    } else {
        line.line_text.clone()
    };
    let moneda = header
        .map(|h| h.currency.clone())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    JournalEntry {
        fecha: header.map(|h| h.posting_date.clone()).unwrap_or_default(),
        asiento: pad_document_number(&line.document_number),
        cuenta: line.ledger_account.clone(),
        subcuenta: line.ledger_account.clone(),
        descripcion,
        debe,
        haber,
        documento: pad_document_number(&line.document_number),
        referencia: format!(
            "{}-{}-{}",
            line.business_unit, line.fiscal_year, line.position
        ),
        moneda,
        usuario: header.map(|h| h.user.clone()).unwrap_or_default(),
        fecha_documento: header.map(|h| h.document_date.clone()).unwrap_or_default(),
        clase_documento: header.map(|h| h.document_type.clone()).unwrap_or_default(),
    }
}

fn entry_from_line_only(line: &LineRecord) -> JournalEntry {
    let (debe, haber) = debit_credit(line);
    JournalEntry {
        fecha: line.clearing_date.clone(),
        asiento: pad_document_number(&line.document_number),
        cuenta: line.ledger_account.clone(),
        subcuenta: line.ledger_account.clone(),
        descripcion: line.line_text.clone(),
        debe,
        haber,
        documento: pad_document_number(&line.document_number),
        referencia: format!(
            "{}-{}-{}",
            line.business_unit, line.fiscal_year, line.position
        ),
        moneda: String::new(),
        usuario: String::new(),
        fecha_documento: String::new(),
        clase_documento: String::new(),
    }
}

fn entry_from_header_only(header: &HeaderRecord) -> JournalEntry {
    JournalEntry {
        fecha: header.posting_date.clone(),
        asiento: pad_document_number(&header.document_number),
        cuenta: PLACEHOLDER_ACCOUNT.to_string(),
        subcuenta: PLACEHOLDER_ACCOUNT.to_string(),
        descripcion: header.header_text.clone(),
        debe: 0.0,
        haber: 0.0,
        documento: pad_document_number(&header.document_number),
        referencia: format!("{}-{}", header.business_unit, header.fiscal_year),
        moneda: header.currency.clone(),
        usuario: header.user.clone(),
        fecha_documento: header.document_date.clone(),
        clase_documento: header.document_type.clone(),
    }
}
