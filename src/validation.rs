use crate::error::ValidationError;
use crate::format;
use crate::parser::ParsedFile;
use chrono::{Months, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::record::{CREDIT_INDICATOR, DEBIT_INDICATOR};

/// Documents are balanced when debit and credit differ by at most one cent.
pub const BALANCE_TOLERANCE: f64 = 0.01;

/// How many offending values a result quotes in its details.
const MAX_EXAMPLES: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Ok,
    Warning,
    Error,
}

/// Outcome of one named check. `field` is a logical category
/// (`fechas`, `debe_haber`, ...), not necessarily a column name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub field: String,
    pub status: ValidationStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ValidationResult {
    pub fn ok(field: &str, message: &str) -> ValidationResult {
        ValidationResult {
            field: field.to_string(),
            status: ValidationStatus::Ok,
            message: message.to_string(),
            details: None,
        }
    }

    pub fn warning(field: &str, message: &str, details: String) -> ValidationResult {
        ValidationResult {
            field: field.to_string(),
            status: ValidationStatus::Warning,
            message: message.to_string(),
            details: Some(details),
        }
    }

    pub fn error(field: &str, message: &str, details: String) -> ValidationResult {
        ValidationResult {
            field: field.to_string(),
            status: ValidationStatus::Error,
            message: message.to_string(),
            details: Some(details),
        }
    }
}

/// What kind of accounting export a file is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOrigin {
    /// Journal: document line items, the libro diario.
    LibroDiario,
    /// Trial balance: sumas y saldos.
    SumasSaldos,
}

/// Guess the origin from the file name. Heuristic only: callers that know
/// the origin pass it explicitly and this is never consulted again.
pub fn infer_origin(file_name: &str) -> FileOrigin {
    let name = file_name.to_lowercase();
    if name.contains("sumas") && name.contains("saldos") {
        return FileOrigin::SumasSaldos;
    }
    if name.contains("bseg") || name.contains("libro") {
        return FileOrigin::LibroDiario;
    }
    if name.ends_with(".xlsx") {
        return FileOrigin::SumasSaldos;
    }
    FileOrigin::LibroDiario
}

/// Everything the engine needs to know about one file.
#[derive(Clone, Debug)]
pub struct ValidationInput<'v> {
    pub file: &'v ParsedFile,
    pub file_name: &'v str,
    pub file_type: &'v str,
    /// Explicit origin when the caller knows it; inferred from the file
    /// name otherwise, once, here.
    pub origin: Option<FileOrigin>,
    /// Accounting period descriptor, `YYYY` or `YYYY-MM`. Blank skips the
    /// temporal phase.
    pub period: &'v str,
}

/// Aggregated validation outcome for one file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileReport {
    pub file_name: String,
    pub file_type: String,
    pub origin: FileOrigin,
    pub status: ValidationStatus,
    pub performed: usize,
    pub total: usize,
    pub results: Vec<ValidationResult>,
    pub error_count: usize,
    pub warning_count: usize,
}

/// Roll a result set up into one status: any error wins, then any warning.
pub fn overall(results: &[ValidationResult]) -> ValidationStatus {
    if results.iter().any(|r| r.status == ValidationStatus::Error) {
        ValidationStatus::Error
    } else if results.iter().any(|r| r.status == ValidationStatus::Warning) {
        ValidationStatus::Warning
    } else {
        ValidationStatus::Ok
    }
}

/// The conversion gate: true iff no report rolled up to an error.
pub fn can_proceed(reports: &[FileReport]) -> bool {
    reports.iter().all(|r| r.status != ValidationStatus::Error)
}

/// Validate one parsed file. Never fails: an internal fault is downgraded
/// to a single `general` error result so one bad file cannot abort a batch.
pub fn validate(input: &ValidationInput<'_>) -> FileReport {
    let origin = input.origin.unwrap_or_else(|| infer_origin(input.file_name));

    let results = match run_phases(input.file, origin, input.period) {
        Ok(results) => results,
        Err(fault) => vec![ValidationResult::error(
            "general",
            "Error inesperado durante la validación",
            fault.to_string(),
        )],
    };

    let error_count = results
        .iter()
        .filter(|r| r.status == ValidationStatus::Error)
        .count();
    let warning_count = results
        .iter()
        .filter(|r| r.status == ValidationStatus::Warning)
        .count();

    FileReport {
        file_name: input.file_name.to_string(),
        file_type: input.file_type.to_string(),
        origin,
        status: overall(&results),
        performed: results.len(),
        total: results.len(),
        results,
        error_count,
        warning_count,
    }
}

fn run_phases(
    file: &ParsedFile,
    origin: FileOrigin,
    period: &str,
) -> Result<Vec<ValidationResult>, ValidationError> {
    match origin {
        FileOrigin::LibroDiario => journal_phases(file, period),
        FileOrigin::SumasSaldos => Ok(vec![trial_balance_amounts(file)]),
    }
}

/// The four journal phases, strictly in order. Phases are independent:
/// no result gates the next one.
fn journal_phases(
    file: &ParsedFile,
    period: &str,
) -> Result<Vec<ValidationResult>, ValidationError> {
    let mut results = vec![
        check_category(file, "fechas", is_date_column, format::is_date, "fecha"),
        check_category(file, "horas", is_time_column, format::is_time, "hora"),
        check_category(file, "importes", is_amount_column, format::is_amount, "importe"),
    ];
    let (documents, positions) = check_identifiers(file)?;
    results.push(documents);
    results.push(positions);
    results.push(check_period(file, period));
    results.push(check_balance(file)?);
    Ok(results)
}

// --- phase 1: field formats ---------------------------------------------

fn is_date_column(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("fecha") || name.contains("fe.") || name.contains("date")
}

fn is_time_column(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("hora") || name.contains("time")
}

fn is_amount_column(name: &str) -> bool {
    let name = name.to_lowercase();
    ["importe", "debe", "haber", "saldo"]
        .iter()
        .any(|kw| name.contains(kw))
}

/// One aggregated result per category: every value of every column the
/// category covers is run through the predicate; offenders are quoted in
/// the details, at most [`MAX_EXAMPLES`] of them.
fn check_category(
    file: &ParsedFile,
    field: &str,
    covers: fn(&str) -> bool,
    valid: fn(&str) -> bool,
    noun: &str,
) -> ValidationResult {
    let columns: Vec<usize> = (0..file.headers.len())
        .filter(|&i| covers(&file.headers[i]))
        .collect();

    let mut offenders = Vec::new();
    for row in &file.rows {
        for &col in &columns {
            if !valid(&row[col]) {
                offenders.push(row[col].clone());
            }
        }
    }

    if offenders.is_empty() {
        ValidationResult::ok(field, &format!("Formato de {noun} válido"))
    } else {
        ValidationResult::error(
            field,
            &format!("Registros con formato de {noun} inválido"),
            detail_with_examples(offenders.len(), &offenders),
        )
    }
}

fn detail_with_examples(count: usize, offenders: &[String]) -> String {
    let examples: Vec<String> = offenders
        .iter()
        .take(MAX_EXAMPLES)
        .map(|v| format!("'{v}'"))
        .collect();
    format!("{count} valores inválidos. Ejemplos: {}", examples.join(", "))
}

// --- phase 2: identifier integrity --------------------------------------

fn find_column(headers: &[String], keywords: &[&str]) -> Option<usize> {
    keywords.iter().find_map(|kw| {
        headers
            .iter()
            .position(|h| h.to_lowercase().contains(kw))
    })
}

fn document_column(file: &ParsedFile) -> Result<usize, ValidationError> {
    find_column(&file.headers, &["nº doc", "numero_documento", "documento", "doc"])
        .ok_or(ValidationError::MissingColumn("documento"))
}

/// (a) document numbers must be unique per file: duplicates are an error.
/// (b) per document, positions must sort into a contiguous 1..N run;
/// gaps and non-numeric positions are a warning.
///
/// A document legitimately spans several rows, one per position, so the
/// duplicate condition is the same (document, position) pair twice. In an
/// export without a position column every repeated document number is a
/// duplicate.
fn check_identifiers(
    file: &ParsedFile,
) -> Result<(ValidationResult, ValidationResult), ValidationError> {
    let doc_col = document_column(file)?;
    let pos_col = find_column(&file.headers, &["pos"]);

    let mut positions: IndexMap<String, Vec<String>> = IndexMap::new();
    for row in &file.rows {
        positions
            .entry(row[doc_col].clone())
            .or_default()
            .push(pos_col.map(|c| row[c].clone()).unwrap_or_default());
    }

    let mut duplicates = Vec::new();
    for (doc, rows) in &positions {
        let mut unique = rows.clone();
        unique.sort();
        unique.dedup();
        if unique.len() != rows.len() {
            duplicates.push(doc.clone());
        }
    }

    let documents = if duplicates.is_empty() {
        ValidationResult::ok("documentos", "Números de documento únicos")
    } else {
        ValidationResult::error(
            "documentos",
            "Números de documento duplicados",
            detail_with_examples(duplicates.len(), &duplicates),
        )
    };

    if pos_col.is_none() {
        return Ok((
            documents,
            ValidationResult::ok("posiciones", "Posiciones no evaluadas"),
        ));
    }

    let mut broken = Vec::new();
    for (doc, rows) in &positions {
        if !is_contiguous(rows) {
            broken.push(doc.clone());
        }
    }

    let positions_result = if broken.is_empty() {
        ValidationResult::ok("posiciones", "Posiciones correlativas por documento")
    } else {
        ValidationResult::warning(
            "posiciones",
            "Documentos con posiciones no correlativas",
            detail_with_examples(broken.len(), &broken),
        )
    };

    Ok((documents, positions_result))
}

fn is_contiguous(raw: &[String]) -> bool {
    let mut numbers = Vec::with_capacity(raw.len());
    for value in raw {
        match value.trim().parse::<u64>() {
            Ok(n) => numbers.push(n),
            Err(_) => return false,
        }
    }
    numbers.sort_unstable();
    numbers
        .iter()
        .enumerate()
        .all(|(i, &n)| n == i as u64 + 1)
}

// --- phase 3: accounting period window ----------------------------------

fn period_window(period: &str) -> Option<(NaiveDate, NaiveDate)> {
    let period = period.trim();
    if let Ok(start) = NaiveDate::parse_from_str(&format!("{period}-01"), "%Y-%m-%d") {
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|d| d.pred_opt())?;
        return Some((start, end));
    }
    let year: i32 = period.parse().ok()?;
    Some((
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

/// Posting dates must fall inside the caller-supplied period window.
/// A blank or unrecognized period descriptor skips the check; dates the
/// format phase already flags as unparseable do not participate.
fn check_period(file: &ParsedFile, period: &str) -> ValidationResult {
    let Some((start, end)) = period_window(period) else {
        return ValidationResult::ok("periodo", "Periodo no evaluado");
    };
    let Some(date_col) = find_column(&file.headers, &["fe.contab", "fecha contab", "fecha", "fe."])
    else {
        return ValidationResult::ok("periodo", "Periodo no evaluado");
    };

    let mut outside = Vec::new();
    for row in &file.rows {
        if let Some(date) = format::parse_date(&row[date_col]) {
            if date < start || date > end {
                outside.push(row[date_col].clone());
            }
        }
    }

    if outside.is_empty() {
        ValidationResult::ok("periodo", "Fechas dentro del periodo")
    } else {
        ValidationResult::warning(
            "periodo",
            &format!("Fechas fuera del periodo {}", period.trim()),
            detail_with_examples(outside.len(), &outside),
        )
    }
}

// --- phase 4: double-entry balance --------------------------------------

/// Group rows by document and compare debit against credit totals, with a
/// one-cent absolute tolerance. Unbalanced documents and unparseable
/// amounts aggregate into one error result.
fn check_balance(file: &ParsedFile) -> Result<ValidationResult, ValidationError> {
    let doc_col = document_column(file)?;
    // header-style exports carry no indicator or amount columns; there is
    // no balance to verify there
    let (Some(dc_col), Some(amount_col)) = (
        find_column(&file.headers, &["d/h"]),
        find_column(&file.headers, &["importe ml", "importe"]),
    ) else {
        return Ok(ValidationResult::ok("debe_haber", "Debe/haber no evaluado"));
    };

    let mut totals: IndexMap<String, (f64, f64)> = IndexMap::new();
    let mut unparseable = Vec::new();
    for row in &file.rows {
        let Some(amount) = format::parse_amount(&row[amount_col]) else {
            unparseable.push(row[amount_col].clone());
            continue;
        };
        let entry = totals.entry(row[doc_col].clone()).or_insert((0.0, 0.0));
        match row[dc_col].trim() {
            DEBIT_INDICATOR => entry.0 += amount,
            CREDIT_INDICATOR => entry.1 += amount,
            _ => {}
        }
    }

    let mut unbalanced = Vec::new();
    for (doc, (debit, credit)) in &totals {
        if (debit - credit).abs() > BALANCE_TOLERANCE {
            unbalanced.push(format!("{doc}: debe {debit:.2}, haber {credit:.2}"));
        }
    }

    if unbalanced.is_empty() && unparseable.is_empty() {
        return Ok(ValidationResult::ok("debe_haber", "Suma cero verificada"));
    }

    let mut details = Vec::new();
    if !unbalanced.is_empty() {
        details.push(format!(
            "{} asientos descuadrados: {}",
            unbalanced.len(),
            unbalanced.join("; ")
        ));
    }
    if !unparseable.is_empty() {
        details.push(detail_with_examples(unparseable.len(), &unparseable));
    }
    Ok(ValidationResult::error(
        "debe_haber",
        "Asientos descuadrados",
        details.join(". "),
    ))
}

// --- trial balance -------------------------------------------------------

/// Single trial-balance phase: find the amount-bearing columns by header
/// keyword, or failing that by probing the first data row, and run every
/// cell of those columns through the amount validator.
fn trial_balance_amounts(file: &ParsedFile) -> ValidationResult {
    let keywords = ["saldo", "importe", "debe", "haber", "movimiento"];
    let mut columns: Vec<usize> = (0..file.headers.len())
        .filter(|&i| {
            let name = file.headers[i].to_lowercase();
            keywords.iter().any(|kw| name.contains(kw))
        })
        .collect();

    if columns.is_empty() {
        if let Some(first) = file.rows.first() {
            columns = (0..first.len())
                .filter(|&i| {
                    !first[i].trim().is_empty() && format::parse_amount(&first[i]).is_some()
                })
                .collect();
        }
    }

    if columns.is_empty() {
        return ValidationResult::ok("importes", "Sin columnas de importe detectadas");
    }

    let mut offenders = Vec::new();
    for row in &file.rows {
        for &col in &columns {
            if !format::is_amount(&row[col]) {
                offenders.push(row[col].clone());
            }
        }
    }

    if offenders.is_empty() {
        ValidationResult::ok("importes", "Importes numéricos válidos")
    } else {
        ValidationResult::error(
            "importes",
            "Importes no numéricos encontrados",
            detail_with_examples(offenders.len(), &offenders),
        )
    }
}
