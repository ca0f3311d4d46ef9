use chrono::NaiveDate;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "field.pest"]
struct FieldParser;

/// Date formats accepted by [`parse_date`], in the order they are tried.
const DATE_PATTERNS: [&str; 3] = ["%d.%m.%Y", "%Y-%m-%d", "%d/%m/%Y"];

/// Whether the field looks like a date: `DD.MM.YYYY`, `YYYY-MM-DD` or
/// `DD/MM/YYYY`, whole string. Shape only, `32.13.9999` passes.
/// Blank fields count as valid ("not present").
pub fn is_date(field: &str) -> bool {
    let field = field.trim();
    field.is_empty() || FieldParser::parse(Rule::date, field).is_ok()
}

/// Whether the field looks like a time: `HH:MM:SS` or `HH:MM`, whole string.
pub fn is_time(field: &str) -> bool {
    let field = field.trim();
    field.is_empty() || FieldParser::parse(Rule::time, field).is_ok()
}

/// Whether the field parses as a number once a decimal comma is rewritten
/// to a point. Blank fields count as valid.
pub fn is_amount(field: &str) -> bool {
    let field = field.trim();
    field.is_empty() || field.replace(',', ".").parse::<f64>().is_ok()
}

/// Numeric value of a SAP amount field. Blank means zero; inner spaces
/// (thousands padding) are stripped before the decimal comma is rewritten.
pub fn parse_amount(field: &str) -> Option<f64> {
    let field = field.trim();
    if field.is_empty() {
        return Some(0.0);
    }
    let cleaned: String = field
        .chars()
        .filter(|c| *c != ' ')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned.parse::<f64>().ok()
}

/// Rewrite a SAP `DD.MM.YYYY` date to `YYYY-MM-DD`; anything else passes
/// through untouched.
pub fn normalize_date(field: &str) -> String {
    let field = field.trim();
    if FieldParser::parse(Rule::date, field)
        .ok()
        .and_then(|mut pairs| pairs.next())
        .and_then(|p| p.into_inner().next())
        .is_some_and(|p| p.as_rule() == Rule::dotted)
    {
        format!("{}-{}-{}", &field[6..10], &field[3..5], &field[0..2])
    } else {
        field.to_string()
    }
}

/// Calendar-strict parse used by the temporal phase; tries each accepted
/// format in turn.
pub fn parse_date(field: &str) -> Option<NaiveDate> {
    let field = field.trim();
    DATE_PATTERNS
        .iter()
        .find_map(|pat| NaiveDate::parse_from_str(field, pat).ok())
}
