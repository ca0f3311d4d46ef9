use crate::error::ParseError;
use tracing::debug;

/// Column-separator markers that identify the header caption row of an
/// export, per source-system format. The SAP dumps this crate grew up on
/// start their caption with a `Soc.` (business unit) column; other export
/// flavors can be supported by handing the parser a different spec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatSpec {
    pub header_markers: Vec<String>,
    /// Dashed rule lines rendered right below the caption.
    pub separator_lines: usize,
}

impl FormatSpec {
    pub fn sap() -> Self {
        FormatSpec {
            header_markers: vec!["|  Soc.|".to_string(), "| Soc.|".to_string()],
            separator_lines: 1,
        }
    }
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self::sap()
    }
}

/// A parsed export: ordered column names plus positionally aligned rows.
/// Immutable once produced; every row has exactly `headers.len()` fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedFile {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ParsedFile {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse pipe-delimited SAP export text with the default SAP format spec.
pub fn parse(content: &str) -> Result<ParsedFile, ParseError> {
    parse_with_spec(content, &FormatSpec::sap())
}

/// Parse pipe-delimited export text.
///
/// The header caption is the first line containing one of the spec's
/// markers; a fixed number of dashed separator lines after it is skipped.
/// A subsequent line qualifies as a data row iff it contains `|`, does not
/// start with `-` and carries at least as many fields as the caption.
/// Shorter rows are skipped with a diagnostic, never fatal. Only a missing
/// caption aborts the parse.
pub fn parse_with_spec(content: &str, spec: &FormatSpec) -> Result<ParsedFile, ParseError> {
    if content.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let lines: Vec<&str> = content.lines().collect();

    let caption_at = lines
        .iter()
        .position(|line| spec.header_markers.iter().any(|m| line.contains(m.as_str())))
        .ok_or(ParseError::HeaderNotFound)?;

    let headers: Vec<String> = lines[caption_at]
        .split('|')
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(ToString::to_string)
        .collect();

    let mut rows = Vec::new();
    for line in lines.iter().skip(caption_at + 1 + spec.separator_lines) {
        if !line.contains('|') || line.starts_with('-') {
            continue;
        }
        let mut fields = split_row(line);
        if fields.len() < headers.len() {
            debug!(
                got = fields.len(),
                want = headers.len(),
                "skipping row with insufficient columns"
            );
            continue;
        }
        fields.truncate(headers.len());
        rows.push(fields);
    }

    Ok(ParsedFile { headers, rows })
}

/// Split a data row on `|`, trimming each field and dropping the empty
/// fragments produced by the leading and trailing pipe framing. Inner
/// blanks are real field values and stay.
fn split_row(line: &str) -> Vec<String> {
    let mut fields: Vec<String> = line.split('|').map(|f| f.trim().to_string()).collect();
    if fields.first().is_some_and(String::is_empty) {
        fields.remove(0);
    }
    if fields.last().is_some_and(String::is_empty) {
        fields.pop();
    }
    fields
}
