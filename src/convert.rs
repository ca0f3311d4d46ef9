use crate::merge::JournalEntry;
use crate::parser::ParsedFile;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Format tag for a single converted export.
pub const FORMAT_STANDARD: &str = "standard_accounting";
/// Format tag for a journal built by the header/line merge.
pub const FORMAT_MERGED: &str = "sap_merged_accounting";

/// Canonical column list of the merged journal.
pub const JOURNAL_HEADERS: [&str; 13] = [
    "fecha",
    "asiento",
    "cuenta",
    "subcuenta",
    "descripcion",
    "debe",
    "haber",
    "documento",
    "referencia",
    "moneda",
    "usuario",
    "fecha_documento",
    "clase_documento",
];

/// Caller-supplied identity of one pipeline run. The core never reaches
/// for an ambient clock or user: whoever drives the pipeline says who ran
/// it and when.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    pub execution_id: String,
    pub user_name: String,
    pub executed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArtifactMetadata {
    pub execution_id: String,
    pub source_files: Vec<String>,
    pub converted_by: String,
    pub converted_at: String,
    pub total_records: usize,
    pub format: String,
}

/// The canonical output artifact: `{ metadata, headers, data }`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CanonicalArtifact {
    pub metadata: ArtifactMetadata,
    pub headers: Vec<String>,
    pub data: Vec<Vec<String>>,
}

fn metadata(
    ctx: &ExecutionContext,
    source_files: Vec<String>,
    total_records: usize,
    format: &str,
) -> ArtifactMetadata {
    ArtifactMetadata {
        execution_id: ctx.execution_id.clone(),
        source_files,
        converted_by: ctx.user_name.clone(),
        converted_at: ctx.executed_at.to_rfc3339(),
        total_records,
        format: format.to_string(),
    }
}

/// Map a validated parsed file straight into the canonical schema: the
/// headers and rows are the file's own, nothing is synthesized.
pub fn convert_parsed(
    file: &ParsedFile,
    source_file: &str,
    ctx: &ExecutionContext,
) -> CanonicalArtifact {
    CanonicalArtifact {
        metadata: metadata(
            ctx,
            vec![source_file.to_string()],
            file.rows.len(),
            FORMAT_STANDARD,
        ),
        headers: file.headers.clone(),
        data: file.rows.clone(),
    }
}

/// Render a merged journal into the canonical schema with the fixed
/// [`JOURNAL_HEADERS`] column list; amounts carry two decimals.
pub fn convert_journal(
    entries: &[JournalEntry],
    source_files: Vec<String>,
    ctx: &ExecutionContext,
) -> CanonicalArtifact {
    let data = entries
        .iter()
        .map(|e| {
            vec![
                e.fecha.clone(),
                e.asiento.clone(),
                e.cuenta.clone(),
                e.subcuenta.clone(),
                e.descripcion.clone(),
                format!("{:.2}", e.debe),
                format!("{:.2}", e.haber),
                e.documento.clone(),
                e.referencia.clone(),
                e.moneda.clone(),
                e.usuario.clone(),
                e.fecha_documento.clone(),
                e.clase_documento.clone(),
            ]
        })
        .collect();

    CanonicalArtifact {
        metadata: metadata(ctx, source_files, entries.len(), FORMAT_MERGED),
        headers: JOURNAL_HEADERS.iter().map(ToString::to_string).collect(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx() -> ExecutionContext {
        ExecutionContext {
            execution_id: "exec-0001".to_string(),
            user_name: "auditor".to_string(),
            executed_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn parsed_file_maps_verbatim() {
        let file = ParsedFile {
            headers: vec!["CUENTA".to_string(), "SALDO".to_string()],
            rows: vec![vec!["430000".to_string(), "10,00".to_string()]],
        };
        let artifact = convert_parsed(&file, "sumas_saldos.txt", &ctx());
        assert_eq!(artifact.headers, file.headers);
        assert_eq!(artifact.data, file.rows);
        assert_eq!(artifact.metadata.total_records, 1);
        assert_eq!(artifact.metadata.format, FORMAT_STANDARD);
        assert_eq!(artifact.metadata.source_files, vec!["sumas_saldos.txt"]);
    }

    #[test]
    fn journal_renders_two_decimal_amounts() {
        let entry = JournalEntry {
            fecha: "2024-01-15".to_string(),
            asiento: "0000001234".to_string(),
            cuenta: "430000".to_string(),
            subcuenta: "430000".to_string(),
            descripcion: "Venta".to_string(),
            debe: 50.0,
            haber: 0.0,
            documento: "0000001234".to_string(),
            referencia: "OIVE-2024-1".to_string(),
            moneda: "EUR".to_string(),
            usuario: "CONTABLE".to_string(),
            fecha_documento: "2024-01-14".to_string(),
            clase_documento: "SA".to_string(),
        };
        let artifact = convert_journal(&[entry], vec!["bseg.txt".to_string()], &ctx());
        assert_eq!(artifact.headers.len(), JOURNAL_HEADERS.len());
        assert_eq!(artifact.data[0][5], "50.00");
        assert_eq!(artifact.data[0][6], "0.00");
        assert_eq!(artifact.metadata.format, FORMAT_MERGED);
        assert_eq!(artifact.metadata.converted_by, "auditor");
    }

    #[test]
    fn artifact_serializes_to_canonical_json() -> anyhow::Result<()> {
        let file = ParsedFile {
            headers: vec!["CUENTA".to_string()],
            rows: vec![vec!["430000".to_string()]],
        };
        let artifact = convert_parsed(&file, "f.txt", &ctx());
        let json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&artifact)?)?;
        assert!(json.get("metadata").is_some());
        assert_eq!(json["headers"][0], "CUENTA");
        assert_eq!(json["data"][0][0], "430000");
        Ok(())
    }
}
