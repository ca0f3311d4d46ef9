use crate::convert::{convert_journal, convert_parsed, CanonicalArtifact, ExecutionContext};
use crate::error::PipelineError;
use crate::merge::{classify, merge, FileKind};
use crate::parser::{parse, ParsedFile};
use crate::record::{header_records, line_records, HeaderRecord, LineRecord};
use crate::validation::{can_proceed, validate, FileOrigin, FileReport, ValidationInput};
use tracing::info;

/// One uploaded file as the caller hands it over: raw text, the original
/// name (used for inference) and, when the caller knows better than the
/// heuristics, an explicit origin.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub name: String,
    pub contents: String,
    pub origin: Option<FileOrigin>,
}

/// What one pipeline run produced. `artifact` is `None` when the
/// validation gate blocked the submission; the reports say why.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub reports: Vec<FileReport>,
    pub artifact: Option<CanonicalArtifact>,
}

impl PipelineOutcome {
    pub fn blocked(&self) -> bool {
        self.artifact.is_none()
    }
}

/// Run one submission through parse, validate, gate, merge and convert.
///
/// Parsing is fatal per submission ([`PipelineError::Parse`]); validation
/// findings are data and only block through the gate. When the submission
/// carries both header-kind and line-kind exports the merge path builds
/// the unified journal; otherwise the first file is converted as-is.
pub fn process(
    files: &[SourceFile],
    period: &str,
    ctx: &ExecutionContext,
) -> Result<PipelineOutcome, PipelineError> {
    if files.is_empty() {
        return Err(PipelineError::EmptySubmission);
    }

    let mut parsed: Vec<ParsedFile> = Vec::with_capacity(files.len());
    for file in files {
        let p = parse(&file.contents).map_err(|source| PipelineError::Parse {
            file: file.name.clone(),
            source,
        })?;
        parsed.push(p);
    }

    let reports: Vec<FileReport> = files
        .iter()
        .zip(&parsed)
        .map(|(file, p)| {
            validate(&ValidationInput {
                file: p,
                file_name: &file.name,
                file_type: file_extension(&file.name),
                origin: file.origin,
                period,
            })
        })
        .collect();

    if !can_proceed(&reports) {
        info!(execution = %ctx.execution_id, "submission blocked at validation gate");
        return Ok(PipelineOutcome {
            reports,
            artifact: None,
        });
    }

    let kinds: Vec<FileKind> = files
        .iter()
        .map(|f| classify(&f.name, &f.contents))
        .collect();
    let has_headers = kinds.contains(&FileKind::Header);
    let has_lines = kinds.contains(&FileKind::Line);

    let artifact = if has_headers && has_lines {
        let mut headers: Vec<HeaderRecord> = Vec::new();
        let mut lines: Vec<LineRecord> = Vec::new();
        for (kind, p) in kinds.iter().zip(&parsed) {
            match kind {
                FileKind::Header => headers.extend(header_records(p)),
                FileKind::Line => lines.extend(line_records(p)),
            }
        }
        let entries = merge(&headers, &lines)?;
        let sources = files.iter().map(|f| f.name.clone()).collect();
        convert_journal(&entries, sources, ctx)
    } else {
        convert_parsed(&parsed[0], &files[0].name, ctx)
    };

    Ok(PipelineOutcome {
        reports,
        artifact: Some(artifact),
    })
}

fn file_extension(name: &str) -> &str {
    name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("txt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationStatus;
    use chrono::{TimeZone, Utc};

    const BSEG: &str = "\
|  Soc.| Ejercicio|Nº doc.   |Pos|D/H|    Importe ML|       Importe|Lib.mayor |Texto     |Compens.|Fe.comp.  |Doc.comp. |Acreedor|CT|
--------------------------------------------------------------------------------------------------------------------------------------
|  OIVE|      2024|0000000001|  1|S  |         50,00|         50,00|430000    |Venta     |        |          |          |        |  |
|  OIVE|      2024|0000000001|  2|H  |         50,00|         50,00|700000    |Venta     |        |          |          |        |  |
";

    const BSEG_UNBALANCED: &str = "\
|  Soc.| Ejercicio|Nº doc.   |Pos|D/H|    Importe ML|       Importe|Lib.mayor |Texto     |Compens.|Fe.comp.  |Doc.comp. |Acreedor|CT|
--------------------------------------------------------------------------------------------------------------------------------------
|  OIVE|      2024|0000000001|  1|S  |         50,00|         50,00|430000    |Venta     |        |          |          |        |  |
|  OIVE|      2024|0000000001|  2|H  |         50,00|         50,00|700000    |Venta     |        |          |          |        |  |
|  OIVE|      2024|0000000002|  1|S  |         30,00|         30,00|430000    |Compra    |        |          |          |        |  |
|  OIVE|      2024|0000000002|  2|H  |         25,00|         25,00|700000    |Compra    |        |          |          |        |  |
";

    const BKPF: &str = "\
|  Soc.| Ejercicio|Nº doc.   |Fe.contab.|Fe.entrada|Hora    |Nombre del usuario|Texto cab.documento|Mon.|I|CodT|Doc.anul. |Clase|Fecha doc.|Act.|
------------------------------------------------------------------------------------------------------------------------------------------------
|  OIVE|      2024|0000000001|15.01.2024|15.01.2024|10:30:00|CONTABLE          |Asiento enero      |EUR | |FB01|          |SA   |14.01.2024|    |
";

    fn ctx() -> ExecutionContext {
        ExecutionContext {
            execution_id: "exec-0001".to_string(),
            user_name: "auditor".to_string(),
            executed_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    fn file(name: &str, contents: &str) -> SourceFile {
        SourceFile {
            name: name.to_string(),
            contents: contents.to_string(),
            origin: None,
        }
    }

    #[test]
    fn merge_path_produces_journal() -> anyhow::Result<()> {
        let outcome = process(
            &[file("bkpf_enero.txt", BKPF), file("bseg_enero.txt", BSEG)],
            "2024",
            &ctx(),
        )?;
        assert!(!outcome.blocked());
        let artifact = outcome.artifact.unwrap();
        assert_eq!(artifact.metadata.format, "sap_merged_accounting");
        assert_eq!(artifact.data.len(), 2);
        // joined header fields present
        assert_eq!(artifact.data[0][0], "2024-01-15");
        assert_eq!(artifact.data[0][10], "CONTABLE");
        Ok(())
    }

    #[test]
    fn unbalanced_document_blocks_the_gate() -> anyhow::Result<()> {
        let outcome = process(&[file("bseg_enero.txt", BSEG_UNBALANCED)], "", &ctx())?;
        assert!(outcome.blocked());
        assert_eq!(outcome.reports[0].status, ValidationStatus::Error);
        let balance = outcome.reports[0]
            .results
            .iter()
            .find(|r| r.field == "debe_haber")
            .unwrap();
        assert!(balance.details.as_deref().unwrap().contains("0000000002"));
        assert!(!balance.details.as_deref().unwrap().contains("0000000001:"));
        Ok(())
    }

    #[test]
    fn single_file_converts_as_is() -> anyhow::Result<()> {
        let outcome = process(&[file("bseg_enero.txt", BSEG)], "", &ctx())?;
        let artifact = outcome.artifact.unwrap();
        assert_eq!(artifact.metadata.format, "standard_accounting");
        assert_eq!(artifact.headers[0], "Soc.");
        assert_eq!(artifact.data.len(), 2);
        Ok(())
    }

    #[test]
    fn unparseable_file_is_fatal() {
        let err = process(&[file("vacio.txt", "sin contenido util")], "", &ctx()).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }

    #[test]
    fn empty_submission_is_rejected() {
        assert!(matches!(
            process(&[], "", &ctx()).unwrap_err(),
            PipelineError::EmptySubmission
        ));
    }
}
