use crate::error::{IngestError, LineError};
use crate::extractor::{extract_page_texts, CatalogTextParser};
use crate::models::{CatalogKind, CatalogOptions, ProductRecord, RawRecord};
use crate::normalize::normalize;
use crate::sheet::read_sheet_rows;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub fn discover_catalog_files(folder: &Path, options: &CatalogOptions) -> Vec<PathBuf> {
    let max_depth = if options.recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        if CatalogKind::from_path(entry.path()).is_some() {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// A row or line that was dropped while the rest of its file was kept.
#[derive(Debug)]
pub struct SkippedUnit {
    pub path: PathBuf,
    pub location: String,
    pub error: LineError,
}

#[derive(Debug, Default)]
pub struct IngestionReport {
    pub records: Vec<ProductRecord>,
    pub skipped_files: Vec<SkippedFile>,
    pub skipped_units: Vec<SkippedUnit>,
}

#[derive(Debug, Default)]
pub struct CatalogExtraction {
    pub records: Vec<ProductRecord>,
    pub skipped_units: Vec<SkippedUnit>,
}

/// Extracts and normalizes one catalog file.
pub fn extract_catalog_file(
    path: &Path,
    options: &CatalogOptions,
) -> Result<CatalogExtraction, IngestError> {
    let kind = CatalogKind::from_path(path).ok_or_else(|| {
        IngestError::InvalidArgument(format!("unsupported catalog file: {}", path.display()))
    })?;

    let mut extraction = CatalogExtraction::default();
    let mut push = |raw: RawRecord, location: String| match normalize(&raw) {
        Ok(record) => extraction.records.push(record),
        Err(error) => extraction.skipped_units.push(SkippedUnit {
            path: path.to_path_buf(),
            location,
            error,
        }),
    };

    match kind {
        CatalogKind::Spreadsheet => {
            for row in read_sheet_rows(path)? {
                let location = format!("row {}", row.row_number);
                push(RawRecord::Tabular(row), location);
            }
        }
        CatalogKind::Pdf => {
            let pages = extract_page_texts(path)?;
            let parsed = CatalogTextParser::new(options).parse_pages(&pages);
            for entry in parsed.entries {
                push(RawRecord::Bullet(entry), String::new());
            }
            extraction
                .skipped_units
                .extend(parsed.rejected.into_iter().map(|rejected| SkippedUnit {
                    path: path.to_path_buf(),
                    location: format!("page {}: {}", rejected.page, rejected.line),
                    error: rejected.error,
                }));
        }
    }

    Ok(extraction)
}

pub fn ingest_catalog_folder(
    folder: &Path,
    options: &CatalogOptions,
) -> Result<IngestionReport, IngestError> {
    let files = discover_catalog_files(folder, options);

    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no catalog files found in {}",
            folder.display()
        )));
    }

    let mut report = IngestionReport::default();

    for path in files {
        match extract_catalog_file(&path, options) {
            Ok(extraction) => {
                info!(
                    path = %path.display(),
                    records = extraction.records.len(),
                    skipped = extraction.skipped_units.len(),
                    "catalog extracted"
                );
                for skipped in &extraction.skipped_units {
                    warn!(
                        path = %skipped.path.display(),
                        location = %skipped.location,
                        reason = %skipped.error,
                        "skipped catalog entry"
                    );
                }
                report.records.extend(extraction.records);
                report.skipped_units.extend(extraction.skipped_units);
            }
            Err(error) => {
                warn!(path = %path.display(), reason = %error, "skipped catalog file");
                report.skipped_files.push(SkippedFile {
                    path,
                    reason: error.to_string(),
                });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn discovery_keeps_only_catalog_extensions() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        fs::write(base.join("b.pdf"), b"%PDF-1.4")?;
        fs::write(base.join("a.xlsx"), b"xlsx")?;
        fs::write(base.join("notes.txt"), b"notes")?;
        fs::write(base.join("old.xls"), b"xls")?;

        let files = discover_catalog_files(base, &CatalogOptions::default());
        let names: Vec<_> = files
            .iter()
            .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
            .collect();
        assert_eq!(names, vec!["a.xlsx", "b.pdf"]);
        Ok(())
    }

    #[test]
    fn discovery_recurses_only_when_asked() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nested = dir.path().join("archive");
        fs::create_dir(&nested)?;
        fs::write(dir.path().join("top.pdf"), b"%PDF-1.4")?;
        fs::write(nested.join("deep.pdf"), b"%PDF-1.4")?;

        let flat = discover_catalog_files(dir.path(), &CatalogOptions::default());
        assert_eq!(flat.len(), 1);

        let options = CatalogOptions {
            recursive: true,
            ..CatalogOptions::default()
        };
        assert_eq!(discover_catalog_files(dir.path(), &options).len(), 2);
        Ok(())
    }

    #[test]
    fn ingestion_fails_without_catalogs() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("readme.md"), b"# catalogs")?;

        let result = ingest_catalog_folder(dir.path(), &CatalogOptions::default());
        assert!(matches!(result, Err(IngestError::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn unreadable_files_are_skipped_not_fatal() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("broken.pdf"), b"%PDF-1.4\n%broken")?;
        fs::write(dir.path().join("broken.xlsx"), b"not a workbook")?;

        let report = ingest_catalog_folder(dir.path(), &CatalogOptions::default())?;

        assert!(report.records.is_empty());
        assert_eq!(report.skipped_files.len(), 2);
        assert!(report
            .skipped_files
            .iter()
            .any(|skipped| skipped.path.ends_with("broken.pdf")));
        Ok(())
    }

    #[test]
    fn unsupported_file_is_rejected_directly() {
        let result = extract_catalog_file(Path::new("prices.csv"), &CatalogOptions::default());
        assert!(matches!(result, Err(IngestError::InvalidArgument(_))));
    }
}
