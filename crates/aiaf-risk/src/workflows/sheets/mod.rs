//! Workbook importer. Each sheet arrives as its own CSV export in a data directory.

mod mapping;
mod normalizer;
mod parser;

pub use mapping::SheetKind;

use crate::workflows::assessment::{
    AssessmentDataset, FocusQuestionPool, MalformedDataError, QuestionCatalog, TagTaxonomy,
    TreatmentDirectory,
};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV data in sheet '{sheet}': {source}")]
    Csv {
        sheet: &'static str,
        #[source]
        source: csv::Error,
    },
    #[error(transparent)]
    Malformed(#[from] MalformedDataError),
}

pub struct SheetImporter;

impl SheetImporter {
    /// Loads every sheet from `dir`. Context and focus sheets are required; a missing
    /// treatment sheet falls back to the built-in directory and a missing tag sheet
    /// leaves the taxonomy empty.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<AssessmentDataset, LoadError> {
        let dir = dir.as_ref();
        let context = open_required_sheet(dir, SheetKind::SystemContext)?;
        let focus = open_required_sheet(dir, SheetKind::FocusQuestion)?;
        let treatments = open_sheet(dir, SheetKind::Treatment)?;
        let tags = open_sheet(dir, SheetKind::Tags)?;

        let dataset = Self::from_readers(context, focus, treatments, tags)?;
        info!(data_dir = %dir.display(), "assessment workbook loaded");
        Ok(dataset)
    }

    pub fn from_readers<R: Read>(
        context: R,
        focus: R,
        treatments: Option<R>,
        tags: Option<R>,
    ) -> Result<AssessmentDataset, LoadError> {
        let rows = parser::parse_context_rows(context)?;
        log_rows(SheetKind::SystemContext, rows.len());
        let catalog = QuestionCatalog::from_rows(rows)?;

        let focus_rows = parser::parse_focus_questions(focus)?;
        log_rows(SheetKind::FocusQuestion, focus_rows.len());
        let focus_pool = FocusQuestionPool::from_questions(focus_rows)?;

        let treatments = match treatments {
            Some(reader) => {
                let entries = parser::parse_treatments(reader)?;
                log_rows(SheetKind::Treatment, entries.len());
                TreatmentDirectory::new(entries)
            }
            None => {
                info!("no treatment sheet; using the built-in directory");
                TreatmentDirectory::builtin()
            }
        };

        let tags = match tags {
            Some(reader) => {
                let definitions = parser::parse_tags(reader)?;
                log_rows(SheetKind::Tags, definitions.len());
                TagTaxonomy::new(definitions)
            }
            None => TagTaxonomy::default(),
        };

        Ok(AssessmentDataset {
            catalog,
            focus_pool,
            treatments,
            tags,
        })
    }
}

fn log_rows(kind: SheetKind, rows: usize) {
    info!(sheet = kind.label(), rows, "sheet parsed");
}

/// Opens a sheet export. An absent export is `None` unless the sheet is required.
fn open_sheet(dir: &Path, kind: SheetKind) -> Result<Option<File>, LoadError> {
    let path = dir.join(kind.file_name());
    match File::open(&path) {
        Ok(file) => Ok(Some(file)),
        Err(source) if source.kind() == ErrorKind::NotFound && !kind.required() => Ok(None),
        Err(source) => Err(LoadError::Io { path, source }),
    }
}

fn open_required_sheet(dir: &Path, kind: SheetKind) -> Result<File, LoadError> {
    open_sheet(dir, kind)?.ok_or_else(|| LoadError::Io {
        path: dir.join(kind.file_name()),
        source: ErrorKind::NotFound.into(),
    })
}
