//! Visit Sheet batch driver
//!
//! Renders one document per record file from a shared template, layout config
//! and font. A missing or broken record is reported and skipped; the rest of
//! the batch still runs.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use visit_sheet_pdf::{
    generate_sheet_pdf, measure_sheet, FontContext, Record, RenderSummary, SheetConfig, Template,
};

pub use visit_sheet_pdf;

/// Template file read when none is given.
pub const DEFAULT_TEMPLATE: &str = "orallatogatasi_template.json";
pub const DEFAULT_OUTPUT_DIR: &str = "Generated";
/// Output files are named `<prefix>_<record stem>.pdf`.
pub const DEFAULT_PREFIX: &str = "oralatogatasi_lap";

/// Ordered list of record files to render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<PathBuf>,
}

impl Manifest {
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            entries: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Every `*.json` file directly inside `dir`, sorted by file name.
    pub fn scan_dir(dir: &Path) -> Result<Self> {
        let read_dir = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read record directory {}", dir.display()))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let path = entry
                .with_context(|| format!("Failed to list {}", dir.display()))?
                .path();
            let is_json = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false);
            if is_json && path.is_file() {
                entries.push(path);
            }
        }
        entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        log::debug!("Found {} record files in {}", entries.len(), dir.display());
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Renders one record to an output path.
pub trait SheetWriter: Sync {
    fn write_sheet(&self, template: &Template, record: &Record, output: &Path)
        -> Result<RenderSummary>;

    /// False for writers that only lay out, so no output directory is needed.
    fn writes_files(&self) -> bool {
        true
    }
}

/// Writes PDF files with the embedded font.
pub struct PdfSheetWriter<'a> {
    config: &'a SheetConfig,
    font: &'a FontContext,
}

impl<'a> PdfSheetWriter<'a> {
    pub fn new(config: &'a SheetConfig, font: &'a FontContext) -> Self {
        Self { config, font }
    }
}

impl SheetWriter for PdfSheetWriter<'_> {
    fn write_sheet(
        &self,
        template: &Template,
        record: &Record,
        output: &Path,
    ) -> Result<RenderSummary> {
        generate_sheet_pdf(template, record, self.config, self.font, output)
    }
}

/// Lays records out with the real font metrics without writing anything.
pub struct DryRunWriter<'a> {
    config: &'a SheetConfig,
    font: &'a FontContext,
}

impl<'a> DryRunWriter<'a> {
    pub fn new(config: &'a SheetConfig, font: &'a FontContext) -> Self {
        Self { config, font }
    }
}

impl SheetWriter for DryRunWriter<'_> {
    fn write_sheet(
        &self,
        template: &Template,
        record: &Record,
        _output: &Path,
    ) -> Result<RenderSummary> {
        measure_sheet(template, record, self.config, self.font)
    }

    fn writes_files(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Generated {
        output: PathBuf,
        summary: RenderSummary,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordReport {
    pub source: PathBuf,
    pub outcome: RecordOutcome,
}

/// Per-record results in manifest order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub records: Vec<RecordReport>,
}

impl BatchReport {
    pub fn generated(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Generated { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Failed { .. }))
    }

    /// True when records were attempted and none produced a document.
    pub fn all_failed(&self) -> bool {
        self.failed() > 0 && self.generated() == 0
    }

    pub fn outputs(&self) -> Vec<&Path> {
        self.records
            .iter()
            .filter_map(|r| match &r.outcome {
                RecordOutcome::Generated { output, .. } => Some(output.as_path()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&RecordOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| predicate(&r.outcome)).count()
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    pub prefix: String,
    pub parallel: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            prefix: DEFAULT_PREFIX.to_string(),
            parallel: false,
        }
    }
}

/// `<output_dir>/<prefix>_<file stem>.pdf`
pub fn output_path_for(output_dir: &Path, prefix: &str, record_path: &Path) -> PathBuf {
    let stem = record_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "record".to_string());
    output_dir.join(format!("{}_{}.pdf", prefix, stem))
}

/// Render every manifest entry. Only failing to create the output directory
/// is fatal; per-record problems end up in the report.
pub fn run_batch<W: SheetWriter + ?Sized>(
    manifest: &Manifest,
    template: &Template,
    writer: &W,
    options: &BatchOptions,
) -> Result<BatchReport> {
    if writer.writes_files() {
        std::fs::create_dir_all(&options.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                options.output_dir.display()
            )
        })?;
    }

    let collisions = find_output_collisions(manifest, options);
    let render = |(source, earlier): (&PathBuf, &Option<PathBuf>)| {
        process_record(template, writer, source, earlier.as_deref(), options)
    };
    let records: Vec<RecordReport> = if options.parallel {
        manifest
            .entries()
            .par_iter()
            .zip(&collisions)
            .map(render)
            .collect()
    } else {
        manifest
            .entries()
            .iter()
            .zip(&collisions)
            .map(render)
            .collect()
    };

    let report = BatchReport { records };
    log::info!(
        "Batch finished: {} generated, {} skipped, {} failed",
        report.generated(),
        report.skipped(),
        report.failed()
    );
    Ok(report)
}

/// For every entry, the earlier existing record that already maps to the same
/// output file, if any. Each output path has exactly one writer.
fn find_output_collisions(manifest: &Manifest, options: &BatchOptions) -> Vec<Option<PathBuf>> {
    let mut owners: HashMap<PathBuf, &PathBuf> = HashMap::new();
    manifest
        .entries()
        .iter()
        .map(|source| {
            if !source.is_file() {
                return None;
            }
            let output = output_path_for(&options.output_dir, &options.prefix, source);
            match owners.get(&output) {
                Some(owner) => Some((*owner).clone()),
                None => {
                    owners.insert(output, source);
                    None
                }
            }
        })
        .collect()
}

fn process_record<W: SheetWriter + ?Sized>(
    template: &Template,
    writer: &W,
    source: &Path,
    earlier: Option<&Path>,
    options: &BatchOptions,
) -> RecordReport {
    let outcome = if !source.is_file() {
        log::warn!("Record file not found, skipping: {}", source.display());
        RecordOutcome::Skipped {
            reason: "file not found".to_string(),
        }
    } else if let Some(earlier) = earlier {
        let output = output_path_for(&options.output_dir, &options.prefix, source);
        log::error!(
            "{} would overwrite {} already written for {}",
            source.display(),
            output.display(),
            earlier.display()
        );
        RecordOutcome::Failed {
            error: format!(
                "output {} is already produced by {}",
                output.display(),
                earlier.display()
            ),
        }
    } else {
        match Record::load(source) {
            Ok(record) => {
                let output = output_path_for(&options.output_dir, &options.prefix, source);
                match writer.write_sheet(template, &record, &output) {
                    Ok(summary) => {
                        log::info!(
                            "Generated {} ({} page(s), {} answered, {} blank)",
                            output.display(),
                            summary.pages,
                            summary.answered_slots,
                            summary.empty_slots
                        );
                        RecordOutcome::Generated { output, summary }
                    }
                    Err(e) => {
                        log::error!("Failed to render {}: {:#}", source.display(), e);
                        RecordOutcome::Failed {
                            error: format!("{:#}", e),
                        }
                    }
                }
            }
            Err(e) => {
                log::error!("Failed to load record: {}", e);
                RecordOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    };

    RecordReport {
        source: source.to_path_buf(),
        outcome,
    }
}
