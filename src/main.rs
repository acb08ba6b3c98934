use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use visit_sheet::visit_sheet_pdf::{FontContext, PresentationStyle, SheetConfig, Template};
use visit_sheet::{
    run_batch, BatchOptions, BatchReport, DryRunWriter, Manifest, PdfSheetWriter,
    DEFAULT_OUTPUT_DIR, DEFAULT_PREFIX, DEFAULT_TEMPLATE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StyleArg {
    PlainWrap,
    BorderedTable,
    JustifiedParagraph,
}

impl From<StyleArg> for PresentationStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::PlainWrap => PresentationStyle::PlainWrap,
            StyleArg::BorderedTable => PresentationStyle::BorderedTable,
            StyleArg::JustifiedParagraph => PresentationStyle::JustifiedParagraph,
        }
    }
}

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(version, about = "Generate visit sheet PDFs from a template and answer records")]
struct Args {
    /// Template JSON file
    #[arg(short, long, default_value = DEFAULT_TEMPLATE)]
    template: PathBuf,

    /// Record JSON files, rendered in the given order
    records: Vec<PathBuf>,

    /// Render every *.json file in this directory instead
    #[arg(long, conflicts_with = "records")]
    data_dir: Option<PathBuf>,

    /// Directory for the generated PDFs
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Output file name prefix
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Presentation style (overrides the config file)
    #[arg(long, value_enum)]
    style: Option<StyleArg>,

    /// TrueType font to embed
    #[arg(long)]
    font: Option<PathBuf>,

    /// Layout config JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Render records concurrently
    #[arg(long)]
    parallel: bool,

    /// Lay out every record and report page counts without writing PDFs
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args) {
        Ok(report) if report.all_failed() => {
            log::error!("No record could be rendered");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<BatchReport> {
    let template = Template::load(&args.template)
        .with_context(|| format!("Cannot use template {}", args.template.display()))?;

    let mut config = match &args.config {
        Some(path) => SheetConfig::load(path)?,
        None => SheetConfig::default(),
    };
    if let Some(style) = args.style {
        config = config.with_style(style.into());
        config.validate()?;
    }

    let font = FontContext::load(args.font.as_deref())?;
    log::info!(
        "Using font {} from {}",
        font.font_name,
        font.font_path.display()
    );

    let manifest = match &args.data_dir {
        Some(dir) => Manifest::scan_dir(dir)?,
        None => Manifest::from_paths(args.records),
    };
    if manifest.is_empty() {
        log::warn!("No record files given, nothing to do");
    }
    log::info!(
        "Rendering {} record(s) with {} slot(s) each, style {:?}",
        manifest.len(),
        template.slot_count(),
        config.style
    );

    let options = BatchOptions {
        output_dir: args.output_dir,
        prefix: args.prefix,
        parallel: args.parallel,
    };

    if args.dry_run {
        run_batch(&manifest, &template, &DryRunWriter::new(&config, &font), &options)
    } else {
        run_batch(&manifest, &template, &PdfSheetWriter::new(&config, &font), &options)
    }
}
