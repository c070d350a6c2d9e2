use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use deedmerge_core::{MergeCoordinator, ProgressEvent, VerificationEngine, config_file};
use deedmerge_ocr_tesseract::TesseractOcr;
use deedmerge_pdf_mupdf::{DEFAULT_RENDER_DPI, MupdfToolkit};

mod output;

use output::ColorMode;

/// Deedmerge - Pair, merge, and verify scanned land-registry documents
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize certificate filenames to {tlma}-{upin}.pdf
    CleanCerts {
        /// Folder of raw scanned certificates
        input: PathBuf,

        /// Folder to write the renamed copies into
        output: PathBuf,

        /// TLMA authority code expected in each filename ('fallback' drops
        /// the prefix from output names)
        #[arg(long)]
        tlma: String,

        /// Report renames without copying anything
        #[arg(long)]
        dry_run: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Path to output log file
        #[arg(short, long)]
        log: Option<PathBuf>,
    },

    /// Normalize title-plan filenames by stripping the scanner prefix
    CleanPlans {
        /// Folder of raw scanned title plans
        input: PathBuf,

        /// Folder to write the renamed copies into
        output: PathBuf,

        /// Report renames without copying anything
        #[arg(long)]
        dry_run: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Path to output log file
        #[arg(short, long)]
        log: Option<PathBuf>,
    },

    /// Pair certificates with title plans by UPIN and concatenate each pair
    Merge {
        /// Folder of cleaned certificates
        cert_folder: PathBuf,

        /// Folder of cleaned title plans
        plan_folder: PathBuf,

        /// Folder to write merged documents into
        output: PathBuf,

        /// Report pairings without writing or deleting anything
        #[arg(long)]
        dry_run: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Path to output log file
        #[arg(short, long)]
        log: Option<PathBuf>,

        /// Write a JSON report of the pass to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Verify that both halves of each merged document claim the same UPIN
    Verify {
        /// Folder of merged documents
        merged_folder: PathBuf,

        /// Folder to move verified documents into
        output: PathBuf,

        /// Classify without moving anything
        #[arg(long)]
        dry_run: bool,

        /// Disable the OCR fallback for scanned title plans
        #[arg(long)]
        no_ocr: bool,

        /// Tesseract tessdata directory
        #[arg(long)]
        tessdata_dir: Option<PathBuf>,

        /// OCR recognition language
        #[arg(long)]
        ocr_language: Option<String>,

        /// Rendering resolution for the OCR fallback
        #[arg(long)]
        render_dpi: Option<u32>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Path to output log file
        #[arg(short, long)]
        log: Option<PathBuf>,

        /// Write a JSON report of the pass to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::CleanCerts {
            input,
            output,
            tlma,
            dry_run,
            no_color,
            log,
        } => clean_certs(input, output, tlma, dry_run, no_color, log),
        Command::CleanPlans {
            input,
            output,
            dry_run,
            no_color,
            log,
        } => clean_plans(input, output, dry_run, no_color, log),
        Command::Merge {
            cert_folder,
            plan_folder,
            output,
            dry_run,
            no_color,
            log,
            report,
        } => merge(cert_folder, plan_folder, output, dry_run, no_color, log, report),
        Command::Verify {
            merged_folder,
            output,
            dry_run,
            no_ocr,
            tessdata_dir,
            ocr_language,
            render_dpi,
            no_color,
            log,
            report,
        } => verify(
            merged_folder,
            output,
            dry_run,
            no_ocr,
            tessdata_dir,
            ocr_language,
            render_dpi,
            no_color,
            log,
            report,
        ),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Decide color mode and open the event writer. Writing to a log file
/// disables color.
fn open_writer(
    no_color: bool,
    log: &Option<PathBuf>,
) -> anyhow::Result<(ColorMode, Mutex<Box<dyn Write>>)> {
    let color = ColorMode(!no_color && log.is_none());
    let writer: Box<dyn Write> = if let Some(log_path) = log {
        Box::new(std::fs::File::create(log_path)?)
    } else {
        Box::new(std::io::stdout())
    };
    Ok((color, Mutex::new(writer)))
}

fn write_report<T: serde::Serialize>(report_path: &PathBuf, report: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(report_path, json)?;
    Ok(())
}

fn clean_certs(
    input: PathBuf,
    output: PathBuf,
    tlma: String,
    dry_run: bool,
    no_color: bool,
    log: Option<PathBuf>,
) -> anyhow::Result<()> {
    let (color, writer) = open_writer(no_color, &log)?;
    let sink = |event: ProgressEvent| {
        if let Ok(mut w) = writer.lock() {
            let _ = output::print_event(&mut **w, &event, color);
            let _ = w.flush();
        }
    };

    let report = deedmerge_core::clean::clean_certificates(&input, &output, &tlma, dry_run, &sink)?;

    let mut w = writer.lock().map_err(|_| anyhow::anyhow!("output writer poisoned"))?;
    output::print_clean_summary(&mut **w, &report, dry_run, color)?;
    Ok(())
}

fn clean_plans(
    input: PathBuf,
    output: PathBuf,
    dry_run: bool,
    no_color: bool,
    log: Option<PathBuf>,
) -> anyhow::Result<()> {
    let (color, writer) = open_writer(no_color, &log)?;
    let sink = |event: ProgressEvent| {
        if let Ok(mut w) = writer.lock() {
            let _ = output::print_event(&mut **w, &event, color);
            let _ = w.flush();
        }
    };

    let report = deedmerge_core::clean::clean_title_plans(&input, &output, dry_run, &sink)?;

    let mut w = writer.lock().map_err(|_| anyhow::anyhow!("output writer poisoned"))?;
    output::print_clean_summary(&mut **w, &report, dry_run, color)?;
    Ok(())
}

fn merge(
    cert_folder: PathBuf,
    plan_folder: PathBuf,
    output: PathBuf,
    dry_run: bool,
    no_color: bool,
    log: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let (color, writer) = open_writer(no_color, &log)?;
    let sink = |event: ProgressEvent| {
        if let Ok(mut w) = writer.lock() {
            let _ = output::print_event(&mut **w, &event, color);
            let _ = w.flush();
        }
    };

    let toolkit = MupdfToolkit::new();
    let coordinator = MergeCoordinator::new(&toolkit);
    let report = coordinator.merge_all(&cert_folder, &plan_folder, &output, dry_run, &sink)?;

    {
        let mut w = writer.lock().map_err(|_| anyhow::anyhow!("output writer poisoned"))?;
        output::print_merge_summary(&mut **w, &report, dry_run, color)?;
    }

    if let Some(ref path) = report_path {
        write_report(path, &report)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn verify(
    merged_folder: PathBuf,
    output: PathBuf,
    dry_run: bool,
    no_ocr: bool,
    tessdata_dir: Option<PathBuf>,
    ocr_language: Option<String>,
    render_dpi: Option<u32>,
    no_color: bool,
    log: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    // Resolve configuration: CLI flags > env vars > config file > defaults
    let file_config = config_file::load_config();
    let tessdata_dir = tessdata_dir
        .or_else(|| std::env::var("TESSDATA_DIR").ok().map(PathBuf::from))
        .or_else(|| {
            file_config
                .ocr
                .as_ref()
                .and_then(|o| o.tessdata_dir.clone())
                .map(PathBuf::from)
        });
    let ocr_language = ocr_language
        .or_else(|| file_config.ocr.as_ref().and_then(|o| o.language.clone()))
        .unwrap_or_else(|| deedmerge_ocr_tesseract::DEFAULT_LANGUAGE.to_string());
    let render_dpi = render_dpi
        .or_else(|| file_config.render.as_ref().and_then(|r| r.dpi))
        .unwrap_or(DEFAULT_RENDER_DPI);

    let (color, writer) = open_writer(no_color, &log)?;
    let sink = |event: ProgressEvent| {
        if let Ok(mut w) = writer.lock() {
            let _ = output::print_event(&mut **w, &event, color);
            let _ = w.flush();
        }
    };

    let toolkit = MupdfToolkit::new().with_render_dpi(render_dpi);

    let ocr = if no_ocr {
        None
    } else {
        let mut engine = TesseractOcr::new().with_language(&ocr_language);
        if let Some(ref dir) = tessdata_dir {
            engine = engine
                .with_tessdata_dir(dir)
                .map_err(|e| anyhow::anyhow!("OCR setup failed: {}", e))?;
        }
        Some(engine)
    };

    let mut engine = VerificationEngine::new(&toolkit);
    if let Some(ref ocr) = ocr {
        engine = engine.with_ocr(ocr);
    }

    let report = engine.verify_all(&merged_folder, &output, dry_run, &sink)?;

    {
        let mut w = writer.lock().map_err(|_| anyhow::anyhow!("output writer poisoned"))?;
        output::print_verify_summary(&mut **w, &report, dry_run, color)?;
    }

    if let Some(ref path) = report_path {
        write_report(path, &report)?;
    }
    Ok(())
}
