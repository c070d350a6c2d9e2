use std::io::Write;

use deedmerge_core::{
    CleanReport, MergeReport, ProgressEvent, SkipReason, VerifyReport,
};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print a real-time progress event.
pub fn print_event(
    w: &mut dyn Write,
    event: &ProgressEvent,
    color: ColorMode,
) -> std::io::Result<()> {
    match event {
        ProgressEvent::Renamed { from, to } => {
            writeln!(w, "{} -> {}", from, to)?;
        }
        ProgressEvent::CleanSkipped { file, reason } => {
            if color.enabled() {
                writeln!(w, "{} {} ({})", "SKIPPED:".yellow(), file, reason)?;
            } else {
                writeln!(w, "SKIPPED: {} ({})", file, reason)?;
            }
        }
        ProgressEvent::Merged {
            certificate,
            title_plan,
            output,
        } => {
            writeln!(w, "Merging {} + {} -> {}", certificate, title_plan, output)?;
        }
        ProgressEvent::MergeSkipped { file, reason } => {
            let why = match reason {
                SkipReason::NoFileKey => "no UPIN digits in filename",
                SkipReason::NoMatchingPlan => "no matching title plan",
            };
            if color.enabled() {
                writeln!(w, "{} {} ({})", "SKIPPED:".yellow(), file, why)?;
            } else {
                writeln!(w, "SKIPPED: {} ({})", file, why)?;
            }
        }
        ProgressEvent::Verified { file, upin } => {
            if color.enabled() {
                writeln!(w, "{} {} (UPIN {})", "VERIFIED:".green(), file, upin)?;
            } else {
                writeln!(w, "VERIFIED: {} (UPIN {})", file, upin)?;
            }
        }
        ProgressEvent::Mismatched {
            file,
            certificate,
            title_plan,
        } => {
            if color.enabled() {
                writeln!(
                    w,
                    "{} {} (certificate {} vs title plan {})",
                    "MISMATCHED:".red(),
                    file,
                    certificate,
                    title_plan
                )?;
            } else {
                writeln!(
                    w,
                    "MISMATCHED: {} (certificate {} vs title plan {})",
                    file, certificate, title_plan
                )?;
            }
        }
        ProgressEvent::Unreadable { file, missing } => {
            if color.enabled() {
                writeln!(
                    w,
                    "{} {} (missing: {})",
                    "UNREADABLE:".yellow(),
                    file,
                    missing.describe()
                )?;
            } else {
                writeln!(w, "UNREADABLE: {} (missing: {})", file, missing.describe())?;
            }
        }
        ProgressEvent::PageDump {
            file,
            page_index,
            text,
        } => {
            let header = format!("--- {} page {} ---", file, page_index + 1);
            if color.enabled() {
                writeln!(w, "{}", header.dimmed())?;
                writeln!(w, "{}", text.dimmed())?;
            } else {
                writeln!(w, "{}", header)?;
                writeln!(w, "{}", text)?;
            }
        }
        ProgressEvent::SourceDeleted { file } => {
            if color.enabled() {
                writeln!(w, "{}", format!("Deleted source: {}", file).dimmed())?;
            } else {
                writeln!(w, "Deleted source: {}", file)?;
            }
        }
        ProgressEvent::FileError { file, message } => {
            if color.enabled() {
                writeln!(w, "{} {}: {}", "ERROR:".red(), file, message)?;
            } else {
                writeln!(w, "ERROR: {}: {}", file, message)?;
            }
        }
    }
    Ok(())
}

/// Summary after a cleaning pass.
pub fn print_clean_summary(
    w: &mut dyn Write,
    report: &CleanReport,
    dry_run: bool,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    if dry_run {
        print_dry_run_banner(w, color)?;
    }
    writeln!(w, "Renamed: {} files", report.renamed_count)?;
    if report.fallback_count > 0 {
        writeln!(w, "Fallback names: {} files", report.fallback_count)?;
    }
    print_file_list(w, "Skipped", &report.skipped, color)?;
    Ok(())
}

/// Summary after a merge pass.
pub fn print_merge_summary(
    w: &mut dyn Write,
    report: &MergeReport,
    dry_run: bool,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    if dry_run {
        print_dry_run_banner(w, color)?;
    }
    writeln!(w, "Merged: {} files", report.merged_count)?;
    print_file_list(w, "Skipped", &report.skipped, color)?;
    Ok(())
}

/// Summary after a verification pass. Mismatched and unreadable files are
/// listed by name so they can be pulled for manual review.
pub fn print_verify_summary(
    w: &mut dyn Write,
    report: &VerifyReport,
    dry_run: bool,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    if dry_run {
        print_dry_run_banner(w, color)?;
    }
    if color.enabled() {
        writeln!(
            w,
            "{}",
            format!("Verified: {} files", report.verified_count).green()
        )?;
    } else {
        writeln!(w, "Verified: {} files", report.verified_count)?;
    }
    print_file_list(w, "Mismatched", &report.mismatched, color)?;
    print_file_list(w, "Unreadable", &report.unreadable, color)?;
    Ok(())
}

fn print_dry_run_banner(w: &mut dyn Write, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", "DRY RUN (no files were touched)".bold().cyan())?;
    } else {
        writeln!(w, "DRY RUN (no files were touched)")?;
    }
    Ok(())
}

fn print_file_list(
    w: &mut dyn Write,
    label: &str,
    files: &[String],
    color: ColorMode,
) -> std::io::Result<()> {
    if files.is_empty() {
        return Ok(());
    }
    if color.enabled() {
        writeln!(w, "{}", format!("{}: {} files", label, files.len()).yellow())?;
    } else {
        writeln!(w, "{}: {} files", label, files.len())?;
    }
    for file in files {
        writeln!(w, "  {}", file)?;
    }
    Ok(())
}
