use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod catalog;
pub mod charset;
pub mod error;
pub mod logging;
pub mod missing;
pub mod mo;
pub mod po;
pub mod settings;
#[cfg(test)]
mod test_util;

pub use catalog::{Catalog, CatalogEntry, EntryKey};
pub use error::FormatError;
pub use missing::{MissingTranslation, ReportFormat, ReportLabels};
pub use mo::{read_mo, write_mo};
pub use po::{read_po, read_po_bytes, write_po};

#[derive(Debug, Clone)]
pub enum Command {
    ToMo { input: PathBuf, output: PathBuf },
    ToPo { input: PathBuf, output: PathBuf },
    Missing(MissingOptions),
}

/// Command-line overrides for the missing-translation report. Anything left
/// as `None` comes from settings.
#[derive(Debug, Clone, Default)]
pub struct MissingOptions {
    pub reference: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub reference_label: Option<String>,
    pub target_label: Option<String>,
    pub format: Option<ReportFormat>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub command: Command,
    pub settings_path: Option<String>,
}

/// A fully resolved missing-translation job.
#[derive(Debug, Clone)]
pub struct MissingJob {
    pub reference: PathBuf,
    pub target: PathBuf,
    pub output: PathBuf,
    pub labels: ReportLabels,
    pub format: ReportFormat,
}

pub fn run(config: Config) -> Result<String> {
    match config.command {
        Command::ToMo { input, output } => {
            let count = po_to_mo(&input, &output)?;
            Ok(format!("Wrote: {} ({} entries)", output.display(), count))
        }
        Command::ToPo { input, output } => {
            let count = mo_to_po(&input, &output)?;
            Ok(format!("Wrote: {} ({} entries)", output.display(), count))
        }
        Command::Missing(options) => {
            let settings_path = config.settings_path.as_deref().map(Path::new);
            let settings = settings::load_settings(settings_path)?;
            let job = resolve_missing_job(options, settings);
            let count = write_missing_report(&job)?;
            Ok(format!(
                "Missing translations: {}\nWrote: {}",
                count,
                job.output.display()
            ))
        }
    }
}

pub fn resolve_missing_job(options: MissingOptions, settings: settings::Settings) -> MissingJob {
    MissingJob {
        reference: options.reference.unwrap_or(settings.missing_reference),
        target: options.target.unwrap_or(settings.missing_target),
        output: options.output.unwrap_or(settings.missing_output),
        labels: ReportLabels {
            reference: options.reference_label.unwrap_or(settings.reference_label),
            target: options.target_label.unwrap_or(settings.target_label),
        },
        format: options.format.unwrap_or(settings.report_format),
    }
}

pub fn read_po_file(path: &Path) -> Result<Catalog> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read po: {}", path.display()))?;
    let catalog = po::read_po_bytes(&bytes);
    debug!(
        path = %path.display(),
        charset = %catalog.charset,
        entries = catalog.len(),
        "parsed po"
    );
    Ok(catalog)
}

pub fn read_mo_file(path: &Path) -> Result<Catalog> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read mo: {}", path.display()))?;
    let catalog =
        mo::read_mo(&bytes).with_context(|| format!("failed to decode mo: {}", path.display()))?;
    debug!(
        path = %path.display(),
        charset = %catalog.charset,
        entries = catalog.len(),
        "parsed mo"
    );
    Ok(catalog)
}

/// Compiles a PO file into an MO file using the charset its header declares.
pub fn po_to_mo(input: &Path, output: &Path) -> Result<usize> {
    let catalog = read_po_file(input)?;
    let bytes = mo::write_mo(&catalog.entries, &catalog.charset)
        .with_context(|| format!("failed to encode mo for {}", input.display()))?;
    fs::write(output, bytes)
        .with_context(|| format!("failed to write mo: {}", output.display()))?;
    Ok(catalog.len())
}

/// Decompiles an MO file into PO text, keeping the binary table order.
pub fn mo_to_po(input: &Path, output: &Path) -> Result<usize> {
    let catalog = read_mo_file(input)?;
    fs::write(output, po::write_po(&catalog.entries))
        .with_context(|| format!("failed to write po: {}", output.display()))?;
    Ok(catalog.len())
}

/// Writes the missing-translation report and returns how many entries it
/// lists.
pub fn write_missing_report(job: &MissingJob) -> Result<usize> {
    let reference = read_po_file(&job.reference)?;
    let target = read_po_file(&job.target)?;
    let missing = missing::find_missing(&reference.entries, &target.entries);
    let report = missing::render_report(&missing, job.format, &job.labels)?;
    fs::write(&job.output, report)
        .with_context(|| format!("failed to write report: {}", job.output.display()))?;
    Ok(missing.len())
}
