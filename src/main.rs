use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mo_convert_rust::{Command, Config, MissingOptions, ReportFormat};

#[derive(Parser, Debug)]
#[command(
    name = "mo-convert-rust",
    version,
    about = "Convert gettext catalogs between PO and MO and find untranslated entries"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Compile a .po file into a .mo file
    #[command(name = "to-mo")]
    ToMo {
        input_po: PathBuf,
        output_mo: PathBuf,
    },

    /// Decompile a .mo file into a .po file
    #[command(name = "to-po")]
    ToPo {
        input_mo: PathBuf,
        output_po: PathBuf,
    },

    /// List entries whose translation is blank or identical to the reference
    Missing {
        /// Reference catalog (default from settings: EN/EN.po)
        #[arg(long = "reference", visible_alias = "en")]
        reference: Option<PathBuf>,

        /// Catalog to check (default from settings: PTBR/PTBR.po)
        #[arg(long = "target", visible_alias = "pt")]
        target: Option<PathBuf>,

        /// Report file (default from settings: falta-traduzir.txt)
        #[arg(long = "out")]
        out: Option<PathBuf>,

        /// Label for reference strings in the report
        #[arg(long = "reference-label")]
        reference_label: Option<String>,

        /// Label for target strings in the report
        #[arg(long = "target-label")]
        target_label: Option<String>,

        /// Report format
        #[arg(long = "format", value_enum)]
        format: Option<ReportFormat>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    mo_convert_rust::logging::init(cli.verbose)?;

    let command = match cli.command {
        CliCommand::ToMo {
            input_po,
            output_mo,
        } => Command::ToMo {
            input: input_po,
            output: output_mo,
        },
        CliCommand::ToPo {
            input_mo,
            output_po,
        } => Command::ToPo {
            input: input_mo,
            output: output_po,
        },
        CliCommand::Missing {
            reference,
            target,
            out,
            reference_label,
            target_label,
            format,
        } => Command::Missing(MissingOptions {
            reference,
            target,
            output: out,
            reference_label,
            target_label,
            format,
        }),
    };

    let output = mo_convert_rust::run(Config {
        command,
        settings_path: cli.read_settings,
    })?;

    println!("{}", output);
    Ok(())
}
