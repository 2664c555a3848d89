use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::missing::ReportFormat;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub missing_reference: PathBuf,
    pub missing_target: PathBuf,
    pub missing_output: PathBuf,
    pub reference_label: String,
    pub target_label: String,
    pub report_format: ReportFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            missing_reference: Path::new("EN").join("EN.po"),
            missing_target: Path::new("PTBR").join("PTBR.po"),
            missing_output: PathBuf::from("falta-traduzir.txt"),
            reference_label: "en".to_string(),
            target_label: "pt".to_string(),
            report_format: ReportFormat::Text,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    missing: Option<MissingSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct MissingSettings {
    reference: Option<String>,
    target: Option<String>,
    output: Option<String>,
    reference_label: Option<String>,
    target_label: Option<String>,
    format: Option<ReportFormat>,
}

/// Loads settings from the working directory, the home directory and an
/// optional extra file, later files overriding earlier ones.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        let Some(missing) = incoming.missing else {
            return;
        };
        if let Some(path) = non_blank(missing.reference) {
            self.missing_reference = PathBuf::from(path);
        }
        if let Some(path) = non_blank(missing.target) {
            self.missing_target = PathBuf::from(path);
        }
        if let Some(path) = non_blank(missing.output) {
            self.missing_output = PathBuf::from(path);
        }
        if let Some(label) = non_blank(missing.reference_label) {
            self.reference_label = label;
        }
        if let Some(label) = non_blank(missing.target_label) {
            self.target_label = label;
        }
        if let Some(format) = missing.format {
            self.report_format = format;
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".mo-convert-rust"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn embedded_defaults_parse() {
        let parsed: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML).expect("parse defaults");
        let mut settings = Settings::default();
        settings.merge(parsed);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn writes_default_file_into_home() {
        with_temp_home(|home| {
            load_settings(None).expect("load settings");
            let written = home.join(".mo-convert-rust").join("settings.toml");
            let content = fs::read_to_string(written).expect("read written settings");
            assert_eq!(content, DEFAULT_SETTINGS_TOML);
        });
    }

    #[test]
    fn extra_file_overrides_defaults() {
        with_temp_home(|home| {
            let extra = home.join("extra.toml");
            fs::write(
                &extra,
                "[missing]\nreference = \"ref/en.po\"\ntarget_label = \"de\"\nformat = \"json\"\noutput = \"  \"\n",
            )
            .expect("write extra settings");

            let settings = load_settings(Some(&extra)).expect("load settings");
            assert_eq!(settings.missing_reference, PathBuf::from("ref/en.po"));
            assert_eq!(settings.target_label, "de");
            assert_eq!(settings.report_format, ReportFormat::Json);
            assert_eq!(settings.missing_output, PathBuf::from("falta-traduzir.txt"));
        });
    }

    #[test]
    fn missing_extra_file_is_an_error() {
        with_temp_home(|home| {
            let err = load_settings(Some(&home.join("nope.toml"))).expect_err("missing file");
            assert!(err.to_string().contains("settings file not found"));
        });
    }
}
