use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::catalog::{CatalogEntry, EntryKey};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// A target entry whose translation is blank or still a copy of the
/// reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingTranslation {
    pub context: Option<String>,
    pub id: String,
    pub id_plural: Option<String>,
    pub reference: Vec<String>,
    pub target: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLabels {
    pub reference: String,
    pub target: String,
}

impl Default for ReportLabels {
    fn default() -> Self {
        Self {
            reference: "en".to_string(),
            target: "pt".to_string(),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    count: usize,
    missing: &'a [MissingTranslation],
}

pub fn is_missing_translation(reference: &CatalogEntry, target: &CatalogEntry) -> bool {
    if target.is_header() {
        return false;
    }
    if target
        .translations
        .iter()
        .all(|translation| translation.trim().is_empty())
    {
        return true;
    }

    let len = reference.translations.len().max(target.translations.len());
    (0..len).all(|index| {
        let expected = reference.translations.get(index).map(String::as_str);
        let actual = target.translations.get(index).map(String::as_str);
        actual.unwrap_or("") == expected.unwrap_or("")
    })
}

/// Compares a target catalog against a reference one, in target order.
///
/// Header entries and target entries with no counterpart in the reference
/// are skipped. Duplicate reference keys resolve to the last occurrence.
pub fn find_missing(
    reference: &[CatalogEntry],
    target: &[CatalogEntry],
) -> Vec<MissingTranslation> {
    let by_key: HashMap<EntryKey, &CatalogEntry> = reference
        .iter()
        .filter(|entry| !entry.is_header())
        .map(|entry| (entry.key(), entry))
        .collect();

    target
        .iter()
        .filter(|entry| !entry.is_header())
        .filter_map(|entry| {
            let reference_entry = by_key.get(&entry.key())?;
            is_missing_translation(reference_entry, entry).then(|| MissingTranslation {
                context: reference_entry.context.clone(),
                id: reference_entry.id.clone(),
                id_plural: reference_entry.id_plural.clone(),
                reference: reference_entry.translations.clone(),
                target: entry.translations.clone(),
            })
        })
        .collect()
}

pub fn render_report(
    missing: &[MissingTranslation],
    format: ReportFormat,
    labels: &ReportLabels,
) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(render_text(missing, labels)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(&JsonReport {
            count: missing.len(),
            missing,
        })?),
    }
}

pub fn render_text(missing: &[MissingTranslation], labels: &ReportLabels) -> String {
    if missing.is_empty() {
        return String::new();
    }
    let blocks = missing
        .iter()
        .map(|item| format_block(item, labels))
        .collect::<Vec<_>>();
    format!("{}\n", blocks.join("\n\n"))
}

fn format_block(item: &MissingTranslation, labels: &ReportLabels) -> String {
    let mut lines = vec![format!("msgid: {}", item.id)];
    if let Some(context) = &item.context {
        lines.push(format!("msgctxt: {}", context));
    }
    if let Some(plural) = &item.id_plural {
        lines.push(format!("msgid_plural: {}", plural));
        for (index, (expected, actual)) in item.reference.iter().zip(&item.target).enumerate() {
            lines.push(format!("{}.msgstr[{}]: {}", labels.reference, index, expected));
            lines.push(format!("{}.msgstr[{}]: {}", labels.target, index, actual));
        }
    } else {
        let first = |values: &[String]| values.first().cloned().unwrap_or_default();
        lines.push(format!("{}.msgstr: {}", labels.reference, first(&item.reference)));
        lines.push(format!("{}.msgstr: {}", labels.target, first(&item.target)));
    }
    lines.join("\n")
}
