//! Round-trip checks over a directory of field files or an `flevel.lgp`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use crate::background::BackgroundFile;
use crate::encounter::EncounterFile;
use crate::error::CodecError;
use crate::field_file::{FieldFile, SectionKind};
use crate::lgp::LgpArchive;
use crate::script::{decode_script, encode_script, insert_labels, resolve_labels};
use crate::section1::Section1;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("settings file is invalid: {0}")]
    Settings(#[from] serde_json::Error),
    #[error("{context}: {source}")]
    Codec {
        context: String,
        #[source]
        source: CodecError,
    },
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, VerifyError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifySettings {
    /// A directory of field files, or an LGP archive.
    pub input_path: PathBuf,
    /// Field files are LZS-compressed, as stored in `flevel.lgp`.
    pub compressed: bool,
    pub check_scripts: bool,
    pub check_encounters: bool,
    pub check_backgrounds: bool,
    /// Only fields whose name contains this string.
    pub filter: Option<String>,
}

impl Default for VerifySettings {
    fn default() -> Self {
        VerifySettings {
            input_path: PathBuf::new(),
            compressed: true,
            check_scripts: true,
            check_encounters: true,
            check_backgrounds: true,
            filter: None,
        }
    }
}

impl VerifySettings {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldReport {
    pub name: String,
    pub scripts_checked: usize,
    pub scripts_failed: usize,
    pub encounter_ok: Option<bool>,
    pub tiles: Option<usize>,
    pub errors: Vec<String>,
}

impl FieldReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    pub fields: Vec<FieldReport>,
    pub skipped: Vec<String>,
}

impl VerifyReport {
    pub fn failed(&self) -> usize {
        self.fields.iter().filter(|f| !f.is_ok()).count()
    }

    pub fn summary(&self) -> String {
        let scripts: usize = self.fields.iter().map(|f| f.scripts_checked).sum();
        let bad_scripts: usize = self.fields.iter().map(|f| f.scripts_failed).sum();
        format!(
            "fields: {} ({} failed, {} skipped), scripts: {} ({} failed)",
            self.fields.len(),
            self.failed(),
            self.skipped.len(),
            scripts,
            bad_scripts
        )
    }
}

pub fn run_verify(settings: &VerifySettings) -> Result<VerifyReport> {
    let input = &settings.input_path;
    if !input.exists() {
        return Err(VerifyError::Config(format!(
            "Input path does not exist: {}",
            input.display()
        )));
    }

    let mut report = VerifyReport::default();
    let wanted = |name: &str| settings.filter.as_deref().map_or(true, |f| name.contains(f));

    if input.is_file() {
        let raw = fs::read(input)?;
        let archive = LgpArchive::parse(&raw).map_err(|source| VerifyError::Codec {
            context: input.display().to_string(),
            source,
        })?;
        log::info!("{}: {} entries", input.display(), archive.entries.len());
        for entry in &archive.entries {
            if !wanted(&entry.name) {
                continue;
            }
            match archive.data(entry) {
                Ok(data) => verify_entry(settings, &entry.name, data, &mut report),
                Err(err) => report.fields.push(FieldReport {
                    name: entry.name.clone(),
                    errors: vec![err.to_string()],
                    ..FieldReport::default()
                }),
            }
        }
    } else {
        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !wanted(&name) {
                continue;
            }
            let data = fs::read(entry.path())?;
            verify_entry(settings, &name, &data, &mut report);
        }
    }

    log::info!("{}", report.summary());
    Ok(report)
}

fn verify_entry(settings: &VerifySettings, name: &str, data: &[u8], report: &mut VerifyReport) {
    let parsed = if settings.compressed {
        FieldFile::from_compressed(data)
    } else {
        FieldFile::parse(data)
    };
    match parsed {
        Ok(field) => report.fields.push(verify_field(settings, name, &field)),
        Err(err) => {
            // flevel.lgp also holds non-field entries such as maplist.
            log::debug!("{name}: not a field ({err})");
            report.skipped.push(name.to_string());
        }
    }
}

/// Check one field's sections. Failures are collected, never fatal.
pub fn verify_field(settings: &VerifySettings, name: &str, field: &FieldFile) -> FieldReport {
    let mut report = FieldReport {
        name: name.to_string(),
        ..FieldReport::default()
    };

    if settings.check_scripts {
        check_scripts(field, &mut report);
    }

    if settings.check_encounters {
        let data = field.section(SectionKind::Encounter);
        let ok = match EncounterFile::open(data) {
            Ok(encounters) => encounters.save() == data,
            Err(err) => {
                report.errors.push(format!("encounters: {err}"));
                false
            }
        };
        report.encounter_ok = Some(ok);
    }

    if settings.check_backgrounds {
        let mut background = BackgroundFile::new(field.section(SectionKind::Background).to_vec());
        match background.open(field.section(SectionKind::Palette)) {
            Ok(decoded) => report.tiles = Some(decoded.tiles.len()),
            Err(err) => report.errors.push(format!("background: {err}")),
        }
    }

    if !report.is_ok() {
        log::warn!("{name}: {} problem(s)", report.errors.len());
    }
    report
}

fn check_scripts(field: &FieldFile, report: &mut FieldReport) {
    let section = match Section1::parse(field.section(SectionKind::Scripts)) {
        Ok(section) => section,
        Err(err) => {
            report.errors.push(format!("section 1: {err}"));
            return;
        }
    };

    for (entity, index, bytes) in section.scripts() {
        report.scripts_checked += 1;
        if let Err(err) = bytes.and_then(round_trip_script) {
            report.scripts_failed += 1;
            let entity_name = &section.entities[entity].name;
            report.errors.push(format!("script {entity_name}/{index}: {err}"));
        }
    }
}

/// Decode, go through labels and back, and compare with the original bytes.
pub fn round_trip_script(bytes: &[u8]) -> std::result::Result<(), CodecError> {
    let opcodes = decode_script(bytes)?;
    let resolved = resolve_labels(&insert_labels(&opcodes)?)?;
    let encoded = encode_script(&resolved)?;
    if encoded != bytes {
        return Err(CodecError::MalformedSize {
            what: "re-encoded script",
            expected: bytes.len(),
            actual: encoded.len(),
        });
    }
    Ok(())
}
