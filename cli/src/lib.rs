use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use sticker::{Mode, OutputManifest, PipelineSettings, StickerError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StickerCliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    ImageError(#[from] image::ImageError),
    #[error(transparent)]
    Sticker(#[from] StickerError),
    #[error("Batch configuration has no jobs")]
    NoJobs,
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// One image to turn into stickers
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct JobConfig {
    /// Path to the source photo
    pub input: String,
    pub mode: Mode,
    /// Badge theme; the settings' default theme is used when unset
    pub theme: Option<String>,
    /// Caption for labeled mode; the captioner is asked when unset
    pub caption: Option<String>,
    pub output_dir: String,
    /// Base of the output file names; defaults to the input file stem
    pub name: Option<String>,
}

impl JobConfig {
    /// Slugged base name shared by every artifact of this job
    pub fn base_name(&self) -> String {
        let stem = self.name.clone().unwrap_or_else(|| {
            Path::new(&self.input)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        slug(&stem)
    }
}

/// Jobs sharing one set of pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BatchConfig {
    #[serde(default)]
    pub settings: PipelineSettings,
    pub jobs: Vec<JobConfig>,
}

impl BatchConfig {
    /// Load BatchConfig configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, StickerCliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load BatchConfig configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, StickerCliError> {
        let batch: BatchConfig = toml::from_str(content)?;
        batch.validate()?;
        Ok(batch)
    }

    /// Load BatchConfig configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StickerCliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load BatchConfig configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self, StickerCliError> {
        let batch: BatchConfig = serde_json::from_str(content)?;
        batch.validate()?;
        Ok(batch)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StickerCliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(StickerCliError::UnsupportedFileFormat),
        }
    }

    fn validate(&self) -> Result<(), StickerCliError> {
        if self.jobs.is_empty() {
            return Err(StickerCliError::NoJobs);
        }
        self.settings.validate()?;
        Ok(())
    }

    /// Save BatchConfig configuration to a TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), StickerCliError> {
        let content = self.to_toml()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert BatchConfig to TOML string
    pub fn to_toml(&self) -> Result<String, StickerCliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Save BatchConfig configuration to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), StickerCliError> {
        let content = self.to_json()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert BatchConfig to JSON string
    pub fn to_json(&self) -> Result<String, StickerCliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }
}

/// Load standalone pipeline settings (TOML or JSON) for the `generate` command
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<PipelineSettings, StickerCliError> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => {
            let settings: PipelineSettings = toml::from_str(&fs::read_to_string(path)?)?;
            settings.validate()?;
            Ok(settings)
        }
        Some("json") => Ok(PipelineSettings::from_json_file(path)?),
        _ => Err(StickerCliError::UnsupportedFileFormat),
    }
}

/// File-name-safe version of `name`: lowercase ASCII letters, digits and dashes
pub fn slug(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut in_gap = false;
    for c in lower.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
            in_gap = false;
        } else if !in_gap {
            out.push('-');
            in_gap = true;
        }
    }
    let trimmed: String = out.trim_matches('-').chars().take(60).collect();
    if trimmed.is_empty() {
        "sticker".to_string()
    } else {
        trimmed
    }
}

/// `<output_dir>/<base>_<role>.png` for each artifact
pub fn artifact_path(output_dir: &Path, base: &str, role: sticker::Role) -> PathBuf {
    output_dir.join(format!("{base}_{role}.png"))
}

/// Write every artifact of `manifest` as PNG, returning the written paths in order
pub fn save_manifest(
    manifest: &OutputManifest,
    output_dir: &Path,
    base: &str,
) -> Result<Vec<PathBuf>, StickerCliError> {
    fs::create_dir_all(output_dir)?;
    let mut written = Vec::with_capacity(manifest.len());
    for artifact in manifest.iter() {
        let path = artifact_path(output_dir, base, artifact.role);
        artifact.image.save_with_format(&path, image::ImageFormat::Png)?;
        written.push(path);
    }
    Ok(written)
}
