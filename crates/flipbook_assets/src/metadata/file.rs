use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use thiserror::Error;

use super::{MetadataIssue, SpriteSheetMetadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataFormat {
    Json,
    Yaml,
}

impl MetadataFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Metadata rejected by strict decoding.
#[derive(Debug, Error)]
#[error("inconsistent sprite sheet metadata: {}", join(.issues))]
pub struct MetadataError {
    pub issues: Vec<MetadataIssue>,
}

fn join(issues: &[MetadataIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl SpriteSheetMetadata {
    pub fn decode_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn decode_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn decode(text: &str, format: MetadataFormat) -> Result<Self> {
        match format {
            MetadataFormat::Json => Self::decode_json(text),
            MetadataFormat::Yaml => Self::decode_yaml(text),
        }
    }

    /// Decodes metadata and rejects it if [`SpriteSheetMetadata::validate`] finds any issue.
    pub fn decode_strict(text: &str, format: MetadataFormat) -> Result<Self> {
        let metadata = Self::decode(text, format)?;
        let issues = metadata.validate();
        if !issues.is_empty() {
            return Err(MetadataError { issues }.into());
        }

        Ok(metadata)
    }

    /// Reads a metadata file, picking the format by its extension.
    /// Inconsistencies are only logged, playback clamps around them.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = MetadataFormat::from_path(path)
            .ok_or_else(|| anyhow!("unknown metadata format of {}", path.display()))?;
        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;

        let metadata = Self::decode(&text, format)
            .with_context(|| format!("unable to decode {}", path.display()))?;

        for issue in metadata.validate() {
            log::warn!("{}: {issue}", path.display());
        }

        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::AnimationClip;

    const JSON: &str = r#"{
        "frameWidth": 32,
        "frameHeight": 32,
        "columns": 4,
        "totalFrames": 16,
        "animations": {
            "walk": { "start": 0, "end": 3, "fps": 8 },
            "jump": { "start": 12, "end": 15, "fps": 10 }
        }
    }"#;

    const YAML: &str = "
frameWidth: 32
frameHeight: 32
columns: 4
totalFrames: 16
animations:
  walk: { start: 0, end: 3, fps: 8 }
  jump: { start: 12, end: 20, fps: 10 }
";

    #[test]
    fn test_decode_json() {
        let metadata = SpriteSheetMetadata::decode_json(JSON).unwrap();

        assert_eq!(metadata.frame_width, 32);
        assert_eq!(metadata.total_frames, 16);
        assert_eq!(metadata.clip("walk"), Some(&AnimationClip::new(0, 3, 8.)));
        assert_eq!(
            metadata.animations.keys().collect::<Vec<_>>(),
            vec!["walk", "jump"]
        );
    }

    #[test]
    fn test_decode_yaml_is_lenient() {
        let metadata = SpriteSheetMetadata::decode(YAML, MetadataFormat::Yaml).unwrap();
        assert_eq!(metadata.clip("jump"), Some(&AnimationClip::new(12, 20, 10.)));
    }

    #[test]
    fn test_strict_decode_rejects_issues() {
        assert!(SpriteSheetMetadata::decode_strict(JSON, MetadataFormat::Json).is_ok());

        let error = SpriteSheetMetadata::decode_strict(YAML, MetadataFormat::Yaml).unwrap_err();
        let error = error.downcast::<MetadataError>().unwrap();
        assert_eq!(
            error.issues,
            vec![MetadataIssue::ClipOutsideSheet {
                clip: "jump".into(),
                end: 20,
                total: 16
            }]
        );
    }

    #[test]
    fn test_missing_animations_default_to_empty() {
        let metadata = SpriteSheetMetadata::decode_json(
            r#"{"frameWidth": 8, "frameHeight": 8, "columns": 1, "totalFrames": 1}"#,
        )
        .unwrap();
        assert!(metadata.animations.is_empty());
    }

    #[test]
    fn test_format_from_path() {
        let format = |p: &str| MetadataFormat::from_path(&PathBuf::from(p));
        assert_eq!(format("sheet.json"), Some(MetadataFormat::Json));
        assert_eq!(format("a/b/sheet.YML"), Some(MetadataFormat::Yaml));
        assert_eq!(format("sheet.png"), None);
        assert_eq!(format("sheet"), None);
    }
}
