use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub ocr: Option<OcrConfig>,
    pub render: Option<RenderConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrConfig {
    pub tessdata_dir: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    pub dpi: Option<u32>,
}

/// Platform config directory path: `<config_dir>/deedmerge/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("deedmerge").join("config.toml"))
}

/// Load config by cascading CWD `.deedmerge.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(&PathBuf::from(".deedmerge.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &PathBuf) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        ocr: Some(OcrConfig {
            tessdata_dir: overlay
                .ocr
                .as_ref()
                .and_then(|o| o.tessdata_dir.clone())
                .or_else(|| base.ocr.as_ref().and_then(|o| o.tessdata_dir.clone())),
            language: overlay
                .ocr
                .as_ref()
                .and_then(|o| o.language.clone())
                .or_else(|| base.ocr.as_ref().and_then(|o| o.language.clone())),
        }),
        render: Some(RenderConfig {
            dpi: overlay
                .render
                .as_ref()
                .and_then(|r| r.dpi)
                .or_else(|| base.render.as_ref().and_then(|r| r.dpi)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tessdata_dir_round_trip_toml() {
        let config = ConfigFile {
            ocr: Some(OcrConfig {
                tessdata_dir: Some("/usr/share/tessdata".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ConfigFile = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            parsed.ocr.unwrap().tessdata_dir.unwrap(),
            "/usr/share/tessdata"
        );
    }

    #[test]
    fn absent_sections_deserialize_as_none() {
        let toml_str = "[render]\ndpi = 300\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        assert!(parsed.ocr.is_none());
        assert_eq!(parsed.render.unwrap().dpi, Some(300));
    }

    #[test]
    fn merge_overlay_wins() {
        let base = ConfigFile {
            ocr: Some(OcrConfig {
                language: Some("eng".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            ocr: Some(OcrConfig {
                language: Some("eng+fra".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        assert_eq!(merged.ocr.unwrap().language.unwrap(), "eng+fra");
    }

    #[test]
    fn merge_base_preserved_when_overlay_absent() {
        let base = ConfigFile {
            render: Some(RenderConfig { dpi: Some(200) }),
            ..Default::default()
        };
        let merged = merge(base, ConfigFile::default());
        assert_eq!(merged.render.unwrap().dpi, Some(200));
    }
}
