// Config file discovery
// Everything lives under <config dir>/lashpop/palette

use std::fs;
use std::path::{Path, PathBuf};

use lashpop_palette_engine::{PaletteConfig, PaletteError};

/// Root directory for palette files.
pub fn config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lashpop")
        .join("palette")
}

/// Directory used by the default `JsonFileStore`.
pub fn users_dir() -> PathBuf {
    config_root().join("users")
}

/// Optional ranking config (`palette.toml`).
pub fn palette_config_path() -> PathBuf {
    config_root().join("palette.toml")
}

/// Read and validate a ranking config file.
pub fn read_palette_config(path: &Path) -> Result<PaletteConfig, PaletteError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| PaletteError::ConfigRead(format!("{}: {}", path.display(), e)))?;
    PaletteConfig::from_toml(&contents)
}

/// Load `palette.toml` from the config dir, falling back to defaults
pub fn load_palette_config() -> PaletteConfig {
    load_palette_config_from(&palette_config_path())
}

/// Like `load_palette_config` for an explicit path. A missing file is
/// silent; an unreadable or invalid one is logged.
pub fn load_palette_config_from(path: &Path) -> PaletteConfig {
    if !path.exists() {
        return PaletteConfig::default();
    }
    match read_palette_config(path) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("using default palette config: {e}");
            PaletteConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_share_root() {
        let root = config_root();
        assert!(users_dir().starts_with(&root));
        assert_eq!(palette_config_path().file_name().unwrap(), "palette.toml");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_palette_config_from(&dir.path().join("nope.toml"));
        assert_eq!(config, PaletteConfig::default());
        assert!(matches!(
            read_palette_config(&dir.path().join("nope.toml")),
            Err(PaletteError::ConfigRead(_))
        ));
    }

    #[test]
    fn test_reads_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("palette.toml");
        fs::write(&path, "[weights]\nrecency = 80.0\n\n[session]\nwindow_secs = 120\n").unwrap();
        let config = load_palette_config_from(&path);
        assert_eq!(config.weights.recency, 80.0);
        assert_eq!(config.session.window_secs, 120);
        assert_eq!(config.weights.frequency, 100.0);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("palette.toml");
        fs::write(&path, "[tuning]\nrecency_half_life_hours = -1.0\n").unwrap();
        assert!(matches!(
            read_palette_config(&path),
            Err(PaletteError::ConfigValidation(_))
        ));
        assert_eq!(load_palette_config_from(&path), PaletteConfig::default());
    }
}
