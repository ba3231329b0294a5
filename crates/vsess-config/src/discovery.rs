//! Config file discovery and layered merging.
//!
//! An explicit path (from `--config` or `VSESS_CONFIG`) is loaded on its own
//! and must exist. Otherwise layers are merged, later overriding earlier:
//! 1. `~/.config/vsess/config.toml` (XDG user config)
//! 2. `./vsess.toml` (project-local)

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{ConfigError, Result, VsessConfig};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "vsess.toml";

/// Default config filename within XDG config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "vsess";

/// Environment variable naming an explicit config file.
pub const CONFIG_FILE_ENV: &str = "VSESS_CONFIG";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: VsessConfig,
    /// Sources that were checked, in order of precedence (lowest first).
    pub sources: Vec<ConfigSource>,
    /// Warnings generated during loading (e.g., plaintext passwords).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Get paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration from `explicit`, `VSESS_CONFIG`, or the default
/// layers.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let from_env = std::env::var(CONFIG_FILE_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);
    let explicit = explicit.map(Path::to_path_buf).or(from_env);
    load_config_with_options(explicit.as_deref(), None, None)
}

/// Load configuration with explicit control over every location.
///
/// `config_dir` replaces the XDG directory and `project_dir` the current
/// directory; both are ignored when `explicit` is given.
pub fn load_config_with_options(
    explicit: Option<&Path>,
    config_dir: Option<&Path>,
    project_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut warnings = Vec::new();

    if let Some(path) = explicit {
        let config = load_config_file(path)?;
        debug!(path = %path.display(), "loaded config file");
        check_plaintext_password(&config, &mut warnings);
        return Ok(LoadedConfig {
            config,
            sources: vec![ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }],
            warnings,
        });
    }

    let mut config = VsessConfig::new();
    let mut sources = Vec::new();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    check_plaintext_password(&config, &mut warnings);

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<VsessConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    VsessConfig::from_toml(&contents)
}

/// Get the XDG config file path for vsess.
pub fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME).join(USER_CONFIG_FILE))
}

/// Try to load a config file and merge it into the existing config.
///
/// Unreadable or invalid files become warnings rather than errors.
fn load_layer(config: &mut VsessConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    let loaded = path.is_file()
        && match load_config_file(path) {
            Ok(layer) => {
                config.merge(layer);
                debug!(path = %path.display(), "loaded config layer");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping config layer");
                warnings.push(format!("Failed to load {}: {}", path.display(), e));
                false
            }
        };
    ConfigSource {
        path: path.to_path_buf(),
        loaded,
    }
}

fn check_plaintext_password(config: &VsessConfig, warnings: &mut Vec<String>) {
    if config
        .vcenter
        .as_ref()
        .is_some_and(|v| v.has_plaintext_password())
    {
        warnings.push(
            "[vcenter] contains a plaintext password. \
             Consider password_env or VSESS_PASSWORD instead."
                .to_string(),
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_xdg_config_path() {
        if let Some(p) = xdg_config_path() {
            assert!(p.ends_with("vsess/config.toml"));
        }
    }

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is not valid toml {{{{").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = load_config_with_options(Some(&missing), None, None).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_explicit_path_skips_layers() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("explicit.toml");
        fs::write(&explicit, "[vcenter]\nserver = \"explicit\"\nusername = \"u\"\n").unwrap();
        fs::write(
            dir.path().join("vsess.toml"),
            "[vcenter]\nserver = \"project\"\nusername = \"u\"\n",
        )
        .unwrap();

        let loaded =
            load_config_with_options(Some(&explicit), Some(dir.path()), Some(dir.path())).unwrap();
        assert_eq!(loaded.config.vcenter().unwrap().server, "explicit");
        assert_eq!(loaded.loaded_from(), vec![explicit.as_path()]);
    }

    #[test]
    fn test_load_config_no_files() {
        let dir = TempDir::new().unwrap();
        let empty_config_dir = TempDir::new().unwrap();
        let loaded =
            load_config_with_options(None, Some(empty_config_dir.path()), Some(dir.path()))
                .unwrap();
        assert!(loaded.config.vcenter.is_none());
        assert!(loaded.loaded_from().is_empty());
        assert_eq!(loaded.sources.len(), 2);
    }

    #[test]
    fn test_layered_merge() {
        let xdg_dir = TempDir::new().unwrap();
        let project_dir = TempDir::new().unwrap();
        fs::write(
            xdg_dir.path().join("config.toml"),
            r#"
[vcenter]
server = "vc.example.com"
username = "admin"

[tls]
insecure = true
"#,
        )
        .unwrap();
        fs::write(
            project_dir.path().join("vsess.toml"),
            r#"
[vcenter]
server = "vc.lab.local"
username = "lab"
datacenter = "Lab"
"#,
        )
        .unwrap();

        let loaded =
            load_config_with_options(None, Some(xdg_dir.path()), Some(project_dir.path())).unwrap();

        let vcenter = loaded.config.vcenter().unwrap();
        assert_eq!(vcenter.server, "vc.lab.local");
        assert_eq!(vcenter.datacenter, "Lab");
        assert!(loaded.config.tls_trust().unwrap().is_insecure());
        assert_eq!(loaded.loaded_from().len(), 2);
    }

    #[test]
    fn test_invalid_layer_is_warning() {
        let xdg_dir = TempDir::new().unwrap();
        let project_dir = TempDir::new().unwrap();
        fs::write(xdg_dir.path().join("config.toml"), "not = [valid").unwrap();

        let loaded =
            load_config_with_options(None, Some(xdg_dir.path()), Some(project_dir.path())).unwrap();
        assert!(loaded.loaded_from().is_empty());
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("Failed to load"));
    }

    #[test]
    fn test_plaintext_password_warning() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vsess.toml");
        fs::write(
            &path,
            "[vcenter]\nserver = \"vc\"\nusername = \"u\"\npassword = \"hunter2\"\n",
        )
        .unwrap();

        let loaded = load_config_with_options(Some(&path), None, None).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("plaintext password"));
        assert!(!loaded.warnings[0].contains("hunter2"));
    }
}
