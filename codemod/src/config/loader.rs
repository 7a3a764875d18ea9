use crate::config::error::{ConfigError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root tool configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Where the flag registry source lives and how it is declared
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Which files are scanned for call sites
    #[serde(default)]
    pub search: SearchConfig,

    /// Branch, commit and push settings
    #[serde(default)]
    pub git: GitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry source file, relative to the repo root
    #[serde(default = "default_registry_path")]
    pub path: PathBuf,

    /// Name of the union type that enumerates flag ids
    #[serde(default = "default_union_type")]
    pub union_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Directories to scan, relative to the repo root
    #[serde(default = "default_search_roots")]
    pub roots: Vec<PathBuf>,

    /// File extensions to scan (without the dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Branch every retirement branch is cut from
    #[serde(default = "default_trunk")]
    pub trunk: String,

    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,

    /// `{flag}` is replaced with the flag id
    #[serde(default = "default_commit_template")]
    pub commit_template: String,

    /// Push the branch after committing
    #[serde(default = "default_true")]
    pub push: bool,
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("src/config/featureFlags.ts")
}
fn default_union_type() -> String {
    "FeatureFlagName".to_string()
}
fn default_search_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("src")]
}
fn default_extensions() -> Vec<String> {
    ["ts", "tsx", "js", "jsx"]
        .iter()
        .map(|ext| (*ext).to_string())
        .collect()
}
fn default_trunk() -> String {
    "main".to_string()
}
fn default_remote() -> String {
    "origin".to_string()
}
fn default_branch_prefix() -> String {
    "chore/remove-flag-".to_string()
}
fn default_commit_template() -> String {
    "chore: remove expired feature flag {flag}".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
            union_type: default_union_type(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            roots: default_search_roots(),
            extensions: default_extensions(),
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            trunk: default_trunk(),
            remote: default_remote(),
            branch_prefix: default_branch_prefix(),
            commit_template: default_commit_template(),
            push: default_true(),
        }
    }
}

impl ToolConfig {
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.search.roots.is_empty() {
            problems.push("search.roots must not be empty");
        }
        if self.search.extensions.is_empty() {
            problems.push("search.extensions must not be empty");
        }
        if !self.git.commit_template.contains("{flag}") {
            problems.push("git.commit_template must contain {flag}");
        }
        if self.git.trunk.trim().is_empty() {
            problems.push("git.trunk must not be empty");
        }
        if self.registry.union_type.trim().is_empty() {
            problems.push("registry.union_type must not be empty");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(problems.join("; ")))
        }
    }
}

/// Configuration loader with layered merging support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration with layered merging:
    /// 1. Start with defaults (from Default implementations)
    /// 2. Merge config file if provided
    /// 3. Override with environment variables (FLAGKIT_ prefix)
    pub fn load(&self) -> Result<ToolConfig> {
        let mut builder = Config::builder();

        let defaults = ToolConfig::default();
        let defaults_json = serde_json::to_string(&defaults)?;
        builder = builder.add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        if let Some(ref path) = self.config_path {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_ref()));
            } else {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
        }

        // Example: FLAGKIT_GIT__PUSH=false, FLAGKIT_SEARCH__ROOTS=src,app
        builder = builder.add_source(
            Environment::with_prefix("FLAGKIT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("search.roots")
                .with_list_parse_key("search.extensions"),
        );

        let config = builder.build()?;
        let tool_config: ToolConfig = config.try_deserialize()?;
        tool_config.validate()?;

        Ok(tool_config)
    }

    /// Locate the config file in standard locations:
    /// 1. `<cwd>/flagkit.toml`
    /// 2. XDG config: `~/.config/flagkit/config.toml`
    pub fn find_config_file(cwd: &Path) -> Option<PathBuf> {
        let local = cwd.join("flagkit.toml");
        if local.exists() {
            return Some(local);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("flagkit").join("config.toml");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }

        None
    }

    /// Load from `explicit` if given, else from the default locations.
    pub fn load_for(cwd: &Path, explicit: Option<&Path>) -> Result<ToolConfig> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| Self::find_config_file(cwd));
        match path {
            Some(path) => ConfigLoader::new().with_file(path).load(),
            None => ConfigLoader::new().load(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = ToolConfig::default();
        assert_eq!(config.registry.path, PathBuf::from("src/config/featureFlags.ts"));
        assert_eq!(config.registry.union_type, "FeatureFlagName");
        assert_eq!(config.search.roots, vec![PathBuf::from("src")]);
        assert_eq!(config.search.extensions, vec!["ts", "tsx", "js", "jsx"]);
        assert_eq!(config.git.trunk, "main");
        assert_eq!(config.git.remote, "origin");
        assert!(config.git.push);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_load_with_defaults_only() {
        let config = ConfigLoader::new().load().expect("Failed to load default config");
        assert_eq!(config.git.branch_prefix, "chore/remove-flag-");
    }

    #[test]
    #[serial]
    fn test_load_with_toml_file() {
        let toml_content = r#"
[registry]
path = "app/flags.ts"

[search]
roots = ["app", "packages"]
extensions = ["ts"]

[git]
trunk = "develop"
push = false
"#;
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("flagkit.toml");
        std::fs::write(&config_path, toml_content).expect("Failed to write temp file");

        let config = ConfigLoader::new()
            .with_file(&config_path)
            .load()
            .expect("Failed to load config");

        assert_eq!(config.registry.path, PathBuf::from("app/flags.ts"));
        assert_eq!(config.registry.union_type, "FeatureFlagName");
        assert_eq!(
            config.search.roots,
            vec![PathBuf::from("app"), PathBuf::from("packages")]
        );
        assert_eq!(config.search.extensions, vec!["ts"]);
        assert_eq!(config.git.trunk, "develop");
        assert!(!config.git.push);
        assert_eq!(config.git.remote, "origin");
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("flagkit.toml");
        std::fs::write(&config_path, "[git]\npush = true\ntrunk = \"develop\"\n")
            .expect("Failed to write temp file");

        unsafe {
            env::set_var("FLAGKIT_GIT__PUSH", "false");
            env::set_var("FLAGKIT_SEARCH__EXTENSIONS", "ts,tsx");
        }

        let config = ConfigLoader::new().with_file(&config_path).load();

        unsafe {
            env::remove_var("FLAGKIT_GIT__PUSH");
            env::remove_var("FLAGKIT_SEARCH__EXTENSIONS");
        }

        let config = config.expect("Failed to load config");
        assert!(!config.git.push);
        assert_eq!(config.git.trunk, "develop");
        assert_eq!(config.search.extensions, vec!["ts", "tsx"]);
    }

    #[test]
    fn test_missing_file_error() {
        let result = ConfigLoader::new()
            .with_file("/nonexistent/flagkit.toml")
            .load();
        assert!(matches!(result.unwrap_err(), ConfigError::FileNotFound(_)));
    }

    #[test]
    #[serial]
    fn test_invalid_commit_template_rejected() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("flagkit.toml");
        std::fs::write(&config_path, "[git]\ncommit_template = \"remove flag\"\n")
            .expect("Failed to write temp file");

        let err = ConfigLoader::new()
            .with_file(&config_path)
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("commit_template"));
    }

    #[test]
    fn test_find_config_file_prefers_cwd() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let local = temp_dir.path().join("flagkit.toml");
        std::fs::write(&local, "").expect("Failed to write temp file");
        assert_eq!(ConfigLoader::find_config_file(temp_dir.path()), Some(local));
    }
}
