/// Configuration for the retirement tool
///
/// Layered, lowest precedence first:
/// 1. Defaults (from code)
/// 2. Config file (flagkit.toml)
/// 3. Environment variables (FLAGKIT_* prefix, `__` for nesting)
///
/// # Example
///
/// ```no_run
/// use flagkit_codemod::config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_file("./flagkit.toml")
///     .load()
///     .expect("Failed to load config");
/// assert!(!config.search.extensions.is_empty());
/// ```
pub mod error;
pub mod loader;

pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, GitConfig, RegistryConfig, SearchConfig, ToolConfig};
