//! Configuration loading and root folder resolution
//!
//! Every service resolves one root folder holding callboard.db and static
//! assets. Resolution priority: command-line argument, then environment
//! variable, then TOML config file, then the compiled per-platform default.
//! A missing config file is never fatal; services fall back and start.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "CALLBOARD_ROOT_FOLDER";
/// Legacy environment variable, still honored
pub const ROOT_FOLDER_ENV_LEGACY: &str = "CALLBOARD_ROOT";

/// Compiled per-platform defaults used when no configuration is present
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub static_assets_path: PathBuf,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was compiled for
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(target_os = "linux") {
            dirs::data_local_dir()
                .map(|d| d.join("callboard"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/callboard"))
        } else if cfg!(target_os = "macos") {
            dirs::data_dir()
                .map(|d| d.join("callboard"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/callboard"))
        } else if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .map(|d| d.join("callboard"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\callboard"))
        } else {
            PathBuf::from("./callboard_data")
        };

        CompiledDefaults {
            static_assets_path: root_folder.join("static"),
            root_folder,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Logging section of the TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

/// TOML config file schema
///
/// Loaded from ~/.config/callboard/config.toml (user) or
/// /etc/callboard/config.toml (system) on Linux; platform config dirs
/// elsewhere. All fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Load the config file if one exists; missing or malformed files
    /// degrade to defaults with a warning
    pub fn load() -> Self {
        let Some(path) = Self::locate() else {
            return TomlConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<TomlConfig>(&contents) {
                Ok(config) => {
                    info!("Loaded config file: {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring malformed config file {}: {}", path.display(), e);
                    TomlConfig::default()
                }
            },
            Err(e) => {
                warn!("Could not read config file {}: {}", path.display(), e);
                TomlConfig::default()
            }
        }
    }

    /// Find the first existing config file for this platform
    fn locate() -> Option<PathBuf> {
        let user_config = dirs::config_dir().map(|d| d.join("callboard").join("config.toml"));

        if let Some(path) = user_config {
            if path.exists() {
                return Some(path);
            }
        }

        if cfg!(target_os = "linux") {
            let system_config = PathBuf::from("/etc/callboard/config.toml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }
}

/// Resolves the root folder for a service using the documented priority
/// order. The module name is only used for log attribution.
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        RootFolderResolver {
            module_name: module_name.to_string(),
            cli_arg: None,
        }
    }

    /// Provide a command-line override (highest priority)
    pub fn with_cli_arg(mut self, arg: Option<PathBuf>) -> Self {
        self.cli_arg = arg;
        self
    }

    /// Resolve the root folder
    pub fn resolve(&self) -> PathBuf {
        // Priority 1: command-line argument
        if let Some(path) = &self.cli_arg {
            info!("{}: root folder from command line: {}", self.module_name, path.display());
            return path.clone();
        }

        // Priority 2: environment variable
        for var in [ROOT_FOLDER_ENV, ROOT_FOLDER_ENV_LEGACY] {
            if let Ok(path) = std::env::var(var) {
                if !path.is_empty() {
                    info!("{}: root folder from {}: {}", self.module_name, var, path);
                    return PathBuf::from(path);
                }
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = TomlConfig::load().root_folder {
            info!("{}: root folder from config file: {}", self.module_name, path.display());
            return path;
        }

        // Priority 4: compiled per-platform default
        let default = CompiledDefaults::for_current_platform().root_folder;
        info!("{}: root folder defaulted to {}", self.module_name, default.display());
        default
    }
}

/// Prepares a resolved root folder for use
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        RootFolderInitializer { root_folder }
    }

    /// Create the root folder if it does not exist
    pub fn ensure_directory_exists(&self) -> crate::Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    /// Path of the shared database file under the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join("callboard.db")
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }
}
