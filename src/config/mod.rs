use crate::models::{Project, Settings};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// File name of the settings file inside the configuration directory.
pub const SETTINGS_FILE: &str = "simlink.yaml";

/// Prefix of environment overrides, e.g. `SIMLINK__EXECUTION__TICK_INTERVAL_MS=20`.
pub const ENV_PREFIX: &str = "SIMLINK";

/// Configuration manager for loading and saving settings.
///
/// Settings are layered: built-in defaults, then `simlink.yaml`, then `SIMLINK__*`
/// environment variables.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE),
            config_dir,
        })
    }

    /// Load settings from the settings file and the environment.
    ///
    /// A missing file is not an error; defaults apply to everything it would set.
    pub fn load_settings(&self) -> Result<Settings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(self.settings_path.as_std_path()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize::<Settings>()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!("Loaded settings from {}", self.settings_path);
        Ok(settings)
    }

    /// Save settings to the settings file.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Load a project snapshot written by [`save_project`](Self::save_project).
    pub fn load_project<P: AsRef<Utf8Path>>(&self, path: P) -> Result<Project> {
        let path = path.as_ref();
        let file_contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read project: {}", path))?;

        let project: Project = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse project: {}", path))?;

        tracing::info!(
            "Loaded project \"{}\" with {} config file(s) from {}",
            project.name,
            project.config_files.len(),
            path
        );
        Ok(project)
    }

    /// Write a project snapshot as YAML.
    pub fn save_project<P: AsRef<Utf8Path>>(&self, project: &Project, path: P) -> Result<()> {
        let path = path.as_ref();
        let yaml_string =
            serde_yaml_ng::to_string(project).context("Failed to serialize project to YAML")?;

        fs::write(path, yaml_string).with_context(|| format!("Failed to write project: {}", path))?;

        tracing::info!("Saved project to {}", path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}
