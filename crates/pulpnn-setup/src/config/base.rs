use super::{LoggerConfig, SetupConfig, SetupLogLevel, TargetConfig};
use crate::{ConfigError, LoadError, kernel::KernelType};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

/// Static mutex holding the global configuration, initialized as `None`.
static PULPNN_GLOBAL_CONFIG: spin::Mutex<Option<Arc<GlobalConfig>>> = spin::Mutex::new(None);

/// File names searched for by [GlobalConfig::get], in order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["pulpnn_setup.toml", "PulpNN.toml"];

/// Log file used when `PULPNN_DEBUG_LOG` is set to `1` or `true`.
pub const DEFAULT_LOG_FILE: &str = "/tmp/pulpnn_setup.log";

/// Represents the global configuration of a generation run: the layer setup, the target
/// cluster and the logging settings.
#[derive(Default, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Kernel and layer parameters.
    #[serde(default)]
    pub setup: SetupConfig,

    /// Target cluster description.
    #[serde(default)]
    pub target: TargetConfig,

    /// Configuration for logging the generation plan.
    #[serde(default)]
    pub logger: LoggerConfig,
}

impl GlobalConfig {
    /// Retrieves the current global configuration, loading it from the current directory if not set.
    ///
    /// If no configuration is set, it attempts to load one from `pulpnn_setup.toml` or
    /// `PulpNN.toml` in the current directory or its parents, then applies the environment
    /// overrides. If no file is found, a default configuration is used.
    ///
    /// A configuration that fails to load is not cached, so the next call tries again.
    pub fn get() -> Result<Arc<Self>, LoadError> {
        let mut state = PULPNN_GLOBAL_CONFIG.lock();
        if let Some(config) = state.as_ref() {
            return Ok(config.clone());
        }

        let config = Self::from_current_dir()?.override_from_env();
        config.validate()?;
        config.setup.log_warnings();

        let config = Arc::new(config);
        *state = Some(config.clone());
        Ok(config)
    }

    /// Sets the global configuration to the provided value.
    ///
    /// This method must be called at the start of the program, before any calls to `get`.
    /// Setting the configuration after it has been initialized returns [LoadError::AlreadySet].
    pub fn set(config: Self) -> Result<(), LoadError> {
        config.validate()?;

        let mut state = PULPNN_GLOBAL_CONFIG.lock();
        if state.is_some() {
            return Err(LoadError::AlreadySet);
        }
        config.setup.log_warnings();
        *state = Some(Arc::new(config));
        Ok(())
    }

    /// Checks the setup and the target.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.setup.validate()?;
        self.target.validate()
    }

    /// Save the default configuration to the provided file path.
    pub fn save_default<P: AsRef<Path>>(path: P) -> Result<(), LoadError> {
        Self::default().save(path)
    }

    /// Save this configuration to the provided file path.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), LoadError> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Serializes the configuration as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, LoadError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Parses and validates a TOML configuration.
    pub fn from_toml_str(content: &str) -> Result<Self, LoadError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        config.setup.log_warnings();
        Ok(config)
    }

    /// Loads configuration from a specified file path.
    pub fn from_file_path<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loading configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Loads configuration from `pulpnn_setup.toml` or `PulpNN.toml` in the current directory
    /// or its parents.
    ///
    /// Traverses up the directory tree until a configuration file is found or the root is
    /// reached. Returns a default configuration if no file is found.
    pub fn from_current_dir() -> Result<Self, LoadError> {
        let dir = std::env::current_dir().map_err(|source| LoadError::Io {
            path: PathBuf::from("."),
            source,
        })?;

        match Self::find_file(&dir) {
            Some(path) => Self::from_file_path(path),
            None => Ok(Self::default()),
        }
    }

    /// Returns the first configuration file found in `dir` or its parents.
    pub fn find_file(dir: &Path) -> Option<PathBuf> {
        dir.ancestors().find_map(|dir| {
            CONFIG_FILE_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|path| path.is_file())
        })
    }

    /// Overrides configuration fields based on environment variables.
    ///
    /// Values that can't be parsed are ignored with a warning.
    pub fn override_from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("PULPNN_SINGLE_KERNEL") {
            match val.as_str() {
                "1" | "true" => self.setup.single_kernel_mode = true,
                "0" | "false" => self.setup.single_kernel_mode = false,
                other => log::warn!("Ignoring PULPNN_SINGLE_KERNEL={other}"),
            }
        }

        if let Ok(val) = std::env::var("PULPNN_KERNEL_TYPE") {
            match val.parse::<KernelType>() {
                Ok(kernel_type) => self.setup.kernel_type = kernel_type,
                Err(err) => log::warn!("Ignoring PULPNN_KERNEL_TYPE: {err}"),
            }
        }

        if let Ok(val) = std::env::var("PULPNN_NUM_CORES") {
            match val.parse::<u32>() {
                Ok(num_cores) => self.target.num_cores = num_cores,
                Err(_) => log::warn!("Ignoring PULPNN_NUM_CORES={val}"),
            }
        }

        if let Ok(val) = std::env::var("PULPNN_DEBUG_LOG") {
            self.logger.level = SetupLogLevel::Full;

            match val.as_str() {
                "stdout" => self.logger.stdout = true,
                "stderr" => self.logger.stderr = true,
                "1" | "true" => self.logger.file = Some(DEFAULT_LOG_FILE.into()),
                "0" | "false" => self.logger.level = SetupLogLevel::Disabled,
                file_path => self.logger.file = Some(file_path.into()),
            }
        }

        self
    }
}
