// Global configuration management

use crate::engine::{
    CRF_RANGE, ConfigState, Container, DEFAULT_BITRATE_KBPS, DEFAULT_CRF, DEFAULT_NORMALIZE_DB,
    EncoderEnv, Event, ImageFormat, ProfileStore,
};
use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ffmpeg: FfmpegConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FfmpegConfig {
    /// ffmpeg executable name or path
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Value passed to `-loglevel`
    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    /// `-threads N`, omitted when unset
    #[serde(default)]
    pub threads: Option<u32>,

    /// `-cpu-used N` (libvpx speed), omitted when unset
    #[serde(default)]
    pub cpu_used: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Container id selected when a session opens (see `ffconv plan --help`)
    #[serde(default = "default_container")]
    pub container: String,

    #[serde(default = "default_crf")]
    pub crf: u32,

    /// kbit/s
    #[serde(default = "default_bitrate")]
    pub bitrate: u32,

    /// Peak level target for audio normalization, in dB
    #[serde(default = "default_normalize_threshold")]
    pub normalize_threshold: f64,

    /// Overwrite existing output files
    #[serde(default)]
    pub overwrite: bool,

    #[serde(default = "default_image_format")]
    pub image_format: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Profile store directory; platform config dir when unset
    #[serde(default)]
    pub profiles_dir: Option<PathBuf>,

    /// Where plan logs are appended; no plan log when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_binary() -> String {
    "ffmpeg".to_string()
}

fn default_loglevel() -> String {
    EncoderEnv::default().loglevel
}

fn default_container() -> String {
    Container::default().id().to_string()
}

fn default_crf() -> u32 {
    DEFAULT_CRF
}

fn default_bitrate() -> u32 {
    DEFAULT_BITRATE_KBPS
}

fn default_normalize_threshold() -> f64 {
    DEFAULT_NORMALIZE_DB
}

fn default_image_format() -> String {
    ImageFormat::default().extension().to_string()
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            loglevel: default_loglevel(),
            threads: None,
            cpu_used: None,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            container: default_container(),
            crf: default_crf(),
            bitrate: default_bitrate(),
            normalize_threshold: default_normalize_threshold(),
            overwrite: false,
            image_format: default_image_format(),
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("ffconv");
        Ok(config_dir.join("config.toml"))
    }

    /// Load config from disk, falling back to defaults when there is no file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            return Ok(Config::default());
        }
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    pub fn encoder_env(&self) -> EncoderEnv {
        EncoderEnv {
            loglevel: self.ffmpeg.loglevel.clone(),
            threads: self.ffmpeg.threads,
            cpu_used: self.ffmpeg.cpu_used,
        }
    }

    pub fn profile_store(&self) -> Result<ProfileStore> {
        let dir = match &self.paths.profiles_dir {
            Some(dir) => dir.clone(),
            None => ProfileStore::default_dir().context("Could not determine config directory")?,
        };
        Ok(ProfileStore::new(dir))
    }

    /// Session state seeded from the `[defaults]` section
    pub fn initial_state(&self) -> Result<ConfigState> {
        let container = Container::from_id(&self.defaults.container)
            .ok_or_else(|| anyhow!("Unknown default container '{}'", self.defaults.container))?;

        if !CRF_RANGE.contains(&self.defaults.crf) {
            bail!(
                "Invalid [defaults] in config: crf must be between {} and {}, got {}",
                CRF_RANGE.start(),
                CRF_RANGE.end(),
                self.defaults.crf
            );
        }
        if self.defaults.bitrate == 0 {
            bail!("Invalid [defaults] in config: bitrate must be greater than 0");
        }

        let mut state = ConfigState::new(self.defaults.crf, self.defaults.bitrate);
        state
            .apply_all([
                Event::ContainerSelected(container),
                Event::NormalizeThresholdChanged(self.defaults.normalize_threshold),
            ])
            .context("Invalid [defaults] in config")?;
        Ok(state)
    }

    pub fn image_format(&self) -> Result<ImageFormat> {
        ImageFormat::from_id(&self.defaults.image_format)
            .ok_or_else(|| anyhow!("Unknown default image format '{}'", self.defaults.image_format))
    }
}
