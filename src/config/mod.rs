//! Application configuration.
//!
//! Every value has a default, so an empty file (or [`Config::default`]) yields a
//! working application. Files are TOML:
//!
//! ```toml
//! mode = "development"
//!
//! [controller]
//! suffix = "Controller"
//!
//! [csrf]
//! mask_length = 12
//!
//! [resources]
//! "/static" = "public"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Smallest CSRF mask accepted; shorter values are raised to this.
pub const MIN_CSRF_MASK_LENGTH: usize = 8;

/// Errors produced while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("action prefix and action suffix cannot both be empty")]
    EmptyActionConvention,

    #[error("session name cannot be empty while sessions are enabled")]
    EmptySessionName,

    #[error("CSRF validation depends on sessions; enable sessions or disable CSRF validation")]
    CsrfWithoutSession,

    #[error("CSRF parameter `{0}` cannot be empty")]
    EmptyCsrfParam(&'static str),
}

/// Serving mode. Development adds fault details to error pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[serde(alias = "dev", alias = "DEV")]
    Development,
    #[default]
    #[serde(alias = "prod", alias = "pro", alias = "PRO")]
    Production,
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub name: String,
    pub mode: Mode,
    /// Root that relative view and resource directories are resolved against.
    pub base_path: PathBuf,
    pub controller: ControllerConfig,
    pub action: ActionConfig,
    pub view: ViewConfig,
    pub session: SessionConfig,
    pub csrf: CsrfConfig,
    pub router: RouterConfig,
    /// Static directories served on every host, keyed by route prefix.
    pub resources: BTreeMap<String, PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "rttp-mvc application".to_owned(),
            mode: Mode::Production,
            base_path: PathBuf::from("."),
            controller: ControllerConfig::default(),
            action: ActionConfig::default(),
            view: ViewConfig::default(),
            session: SessionConfig::default(),
            csrf: CsrfConfig::default(),
            router: RouterConfig::default(),
            resources: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub prefix: String,
    pub suffix: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: "Controller".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    pub prefix: String,
    pub suffix: String,
    /// Action that also answers on the controller's bare base route.
    pub default: String,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            prefix: "Action".to_owned(),
            suffix: String::new(),
            default: "Index".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub dir: PathBuf,
    pub suffix: String,
    /// Layout used by controllers that inherit the global one. Empty disables it.
    pub layout: String,
    pub layout_dir: PathBuf,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("views"),
            suffix: ".html".to_owned(),
            layout: "layout.html".to_owned(),
            layout_dir: PathBuf::from("layouts"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub enable: bool,
    pub name: String,
    /// Cookie lifetime in seconds.
    pub max_age: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enable: true,
            name: "RTTPSESSION".to_owned(),
            max_age: 10 * 24 * 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CsrfConfig {
    pub enable: bool,
    pub mask_length: usize,
    /// Session key holding the true token.
    pub session_param: String,
    pub header_param: String,
    pub form_param: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            enable: true,
            mask_length: MIN_CSRF_MASK_LENGTH,
            session_param: "_csrf".to_owned(),
            header_param: "X-CSRF-Token".to_owned(),
            form_param: "_csrf".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Route whose handler also answers `GET /`.
    pub default_route: String,
    pub redirect_trailing_slash: bool,
    pub redirect_fixed_path: bool,
    pub handle_method_not_allowed: bool,
    pub handle_options: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_route: "/index".to_owned(),
            redirect_trailing_slash: true,
            redirect_fixed_path: true,
            handle_method_not_allowed: true,
            handle_options: true,
        }
    }
}

impl Config {
    /// Loads a TOML file.
    ///
    /// A relative `base_path` (including the default `.`) is resolved against the
    /// directory containing the file. The result is not validated; the application
    /// builder calls [`validate`](Self::validate).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        if config.base_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.base_path = dir.join(&config.base_path);
            }
        }
        Ok(config)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Checks cross-field constraints and normalizes correctable values.
    ///
    /// A CSRF mask shorter than [`MIN_CSRF_MASK_LENGTH`] is raised with a warning
    /// rather than rejected.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.action.prefix.is_empty() && self.action.suffix.is_empty() {
            return Err(ConfigError::EmptyActionConvention);
        }

        if self.session.enable && self.session.name.is_empty() {
            return Err(ConfigError::EmptySessionName);
        }

        if self.csrf.enable {
            if !self.session.enable {
                return Err(ConfigError::CsrfWithoutSession);
            }
            if self.csrf.mask_length < MIN_CSRF_MASK_LENGTH {
                tracing::warn!(
                    configured = self.csrf.mask_length,
                    corrected = MIN_CSRF_MASK_LENGTH,
                    "CSRF mask length is too short, raising it"
                );
                self.csrf.mask_length = MIN_CSRF_MASK_LENGTH;
            }
            if self.csrf.session_param.is_empty() {
                return Err(ConfigError::EmptyCsrfParam("session_param"));
            }
            if self.csrf.header_param.is_empty() {
                return Err(ConfigError::EmptyCsrfParam("header_param"));
            }
            if self.csrf.form_param.is_empty() {
                return Err(ConfigError::EmptyCsrfParam("form_param"));
            }
        }

        Ok(self)
    }

    pub fn is_development(&self) -> bool {
        self.mode == Mode::Development
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.controller.suffix, "Controller");
        assert_eq!(config.action.prefix, "Action");
        assert_eq!(config.action.default, "Index");
        assert_eq!(config.router.default_route, "/index");
        assert_eq!(config.csrf.header_param, "X-CSRF-Token");
        assert_eq!(config.mode, Mode::Production);
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::from_toml_str(
            r#"
            mode = "dev"

            [action]
            prefix = ""
            suffix = "Action"

            [router]
            handle_options = false

            [resources]
            "/assets" = "public/assets"
            "#,
        )
        .unwrap();
        assert!(config.is_development());
        assert_eq!(config.action.suffix, "Action");
        assert!(!config.router.handle_options);
        assert!(config.router.redirect_fixed_path);
        assert_eq!(
            config.resources.get("/assets"),
            Some(&PathBuf::from("public/assets"))
        );
    }

    #[test]
    fn short_mask_is_corrected_not_rejected() {
        let mut config = Config::default();
        config.csrf.mask_length = 2;
        let config = config.validate().unwrap();
        assert_eq!(config.csrf.mask_length, MIN_CSRF_MASK_LENGTH);
    }

    #[test]
    fn csrf_requires_sessions() {
        let mut config = Config::default();
        config.session.enable = false;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CsrfWithoutSession)
        ));
    }

    #[test]
    fn action_conventions_cannot_both_be_empty() {
        let mut config = Config::default();
        config.action.prefix.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyActionConvention)
        ));
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        assert!(matches!(
            Config::from_toml_str(r#"mode = "staging""#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn from_file_resolves_base_path_next_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.toml");
        fs::write(&file, "name = \"blog\"\nbase_path = \"site\"\n").unwrap();
        let config = Config::from_file(&file).unwrap();
        assert_eq!(config.name, "blog");
        assert_eq!(config.base_path, dir.path().join("site"));
    }
}
