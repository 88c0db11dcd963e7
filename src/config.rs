use std::{
    collections::BTreeMap,
    env,
    fs::File,
    io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::debug;

const DEFAULT_API_ENDPOINT: &str = "https://api.omniture.com/admin/1.4/rest/";

/// An error encountered while loading or resolving a configuration profile.
#[derive(thiserror::Error, Debug)]
#[allow(missing_docs)]
pub enum ConfigError {
    #[error("Failed to load config file")]
    Io(#[from] io::Error),
    #[error("Invalid configuration")]
    Invalid(#[from] serde_yaml::Error),
    #[error("Profile '{0}' not found")]
    ProfileNotFound(String),
    #[error("Username contains invalid characters")]
    InvalidUsername,
    #[error("No username found")]
    NoUsername,
    #[error("No shared secret found")]
    NoSecret,
    #[error("Invalid URI")]
    InvalidUri(#[from] http::uri::InvalidUri),
}

/// A fully resolved set of credentials for the Reporting API.
#[derive(Clone)]
pub struct Profile {
    /// The name of the profile.
    pub name: String,
    /// The REST endpoint. Defaults to the main 1.4 data center.
    pub api_endpoint: http::Uri,
    /// The web services username, usually `user:Company`.
    pub username: String,
    /// The shared secret used to sign requests.
    pub secret: String,
    /// The user-agent used on requests.
    pub user_agent: String,
    /// The config file this profile was loaded from, if any.
    pub config_path: Option<PathBuf>,
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("name", &self.name)
            .field("api_endpoint", &self.api_endpoint)
            .field("username", &self.username)
            .field("secret", &"********")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// A profile stored in the config file.
#[derive(Debug, Default, Clone, Deserialize)]
struct ConfigProfile {
    username: Option<String>,
    secret: Option<String>,
    endpoint: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
struct Config {
    profiles: BTreeMap<String, ConfigProfile>,
}

impl Profile {
    /// Build a profile directly from credentials, using the default
    /// endpoint.
    pub fn new(
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Self::from_raw(
            ConfigProfile {
                username: Some(username.into()),
                secret: Some(secret.into()),
                endpoint: None,
            },
            "default".to_owned(),
            None,
        )
    }

    /// Use a different endpoint, e.g. for another data center.
    pub fn with_endpoint(self, endpoint: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_endpoint: endpoint.parse()?,
            ..self
        })
    }

    /// Load the given profile from the configuration file (usually
    /// ~/.config/omniture.yaml). If no configuration file is present, then
    /// the credentials will be loaded solely from the environment.
    ///
    /// If `OMNITURE_PROFILE` is set, that will be used to select the profile.
    /// Otherwise the profile `default` will be used.
    pub fn from_default_env() -> Result<Self, ConfigError> {
        if let Ok(s) = env::var("OMNITURE_PROFILE") {
            Self::from_env(&s)
        } else {
            Self::from_env("default")
        }
    }

    /// Load the given profile from the configuration file (usually
    /// ~/.config/omniture.yaml), then apply overrides from the environment.
    ///
    /// | Environment Variable | Config Value |
    /// |----------------------|--------------|
    /// | `OMNITURE_USERNAME`  | `username`   |
    /// | `OMNITURE_SECRET`    | `secret`     |
    /// | `OMNITURE_ENDPOINT`  | `endpoint`   |
    pub fn from_env(name: &str) -> Result<Self, ConfigError> {
        let path = find_config()?;
        let mut profile = match read_profile(&path, name) {
            Ok(p) => p,
            Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no config file found");
                Default::default()
            }
            Err(e) => return Err(e),
        };

        if let Ok(v) = env::var("OMNITURE_USERNAME") {
            profile.username = Some(v);
        }
        if let Ok(v) = env::var("OMNITURE_SECRET") {
            profile.secret = Some(v);
        }
        if let Ok(v) = env::var("OMNITURE_ENDPOINT") {
            profile.endpoint = Some(v);
        }

        let path = path.exists().then_some(path);
        Self::from_raw(profile, name.to_owned(), path)
    }

    /// Load the given profile (or 'default') from the given file. Does not
    /// read any environment variables.
    pub fn read(path: impl AsRef<Path>, name: Option<&str>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let name = name.unwrap_or("default").to_owned();
        let profile = read_profile(path, &name)?;
        Self::from_raw(profile, name, Some(path.to_owned()))
    }

    /// Read all profiles from the given file. Does not read any environment
    /// variables.
    pub fn read_all(path: impl AsRef<Path>) -> Result<impl Iterator<Item = Self>, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let config: Config = serde_yaml::from_reader(file)?;

        let profiles: Result<Vec<_>, ConfigError> = config
            .profiles
            .into_iter()
            .map(|(name, raw)| Profile::from_raw(raw, name, Some(path.to_owned())))
            .collect();

        Ok(profiles?.into_iter())
    }

    fn from_raw(
        raw: ConfigProfile,
        name: String,
        path: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let ConfigProfile {
            username,
            secret,
            endpoint,
        } = raw;

        let api_endpoint = endpoint
            .as_deref()
            .unwrap_or(DEFAULT_API_ENDPOINT)
            .parse()?;
        let username = username.ok_or(ConfigError::NoUsername)?;
        let secret = secret.ok_or(ConfigError::NoSecret)?;

        // The username is embedded in a quoted header value.
        if !username.is_ascii() || username.contains('"') {
            return Err(ConfigError::InvalidUsername);
        }

        Ok(Self {
            name,
            api_endpoint,
            username,
            secret,
            user_agent: make_ua(),
            config_path: path,
        })
    }
}

fn find_config() -> Result<PathBuf, ConfigError> {
    let Some(home) = env::home_dir() else {
        return Err(ConfigError::Io(io::Error::other(
            "No $HOME found for the current user",
        )));
    };

    let canonical = home.join(".config/omniture.yaml");
    if canonical.exists() {
        return Ok(canonical);
    }

    for fallback in [".config/omniture.yml", ".omniture/config.yaml"] {
        let path = home.join(fallback);
        if path.exists() {
            return Ok(path);
        }
    }

    Ok(canonical)
}

fn read_profile(p: &Path, name: &str) -> Result<ConfigProfile, ConfigError> {
    let file = File::open(p)?;
    let mut config: Config = serde_yaml::from_reader(file).map_err(ConfigError::Invalid)?;
    let Some(config_profile) = config.profiles.remove(name) else {
        return Err(ConfigError::ProfileNotFound(name.to_string()));
    };

    debug!(path = %p.display(), "loaded config file");

    Ok(config_profile)
}

fn make_ua() -> String {
    format!("omniture-rs/{}", env!("CARGO_PKG_VERSION"))
}
