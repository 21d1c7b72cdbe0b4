// src/config.rs
// =============================================================================
// Turns the raw command-line values into a validated RunConfig.
//
// Everything here runs before the first request is sent. Any problem is a
// fatal ConfigError: the caller prints it and exits without touching the
// network.
// =============================================================================

use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::cli::ScrapeArgs;

// user:pass with no whitespace anywhere, user part free of colons
static CREDENTIALS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^:\s]+:\S+$").expect("credentials pattern is valid"));

/// Fatal problems with the command-line configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--{flag} must not be negative (got {value})")]
    NegativeValue { flag: &'static str, value: i64 },

    #[error("destination directory does not exist: {0}")]
    MissingDestination(PathBuf),

    #[error("destination is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("cookie must look like key:value (got '{0}')")]
    MalformedCookie(String),

    #[error("credentials must look like username:password (got '{0}')")]
    MalformedCredentials(String),

    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// A cookie given with `--cookie key:value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let fields: Vec<&str> = raw.split(':').collect();
        match fields.as_slice() {
            [name, value] if !name.is_empty() => Ok(Self {
                name: (*name).to_string(),
                value: (*value).to_string(),
            }),
            _ => Err(ConfigError::MalformedCookie(raw.to_string())),
        }
    }
}

/// HTTP Basic credentials given with `--user username:password`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if !CREDENTIALS_PATTERN.is_match(raw) {
            return Err(ConfigError::MalformedCredentials(mask(raw)));
        }
        // The pattern guarantees a colon.
        let (username, password) = raw
            .split_once(':')
            .ok_or_else(|| ConfigError::MalformedCredentials(mask(raw)))?;
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

// Never echo a password back into logs or error output.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

fn mask(raw: &str) -> String {
    match raw.split_once(':') {
        Some((user, _)) => format!("{user}:***"),
        None => raw.to_string(),
    }
}

/// Everything one scrape run needs, validated and read-only.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub seed: Url,
    pub dest: PathBuf,
    pub cookies: Vec<Cookie>,
    pub credentials: Option<Credentials>,
    pub delay: Duration,
    /// 0 means unbounded
    pub parallel: usize,
    pub limit: usize,
    pub verbose: bool,
}

impl RunConfig {
    /// Validates the command-line values.
    ///
    /// Checks run in a fixed order: numeric flags, destination, cookies,
    /// credentials, seed URL. The first failure wins.
    pub fn from_args(url: &str, args: &ScrapeArgs) -> Result<Self, ConfigError> {
        let delay = non_negative("delay", args.delay)?;
        let limit = non_negative("limit", args.limit)?;
        let parallel = non_negative("parallel", args.parallel)?;

        let dest = PathBuf::from(&args.dest);
        if !dest.exists() {
            return Err(ConfigError::MissingDestination(dest));
        }
        if !dest.is_dir() {
            return Err(ConfigError::NotADirectory(dest));
        }

        let cookies = args
            .cookies
            .iter()
            .map(|raw| Cookie::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;

        let credentials = args.user.as_deref().map(Credentials::parse).transpose()?;

        let seed = Url::parse(url).map_err(|source| ConfigError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        Ok(Self {
            seed,
            dest,
            cookies,
            credentials,
            delay: Duration::from_secs(delay as u64),
            parallel: parallel as usize,
            limit: limit as usize,
            verbose: args.verbose,
        })
    }
}

fn non_negative(flag: &'static str, value: i64) -> Result<u64, ConfigError> {
    u64::try_from(value).map_err(|_| ConfigError::NegativeValue { flag, value })
}
