//! Runtime configuration.
//!
//! Holds everything the pipeline needs that is not derivable from the
//! input URL: the Spotify API bearer token, the download directory, and
//! the `User-Agent` string presented to both platforms. Secrets come
//! from a small TOML file so they stay out of shell history.

use std::{fs, io, path::PathBuf};

use veil::Redact;

/// Secrets loaded from the secrets file.
///
/// Token refresh and session management are out of scope; the token is
/// taken as-is and attached to every Spotify API request.
#[derive(Clone, PartialEq, Eq, serde::Deserialize, Redact)]
pub struct Secrets {
    /// OAuth bearer token for the Spotify Web API.
    #[redact]
    pub access_token: String,
}

impl Secrets {
    /// Upper bound on the secrets file size, to catch a wrong path early.
    const MAX_FILE_SIZE: u64 = 4096;

    /// Loads secrets from a TOML file containing an `access_token` key.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is suspiciously
    /// large, or does not parse as the expected TOML document.
    pub fn from_file(path: &str) -> io::Result<Self> {
        let attributes = fs::metadata(path)?;
        if attributes.len() > Self::MAX_FILE_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{path} is too large to be a secrets file"),
            ));
        }

        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{path} format is invalid: {e}"),
            )
        })
    }
}

#[derive(Clone, PartialEq, Eq, Redact)]
pub struct Config {
    pub app_name: String,
    pub app_version: String,

    /// Directory where fetched audio files are written.
    pub download_dir: PathBuf,

    pub user_agent: String,

    #[redact]
    pub access_token: String,
}

impl Config {
    #[must_use]
    pub fn with_secrets(secrets: Secrets) -> Self {
        let app_name = env!("CARGO_PKG_NAME").to_owned();
        let app_version = env!("CARGO_PKG_VERSION").to_owned();

        // Additional `User-Agent` string checks on top of `reqwest::HeaderValue`.
        let illegal_chars = |chr| chr == '/' || chr == ';';
        if app_name.is_empty()
            || app_name.contains(illegal_chars)
            || app_version.is_empty()
            || app_version.contains(illegal_chars)
        {
            panic!("application name and/or version invalid (\"{app_name}\"; \"{app_version}\")");
        }

        let os_name = match std::env::consts::OS {
            "macos" => "osx",
            other => other,
        };
        let os_version = sysinfo::System::os_version().unwrap_or_else(|| String::from("0"));

        let user_agent = format!("{app_name}/{app_version} (Rust; {os_name}/{os_version})");
        trace!("user agent: {user_agent}");

        Self {
            app_name,
            app_version,

            download_dir: PathBuf::from("downloads"),

            user_agent,

            access_token: secrets.access_token,
        }
    }
}
