//! Loads the flat `key value` settings file that drives a build. Each
//! non-blank line outside of a `#` comment is split on its first run of
//! whitespace into a key and a value. The loader only checks the shape of
//! each line; keys that later stages require are looked up lazily and
//! surface as [`Error::MissingKey`] at first use.

use log::info;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// The name of the settings file inside the site root.
pub const CONFIG_FILE: &str = "config";

/// The credential keys required to announce new articles.
pub const TWITTER_KEYS: [&str; 4] = [
    "twtr_consumer_key",
    "twtr_consumer_secret",
    "twtr_access_token",
    "twtr_access_token_secret",
];

/// The settings for one run. Read-only once loaded.
#[derive(Clone, Debug)]
pub struct Config {
    root: PathBuf,
    values: BTreeMap<String, String>,
}

impl Config {
    /// Reads `{root}/config`, logging one line per assignment with
    /// secret-like values masked. `blog` defaults to `root` unless the file
    /// assigns it.
    pub fn load(root: &Path) -> Result<Config> {
        info!("Config");
        let path = root.join(CONFIG_FILE);
        let text = std::fs::read_to_string(&path).map_err(|err| Error::Io {
            path: path.clone(),
            err,
        })?;
        Config::parse(root, &text)
    }

    /// Parses settings text without touching the file system, logging each
    /// assignment in file order. Later assignments to a key win.
    pub fn parse(root: &Path, text: &str) -> Result<Config> {
        let mut values = BTreeMap::new();
        values.insert("blog".to_owned(), root.to_string_lossy().into_owned());
        for (key, value) in assignments(text)? {
            info!("Assigning '{}' as '{}'", key, masked(key, value));
            values.insert(key.to_owned(), value.to_owned());
        }
        Ok(Config {
            root: root.to_owned(),
            values,
        })
    }

    /// Returns the value for `key` or [`Error::MissingKey`].
    pub fn get(&self, key: &str) -> Result<&str> {
        self.optional(key)
            .ok_or_else(|| Error::MissingKey(key.to_owned()))
    }

    /// Returns the value for `key`, if any.
    pub fn optional(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Iterates over every assignment in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The directory the tool was pointed at.
    pub fn site_root(&self) -> &Path {
        &self.root
    }

    /// The repository root holding `articles/`, `pages/`, `templates/` and
    /// `www/`.
    pub fn source_root(&self) -> Result<PathBuf> {
        Ok(self.resolve(self.get("blog")?))
    }

    /// The directory the generated site is written into.
    pub fn output_root(&self) -> Result<PathBuf> {
        Ok(self.resolve(self.get("www")?))
    }

    pub fn title(&self) -> Result<&str> {
        self.get("title")
    }

    pub fn author(&self) -> Result<&str> {
        self.get("author")
    }

    pub fn domain(&self) -> Result<&str> {
        self.get("domain")
    }

    pub fn date_format(&self) -> Result<&str> {
        self.get("date_format")
    }

    /// The number of articles shown in full on the home page and in the
    /// feed.
    pub fn homepage_count(&self) -> Result<usize> {
        let value = self.get("homepage_count")?;
        value.parse::<usize>().map_err(|e| Error::InvalidValue {
            key: "homepage_count".to_owned(),
            value: value.to_owned(),
            reason: e.to_string(),
        })
    }

    /// The four Twitter credentials in [`TWITTER_KEYS`] order, or `None` if
    /// any of them is absent.
    pub fn twitter_credentials(&self) -> Option<[&str; 4]> {
        let mut credentials = [""; 4];
        for (slot, key) in credentials.iter_mut().zip(TWITTER_KEYS.iter()) {
            *slot = self.optional(key)?;
        }
        Some(credentials)
    }

    fn resolve(&self, value: &str) -> PathBuf {
        let path = Path::new(value);
        if path.is_absolute() {
            path.to_owned()
        } else {
            self.root.join(path)
        }
    }
}

/// Splits settings text into `(key, value)` pairs in file order, keeping
/// repeated keys.
pub fn assignments(text: &str) -> Result<Vec<(&str, &str)>> {
    let mut pairs = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if let Some(pair) = parse_line(line).map_err(|line| Error::Parse {
            line_number: i + 1,
            line,
        })? {
            pairs.push(pair);
        }
    }
    Ok(pairs)
}

/// Returns the loggable form of a value: unchanged, unless `key` contains
/// `secret`, in which case every character becomes `*`.
pub fn masked<'a>(key: &str, value: &'a str) -> Cow<'a, str> {
    if key.contains("secret") {
        Cow::Owned("*".repeat(value.chars().count()))
    } else {
        Cow::Borrowed(value)
    }
}

// Returns `Ok(None)` for blank and comment-only lines and `Err(line)` when a
// key has no value.
fn parse_line(line: &str) -> std::result::Result<Option<(&str, &str)>, String> {
    let content = match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    };
    let content = content.trim();
    if content.is_empty() {
        return Ok(None);
    }
    match content.split_once(char::is_whitespace) {
        Some((key, value)) if !key.is_empty() && !value.trim_start().is_empty() => {
            Ok(Some((key, value.trim_start())))
        }
        _ => Err(line.to_owned()),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Problems reading or interpreting the settings.
#[derive(Debug)]
pub enum Error {
    /// The settings file couldn't be read.
    Io { path: PathBuf, err: std::io::Error },

    /// A line held a key without a value.
    Parse { line_number: usize, line: String },

    /// A required key was never assigned.
    MissingKey(String),

    /// A value couldn't be interpreted for its key.
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err } => {
                write!(f, "Reading config file '{}': {}", path.display(), err)
            }
            Error::Parse { line_number, line } => write!(
                f,
                "config line {}: expected `key value`, found '{}'",
                line_number, line
            ),
            Error::MissingKey(key) => write!(f, "missing config key '{}'", key),
            Error::InvalidValue { key, value, reason } => write!(
                f,
                "invalid value '{}' for config key '{}': {}",
                masked(key, value),
                key,
                reason
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { path: _, err } => Some(err),
            _ => None,
        }
    }
}
