//! Derives article dates from version control. Every tracked article file
//! gets its `created` timestamp from the earliest commit that touched it and
//! its `updated` timestamp from the latest; an article is new when its
//! earliest commit is the repository's current `HEAD`.
//!
//! The four questions asked of the repository are captured by the
//! [`VersionControl`] trait. [`Git`] answers them by running the `git`
//! binary.

use crate::article::ArticleSource;
use chrono::{DateTime, FixedOffset};
use log::{debug, info};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// The pathspec matching article source files.
pub const ARTICLES_PATHSPEC: &str = "articles/*.text";

/// Read-only queries against a repository.
pub trait VersionControl {
    /// Lists the tracked files matching `pathspec`, relative to the
    /// repository root.
    fn tracked_files(&self, pathspec: &str) -> Result<Vec<PathBuf>>;

    /// Lists the ids of the commits reachable from `HEAD` that touched
    /// `path`, newest first.
    fn file_history(&self, path: &Path) -> Result<Vec<String>>;

    /// Returns the id of the current `HEAD` commit.
    fn head(&self) -> Result<String>;

    /// Returns the author timestamp of the commit `id`.
    fn commit_time(&self, id: &str) -> Result<DateTime<FixedOffset>>;
}

/// Lists every article tracked in `vcs` that still exists under `root`,
/// most recently created first. Articles created at the same instant are
/// ordered by path.
pub fn enumerate_articles<V: VersionControl + ?Sized>(
    vcs: &V,
    root: &Path,
) -> Result<Vec<ArticleSource>> {
    info!("Git");
    let head = vcs.head()?;
    let mut articles = Vec::new();
    for path in vcs.tracked_files(ARTICLES_PATHSPEC)? {
        if !root.join(&path).is_file() {
            debug!("Skipping '{}': not on disk", path.display());
            continue;
        }

        let revisions = vcs.file_history(&path)?;
        let (last, first) = match (revisions.first(), revisions.last()) {
            (Some(last), Some(first)) => (last, first),
            _ => return Err(Error::NoHistory(path)),
        };

        articles.push(ArticleSource {
            created: vcs.commit_time(first)?,
            updated: vcs.commit_time(last)?,
            is_new: *first == head,
            path,
        });
    }

    articles.sort_by(|a, b| {
        b.created
            .cmp(&a.created)
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(articles)
}

/// Answers [`VersionControl`] queries by running `git -C {root} ...`.
pub struct Git {
    root: PathBuf,
}

impl Git {
    pub fn new(root: &Path) -> Git {
        Git {
            root: root.to_owned(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(args)
            .output()
            .map_err(Error::Spawn)?;
        if !output.status.success() {
            return Err(Error::Git {
                args: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        String::from_utf8(output.stdout).map_err(|_| Error::Git {
            args: args.join(" "),
            stderr: String::from("output is not valid UTF-8"),
        })
    }
}

impl VersionControl for Git {
    fn tracked_files(&self, pathspec: &str) -> Result<Vec<PathBuf>> {
        Ok(self
            .run(&["ls-files", "-z", "--", pathspec])?
            .split('\0')
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect())
    }

    fn file_history(&self, path: &Path) -> Result<Vec<String>> {
        let path = path.to_string_lossy();
        Ok(self
            .run(&["rev-list", "HEAD", "--", &path])?
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect())
    }

    fn head(&self) -> Result<String> {
        Ok(self.run(&["rev-parse", "HEAD"])?.trim().to_owned())
    }

    fn commit_time(&self, id: &str) -> Result<DateTime<FixedOffset>> {
        let stamp = self.run(&["show", "-s", "--format=%aI", id])?;
        let stamp = stamp.trim();
        DateTime::parse_from_rfc3339(stamp).map_err(|err| Error::Timestamp {
            id: id.to_owned(),
            stamp: stamp.to_owned(),
            err,
        })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed history lookup. None of these are recoverable: the
/// build needs a date for every article.
#[derive(Debug)]
pub enum Error {
    /// The `git` binary couldn't be started.
    Spawn(std::io::Error),

    /// `git` ran but reported failure (e.g., not a repository).
    Git { args: String, stderr: String },

    /// A tracked article has no commits reachable from `HEAD`.
    NoHistory(PathBuf),

    /// A commit timestamp wasn't ISO-8601.
    Timestamp {
        id: String,
        stamp: String,
        err: chrono::ParseError,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Spawn(err) => write!(f, "Running git: {}", err),
            Error::Git { args, stderr } => write!(f, "`git {}` failed: {}", args, stderr),
            Error::NoHistory(path) => {
                write!(f, "no commits found for '{}'", path.display())
            }
            Error::Timestamp { id, stamp, err } => write!(
                f,
                "parsing timestamp '{}' of commit {}: {}",
                stamp, id, err
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Spawn(err) => Some(err),
            Error::Timestamp { err, .. } => Some(err),
            Error::Git { .. } | Error::NoHistory(_) => None,
        }
    }
}
