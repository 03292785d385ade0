//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output site: enumerating articles from version
//! control ([`crate::history`]), reading and rendering them
//! ([`crate::article`], [`crate::write`]), copying the static asset tree,
//! generating the Atom feed ([`crate::feed`]) and announcing new articles
//! ([`crate::publish`]).

use crate::article::{self, Article};
use crate::config::{self, Config};
use crate::feed::{self, FEED_PATH};
use crate::history::{self, VersionControl};
use crate::markdown::Markdown;
use crate::publish::Publisher;
use crate::render::{self, Renderer, SiteContext};
use crate::util;
use crate::write::{self, Writer};
use chrono::{Datelike, Utc};
use log::{error, info, warn};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Source directory holding the template set.
pub const TEMPLATES_DIRECTORY: &str = "templates";

/// Source directory holding static pages.
pub const PAGES_DIRECTORY: &str = "pages";

/// Source directory copied verbatim into the output root.
pub const STATIC_DIRECTORY: &str = "www";

/// File extension for articles and static pages.
pub const SOURCE_EXTENSION: &str = "text";

/// The collaborators a build talks to.
pub struct BuildOptions<'a> {
    /// Answers article history queries.
    pub vcs: &'a dyn VersionControl,

    /// Announces new articles. `None` skips announcements.
    pub publisher: Option<&'a dyn Publisher>,
}

/// What a build did.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// The number of articles written.
    pub articles: usize,

    /// Articles successfully announced, in build order.
    pub announced: Vec<PathBuf>,

    /// Articles whose announcement failed, with the failure message.
    pub failed_announcements: Vec<(PathBuf, String)>,
}

/// Builds the site described by `config`. Failures abort the build except
/// for announcements, which are logged and recorded in the report.
pub fn build_site(config: &Config, options: BuildOptions) -> Result<BuildReport> {
    let source_root = config.source_root()?;
    let output_root = config.output_root()?;
    let homepage_count = config.homepage_count()?;
    let date_format = config.date_format()?;

    let site = SiteContext::from_config(config, Utc::now().year())?;
    let renderer = Renderer::from_directory(&source_root.join(TEMPLATES_DIRECTORY), site)?;
    let mut markdown = Markdown::new();

    let sources = history::enumerate_articles(options.vcs, &source_root)?;

    copy_static(&source_root.join(STATIC_DIRECTORY), &output_root)?;

    let writer = Writer {
        renderer: &renderer,
        output_directory: &output_root,
    };
    let mut report = BuildReport::default();
    let mut articles: Vec<Article> = Vec::with_capacity(sources.len());
    for source in sources {
        info!("Article: {}", source.path.display());
        let (article, warnings) =
            source.read(&source_root, renderer.site(), date_format, &mut markdown)?;
        for warning in &warnings {
            warn!("{}: {}", article.path.display(), warning);
        }
        writer.write_article(&article)?;

        if article.is_new {
            if let Some(publisher) = options.publisher {
                announce(&renderer, publisher, &article, &mut report)?;
            }
        }
        articles.push(article);
    }
    report.articles = articles.len();

    let homepage = &articles[..homepage_count.min(articles.len())];
    writer.write_homepage(homepage)?;

    let feed_path = output_root.join(FEED_PATH);
    util::create_parent(&feed_path).map_err(|err| Error::Output {
        path: feed_path.clone(),
        err,
    })?;
    let feed_file = File::create(&feed_path).map_err(|err| Error::Output {
        path: feed_path.clone(),
        err,
    })?;
    feed::write_feed(renderer.site(), homepage, Utc::now().into(), feed_file)?;

    writer.write_archive(&articles)?;

    info!("Pages");
    for page in list_pages(&source_root.join(PAGES_DIRECTORY))? {
        let document_id = match page.file_name() {
            Some(name) => format!("{}/{}", PAGES_DIRECTORY, name.to_string_lossy()),
            None => continue,
        };
        info!("Page: {}", page.display());
        writer.write_page(&page, &document_id, &mut markdown)?;
    }

    Ok(report)
}

// Posts the article's tweet. Rendering problems are fatal like any other
// template error; posting problems are recorded and the build goes on.
fn announce(
    renderer: &Renderer,
    publisher: &dyn Publisher,
    article: &Article,
    report: &mut BuildReport,
) -> Result<()> {
    let status = write::tweet(renderer, article)?;
    match publisher.post(&status) {
        Ok(()) => report.announced.push(article.path.clone()),
        Err(err) => {
            error!("Announcing '{}': {}", article.path.display(), err);
            report
                .failed_announcements
                .push((article.path.clone(), err.to_string()));
        }
    }
    Ok(())
}

fn copy_static(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_dir() {
        info!("No static directory at '{}'", src.display());
        return Ok(());
    }
    info!("Static: {}", src.display());
    let copied = util::copy_tree(src, dst).map_err(|err| Error::CopyStatic {
        path: src.to_owned(),
        err,
    })?;
    info!("Copied {} static files", copied);
    Ok(())
}

// Returns the `*.text` files directly inside `dir`, sorted by name. A
// missing directory has no pages.
fn list_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let read_error = |err| Error::ListPages {
        path: dir.to_owned(),
        err,
    };
    let mut pages = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if path.is_file() && path.extension().map_or(false, |e| e == SOURCE_EXTENSION) {
            pages.push(path);
        }
    }
    pages.sort();
    Ok(pages)
}

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site.
#[derive(Debug)]
pub enum Error {
    /// Returned for missing or invalid configuration.
    Config(config::Error),

    /// Returned when version-control history can't be read.
    History(history::Error),

    /// Returned when templates can't be loaded or rendered.
    Render(render::Error),

    /// Returned when an article can't be read.
    Article(article::Error),

    /// Returned when an output page can't be built or written.
    Write(write::Error),

    /// Returned when the feed can't be built.
    Feed(feed::Error),

    /// Returned for I/O problems while copying the static directory.
    CopyStatic { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while listing static pages.
    ListPages { path: PathBuf, err: std::io::Error },

    /// Returned for other I/O problems creating output files.
    Output { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(err) => err.fmt(f),
            Error::History(err) => err.fmt(f),
            Error::Render(err) => err.fmt(f),
            Error::Article(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Feed(err) => err.fmt(f),
            Error::CopyStatic { path, err } => {
                write!(f, "Copying static directory '{}': {}", path.display(), err)
            }
            Error::ListPages { path, err } => {
                write!(f, "Listing pages in '{}': {}", path.display(), err)
            }
            Error::Output { path, err } => {
                write!(f, "Creating '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(err) => Some(err),
            Error::History(err) => Some(err),
            Error::Render(err) => Some(err),
            Error::Article(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Feed(err) => Some(err),
            Error::CopyStatic { path: _, err } => Some(err),
            Error::ListPages { path: _, err } => Some(err),
            Error::Output { path: _, err } => Some(err),
        }
    }
}

impl From<config::Error> for Error {
    fn from(err: config::Error) -> Error {
        Error::Config(err)
    }
}

impl From<history::Error> for Error {
    fn from(err: history::Error) -> Error {
        Error::History(err)
    }
}

impl From<render::Error> for Error {
    fn from(err: render::Error) -> Error {
        Error::Render(err)
    }
}

impl From<article::Error> for Error {
    fn from(err: article::Error) -> Error {
        Error::Article(err)
    }
}

impl From<write::Error> for Error {
    fn from(err: write::Error) -> Error {
        Error::Write(err)
    }
}

impl From<feed::Error> for Error {
    fn from(err: feed::Error) -> Error {
        Error::Feed(err)
    }
}
