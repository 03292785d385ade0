//! Support for creating the Atom feed from the home page articles.

use crate::article::Article;
use crate::render::{self, SiteContext};
use atom_syndication::{Content, Entry, Error as AtomError, Feed, Link, Person};
use chrono::{DateTime, FixedOffset};
use log::info;
use std::fmt;
use std::io::Write;

/// The feed's location, relative to the output root.
pub const FEED_PATH: &str = "feeds/atom.xml";

/// Creates the feed for `articles` and writes it to `w`. `updated` is the
/// feed-level timestamp; callers pass the current time.
pub fn write_feed<W: Write>(
    site: &SiteContext,
    articles: &[Article],
    updated: DateTime<FixedOffset>,
    w: W,
) -> Result<()> {
    info!("Feeds");
    feed(site, articles, updated)?.write_to(w)?;
    Ok(())
}

/// Builds the feed. Each entry links to the article's external `link` if it
/// has one (with a `related` link back to the permalink), else to the
/// permalink.
pub fn feed(
    site: &SiteContext,
    articles: &[Article],
    updated: DateTime<FixedOffset>,
) -> Result<Feed> {
    let self_url = site.url_for(FEED_PATH)?.to_string();
    Ok(Feed {
        title: site.title.clone().into(),
        id: self_url.clone(),
        updated,
        subtitle: Some(format!("By {}", site.author).into()),
        rights: Some(site.copyright().into()),
        links: vec![
            link(site.domain_str(), "alternate"),
            link(&self_url, "self"),
        ],
        entries: articles.iter().map(|a| feed_entry(site, a)).collect(),
        ..Default::default()
    })
}

fn feed_entry(site: &SiteContext, article: &Article) -> Entry {
    let links = match article.link() {
        Some(external) => vec![
            link(external, "alternate"),
            link(&article.full_url, "related"),
        ],
        None => vec![link(&article.full_url, "alternate")],
    };

    Entry {
        id: article.full_url.clone(),
        title: article.title().to_owned().into(),
        updated: article.updated,
        published: Some(article.created),
        authors: vec![Person {
            name: site.author.clone(),
            email: None,
            uri: Some(site.domain_str().to_owned()),
        }],
        links,
        content: Some(Content {
            value: Some(article.content().to_owned()),
            content_type: Some(String::from("html")),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn link(href: &str, rel: &str) -> Link {
    Link {
        href: href.to_owned(),
        rel: rel.to_owned(),
        ..Default::default()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is an Atom-related error.
    Atom(AtomError),

    /// Returned when the feed URL can't be built.
    Render(render::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Atom(err) => write!(f, "Writing feed: {}", err),
            Error::Render(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Atom(err) => Some(err),
            Error::Render(err) => Some(err),
        }
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}

impl From<render::Error> for Error {
    fn from(err: render::Error) -> Error {
        Error::Render(err)
    }
}
