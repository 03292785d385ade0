use chrono::{DateTime, FixedOffset};
use static_fire::build::{build_site, BuildOptions, BuildReport};
use static_fire::config::Config;
use static_fire::history::{self, Git, VersionControl};
use static_fire::publish::{self, Publisher};
use static_fire::util;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

/// A history where every article was committed once, in the order given.
/// The last commit is `HEAD`.
struct SingleCommits {
    commits: Vec<(String, PathBuf, DateTime<FixedOffset>)>,
}

impl SingleCommits {
    fn new(articles: &[(&str, &str)]) -> SingleCommits {
        SingleCommits {
            commits: articles
                .iter()
                .enumerate()
                .map(|(i, (path, stamp))| {
                    (
                        format!("commit{}", i),
                        PathBuf::from(path),
                        DateTime::parse_from_rfc3339(stamp).unwrap(),
                    )
                })
                .collect(),
        }
    }
}

impl VersionControl for SingleCommits {
    fn tracked_files(&self, _pathspec: &str) -> history::Result<Vec<PathBuf>> {
        Ok(self.commits.iter().map(|(_, path, _)| path.clone()).collect())
    }

    fn file_history(&self, path: &Path) -> history::Result<Vec<String>> {
        Ok(self
            .commits
            .iter()
            .filter(|(_, p, _)| p == path)
            .map(|(id, _, _)| id.clone())
            .collect())
    }

    fn head(&self) -> history::Result<String> {
        Ok(self
            .commits
            .last()
            .map(|(id, _, _)| id.clone())
            .unwrap_or_default())
    }

    fn commit_time(&self, id: &str) -> history::Result<DateTime<FixedOffset>> {
        Ok(self
            .commits
            .iter()
            .find(|(commit, _, _)| commit == id)
            .map(|(_, _, time)| *time)
            .unwrap())
    }
}

#[derive(Default)]
struct Recorder {
    posts: RefCell<Vec<String>>,
}

impl Publisher for Recorder {
    fn post(&self, status: &str) -> publish::Result<()> {
        self.posts.borrow_mut().push(status.to_owned());
        Ok(())
    }
}

fn demo_site() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demo-site")
}

/// Copies the demo site into a fresh directory, replacing its articles with
/// `articles` and its home page size with `homepage_count`.
fn site_with(articles: &[(&str, &str)], homepage_count: usize) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    util::copy_tree(&demo_site(), dir.path()).unwrap();
    std::fs::remove_dir_all(dir.path().join("articles")).unwrap();
    for (path, contents) in articles {
        util::write_file(&dir.path().join(path), contents).unwrap();
    }

    let config = std::fs::read_to_string(dir.path().join("config")).unwrap();
    let config: String = config
        .lines()
        .map(|line| {
            if line.starts_with("homepage_count") {
                format!("homepage_count {}\n", homepage_count)
            } else {
                format!("{}\n", line)
            }
        })
        .collect();
    std::fs::write(dir.path().join("config"), config).unwrap();
    dir
}

fn build(root: &Path, vcs: &dyn VersionControl, publisher: Option<&dyn Publisher>) -> BuildReport {
    let config = Config::load(root).unwrap();
    build_site(&config, BuildOptions { vcs, publisher }).unwrap()
}

fn read(path: PathBuf) -> String {
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
}

fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(dir)
        .into_iter()
        .map(Result::unwrap)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            (
                entry.path().strip_prefix(dir).unwrap().to_owned(),
                std::fs::read(entry.path()).unwrap(),
            )
        })
        .collect()
}

#[test]
fn single_article_end_to_end() {
    let root = site_with(&[("articles/hello.text", "title Hello\nend_header\n# Hi\n\nWorld")], 1);
    let vcs = SingleCommits::new(&[("articles/hello.text", "2023-01-02T03:04:05+00:00")]);
    let recorder = Recorder::default();
    let report = build(root.path(), &vcs, Some(&recorder));
    assert_eq!(1, report.articles);

    let out = root.path().join("public");
    let page = read(out.join("articles/hello.html"));
    assert!(page.contains("<h1>Hi</h1>"), "{}", page);
    assert!(page.contains("<p>World</p>"), "{}", page);
    assert!(out.join("articles/hello.text").is_file());

    let index = read(out.join("index.html"));
    assert!(index.contains("https://example.org/articles/hello.html"), "{}", index);
    assert!(index.contains("<h1>Hi</h1>"), "{}", index);

    let feed = read(out.join("feeds/atom.xml"));
    assert_eq!(1, feed.matches("<entry>").count(), "{}", feed);
    assert!(
        feed.contains("<id>https://example.org/articles/hello.html</id>"),
        "{}",
        feed
    );

    assert!(out.join("style.css").is_file());
    assert!(read(out.join("about.html")).contains("<h1>About</h1>"));

    // A single commit that is HEAD makes the article new.
    assert_eq!(
        vec![String::from("Hello https://example.org/articles/hello.html")],
        *recorder.posts.borrow()
    );
}

#[test]
fn homepage_and_feed_are_capped() {
    let root = site_with(
        &[
            ("articles/one.text", "title One\nend_header\nFirst."),
            ("articles/two.text", "title Two\nend_header\nSecond."),
            ("articles/three.text", "title Three\nend_header\nThird."),
        ],
        2,
    );
    let vcs = SingleCommits::new(&[
        ("articles/one.text", "2023-01-01T00:00:00+00:00"),
        ("articles/two.text", "2023-02-01T00:00:00+00:00"),
        ("articles/three.text", "2023-03-01T00:00:00+00:00"),
    ]);
    let report = build(root.path(), &vcs, None);
    assert_eq!(3, report.articles);

    let out = root.path().join("public");
    let index = read(out.join("index.html"));
    assert!(index.contains("Third."), "{}", index);
    assert!(index.contains("Second."), "{}", index);
    assert!(!index.contains("First."), "{}", index);
    assert!(index.find("Third.").unwrap() < index.find("Second.").unwrap());

    let feed = read(out.join("feeds/atom.xml"));
    assert_eq!(2, feed.matches("<entry>").count(), "{}", feed);

    let archive = read(out.join("archive.html"));
    for title in ["One", "Two", "Three"].iter() {
        assert!(archive.contains(&format!(">{}</a>", title)), "{}", archive);
    }
}

#[test]
fn rebuilding_is_byte_identical_except_the_feed() {
    let root = site_with(
        &[(
            "articles/notes.text",
            "title Notes\nsummary Some notes.\nend_header\nA note.[^1]\n\n[^1]: Indeed.",
        )],
        10,
    );
    let vcs = SingleCommits::new(&[("articles/notes.text", "2023-05-06T07:08:09+00:00")]);
    let out = root.path().join("public");

    build(root.path(), &vcs, None);
    let mut first = snapshot(&out);
    build(root.path(), &vcs, None);
    let mut second = snapshot(&out);

    let feed = PathBuf::from("feeds/atom.xml");
    assert!(first.remove(&feed).is_some());
    assert!(second.remove(&feed).is_some());
    assert_eq!(first, second);
}

fn git(root: &Path, args: &[&str], date: &str) {
    let status = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(args)
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_DATE", date)
        .env("GIT_AUTHOR_NAME", "Jane Doe")
        .env("GIT_AUTHOR_EMAIL", "jane@example.org")
        .env("GIT_COMMITTER_NAME", "Jane Doe")
        .env("GIT_COMMITTER_EMAIL", "jane@example.org")
        .status()
        .unwrap();
    assert!(status.success(), "git {:?} failed", args);
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[test]
fn git_history_dates_articles() {
    if !git_available() {
        eprintln!("git is not installed; skipping");
        return;
    }

    let root = site_with(&[("articles/first.text", "title First\nend_header\nOne.")], 10);
    let dir = root.path();
    let date1 = "2022-06-01T12:00:00+00:00";
    let date2 = "2023-06-01T12:00:00+00:00";
    let date3 = "2023-07-01T12:00:00+00:00";
    git(dir, &["init", "-q"], date1);
    git(dir, &["add", "articles/first.text"], date1);
    git(dir, &["commit", "-q", "-m", "first"], date1);

    util::write_file(
        &dir.join("articles/second.text"),
        "title Second\nend_header\nTwo.",
    )
    .unwrap();
    git(dir, &["add", "articles/second.text"], date2);
    git(dir, &["commit", "-q", "-m", "second"], date2);

    util::write_file(
        &dir.join("articles/first.text"),
        "title First\nend_header\nOne, revised.",
    )
    .unwrap();
    util::write_file(
        &dir.join("articles/third.text"),
        "title Third\nend_header\nThree.",
    )
    .unwrap();
    git(dir, &["add", "articles"], date3);
    git(dir, &["commit", "-q", "-m", "revise first, add third"], date3);

    let vcs = Git::new(dir);
    let sources = history::enumerate_articles(&vcs, dir).unwrap();
    let summary: Vec<(String, String, String, bool)> = sources
        .iter()
        .map(|s| {
            (
                s.path.to_string_lossy().into_owned(),
                s.created.to_rfc3339(),
                s.updated.to_rfc3339(),
                s.is_new,
            )
        })
        .collect();
    assert_eq!(
        vec![
            ("articles/third.text".to_owned(), date3.to_owned(), date3.to_owned(), true),
            ("articles/second.text".to_owned(), date2.to_owned(), date2.to_owned(), false),
            ("articles/first.text".to_owned(), date1.to_owned(), date3.to_owned(), false),
        ],
        summary
    );

    let recorder = Recorder::default();
    let report = build(dir, &vcs, Some(&recorder));
    assert_eq!(3, report.articles);
    assert_eq!(vec![PathBuf::from("articles/third.text")], report.announced);
    assert!(read(dir.join("public/articles/first.html")).contains("One, revised."));
}

#[test]
fn git_history_keeps_non_ascii_file_names() {
    if !git_available() {
        eprintln!("git is not installed; skipping");
        return;
    }

    let root = site_with(
        &[
            ("articles/café.text", "title Café\nend_header\nCoffee."),
            ("articles/plain.text", "title Plain\nend_header\nWater."),
        ],
        10,
    );
    let dir = root.path();
    let date = "2023-04-01T09:00:00+00:00";
    git(dir, &["init", "-q"], date);
    git(dir, &["add", "articles"], date);
    git(dir, &["commit", "-q", "-m", "add articles"], date);

    let sources = history::enumerate_articles(&Git::new(dir), dir).unwrap();
    let paths: Vec<PathBuf> = sources.into_iter().map(|s| s.path).collect();
    assert_eq!(
        vec![
            PathBuf::from("articles/café.text"),
            PathBuf::from("articles/plain.text"),
        ],
        paths
    );

    build(dir, &Git::new(dir), None);
    assert!(read(dir.join("public/articles/café.html")).contains("Coffee."));
}
