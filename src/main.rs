use anyhow::{Context, Result};
use clap::{App, Arg, ArgMatches};
use log::{error, info};
use static_fire::build::{build_site, BuildOptions};
use static_fire::config::Config;
use static_fire::history::Git;
use static_fire::publish::{Publisher, Twitter};
use std::path::Path;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let matches = App::new("static-fire")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds a blog from a git repository of plain-text articles")
        .arg(
            Arg::with_name("SITE_ROOT")
                .help("The directory holding the site's `config` file")
                .default_value(".")
                .index(1),
        )
        .arg(
            Arg::with_name("no-announce")
                .long("no-announce")
                .help("Don't post announcements for new articles"),
        )
        .get_matches();

    if let Err(err) = run(&matches) {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let site_root = Path::new(matches.value_of("SITE_ROOT").unwrap_or("."));
    let config = Config::load(site_root)
        .with_context(|| format!("loading configuration from '{}'", site_root.display()))?;

    let git = Git::new(&config.source_root()?);
    let twitter = if matches.is_present("no-announce") {
        None
    } else {
        Twitter::from_config(&config)?
    };
    if twitter.is_none() {
        info!("Announcements disabled");
    }

    let report = build_site(
        &config,
        BuildOptions {
            vcs: &git,
            publisher: twitter.as_ref().map(|t| t as &dyn Publisher),
        },
    )
    .context("building site")?;

    info!(
        "Built {} articles, announced {}, {} announcements failed",
        report.articles,
        report.announced.len(),
        report.failed_announcements.len()
    );
    Ok(())
}
