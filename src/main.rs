//! szz CLI - label buggy methods per release from tickets and git history.

use std::collections::BTreeMap;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use szz::bugginess::{
    BugLabeler, ColdStartEstimator, CommitLinker, LinkSummary, ProportionEstimator,
};
use szz::cli::{Cli, Command, ProportionArgs};
use szz::config::Config;
use szz::core::progress::create_spinner;
use szz::core::ProgressTracker;
use szz::git::GitRepo;
use szz::metadata::{self, JsonProjectSource, ProjectMetadata};
use szz::model::{Release, Ticket};
use szz::output::{EstimateReport, Format, LinkReport, TicketEstimate};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "szz=debug" } else { "szz=warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_default(&cli.path)?,
    };

    let format = Format::from(cli.format.map(Into::into).unwrap_or(config.output.format));
    let mut out = stdout();

    match cli.command {
        Command::Link(args) => {
            let repo = open_repo(&cli.path)?;
            let (_, mut tickets) = load_project(&args.metadata)?;
            let (by_message, by_heuristic) =
                link_tickets(&repo, &config, args.no_heuristic, &mut tickets)?;
            let report = LinkReport::new(by_message, by_heuristic, tickets.values());
            format.render(&report, &mut out)?;
        }
        Command::Estimate(args) => {
            let (releases, mut tickets) = load_project(&args.metadata)?;
            let mut estimator =
                ProportionEstimator::new(&releases, cold_start(&config, &args.proportion)?);

            for ticket in tickets.values_mut() {
                estimator.register_valid_ticket(ticket);
            }
            let (proportion, proportion_source) = estimator.proportion();

            let estimates = tickets
                .values_mut()
                .map(|ticket| TicketEstimate {
                    ticket: ticket.id.clone(),
                    fix_version: ticket.fix_version_name().map(str::to_string),
                    buggy: estimator.buggy_releases(ticket),
                })
                .collect();

            let report = EstimateReport {
                proportion,
                proportion_source,
                valid_tickets: estimator.valid_ticket_count(),
                tickets: estimates,
            };
            format.render(&report, &mut out)?;
        }
        Command::Label(args) => {
            let repo = open_repo(&cli.path)?;
            let (releases, mut tickets) = load_project(&args.link.metadata)?;
            link_tickets(&repo, &config, args.link.no_heuristic, &mut tickets)?;

            let mut methods = metadata::load_methods(&args.methods).with_context(|| {
                format!("reading method dataset {}", args.methods.display())
            })?;
            let mut estimator =
                ProportionEstimator::new(&releases, cold_start(&config, &args.proportion)?);

            let labeler = BugLabeler::new(&repo)
                .with_progress(ProgressTracker::for_terminal(tickets.len(), "Labeling"))
                .with_events(args.events || config.labeling.record_events);
            let report = labeler.label_methods(&mut methods, &mut tickets, &mut estimator);

            if let Some(path) = &args.out {
                metadata::write_methods(path, &methods)
                    .with_context(|| format!("writing labeled dataset {}", path.display()))?;
            }
            format.render(&report, &mut out)?;
        }
        Command::ColdStart(args) => {
            let dir = args
                .metadata_dir
                .unwrap_or_else(|| config.cold_start.metadata_dir.clone());
            let projects = if args.projects.is_empty() {
                config.cold_start.projects.clone()
            } else {
                args.projects
            };
            let estimator = ColdStartEstimator::new(reference_source(dir), projects);

            let spinner = create_spinner("Sampling reference projects...");
            let summary = estimator.summary();
            spinner.finish_and_clear();
            format.render(summary, &mut out)?;
        }
    }

    Ok(())
}

fn open_repo(path: &Path) -> anyhow::Result<GitRepo> {
    let repo = GitRepo::open(path)
        .with_context(|| format!("opening git repository {}", path.display()))?;

    let spinner = create_spinner("Loading commit history...");
    let history = repo
        .history()
        .with_context(|| format!("reading history of {}", repo.root().display()));
    spinner.finish_and_clear();

    tracing::info!(
        root = %repo.root().display(),
        head = ?repo.head_sha().ok(),
        commits = history?.len(),
        "opened repository"
    );
    Ok(repo)
}

fn reference_source(dir: PathBuf) -> Box<JsonProjectSource> {
    let source = JsonProjectSource::new(dir);
    tracing::debug!(dir = %source.dir().display(), "reading reference project metadata");
    Box::new(source)
}

fn load_project(path: &Path) -> anyhow::Result<(Vec<Release>, BTreeMap<String, Ticket>)> {
    let meta = ProjectMetadata::from_file(path)
        .with_context(|| format!("loading project metadata {}", path.display()))?;
    tracing::info!(
        project = %meta.project,
        releases = meta.releases.len(),
        tickets = meta.tickets.len(),
        "loaded project metadata"
    );
    Ok(meta.into_parts())
}

fn link_tickets(
    repo: &GitRepo,
    config: &Config,
    no_heuristic: bool,
    tickets: &mut BTreeMap<String, Ticket>,
) -> anyhow::Result<(LinkSummary, Option<LinkSummary>)> {
    let linker = CommitLinker::new(repo, config.linker.file_filter());
    let by_message = linker.link_commits_to_tickets(tickets)?;
    let by_heuristic = if config.linker.heuristic && !no_heuristic {
        Some(linker.apply_missing_commit_linkage_heuristic(tickets)?)
    } else {
        None
    };
    Ok((by_message, by_heuristic))
}

fn cold_start(config: &Config, args: &ProportionArgs) -> anyhow::Result<ColdStartEstimator> {
    if let Some(p) = args.proportion.or(config.cold_start.proportion) {
        if !p.is_finite() || p <= 0.0 {
            bail!("proportion must be a positive number, got {p}");
        }
        return Ok(ColdStartEstimator::fixed(p));
    }

    let dir = args
        .metadata_dir
        .clone()
        .unwrap_or_else(|| config.cold_start.metadata_dir.clone());
    Ok(ColdStartEstimator::new(
        reference_source(dir),
        config.cold_start.projects.clone(),
    ))
}
