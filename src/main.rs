mod cli;
mod ui;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, ListArgs};
use execwatch::{
    HttpExecutionClient, JobList, JobListOptions, ListCriteria, Pagination, Status, TrackerConfig,
};

type Jobs = JobList<HttpExecutionClient>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => TrackerConfig::load_with_env(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => TrackerConfig::load().context("failed to load execwatch.toml")?,
    };
    if let Some(max) = cli.max_concurrency {
        config.max_concurrency = max;
    }
    if config.org_key.is_empty() || config.api_token.is_empty() {
        bail!("org_key and api_token must be set in execwatch.toml or via EXECWATCH_ORG_KEY / EXECWATCH_API_TOKEN");
    }

    let client = Arc::new(HttpExecutionClient::from_config(&config)?);
    let options = JobListOptions::from_config(&config);

    match cli.command {
        Command::List { criteria, json } => {
            let jobs = list(client, &criteria, options).await?;
            render_rows(&jobs, json);
        }
        Command::Status { ids, json } => {
            let jobs = JobList::from_ids(ids, client, options);
            if let Err(failures) = jobs.sync_all().await {
                ui::print_failures("sync", &failures);
            }
            render_rows(&jobs, json);
        }
        Command::Confirm { ids } => {
            let jobs = synced(ids, client, options).await;
            let result = jobs.confirm_all().await;
            render_rows(&jobs, false);
            if let Err(failures) = result {
                ui::print_failures("confirm", &failures);
                bail!("some executions could not be confirmed");
            }
        }
        Command::Cancel { ids } => {
            let jobs = synced(ids, client, options).await;
            let result = jobs.cancel_all().await;
            render_rows(&jobs, false);
            if let Err(failures) = result {
                ui::print_failures("cancel", &failures);
                bail!("some executions could not be cancelled");
            }
        }
        Command::Watch {
            ids,
            criteria,
            interval,
        } => {
            let jobs = if ids.is_empty() {
                list(client, &criteria, options).await?
            } else {
                JobList::from_ids(ids, client, options)
            };
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.poll_interval());
            watch(&jobs, interval).await?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "execwatch=debug" } else { "execwatch=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn list(
    client: Arc<HttpExecutionClient>,
    args: &ListArgs,
    options: JobListOptions,
) -> Result<Jobs> {
    let mut criteria = ListCriteria::new();
    for status in &args.statuses {
        criteria = criteria.status(Status::from(status.as_str()));
    }
    if let Some(tool) = &args.tool {
        criteria = criteria.tool_key(tool.clone());
    }
    if args.with_metadata {
        criteria = criteria.require_metadata();
    }
    let pagination = Pagination {
        page: 0,
        page_size: args.page_size,
        max_pages: args.max_pages,
    };
    let jobs = JobList::list(client, &criteria, pagination, options)
        .await
        .context("failed to list executions")?;
    Ok(jobs)
}

/// Build a list from ids and sync it so actions see the remote state.
async fn synced(ids: Vec<String>, client: Arc<HttpExecutionClient>, options: JobListOptions) -> Jobs {
    let jobs = JobList::from_ids(ids, client, options);
    if let Err(failures) = jobs.sync_all().await {
        ui::print_failures("sync", &failures);
    }
    jobs
}

async fn watch(jobs: &Jobs, interval: Duration) -> Result<()> {
    let progress = ui::WatchProgress::start(jobs.len());
    let renderer = progress.clone();
    if !jobs.watch(interval, move |update| renderer.update(update)) {
        bail!("already watching");
    }

    let stopped = tokio::select! {
        _ = jobs.wait_watching() => false,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            true
        }
    };
    if stopped {
        jobs.stop_watching().await;
    }
    progress.finish(&jobs.status_breakdown(), stopped);
    render_rows(jobs, false);
    Ok(())
}

fn render_rows(jobs: &Jobs, json: bool) {
    let rows = jobs.summaries();
    if json {
        ui::print_json(&rows);
    } else {
        ui::print_table(&rows);
    }
}
