//! Command handlers.
//!
//! Each command is split into a `handle_*` entry point that wires the HTTP
//! client to stdout, and a generic function over the cluster seams that does
//! the actual work.
//!
//! Ctrl+C keeps its default behaviour until a sync starts. From then on the
//! first interrupt stops dispatching new jobs and lets in-flight transfers
//! finish; a second one exits immediately.

use std::future::Future;
use std::io;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bucky_cluster::{
    find_inconsistencies, Cluster, HousekeepingFilter, InconsistencyReport, JobSet,
    MembershipSource, MetricCatalog, MetricMapping, MetricSelection, MetricTransfer, PlanRequest,
    Planner, SyncConfig, SyncExecutor, SyncReport,
};
use bucky_core::{Config, Error, SyncSettings};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::cli::{BackfillArgs, InconsistentArgs, RebalanceArgs};
use crate::client::BuckydClient;
use crate::render::{render_report, summarize_sync};

/// Handles the inconsistent command.
pub async fn handle_inconsistent(config: Config, args: InconsistentArgs) -> Result<()> {
    let client = BuckydClient::new(&config.client)?;
    let report = inconsistent(&client, &client, config, &args).await?;

    let rendered = render_report(&report, args.format)?;
    if rendered.ends_with('\n') || rendered.is_empty() {
        print!("{rendered}");
    } else {
        println!("{rendered}");
    }
    Ok(())
}

/// Handles the backfill command.
pub async fn handle_backfill(config: Config, args: BackfillArgs) -> Result<()> {
    let client = Arc::new(BuckydClient::new(&config.client)?);
    backfill(
        client.as_ref(),
        client.as_ref(),
        Arc::clone(&client),
        config,
        &args,
        cancel_on_interrupt,
    )
    .await?;
    Ok(())
}

/// Handles the rebalance command.
pub async fn handle_rebalance(config: Config, args: RebalanceArgs) -> Result<()> {
    let client = Arc::new(BuckydClient::new(&config.client)?);
    rebalance(
        client.as_ref(),
        client.as_ref(),
        Arc::clone(&client),
        config,
        &args,
        cancel_on_interrupt,
    )
    .await?;
    Ok(())
}

/// How the interrupt relay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// Interrupted twice; the process should exit now.
    Abort,
    /// Signal handling failed; cancellation is no longer possible.
    Unavailable,
}

/// Raises `cancel` on the first interrupt and returns on the second.
async fn relay_interrupts<F, Fut>(mut interrupted: F, cancel: watch::Sender<bool>) -> Interrupt
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if let Err(e) = interrupted().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        return Interrupt::Unavailable;
    }
    warn!("Interrupted, waiting for in-flight transfers (Ctrl+C again to abort)");
    let _ = cancel.send(true);

    match interrupted().await {
        Ok(()) => Interrupt::Abort,
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            Interrupt::Unavailable
        }
    }
}

/// Takes over Ctrl+C for the rest of the process and returns the flag it raises.
fn cancel_on_interrupt() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if relay_interrupts(signal::ctrl_c, tx).await == Interrupt::Abort {
            error!("Interrupted again, aborting sync");
            std::process::exit(130);
        }
    });
    rx
}

/// Finds the misplaced metrics of the cluster seeded at `args.host`.
pub async fn inconsistent<M, C>(
    membership: &M,
    catalog: &C,
    mut config: Config,
    args: &InconsistentArgs,
) -> Result<InconsistencyReport>
where
    M: MembershipSource + ?Sized,
    C: MetricCatalog + ?Sized,
{
    args.catalog.apply(&mut config.catalog);
    config.validate().context("Invalid configuration")?;

    let cluster =
        Cluster::resolve(&args.host, membership).await.context("Failed to resolve cluster")?;

    let selection = MetricSelection::from_pattern(args.regex.as_deref());
    let filter = housekeeping_filter(&config);
    let report =
        find_inconsistencies(&cluster, catalog, &selection, config.catalog.force_rebuild, &filter)
            .await
            .context("Failed to check cluster consistency")?;
    Ok(report)
}

/// Builds the plan request selected by the backfill flags.
///
/// # Errors
///
/// Returns [`Error::Config`] unless exactly one of a mapping file and a regex
/// is given, or if the mapping file cannot be read.
pub fn plan_request(args: &BackfillArgs) -> bucky_core::Result<PlanRequest> {
    let regex = args.regex.as_deref().filter(|pattern| !pattern.is_empty());
    match (&args.metric_map_file, regex) {
        (Some(path), None) => {
            let mapping = MetricMapping::from_file(path)?;
            info!(path = %path.display(), entries = mapping.len(), "Loaded metric map");
            Ok(PlanRequest::ExplicitMapping { mapping })
        }
        (None, Some(pattern)) => Ok(PlanRequest::RegexSelection { pattern: pattern.to_string() }),
        (None, None) => {
            Err(Error::Config("one of --metric-map-file or --regex is required".to_string()))
        }
        (Some(_), Some(_)) => Err(Error::Config(
            "--metric-map-file and --regex cannot be used together".to_string(),
        )),
    }
}

/// Copies metrics from the source cluster to the destination cluster.
///
/// `shutdown` is called once planning succeeded, right before the sync
/// starts, and returns the cancellation flag for the run.
pub async fn backfill<M, C, T, S>(
    membership: &M,
    catalog: &C,
    transfer: Arc<T>,
    mut config: Config,
    args: &BackfillArgs,
    shutdown: S,
) -> Result<SyncReport>
where
    M: MembershipSource + ?Sized,
    C: MetricCatalog + ?Sized,
    T: MetricTransfer + ?Sized + 'static,
    S: FnOnce() -> watch::Receiver<bool>,
{
    args.sync.apply(&mut config.sync);
    if args.force {
        config.catalog.force_rebuild = true;
    }
    config.validate().context("Invalid configuration")?;
    let request = plan_request(args)?;

    let source = Cluster::resolve(&args.src_cluster_seed, membership)
        .await
        .context("Failed to resolve source cluster")?;
    let destination = Cluster::resolve(&args.dst_cluster_seed, membership)
        .await
        .context("Failed to resolve destination cluster")?;

    let jobs = Planner::new(&source, &destination, catalog)
        .with_force_rebuild(config.catalog.force_rebuild)
        .with_job_logging(args.sync.verbose)
        .plan(&request)
        .await
        .context("Failed to plan backfill")?;

    execute(transfer, &config.sync, args.sync.verbose, &jobs, shutdown).await
}

/// Moves the misplaced metrics of one cluster to their owners.
///
/// `shutdown` is called as in [`backfill`], and not at all when nothing is
/// misplaced.
pub async fn rebalance<M, C, T, S>(
    membership: &M,
    catalog: &C,
    transfer: Arc<T>,
    mut config: Config,
    args: &RebalanceArgs,
    shutdown: S,
) -> Result<SyncReport>
where
    M: MembershipSource + ?Sized,
    C: MetricCatalog + ?Sized,
    T: MetricTransfer + ?Sized + 'static,
    S: FnOnce() -> watch::Receiver<bool>,
{
    args.catalog.apply(&mut config.catalog);
    args.sync.apply(&mut config.sync);
    config.validate().context("Invalid configuration")?;

    let cluster =
        Cluster::resolve(&args.host, membership).await.context("Failed to resolve cluster")?;
    if !cluster.is_healthy() {
        bail!("cluster {} is not healthy, refusing to rebalance", args.host);
    }

    let selection = MetricSelection::from_pattern(args.regex.as_deref());
    let filter = housekeeping_filter(&config);
    let report =
        find_inconsistencies(&cluster, catalog, &selection, config.catalog.force_rebuild, &filter)
            .await
            .context("Failed to check cluster consistency")?;
    if report.is_empty() {
        info!("Nothing to rebalance");
        return Ok(SyncReport::default());
    }

    let jobs = Planner::new(&cluster, &cluster, catalog)
        .with_job_logging(args.sync.verbose)
        .plan(&PlanRequest::Rebalance { report })
        .await
        .context("Failed to plan rebalance")?;

    execute(transfer, &config.sync, args.sync.verbose, &jobs, shutdown).await
}

fn housekeeping_filter(config: &Config) -> HousekeepingFilter {
    HousekeepingFilter::new(
        config.catalog.exclude_housekeeping,
        config.catalog.housekeeping_prefix.as_str(),
    )
}

async fn execute<T, S>(
    transfer: Arc<T>,
    settings: &SyncSettings,
    verbose: bool,
    jobs: &JobSet,
    shutdown: S,
) -> Result<SyncReport>
where
    T: MetricTransfer + ?Sized + 'static,
    S: FnOnce() -> watch::Receiver<bool>,
{
    let config = SyncConfig { verbose, ..SyncConfig::from(settings) };
    let executor = SyncExecutor::new(config, transfer);

    match executor.run_until(jobs, shutdown()).await {
        Ok(report) => {
            info!("{}", summarize_sync(&report));
            Ok(report)
        }
        Err(e) => {
            warn!("{}", summarize_sync(e.report()));
            for failure in &e.report().failures {
                warn!(
                    src = %failure.pair.source,
                    dst = %failure.pair.destination,
                    metric = %failure.job.old_name,
                    error = %failure.error,
                    "Failed job"
                );
            }
            Err(e.into())
        }
    }
}
