//! Link sweeps over the configured `[[links]]`.

use std::sync::Arc;

use hamlink_config::Config;
use hamlink_core::{LinkDetails, Querier, SweepOutcome, SweepReport, SweepRunner};
use serde::Serialize;
use tabled::Tabled;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::{GlobalOpts, SweepArgs};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct LinkOutcome<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a LinkDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Tabled)]
struct SweepRow {
    #[tabled(rename = "Link")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Rx@1")]
    rx_1at2: String,
    #[tabled(rename = "Rx@2")]
    rx_2at1: String,
    #[tabled(rename = "Uptime")]
    uptime: String,
}

fn sweep_row(o: &LinkOutcome<'_>, color: bool) -> SweepRow {
    let first = o.details.and_then(|d| d.details.first());
    let status = match (&o.error, o.details) {
        (Some(e), _) => output::state(e, false, color),
        (None, Some(d)) if d.is_empty() => output::state("no link", false, color),
        (None, Some(d)) => output::state(&format!("{} link(s)", d.details.len()), true, color),
        (None, None) => "-".into(),
    };
    SweepRow {
        name: o.name.to_owned(),
        status,
        rx_1at2: first.map_or_else(|| "-".into(), |d| output::level(d.rx_level_1at2, color)),
        rx_2at1: first.map_or_else(|| "-".into(), |d| output::level(d.rx_level_2at1, color)),
        uptime: first.map_or_else(|| "-".into(), |d| output::duration(d.link_uptime)),
    }
}

fn print_report(report: &SweepReport, global: &GlobalOpts) -> Result<(), CliError> {
    let outcomes: Vec<LinkOutcome<'_>> = report
        .results
        .iter()
        .map(|r| match &r.outcome {
            Ok(details) => LinkOutcome {
                name: &r.target.name,
                details: Some(details),
                error: None,
            },
            Err(e) => LinkOutcome {
                name: &r.target.name,
                details: None,
                error: Some(e.to_string()),
            },
        })
        .collect();
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &outcomes,
        |o| sweep_row(o, color),
        |o| o.name.to_owned(),
    )?;
    output::print_output(&out, global.quiet);
    if !report.deferred.is_empty() && !global.quiet {
        eprintln!("Deferred: {}", report.deferred.join(", "));
    }
    Ok(())
}

pub async fn handle(
    querier: &Querier,
    cfg: &Config,
    args: SweepArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let targets = cfg.link_targets()?;
    if targets.is_empty() {
        let path = global.config.clone().unwrap_or_else(hamlink_config::config_path);
        return Err(CliError::NoLinks {
            path: path.display().to_string(),
        });
    }
    let runner = SweepRunner::new(Arc::new(querier.clone()))
        .with_width(args.width.unwrap_or(cfg.sweep.pool_width));

    if args.once {
        return match runner.sweep(&targets).await {
            SweepOutcome::Completed(report) => print_report(&report, global),
            SweepOutcome::Skipped => Err(CliError::Internal("sweep gate already held".into())),
        };
    }

    let interval = match args.interval {
        Some(interval) if interval.is_zero() => {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be positive".into(),
            });
        }
        Some(interval) => interval,
        None => cfg.sweep_interval()?,
    };

    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel::<SweepReport>(4);
    let periodic = {
        let runner = runner.clone();
        let cancel = cancel.clone();
        let targets = Arc::new(targets);
        tokio::spawn(async move { runner.run_periodic(targets, interval, cancel, tx).await })
    };
    info!(
        interval = %humantime::format_duration(interval),
        width = runner.width(),
        "sweeping links until interrupted"
    );

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("interrupt received, stopping sweeps");
                cancel.cancel();
                break;
            }
            report = rx.recv() => match report {
                Some(report) => print_report(&report, global)?,
                None => break,
            },
        }
    }
    periodic
        .await
        .map_err(|e| CliError::Internal(format!("sweep task failed: {e}")))?;
    Ok(())
}
