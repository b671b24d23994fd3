//! Cache maintenance: statistics, age-based purge, per-device invalidation.

use hamlink_core::{CacheStatistics, MaintenanceReport, Querier};
use serde::Serialize;

use crate::cli::{CacheArgs, CacheCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct ReportView<'a> {
    dry_run: bool,
    removed: &'a [hamlink_core::DeviceAddress],
}

fn stats_detail(s: &CacheStatistics) -> String {
    let when = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map_or_else(|| "-".into(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
    };
    [
        format!("Entries:          {}", s.unique_entries),
        format!("  system data:    {}", s.with_system_data),
        format!("  interfaces:     {}", s.with_interfaces),
        format!("  wireless peers: {}", s.with_peers),
        format!("  via vendor API: {}", s.via_vendor_api),
        format!("Oldest:           {}", when(s.oldest)),
        format!("Newest:           {}", when(s.newest)),
    ]
    .join("\n")
}

fn report_detail(v: &ReportView<'_>) -> String {
    let verb = if v.dry_run { "Would remove" } else { "Removed" };
    let noun = if v.removed.len() == 1 { "entry" } else { "entries" };
    let mut lines = vec![format!("{verb} {} cache {noun}", v.removed.len())];
    lines.extend(v.removed.iter().map(|a| format!("  {a}")));
    lines.join("\n")
}

fn print_report(report: &MaintenanceReport, global: &GlobalOpts) -> Result<(), CliError> {
    let view = ReportView {
        dry_run: report.dry_run,
        removed: &report.addresses,
    };
    let out = output::render_single(&global.output, &view, report_detail, |v| {
        v.removed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn handle(querier: &Querier, args: CacheArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        CacheCommand::Stats => {
            let stats = querier.statistics()?;
            let out = output::render_single(&global.output, &stats, stats_detail, |s| {
                s.unique_entries.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CacheCommand::Purge { older_than, dry_run } => {
            if !dry_run {
                let preview = querier.purge_older_than(older_than, true)?;
                if preview.is_empty() {
                    return print_report(&preview, global);
                }
                let message = format!(
                    "Delete {} cache entries older than {}?",
                    preview.len(),
                    humantime::format_duration(older_than)
                );
                if !util::confirm("cache purge", &message, global.yes)? {
                    return Ok(());
                }
            }
            let report = querier.purge_older_than(older_than, dry_run)?;
            print_report(&report, global)
        }

        CacheCommand::Invalidate { addresses, dry_run } => {
            if !dry_run {
                let message = format!("Delete cached data of {} device(s)?", addresses.len());
                if !util::confirm("cache invalidate", &message, global.yes)? {
                    return Ok(());
                }
            }
            let report = querier.invalidate(&addresses, dry_run)?;
            print_report(&report, global)
        }
    }
}
