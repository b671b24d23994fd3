//! Per-device views: system data, interfaces, wireless peers.

use std::time::Duration;

use hamlink_core::Querier;
use hamlink_core::containers::{InterfaceSnapshot, PeerSnapshot, SystemSnapshot};
use tabled::Tabled;

use crate::cli::{DeviceArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct InterfaceRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    if_type: String,
    #[tabled(rename = "MAC")]
    mac: String,
}

impl From<&InterfaceSnapshot> for InterfaceRow {
    fn from(i: &InterfaceSnapshot) -> Self {
        Self {
            id: i.id,
            name: output::opt(i.name.as_deref()),
            if_type: output::opt(i.if_type),
            mac: output::opt(i.mac),
        }
    }
}

#[derive(Tabled)]
struct PeerRow {
    #[tabled(rename = "Remote MAC")]
    remote_mac: String,
    #[tabled(rename = "If")]
    interface: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Clients")]
    clients: String,
    #[tabled(rename = "Rx dBm")]
    rx: String,
    #[tabled(rename = "Tx dBm")]
    tx: String,
    #[tabled(rename = "Uptime")]
    uptime: String,
    #[tabled(rename = "CCQ %")]
    ccq: String,
}

fn peer_row(p: &PeerSnapshot, color: bool) -> PeerRow {
    PeerRow {
        remote_mac: p.remote_mac.to_string(),
        interface: output::opt(p.interface_id),
        role: match p.is_access_point {
            Some(true) => "ap".into(),
            Some(false) => "station".into(),
            None => "-".into(),
        },
        clients: output::opt(p.client_count),
        rx: output::level(p.rx_signal, color),
        tx: output::level(p.tx_signal, color),
        uptime: output::duration(Duration::from_secs(p.link_uptime_secs)),
        ccq: output::opt(p.ccq.map(|c| format!("{c:.0}"))),
    }
}

fn system_detail(s: &SystemSnapshot, query_time: Duration) -> String {
    let d = &s.record.descriptor;
    [
        format!("Address:      {}", s.address),
        format!("Model:        {}", d.model),
        format!("Vendor:       {}", d.vendor),
        format!("Version:      {}", d.version),
        format!("Detected by:  {} via {}", d.detected_by, d.api),
        format!("Features:     {}", d.features),
        format!("SNMP:         {} .. {}", d.minimum_protocol_version, d.maximum_protocol_version),
        format!("Name:         {}", output::opt(s.record.name.as_deref())),
        format!("Description:  {}", output::opt(s.record.description.as_deref())),
        format!("Location:     {}", output::opt(s.record.location.as_deref())),
        format!("Contact:      {}", output::opt(s.record.contact.as_deref())),
        format!("Object ID:    {}", output::opt(s.record.object_id.as_ref())),
        format!(
            "Uptime:       {}",
            output::duration(Duration::from_secs(s.uptime_secs.unwrap_or(0)))
        ),
        format!("Query time:   {} ms", query_time.as_millis()),
    ]
    .join("\n")
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn system(
    querier: &Querier,
    args: DeviceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let data = querier.system_data(args.address).await?;
    let snapshot = data.snapshot().await;
    let query_time = data.query_duration();
    let out = output::render_single(
        &global.output,
        &snapshot,
        |s| system_detail(s, query_time),
        |s| s.record.descriptor.model_and_version(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn interfaces(
    querier: &Querier,
    args: DeviceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let details = querier.network_interface_details(args.address).await?;
    details.force_evaluate_all().await;
    let snapshots = details.snapshots();
    let out = output::render_list(&global.output, &snapshots, |i| InterfaceRow::from(i), |i| {
        i.name.clone().unwrap_or_else(|| i.id.to_string())
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn peers(
    querier: &Querier,
    args: DeviceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let infos = querier.wireless_peer_infos(args.address).await?;
    let snapshots = infos.snapshots().await;
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &snapshots,
        |p| peer_row(p, color),
        |p| p.remote_mac.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
