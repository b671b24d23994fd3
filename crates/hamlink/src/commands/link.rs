//! Link correlation between one device and its far-end candidates.

use hamlink_core::{LinkDetail, Querier};
use tabled::Tabled;

use crate::cli::{GlobalOpts, LinkArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
pub(crate) struct LinkRow {
    #[tabled(rename = "Side 1")]
    side1: String,
    #[tabled(rename = "Side 2")]
    side2: String,
    #[tabled(rename = "Rx@1")]
    rx_1at2: String,
    #[tabled(rename = "Rx@2")]
    rx_2at1: String,
    #[tabled(rename = "Uptime")]
    uptime: String,
    #[tabled(rename = "AP")]
    ap: String,
}

fn side(address: impl std::fmt::Display, interface: Option<&str>, model: &str) -> String {
    format!("{address} {}\n{model}", interface.unwrap_or("-"))
}

pub(crate) fn link_row(d: &LinkDetail, color: bool) -> LinkRow {
    LinkRow {
        side1: side(d.address1, d.interface_name1.as_deref(), &d.model_and_version1),
        side2: side(d.address2, d.interface_name2.as_deref(), &d.model_and_version2),
        rx_1at2: output::level(d.rx_level_1at2, color),
        rx_2at1: output::level(d.rx_level_2at1, color),
        uptime: output::duration(d.link_uptime),
        ap: output::opt(d.side_of_access_point),
    }
}

pub(crate) fn link_id(d: &LinkDetail) -> String {
    format!("{} {}", d.address1, d.address2)
}

pub async fn handle(
    querier: &Querier,
    args: LinkArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let links = querier.fetch_link_details(args.a, &args.b).await?;
    tracing::debug!(
        links = links.details.len(),
        query_ms = u64::try_from(links.query_duration.as_millis()).unwrap_or(u64::MAX),
        "link details ready"
    );
    if links.is_empty() && !global.quiet {
        eprintln!("No radio link found between {} and {:?}", args.a, args.b);
    }
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &links.details,
        |d| link_row(d, color),
        link_id,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
