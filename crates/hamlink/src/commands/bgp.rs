//! BGP session listing (RouterOS API devices).

use hamlink_core::{BgpPeer, Querier};
use tabled::Tabled;

use crate::cli::{BgpArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct BgpRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Remote")]
    remote: String,
    #[tabled(rename = "AS")]
    remote_as: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Uptime")]
    uptime: String,
    #[tabled(rename = "Prefixes")]
    prefixes: String,
}

fn row(p: &BgpPeer, color: bool) -> BgpRow {
    let state = if p.disabled {
        output::state("disabled", false, color)
    } else {
        output::state(&p.state, p.state.eq_ignore_ascii_case("established"), color)
    };
    BgpRow {
        name: p.name.clone(),
        remote: output::opt(p.remote_address),
        remote_as: output::opt(p.remote_as),
        state,
        uptime: output::duration(std::time::Duration::from_secs(p.uptime_secs)),
        prefixes: output::opt(p.prefix_count),
    }
}

pub async fn handle(querier: &Querier, args: BgpArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let peers = querier.fetch_bgp_peers(args.address, args.remote).await?;
    let color = output::should_color(&global.color);
    let out = output::render_list(&global.output, &peers.peers, |p| row(p, color), |p| {
        p.name.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
