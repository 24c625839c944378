use std::net::{Ipv4Addr, SocketAddrV4};
use std::process::ExitCode;

use clap::Parser;
use knxmap::address::expand_range;
use knxmap::cli::Cli;
use knxmap::constants::DEFAULT_PORT;
use knxmap::{busmonitor, discovery, scheduler};

fn main() -> ExitCode {
    tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime");

    let local = tokio::task::LocalSet::new();
    let result = rt.block_on(local.run_until(run(cli)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "scan failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let cfg = cli.to_scan_config();

    if cli.bus_monitor || cli.group_monitor {
        let gateway = parse_target(cli.targets.first().ok_or("no target given")?, cli.port)?;
        let local = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
        busmonitor::run(local, gateway, &cfg, cli.group_monitor, |cemi| {
            println!("{:02x?}", cemi);
        })
        .await
        .map_err(|e| e.to_string())?;
        return Ok(());
    }

    if cli.search {
        let reports = discovery::search(&cfg).await.map_err(|e| e.to_string())?;
        for report in &reports {
            print!("{report}");
        }
        return Ok(());
    }

    let targets = expand_targets(&cli.targets, cli.port)?;
    let bus_targets = match &cli.bus_targets {
        Some(spec) => expand_range(spec).map_err(|e| e.to_string())?,
        None => Vec::new(),
    };

    let reports = scheduler::run_scan(targets, bus_targets, cli.bus_info, cfg)
        .await
        .map_err(|e| e.to_string())?;
    for report in &reports {
        print!("{report}");
    }
    Ok(())
}

fn parse_target(spec: &str, port: u16) -> Result<SocketAddrV4, String> {
    let ip: Ipv4Addr = spec.parse().map_err(|_| format!("invalid IPv4 address: {spec}"))?;
    Ok(SocketAddrV4::new(ip, port))
}

fn expand_targets(specs: &[String], port: u16) -> Result<Vec<SocketAddrV4>, String> {
    let mut out = Vec::new();
    for spec in specs {
        if let Ok(net) = spec.parse::<ipnet::Ipv4Net>() {
            for ip in net.hosts() {
                out.push(SocketAddrV4::new(ip, port));
            }
        } else {
            out.push(parse_target(spec, port)?);
        }
    }
    Ok(out)
}

#[allow(dead_code)]
fn default_port() -> u16 {
    DEFAULT_PORT
}
