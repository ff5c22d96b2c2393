/*
 *  main.rs
 *
 *  osdcast - pixels over datagrams
 *  (c) 2024-26 the osdcast authors
 *
 *  TODO:
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use env_logger::Env;
use log::{debug, info, warn};
use tokio::net::UdpSocket;
use tokio::signal::unix::{signal, SignalKind};

use osdcast::config::{self, AppConfig, DEFAULT_PORT};
use osdcast::engine::Engine;
use osdcast::metrics::{MetricProvider, ProcMetricProvider};
use osdcast::surface::{DrawSurface, LogSurface};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Receive buffer comfortably above the protocol ceiling, so oversized
/// datagrams arrive intact and are rejected by the decoder rather than
/// silently truncated by the socket.
const RECV_BUF: usize = 2048;

/// Pulls everything queued on the socket and applies it in arrival order.
/// Returns the time spent, for the stats overlay.
fn drain_socket(
    socket: &UdpSocket,
    engine: &mut Engine,
    surface: &mut dyn DrawSurface,
) -> anyhow::Result<u32> {
    let started = Instant::now();
    let mut buf = [0u8; RECV_BUF];
    loop {
        match socket.try_recv_from(&mut buf) {
            Ok((len, peer)) => {
                debug!("datagram of {} bytes from {}", len, peer);
                engine.ingest(&buf[..len], surface);
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
            Err(e) => return Err(e).context("recv on channel socket"),
        }
    }
    Ok(started.elapsed().as_millis() as u32)
}

fn load_config(path: Option<&PathBuf>) -> AppConfig {
    let resolved = path.cloned().or_else(config::find_config_file);
    let Some(p) = resolved else {
        info!("no config file found, using built-in defaults");
        return AppConfig::default();
    };
    match AppConfig::load(&p) {
        Ok(cfg) => {
            info!("configuration loaded from {}", p.display());
            cfg
        }
        Err(e) => {
            warn!("config {} unusable ({}), using built-in defaults", p.display(), e);
            AppConfig::default()
        }
    }
}

async fn run_loop(
    mut engine: Engine,
    socket: UdpSocket,
    config_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut surface = LogSurface;
    let mut provider = ProcMetricProvider::new(engine.config().system_refresh_ms);

    engine.install(&mut surface);

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    loop {
        let loop_start = Instant::now();
        let wait = engine.wait_budget(loop_start);

        tokio::select! {
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down");
                break;
            }
            _ = sighup.recv() => {
                // Reload runs synchronously here, in the loop; the handler
                // context never touches engine state.
                let cfg = load_config(config_path.as_ref());
                provider.set_interval(cfg.system_refresh_ms);
                engine.reload(cfg, &mut surface);
            }
            ready = socket.readable() => {
                ready.context("waiting on channel socket")?;
                let drain_ms = drain_socket(&socket, &mut engine, &mut surface)?;
                engine.stats_mut().last_drain_ms = drain_ms;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        let now = Instant::now();
        engine.stats_mut().idle_applied_ms = wait.as_millis() as u32;

        if provider.refresh_if_due(now, engine.bank_mut()) {
            engine.note_system_update();
        }

        engine.maybe_refresh(now, &mut surface);

        if let Some(overlay) = engine.tick_stats(now) {
            debug!("stats\n{}", overlay);
        }

        engine.stats_mut().last_loop_ms = loop_start.elapsed().as_millis() as u32;
    }

    Ok(())
}

// Single-threaded by design: the engine's tables are owned by this loop and
// never shared.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about("UDP-driven OSD overlay runtime")
        .arg(Arg::new("debug")
            .action(ArgAction::SetTrue)
            .long("debug")
            .short('v')
            .alias("verbose")
            .help("Enable debug log level")
            .required(false))
        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .help("Configuration file (JSON)")
            .required(false))
        .arg(Arg::new("port")
            .short('p')
            .long("port")
            .value_parser(clap::value_parser!(u16))
            .help("UDP channel port")
            .required(false))
        .arg(Arg::new("dump-config")
            .long("dump-config")
            .action(ArgAction::SetTrue)
            .help("Print the effective configuration and exit")
            .required(false))
        .get_matches();

    let debug_enabled = matches.get_flag("debug");
    env_logger::Builder::from_env(
        Env::default().default_filter_or(if debug_enabled { "debug" } else { "info" }),
    )
    .format_timestamp_secs()
    .init();

    info!("{} v.{} built {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let cfg = load_config(config_path.as_ref());

    if matches.get_flag("dump-config") {
        println!("{:#?}", cfg);
        return Ok(());
    }

    let port = matches.get_one::<u16>("port").copied().unwrap_or(DEFAULT_PORT);

    // The one fatal startup condition: the channel socket must be ours.
    let socket = UdpSocket::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("binding channel socket on port {}", port))?;
    info!(
        "listening on 0.0.0.0:{} | canvas {}x{} | {} asset(s)",
        port,
        cfg.width,
        cfg.height,
        cfg.assets.len()
    );

    let engine = Engine::new(cfg);
    run_loop(engine, socket, config_path).await
}
