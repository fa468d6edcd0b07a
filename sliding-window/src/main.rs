//! Entry point for `sliding-window`.
//!
//! Parses CLI arguments and dispatches into **send**, **receive**, or
//! **simulate** mode.  All protocol work is delegated to library modules;
//! `main.rs` owns only process setup (logging, signal handling, argument
//! parsing, file I/O).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use sliding_window::simulator::{Simulator, SimulatorConfig};
use sliding_window::{ArqConfig, Receiver, Sender, UdpNetwork};

/// Reliable in-order byte stream over UDP with a selective-ack sliding window.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    protocol: ProtocolArgs,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Args)]
struct ProtocolArgs {
    /// Payload bytes per data packet.
    #[arg(long, global = true, default_value_t = sliding_window::config::DEFAULT_PAYLOAD_SIZE)]
    payload_size: usize,
    /// Window size W (both ends must agree; modulus is 2·W).
    #[arg(long, global = true, default_value_t = sliding_window::config::DEFAULT_WINDOW_SIZE)]
    window: u8,
    /// Retransmission timeout in milliseconds.
    #[arg(long, global = true, default_value_t = 500)]
    timeout_ms: u64,
    /// Idle back-off between empty polls in milliseconds.
    #[arg(long, global = true, default_value_t = 10)]
    poll_ms: u64,
}

impl ProtocolArgs {
    fn config(&self) -> ArqConfig {
        ArqConfig::default()
            .with_payload_size(self.payload_size)
            .with_window_size(self.window)
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_poll_interval(Duration::from_millis(self.poll_ms))
    }
}

#[derive(Subcommand)]
enum Mode {
    /// Send a file to a listening receiver.
    Send {
        /// Remote receiver address (e.g. 127.0.0.1:9000).
        #[arg(short, long)]
        peer: SocketAddr,
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0:0")]
        bind: SocketAddr,
        /// File to send.
        file: PathBuf,
    },
    /// Receive one stream and write it to a file.
    Receive {
        /// Local address to bind (e.g. 0.0.0.0:9000).
        #[arg(short, long, default_value = "0.0.0.0:9000")]
        bind: SocketAddr,
        /// Where to write the received bytes.
        output: PathBuf,
    },
    /// Transfer random bytes through the in-memory lossy network and verify.
    Simulate {
        /// Number of source bytes.
        #[arg(long, default_value_t = 64 * 1024)]
        size: usize,
        /// Probability an ack is dropped.
        #[arg(long, default_value_t = 0.1)]
        ack_loss: f64,
        /// Probability a receive is served out of order.
        #[arg(long, default_value_t = 0.2)]
        reorder: f64,
        /// RNG seed for the source bytes and the fault model.
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.protocol.config();
    config.validate().context("invalid protocol parameters")?;

    // Ctrl-C cancels whichever endpoint is running.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupted; cancelling transfer");
            on_signal.cancel();
        }
    });

    match cli.mode {
        Mode::Send { peer, bind, file } => {
            let source = tokio::fs::read(&file)
                .await
                .with_context(|| format!("cannot read {}", file.display()))?;
            let net = UdpNetwork::connect(bind, peer)
                .await
                .with_context(|| format!("cannot bind {bind}"))?;
            log::info!("Sending {} to {peer} from {}", file.display(), net.local_addr);

            let sender = Sender::new(config, Arc::new(net))?.with_cancellation(cancel);
            let started = Instant::now();
            let report = sender.send(&source).await?;
            println!(
                "sent {} bytes in {} packets ({} retransmissions) in {:.2?}",
                report.bytes,
                report.packets,
                report.retransmissions,
                started.elapsed()
            );
        }
        Mode::Receive { bind, output } => {
            let net = UdpNetwork::bind(bind)
                .await
                .with_context(|| format!("cannot bind {bind}"))?;
            log::info!("Receiving on {}", net.local_addr);

            let receiver = Receiver::new(config, Arc::new(net))?.with_cancellation(cancel);
            let data = receiver.run().await?;
            tokio::fs::write(&output, &data)
                .await
                .with_context(|| format!("cannot write {}", output.display()))?;
            println!("received {} bytes into {}", data.len(), output.display());
        }
        Mode::Simulate {
            size,
            ack_loss,
            reorder,
            seed,
        } => simulate(config, size, ack_loss, reorder, seed).await?,
    }

    Ok(())
}

/// Run both endpoints in-process over the simulator.
///
/// Loss is only applied to the ack direction: a lost termination packet
/// would leave the receiver waiting forever.
async fn simulate(config: ArqConfig, size: usize, ack_loss: f64, reorder: f64, seed: u64) -> Result<()> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let source: Vec<u8> = (0..size).map(|_| rng.random()).collect();
    let depth = usize::from(config.window_size);

    let (tx, rx) = Simulator::with_faults(
        SimulatorConfig::default()
            .with_reorder(reorder, depth)
            .with_seed(seed),
        SimulatorConfig::default()
            .with_loss(ack_loss)
            .with_reorder(reorder, depth)
            .with_seed(seed.wrapping_add(1)),
    );

    let sender = Sender::new(config.clone(), Arc::new(tx.clone()))?;
    let receiver = Receiver::new(config, Arc::new(rx.clone()))?;

    let started = Instant::now();
    let (sent, received) = tokio::join!(sender.send(&source), receiver.run());
    let report = sent?;
    let received = received?;

    if received != source {
        bail!(
            "output mismatch: sent {} bytes, received {}",
            source.len(),
            received.len()
        );
    }
    println!(
        "simulated {} bytes: {} packets, {} retransmissions, {} acks dropped, {:.2?}",
        report.bytes,
        report.packets,
        report.retransmissions,
        rx.dropped(),
        started.elapsed()
    );
    Ok(())
}
