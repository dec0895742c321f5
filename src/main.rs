//! l4quic: QUIC Initial recognizer
//!
//! Command-line front end for the matcher: validate configuration, inspect
//! captured datagrams, or watch a UDP port and log what would be routed.
//!
//! # Usage
//!
//! ```bash
//! # Dry-run on the configured UDP address
//! ./l4quic -c /path/to/config.json
//!
//! # Evaluate a captured client Initial
//! ./l4quic -c /path/to/config.json -i initial.bin
//!
//! # Run with environment overrides
//! L4QUIC_SNI='*.example.com' L4QUIC_LOG_LEVEL=debug ./l4quic
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tokio::fs::File;
use tokio::net::UdpSocket;
use tokio::signal;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

use l4quic::config::{apply_env_overrides, load_config_with_env, Config};
use l4quic::error::ConfigError;
use l4quic::matcher::QuicMatcher;
use l4quic::sniff::probe_initial;

/// Largest UDP payload
const MAX_DATAGRAM: usize = 65535;

const DEFAULT_CONFIG_PATH: &str = "/etc/l4quic/config.json";

/// Command-line arguments
struct Args {
    /// Configuration file path
    config_path: PathBuf,
    /// Whether `-c` was given
    config_explicit: bool,
    /// Generate default configuration
    generate_config: bool,
    /// Check configuration only
    check_config: bool,
    /// Captured datagram to evaluate
    inspect: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        let mut config_explicit = false;
        let mut generate_config = false;
        let mut check_config = false;
        let mut inspect = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" | "--config" => {
                    if let Some(path) = args.next() {
                        config_path = PathBuf::from(path);
                        config_explicit = true;
                    }
                }
                "-g" | "--generate-config" => {
                    generate_config = true;
                }
                "--check" => {
                    check_config = true;
                }
                "-i" | "--inspect" => {
                    let Some(path) = args.next() else {
                        eprintln!("{arg} requires a file path");
                        std::process::exit(1);
                    };
                    inspect = Some(PathBuf::from(path));
                }
                "-h" | "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "-v" | "--version" => {
                    println!("l4quic v{}", l4quic::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {arg}");
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        Self {
            config_path,
            config_explicit,
            generate_config,
            check_config,
            inspect,
        }
    }
}

fn print_help() {
    println!(
        r#"l4quic v{}

QUIC Initial recognizer and SNI/ALPN matcher for layer-4 routing.

USAGE:
    l4quic [OPTIONS]

OPTIONS:
    -c, --config <PATH>     Configuration file path [default: {DEFAULT_CONFIG_PATH}]
    -g, --generate-config   Generate default configuration and exit
    --check                 Check configuration and exit
    -i, --inspect <FILE>    Evaluate a captured datagram, print the report as JSON
                            and exit with status 0 on match, 1 otherwise
    -h, --help              Print help information
    -v, --version           Print version information

ENVIRONMENT:
    L4QUIC_LISTEN_ADDR       Override listen address
    L4QUIC_LOG_LEVEL         Override log level (trace, debug, info, warn, error)
    L4QUIC_SNI               Override server name patterns (comma-separated)
    L4QUIC_ALPN              Override ALPN patterns (comma-separated)
    L4QUIC_MAX_PREFIX_BYTES  Override the prefix buffering limit

Without --inspect, l4quic binds the configured UDP address and logs the
decision for every datagram it receives. It never replies or forwards.
"#,
        l4quic::VERSION
    );
}

/// Initialize logging
fn init_logging(config: &Config) {
    let level = match config.log.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.log.target);

    match (config.log.format == "json", config.log.timestamps) {
        (true, true) => builder.json().init(),
        (true, false) => builder.json().without_time().init(),
        (false, true) => builder.init(),
        (false, false) => builder.without_time().init(),
    }
}

/// Load the configuration file, falling back to defaults when the default
/// path does not exist. Returns whether the file was found.
fn load(args: &Args) -> Result<(Config, bool)> {
    match load_config_with_env(&args.config_path) {
        Ok(config) => Ok((config, true)),
        Err(ConfigError::FileNotFound { .. }) if !args.config_explicit => {
            let config = apply_env_overrides(Config::default(), |name| std::env::var(name).ok())?;
            Ok((config, false))
        }
        Err(e) => Err(anyhow!(
            "Failed to load configuration from {:?}: {}",
            args.config_path,
            e
        )),
    }
}

/// Evaluate a captured datagram file and print the report
async fn inspect(config: &Config, matcher: &QuicMatcher, path: &Path) -> Result<bool> {
    let mut file = File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut prefix = Vec::new();
    let matched = tokio::time::timeout(
        config.listen.sniff_timeout(),
        matcher.match_stream(&mut file, &mut prefix),
    )
    .await
    .map_err(|_| anyhow!("Timed out reading {}", path.display()))??;

    let probe = match probe_initial(&prefix) {
        Ok(probe) => serde_json::to_value(probe)?,
        Err(e) => serde_json::json!({
            "error": e.to_string(),
            "kind": e.kind().to_string(),
        }),
    };

    let report = serde_json::json!({
        "file": path.display().to_string(),
        "bytes": prefix.len(),
        "matched": matched,
        "probe": probe,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(matched)
}

/// Log the decision for one received datagram
fn classify(matcher: &QuicMatcher, datagram: &[u8], peer: SocketAddr) -> bool {
    let matched = matcher.matches_datagram(datagram);

    if tracing::enabled!(Level::DEBUG) {
        match probe_initial(datagram) {
            Ok(probe) => debug!(
                "{} bytes from {}: matched={}, version={}, sni={:?}, alpn={:?}",
                datagram.len(),
                peer,
                matched,
                probe.version,
                probe.server_name(),
                probe.alpn()
            ),
            Err(e) => debug!(
                "{} bytes from {}: matched={}, not a client Initial ({}): {}",
                datagram.len(),
                peer,
                matched,
                e.kind(),
                e
            ),
        }
    }

    matched
}

/// Main application entry point
#[tokio::main]
async fn main() -> Result<()> {
    let start_time = Instant::now();

    // Parse arguments
    let args = Args::parse();

    // Handle generate-config
    if args.generate_config {
        l4quic::config::create_default_config(&args.config_path)?;
        println!("Generated default configuration at {:?}", args.config_path);
        return Ok(());
    }

    // Load configuration
    let (config, from_file) = load(&args)?;

    // Handle check-config
    if args.check_config {
        QuicMatcher::from_config(&config.matcher)?;
        println!("Configuration is valid");
        return Ok(());
    }

    // Initialize logging
    init_logging(&config);

    let matcher = QuicMatcher::from_config(&config.matcher)?;

    if let Some(path) = &args.inspect {
        let matched = inspect(&config, &matcher, path).await?;
        std::process::exit(if matched { 0 } else { 1 });
    }

    info!("l4quic v{}", l4quic::VERSION);
    if from_file {
        info!("Configuration loaded from {:?}", args.config_path);
    } else {
        warn!(
            "No configuration at {:?}, using defaults",
            args.config_path
        );
    }

    let socket = UdpSocket::bind(config.listen.address)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen.address))?;

    info!(
        "l4quic ready on {} (sni: {:?}, alpn: {:?}, max prefix: {} bytes)",
        socket.local_addr()?,
        config.matcher.sni,
        config.matcher.alpn,
        matcher.max_prefix_bytes()
    );
    info!(
        "Startup complete in {:.2}ms",
        start_time.elapsed().as_secs_f64() * 1000.0
    );

    let mut buf = vec![0u8; MAX_DATAGRAM];
    let mut received: u64 = 0;
    let mut matched: u64 = 0;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buf) => {
                let (len, peer) = match result {
                    Ok(r) => r,
                    Err(e) => {
                        warn!("UDP receive failed: {}", e);
                        continue;
                    }
                };
                received += 1;
                if classify(&matcher, &buf[..len], peer) {
                    matched += 1;
                }
            }
            signal = &mut shutdown => {
                match signal {
                    Ok(name) => info!("Received {}, initiating shutdown...", name),
                    Err(e) => warn!("Signal handling failed: {}, shutting down", e),
                }
                break;
            }
        }
    }

    info!(
        "Final stats: {} datagrams received, {} matched",
        received, matched
    );
    info!("Shutdown complete");

    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::select! {
        result = signal::ctrl_c() => result.map(|()| "SIGINT"),
        result = wait_for_sigterm() => result.map(|()| "SIGTERM"),
    }
}

/// Wait for SIGTERM signal
#[cfg(unix)]
async fn wait_for_sigterm() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate())?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> std::io::Result<()> {
    // On non-Unix platforms, just wait forever
    std::future::pending::<std::io::Result<()>>().await
}
