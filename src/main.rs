//! Sitwatch CLI
//!
//! Usage:
//!   sitwatch --input samples.txt              # Replay a recorded session
//!   some-pose-pipeline | sitwatch             # Read samples from stdin
//!   sitwatch --input samples.txt --json       # JSON lines output
//!   sitwatch --serve                          # HTTP API server

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use sitwatch::core::{run_server, LineSource, Monitor, Settings};
use sitwatch::types::{Event, PostureKind, StateOutput};
use sitwatch::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "sitwatch",
    version = VERSION,
    about = "Sitwatch - Alert when a lying subject sits up",
    long_about = "Sitwatch turns a noisy per-frame posture signal (hip y minus shoulder y,\n\
                  normalized) into debounced events and rate-limited alerts.\n\n\
                  Input lines (one sample each, '#' starts a comment):\n  \
                  <secs> <vdiff>          e.g. 12.5 0.31\n  \
                  <secs> -                nobody detected\n  \
                  t=<secs> vdiff=<v|none>\n  \
                  <secs> + 12 numbers     x y visibility for l/r shoulder, l/r hip\n\n\
                  States:\n  \
                  LYING_DOWN       - Subject lying down\n  \
                  PENDING_SIT_UP   - Sitting seen, waiting for it to persist\n  \
                  CONFIRMED_SIT_UP - Sitting confirmed, alert sent unless in cooldown"
)]
struct Args {
    /// Settings file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Vertical diff above which the subject counts as sitting
    #[arg(long)]
    threshold: Option<f64>,

    /// Seconds the sitting signal must hold before confirmation
    #[arg(long)]
    persistence: Option<f64>,

    /// Minimum seconds between two alerts
    #[arg(long)]
    cooldown: Option<f64>,

    /// Sample file to replay ("-" for stdin)
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Output as JSON lines
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Print every sample and debug logs
    #[arg(short, long)]
    verbose: bool,

    /// Ring the terminal bell on alert
    #[arg(long)]
    bell: bool,

    /// Notifier to run on alert, program first (the message is appended)
    #[arg(long = "notify-cmd", num_args = 1.., value_name = "ARGV")]
    notify_cmd: Vec<String>,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address (overrides the settings file)
    #[arg(long)]
    addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    let settings = load_settings(&args)?;

    if args.serve {
        let addr = settings.server.addr.clone();
        run_server(&addr, settings)
            .await
            .with_context(|| format!("server on {} failed", addr))?;
        return Ok(());
    }

    run_replay(&args, &settings)
}

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing(args: &Args) -> Result<()> {
    let level = if args.verbose {
        "debug"
    } else if args.serve {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_ansi(!args.no_color)
        .with_env_filter(EnvFilter::from_default_env().add_directive(format!("sitwatch={}", level).parse()?))
        .init();
    Ok(())
}

/// Defaults < settings file < flags
fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Settings::default(),
    };

    if let Some(threshold) = args.threshold {
        settings.detection.posture_threshold = threshold;
    }
    if let Some(persistence) = args.persistence {
        settings.detection.persistence_secs = persistence;
    }
    if let Some(cooldown) = args.cooldown {
        settings.detection.cooldown_secs = cooldown;
    }
    if args.bell {
        settings.alert.bell = true;
    }
    if !args.notify_cmd.is_empty() {
        settings.alert.command = args.notify_cmd.clone();
    }
    if let Some(addr) = &args.addr {
        settings.server.addr = addr.clone();
    }

    settings.validate().context("invalid settings")?;
    Ok(settings)
}

/// Replay samples from a file or stdin through one monitor
fn run_replay(args: &Args, settings: &Settings) -> Result<()> {
    let reader: Box<dyn BufRead> = if args.input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(&args.input).with_context(|| format!("opening {}", args.input))?;
        Box::new(BufReader::new(file))
    };

    let mut monitor = Monitor::new(
        settings.detection.machine_config()?,
        settings.detection.metrics_calculator()?,
    );
    for sink in settings.sinks() {
        monitor.add_sink(sink);
    }

    if !args.json {
        print_header(settings, args.no_color);
    }

    let mut source = LineSource::new(reader);
    let stats = monitor.run(&mut source, |output| print_output(output, args));

    if args.json {
        eprintln!("{}", serde_json::to_string(stats)?);
    } else {
        println!();
        println!("Total runtime: {}", stats.runtime_string());
        println!("Samples: {} ({} without detection, {} rejected)", stats.samples, stats.missing, stats.rejected);
        println!("Total alerts: {} ({} suppressed by cooldown)", stats.alerts, stats.suppressed);
    }
    Ok(())
}

/// Print header
fn print_header(settings: &Settings, no_color: bool) {
    let d = &settings.detection;
    if no_color {
        println!("Sitwatch v{}", VERSION);
    } else {
        println!("\x1b[1mSitwatch v{}\x1b[0m", VERSION);
    }
    println!(
        "threshold={} | persistence={}s | cooldown={}s",
        d.posture_threshold, d.persistence_secs, d.cooldown_secs
    );
    println!();
}

/// Print one output: every sample with --json or --verbose, otherwise only those with events
fn print_output(output: &StateOutput, args: &Args) {
    if args.json {
        match serde_json::to_string(output) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("failed to encode output: {}", e),
        }
        return;
    }
    if output.events.is_empty() && !args.verbose {
        return;
    }

    if args.no_color {
        println!("{}", output.to_parseable_string());
    } else {
        println!("{}", output.to_terminal_string());
    }
    print_event_messages(output, args.no_color);
}

/// Print event messages
fn print_event_messages(output: &StateOutput, no_color: bool) {
    let (red, reset) = if no_color {
        ("", "")
    } else {
        (PostureKind::ConfirmedSitUp.color_code(), PostureKind::color_reset())
    };
    for event in &output.events {
        match event {
            Event::Alert { .. } => println!("{}  ALERT: {}{}", red, event.description(), reset),
            Event::Confirmed { alerted: false, .. } => {
                println!("  {} ({:.0}s left)", event.description(), output.cooldown_remaining_ms as f64 / 1000.0)
            }
            _ => println!("  {}", event.description()),
        }
    }
}
