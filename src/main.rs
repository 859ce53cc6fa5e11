use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use adcspi::harness::{run_suite, BenchInputs, Testbench};
use adcspi::modules::{Channel, Response};
use adcspi::simulator::bench;
use adcspi::BenchConfig;

/// Cycle-accurate SPI ADC controller testbench
#[derive(Parser)]
#[command(name = "adcspi")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the verification suite
    Verify {
        /// TOML testbench configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Perform a single conversion
    Read {
        /// ADC channel (0-7)
        #[arg(short, long, value_parser = parse_channel)]
        channel: Channel,

        /// Fixed 16-bit response frame of the ADC model
        #[arg(short, long, value_parser = parse_u16, default_value = "0xd550")]
        pattern: u16,

        /// Print the bus waveform
        #[arg(short, long)]
        trace: bool,
    },

    /// Measure simulation throughput with start held high
    Bench {
        /// Reference ticks to simulate
        #[arg(long, default_value_t = 10_000_000)]
        ticks: u64,
    },
}

fn parse_u16(s: &str) -> Result<u16, String> {
    let r = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };

    r.map_err(|e| format!("invalid value '{}': {}", s, e))
}

fn parse_channel(s: &str) -> Result<Channel, String> {
    let n: u8 = s.parse().map_err(|e| format!("invalid channel '{}': {}", s, e))?;
    Channel::try_from(n).map_err(|e| e.to_string())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Verify { config } => {
            let config = match config {
                Some(path) => BenchConfig::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => BenchConfig::default(),
            };

            let report = run_suite(&config);
            println!("{}", report);

            if !report.passed() {
                return Ok(ExitCode::FAILURE);
            }
        },
        Commands::Read { channel, pattern, trace } => {
            let mut tb = Testbench::new(Response::Pattern(pattern), 4096);
            if trace {
                tb = tb.with_trace();
            }

            let r = tb.read(channel)?;
            tb.wait_idle()?;

            if let Some(trace) = tb.trace() {
                trace.show();
            }

            println!("{}: 0x{:03x} ({}) after {} ticks", r.channel, r.value, r.value, r.latency);
        },
        Commands::Bench { ticks } => {
            let mut tb = Testbench::new(Response::default(), ticks);

            let r = bench(&mut tb, BenchInputs { start: true, rst: false }, ticks);

            info!("{} conversions", tb.valid_pulses());
            println!("{}k ticks/s", r.kticks_per_s());
        },
    }

    Ok(ExitCode::SUCCESS)
}
