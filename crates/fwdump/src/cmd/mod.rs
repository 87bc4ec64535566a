use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use fwdump_session::{ConnectConfig, SessionConfig, DEFAULT_CHUNK_SIZE};
use fwdump_transport::SerialPort;

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod dump;
pub mod info;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reset the device and print its banner and chip id.
    Info(InfoArgs),
    /// Read a memory region and write it to a file.
    Dump(DumpArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Info(args) => info::run(args, format),
        Command::Dump(args) => dump::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Flags shared by every command that talks to a device.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial device path (e.g. /dev/ttyUSB0).
    pub device: PathBuf,
    /// Line speed.
    #[arg(long, default_value_t = SerialPort::DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Read timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

impl LinkArgs {
    pub fn connect_config(&self, chunk_size: u32) -> CliResult<ConnectConfig> {
        Ok(ConnectConfig {
            baud_rate: self.baud,
            read_timeout: Some(parse_duration(&self.timeout)?),
            session: SessionConfig { chunk_size },
            ..ConnectConfig::default()
        })
    }
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub link: LinkArgs,
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Start address, decimal or 0x-prefixed hex.
    pub address: String,
    /// Number of bytes to read, decimal or 0x-prefixed hex.
    pub length: String,
    /// Where to write the raw dump.
    #[arg(long, short = 'o', default_value = "memory_dump.bin")]
    pub output: PathBuf,
    /// Bytes requested per read (1-65535).
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: u32,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a 32-bit number written in decimal or with a `0x` prefix.
pub fn parse_u32(what: &str, input: &str) -> CliResult<u32> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => input.replace('_', "").parse::<u32>(),
    };
    parsed.map_err(|_| {
        CliError::usage(format!(
            "invalid {what}: {input:?} (expected a 32-bit decimal or 0x hex value)"
        ))
    })
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("timeout must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid timeout value: {input}")))?;
    if value == 0 {
        return Err(CliError::usage("timeout must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
