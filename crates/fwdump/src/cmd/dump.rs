use std::io::{Read, Write};
use std::path::Path;

use fwdump_session::{connect_with_config, plan_chunks, ChunkProgress, Session};
use serde::Serialize;
use tracing::info;

use crate::cmd::{parse_u32, DumpArgs};
use crate::exit::{io_error, session_error, CliError, CliResult, SUCCESS};
use crate::output::{hex32, print_report, OutputFormat, Report};

#[derive(Serialize)]
struct DumpOutput {
    device: String,
    chip_id: String,
    address: String,
    length: u32,
    chunks: u32,
    output: String,
    notices: usize,
}

impl Report for DumpOutput {
    fn title(&self) -> &'static str {
        "Memory Dump"
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Device", self.device.clone()),
            ("Chip ID", self.chip_id.clone()),
            ("Address", self.address.clone()),
            ("Length", format!("{} bytes", self.length)),
            ("Chunks", self.chunks.to_string()),
            ("Output", self.output.clone()),
            ("Notices", self.notices.to_string()),
        ]
    }
}

/// Parsed and checked region to read.
#[derive(Debug, PartialEq, Eq)]
struct Region {
    address: u32,
    length: u32,
    chunks: u32,
}

fn region(args: &DumpArgs) -> CliResult<Region> {
    let address = parse_u32("address", &args.address)?;
    let length = parse_u32("length", &args.length)?;
    if length == 0 {
        return Err(CliError::usage("length must be greater than zero"));
    }
    let plan = plan_chunks(address, length, args.chunk_size)
        .map_err(|err| session_error("invalid region", err))?;
    Ok(Region {
        address,
        length,
        chunks: plan.total_chunks(),
    })
}

pub fn run(args: DumpArgs, format: OutputFormat) -> CliResult<i32> {
    // Everything checkable offline is checked before the port is opened.
    let region = region(&args)?;
    let config = args.link.connect_config(args.chunk_size)?;

    let mut session = connect_with_config(&args.link.device, &config)
        .map_err(|err| session_error("connect failed", err))?;

    let Capture { chip_id, image } = capture(&mut session, &region)?;
    write_dump(&args.output, &image)?;
    info!(
        output = %args.output.display(),
        bytes = image.len(),
        "dump written"
    );

    let out = DumpOutput {
        device: args.link.device.display().to_string(),
        chip_id: hex32(chip_id),
        address: hex32(region.address),
        length: region.length,
        chunks: region.chunks,
        output: args.output.display().to_string(),
        notices: session.take_notices().len(),
    };
    print_report(&out, format);
    Ok(SUCCESS)
}

struct Capture {
    chip_id: u32,
    image: Vec<u8>,
}

/// Identify the chip, then read the region. No memory is requested unless
/// the device answers the identity request with a well-formed reply.
fn capture<R, W>(session: &mut Session<R, W>, region: &Region) -> CliResult<Capture>
where
    R: Read,
    W: Write,
{
    let info = session
        .request_device_info()
        .map_err(|err| session_error("device info failed", err))?;
    info!(chip_id = %hex32(info.chip_id), "dumping from device");

    let image = session
        .read_memory_with_progress(region.address, region.length, log_progress)
        .map_err(|err| session_error("memory read failed", err))?;
    Ok(Capture {
        chip_id: info.chip_id,
        image,
    })
}

fn log_progress(progress: &ChunkProgress) {
    info!(
        chunk = progress.index + 1,
        of = progress.total_chunks,
        address = %hex32(progress.address),
        bytes = progress.length,
        done = progress.bytes_done,
        total = progress.total_bytes,
        "read chunk"
    );
}

fn write_dump(path: &Path, image: &[u8]) -> CliResult<()> {
    std::fs::write(path, image)
        .map_err(|err| io_error(&format!("cannot write {}", path.display()), err))
}
