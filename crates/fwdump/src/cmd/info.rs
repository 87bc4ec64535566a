use fwdump_session::connect_with_config;
use serde::Serialize;
use tracing::debug;

use crate::cmd::InfoArgs;
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{hex32, print_report, OutputFormat, Report};

#[derive(Serialize)]
struct InfoOutput {
    device: String,
    banner: String,
    chip_id: String,
    notices: Vec<String>,
}

impl Report for InfoOutput {
    fn title(&self) -> &'static str {
        "Device Info"
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("Device", self.device.clone()),
            ("Banner", self.banner.clone()),
            ("Chip ID", self.chip_id.clone()),
        ];
        for notice in &self.notices {
            rows.push(("Notice", notice.clone()));
        }
        rows
    }
}

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.link.connect_config(fwdump_session::DEFAULT_CHUNK_SIZE)?;
    debug!(device = ?args.link.device, "connecting");

    let mut session = connect_with_config(&args.link.device, &config)
        .map_err(|err| session_error("connect failed", err))?;
    let info = session
        .request_device_info()
        .map_err(|err| session_error("device info failed", err))?;

    let out = InfoOutput {
        device: args.link.device.display().to_string(),
        banner: session
            .handshake_result()
            .map(|result| result.banner.clone())
            .unwrap_or_default(),
        chip_id: hex32(info.chip_id),
        notices: session
            .take_notices()
            .into_iter()
            .map(|notice| notice.text)
            .collect(),
    };

    print_report(&out, format);
    Ok(SUCCESS)
}
