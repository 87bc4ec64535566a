use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A command result that can be printed in every output format.
pub trait Report: Serialize {
    /// Heading for human-readable formats.
    fn title(&self) -> &'static str;

    /// Field/value pairs for table and pretty output, in display order.
    fn rows(&self) -> Vec<(&'static str, String)>;
}

pub fn print_report<R: Report>(report: &R, format: OutputFormat) {
    println!("{}", render(report, format));
}

fn render<R: Report>(report: &R, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (field, value) in report.rows() {
                table.add_row(vec![field.to_string(), value]);
            }
            table.to_string()
        }
        OutputFormat::Pretty => {
            let rows = report.rows();
            let width = rows.iter().map(|(field, _)| field.len()).max().unwrap_or(0) + 1;
            let mut out = format!("{}:", report.title());
            for (field, value) in rows {
                out.push_str(&format!("\n  {:<width$} {value}", format!("{field}:")));
            }
            out
        }
    }
}

/// Render an address or id the way device datasheets do.
pub fn hex32(value: u32) -> String {
    format!("0x{value:08X}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        chip_id: String,
        size: u32,
    }

    impl Report for Sample {
        fn title(&self) -> &'static str {
            "Sample"
        }

        fn rows(&self) -> Vec<(&'static str, String)> {
            vec![
                ("Chip ID", self.chip_id.clone()),
                ("Size", self.size.to_string()),
            ]
        }
    }

    fn sample() -> Sample {
        Sample {
            chip_id: hex32(0xCAFE_BABE),
            size: 5000,
        }
    }

    #[test]
    fn json_output_is_one_line() {
        assert_eq!(
            render(&sample(), OutputFormat::Json),
            r#"{"chip_id":"0xCAFEBABE","size":5000}"#
        );
    }

    #[test]
    fn pretty_output_aligns_values() {
        assert_eq!(
            render(&sample(), OutputFormat::Pretty),
            "Sample:\n  Chip ID: 0xCAFEBABE\n  Size:    5000"
        );
    }

    #[test]
    fn table_output_has_every_field() {
        let table = render(&sample(), OutputFormat::Table);
        assert!(table.contains("FIELD"));
        assert!(table.contains("0xCAFEBABE"));
        assert!(table.contains("5000"));
    }

    #[test]
    fn hex32_pads() {
        assert_eq!(hex32(0x10), "0x00000010");
    }
}
