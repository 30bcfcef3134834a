use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use nsslink_icd::{
    decode_fields, ControlMode, DecodedField, IcdError, SetpointValue, Telemetry, TelemetryBlock,
};
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

/// Print `value` as one JSON line, or `rows` as a two-column table or
/// aligned `key value` lines.
pub fn emit<T: Serialize>(value: &T, rows: &[(&str, String)], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (name, value) in rows {
                table.add_row(vec![name.to_string(), value.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (name, value) in rows {
                println!("{name:<20} {value}");
            }
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// A decoded telemetry block with its display-oriented extras.
#[derive(Debug, Serialize)]
pub struct TelemetryReport {
    pub block: TelemetryBlock,
    pub id: u8,
    pub raw: String,
    pub record: Telemetry,
    pub fields: Vec<DecodedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setpoint: Option<SetpointValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub faults: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<&'static str>,
}

impl TelemetryReport {
    pub fn build(block: TelemetryBlock, bytes: &[u8]) -> Result<Self, IcdError> {
        let record = Telemetry::decode(block, bytes)?;
        let fields = decode_fields(block, bytes)?;
        let (setpoint, faults, status) = match &record {
            Telemetry::Standard(tm) => (
                Some(tm.setpoint_value()),
                tm.fault_names(),
                tm.status_names(),
            ),
            _ => (None, Vec::new(), Vec::new()),
        };
        Ok(Self {
            block,
            id: block.id(),
            raw: hex::encode(&bytes[..block.len()]),
            record,
            fields,
            setpoint,
            faults,
            status,
        })
    }

    fn mode_label(&self) -> Option<String> {
        match &self.record {
            Telemetry::Standard(tm) => Some(match ControlMode::try_from(tm.control_mode) {
                Ok(mode) => mode.to_string(),
                Err(_) => format!("0x{:02X}", tm.control_mode),
            }),
            _ => None,
        }
    }
}

pub fn print_telemetry(report: &TelemetryReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![report.block.name(), "VALUE", "UNIT"]);
            for field in &report.fields {
                table.add_row(vec![
                    field.name.to_string(),
                    render_field(field),
                    field.unit.to_string(),
                ]);
            }
            if let Some(mode) = report.mode_label() {
                table.add_row(vec!["mode".to_string(), mode, String::new()]);
            }
            if let Some(setpoint) = &report.setpoint {
                table.add_row(vec!["setpoint_value".to_string(), setpoint.to_string(), String::new()]);
            }
            if !report.faults.is_empty() {
                table.add_row(vec!["faults".to_string(), report.faults.join(" | "), String::new()]);
            }
            if !report.status.is_empty() {
                table.add_row(vec!["status_flags".to_string(), report.status.join(" | "), String::new()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let mut line = report.block.name().to_string();
            for field in &report.fields {
                line.push(' ');
                line.push_str(field.name);
                line.push('=');
                line.push_str(&render_field(field));
                if !field.unit.is_empty() && field.unit != "raw" {
                    line.push_str(field.unit);
                }
            }
            if let Some(setpoint) = &report.setpoint {
                line.push_str(&format!(" [{setpoint}]"));
            }
            println!("{line}");
        }
    }
}

fn render_field(field: &DecodedField) -> String {
    // Status and fault words read better as hex.
    match (field.name, field.value) {
        ("status" | "fault", nsslink_icd::FieldValue::Unsigned(v)) => format!("0x{v:08X}"),
        _ => field.value.to_string(),
    }
}
