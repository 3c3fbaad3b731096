use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use schemaipc_peer::MetaDescriptor;
use schemaipc_schema::FieldType;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
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

#[derive(Serialize)]
struct InfoOutput<'a> {
    min_version: i32,
    curr_version: i32,
    messages: Vec<DescriptorOutput<'a>>,
}

#[derive(Serialize)]
struct DescriptorOutput<'a> {
    id: u32,
    direction: &'a str,
    name: String,
    fields: Vec<FieldOutput>,
}

#[derive(Serialize)]
struct FieldOutput {
    name: String,
    field_type: &'static str,
    optional: bool,
}

pub fn print_info(versions: (i32, i32), descriptors: &[MetaDescriptor], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = InfoOutput {
                min_version: versions.0,
                curr_version: versions.1,
                messages: descriptors.iter().map(descriptor_output).collect(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "DIRECTION", "NAME", "FIELDS"]);
            for descriptor in descriptors {
                let fields: Vec<String> = descriptor
                    .fields
                    .iter()
                    .map(|field| {
                        let optional = if field.optional != 0 { "?" } else { "" };
                        format!(
                            "{}{}: {}",
                            String::from_utf8_lossy(&field.name),
                            optional,
                            field_type_name(field.field_type)
                        )
                    })
                    .collect();
                table.add_row(vec![
                    descriptor.id.to_string(),
                    direction_name(descriptor.direction).to_string(),
                    String::from_utf8_lossy(&descriptor.name).into_owned(),
                    fields.join(", "),
                ]);
            }
            println!("versions: min={} curr={}", versions.0, versions.1);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("versions: min={} curr={}", versions.0, versions.1);
            for descriptor in descriptors {
                println!(
                    "#{} {} {} ({} fields)",
                    descriptor.id,
                    direction_name(descriptor.direction),
                    String::from_utf8_lossy(&descriptor.name),
                    descriptor.fields.len()
                );
            }
        }
    }
}

#[derive(Serialize)]
struct PingOutput {
    seq: u32,
    timestamp: i64,
    rtt_us: u128,
}

pub fn print_ping(seq: u32, timestamp: i64, rtt_us: u128, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = PingOutput {
                seq,
                timestamp,
                rtt_us,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("pong seq={seq} timestamp={timestamp} rtt={rtt_us}us");
        }
    }
}

#[derive(Serialize)]
struct EchoOutput<'a> {
    payload: &'a str,
    payload_size: usize,
}

pub fn print_echo(payload: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let preview = payload_preview(payload);
            let out = EchoOutput {
                payload: &preview,
                payload_size: payload.len(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{}", payload_preview(payload));
        }
    }
}

fn descriptor_output(descriptor: &MetaDescriptor) -> DescriptorOutput<'_> {
    DescriptorOutput {
        id: descriptor.id,
        direction: direction_name(descriptor.direction),
        name: String::from_utf8_lossy(&descriptor.name).into_owned(),
        fields: descriptor
            .fields
            .iter()
            .map(|field| FieldOutput {
                name: String::from_utf8_lossy(&field.name).into_owned(),
                field_type: field_type_name(field.field_type),
                optional: field.optional != 0,
            })
            .collect(),
    }
}

fn direction_name(tag: u16) -> &'static str {
    match schemaipc_schema::MessageDirection::from_wire_tag(tag) {
        Some(direction) => direction.label(),
        None => "unknown",
    }
}

fn field_type_name(tag: u16) -> &'static str {
    match FieldType::from_wire_tag(tag) {
        Some(FieldType::FixedBinary) => "fixed_binary",
        Some(FieldType::DynamicBinary) => "binary",
        Some(FieldType::LongBinary) => "long_binary",
        Some(FieldType::UInt64) => "uint64",
        Some(FieldType::Int64) => "int64",
        Some(FieldType::UInt32) => "uint32",
        Some(FieldType::Int32) => "int32",
        Some(FieldType::UInt16) => "uint16",
        Some(FieldType::Int16) => "int16",
        Some(FieldType::Object) => "object",
        Some(FieldType::Array) => "array",
        None => "unknown",
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
