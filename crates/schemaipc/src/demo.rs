//! The demo schema spoken by `serve` and `send`: one duplex Echo message.

use schemaipc_codec::record;
use schemaipc_schema::{FieldType, MessageDirection, MessageField, Schema, SchemaMessage};

record! {
    pub struct EchoMessage {
        "payload" => pub payload: Vec<u8> [bytes],
    }
}

pub fn demo_schema() -> Schema {
    Schema::new(vec![SchemaMessage::new(
        MessageDirection::Duplex,
        "Echo",
        vec![MessageField::required("payload", FieldType::DynamicBinary)],
    )])
}
