//! The meta-schema: how a schema describes itself on the wire.
//!
//! The Hello reply advertises the user-registered messages as two blobs,
//! each produced by this same codec: `schema` encodes the descriptor list,
//! `descriptorRegistry` the flattened field-spec list. Internal descriptors
//! (IDs 0-2) are implicit on both ends and never advertised.

use bytes::Bytes;
use schemaipc_codec::{encode, record, Decoder};
use schemaipc_schema::{
    DescriptorRegistry, Extra, FieldType, MessageDirection, MessageField, SchemaMessage,
};

use crate::error::Result;

record! {
    /// One advertised field spec.
    pub struct MetaField {
        "name" => pub name: Vec<u8> [bytes],
        "type" => pub field_type: u16 [u16],
        "extra" => pub extra: Vec<u8> [bytes],
        "optional" => pub optional: u16 [u16],
    }
}

record! {
    /// One advertised message descriptor.
    pub struct MetaDescriptor {
        "id" => pub id: u32 [u32],
        "internal" => pub internal: u16 [u16],
        "direction" => pub direction: u16 [u16],
        "name" => pub name: Vec<u8> [bytes],
        "fields" => pub fields: Vec<MetaField> [records],
    }
}

record! {
    struct SchemaAdvert {
        "messages" => messages: Vec<MetaDescriptor> [records],
    }
}

record! {
    struct RegistryAdvert {
        "fields" => fields: Vec<MetaField> [records],
    }
}

fn meta_field_message() -> SchemaMessage {
    SchemaMessage::new(
        MessageDirection::Outbound,
        "messageField",
        vec![
            MessageField::required("name", FieldType::DynamicBinary),
            MessageField::required("type", FieldType::UInt16),
            MessageField::required("extra", FieldType::DynamicBinary),
            MessageField::required("optional", FieldType::UInt16),
        ],
    )
}

fn meta_descriptor_message() -> SchemaMessage {
    SchemaMessage::new(
        MessageDirection::Outbound,
        "messageDescriptor",
        vec![
            MessageField::required("id", FieldType::UInt32),
            MessageField::required("internal", FieldType::UInt16),
            MessageField::required("direction", FieldType::UInt16),
            MessageField::required("name", FieldType::DynamicBinary),
            MessageField::array_of_messages("fields", meta_field_message()),
        ],
    )
}

fn schema_advert_message() -> SchemaMessage {
    SchemaMessage::new(
        MessageDirection::Outbound,
        "schemaAdvertisement",
        vec![MessageField::array_of_messages(
            "messages",
            meta_descriptor_message(),
        )],
    )
}

fn registry_advert_message() -> SchemaMessage {
    SchemaMessage::new(
        MessageDirection::Outbound,
        "descriptorRegistry",
        vec![MessageField::array_of_messages(
            "fields",
            meta_field_message(),
        )],
    )
}

/// Encode the advertisement blobs for every user descriptor in `registry`.
pub(crate) fn encode_advertisement<H>(
    registry: &DescriptorRegistry<H>,
) -> Result<(Bytes, Bytes)> {
    let mut schema_advert = SchemaAdvert::default();
    let mut registry_advert = RegistryAdvert::default();

    for descriptor in registry.user_descriptors() {
        let mut meta = MetaDescriptor {
            id: descriptor.id,
            internal: u16::from(descriptor.internal),
            direction: descriptor.message.direction.wire_tag(),
            name: descriptor.message.name.clone().into_bytes(),
            fields: Vec::with_capacity(descriptor.message.fields.len()),
        };

        for field in &descriptor.message.fields {
            let meta_field = field_to_meta(field);
            registry_advert.fields.push(meta_field.clone());
            meta.fields.push(meta_field);
        }

        schema_advert.messages.push(meta);
    }

    let schema_blob = encode(&schema_advert_message(), &schema_advert)?;
    let registry_blob = encode(&registry_advert_message(), &registry_advert)?;
    Ok((schema_blob, registry_blob))
}

fn field_to_meta(field: &MessageField) -> MetaField {
    // Only fixed-binary lengths travel in `extra`; nested shapes advertise
    // empty and are resolved out of band.
    let extra = match &field.extra {
        Extra::Length(len) => len.to_le_bytes().to_vec(),
        _ => Vec::new(),
    };

    MetaField {
        name: field.name.clone().into_bytes(),
        field_type: field.field_type.wire_tag(),
        extra,
        optional: u16::from(field.optional),
    }
}

/// Parse a `schema` blob back into the advertised descriptor list.
pub fn decode_schema_advert(blob: &[u8]) -> Result<Vec<MetaDescriptor>> {
    let message = schema_advert_message();
    let mut advert = SchemaAdvert::default();
    Decoder::new(blob, &message).decode(&mut advert)?;
    Ok(advert.messages)
}

/// Parse a `descriptorRegistry` blob back into the advertised field specs.
pub fn decode_registry_advert(blob: &[u8]) -> Result<Vec<MetaField>> {
    let message = registry_advert_message();
    let mut advert = RegistryAdvert::default();
    Decoder::new(blob, &message).decode(&mut advert)?;
    Ok(advert.fields)
}
