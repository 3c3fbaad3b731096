//! Schema-guided decoder.
//!
//! The [`Reader`] is a bounds-checked cursor over a body buffer; the
//! [`Decoder`] binds a body to a message shape and materializes fields into a
//! record. Fields the record does not bind are parsed and discarded so the
//! cursor always advances by the full field width. Trailing bytes after the
//! last field are ignored — the framing layer owns the body length.

use bytes::Buf;
use schemaipc_schema::{Extra, FieldType, MessageField, SchemaMessage};

use crate::cache::check_bindings;
use crate::error::{CodecError, Result};
use crate::record::{Record, SlotMut};

/// Bounds-checked little-endian cursor over a byte buffer.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Borrow the next `n` bytes and advance.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(CodecError::OutOfBounds)?;
        if end > self.buf.len() {
            return Err(CodecError::OutOfBounds);
        }

        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let mut bytes = self.read_bytes(2)?;
        Ok(bytes.get_u16_le())
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let mut bytes = self.read_bytes(2)?;
        Ok(bytes.get_i16_le())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut bytes = self.read_bytes(4)?;
        Ok(bytes.get_u32_le())
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let mut bytes = self.read_bytes(4)?;
        Ok(bytes.get_i32_le())
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let mut bytes = self.read_bytes(8)?;
        Ok(bytes.get_u64_le())
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let mut bytes = self.read_bytes(8)?;
        Ok(bytes.get_i64_le())
    }
}

/// A decoder bound to one message body and its shape.
pub struct Decoder<'a> {
    reader: Reader<'a>,
    message: &'a SchemaMessage,
}

impl<'a> Decoder<'a> {
    pub fn new(body: &'a [u8], message: &'a SchemaMessage) -> Self {
        Self {
            reader: Reader::new(body),
            message,
        }
    }

    /// The message shape this decoder parses.
    pub fn message(&self) -> &SchemaMessage {
        self.message
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.reader.remaining()
    }

    /// Decode the body into `record`.
    pub fn decode<R: Record>(&mut self, record: &mut R) -> Result<()> {
        self.decode_dyn(record)
    }

    /// Object-safe variant of [`Decoder::decode`].
    pub fn decode_dyn(&mut self, record: &mut dyn Record) -> Result<()> {
        decode_message(&mut self.reader, self.message, Some(record))
    }
}

fn decode_message(
    reader: &mut Reader<'_>,
    message: &SchemaMessage,
    mut target: Option<&mut dyn Record>,
) -> Result<()> {
    if let Some(record) = target.as_deref_mut() {
        check_bindings(record)?;
    }

    let opt_bytes = message.opt_flag_length() as usize;
    let opt_list = reader.read_bytes(opt_bytes)?;
    let opt_bits = (opt_bytes as u32) * 8;
    let mut opt_counter: u32 = 0;

    for field in &message.fields {
        if field.optional {
            if opt_counter >= opt_bits {
                return Err(CodecError::OptionalCorrupted);
            }
            let opt = opt_counter;
            opt_counter += 1;

            if !get_opt(opt, opt_list) {
                continue;
            }
        }

        let slot = match target.as_deref_mut() {
            Some(record) => record.slot_mut(&field.name),
            None => None,
        };
        decode_value(reader, field, slot)?;
    }

    Ok(())
}

fn decode_value(
    reader: &mut Reader<'_>,
    field: &MessageField,
    slot: Option<SlotMut<'_>>,
) -> Result<()> {
    match field.field_type {
        FieldType::FixedBinary => {
            let len = match &field.extra {
                Extra::Length(len) => *len as usize,
                _ => return Err(CodecError::TypeCorrupted),
            };
            let bytes = reader.read_bytes(len)?;
            write_bytes(field, slot, bytes)?;
        }
        FieldType::DynamicBinary => {
            let len = reader.read_u16()? as usize;
            let bytes = reader.read_bytes(len)?;
            write_bytes(field, slot, bytes)?;
        }
        FieldType::LongBinary => {
            let len = reader.read_u32()? as usize;
            let bytes = reader.read_bytes(len)?;
            write_bytes(field, slot, bytes)?;
        }
        FieldType::UInt64 => {
            let value = reader.read_u64()?;
            match slot {
                None => {}
                Some(SlotMut::U64(out)) => *out = value,
                Some(_) => return Err(shape_error(field)),
            }
        }
        FieldType::Int64 => {
            let value = reader.read_i64()?;
            match slot {
                None => {}
                Some(SlotMut::I64(out)) => *out = value,
                Some(_) => return Err(shape_error(field)),
            }
        }
        FieldType::UInt32 => {
            let value = reader.read_u32()?;
            match slot {
                None => {}
                Some(SlotMut::U32(out)) => *out = value,
                Some(_) => return Err(shape_error(field)),
            }
        }
        FieldType::Int32 => {
            let value = reader.read_i32()?;
            match slot {
                None => {}
                Some(SlotMut::I32(out)) => *out = value,
                Some(_) => return Err(shape_error(field)),
            }
        }
        FieldType::UInt16 => {
            let value = reader.read_u16()?;
            match slot {
                None => {}
                Some(SlotMut::U16(out)) => *out = value,
                Some(_) => return Err(shape_error(field)),
            }
        }
        FieldType::Int16 => {
            let value = reader.read_i16()?;
            match slot {
                None => {}
                Some(SlotMut::I16(out)) => *out = value,
                Some(_) => return Err(shape_error(field)),
            }
        }
        FieldType::Object => {
            let nested = match &field.extra {
                Extra::Nested(message) => message,
                _ => return Err(CodecError::TypeCorrupted),
            };
            match slot {
                None => decode_message(reader, nested, None)?,
                Some(SlotMut::Record(record)) => decode_message(reader, nested, Some(record))?,
                Some(_) => return Err(shape_error(field)),
            }
        }
        FieldType::Array => {
            let count = reader.read_u16()? as usize;
            match &field.extra {
                Extra::Item(item) => match slot {
                    None => {
                        for _ in 0..count {
                            decode_value(reader, item, None)?;
                        }
                    }
                    Some(SlotMut::Array(array)) => {
                        array.clear();
                        for _ in 0..count {
                            let item_slot = array.push_default();
                            decode_value(reader, item, Some(item_slot))?;
                        }
                    }
                    Some(_) => return Err(shape_error(field)),
                },
                Extra::ItemMessage(item_message) => match slot {
                    None => {
                        for _ in 0..count {
                            decode_message(reader, item_message, None)?;
                        }
                    }
                    Some(SlotMut::RecordArray(array)) => {
                        array.clear();
                        for _ in 0..count {
                            let record = array.push_default();
                            decode_message(reader, item_message, Some(record))?;
                        }
                    }
                    Some(_) => return Err(shape_error(field)),
                },
                _ => return Err(CodecError::TypeCorrupted),
            }
        }
    }

    Ok(())
}

fn write_bytes(field: &MessageField, slot: Option<SlotMut<'_>>, bytes: &[u8]) -> Result<()> {
    match slot {
        None => Ok(()),
        Some(SlotMut::Bytes(out)) => {
            out.clear();
            out.extend_from_slice(bytes);
            Ok(())
        }
        Some(SlotMut::Str(out)) => match std::str::from_utf8(bytes) {
            Ok(text) => {
                out.clear();
                out.push_str(text);
                Ok(())
            }
            Err(_) => Err(CodecError::InvalidByteKind {
                field: field.name.clone(),
            }),
        },
        Some(_) => Err(shape_error(field)),
    }
}

fn get_opt(opt: u32, opt_list: &[u8]) -> bool {
    let bit = opt & 7;
    let byte = (opt >> 3) as usize;
    (opt_list[byte] >> bit) & 1 != 0
}

fn shape_error(field: &MessageField) -> CodecError {
    CodecError::InvalidRecordShape {
        field: field.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use schemaipc_schema::MessageDirection;

    use super::*;
    use crate::writer::encode;

    crate::record! {
        struct Scalars {
            "fixed" => fixed: Vec<u8> [bytes],
            "dynamic" => dynamic: Vec<u8> [bytes],
            "long" => long: Vec<u8> [bytes],
            "uint64" => uint64: u64 [u64],
            "int64" => int64: i64 [i64],
            "uint32" => uint32: u32 [u32],
            "int32" => int32: i32 [i32],
            "uint16" => uint16: u16 [u16],
            "int16" => int16: i16 [i16],
            "array" => array: Vec<i16> [array],
        }
    }

    fn scalars_message() -> SchemaMessage {
        SchemaMessage::new(
            MessageDirection::Inbound,
            "sample",
            vec![
                MessageField::fixed("fixed", 6),
                MessageField::required("dynamic", FieldType::DynamicBinary),
                MessageField::required("long", FieldType::LongBinary),
                MessageField::required("uint64", FieldType::UInt64),
                MessageField::required("int64", FieldType::Int64),
                MessageField::required("uint32", FieldType::UInt32),
                MessageField::required("int32", FieldType::Int32),
                MessageField::required("uint16", FieldType::UInt16),
                MessageField::required("int16", FieldType::Int16),
                MessageField::array_of("array", MessageField::required("item", FieldType::Int16)),
            ],
        )
    }

    #[rustfmt::skip]
    fn scalars_wire() -> Vec<u8> {
        vec![
            0x62, 0x75, 0x66, 0x66, 0x65, 0x72,
            0x06, 0x00, 0x62, 0x75, 0x66, 0x66, 0x65, 0x72,
            0x06, 0x00, 0x00, 0x00, 0x62, 0x75, 0x66, 0x66, 0x65, 0x72,
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
            0xff, 0xff, 0xff, 0xff,
            0xff, 0xff, 0xff, 0xff,
            0xff, 0xff,
            0xff, 0xff,
            0x02, 0x00, 0x62, 0x28, 0x26, 0x82,
        ]
    }

    #[test]
    fn required_scalars_decode_from_golden_bytes() {
        let wire = scalars_wire();
        let message = scalars_message();
        let mut record = Scalars::default();

        let mut decoder = Decoder::new(&wire, &message);
        decoder.decode(&mut record).unwrap();

        assert_eq!(record.fixed, b"buffer");
        assert_eq!(record.dynamic, b"buffer");
        assert_eq!(record.long, b"buffer");
        assert_eq!(record.uint64, u64::MAX);
        assert_eq!(record.int64, -1);
        assert_eq!(record.uint32, u32::MAX);
        assert_eq!(record.int32, -1);
        assert_eq!(record.uint16, u16::MAX);
        assert_eq!(record.int16, -1);
        assert_eq!(record.array, vec![10338, -32218]);
        assert_eq!(decoder.remaining(), 0);
    }

    #[test]
    fn roundtrip_preserves_every_field() {
        let message = scalars_message();
        let original = Scalars {
            fixed: b"sixsix".to_vec(),
            dynamic: b"dyn".to_vec(),
            long: vec![0xAA; 300],
            uint64: 0x0102030405060708,
            int64: -0x0102030405060708,
            uint32: 0xDEADBEEF,
            int32: -123456,
            uint16: 515,
            int16: -515,
            array: vec![1, -2, 3],
        };

        let wire = encode(&message, &original).unwrap();
        let mut decoded = Scalars::default();
        Decoder::new(&wire, &message).decode(&mut decoded).unwrap();

        assert_eq!(decoded, original);
    }

    crate::record! {
        struct Opts {
            "a" => a: i32 [i32],
            "b" => b: Option<i32> [opt_i32],
            "c" => c: Option<i32> [opt_i32],
        }
    }

    fn opts_message() -> SchemaMessage {
        SchemaMessage::new(
            MessageDirection::Inbound,
            "opts",
            vec![
                MessageField::required("a", FieldType::Int32),
                MessageField::optional("b", FieldType::Int32),
                MessageField::optional("c", FieldType::Int32),
            ],
        )
    }

    #[test]
    fn cleared_bit_leaves_slot_at_default() {
        let wire = [0x02, 0x07, 0x00, 0x00, 0x00, 0x09, 0x00, 0x00, 0x00];
        let message = opts_message();

        let mut record = Opts::default();
        Decoder::new(&wire, &message).decode(&mut record).unwrap();

        assert_eq!(record.a, 7);
        assert_eq!(record.b, None);
        assert_eq!(record.c, Some(9));
    }

    #[test]
    fn set_bit_demands_field_bytes() {
        // Bitmap says both optionals present but only one i32 follows `a`.
        let wire = [0x03, 0x07, 0x00, 0x00, 0x00, 0x09, 0x00, 0x00, 0x00];
        let message = opts_message();

        let mut record = Opts::default();
        let err = Decoder::new(&wire, &message)
            .decode(&mut record)
            .unwrap_err();
        assert!(matches!(err, CodecError::OutOfBounds));
    }

    #[test]
    fn unknown_fields_are_parsed_and_discarded() {
        crate::record! {
            struct Partial {
                "int32" => int32: i32 [i32],
                "int16" => int16: i16 [i16],
            }
        }

        let wire = scalars_wire();
        let message = scalars_message();
        let mut record = Partial::default();

        let mut decoder = Decoder::new(&wire, &message);
        decoder.decode(&mut record).unwrap();

        // Every unbound field advanced the cursor by its full width.
        assert_eq!(decoder.remaining(), 0);
        assert_eq!(record.int32, -1);
        assert_eq!(record.int16, -1);
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let message = SchemaMessage::new(
            MessageDirection::Inbound,
            "short",
            vec![MessageField::required("v", FieldType::UInt16)],
        );

        crate::record! {
            struct Short {
                "v" => v: u16 [u16],
            }
        }

        let wire = [0x01, 0x00, 0xFF, 0xFF, 0xFF];
        let mut record = Short::default();
        let mut decoder = Decoder::new(&wire, &message);
        decoder.decode(&mut record).unwrap();

        assert_eq!(record.v, 1);
        assert_eq!(decoder.remaining(), 3);
    }

    #[test]
    fn truncated_body_is_out_of_bounds() {
        let message = scalars_message();
        let full = scalars_wire();
        let wire = &full[..10];

        let mut record = Scalars::default();
        let err = Decoder::new(wire, &message)
            .decode(&mut record)
            .unwrap_err();
        assert!(matches!(err, CodecError::OutOfBounds));
    }

    #[test]
    fn dynamic_length_prefix_is_bounds_checked() {
        let message = SchemaMessage::new(
            MessageDirection::Inbound,
            "dyn",
            vec![MessageField::required("data", FieldType::DynamicBinary)],
        );

        crate::record! {
            struct Blob {
                "data" => data: Vec<u8> [bytes],
            }
        }

        // Prefix claims 16 bytes, body carries 2.
        let wire = [0x10, 0x00, 0xAA, 0xBB];
        let mut record = Blob::default();
        let err = Decoder::new(&wire, &message)
            .decode(&mut record)
            .unwrap_err();
        assert!(matches!(err, CodecError::OutOfBounds));
    }

    #[test]
    fn string_slot_rejects_invalid_utf8() {
        let message = SchemaMessage::new(
            MessageDirection::Inbound,
            "text",
            vec![MessageField::required("text", FieldType::DynamicBinary)],
        );

        crate::record! {
            struct Text {
                "text" => text: String [string],
            }
        }

        let wire = [0x02, 0x00, 0xFF, 0xFE];
        let mut record = Text::default();
        let err = Decoder::new(&wire, &message)
            .decode(&mut record)
            .unwrap_err();
        assert!(matches!(err, CodecError::InvalidByteKind { field } if field == "text"));
    }

    #[test]
    fn nested_objects_roundtrip_and_skip() {
        crate::record! {
            struct Point {
                "x" => x: u16 [u16],
                "y" => y: u16 [u16],
            }
        }

        crate::record! {
            struct Shape {
                "origin" => origin: Point [object],
                "tag" => tag: u16 [u16],
            }
        }

        let point_message = SchemaMessage::new(
            MessageDirection::Inbound,
            "point",
            vec![
                MessageField::required("x", FieldType::UInt16),
                MessageField::required("y", FieldType::UInt16),
            ],
        );
        let message = SchemaMessage::new(
            MessageDirection::Inbound,
            "shape",
            vec![
                MessageField::object("origin", point_message),
                MessageField::required("tag", FieldType::UInt16),
            ],
        );

        let original = Shape {
            origin: Point { x: 3, y: 4 },
            tag: 9,
        };
        let wire = encode(&message, &original).unwrap();

        let mut decoded = Shape::default();
        Decoder::new(&wire, &message).decode(&mut decoded).unwrap();
        assert_eq!(decoded, original);

        // A record without the nested binding still consumes the object body.
        crate::record! {
            struct TagOnly {
                "tag" => tag: u16 [u16],
            }
        }

        let mut tag_only = TagOnly::default();
        let mut decoder = Decoder::new(&wire, &message);
        decoder.decode(&mut tag_only).unwrap();
        assert_eq!(tag_only.tag, 9);
        assert_eq!(decoder.remaining(), 0);
    }

    #[test]
    fn record_arrays_roundtrip() {
        crate::record! {
            struct Entry {
                "k" => k: u16 [u16],
                "name" => name: Vec<u8> [bytes],
            }
        }

        crate::record! {
            struct Table {
                "entries" => entries: Vec<Entry> [records],
            }
        }

        let entry_message = SchemaMessage::new(
            MessageDirection::Inbound,
            "entry",
            vec![
                MessageField::required("k", FieldType::UInt16),
                MessageField::required("name", FieldType::DynamicBinary),
            ],
        );
        let message = SchemaMessage::new(
            MessageDirection::Inbound,
            "table",
            vec![MessageField::array_of_messages("entries", entry_message)],
        );

        let original = Table {
            entries: vec![
                Entry {
                    k: 1,
                    name: b"one".to_vec(),
                },
                Entry {
                    k: 2,
                    name: b"two".to_vec(),
                },
            ],
        };

        let wire = encode(&message, &original).unwrap();
        let mut decoded = Table::default();
        Decoder::new(&wire, &message).decode(&mut decoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn decode_replaces_previous_array_contents() {
        let message = SchemaMessage::new(
            MessageDirection::Inbound,
            "array",
            vec![MessageField::array_of(
                "items",
                MessageField::required("item", FieldType::UInt16),
            )],
        );

        crate::record! {
            struct Items {
                "items" => items: Vec<u16> [array],
            }
        }

        let mut record = Items {
            items: vec![9, 9, 9, 9],
        };
        let wire = [0x01, 0x00, 0x05, 0x00];
        Decoder::new(&wire, &message).decode(&mut record).unwrap();

        assert_eq!(record.items, vec![5]);
    }

    #[test]
    fn reader_cursor_is_bounds_checked() {
        let mut reader = Reader::new(&[0x01, 0x02, 0x03]);
        assert_eq!(reader.read_bytes(2).unwrap(), &[0x01, 0x02]);
        assert_eq!(reader.position(), 2);
        assert_eq!(reader.remaining(), 1);
        assert!(matches!(
            reader.read_bytes(2),
            Err(CodecError::OutOfBounds)
        ));
        // A failed read does not move the cursor.
        assert_eq!(reader.position(), 2);
        assert_eq!(reader.read_bytes(1).unwrap(), &[0x03]);
    }
}
