//! Schema-guided encoder.
//!
//! Walks a message's fields once, in declared order, resolving each field to
//! a record slot by protocol name. The body starts with the optional-presence
//! bitmap; present optional fields set their bit and append their bytes,
//! absent ones contribute nothing. An error discards all partial output.

use bytes::{BufMut, Bytes, BytesMut};
use schemaipc_schema::{Extra, FieldType, MessageField, SchemaMessage};

use crate::cache::check_bindings;
use crate::error::{CodecError, Result};
use crate::record::{Record, SlotRef};

/// Maximum byte length of a `DynamicBinary` field and maximum element count
/// of an array.
pub const MAX_SHORT_LEN: usize = u16::MAX as usize;

/// Encode a record into a message body.
pub fn encode(message: &SchemaMessage, record: &dyn Record) -> Result<Bytes> {
    let mut writer = Writer {
        buf: BytesMut::with_capacity(message.fixed_size_hint() as usize),
    };
    writer.encode_message(message, record)?;
    Ok(writer.buf.freeze())
}

struct Writer {
    buf: BytesMut,
}

impl Writer {
    fn encode_message(&mut self, message: &SchemaMessage, record: &dyn Record) -> Result<()> {
        check_bindings(record)?;

        let opt_bytes = message.opt_flag_length() as usize;
        let opt_offset = self.buf.len();
        self.buf.resize(opt_offset + opt_bytes, 0);

        let opt_bits = (opt_bytes as u32) * 8;
        let mut opt_counter: u32 = 0;

        for field in &message.fields {
            let slot = record.slot(&field.name);
            let present = matches!(&slot, Some(slot) if !slot.is_absent());

            if field.optional {
                if opt_counter >= opt_bits {
                    return Err(CodecError::OptionalCorrupted);
                }
                let opt = opt_counter;
                opt_counter += 1;

                if !present {
                    continue;
                }
                self.set_opt(opt, opt_offset);
            }

            // Required fields encode whatever the slot carries, zeros
            // included; only an unbound name or an empty optional slot
            // is missing.
            match slot {
                Some(SlotRef::Absent) | None => {
                    return Err(CodecError::RequiredNotPresent(field.name.clone()));
                }
                Some(slot) => self.encode_value(field, slot)?,
            }
        }

        Ok(())
    }

    fn encode_value(&mut self, field: &MessageField, slot: SlotRef<'_>) -> Result<()> {
        match field.field_type {
            FieldType::FixedBinary => {
                let expected = match &field.extra {
                    Extra::Length(len) => *len,
                    _ => return Err(CodecError::TypeCorrupted),
                };
                let bytes = expect_bytes(field, slot)?;
                if bytes.len() != expected as usize {
                    return Err(CodecError::WrongLength {
                        field: field.name.clone(),
                        expected,
                        actual: bytes.len(),
                    });
                }
                self.buf.put_slice(bytes);
            }
            FieldType::DynamicBinary => {
                let bytes = expect_bytes(field, slot)?;
                if bytes.len() > MAX_SHORT_LEN {
                    return Err(CodecError::LengthOverflow16 {
                        field: field.name.clone(),
                        len: bytes.len(),
                    });
                }
                self.buf.put_u16_le(bytes.len() as u16);
                self.buf.put_slice(bytes);
            }
            FieldType::LongBinary => {
                let bytes = expect_bytes(field, slot)?;
                if bytes.len() > u32::MAX as usize {
                    return Err(CodecError::LengthOverflow32 {
                        field: field.name.clone(),
                        len: bytes.len(),
                    });
                }
                self.buf.put_u32_le(bytes.len() as u32);
                self.buf.put_slice(bytes);
            }
            FieldType::UInt64 => match slot {
                SlotRef::U64(value) => self.buf.put_u64_le(value),
                _ => return Err(shape_error(field)),
            },
            FieldType::Int64 => match slot {
                SlotRef::I64(value) => self.buf.put_i64_le(value),
                _ => return Err(shape_error(field)),
            },
            FieldType::UInt32 => match slot {
                SlotRef::U32(value) => self.buf.put_u32_le(value),
                _ => return Err(shape_error(field)),
            },
            FieldType::Int32 => match slot {
                SlotRef::I32(value) => self.buf.put_i32_le(value),
                _ => return Err(shape_error(field)),
            },
            FieldType::UInt16 => match slot {
                SlotRef::U16(value) => self.buf.put_u16_le(value),
                _ => return Err(shape_error(field)),
            },
            FieldType::Int16 => match slot {
                SlotRef::I16(value) => self.buf.put_i16_le(value),
                _ => return Err(shape_error(field)),
            },
            FieldType::Object => {
                let nested = match &field.extra {
                    Extra::Nested(message) => message,
                    _ => return Err(CodecError::TypeCorrupted),
                };
                match slot {
                    SlotRef::Record(record) => self.encode_message(nested, record)?,
                    _ => return Err(shape_error(field)),
                }
            }
            FieldType::Array => match &field.extra {
                Extra::Item(item) => {
                    let array = match slot {
                        SlotRef::Array(array) => array,
                        _ => return Err(shape_error(field)),
                    };
                    let len = array.len();
                    if len > MAX_SHORT_LEN {
                        return Err(CodecError::ArrayLengthOverflow {
                            field: field.name.clone(),
                            len,
                        });
                    }
                    self.buf.put_u16_le(len as u16);
                    for idx in 0..len {
                        self.encode_value(item, array.get(idx))?;
                    }
                }
                Extra::ItemMessage(item_message) => {
                    let array = match slot {
                        SlotRef::RecordArray(array) => array,
                        _ => return Err(shape_error(field)),
                    };
                    let len = array.len();
                    if len > MAX_SHORT_LEN {
                        return Err(CodecError::ArrayLengthOverflow {
                            field: field.name.clone(),
                            len,
                        });
                    }
                    self.buf.put_u16_le(len as u16);
                    for idx in 0..len {
                        self.encode_message(item_message, array.get(idx))?;
                    }
                }
                _ => return Err(CodecError::TypeCorrupted),
            },
        }

        Ok(())
    }

    fn set_opt(&mut self, opt: u32, offset: usize) {
        let bit = opt & 7;
        let byte = offset + (opt >> 3) as usize;
        self.buf[byte] |= 1u8 << bit;
    }
}

fn expect_bytes<'a>(field: &MessageField, slot: SlotRef<'a>) -> Result<&'a [u8]> {
    match slot {
        SlotRef::Bytes(bytes) => Ok(bytes),
        SlotRef::Str(text) => Ok(text.as_bytes()),
        _ => Err(shape_error(field)),
    }
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

    fn scalars_record() -> Scalars {
        Scalars {
            fixed: b"buffer".to_vec(),
            dynamic: b"buffer".to_vec(),
            long: b"buffer".to_vec(),
            uint64: u64::MAX,
            int64: -1,
            uint32: u32::MAX,
            int32: -1,
            uint16: u16::MAX,
            int16: -1,
            array: vec![10338, -32218],
        }
    }

    #[rustfmt::skip]
    fn scalars_wire() -> Vec<u8> {
        vec![
            0x62, 0x75, 0x66, 0x66, 0x65, 0x72, // fixed
            0x06, 0x00, 0x62, 0x75, 0x66, 0x66, 0x65, 0x72, // dynamic
            0x06, 0x00, 0x00, 0x00, 0x62, 0x75, 0x66, 0x66, 0x65, 0x72, // long
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // uint64
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // int64
            0xff, 0xff, 0xff, 0xff, // uint32
            0xff, 0xff, 0xff, 0xff, // int32
            0xff, 0xff, // uint16
            0xff, 0xff, // int16
            0x02, 0x00, 0x62, 0x28, 0x26, 0x82, // array [10338, -32218]
        ]
    }

    #[test]
    fn required_scalars_golden_bytes() {
        let encoded = encode(&scalars_message(), &scalars_record()).unwrap();
        assert_eq!(encoded.as_ref(), scalars_wire().as_slice());
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
    fn absent_optional_clears_its_bit_and_emits_nothing() {
        let record = Opts {
            a: 7,
            b: None,
            c: Some(9),
        };

        let encoded = encode(&opts_message(), &record).unwrap();
        assert_eq!(
            encoded.as_ref(),
            &[0x02, 0x07, 0x00, 0x00, 0x00, 0x09, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn bitmap_bit_set_iff_optional_emitted() {
        let record = Opts {
            a: 1,
            b: Some(2),
            c: None,
        };

        let encoded = encode(&opts_message(), &record).unwrap();
        assert_eq!(
            encoded.as_ref(),
            &[0x01, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn no_bitmap_bytes_without_optional_fields() {
        crate::record! {
            struct Single {
                "v" => v: u16 [u16],
            }
        }

        let message = SchemaMessage::new(
            MessageDirection::Inbound,
            "single",
            vec![MessageField::required("v", FieldType::UInt16)],
        );

        let encoded = encode(&message, &Single { v: 0x0102 }).unwrap();
        assert_eq!(encoded.as_ref(), &[0x02, 0x01]);
    }

    #[test]
    fn required_zero_scalar_still_encodes() {
        crate::record! {
            struct Zero {
                "v" => v: u32 [u32],
            }
        }

        let message = SchemaMessage::new(
            MessageDirection::Inbound,
            "zero",
            vec![MessageField::required("v", FieldType::UInt32)],
        );

        let encoded = encode(&message, &Zero { v: 0 }).unwrap();
        assert_eq!(encoded.as_ref(), &[0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn unbound_required_field_is_an_error() {
        crate::record! {
            struct Empty {
                "other" => other: u32 [u32],
            }
        }

        let message = SchemaMessage::new(
            MessageDirection::Inbound,
            "strict",
            vec![MessageField::required("missing", FieldType::UInt32)],
        );

        let err = encode(&message, &Empty::default()).unwrap_err();
        assert!(matches!(err, CodecError::RequiredNotPresent(name) if name == "missing"));
    }

    #[test]
    fn fixed_binary_length_mismatch() {
        let message = SchemaMessage::new(
            MessageDirection::Inbound,
            "fixed",
            vec![MessageField::fixed("fixed", 4)],
        );

        crate::record! {
            struct Fixed {
                "fixed" => fixed: Vec<u8> [bytes],
            }
        }

        let err = encode(
            &message,
            &Fixed {
                fixed: b"toolong".to_vec(),
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CodecError::WrongLength {
                expected: 4,
                actual: 7,
                ..
            }
        ));
    }

    #[test]
    fn dynamic_binary_overflow() {
        let message = SchemaMessage::new(
            MessageDirection::Inbound,
            "dynamic",
            vec![MessageField::required("data", FieldType::DynamicBinary)],
        );

        crate::record! {
            struct Blob {
                "data" => data: Vec<u8> [bytes],
            }
        }

        let err = encode(
            &message,
            &Blob {
                data: vec![0xAB; MAX_SHORT_LEN + 1],
            },
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::LengthOverflow16 { len, .. } if len == 65536));
    }

    #[test]
    fn array_length_overflow() {
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

        let err = encode(
            &message,
            &Items {
                items: vec![0; MAX_SHORT_LEN + 1],
            },
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::ArrayLengthOverflow { len, .. } if len == 65536));
    }

    #[test]
    fn slot_kind_must_match_declared_type() {
        let message = SchemaMessage::new(
            MessageDirection::Inbound,
            "typed",
            vec![MessageField::required("v", FieldType::UInt64)],
        );

        crate::record! {
            struct Narrow {
                "v" => v: u16 [u16],
            }
        }

        let err = encode(&message, &Narrow { v: 1 }).unwrap_err();
        assert!(matches!(err, CodecError::InvalidRecordShape { field } if field == "v"));
    }

    #[test]
    fn string_slots_encode_as_bytes() {
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

        let encoded = encode(
            &message,
            &Text {
                text: "hi".to_string(),
            },
        )
        .unwrap();
        assert_eq!(encoded.as_ref(), &[0x02, 0x00, b'h', b'i']);
    }

    #[test]
    fn nested_object_encodes_recursive_body() {
        crate::record! {
            struct Point {
                "x" => x: u16 [u16],
                "y" => y: Option<u16> [opt_u16],
            }
        }

        crate::record! {
            struct Shape {
                "origin" => origin: Point [object],
            }
        }

        let point_message = SchemaMessage::new(
            MessageDirection::Inbound,
            "point",
            vec![
                MessageField::required("x", FieldType::UInt16),
                MessageField::optional("y", FieldType::UInt16),
            ],
        );
        let message = SchemaMessage::new(
            MessageDirection::Inbound,
            "shape",
            vec![MessageField::object("origin", point_message)],
        );

        let encoded = encode(
            &message,
            &Shape {
                origin: Point {
                    x: 5,
                    y: Some(6),
                },
            },
        )
        .unwrap();
        // Nested body carries its own presence bitmap.
        assert_eq!(encoded.as_ref(), &[0x01, 0x05, 0x00, 0x06, 0x00]);
    }

    #[test]
    fn record_arrays_encode_struct_bodies() {
        crate::record! {
            struct Entry {
                "k" => k: u16 [u16],
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
            vec![MessageField::required("k", FieldType::UInt16)],
        );
        let message = SchemaMessage::new(
            MessageDirection::Inbound,
            "table",
            vec![MessageField::array_of_messages("entries", entry_message)],
        );

        let encoded = encode(
            &message,
            &Table {
                entries: vec![Entry { k: 1 }, Entry { k: 2 }],
            },
        )
        .unwrap();
        assert_eq!(encoded.as_ref(), &[0x02, 0x00, 0x01, 0x00, 0x02, 0x00]);
    }
}
