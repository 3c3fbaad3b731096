use crate::error::{Result, SchemaError};

/// Direction of a message relative to the server.
///
/// `Inbound` messages flow client→server, `Outbound` server→client. A
/// `Duplex` message may be sent by either side and occupies both the inbound
/// and the outbound signature for its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageDirection {
    Inbound,
    Outbound,
    Duplex,
}

impl MessageDirection {
    /// Human-readable label used in signatures and diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            MessageDirection::Inbound => "inbound",
            MessageDirection::Outbound => "outbound",
            MessageDirection::Duplex => "duplex",
        }
    }

    /// Wire tag used by the schema advertisement.
    pub fn wire_tag(self) -> u16 {
        match self {
            MessageDirection::Inbound => 0,
            MessageDirection::Outbound => 1,
            MessageDirection::Duplex => 2,
        }
    }

    pub fn from_wire_tag(tag: u16) -> Option<Self> {
        match tag {
            0 => Some(MessageDirection::Inbound),
            1 => Some(MessageDirection::Outbound),
            2 => Some(MessageDirection::Duplex),
            _ => None,
        }
    }
}

/// Closed set of wire types a field can carry.
///
/// All multi-byte integers are little-endian. Binary types are raw bytes;
/// their interpretation belongs to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Exactly N raw bytes; N comes from [`Extra::Length`].
    FixedBinary,
    /// `u16` length prefix, then up to 65 535 raw bytes.
    DynamicBinary,
    /// `u32` length prefix, then the raw bytes.
    LongBinary,
    UInt64,
    Int64,
    UInt32,
    Int32,
    UInt16,
    Int16,
    /// A nested message body; shape comes from [`Extra::Nested`].
    Object,
    /// `u16` element count, then the items; item shape comes from
    /// [`Extra::Item`] or [`Extra::ItemMessage`].
    Array,
}

impl FieldType {
    /// Wire tag used by the schema advertisement.
    pub fn wire_tag(self) -> u16 {
        match self {
            FieldType::FixedBinary => 0,
            FieldType::DynamicBinary => 1,
            FieldType::LongBinary => 2,
            FieldType::UInt64 => 3,
            FieldType::Int64 => 4,
            FieldType::UInt32 => 5,
            FieldType::Int32 => 6,
            FieldType::UInt16 => 7,
            FieldType::Int16 => 8,
            FieldType::Object => 9,
            FieldType::Array => 10,
        }
    }

    pub fn from_wire_tag(tag: u16) -> Option<Self> {
        match tag {
            0 => Some(FieldType::FixedBinary),
            1 => Some(FieldType::DynamicBinary),
            2 => Some(FieldType::LongBinary),
            3 => Some(FieldType::UInt64),
            4 => Some(FieldType::Int64),
            5 => Some(FieldType::UInt32),
            6 => Some(FieldType::Int32),
            7 => Some(FieldType::UInt16),
            8 => Some(FieldType::Int16),
            9 => Some(FieldType::Object),
            10 => Some(FieldType::Array),
            _ => None,
        }
    }

    /// Lower-bound contribution of this type to an encoded body, in bytes.
    ///
    /// Length-prefixed types count only their prefix; arrays count only
    /// their element count. Used to pre-size encode buffers.
    pub fn fixed_size(self, extra: &Extra) -> u32 {
        match self {
            FieldType::FixedBinary => match extra {
                Extra::Length(len) => *len,
                _ => 0,
            },
            FieldType::DynamicBinary => 2,
            FieldType::LongBinary => 4,
            FieldType::UInt64 | FieldType::Int64 => 8,
            FieldType::UInt32 | FieldType::Int32 => 4,
            FieldType::UInt16 | FieldType::Int16 => 2,
            FieldType::Object => match extra {
                Extra::Nested(message) => message.fixed_size_hint(),
                _ => 0,
            },
            FieldType::Array => 2,
        }
    }
}

/// Type-dependent parameter of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Extra {
    /// No parameter (scalars, dynamic and long binaries).
    None,
    /// Byte length of a [`FieldType::FixedBinary`] field.
    Length(u32),
    /// Shape of a [`FieldType::Object`] field.
    Nested(Box<SchemaMessage>),
    /// Element spec of a [`FieldType::Array`] of scalars or binaries.
    Item(Box<MessageField>),
    /// Element shape of a [`FieldType::Array`] of message bodies.
    ItemMessage(Box<SchemaMessage>),
}

/// A single named field of a message.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageField {
    pub name: String,
    pub field_type: FieldType,
    pub extra: Extra,
    pub optional: bool,
}

impl MessageField {
    /// A required field with no extra parameter.
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            extra: Extra::None,
            optional: false,
        }
    }

    /// An optional field with no extra parameter.
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            extra: Extra::None,
            optional: true,
        }
    }

    /// A required fixed-length binary field of exactly `len` bytes.
    pub fn fixed(name: impl Into<String>, len: u32) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::FixedBinary,
            extra: Extra::Length(len),
            optional: false,
        }
    }

    /// A required nested-object field.
    pub fn object(name: impl Into<String>, message: SchemaMessage) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Object,
            extra: Extra::Nested(Box::new(message)),
            optional: false,
        }
    }

    /// A required array whose items are scalar or binary fields.
    pub fn array_of(name: impl Into<String>, item: MessageField) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Array,
            extra: Extra::Item(Box::new(item)),
            optional: false,
        }
    }

    /// A required array whose items are message bodies.
    pub fn array_of_messages(name: impl Into<String>, item: SchemaMessage) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Array,
            extra: Extra::ItemMessage(Box::new(item)),
            optional: false,
        }
    }

    /// Mark this field optional.
    pub fn into_optional(mut self) -> Self {
        self.optional = true;
        self
    }

    fn validate(&self, message_name: &str) -> Result<()> {
        let ok = match self.field_type {
            FieldType::FixedBinary => matches!(self.extra, Extra::Length(_)),
            FieldType::Object => matches!(self.extra, Extra::Nested(_)),
            FieldType::Array => match &self.extra {
                // Array items recurse through their own message shape;
                // nested arrays and objects go through ItemMessage.
                Extra::Item(item) => {
                    !matches!(item.field_type, FieldType::Object | FieldType::Array)
                        && item.validate(message_name).is_ok()
                }
                Extra::ItemMessage(_) => true,
                _ => false,
            },
            _ => matches!(self.extra, Extra::None),
        };

        if !ok {
            return Err(SchemaError::InvalidExtra {
                message: message_name.to_string(),
                field: self.name.clone(),
            });
        }

        match &self.extra {
            Extra::Nested(message) | Extra::ItemMessage(message) => message.validate(),
            _ => Ok(()),
        }
    }
}

/// A named, directional message: an ordered list of fields.
///
/// Field order is significant — it is the wire order.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaMessage {
    pub direction: MessageDirection,
    pub name: String,
    pub fields: Vec<MessageField>,
}

impl SchemaMessage {
    pub fn new(
        direction: MessageDirection,
        name: impl Into<String>,
        fields: Vec<MessageField>,
    ) -> Self {
        Self {
            direction,
            name: name.into(),
            fields,
        }
    }

    /// Number of fields declared `optional`.
    pub fn optional_count(&self) -> u32 {
        self.fields.iter().filter(|field| field.optional).count() as u32
    }

    /// Bytes occupied by the optional-presence bitmap at the start of a body.
    pub fn opt_flag_length(&self) -> u32 {
        opt_flag_length(self.optional_count())
    }

    /// Lower bound on the encoded size of a body: the presence bitmap plus
    /// the fixed sizes of required fields.
    pub fn fixed_size_hint(&self) -> u32 {
        let fields: u32 = self
            .fields
            .iter()
            .filter(|field| !field.optional)
            .map(|field| field.field_type.fixed_size(&field.extra))
            .sum();
        self.opt_flag_length() + fields
    }

    /// Check every field's `extra` parameter against its declared type.
    pub fn validate(&self) -> Result<()> {
        for field in &self.fields {
            field.validate(&self.name)?;
        }
        Ok(())
    }
}

/// Bitmap bytes needed for `optional_count` presence bits.
pub(crate) fn opt_flag_length(optional_count: u32) -> u32 {
    optional_count.div_ceil(8)
}

/// An ordered list of messages to register as one set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub messages: Vec<SchemaMessage>,
}

impl Schema {
    pub fn new(messages: Vec<SchemaMessage>) -> Self {
        Self { messages }
    }
}

/// The reserved handshake/keepalive messages.
///
/// Inbound and outbound Hello must stay at IDs 0 and 1; the advertisement
/// excludes them and peers assume their shapes.
pub fn internal_schema() -> Schema {
    Schema::new(vec![
        SchemaMessage::new(
            MessageDirection::Inbound,
            "Hello",
            vec![
                MessageField::required("minVersion", FieldType::Int32),
                MessageField::required("currVersion", FieldType::Int32),
            ],
        ),
        SchemaMessage::new(
            MessageDirection::Outbound,
            "Hello",
            vec![
                MessageField::required("minVersion", FieldType::Int32),
                MessageField::required("currVersion", FieldType::Int32),
                MessageField::required("schema", FieldType::LongBinary),
                MessageField::required("descriptorRegistry", FieldType::LongBinary),
            ],
        ),
        SchemaMessage::new(
            MessageDirection::Duplex,
            "Ping",
            vec![MessageField::required("timestamp", FieldType::Int64)],
        ),
    ])
}
