//! Schema model and descriptor registry for schemaipc.
//!
//! A schema is an ordered list of named, directional messages whose fields
//! carry a closed set of wire types. The registry assigns stable numeric IDs
//! to messages (internal descriptors first, at IDs 0-2, then user descriptors
//! from ID 3) and enforces signature uniqueness per registration set.

pub mod error;
pub mod registry;
pub mod types;

pub use error::{Result, SchemaError};
pub use registry::{
    DescriptorRegistry, MessageDescriptor, HELLO_INBOUND_ID, HELLO_OUTBOUND_ID, PING_ID,
    USER_ID_START,
};
pub use types::{
    internal_schema, Extra, FieldType, MessageDirection, MessageField, Schema, SchemaMessage,
};
