//! Schema-guided binary codec for schemaipc.
//!
//! Message bodies are encoded field-by-field in declared order, guided by a
//! [`SchemaMessage`](schemaipc_schema::SchemaMessage): a leading
//! optional-presence bitmap, then each present field in its wire encoding.
//! Records bind struct fields to protocol names through the [`Record`] trait
//! (usually via the [`record!`] macro); the binding table is validated once
//! per type and cached process-wide.

pub mod cache;
pub mod error;
pub mod reader;
pub mod record;
pub mod writer;

pub use error::{CodecError, Result};
pub use reader::{Decoder, Reader};
pub use record::{ArraySlot, Binding, Record, RecordArray, SlotKind, SlotMut, SlotRef};
pub use writer::{encode, MAX_SHORT_LEN};
