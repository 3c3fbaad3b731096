//! Compile-time record binding.
//!
//! A record is a struct whose fields are bound to protocol field names. The
//! codec never sees the struct directly — it resolves each protocol name to a
//! typed slot through the [`Record`] trait. Implement the trait by hand, or
//! declare the struct through the [`record!`](crate::record!) macro which
//! generates the binding table and both slot accessors.

use std::any::TypeId;

/// One protocol-name → slot binding of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub name: &'static str,
    pub kind: SlotKind,
}

/// Declared shape of a record slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Bytes,
    Str,
    U64,
    I64,
    U32,
    I32,
    U16,
    I16,
    Record,
    Array,
    RecordArray,
}

/// A struct whose fields are addressable by protocol field name.
///
/// `slot` and `slot_mut` return `None` for names the record does not bind;
/// the codec then parses and discards such fields so unknown names never
/// desynchronize the stream.
pub trait Record: 'static {
    /// Identity of the concrete record type, for the binding cache.
    fn type_key(&self) -> TypeId;

    /// Static binding table. Duplicate names are a permanent error,
    /// detected on first use.
    fn bindings(&self) -> &'static [Binding];

    /// Read access to the slot bound to `name`.
    fn slot(&self, name: &str) -> Option<SlotRef<'_>>;

    /// Write access to the slot bound to `name`. Optional slots are
    /// materialized to their default value.
    fn slot_mut(&mut self, name: &str) -> Option<SlotMut<'_>>;
}

/// Read view of a record slot.
pub enum SlotRef<'a> {
    /// An optional slot (`Option<T>`) that currently holds nothing.
    Absent,
    Bytes(&'a [u8]),
    Str(&'a str),
    U64(u64),
    I64(i64),
    U32(u32),
    I32(i32),
    U16(u16),
    I16(i16),
    Record(&'a dyn Record),
    Array(&'a dyn ArraySlot),
    RecordArray(&'a dyn RecordArray),
}

impl SlotRef<'_> {
    /// Whether an optional field backed by this slot is absent on the wire:
    /// `None`, zero scalars, and empty binaries/strings/arrays all read as
    /// absent. Nested records read as present.
    pub fn is_absent(&self) -> bool {
        match self {
            SlotRef::Absent => true,
            SlotRef::Bytes(bytes) => bytes.is_empty(),
            SlotRef::Str(text) => text.is_empty(),
            SlotRef::U64(v) => *v == 0,
            SlotRef::I64(v) => *v == 0,
            SlotRef::U32(v) => *v == 0,
            SlotRef::I32(v) => *v == 0,
            SlotRef::U16(v) => *v == 0,
            SlotRef::I16(v) => *v == 0,
            SlotRef::Record(_) => false,
            SlotRef::Array(array) => array.len() == 0,
            SlotRef::RecordArray(array) => array.len() == 0,
        }
    }
}

/// Write view of a record slot.
pub enum SlotMut<'a> {
    Bytes(&'a mut Vec<u8>),
    Str(&'a mut String),
    U64(&'a mut u64),
    I64(&'a mut i64),
    U32(&'a mut u32),
    I32(&'a mut i32),
    U16(&'a mut u16),
    I16(&'a mut i16),
    Record(&'a mut dyn Record),
    Array(&'a mut dyn ArraySlot),
    RecordArray(&'a mut dyn RecordArray),
}

/// An array slot whose items are scalars or binaries.
pub trait ArraySlot {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn get(&self, idx: usize) -> SlotRef<'_>;
    fn clear(&mut self);
    /// Append a default item and return a write view of it.
    fn push_default(&mut self) -> SlotMut<'_>;
}

macro_rules! scalar_array_slot {
    ($ty:ty, $variant:ident) => {
        impl ArraySlot for Vec<$ty> {
            fn len(&self) -> usize {
                self.len()
            }

            fn get(&self, idx: usize) -> SlotRef<'_> {
                SlotRef::$variant(self[idx])
            }

            fn clear(&mut self) {
                self.clear()
            }

            fn push_default(&mut self) -> SlotMut<'_> {
                self.push(0);
                let last = self.len() - 1;
                SlotMut::$variant(&mut self[last])
            }
        }
    };
}

scalar_array_slot!(u64, U64);
scalar_array_slot!(i64, I64);
scalar_array_slot!(u32, U32);
scalar_array_slot!(i32, I32);
scalar_array_slot!(u16, U16);
scalar_array_slot!(i16, I16);

impl ArraySlot for Vec<Vec<u8>> {
    fn len(&self) -> usize {
        self.len()
    }

    fn get(&self, idx: usize) -> SlotRef<'_> {
        SlotRef::Bytes(&self[idx])
    }

    fn clear(&mut self) {
        self.clear()
    }

    fn push_default(&mut self) -> SlotMut<'_> {
        self.push(Vec::new());
        let last = self.len() - 1;
        SlotMut::Bytes(&mut self[last])
    }
}

impl ArraySlot for Vec<String> {
    fn len(&self) -> usize {
        self.len()
    }

    fn get(&self, idx: usize) -> SlotRef<'_> {
        SlotRef::Str(&self[idx])
    }

    fn clear(&mut self) {
        self.clear()
    }

    fn push_default(&mut self) -> SlotMut<'_> {
        self.push(String::new());
        let last = self.len() - 1;
        SlotMut::Str(&mut self[last])
    }
}

/// An array slot whose items are message bodies.
pub trait RecordArray {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn get(&self, idx: usize) -> &dyn Record;
    fn clear(&mut self);
    /// Append a default item and return it for decoding.
    fn push_default(&mut self) -> &mut dyn Record;
}

impl<R: Record + Default> RecordArray for Vec<R> {
    fn len(&self) -> usize {
        self.len()
    }

    fn get(&self, idx: usize) -> &dyn Record {
        &self[idx]
    }

    fn clear(&mut self) {
        self.clear()
    }

    fn push_default(&mut self) -> &mut dyn Record {
        self.push(R::default());
        let last = self.len() - 1;
        &mut self[last]
    }
}

/// Declare a record struct and its protocol bindings in one place.
///
/// Each line binds one protocol field name to a struct field and names the
/// slot kind in brackets. `opt_*` kinds bind `Option<T>` fields; presence on
/// the wire follows the slot contents either way — zero scalars and empty
/// binaries read as absent, whether bare or inside `Some`.
///
/// ```
/// schemaipc_codec::record! {
///     pub struct Hello {
///         "minVersion" => pub min_version: i32 [i32],
///         "currVersion" => pub curr_version: i32 [i32],
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $proto:literal => $field_vis:vis $field:ident : $field_ty:ty [$kind:ident]
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $( $(#[$field_meta])* $field_vis $field: $field_ty, )*
        }

        impl $crate::record::Record for $name {
            fn type_key(&self) -> ::std::any::TypeId {
                ::std::any::TypeId::of::<$name>()
            }

            fn bindings(&self) -> &'static [$crate::record::Binding] {
                const BINDINGS: &[$crate::record::Binding] = &[
                    $(
                        $crate::record::Binding {
                            name: $proto,
                            kind: $crate::record!(@kind $kind),
                        },
                    )*
                ];
                BINDINGS
            }

            fn slot(&self, name: &str) -> ::std::option::Option<$crate::record::SlotRef<'_>> {
                match name {
                    $( $proto => ::std::option::Option::Some($crate::record!(@slot_ref self.$field, $kind)), )*
                    _ => ::std::option::Option::None,
                }
            }

            fn slot_mut(
                &mut self,
                name: &str,
            ) -> ::std::option::Option<$crate::record::SlotMut<'_>> {
                match name {
                    $( $proto => ::std::option::Option::Some($crate::record!(@slot_mut self.$field, $kind)), )*
                    _ => ::std::option::Option::None,
                }
            }
        }
    };

    // Slot kinds.
    (@kind bytes) => { $crate::record::SlotKind::Bytes };
    (@kind string) => { $crate::record::SlotKind::Str };
    (@kind u64) => { $crate::record::SlotKind::U64 };
    (@kind i64) => { $crate::record::SlotKind::I64 };
    (@kind u32) => { $crate::record::SlotKind::U32 };
    (@kind i32) => { $crate::record::SlotKind::I32 };
    (@kind u16) => { $crate::record::SlotKind::U16 };
    (@kind i16) => { $crate::record::SlotKind::I16 };
    (@kind object) => { $crate::record::SlotKind::Record };
    (@kind array) => { $crate::record::SlotKind::Array };
    (@kind records) => { $crate::record::SlotKind::RecordArray };
    (@kind opt_bytes) => { $crate::record::SlotKind::Bytes };
    (@kind opt_string) => { $crate::record::SlotKind::Str };
    (@kind opt_u64) => { $crate::record::SlotKind::U64 };
    (@kind opt_i64) => { $crate::record::SlotKind::I64 };
    (@kind opt_u32) => { $crate::record::SlotKind::U32 };
    (@kind opt_i32) => { $crate::record::SlotKind::I32 };
    (@kind opt_u16) => { $crate::record::SlotKind::U16 };
    (@kind opt_i16) => { $crate::record::SlotKind::I16 };
    (@kind opt_object) => { $crate::record::SlotKind::Record };

    // Read views.
    (@slot_ref $slot:expr, bytes) => { $crate::record::SlotRef::Bytes(&$slot) };
    (@slot_ref $slot:expr, string) => { $crate::record::SlotRef::Str(&$slot) };
    (@slot_ref $slot:expr, u64) => { $crate::record::SlotRef::U64($slot) };
    (@slot_ref $slot:expr, i64) => { $crate::record::SlotRef::I64($slot) };
    (@slot_ref $slot:expr, u32) => { $crate::record::SlotRef::U32($slot) };
    (@slot_ref $slot:expr, i32) => { $crate::record::SlotRef::I32($slot) };
    (@slot_ref $slot:expr, u16) => { $crate::record::SlotRef::U16($slot) };
    (@slot_ref $slot:expr, i16) => { $crate::record::SlotRef::I16($slot) };
    (@slot_ref $slot:expr, object) => { $crate::record::SlotRef::Record(&$slot) };
    (@slot_ref $slot:expr, array) => { $crate::record::SlotRef::Array(&$slot) };
    (@slot_ref $slot:expr, records) => { $crate::record::SlotRef::RecordArray(&$slot) };
    (@slot_ref $slot:expr, opt_bytes) => {
        match &$slot {
            ::std::option::Option::Some(value) => $crate::record::SlotRef::Bytes(value),
            ::std::option::Option::None => $crate::record::SlotRef::Absent,
        }
    };
    (@slot_ref $slot:expr, opt_string) => {
        match &$slot {
            ::std::option::Option::Some(value) => $crate::record::SlotRef::Str(value),
            ::std::option::Option::None => $crate::record::SlotRef::Absent,
        }
    };
    (@slot_ref $slot:expr, opt_u64) => {
        match $slot {
            ::std::option::Option::Some(value) => $crate::record::SlotRef::U64(value),
            ::std::option::Option::None => $crate::record::SlotRef::Absent,
        }
    };
    (@slot_ref $slot:expr, opt_i64) => {
        match $slot {
            ::std::option::Option::Some(value) => $crate::record::SlotRef::I64(value),
            ::std::option::Option::None => $crate::record::SlotRef::Absent,
        }
    };
    (@slot_ref $slot:expr, opt_u32) => {
        match $slot {
            ::std::option::Option::Some(value) => $crate::record::SlotRef::U32(value),
            ::std::option::Option::None => $crate::record::SlotRef::Absent,
        }
    };
    (@slot_ref $slot:expr, opt_i32) => {
        match $slot {
            ::std::option::Option::Some(value) => $crate::record::SlotRef::I32(value),
            ::std::option::Option::None => $crate::record::SlotRef::Absent,
        }
    };
    (@slot_ref $slot:expr, opt_u16) => {
        match $slot {
            ::std::option::Option::Some(value) => $crate::record::SlotRef::U16(value),
            ::std::option::Option::None => $crate::record::SlotRef::Absent,
        }
    };
    (@slot_ref $slot:expr, opt_i16) => {
        match $slot {
            ::std::option::Option::Some(value) => $crate::record::SlotRef::I16(value),
            ::std::option::Option::None => $crate::record::SlotRef::Absent,
        }
    };
    (@slot_ref $slot:expr, opt_object) => {
        match &$slot {
            ::std::option::Option::Some(value) => $crate::record::SlotRef::Record(value),
            ::std::option::Option::None => $crate::record::SlotRef::Absent,
        }
    };

    // Write views. Optional slots materialize their default.
    (@slot_mut $slot:expr, bytes) => { $crate::record::SlotMut::Bytes(&mut $slot) };
    (@slot_mut $slot:expr, string) => { $crate::record::SlotMut::Str(&mut $slot) };
    (@slot_mut $slot:expr, u64) => { $crate::record::SlotMut::U64(&mut $slot) };
    (@slot_mut $slot:expr, i64) => { $crate::record::SlotMut::I64(&mut $slot) };
    (@slot_mut $slot:expr, u32) => { $crate::record::SlotMut::U32(&mut $slot) };
    (@slot_mut $slot:expr, i32) => { $crate::record::SlotMut::I32(&mut $slot) };
    (@slot_mut $slot:expr, u16) => { $crate::record::SlotMut::U16(&mut $slot) };
    (@slot_mut $slot:expr, i16) => { $crate::record::SlotMut::I16(&mut $slot) };
    (@slot_mut $slot:expr, object) => { $crate::record::SlotMut::Record(&mut $slot) };
    (@slot_mut $slot:expr, array) => { $crate::record::SlotMut::Array(&mut $slot) };
    (@slot_mut $slot:expr, records) => { $crate::record::SlotMut::RecordArray(&mut $slot) };
    (@slot_mut $slot:expr, opt_bytes) => {
        $crate::record::SlotMut::Bytes($slot.get_or_insert_with(::std::vec::Vec::new))
    };
    (@slot_mut $slot:expr, opt_string) => {
        $crate::record::SlotMut::Str($slot.get_or_insert_with(::std::string::String::new))
    };
    (@slot_mut $slot:expr, opt_u64) => { $crate::record::SlotMut::U64($slot.get_or_insert(0)) };
    (@slot_mut $slot:expr, opt_i64) => { $crate::record::SlotMut::I64($slot.get_or_insert(0)) };
    (@slot_mut $slot:expr, opt_u32) => { $crate::record::SlotMut::U32($slot.get_or_insert(0)) };
    (@slot_mut $slot:expr, opt_i32) => { $crate::record::SlotMut::I32($slot.get_or_insert(0)) };
    (@slot_mut $slot:expr, opt_u16) => { $crate::record::SlotMut::U16($slot.get_or_insert(0)) };
    (@slot_mut $slot:expr, opt_i16) => { $crate::record::SlotMut::I16($slot.get_or_insert(0)) };
    (@slot_mut $slot:expr, opt_object) => {
        $crate::record::SlotMut::Record($slot.get_or_insert_with(::std::default::Default::default))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::record! {
        struct Sample {
            "value" => value: u32 [u32],
            "label" => label: Vec<u8> [bytes],
            "note" => note: Option<i64> [opt_i64],
        }
    }

    crate::record! {
        struct Inner {
            "v" => v: u16 [u16],
        }
    }

    crate::record! {
        struct Outer {
            "inner" => inner: Inner [object],
            "items" => items: Vec<Inner> [records],
        }
    }

    #[test]
    fn bindings_list_every_field() {
        let sample = Sample::default();
        let names: Vec<&str> = sample.bindings().iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["value", "label", "note"]);
        assert_eq!(sample.bindings()[0].kind, SlotKind::U32);
        assert_eq!(sample.bindings()[2].kind, SlotKind::I64);
    }

    #[test]
    fn slots_resolve_by_protocol_name() {
        let mut sample = Sample {
            value: 7,
            label: b"tag".to_vec(),
            note: None,
        };

        assert!(matches!(sample.slot("value"), Some(SlotRef::U32(7))));
        assert!(matches!(sample.slot("label"), Some(SlotRef::Bytes(bytes)) if bytes == b"tag"));
        assert!(matches!(sample.slot("note"), Some(SlotRef::Absent)));
        assert!(sample.slot("unknown").is_none());

        if let Some(SlotMut::U32(value)) = sample.slot_mut("value") {
            *value = 9;
        } else {
            panic!("expected u32 slot");
        }
        assert_eq!(sample.value, 9);
    }

    #[test]
    fn optional_slot_mut_materializes_default() {
        let mut sample = Sample::default();
        assert!(sample.note.is_none());

        if let Some(SlotMut::I64(note)) = sample.slot_mut("note") {
            *note = -5;
        } else {
            panic!("expected i64 slot");
        }
        assert_eq!(sample.note, Some(-5));
    }

    #[test]
    fn absent_detection_follows_slot_contents() {
        let sample = Sample::default();
        assert!(sample.slot("value").unwrap().is_absent());
        assert!(sample.slot("label").unwrap().is_absent());
        assert!(sample.slot("note").unwrap().is_absent());

        let filled = Sample {
            value: 1,
            label: b"x".to_vec(),
            note: Some(0),
        };
        assert!(!filled.slot("value").unwrap().is_absent());
        assert!(!filled.slot("label").unwrap().is_absent());
        // A materialized zero reads as absent, same as None.
        assert!(filled.slot("note").unwrap().is_absent());
    }

    #[test]
    fn nested_records_expose_their_slots() {
        let mut outer = Outer::default();

        let Some(SlotMut::Record(inner)) = outer.slot_mut("inner") else {
            panic!("expected record slot");
        };
        if let Some(SlotMut::U16(v)) = inner.slot_mut("v") {
            *v = 42;
        }
        assert_eq!(outer.inner.v, 42);
    }

    #[test]
    fn record_arrays_push_and_index() {
        let mut outer = Outer::default();

        let Some(SlotMut::RecordArray(items)) = outer.slot_mut("items") else {
            panic!("expected record array slot");
        };
        let item = items.push_default();
        if let Some(SlotMut::U16(v)) = item.slot_mut("v") {
            *v = 3;
        }

        assert_eq!(outer.items.len(), 1);
        assert_eq!(outer.items[0].v, 3);
    }

    #[test]
    fn scalar_arrays_roundtrip_through_slots() {
        let mut values: Vec<i16> = Vec::new();
        {
            let slot: &mut dyn ArraySlot = &mut values;
            if let SlotMut::I16(item) = slot.push_default() {
                *item = -7;
            }
        }
        assert_eq!(values, vec![-7]);

        let slot: &dyn ArraySlot = &values;
        assert_eq!(slot.len(), 1);
        assert!(matches!(slot.get(0), SlotRef::I16(-7)));
    }
}
