use std::collections::HashMap;

use crate::error::{Result, SchemaError};
use crate::types::{internal_schema, MessageDirection, Schema, SchemaMessage};

/// ID of the inbound Hello descriptor. Never changes.
pub const HELLO_INBOUND_ID: u32 = 0;
/// ID of the outbound Hello descriptor. Never changes.
pub const HELLO_OUTBOUND_ID: u32 = 1;
/// ID of the duplex Ping descriptor. Never changes.
pub const PING_ID: u32 = 2;
/// First ID assigned to user-registered messages.
pub const USER_ID_START: u32 = 3;

/// A registered message with its assigned ID and derived metadata.
///
/// Generic over the handler type `H` so this crate stays free of connection
/// concerns; the server layer instantiates `H` with its handler callback.
pub struct MessageDescriptor<H> {
    pub id: u32,
    pub message: SchemaMessage,
    pub optional_count: u32,
    pub internal: bool,
    pub handler: Option<H>,
}

impl<H> MessageDescriptor<H> {
    /// Bytes occupied by the optional-presence bitmap of this message.
    pub fn opt_flag_length(&self) -> u32 {
        crate::types::opt_flag_length(self.optional_count)
    }
}

/// Assigns dense IDs to messages and enforces signature uniqueness.
///
/// IDs are zero-based and assigned in registration order: the three internal
/// descriptors first (exactly once), then the user schema (at most once).
/// Signature maps are kept per registration set and queried separately — an
/// internal signature never collides with a user signature.
pub struct DescriptorRegistry<H> {
    descriptors: Vec<MessageDescriptor<H>>,
    internal_signatures: HashMap<String, u32>,
    user_signatures: HashMap<String, u32>,
    registered_internal: bool,
    registered_user: bool,
}

impl<H> Default for DescriptorRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> DescriptorRegistry<H> {
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
            internal_signatures: HashMap::new(),
            user_signatures: HashMap::new(),
            registered_internal: false,
            registered_user: false,
        }
    }

    /// Install the reserved internal descriptors at IDs 0, 1, 2.
    ///
    /// Must happen exactly once, before any user registration.
    pub fn register_internal(&mut self) -> Result<()> {
        if self.registered_internal || self.registered_user {
            return Err(SchemaError::AlreadyRegistered);
        }

        let staged = self.stage(internal_schema(), true)?;
        self.commit(staged, true);
        self.registered_internal = true;
        Ok(())
    }

    /// Append the user schema, assigning IDs from [`USER_ID_START`].
    ///
    /// The whole call fails without observable partial state if any message
    /// is invalid or any signature within the user set repeats.
    pub fn register_schema(&mut self, schema: Schema) -> Result<()> {
        if self.registered_user {
            return Err(SchemaError::AlreadyRegistered);
        }
        if !self.registered_internal {
            return Err(SchemaError::InternalNotRegistered);
        }

        let staged = self.stage(schema, false)?;
        self.commit(staged, false);
        self.registered_user = true;
        Ok(())
    }

    /// Look up a descriptor by ID.
    pub fn lookup(&self, id: u32) -> Option<&MessageDescriptor<H>> {
        self.descriptors.get(id as usize)
    }

    /// Resolve an internal signature to its descriptor ID.
    pub fn lookup_internal(&self, direction: MessageDirection, name: &str) -> Option<u32> {
        self.internal_signatures.get(&signature(direction, name)).copied()
    }

    /// Resolve a user signature to its descriptor ID.
    pub fn lookup_user(&self, direction: MessageDirection, name: &str) -> Option<u32> {
        self.user_signatures.get(&signature(direction, name)).copied()
    }

    /// Attach a handler to a user descriptor by signature.
    pub fn bind_handler(
        &mut self,
        direction: MessageDirection,
        name: &str,
        handler: H,
    ) -> Result<()> {
        let id = self
            .lookup_user(direction, name)
            .ok_or_else(|| SchemaError::UnknownSignature(signature(direction, name)))?;
        self.descriptors[id as usize].handler = Some(handler);
        Ok(())
    }

    /// Attach a handler to an internal descriptor by signature.
    pub fn bind_internal_handler(
        &mut self,
        direction: MessageDirection,
        name: &str,
        handler: H,
    ) -> Result<()> {
        let id = self
            .lookup_internal(direction, name)
            .ok_or_else(|| SchemaError::UnknownSignature(signature(direction, name)))?;
        self.descriptors[id as usize].handler = Some(handler);
        Ok(())
    }

    /// Iterate the user descriptors (IDs ≥ [`USER_ID_START`]).
    pub fn user_descriptors(&self) -> impl Iterator<Item = &MessageDescriptor<H>> {
        self.descriptors.iter().filter(|descriptor| !descriptor.internal)
    }

    /// Total number of registered descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn registered_internal(&self) -> bool {
        self.registered_internal
    }

    pub fn registered_user(&self) -> bool {
        self.registered_user
    }

    fn stage(&self, schema: Schema, internal: bool) -> Result<Staged<H>> {
        let mut signatures = HashMap::new();
        let mut descriptors = Vec::with_capacity(schema.messages.len());
        let mut next_id = self.descriptors.len() as u32;

        for message in schema.messages {
            message.validate()?;

            let id = next_id;
            next_id += 1;

            stage_signatures(&mut signatures, &message, id)?;
            descriptors.push(MessageDescriptor {
                id,
                optional_count: message.optional_count(),
                internal,
                handler: None,
                message,
            });
        }

        Ok(Staged {
            descriptors,
            signatures,
        })
    }

    fn commit(&mut self, staged: Staged<H>, internal: bool) {
        self.descriptors.extend(staged.descriptors);
        if internal {
            self.internal_signatures.extend(staged.signatures);
        } else {
            self.user_signatures.extend(staged.signatures);
        }
    }
}

struct Staged<H> {
    descriptors: Vec<MessageDescriptor<H>>,
    signatures: HashMap<String, u32>,
}

fn signature(direction: MessageDirection, name: &str) -> String {
    format!("{} {}", direction.label(), name)
}

fn stage_signatures(
    signatures: &mut HashMap<String, u32>,
    message: &SchemaMessage,
    id: u32,
) -> Result<()> {
    let directions: &[MessageDirection] = match message.direction {
        MessageDirection::Duplex => &[MessageDirection::Inbound, MessageDirection::Outbound],
        other => &[other],
    };

    for &direction in directions {
        let rendered = signature(direction, &message.name);
        if signatures.contains_key(&rendered) {
            return Err(SchemaError::DuplicateSignature(rendered));
        }
        signatures.insert(rendered, id);
    }

    Ok(())
}
