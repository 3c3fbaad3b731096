//! Process-wide binding cache.
//!
//! A record type's binding table is validated once, on first use, and the
//! verdict is memoized by type identity. Concurrent first use races on the
//! insert; losers discard their computed verdict and adopt the cached one.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{OnceLock, RwLock};

use crate::error::{CodecError, Result};
use crate::record::Record;

/// `Ok` or the first duplicated protocol name.
type Verdict = std::result::Result<(), &'static str>;

static BINDING_CACHE: OnceLock<RwLock<HashMap<TypeId, Verdict>>> = OnceLock::new();

fn cache() -> &'static RwLock<HashMap<TypeId, Verdict>> {
    BINDING_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Validate a record type's bindings, memoizing the verdict per type.
pub(crate) fn check_bindings(record: &dyn Record) -> Result<()> {
    let key = record.type_key();

    {
        let guard = match cache().read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(verdict) = guard.get(&key) {
            return (*verdict).map_err(CodecError::DuplicateBinding);
        }
    }

    let verdict = validate(record);

    let mut guard = match cache().write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let stored = *guard.entry(key).or_insert(verdict);
    stored.map_err(CodecError::DuplicateBinding)
}

fn validate(record: &dyn Record) -> Verdict {
    let bindings = record.bindings();
    let mut seen = HashSet::with_capacity(bindings.len());

    for binding in bindings {
        if !seen.insert(binding.name) {
            return Err(binding.name);
        }
    }

    Ok(())
}
