use serde_json::Value;

use super::spec::ReduceFn;
use super::{Channel, ChannelError, ChannelSnapshot, TaggedWrite};
use crate::types::Version;

/// Combines the current value with an ordered batch of writes via a pure,
/// associative-in-batch reduce function and a default factory.
#[derive(Clone)]
pub struct ReducerChannel {
    name: String,
    value: Value,
    available: bool,
    version: Version,
    reduce: ReduceFn,
    default: Value,
}

impl std::fmt::Debug for ReducerChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReducerChannel")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("available", &self.available)
            .field("version", &self.version)
            .finish()
    }
}

impl ReducerChannel {
    pub fn new(name: String, reduce: ReduceFn, default: Value) -> Self {
        Self {
            name,
            value: default.clone(),
            available: false,
            version: Version::zero(),
            reduce,
            default,
        }
    }
}

impl Channel for ReducerChannel {
    fn update(&mut self, writes: &[TaggedWrite], superstep: u64) -> Result<bool, ChannelError> {
        if writes.is_empty() {
            return Ok(false);
        }
        let mut current = if self.available {
            self.value.clone()
        } else {
            self.default.clone()
        };
        for write in writes {
            current = (self.reduce)(&current, &write.value);
        }
        self.value = current;
        self.available = true;
        self.version = if writes.len() > 1 {
            // Multiple writers fanned into this channel in the same
            // superstep; keep per-writer provenance via a dotted version.
            Version::dotted(superstep, writes.len() as u64)
        } else {
            self.version.bump()
        };
        Ok(true)
    }

    fn get(&self) -> Result<Value, ChannelError> {
        if self.available {
            Ok(self.value.clone())
        } else {
            Err(ChannelError::EmptyChannel {
                name: self.name.clone(),
            })
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn version(&self) -> Version {
        self.version.clone()
    }

    fn checkpoint(&self) -> ChannelSnapshot {
        ChannelSnapshot::Reducer {
            value: self.value.clone(),
            available: self.available,
            version: self.version.clone(),
        }
    }

    fn restore(&mut self, snapshot: ChannelSnapshot) {
        if let ChannelSnapshot::Reducer {
            value,
            available,
            version,
        } = snapshot
        {
            self.value = value;
            self.available = available;
            self.version = version;
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
