use serde_json::Value;

use super::{Channel, ChannelError, ChannelSnapshot, TaggedWrite};
use crate::types::Version;

/// Behaves like a last-value channel, but clears after any superstep in
/// which it received no writes — the value is visible for exactly one
/// superstep past the write that produced it.
#[derive(Debug, Clone)]
pub struct EphemeralChannel {
    name: String,
    value: Option<Value>,
    version: Version,
}

impl EphemeralChannel {
    pub fn new(name: String) -> Self {
        Self {
            name,
            value: None,
            version: Version::zero(),
        }
    }
}

impl Channel for EphemeralChannel {
    fn update(&mut self, writes: &[TaggedWrite], _superstep: u64) -> Result<bool, ChannelError> {
        match writes.len() {
            0 => {
                let changed = self.value.take().is_some();
                Ok(changed)
            }
            1 => {
                self.value = Some(writes[0].value.clone());
                self.version = self.version.bump();
                Ok(true)
            }
            n => Err(ChannelError::InvalidUpdate {
                name: self.name.clone(),
                reason: format!("ephemeral channel received {n} writes in one superstep"),
            }),
        }
    }

    fn get(&self) -> Result<Value, ChannelError> {
        self.value.clone().ok_or_else(|| ChannelError::EmptyChannel {
            name: self.name.clone(),
        })
    }

    fn is_available(&self) -> bool {
        self.value.is_some()
    }

    fn version(&self) -> Version {
        self.version.clone()
    }

    fn checkpoint(&self) -> ChannelSnapshot {
        ChannelSnapshot::Ephemeral {
            value: self.value.clone(),
            version: self.version.clone(),
        }
    }

    fn restore(&mut self, snapshot: ChannelSnapshot) {
        if let ChannelSnapshot::Ephemeral { value, version } = snapshot {
            self.value = value;
            self.version = version;
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(v: Value) -> TaggedWrite {
        TaggedWrite {
            writer: "n".into(),
            value: v,
        }
    }

    #[test]
    fn clears_after_a_silent_superstep() {
        let mut ch = EphemeralChannel::new("scratch".into());
        ch.update(&[w(Value::from(1))], 0).unwrap();
        assert!(ch.is_available());
        ch.update(&[], 1).unwrap();
        assert!(!ch.is_available());
    }
}
