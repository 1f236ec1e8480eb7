use serde_json::Value;

use super::{Channel, ChannelError, ChannelSnapshot, TaggedWrite};
use crate::types::Version;

/// Retains the most recent write. More than one write in a single superstep
/// is a configuration error unless the channel is declared as a reducer
/// instead.
#[derive(Debug, Clone)]
pub struct LastValueChannel {
    name: String,
    value: Option<Value>,
    version: Version,
}

impl LastValueChannel {
    pub fn new(name: String) -> Self {
        Self {
            name,
            value: None,
            version: Version::zero(),
        }
    }
}

impl Channel for LastValueChannel {
    fn update(&mut self, writes: &[TaggedWrite], _superstep: u64) -> Result<bool, ChannelError> {
        match writes.len() {
            0 => Ok(false),
            1 => {
                self.value = Some(writes[0].value.clone());
                self.version = self.version.bump();
                Ok(true)
            }
            n => Err(ChannelError::InvalidUpdate {
                name: self.name.clone(),
                reason: format!(
                    "last-value channel received {n} writes in one superstep; declare a reducer \
                     if fan-in is intended"
                ),
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
        ChannelSnapshot::LastValue {
            value: self.value.clone(),
            version: self.version.clone(),
        }
    }

    fn restore(&mut self, snapshot: ChannelSnapshot) {
        if let ChannelSnapshot::LastValue { value, version } = snapshot {
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
    fn empty_batch_is_noop() {
        let mut ch = LastValueChannel::new("x".into());
        assert!(!ch.update(&[], 0).unwrap());
        assert!(!ch.is_available());
    }

    #[test]
    fn single_write_sets_value_and_bumps() {
        let mut ch = LastValueChannel::new("x".into());
        assert!(ch.update(&[w(Value::from(1))], 0).unwrap());
        assert_eq!(ch.get().unwrap(), Value::from(1));
        assert_eq!(ch.version(), Version::Int(1));
    }

    #[test]
    fn multiple_writes_fail() {
        let mut ch = LastValueChannel::new("x".into());
        let err = ch.update(&[w(Value::from(1)), w(Value::from(2))], 0);
        assert!(err.is_err());
    }

    #[test]
    fn read_before_write_is_empty_channel() {
        let ch = LastValueChannel::new("x".into());
        assert!(matches!(ch.get(), Err(ChannelError::EmptyChannel { .. })));
    }
}
