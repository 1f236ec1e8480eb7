use rustc_hash::FxHashSet;
use serde_json::Value;

use super::{Channel, ChannelError, ChannelSnapshot, TaggedWrite};
use crate::types::Version;

/// Becomes available only once every declared writer has fired at least
/// once (across any number of supersteps); once available it behaves as a
/// last-value channel.
#[derive(Debug, Clone)]
pub struct BarrierChannel {
    name: String,
    declared_writers: FxHashSet<String>,
    satisfied: FxHashSet<String>,
    value: Option<Value>,
    version: Version,
}

impl BarrierChannel {
    pub fn new(name: String, declared_writers: FxHashSet<String>) -> Self {
        Self {
            name,
            declared_writers,
            satisfied: FxHashSet::default(),
            value: None,
            version: Version::zero(),
        }
    }

    fn is_satisfied(&self) -> bool {
        self.declared_writers.iter().all(|w| self.satisfied.contains(w))
    }
}

impl Channel for BarrierChannel {
    fn update(&mut self, writes: &[TaggedWrite], _superstep: u64) -> Result<bool, ChannelError> {
        if writes.is_empty() {
            return Ok(false);
        }
        for write in writes {
            self.satisfied.insert(write.writer.clone());
            self.value = Some(write.value.clone());
        }
        self.version = self.version.bump();
        Ok(true)
    }

    fn get(&self) -> Result<Value, ChannelError> {
        if self.is_satisfied() {
            self.value.clone().ok_or_else(|| ChannelError::EmptyChannel {
                name: self.name.clone(),
            })
        } else {
            Err(ChannelError::EmptyChannel {
                name: self.name.clone(),
            })
        }
    }

    fn is_available(&self) -> bool {
        self.is_satisfied() && self.value.is_some()
    }

    fn version(&self) -> Version {
        self.version.clone()
    }

    fn checkpoint(&self) -> ChannelSnapshot {
        ChannelSnapshot::Barrier {
            satisfied: self.satisfied.iter().cloned().collect(),
            value: self.value.clone(),
            version: self.version.clone(),
        }
    }

    fn restore(&mut self, snapshot: ChannelSnapshot) {
        if let ChannelSnapshot::Barrier {
            satisfied,
            value,
            version,
        } = snapshot
        {
            self.satisfied = satisfied.into_iter().collect();
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

    fn writers(names: &[&str]) -> FxHashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn w(writer: &str, v: Value) -> TaggedWrite {
        TaggedWrite {
            writer: writer.into(),
            value: v,
        }
    }

    #[test]
    fn unavailable_until_all_writers_fire() {
        let mut ch = BarrierChannel::new("join".into(), writers(&["a", "b"]));
        ch.update(&[w("a", Value::from(1))], 0).unwrap();
        assert!(!ch.is_available());
        ch.update(&[w("b", Value::from(2))], 1).unwrap();
        assert!(ch.is_available());
        assert_eq!(ch.get().unwrap(), Value::from(2));
    }
}
