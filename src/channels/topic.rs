use serde_json::Value;

use super::{Channel, ChannelError, ChannelSnapshot, TaggedWrite};
use crate::types::Version;

/// Accumulates writes in order within a superstep; consumers observe the
/// accumulated batch as a JSON array. The batch is replaced (not appended
/// to) on each superstep boundary: a topic channel is a per-step mailbox,
/// not an unbounded log.
#[derive(Debug, Clone)]
pub struct TopicChannel {
    name: String,
    accumulated: Vec<Value>,
    version: Version,
    dedupe: bool,
}

impl TopicChannel {
    pub fn new(name: String, dedupe: bool) -> Self {
        Self {
            name,
            accumulated: Vec::new(),
            version: Version::zero(),
            dedupe,
        }
    }
}

impl Channel for TopicChannel {
    fn update(&mut self, writes: &[TaggedWrite], _superstep: u64) -> Result<bool, ChannelError> {
        if writes.is_empty() {
            return Ok(false);
        }
        let mut batch: Vec<Value> = Vec::with_capacity(writes.len());
        for write in writes {
            if self.dedupe && batch.contains(&write.value) {
                continue;
            }
            batch.push(write.value.clone());
        }
        self.accumulated = batch;
        self.version = self.version.bump();
        Ok(true)
    }

    fn get(&self) -> Result<Value, ChannelError> {
        if self.accumulated.is_empty() {
            Err(ChannelError::EmptyChannel {
                name: self.name.clone(),
            })
        } else {
            Ok(Value::Array(self.accumulated.clone()))
        }
    }

    fn is_available(&self) -> bool {
        !self.accumulated.is_empty()
    }

    fn version(&self) -> Version {
        self.version.clone()
    }

    fn checkpoint(&self) -> ChannelSnapshot {
        ChannelSnapshot::Topic {
            accumulated: self.accumulated.clone(),
            version: self.version.clone(),
        }
    }

    fn restore(&mut self, snapshot: ChannelSnapshot) {
        if let ChannelSnapshot::Topic { accumulated, version } = snapshot {
            self.accumulated = accumulated;
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
    fn accumulates_in_order() {
        let mut ch = TopicChannel::new("events".into(), false);
        ch.update(&[w(Value::from(1)), w(Value::from(2))], 0).unwrap();
        assert_eq!(ch.get().unwrap(), serde_json::json!([1, 2]));
    }

    #[test]
    fn dedupes_when_requested() {
        let mut ch = TopicChannel::new("events".into(), true);
        ch.update(&[w(Value::from(1)), w(Value::from(1))], 0).unwrap();
        assert_eq!(ch.get().unwrap(), serde_json::json!([1]));
    }

    #[test]
    fn resets_at_the_next_superstep_boundary() {
        let mut ch = TopicChannel::new("events".into(), false);
        ch.update(&[w(Value::from(1))], 0).unwrap();
        ch.update(&[w(Value::from(2))], 1).unwrap();
        assert_eq!(ch.get().unwrap(), serde_json::json!([2]));
    }
}
