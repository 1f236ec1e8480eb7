//! Interrupting a run mid-superstep and resuming it later.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::node::NodeOutput;
use crate::task::Task;

/// What `call` hands back instead of a resume value: either a raised
/// interrupt the node should propagate immediately (`Ok(NodeOutput)` all the
/// way up through `Node::run`), or a hard failure because this run has no
/// checkpoint saver to persist the interrupt against.
#[derive(Debug)]
pub enum CallError {
    Interrupted(NodeOutput),
    MissingCheckpointer,
}

/// Per-task scratch state carried across an interrupt/resume cycle. A node
/// that calls `interrupt()` more than once in a single invocation (e.g. to
/// collect two separate human approvals in one body) gets a distinct id for
/// each call via `interrupt_counter`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scratchpad {
    pub interrupt_counter: u32,
    pub resume_values: FxHashMap<String, Value>,
}

impl Scratchpad {
    pub fn next_interrupt_counter(&mut self) -> u32 {
        let current = self.interrupt_counter;
        self.interrupt_counter += 1;
        current
    }

    pub fn resume_value_for(&self, interrupt_id: &str) -> Option<&Value> {
        self.resume_values.get(interrupt_id)
    }
}

/// Raised by a node to pause execution and surface `value` to the caller,
/// who resumes by supplying a value keyed by this interrupt's `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphInterrupt {
    pub id: String,
    pub value: Value,
    pub namespace: String,
}

/// Derives an interrupt id from the task that raised it, the checkpoint
/// namespace, and that task's interrupt counter, rather than a bare
/// incrementing counter — nested subgraphs reuse task ids across
/// namespaces, and a counter alone would let their interrupts collide. The
/// task id leads so a cumulative resume map can be sliced down to one
/// task's entries by prefix (see `Task::resume_values_for`).
pub fn interrupt_id(checkpoint_ns: &str, task_id: &str, counter: u32) -> String {
    format!("{task_id}:{checkpoint_ns}:{counter}")
}

/// The primitive a node body calls to pause for external input. On a fresh
/// attempt this raises a `GraphInterrupt` (returned as a `NodeOutput` the
/// node should propagate immediately); on a resumed attempt, where the
/// task's scratchpad already carries a value for this exact call site, it
/// returns that value instead and the node continues past it.
///
/// `namespace` scopes the call site — typically the checkpoint namespace,
/// or a subgraph-local variant of it — so the same task calling `call`
/// twice in one body (to collect two separate inputs) gets two distinct
/// interrupt ids rather than colliding on the same counter value.
///
/// Raising an interrupt only means something if the run can later be resumed
/// from a persisted checkpoint, so a task with no checkpoint saver configured
/// fails with `CallError::MissingCheckpointer` instead of parking on one.
pub fn call(task: &Task, namespace: impl Into<String>, value: Value) -> Result<Value, CallError> {
    let namespace = namespace.into();
    let counter = task.next_interrupt_counter();
    let id = interrupt_id(&namespace, &task.id, counter);
    if let Some(resumed) = task.resume_values.get(&id) {
        return Ok(resumed.clone());
    }
    if !task.has_checkpointer {
        return Err(CallError::MissingCheckpointer);
    }
    Err(CallError::Interrupted(NodeOutput::interrupt(GraphInterrupt {
        id,
        value,
        namespace,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_task_different_namespace_gets_distinct_ids() {
        let a = interrupt_id("ns-a", "task-1", 0);
        let b = interrupt_id("ns-b", "task-1", 0);
        assert_ne!(a, b);
    }

    #[test]
    fn repeated_interrupts_in_one_task_increment() {
        let mut pad = Scratchpad::default();
        let first = pad.next_interrupt_counter();
        let second = pad.next_interrupt_counter();
        assert_ne!(first, second);
    }

    fn fresh_task(resume_values: FxHashMap<String, Value>) -> Task {
        Task::new(
            "cp-1",
            crate::types::NodeKind::custom("approver"),
            FxHashMap::default(),
            Vec::new(),
            None,
            crate::scheduler::RetryPolicy::default(),
            resume_values,
            true,
        )
    }

    fn unwrap_interrupt(err: CallError) -> GraphInterrupt {
        match err {
            CallError::Interrupted(output) => output.interrupt.unwrap(),
            CallError::MissingCheckpointer => panic!("expected an interrupt, not MissingCheckpointer"),
        }
    }

    #[test]
    fn call_without_a_resume_value_raises_an_interrupt() {
        let task = fresh_task(FxHashMap::default());
        let outcome = call(&task, "ns", Value::from(1));
        let interrupt = unwrap_interrupt(outcome.unwrap_err());
        assert_eq!(interrupt.value, Value::from(1));
        assert_eq!(interrupt.namespace, "ns");
        assert_eq!(interrupt.id, format!("{}:ns:0", task.id));
    }

    #[test]
    fn call_with_a_matching_resume_value_returns_it() {
        let task_id_task = fresh_task(FxHashMap::default());
        let id = interrupt_id("ns", &task_id_task.id, 0);
        let mut resume_values = FxHashMap::default();
        resume_values.insert(id, Value::from("OK"));

        let task = Task::new(
            "cp-1",
            crate::types::NodeKind::custom("approver"),
            FxHashMap::default(),
            Vec::new(),
            None,
            crate::scheduler::RetryPolicy::default(),
            resume_values,
            true,
        );
        assert_eq!(task.id, task_id_task.id, "same checkpoint/node/triggers must hash to the same id");

        let value = call(&task, "ns", Value::from(1)).unwrap();
        assert_eq!(value, Value::from("OK"));
    }

    #[test]
    fn sequential_calls_in_one_body_get_distinct_ids() {
        let task = fresh_task(FxHashMap::default());
        let first = unwrap_interrupt(call(&task, "ns", Value::from(1)).unwrap_err());
        let second = unwrap_interrupt(call(&task, "ns", Value::from(2)).unwrap_err());
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn call_without_a_checkpointer_fails_instead_of_parking() {
        let mut task = fresh_task(FxHashMap::default());
        task.has_checkpointer = false;
        let err = call(&task, "ns", Value::from(1)).unwrap_err();
        assert!(matches!(err, CallError::MissingCheckpointer));
    }
}
