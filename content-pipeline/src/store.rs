//! Keyed persistence for workflow artifacts
//!
//! Backing is a flat in-memory map keyed `"<workflowId>_<kind>[_<agentId>]"`.
//! Listing and deletion are linear prefix scans. All writes for one workflow
//! originate from its single driver task, so the mutex is the only
//! concurrency control needed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::{PipelineError, Result};

const KIND_AGENT_OUTPUT: &str = "agent_output";
const KIND_FINAL_CONTENT: &str = "final_content";
const KIND_QUALITY_REPORT: &str = "quality_report";
const KIND_APPROVAL: &str = "approval";
const KIND_REVISION_REQUEST: &str = "revision_request";

#[derive(Clone, Default)]
pub struct WorkflowStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl WorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&self, key: String, value: Value) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PipelineError::Store("store lock poisoned".to_string()))?;
        entries.insert(key, value);
        Ok(())
    }

    fn fetch(&self, key: &str) -> Result<Option<Value>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| PipelineError::Store("store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    pub fn save_agent_output(&self, workflow_id: &str, agent_id: &str, output: Value) -> Result<()> {
        self.put(
            format!("{}_{}_{}", workflow_id, KIND_AGENT_OUTPUT, agent_id),
            output,
        )
    }

    pub fn get_agent_output(&self, workflow_id: &str, agent_id: &str) -> Result<Option<Value>> {
        self.fetch(&format!("{}_{}_{}", workflow_id, KIND_AGENT_OUTPUT, agent_id))
    }

    pub fn save_final_content(&self, workflow_id: &str, content: Value) -> Result<()> {
        self.put(format!("{}_{}", workflow_id, KIND_FINAL_CONTENT), content)
    }

    pub fn get_final_content(&self, workflow_id: &str) -> Result<Option<Value>> {
        self.fetch(&format!("{}_{}", workflow_id, KIND_FINAL_CONTENT))
    }

    pub fn save_quality_report(&self, workflow_id: &str, report: Value) -> Result<()> {
        self.put(format!("{}_{}", workflow_id, KIND_QUALITY_REPORT), report)
    }

    pub fn get_quality_report(&self, workflow_id: &str) -> Result<Option<Value>> {
        self.fetch(&format!("{}_{}", workflow_id, KIND_QUALITY_REPORT))
    }

    pub fn save_approval(&self, workflow_id: &str, decision: Value) -> Result<()> {
        self.put(format!("{}_{}", workflow_id, KIND_APPROVAL), decision)
    }

    pub fn get_approval(&self, workflow_id: &str) -> Result<Option<Value>> {
        self.fetch(&format!("{}_{}", workflow_id, KIND_APPROVAL))
    }

    pub fn save_revision_request(&self, workflow_id: &str, decision: Value) -> Result<()> {
        self.put(format!("{}_{}", workflow_id, KIND_REVISION_REQUEST), decision)
    }

    pub fn get_revision_request(&self, workflow_id: &str) -> Result<Option<Value>> {
        self.fetch(&format!("{}_{}", workflow_id, KIND_REVISION_REQUEST))
    }

    /// Snapshot of every entry stored under this workflow id, keyed by the
    /// portion of the key after the id prefix
    pub fn all_workflow_data(&self, workflow_id: &str) -> Result<HashMap<String, Value>> {
        let prefix = format!("{}_", workflow_id);
        let entries = self
            .entries
            .lock()
            .map_err(|_| PipelineError::Store("store lock poisoned".to_string()))?;
        Ok(entries
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(&prefix)
                    .map(|rest| (rest.to_string(), v.clone()))
            })
            .collect())
    }

    /// Delete every entry stored under this workflow id, returning how many
    /// were removed
    pub fn delete_workflow(&self, workflow_id: &str) -> Result<usize> {
        let prefix = format!("{}_", workflow_id);
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PipelineError::Store("store lock poisoned".to_string()))?;
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(&prefix));
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn agent_outputs_are_namespaced_per_workflow() {
        let store = WorkflowStore::new();
        store
            .save_agent_output("wf-1", "market-researcher", json!({"trends": ["a"]}))
            .unwrap();
        store
            .save_agent_output("wf-2", "market-researcher", json!({"trends": ["b"]}))
            .unwrap();

        let one = store.get_agent_output("wf-1", "market-researcher").unwrap();
        assert_eq!(one.unwrap()["trends"], json!(["a"]));
        assert!(store.get_agent_output("wf-1", "content-writer").unwrap().is_none());
    }

    #[test]
    fn snapshot_collects_only_the_requested_workflow() {
        let store = WorkflowStore::new();
        store.save_final_content("wf-1", json!({"title": "t"})).unwrap();
        store.save_quality_report("wf-1", json!({"overall": 0.8})).unwrap();
        store.save_final_content("wf-9", json!({"title": "other"})).unwrap();

        let data = store.all_workflow_data("wf-1").unwrap();
        assert_eq!(data.len(), 2);
        assert!(data.contains_key("final_content"));
        assert!(data.contains_key("quality_report"));
    }

    #[test]
    fn delete_removes_all_entries_for_the_id() {
        let store = WorkflowStore::new();
        store.save_final_content("wf-1", json!({})).unwrap();
        store.save_approval("wf-1", json!({"kind": "approved"})).unwrap();
        store.save_final_content("wf-2", json!({})).unwrap();

        assert_eq!(store.delete_workflow("wf-1").unwrap(), 2);
        assert!(store.get_final_content("wf-1").unwrap().is_none());
        assert!(store.get_final_content("wf-2").unwrap().is_some());
    }

    #[test]
    fn decisions_round_trip() {
        let store = WorkflowStore::new();
        store
            .save_revision_request("wf-1", json!({"feedback": "shorten the intro"}))
            .unwrap();
        let back = store.get_revision_request("wf-1").unwrap().unwrap();
        assert_eq!(back["feedback"], "shorten the intro");
    }
}
