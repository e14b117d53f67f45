//! Append-only record of stage outcomes for a run

use crate::stage::StageStatus;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub stage_name: String,
    pub status: StageStatus,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionTrace {
    entries: Vec<TraceEntry>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and emit it as a tracing event.
    pub fn record(&mut self, execution_id: &str, stage_name: &str, status: StageStatus) {
        tracing::info!(
            execution_id,
            stage = stage_name,
            status = status.as_str(),
            "stage complete"
        );
        self.entries.push(TraceEntry {
            stage_name: stage_name.to_string(),
            status,
            timestamp: Local::now(),
        });
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One JSON object per line.
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order_and_serializes_lines() {
        let mut trace = ExecutionTrace::new();
        trace.record("run", "planner", StageStatus::Success);
        trace.record("run", "data_agent", StageStatus::Partial);

        let names: Vec<_> = trace.entries().iter().map(|e| e.stage_name.as_str()).collect();
        assert_eq!(names, vec!["planner", "data_agent"]);
        assert!(trace.entries()[0].timestamp <= trace.entries()[1].timestamp);

        let jsonl = trace.to_jsonl().unwrap();
        let lines: Vec<_> = jsonl.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["status"], "partial");
    }
}
