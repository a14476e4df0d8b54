//! Batch operation executor.
//!
//! Runs an ordered list of sub-operations against one [`IssueTracker`],
//! isolating every item: a failing, erroring or panicking item is recorded
//! and the batch moves on to the next one.

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::integrations::{IssueTracker, OperationOutcome};

/// Default number of items returned by a `list` sub-operation.
pub const DEFAULT_LIST_LIMIT: usize = 30;

/// One sub-operation of a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkOperation {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl BulkOperation {
    pub fn new(kind: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Decode one raw batch item. A malformed item is returned as the failed
    /// outcome that stands in for it, so it never affects its neighbours.
    pub fn from_value(item: &Value) -> std::result::Result<Self, OperationOutcome> {
        let Value::Object(fields) = item else {
            return Err(OperationOutcome::failed(format!("Unknown operation: {}", item)));
        };

        let kind = match fields.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            None | Some(Value::Null) => String::new(),
            Some(other) => {
                return Err(OperationOutcome::failed(format!("Unknown operation: {}", other)))
            }
        };

        let data = match fields.get("data") {
            Some(Value::Object(data)) => data.clone(),
            None => Map::new(),
            Some(other) => {
                return Err(OperationOutcome::failed(format!(
                    "Error in operation {}: data must be an object, got {}",
                    kind, other
                )))
            }
        };

        Ok(Self { kind, data })
    }
}

/// The closed set of sub-operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Update,
    Close,
    List,
}

impl FromStr for OperationKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "close" => Ok(Self::Close),
            "list" => Ok(Self::List),
            _ => Err(()),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Close => "close",
            Self::List => "list",
        };
        f.write_str(name)
    }
}

/// Aggregated result of a batch that ran.
#[derive(Debug, Clone, Serialize)]
pub struct BulkResult {
    pub success: bool,
    pub results: Vec<OperationOutcome>,
    pub errors: Vec<String>,
    pub summary: String,
}

impl BulkResult {
    /// Build from per-item outcomes, in input order.
    pub fn from_outcomes(results: Vec<OperationOutcome>) -> Self {
        let errors: Vec<String> = results
            .iter()
            .filter_map(|o| o.error().map(String::from))
            .collect();
        let summary = format!(
            "Completed {} operations, {} errors",
            results.len(),
            errors.len()
        );
        Self {
            success: errors.is_empty(),
            results,
            errors,
            summary,
        }
    }
}

/// What a batch call reports back.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BatchReport {
    /// The collaborator is not configured; nothing ran.
    Unavailable { success: bool, error: String },
    Completed(BulkResult),
}

impl BatchReport {
    fn unavailable(tracker: &dyn IssueTracker) -> Self {
        Self::Unavailable {
            success: false,
            error: format!(
                "{} not available or not authenticated",
                tracker.display_name()
            ),
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            Self::Unavailable { .. } => false,
            Self::Completed(result) => result.success,
        }
    }
}

/// Sequential, order-preserving batch executor.
#[derive(Clone)]
pub struct BatchExecutor {
    tracker: Arc<dyn IssueTracker>,
}

impl BatchExecutor {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self { tracker }
    }

    /// Run every operation in order, one at a time.
    pub async fn execute(&self, operations: Vec<Value>) -> BatchReport {
        if !self.tracker.is_configured() {
            warn!(
                "Skipping batch of {}: {} not configured",
                operations.len(),
                self.tracker.display_name()
            );
            return BatchReport::unavailable(self.tracker.as_ref());
        }

        let batch_id = Uuid::new_v4();
        info!(
            "Batch {} started: {} operations against {}",
            batch_id,
            operations.len(),
            self.tracker.display_name()
        );

        let mut outcomes = Vec::with_capacity(operations.len());
        for (i, item) in operations.iter().enumerate() {
            let outcome = self.run_one(item).await;
            if let Some(error) = outcome.error() {
                debug!("Batch {} item {} failed: {}", batch_id, i, error);
            }
            outcomes.push(outcome);
        }

        let result = BulkResult::from_outcomes(outcomes);
        info!("Batch {} finished: {}", batch_id, result.summary);
        BatchReport::Completed(result)
    }

    /// Run a single raw item. Never fails: faults become a failed outcome.
    pub async fn run_one(&self, item: &Value) -> OperationOutcome {
        match BulkOperation::from_value(item) {
            Ok(op) => self.run_operation(&op).await,
            Err(outcome) => outcome,
        }
    }

    async fn run_operation(&self, op: &BulkOperation) -> OperationOutcome {
        let Ok(kind) = op.kind.parse::<OperationKind>() else {
            return OperationOutcome::failed(format!("Unknown operation: {}", op.kind));
        };

        let call = AssertUnwindSafe(self.dispatch(kind, &op.data)).catch_unwind();
        match call.await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                OperationOutcome::failed(format!("Error in operation {}: {}", op.kind, e))
            }
            Err(panic) => OperationOutcome::failed(format!(
                "Error in operation {}: {}",
                op.kind,
                panic_message(panic.as_ref())
            )),
        }
    }

    async fn dispatch(
        &self,
        kind: OperationKind,
        data: &Map<String, Value>,
    ) -> crate::Result<OperationOutcome> {
        match kind {
            OperationKind::Create => self.tracker.create(data).await,
            OperationKind::Update => self.tracker.update(data).await,
            OperationKind::Close => self.tracker.close(data).await,
            OperationKind::List => {
                let filter = data.get("filter").and_then(Value::as_str);
                let limit = data
                    .get("limit")
                    .and_then(Value::as_u64)
                    .map(|l| l as usize)
                    .unwrap_or(DEFAULT_LIST_LIMIT);
                let items = self.tracker.list(filter, limit).await?;
                Ok(OperationOutcome::succeeded(serde_json::json!({
                    "count": items.len(),
                    "items": items,
                })))
            }
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
