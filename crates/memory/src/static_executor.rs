//! A deterministic knowledge service for tests and dry runs.

use async_trait::async_trait;
use chrono::Utc;
use schemaloom_core::error::QueryExecutionError;
use schemaloom_core::query::{QueryExecutor, QueryRequest, QueryResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
enum CannedResponse {
    Data(Value),
    Failure(String),
}

/// Answers each query id with a canned `result_data`.
///
/// Every request is recorded so tests can inspect the prompt and response
/// schema the engine sent. Unknown query ids fail with
/// [`QueryExecutionError::Failed`].
pub struct StaticQueryExecutor {
    responses: HashMap<String, CannedResponse>,
    delay: Option<Duration>,
    requests: Mutex<Vec<QueryRequest>>,
    call_count: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl StaticQueryExecutor {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            delay: None,
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Answer `query_id` with `result_data` (a JSON value or a string
    /// holding JSON).
    pub fn with_response(mut self, query_id: impl Into<String>, result_data: Value) -> Self {
        self.responses
            .insert(query_id.into(), CannedResponse::Data(result_data));
        self
    }

    /// Fail every execution of `query_id`.
    pub fn with_failure(mut self, query_id: impl Into<String>, message: impl Into<String>) -> Self {
        self.responses
            .insert(query_id.into(), CannedResponse::Failure(message.into()));
        self
    }

    /// Hold each execution open for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Most executions observed running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Every request received, in arrival order.
    pub async fn requests(&self) -> Vec<QueryRequest> {
        self.requests.lock().await.clone()
    }
}

/// Holds one slot of the in-flight count; released on drop, including when
/// a caller abandons the execution mid-delay.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for StaticQueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryExecutor for StaticQueryExecutor {
    fn name(&self) -> &str {
        "static"
    }

    async fn execute(&self, request: QueryRequest) -> Result<QueryResult, QueryExecutionError> {
        let started = Instant::now();
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlightGuard(&self.in_flight);
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let query_id = request.query_id.clone();
        let query_text = request.prompt.clone();
        tracing::debug!(query_id = %query_id, "Static executor answering");
        self.requests.lock().await.push(request);

        match self.responses.get(&query_id) {
            Some(CannedResponse::Data(result_data)) => Ok(QueryResult {
                query_id,
                query_text,
                result_data: result_data.clone(),
                execution_time_ms: started.elapsed().as_millis() as u64,
                created_at: Utc::now(),
            }),
            Some(CannedResponse::Failure(message)) => Err(QueryExecutionError::Failed {
                service: self.name().to_string(),
                message: message.clone(),
            }),
            None => Err(QueryExecutionError::Failed {
                service: self.name().to_string(),
                message: format!("no canned response for query '{query_id}'"),
            }),
        }
    }
}
