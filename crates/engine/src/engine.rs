//! The assembly orchestrator.
//!
//! One run: load the specification and source document, answer every
//! pointer's query (concurrently, bounded), merge the answers into a fresh
//! document, validate it against the root schema, and persist it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use schemaloom_config::EngineConfig;
use schemaloom_core::document::JSON_CONTENT_TYPE;
use schemaloom_core::event::{DomainEvent, EventBus};
use schemaloom_core::query::{QueryExecutor, QueryRequest};
use schemaloom_core::repository::{
    AssemblyRepository, DocumentRepository, QueryRepository, SpecificationRepository,
};
use schemaloom_core::{
    Assembly, AssemblyError, AssemblySpecification, AssemblyStatus, Document, DocumentStatus,
    DocumentTarget, JsonPointer, QueryExecutionError, RepositoryError,
};
use schemaloom_schema::{
    CompatOptions, SchemaValidator, make_compatible_with, result_key, schema_for_pointer,
};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::merge;
use crate::result::parse_result;

/// Tuning for [`AssemblyEngine`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Pointers queried at once
    pub max_concurrency: usize,

    /// Run the compatibility preprocessor on each sub-schema
    pub compatibility: bool,

    pub compat: CompatOptions,

    /// Per-call limit on the knowledge service
    pub query_timeout: Option<Duration>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            compatibility: true,
            compat: CompatOptions::default(),
            query_timeout: None,
        }
    }
}

impl From<&EngineConfig> for EngineOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_concurrency: config.assembly.max_concurrency,
            compatibility: config.assembly.compatibility,
            compat: CompatOptions {
                max_inline_depth: config.compatibility.max_inline_depth,
                max_schema_depth: config.compatibility.max_schema_depth,
            },
            query_timeout: config.assembly.query_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// One pointer's parsed answer, ready to merge.
struct PointerValue {
    pointer: JsonPointer,
    target: DocumentTarget,
    value: Value,
}

/// Assembles structured documents from source documents, one knowledge
/// service query per schema pointer.
pub struct AssemblyEngine {
    documents: Arc<dyn DocumentRepository>,
    specifications: Arc<dyn SpecificationRepository>,
    queries: Arc<dyn QueryRepository>,
    assemblies: Arc<dyn AssemblyRepository>,
    executor: Arc<dyn QueryExecutor>,
    event_bus: Option<Arc<EventBus>>,
    options: EngineOptions,
}

impl AssemblyEngine {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        specifications: Arc<dyn SpecificationRepository>,
        queries: Arc<dyn QueryRepository>,
        assemblies: Arc<dyn AssemblyRepository>,
        executor: Arc<dyn QueryExecutor>,
    ) -> Self {
        Self {
            documents,
            specifications,
            queries,
            assemblies,
            executor,
            event_bus: None,
            options: EngineOptions::default(),
        }
    }

    /// Publish progress events on `bus`.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Assemble `document_id` according to `specification_id`.
    ///
    /// On success the returned [`Assembly`] is completed and names the
    /// persisted output document.
    pub async fn assemble(
        &self,
        document_id: &str,
        specification_id: &str,
    ) -> Result<Assembly, AssemblyError> {
        self.assemble_in_workflow(document_id, specification_id, None)
            .await
    }

    /// Like [`assemble`](Self::assemble), recording the caller's workflow id
    /// on the [`Assembly`]. Without one the assembly id is used.
    #[instrument(skip(self), fields(assembly_id = tracing::field::Empty))]
    pub async fn assemble_in_workflow(
        &self,
        document_id: &str,
        specification_id: &str,
        workflow_id: Option<&str>,
    ) -> Result<Assembly, AssemblyError> {
        let specification = self
            .specifications
            .get(specification_id)
            .await?
            .ok_or_else(|| AssemblyError::SpecificationNotFound(specification_id.to_string()))?;
        let source = self
            .documents
            .get(document_id)
            .await?
            .ok_or_else(|| AssemblyError::DocumentNotFound(document_id.to_string()))?;

        let mut assembly =
            Assembly::new(specification_id, document_id, workflow_id.unwrap_or_default());
        if assembly.workflow_id.is_empty() {
            assembly.workflow_id = assembly.assembly_id.clone();
        }
        tracing::Span::current().record("assembly_id", assembly.assembly_id.as_str());

        self.assemblies.save(assembly.clone()).await?;
        assembly.transition_to(AssemblyStatus::InProgress)?;
        self.assemblies.save(assembly.clone()).await?;

        let pointer_count = specification.knowledge_service_queries.len();
        info!(
            specification = %specification.name,
            pointers = pointer_count,
            "Assembly started"
        );
        self.publish(DomainEvent::AssemblyStarted {
            assembly_id: assembly.assembly_id.clone(),
            specification_id: specification_id.to_string(),
            pointer_count,
            timestamp: Utc::now(),
        });

        match self.run(&assembly, &specification, &source).await {
            Ok(finished) => Ok(finished),
            Err(error) => {
                self.mark_failed(assembly, &error).await;
                Err(error)
            }
        }
    }

    /// Cancel a pending or in-progress assembly.
    pub async fn cancel(&self, assembly_id: &str) -> Result<Assembly, AssemblyError> {
        let mut assembly = self
            .assemblies
            .get(assembly_id)
            .await?
            .ok_or_else(|| AssemblyError::AssemblyNotFound(assembly_id.to_string()))?;
        assembly.transition_to(AssemblyStatus::Cancelled)?;
        self.assemblies.save(assembly.clone()).await?;
        info!(assembly_id, "Assembly cancelled");
        Ok(assembly)
    }

    async fn run(
        &self,
        assembly: &Assembly,
        specification: &AssemblySpecification,
        source: &Document,
    ) -> Result<Assembly, AssemblyError> {
        let assembled = self.build_document(assembly, specification, source).await?;

        let validator = SchemaValidator::new(&specification.jsonschema).map_err(|e| {
            AssemblyError::SchemaValidation {
                errors: vec![e.to_string()],
            }
        })?;
        if let Err(errors) = validator.validate(&assembled) {
            warn!(errors = errors.len(), "Assembled document failed validation");
            return Err(AssemblyError::SchemaValidation { errors });
        }

        if let Some(stored) = self.cancelled(&assembly.assembly_id).await? {
            info!("Assembly was cancelled, discarding output");
            return Ok(stored);
        }

        let content = serde_json::to_vec_pretty(&assembled).map_err(RepositoryError::from)?;
        let mut output = Document::new(
            "",
            format!("{}.json", assembly.assembly_id),
            JSON_CONTENT_TYPE,
            content,
        );
        output.status = DocumentStatus::Assembled;
        let assembled_document_id = self.documents.save(output).await?;

        let mut finished = assembly.clone();
        finished.complete(assembled_document_id.clone())?;
        self.assemblies.save(finished.clone()).await?;

        info!(assembled_document_id = %assembled_document_id, "Assembly completed");
        self.publish(DomainEvent::AssemblyCompleted {
            assembly_id: finished.assembly_id.clone(),
            assembled_document_id,
            timestamp: Utc::now(),
        });
        Ok(finished)
    }

    /// Answer every pointer, then merge the answers in pointer order.
    async fn build_document(
        &self,
        assembly: &Assembly,
        specification: &AssemblySpecification,
        source: &Document,
    ) -> Result<Value, AssemblyError> {
        let pending: Vec<(JsonPointer, String)> = specification
            .knowledge_service_queries
            .iter()
            .map(|(pointer, query_id)| (pointer.clone(), query_id.clone()))
            .collect();

        let mut answers: Vec<PointerValue> = stream::iter(pending)
            .map(|(pointer, query_id)| async move {
                self.fill_pointer(assembly, specification, source, &pointer, &query_id)
                    .await
            })
            .buffer_unordered(self.options.max_concurrency.max(1))
            .try_collect()
            .await?;
        answers.sort_by(|a, b| a.pointer.cmp(&b.pointer));

        let mut document = Value::Object(Map::new());
        for answer in answers {
            merge::insert(
                &mut document,
                &answer.pointer.to_string(),
                &answer.target,
                answer.value,
            )?;
        }
        Ok(document)
    }

    async fn fill_pointer(
        &self,
        assembly: &Assembly,
        specification: &AssemblySpecification,
        source: &Document,
        pointer: &JsonPointer,
        query_id: &str,
    ) -> Result<PointerValue, AssemblyError> {
        let started = Instant::now();
        let pointer_str = pointer.to_string();
        let target = pointer.document_target()?;

        let sub_schema = schema_for_pointer(&specification.jsonschema, pointer)?;
        let (response_schema, schema_changes) = if self.options.compatibility {
            let compat = make_compatible_with(&sub_schema, &self.options.compat);
            let changes = compat.changes.len();
            if changes > 0 {
                debug!(pointer = %pointer_str, changes, "Sub-schema rewritten for provider");
            }
            (compat.into_owned(), changes)
        } else {
            (sub_schema.into_owned(), 0)
        };

        let query = self.queries.get(query_id).await?.ok_or_else(|| {
            AssemblyError::QueryNotFound {
                pointer: pointer_str.clone(),
                query_id: query_id.to_string(),
            }
        })?;

        let request = QueryRequest {
            query_id: query.query_id.clone(),
            knowledge_service_id: query.knowledge_service_id.clone(),
            prompt: query.prompt.clone(),
            source_content: source.content.clone(),
            response_schema: Some(response_schema),
            assistant_priming: query.assistant_prompt.clone(),
            query_metadata: query.query_metadata.clone(),
        };
        debug!(
            pointer = %pointer_str,
            query_id,
            executor = self.executor.name(),
            "Executing query"
        );

        let result = self
            .execute(request)
            .await
            .map_err(|source| AssemblyError::QueryExecution {
                pointer: pointer_str.clone(),
                source,
            })?;
        let value = parse_result(&pointer_str, result_key(pointer), &result.result_data)?;

        let duration_ms = started.elapsed().as_millis() as u64;
        debug!(pointer = %pointer_str, duration_ms, "Pointer assembled");
        self.publish(DomainEvent::PointerAssembled {
            assembly_id: assembly.assembly_id.clone(),
            pointer: pointer_str,
            query_id: query_id.to_string(),
            duration_ms,
            schema_changes,
            timestamp: Utc::now(),
        });

        Ok(PointerValue {
            pointer: pointer.clone(),
            target,
            value,
        })
    }

    async fn execute(
        &self,
        request: QueryRequest,
    ) -> Result<schemaloom_core::QueryResult, QueryExecutionError> {
        match self.options.query_timeout {
            Some(limit) => tokio::time::timeout(limit, self.executor.execute(request))
                .await
                .map_err(|_| QueryExecutionError::Timeout {
                    timeout_secs: limit.as_secs(),
                })?,
            None => self.executor.execute(request).await,
        }
    }

    /// The stored record, if it has been cancelled since the run began.
    async fn cancelled(&self, assembly_id: &str) -> Result<Option<Assembly>, AssemblyError> {
        let stored = self.assemblies.get(assembly_id).await?;
        Ok(stored.filter(|a| a.status == AssemblyStatus::Cancelled))
    }

    async fn mark_failed(&self, mut assembly: Assembly, error: &AssemblyError) {
        warn!(error = %error, "Assembly failed");

        match self.cancelled(&assembly.assembly_id).await {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not re-read assembly before marking it failed"),
        }

        if assembly.transition_to(AssemblyStatus::Failed).is_ok() {
            if let Err(e) = self.assemblies.save(assembly.clone()).await {
                warn!(error = %e, "Could not persist failed assembly");
            }
        }
        self.publish(DomainEvent::AssemblyFailed {
            assembly_id: assembly.assembly_id,
            error_message: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}
