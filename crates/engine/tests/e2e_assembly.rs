//! End-to-end assembly runs against in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use schemaloom_core::repository::{
    AssemblyRepository, DocumentRepository, QueryRepository, SpecificationRepository,
};
use schemaloom_core::{
    Assembly, AssemblyError, AssemblySpecification, AssemblyStatus, Document, DomainEvent,
    EventBus, JsonPointer, KnowledgeServiceQuery, QueryExecutionError,
};
use schemaloom_engine::{AssemblyEngine, EngineOptions};
use schemaloom_memory::{
    InMemoryAssemblyRepository, InMemoryDocumentRepository, InMemoryQueryRepository,
    InMemorySpecificationRepository, StaticQueryExecutor,
};
use serde_json::{Value, json};

const SOURCE_TEXT: &str = "Weekly sync. Agenda: roadmap, hiring. Decisions: ship v2.";

struct Harness {
    documents: Arc<InMemoryDocumentRepository>,
    assemblies: Arc<InMemoryAssemblyRepository>,
    executor: Arc<StaticQueryExecutor>,
    engine: AssemblyEngine,
}

async fn harness(
    executor: StaticQueryExecutor,
    specification: AssemblySpecification,
    queries: Vec<KnowledgeServiceQuery>,
    options: EngineOptions,
) -> Harness {
    let documents = Arc::new(InMemoryDocumentRepository::new());
    let specifications = Arc::new(InMemorySpecificationRepository::new());
    let query_repo = Arc::new(InMemoryQueryRepository::new());
    let assemblies = Arc::new(InMemoryAssemblyRepository::new());
    let executor = Arc::new(executor);

    documents
        .save(Document::new("doc-1", "minutes.txt", "text/plain", SOURCE_TEXT))
        .await
        .unwrap();
    specifications.save(specification).await.unwrap();
    for query in queries {
        query_repo.save(query).await.unwrap();
    }

    let engine = AssemblyEngine::new(
        documents.clone(),
        specifications,
        query_repo,
        assemblies.clone(),
        executor.clone(),
    )
    .with_options(options);

    Harness {
        documents,
        assemblies,
        executor,
        engine,
    }
}

fn ptr(raw: &str) -> JsonPointer {
    raw.parse().unwrap()
}

fn query(id: &str, prompt: &str) -> KnowledgeServiceQuery {
    KnowledgeServiceQuery::new(id, id, "llm", prompt)
}

fn meeting_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "summary": { "type": "string" }
        },
        "required": ["title", "summary"]
    })
}

fn meeting_spec() -> AssemblySpecification {
    AssemblySpecification::new("spec-meeting", "Meeting minutes", meeting_schema())
        .with_query(ptr("/properties/title"), "q1")
        .with_query(ptr("/properties/summary"), "q2")
}

async fn stored_status(h: &Harness) -> AssemblyStatus {
    let all = h.assemblies.list().await;
    assert_eq!(all.len(), 1, "exactly one assembly record expected");
    all[0].status
}

async fn output_json(h: &Harness, assembly: &Assembly) -> Value {
    let id = assembly.assembled_document_id.as_deref().unwrap();
    let doc = h.documents.get(id).await.unwrap().unwrap();
    assert_eq!(doc.content_type, "application/json");
    assert!(doc.verify_hash());
    serde_json::from_slice(&doc.content).unwrap()
}

#[tokio::test]
async fn assembles_meeting_minutes_end_to_end() {
    let executor = StaticQueryExecutor::new()
        .with_response("q1", json!({ "title": "Test Meeting" }))
        .with_response("q2", json!({ "summary": "..." }));
    let h = harness(
        executor,
        meeting_spec(),
        vec![query("q1", "Extract the title"), query("q2", "Summarise")],
        EngineOptions::default(),
    )
    .await;

    let assembly = h.engine.assemble("doc-1", "spec-meeting").await.unwrap();

    assert_eq!(assembly.status, AssemblyStatus::Completed);
    assert_eq!(assembly.workflow_id, assembly.assembly_id);
    assert_eq!(
        output_json(&h, &assembly).await,
        json!({ "title": "Test Meeting", "summary": "..." })
    );
    assert_eq!(stored_status(&h).await, AssemblyStatus::Completed);
    assert_eq!(h.executor.call_count(), 2);
}

#[tokio::test]
async fn missing_field_fails_validation() {
    let spec = AssemblySpecification::new("spec-meeting", "Meeting minutes", meeting_schema())
        .with_query(ptr("/properties/title"), "q1");
    let executor =
        StaticQueryExecutor::new().with_response("q1", json!({ "title": "Test Meeting" }));
    let h = harness(
        executor,
        spec,
        vec![query("q1", "Extract the title")],
        EngineOptions::default(),
    )
    .await;

    let err = h.engine.assemble("doc-1", "spec-meeting").await.unwrap_err();

    match &err {
        AssemblyError::SchemaValidation { errors } => {
            assert!(!errors.is_empty());
            assert!(errors.iter().any(|e| e.contains("summary")));
        }
        other => panic!("expected SchemaValidation, got {other:?}"),
    }
    assert!(err.is_retryable());
    assert_eq!(stored_status(&h).await, AssemblyStatus::Failed);
    assert_eq!(h.documents.len().await, 1, "no output document persisted");
}

#[tokio::test]
async fn missing_query_fails_the_run() {
    let executor =
        StaticQueryExecutor::new().with_response("q1", json!({ "title": "Test Meeting" }));
    let h = harness(
        executor,
        meeting_spec(),
        vec![query("q1", "Extract the title")],
        EngineOptions::default(),
    )
    .await;

    let err = h.engine.assemble("doc-1", "spec-meeting").await.unwrap_err();

    match err {
        AssemblyError::QueryNotFound { pointer, query_id } => {
            assert_eq!(pointer, "/properties/summary");
            assert_eq!(query_id, "q2");
        }
        other => panic!("expected QueryNotFound, got {other:?}"),
    }
    assert_eq!(stored_status(&h).await, AssemblyStatus::Failed);
}

#[tokio::test]
async fn missing_entities_fail_before_an_assembly_exists() {
    let h = harness(
        StaticQueryExecutor::new(),
        meeting_spec(),
        vec![],
        EngineOptions::default(),
    )
    .await;

    assert!(matches!(
        h.engine.assemble("doc-missing", "spec-meeting").await,
        Err(AssemblyError::DocumentNotFound(id)) if id == "doc-missing"
    ));
    assert!(matches!(
        h.engine.assemble("doc-1", "spec-missing").await,
        Err(AssemblyError::SpecificationNotFound(id)) if id == "spec-missing"
    ));
    assert!(h.assemblies.list().await.is_empty());
    assert_eq!(h.executor.call_count(), 0);
}

#[tokio::test]
async fn executor_failure_marks_assembly_failed() {
    let executor = StaticQueryExecutor::new()
        .with_response("q1", json!({ "title": "Test Meeting" }))
        .with_failure("q2", "upstream overloaded");
    let h = harness(
        executor,
        meeting_spec(),
        vec![query("q1", "Extract the title"), query("q2", "Summarise")],
        EngineOptions::default(),
    )
    .await;

    let err = h.engine.assemble("doc-1", "spec-meeting").await.unwrap_err();

    assert!(matches!(
        &err,
        AssemblyError::QueryExecution { pointer, .. } if pointer == "/properties/summary"
    ));
    assert!(err.to_string().contains("upstream overloaded"));
    assert_eq!(stored_status(&h).await, AssemblyStatus::Failed);
}

#[tokio::test]
async fn unparseable_answer_is_reported() {
    let executor = StaticQueryExecutor::new()
        .with_response("q1", json!("Test Meeting"))
        .with_response("q2", json!({ "summary": "..." }));
    let h = harness(
        executor,
        meeting_spec(),
        vec![query("q1", "Extract the title"), query("q2", "Summarise")],
        EngineOptions::default(),
    )
    .await;

    let err = h.engine.assemble("doc-1", "spec-meeting").await.unwrap_err();
    assert!(matches!(err, AssemblyError::ResultParse { .. }));
    assert_eq!(stored_status(&h).await, AssemblyStatus::Failed);
}

#[tokio::test]
async fn executor_receives_compatible_sub_schema_and_query_details() {
    let schema = json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "Project",
        "type": "object",
        "properties": {
            "tags": {
                "type": "array",
                "items": { "type": "string", "maxLength": 20 },
                "minItems": 3,
                "uniqueItems": true
            }
        }
    });
    let spec = AssemblySpecification::new("spec-project", "Project", schema)
        .with_query(ptr("/properties/tags"), "q-tags");
    let executor = StaticQueryExecutor::new()
        .with_response(
            "q-tags",
            json!("```json\n{\"tags\": [\"rust\", \"schema\", \"llm\"]}\n```"),
        );
    let h = harness(
        executor,
        spec,
        vec![query("q-tags", "List the tags").with_assistant_prompt("{\"tags\": [")],
        EngineOptions::default(),
    )
    .await;

    let assembly = h.engine.assemble("doc-1", "spec-project").await.unwrap();
    assert_eq!(output_json(&h, &assembly).await, json!({ "tags": ["rust", "schema", "llm"] }));

    let requests = h.executor.requests().await;
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.prompt, "List the tags");
    assert_eq!(request.assistant_priming.as_deref(), Some("{\"tags\": ["));
    assert_eq!(request.source_content, SOURCE_TEXT.as_bytes());

    let sent = request.response_schema.as_ref().unwrap();
    assert_eq!(sent["title"], "Project - /properties/tags");
    assert_eq!(sent["required"], json!(["tags"]));
    assert_eq!(sent["additionalProperties"], json!(false));
    let tags = &sent["properties"]["tags"];
    assert_eq!(tags["minItems"], json!(1));
    assert!(tags.get("uniqueItems").is_none());
    assert!(tags["items"].get("maxLength").is_none());
}

#[tokio::test]
async fn compatibility_can_be_disabled() {
    let schema = json!({
        "type": "object",
        "properties": {
            "tags": { "type": "array", "items": { "type": "string" }, "minItems": 3 }
        }
    });
    let spec = AssemblySpecification::new("spec-project", "Project", schema)
        .with_query(ptr("/properties/tags"), "q-tags");
    let executor =
        StaticQueryExecutor::new().with_response("q-tags", json!({ "tags": ["a", "b", "c"] }));
    let options = EngineOptions {
        compatibility: false,
        ..EngineOptions::default()
    };
    let h = harness(executor, spec, vec![query("q-tags", "List the tags")], options).await;

    h.engine.assemble("doc-1", "spec-project").await.unwrap();

    let requests = h.executor.requests().await;
    let sent = requests[0].response_schema.as_ref().unwrap();
    assert_eq!(sent["properties"]["tags"]["minItems"], json!(3));
}

#[tokio::test]
async fn nested_items_and_tuple_pointers_merge_into_one_document() {
    let schema = json!({
        "type": "object",
        "properties": {
            "meeting": {
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "room": { "type": "string" }
                },
                "required": ["title", "room"]
            },
            "attendees": { "type": "array", "items": { "type": "string" } },
            "window": {
                "type": "array",
                "prefixItems": [{ "type": ["string", "null"] }, { "type": "string" }]
            }
        },
        "required": ["meeting", "attendees"]
    });
    let spec = AssemblySpecification::new("spec-nested", "Nested", schema)
        .with_query(ptr("/properties/meeting/properties/title"), "q-title")
        .with_query(ptr("/properties/meeting/properties/room"), "q-room")
        .with_query(ptr("/properties/attendees/items"), "q-people")
        .with_query(ptr("/properties/window/prefixItems/1"), "q-end");
    let executor = StaticQueryExecutor::new()
        .with_response("q-title", json!({ "title": "Planning" }))
        .with_response("q-room", json!("{\"room\": \"4B\"}"))
        .with_response("q-people", json!({ "items": ["Ada", "Grace"] }))
        .with_response("q-end", json!({ "1": "17:00" }));
    let h = harness(
        executor,
        spec,
        vec![
            query("q-title", "Title?"),
            query("q-room", "Room?"),
            query("q-people", "Who attended?"),
            query("q-end", "When did it end?"),
        ],
        EngineOptions::default(),
    )
    .await;

    let assembly = h.engine.assemble("doc-1", "spec-nested").await.unwrap();

    assert_eq!(
        output_json(&h, &assembly).await,
        json!({
            "meeting": { "title": "Planning", "room": "4B" },
            "attendees": ["Ada", "Grace"],
            "window": [null, "17:00"]
        })
    );
}

#[tokio::test]
async fn properties_pointer_fills_the_root() {
    let spec = AssemblySpecification::new("spec-meeting", "Meeting minutes", meeting_schema())
        .with_query(ptr("/properties"), "q-all");
    let executor = StaticQueryExecutor::new()
        .with_response("q-all", json!({ "title": "Test Meeting", "summary": "..." }));
    let h = harness(
        executor,
        spec,
        vec![query("q-all", "Extract everything")],
        EngineOptions::default(),
    )
    .await;

    let assembly = h.engine.assemble("doc-1", "spec-meeting").await.unwrap();
    assert_eq!(
        output_json(&h, &assembly).await,
        json!({ "title": "Test Meeting", "summary": "..." })
    );

    let requests = h.executor.requests().await;
    let sent = requests[0].response_schema.as_ref().unwrap();
    assert_eq!(sent["properties"], meeting_schema()["properties"]);
}

#[tokio::test]
async fn concurrency_is_bounded() {
    let mut properties = serde_json::Map::new();
    let mut spec_queries = Vec::new();
    let mut executor = StaticQueryExecutor::new().with_delay(Duration::from_millis(20));
    for i in 0..6 {
        let field = format!("field{i}");
        properties.insert(field.clone(), json!({ "type": "integer" }));
        let mut answer = serde_json::Map::new();
        answer.insert(field.clone(), json!(i));
        executor = executor.with_response(format!("q{i}"), Value::Object(answer));
        spec_queries.push((ptr(&format!("/properties/{field}")), format!("q{i}")));
    }
    let mut spec = AssemblySpecification::new(
        "spec-wide",
        "Wide",
        json!({ "type": "object", "properties": properties }),
    );
    for (pointer, query_id) in spec_queries {
        spec = spec.with_query(pointer, query_id);
    }
    let queries = (0..6).map(|i| query(&format!("q{i}"), "Count")).collect();
    let options = EngineOptions {
        max_concurrency: 2,
        ..EngineOptions::default()
    };
    let h = harness(executor, spec, queries, options).await;

    let assembly = h.engine.assemble("doc-1", "spec-wide").await.unwrap();

    assert_eq!(h.executor.call_count(), 6);
    assert!(h.executor.peak_in_flight() <= 2);
    let output = output_json(&h, &assembly).await;
    for i in 0..6 {
        assert_eq!(output[format!("field{i}")], json!(i));
    }
}

#[tokio::test(start_paused = true)]
async fn slow_knowledge_service_times_out() {
    let executor = StaticQueryExecutor::new()
        .with_response("q1", json!({ "title": "Test Meeting" }))
        .with_response("q2", json!({ "summary": "..." }))
        .with_delay(Duration::from_secs(30));
    let options = EngineOptions {
        query_timeout: Some(Duration::from_secs(5)),
        ..EngineOptions::default()
    };
    let h = harness(
        executor,
        meeting_spec(),
        vec![query("q1", "Extract the title"), query("q2", "Summarise")],
        options,
    )
    .await;

    let err = h.engine.assemble("doc-1", "spec-meeting").await.unwrap_err();

    assert!(matches!(
        err,
        AssemblyError::QueryExecution {
            source: QueryExecutionError::Timeout { timeout_secs: 5 },
            ..
        }
    ));
    assert_eq!(stored_status(&h).await, AssemblyStatus::Failed);
}

#[tokio::test]
async fn publishes_progress_events() {
    let executor = StaticQueryExecutor::new()
        .with_response("q1", json!({ "title": "Test Meeting" }))
        .with_response("q2", json!({ "summary": "..." }));
    let h = harness(
        executor,
        meeting_spec(),
        vec![query("q1", "Extract the title"), query("q2", "Summarise")],
        EngineOptions::default(),
    )
    .await;
    let bus = Arc::new(EventBus::default());
    let mut events = bus.subscribe();
    let engine = h.engine.with_event_bus(bus);

    let assembly = engine.assemble("doc-1", "spec-meeting").await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(seen.len(), 4);
    assert!(matches!(
        seen[0].as_ref(),
        DomainEvent::AssemblyStarted { pointer_count: 2, .. }
    ));
    let filled = seen
        .iter()
        .filter(|e| matches!(e.as_ref(), DomainEvent::PointerAssembled { .. }))
        .count();
    assert_eq!(filled, 2);
    match seen[3].as_ref() {
        DomainEvent::AssemblyCompleted {
            assembly_id,
            assembled_document_id,
            ..
        } => {
            assert_eq!(assembly_id, &assembly.assembly_id);
            assert_eq!(Some(assembled_document_id), assembly.assembled_document_id.as_ref());
        }
        other => panic!("expected AssemblyCompleted, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_run_publishes_failure_event() {
    let h = harness(
        StaticQueryExecutor::new().with_response("q1", json!({ "title": 7 })),
        AssemblySpecification::new("spec-meeting", "Meeting minutes", meeting_schema())
            .with_query(ptr("/properties/title"), "q1"),
        vec![query("q1", "Extract the title")],
        EngineOptions::default(),
    )
    .await;
    let bus = Arc::new(EventBus::default());
    let mut events = bus.subscribe();
    let engine = h.engine.with_event_bus(bus);

    engine.assemble("doc-1", "spec-meeting").await.unwrap_err();

    let mut last = None;
    while let Ok(event) = events.try_recv() {
        last = Some(event);
    }
    match last.as_deref() {
        Some(DomainEvent::AssemblyFailed { error_message, .. }) => {
            assert!(error_message.contains("schema validation"));
        }
        other => panic!("expected AssemblyFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn workflow_id_is_recorded() {
    let executor = StaticQueryExecutor::new()
        .with_response("q1", json!({ "title": "Test Meeting" }))
        .with_response("q2", json!({ "summary": "..." }));
    let h = harness(
        executor,
        meeting_spec(),
        vec![query("q1", "Extract the title"), query("q2", "Summarise")],
        EngineOptions::default(),
    )
    .await;

    let assembly = h
        .engine
        .assemble_in_workflow("doc-1", "spec-meeting", Some("wf-42"))
        .await
        .unwrap();
    assert_eq!(assembly.workflow_id, "wf-42");
}

#[tokio::test]
async fn cancel_moves_pending_assembly_to_cancelled() {
    let h = harness(
        StaticQueryExecutor::new(),
        meeting_spec(),
        vec![],
        EngineOptions::default(),
    )
    .await;
    let pending = Assembly::new("spec-meeting", "doc-1", "wf-1");
    h.assemblies.save(pending.clone()).await.unwrap();

    let cancelled = h.engine.cancel(&pending.assembly_id).await.unwrap();
    assert_eq!(cancelled.status, AssemblyStatus::Cancelled);
    assert_eq!(stored_status(&h).await, AssemblyStatus::Cancelled);

    assert!(matches!(
        h.engine.cancel(&pending.assembly_id).await,
        Err(AssemblyError::InvalidTransition { .. })
    ));
    assert!(matches!(
        h.engine.cancel("no-such-assembly").await,
        Err(AssemblyError::AssemblyNotFound(_))
    ));
}

#[tokio::test]
async fn completed_assembly_cannot_be_cancelled() {
    let executor = StaticQueryExecutor::new()
        .with_response("q1", json!({ "title": "Test Meeting" }))
        .with_response("q2", json!({ "summary": "..." }));
    let h = harness(
        executor,
        meeting_spec(),
        vec![query("q1", "Extract the title"), query("q2", "Summarise")],
        EngineOptions::default(),
    )
    .await;

    let assembly = h.engine.assemble("doc-1", "spec-meeting").await.unwrap();
    assert!(matches!(
        h.engine.cancel(&assembly.assembly_id).await,
        Err(AssemblyError::InvalidTransition { .. })
    ));
    assert_eq!(stored_status(&h).await, AssemblyStatus::Completed);
}

#[tokio::test]
async fn recursive_definitions_are_flattened_for_the_executor() {
    let schema = json!({
        "type": "object",
        "$defs": {
            "Node": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "children": { "type": "array", "items": { "$ref": "#/$defs/Node" } }
                }
            }
        },
        "properties": {
            "tree": { "$ref": "#/$defs/Node" }
        }
    });
    let spec = AssemblySpecification::new("spec-tree", "Tree", schema)
        .with_query(ptr("/properties/tree"), "q-tree");
    let executor = StaticQueryExecutor::new()
        .with_response("q-tree", json!({ "tree": { "name": "root", "children": [] } }));
    let h = harness(
        executor,
        spec,
        vec![query("q-tree", "Describe the tree")],
        EngineOptions::default(),
    )
    .await;

    let assembly = h.engine.assemble("doc-1", "spec-tree").await.unwrap();
    assert_eq!(
        output_json(&h, &assembly).await,
        json!({ "tree": { "name": "root", "children": [] } })
    );

    let requests = h.executor.requests().await;
    let sent = requests[0].response_schema.as_ref().unwrap();
    let graph = schemaloom_schema::RefGraph::build(sent);
    assert!(graph.cycles().is_empty(), "no recursive definitions reach the executor");
}

fn assert_send<T: Send>(_: T) {}

#[tokio::test]
async fn assembly_runs_on_a_spawned_task() {
    let executor = StaticQueryExecutor::new()
        .with_response("q1", json!({ "title": "Test Meeting" }))
        .with_response("q2", json!({ "summary": "..." }));
    let h = harness(
        executor,
        meeting_spec(),
        vec![query("q1", "Extract the title"), query("q2", "Summarise")],
        EngineOptions::default(),
    )
    .await;
    assert_send(h.engine.assemble("doc-1", "spec-meeting"));

    let assemblies = h.assemblies.clone();
    let engine = Arc::new(h.engine);
    let task = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.assemble("doc-1", "spec-meeting").await }
    });

    let assembly = task.await.unwrap().unwrap();
    assert_eq!(assembly.status, AssemblyStatus::Completed);
    assert_eq!(assemblies.list().await[0].status, AssemblyStatus::Completed);
}

async fn cancel_after(h: &Harness, delay: Duration) -> Assembly {
    tokio::time::sleep(delay).await;
    let running = h.assemblies.list().await;
    assert_eq!(running[0].status, AssemblyStatus::InProgress);
    h.engine.cancel(&running[0].assembly_id).await.unwrap()
}

#[tokio::test(start_paused = true)]
async fn cancelling_a_running_assembly_discards_its_output() {
    let executor = StaticQueryExecutor::new()
        .with_response("q1", json!({ "title": "Test Meeting" }))
        .with_response("q2", json!({ "summary": "..." }))
        .with_delay(Duration::from_secs(10));
    let h = harness(
        executor,
        meeting_spec(),
        vec![query("q1", "Extract the title"), query("q2", "Summarise")],
        EngineOptions::default(),
    )
    .await;
    let documents_before = h.documents.len().await;

    let (result, cancelled) = tokio::join!(
        h.engine.assemble("doc-1", "spec-meeting"),
        cancel_after(&h, Duration::from_secs(1)),
    );

    let assembly = result.unwrap();
    assert_eq!(assembly.status, AssemblyStatus::Cancelled);
    assert_eq!(assembly.assembly_id, cancelled.assembly_id);
    assert!(assembly.assembled_document_id.is_none());
    assert_eq!(stored_status(&h).await, AssemblyStatus::Cancelled);
    assert_eq!(h.documents.len().await, documents_before);
}

#[tokio::test(start_paused = true)]
async fn failure_after_cancellation_keeps_cancelled_status() {
    let executor = StaticQueryExecutor::new()
        .with_response("q1", json!({ "title": "Test Meeting" }))
        .with_failure("q2", "service unavailable")
        .with_delay(Duration::from_secs(10));
    let h = harness(
        executor,
        meeting_spec(),
        vec![query("q1", "Extract the title"), query("q2", "Summarise")],
        EngineOptions::default(),
    )
    .await;
    let documents_before = h.documents.len().await;

    let (result, _) = tokio::join!(
        h.engine.assemble("doc-1", "spec-meeting"),
        cancel_after(&h, Duration::from_secs(1)),
    );

    assert!(matches!(
        result,
        Err(AssemblyError::QueryExecution { ref pointer, .. }) if pointer == "/properties/summary"
    ));
    assert_eq!(stored_status(&h).await, AssemblyStatus::Cancelled);
    assert_eq!(h.documents.len().await, documents_before);
}
