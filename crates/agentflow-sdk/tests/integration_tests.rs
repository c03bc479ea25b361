//! Integration tests for `agentflow-sdk`'s `Runtime` facade, built against
//! the in-memory doubles from `agentflow-testing` rather than a real model
//! vendor (spec.md §8 end-to-end seed scenarios, adapted here to what can
//! run without network access).

use std::sync::Arc;

use agentflow_sdk::{Runtime, RuntimeConfig};
use agentflow_testing::{
    sample_turn_request, InMemoryCredentialRepository, InMemoryMessagePartRepository,
    InMemoryMessageRepository, InMemorySessionRepository, StubToolRegistry,
};

fn build_runtime() -> Runtime {
    Runtime::builder(RuntimeConfig::default())
        .tools(Arc::new(StubToolRegistry::new(["read", "grep"])))
        .sessions(Arc::new(InMemorySessionRepository::new()))
        .messages(Arc::new(InMemoryMessageRepository::new()))
        .parts(Arc::new(InMemoryMessagePartRepository::new()))
        .credential_repository(Arc::new(InMemoryCredentialRepository::new()))
        .build()
        .unwrap()
}

#[test]
fn runtime_exposes_the_built_in_agents() {
    let runtime = build_runtime();
    let names: Vec<String> = runtime.agents().list().into_iter().map(|a| a.name).collect();
    assert!(names.contains(&"general".to_string()));
    assert!(names.contains(&"explore".to_string()));
}

#[test]
fn runtime_starts_with_no_background_sub_agents() {
    let runtime = build_runtime();
    assert!(runtime.background().list().is_empty());
}

#[tokio::test]
async fn run_against_a_session_owned_by_a_different_project_still_fails_cleanly() {
    let runtime = build_runtime();
    // No session has been created, so `run` must surface a clean
    // `SessionNotFound` rather than panicking.
    let request = sample_turn_request(uuid::Uuid::new_v4(), uuid::Uuid::new_v4(), "user-1", "hello");
    let result = runtime.run(request).await;
    assert!(result.is_err());
}

#[test]
fn builder_requires_every_external_interface() {
    let result = Runtime::builder(RuntimeConfig::default())
        .tools(Arc::new(StubToolRegistry::new(["read"])))
        .build();
    assert!(result.is_err());
}
