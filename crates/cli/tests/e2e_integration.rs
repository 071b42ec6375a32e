//! End-to-end integration tests for the agentbox coding agent.
//!
//! These tests exercise the full pipeline from user prompt to answer:
//! a scripted model drives the real dispatcher and primitives over a
//! temporary working directory, and the conversation is persisted through
//! the real stores.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use agentbox_agent::{AgentLoop, StopReason};
use agentbox_core::error::ProviderError;
use agentbox_core::event::{DomainEvent, EventBus};
use agentbox_core::message::{Message, MessageToolCall, Role};
use agentbox_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use agentbox_core::store::ConversationStore;
use agentbox_core::tool::WorkingRoot;
use agentbox_memory::{InMemoryStore, JsonFileStore};
use agentbox_tools::{ScriptSettings, ToolDispatcher, ToolSettings};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted results in sequence.
struct ScriptedProvider {
    results: std::sync::Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: std::sync::Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    fn with_results(results: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            results: std::sync::Mutex::new(results),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> ProviderRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let results = self.results.lock().unwrap();
        let index = requests.len();
        if index >= results.len() {
            panic!("ScriptedProvider exhausted: call #{index}, have {}", results.len());
        }
        requests.push(request);
        results[index].clone()
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: usage(),
        model: "mock".into(),
    }
}

fn tool_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tool_calls(None, tool_calls),
        usage: usage(),
        model: "mock".into(),
    }
}

fn call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

// ── Fixture ──────────────────────────────────────────────────────────────

/// A calculator project inside a temp dir, plus a sibling secret outside it.
struct Project {
    outer: tempfile::TempDir,
    events: Arc<EventBus>,
    dispatcher: Arc<ToolDispatcher>,
}

impl Project {
    fn new() -> Self {
        Self::with_settings(ToolSettings::default())
    }

    fn with_settings(settings: ToolSettings) -> Self {
        let outer = tempfile::tempdir().unwrap();
        let root_dir = outer.path().join("calculator");
        fs::create_dir_all(root_dir.join("pkg")).unwrap();
        fs::write(root_dir.join("main.py"), "print(3 + 5)\n").unwrap();
        fs::write(root_dir.join("pkg").join("calculator.py"), "def add(a, b):\n    return a + b\n").unwrap();
        fs::write(outer.path().join("secret.txt"), "top secret").unwrap();

        let root = WorkingRoot::new(&root_dir).unwrap();
        let events = Arc::new(EventBus::new(256));
        let dispatcher = Arc::new(ToolDispatcher::new(root, &settings, events.clone()));
        Self {
            outer,
            events,
            dispatcher,
        }
    }

    fn root(&self) -> std::path::PathBuf {
        self.outer.path().join("calculator")
    }

    fn agent(&self, provider: Arc<ScriptedProvider>) -> AgentLoop {
        AgentLoop::new(provider, "mock", 0.2, self.dispatcher.clone(), self.events.clone())
    }
}

fn tool_messages(messages: &[Message]) -> Vec<&Message> {
    messages.iter().filter(|m| m.role == Role::Tool).collect()
}

// ── E2E: explore, edit, run ──────────────────────────────────────────────

#[tokio::test]
async fn e2e_list_read_write_then_answer() {
    let project = Project::new();
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(vec![call("c1", "get_files_info", serde_json::json!({}))]),
        tool_response(vec![call(
            "c2",
            "get_file_content",
            serde_json::json!({"file_path": "pkg/calculator.py"}),
        )]),
        tool_response(vec![
            call(
                "c3",
                "write_file",
                serde_json::json!({"file_path": "pkg/notes/README.md", "content": "adds numbers"}),
            ),
            call("c4", "get_files_info", serde_json::json!({"directory": "pkg"})),
        ]),
        text_response("The calculator adds two numbers; I documented it."),
    ]));
    let store = InMemoryStore::new();

    let outcome = project.agent(provider.clone()).run(&store, "explain the calculator").await.unwrap();

    assert_eq!(provider.calls(), 4);
    assert_eq!(outcome.stop_reason, StopReason::FinalAnswer);
    assert_eq!(outcome.tool_calls, 4);
    assert_eq!(
        fs::read_to_string(project.root().join("pkg/notes/README.md")).unwrap(),
        "adds numbers"
    );

    let saved = store.load().await.unwrap();
    let tools = tool_messages(&saved);
    assert_eq!(tools.len(), 4);
    let listing: Vec<&str> = tools[0].text().lines().collect();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0], "- main.py: file_size=13 bytes, is_dir=false");
    assert!(listing[1].starts_with("- pkg: file_size="));
    assert!(listing[1].ends_with("is_dir=true"));
    assert_eq!(tools[1].text(), "def add(a, b):\n    return a + b\n");
    assert_eq!(
        tools[2].text(),
        "Successfully wrote to \"pkg/notes/README.md\" (12 characters written)"
    );
    assert!(tools[3].text().contains("- calculator.py:"));
    assert!(tools[3].text().contains("- notes:"));
}

#[tokio::test]
async fn e2e_sandbox_escapes_reported_to_model() {
    let project = Project::new();
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(vec![
            call("c1", "get_file_content", serde_json::json!({"file_path": "../secret.txt"})),
            call(
                "c2",
                "write_file",
                serde_json::json!({"file_path": "../pwned.txt", "content": "x"}),
            ),
            call("c3", "get_files_info", serde_json::json!({"directory": "/"})),
            call("c4", "run_python", serde_json::json!({"file_path": "../../run.py"})),
        ]),
        text_response("I am not allowed to leave the project."),
    ]));
    let store = InMemoryStore::new();

    let outcome = project.agent(provider).run(&store, "read the secret").await.unwrap();

    assert_eq!(outcome.text.as_deref(), Some("I am not allowed to leave the project."));
    assert!(!project.outer.path().join("pwned.txt").exists());

    let saved = store.load().await.unwrap();
    for message in tool_messages(&saved) {
        assert!(
            message.text().starts_with("Error: Cannot ")
                && message.text().ends_with("outside the permitted working directory"),
            "unexpected tool result: {}",
            message.text()
        );
        assert!(!message.text().contains("top secret"));
    }
}

#[tokio::test]
async fn e2e_run_script_with_shell_interpreter() {
    let project = Project::with_settings(ToolSettings {
        script: ScriptSettings {
            interpreter: "sh".into(),
            extension: "sh".into(),
            timeout: Duration::from_secs(10),
        },
        ..ToolSettings::default()
    });
    fs::write(project.root().join("greet.sh"), "echo \"hello $1\"\n").unwrap();

    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(vec![call(
            "c1",
            "run_python",
            serde_json::json!({"file_path": "greet.sh", "args": ["world"]}),
        )]),
        text_response("It printed hello world."),
    ]));
    let store = InMemoryStore::new();

    project.agent(provider.clone()).run(&store, "run greet").await.unwrap();

    let saved = store.load().await.unwrap();
    let tools = tool_messages(&saved);
    assert_eq!(tools[0].text(), "STDOUT: hello world\n\nSTDERR: \n");

    // The model saw the script output in its second request
    let request = provider.last_request();
    assert_eq!(request.messages.last().unwrap().role, Role::Tool);
}

#[tokio::test]
async fn e2e_truncated_read() {
    let project = Project::with_settings(ToolSettings {
        max_chars: 5,
        ..ToolSettings::default()
    });
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(vec![call("c1", "get_file_content", serde_json::json!({"file_path": "main.py"}))]),
        text_response("done"),
    ]));
    let store = InMemoryStore::new();

    project.agent(provider).run(&store, "read main").await.unwrap();

    let saved = store.load().await.unwrap();
    assert_eq!(
        tool_messages(&saved)[0].text(),
        "print[...File \"main.py\" truncated at 5 characters]"
    );
}

// ── E2E: events ──────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_events_describe_the_run() {
    let project = Project::new();
    let mut rx = project.events.subscribe();
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(vec![
            call("c1", "get_files_info", serde_json::json!({})),
            call("c2", "no_such_tool", serde_json::json!({})),
        ]),
        text_response("ok"),
    ]));

    project
        .agent(provider)
        .run(&InMemoryStore::new(), "look")
        .await
        .unwrap();

    let mut started = Vec::new();
    let mut responses = 0;
    while let Ok(event) = rx.try_recv() {
        match event.as_ref() {
            DomainEvent::ToolStarted { tool_name, .. } => started.push(tool_name.clone()),
            DomainEvent::ResponseGenerated { .. } => responses += 1,
            _ => {}
        }
    }
    // Unknown tools never start
    assert_eq!(started, vec!["get_files_info".to_string()]);
    assert_eq!(responses, 2);
}

// ── E2E: persistence ─────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_history_survives_between_runs() {
    let project = Project::new();
    let history_dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(history_dir.path().join("nested").join("conversation.json"));

    let first = Arc::new(ScriptedProvider::new(vec![text_response("main.py prints 8")]));
    project.agent(first).run(&store, "what does main.py print?").await.unwrap();
    assert!(store.path().exists());

    // A fresh store over the same file picks the conversation back up
    let reopened = JsonFileStore::new(store.path());
    let second = Arc::new(ScriptedProvider::new(vec![text_response("You asked about main.py")]));
    project
        .agent(second.clone())
        .run(&reopened, "what did I ask?")
        .await
        .unwrap();

    let request = second.last_request();
    let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::User]
    );
    assert_eq!(request.messages[1].text(), "what does main.py print?");

    assert!(reopened.clear().await.unwrap());
    assert!(!reopened.clear().await.unwrap());
}

#[tokio::test]
async fn e2e_provider_failure_still_saves() {
    let project = Project::new();
    let history_dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(history_dir.path().join("conversation.json"));
    let provider = Arc::new(ScriptedProvider::with_results(vec![
        Ok(tool_response(vec![call("c1", "get_files_info", serde_json::json!({}))])),
        Err(ProviderError::ApiError {
            status_code: 500,
            message: "upstream exploded".into(),
        }),
    ]));

    let err = project.agent(provider).run(&store, "list").await.unwrap_err();

    assert!(err.to_string().contains("upstream exploded"));
    let saved = store.load().await.unwrap();
    let roles: Vec<Role> = saved.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::Tool]);
}

#[tokio::test]
async fn e2e_corrupt_history_starts_fresh() {
    let project = Project::new();
    let history_dir = tempfile::tempdir().unwrap();
    let path = history_dir.path().join("conversation.json");
    fs::write(&path, "{ this is not json").unwrap();
    let store = JsonFileStore::new(&path);

    let provider = Arc::new(ScriptedProvider::new(vec![text_response("fresh start")]));
    let outcome = project.agent(provider).run(&store, "hello").await.unwrap();

    assert_eq!(outcome.text.as_deref(), Some("fresh start"));
    assert_eq!(store.load().await.unwrap().len(), 3);
}

// ── E2E: iteration budget ────────────────────────────────────────────────

#[tokio::test]
async fn e2e_iteration_limit_is_not_a_failure() {
    let project = Project::new();
    let looping: Vec<ProviderResponse> = (0..3)
        .map(|i| {
            let mut response = tool_response(vec![call(
                &format!("c{i}"),
                "get_files_info",
                serde_json::json!({}),
            )]);
            response.message.content = Some(format!("step {i}"));
            response
        })
        .collect();
    let provider = Arc::new(ScriptedProvider::new(looping));

    let outcome = project
        .agent(provider.clone())
        .with_max_iterations(3)
        .run(&InMemoryStore::new(), "keep going")
        .await
        .unwrap();

    assert_eq!(provider.calls(), 3);
    assert_eq!(outcome.stop_reason, StopReason::IterationLimit);
    assert_eq!(outcome.text.as_deref(), Some("step 2"));
}
