//! End-to-end runs of the execute facade over a scripted provider and
//! stubbed tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use kubepilot::agent::{Agent, AgentConfig, EMPTY_OBSERVATION_ANSWER};
use kubepilot::errors::AgentResult;
use kubepilot::facade;
use kubepilot::models::message::Role;
use kubepilot::prompts::EXECUTE_SYSTEM_PROMPT;
use kubepilot::providers::mock::MockProvider;
use kubepilot::tools::{ExecContext, Tool, ToolRegistry};

struct StubTool {
    name: &'static str,
    output: String,
}

#[async_trait]
impl Tool for StubTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "stub tool"
    }

    async fn call(&self, _input: &str, _ctx: &ExecContext) -> AgentResult<String> {
        Ok(self.output.clone())
    }
}

fn agent_with(responses: Vec<String>, tools: Vec<StubTool>) -> Agent {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(Box::new(tool));
    }
    Agent::new(
        Box::new(MockProvider::new(responses)),
        Arc::new(registry),
        AgentConfig::new("gpt-4"),
    )
}

fn tool_call(name: &str, input: &str) -> String {
    json!({
        "question": "scenario question",
        "thought": "pick a tool",
        "action": {"name": name, "input": input},
        "observation": "",
        "final_answer": ""
    })
    .to_string()
}

fn final_answer(text: &str) -> String {
    json!({"question": "scenario question", "thought": "done", "final_answer": text}).to_string()
}

#[tokio::test]
async fn kubectl_count_flow() {
    let agent = agent_with(
        vec![
            tool_call("kubectl", "get namespaces --no-headers | wc -l"),
            final_answer("There are 5 namespaces."),
        ],
        vec![StubTool {
            name: "kubectl",
            output: "5".to_string(),
        }],
    );

    let outcome = facade::execute(&agent, "how many namespaces?", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.answer, "There are 5 namespaces.");
    // The completed history leads with the facade's system prompt verbatim.
    assert_eq!(outcome.history[0].role, Role::System);
    assert_eq!(outcome.history[0].content, EXECUTE_SYSTEM_PROMPT);
}

#[tokio::test]
async fn image_scan_flow() {
    let report = "nginx:latest (debian 12.4)\nTotal: 2 (HIGH: 1, CRITICAL: 1)\nCVE-2024-0001";
    let agent = agent_with(
        vec![
            tool_call("trivy", "nginx:latest"),
            final_answer("HIGH: CVE-2024-0001 affects nginx:latest."),
        ],
        vec![StubTool {
            name: "trivy",
            output: report.to_string(),
        }],
    );

    let outcome = facade::execute(&agent, "scan nginx:latest", CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.answer, "HIGH: CVE-2024-0001 affects nginx:latest.");
}

#[tokio::test]
async fn unknown_tool_flow() {
    let agent = agent_with(
        vec![
            tool_call("sqlquery", "select count(*) from pods"),
            final_answer("Cannot complete this without a supported tool."),
        ],
        vec![],
    );

    let outcome = facade::execute(&agent, "summarize cluster", CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.answer, "Cannot complete this without a supported tool.");

    let observation = outcome
        .history
        .iter()
        .find(|m| m.role == Role::User && m.content.contains("sqlquery"))
        .expect("unavailable-tool observation");
    assert!(observation.content.contains("is not available"));
}

#[tokio::test]
async fn empty_tool_output_flow() {
    let fenced_envelope = format!("```json\n{}\n```", tool_call("kubectl", "get pods -n x"));
    let agent = agent_with(
        vec![fenced_envelope],
        vec![StubTool {
            name: "kubectl",
            output: String::new(),
        }],
    );

    let outcome = facade::execute(&agent, "list pods in ns x", CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.answer, EMPTY_OBSERVATION_ANSWER);
}

#[tokio::test]
async fn free_form_reply_flow() {
    let agent = agent_with(
        vec![
            "I think everything looks good, no JSON needed here.".to_string(),
            final_answer("The cluster is healthy; nothing needs attention."),
        ],
        vec![],
    );

    let outcome = facade::execute(&agent, "anything", CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.answer, "The cluster is healthy; nothing needs attention.");
}

#[tokio::test]
async fn loop_bomb_flow() {
    let responses: Vec<String> = (0..12).map(|_| tool_call("kubectl", "get pods")).collect();
    let agent = agent_with(
        responses,
        vec![StubTool {
            name: "kubectl",
            output: "pod-a Running".to_string(),
        }],
    );

    let outcome = facade::execute(&agent, "loop bomb", CancellationToken::new())
        .await
        .unwrap();
    assert!(outcome.truncated);
    assert!(outcome.answer.is_empty());
}
