mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{FailingAgent, MockAgent};
use ensemble::{
    Agent, Backend, EnsembleError, Event, EventSender, Pipeline, PipelineConfig, Strategy,
};
use tokio::sync::mpsc;

fn config(strategy: Strategy, agents: &[&str], supervisor: Option<&str>) -> PipelineConfig {
    PipelineConfig {
        name: "test-pipeline".to_string(),
        agents: agents.iter().map(|s| s.to_string()).collect(),
        strategy,
        max_rounds: 10,
        supervisor_agent: supervisor.map(str::to_string),
    }
}

fn agent_map(agents: &[&Arc<MockAgent>]) -> HashMap<String, Arc<dyn Agent>> {
    agents
        .iter()
        .map(|a| (a.name().to_string(), Arc::clone(a) as Arc<dyn Agent>))
        .collect()
}

#[tokio::test]
async fn sequential_chains_outputs_in_order() {
    let a = Arc::new(MockAgent::new("agent-a", vec!["output-from-a"]));
    let b = Arc::new(MockAgent::new("agent-b", vec!["final-output"]));

    let pipeline = Pipeline::new(
        config(Strategy::Sequential, &["agent-a", "agent-b"], None),
        agent_map(&[&a, &b]),
    )
    .unwrap();

    let result = pipeline.run("start").await.unwrap();
    assert_eq!(result, "final-output");
    assert_eq!(a.received(), vec!["start"]);
    assert_eq!(b.received(), vec!["output-from-a"]);
}

#[tokio::test]
async fn sequential_single_agent_returns_its_reply() {
    let solo = Arc::new(MockAgent::new("solo", vec!["only-answer"]));

    let pipeline = Pipeline::new(
        config(Strategy::Sequential, &["solo"], None),
        agent_map(&[&solo]),
    )
    .unwrap();

    let result = pipeline.run("the task").await.unwrap();
    assert_eq!(result, "only-answer");
    assert_eq!(solo.received(), vec!["the task"]);
}

#[tokio::test]
async fn sequential_agent_failure_names_the_agent() {
    let ok = Arc::new(MockAgent::new("first", vec!["fine"]));
    let broken: Arc<dyn Agent> = Arc::new(FailingAgent::new("second"));

    let mut agents = agent_map(&[&ok]);
    agents.insert("second".to_string(), broken);

    let pipeline = Pipeline::new(
        config(Strategy::Sequential, &["first", "second"], None),
        agents,
    )
    .unwrap();

    let err = pipeline.run("go").await.unwrap_err();
    match err {
        EnsembleError::Agent {
            agent_name,
            message,
        } => {
            assert_eq!(agent_name, "second");
            assert!(message.contains("simulated backend outage"));
        }
        other => panic!("expected agent error, got {other:?}"),
    }
}

#[tokio::test]
async fn supervisor_routes_to_named_specialist() {
    let supervisor = Arc::new(MockAgent::new("supervisor", vec!["specialist-b"]));
    let spec_a = Arc::new(MockAgent::new("specialist-a", vec!["a-answer"]));
    let spec_b = Arc::new(MockAgent::new("specialist-b", vec!["b-answer"]));

    let pipeline = Pipeline::new(
        config(
            Strategy::Supervisor,
            &["supervisor", "specialist-a", "specialist-b"],
            Some("supervisor"),
        ),
        agent_map(&[&supervisor, &spec_a, &spec_b]),
    )
    .unwrap();

    let result = pipeline.run("handle this").await.unwrap();
    assert_eq!(result, "b-answer");

    // The supervisor sees the routing prompt, never the raw task.
    let supervisor_messages = supervisor.received();
    let routing = &supervisor_messages[0];
    assert!(routing.contains("specialist-a"));
    assert!(routing.contains("specialist-b"));
    assert!(routing.contains("Task: handle this"));

    // The chosen specialist gets the original task; the other is never called.
    assert_eq!(spec_b.received(), vec!["handle this"]);
    assert_eq!(spec_a.call_count(), 0);
}

#[tokio::test]
async fn supervisor_reply_is_trimmed_before_matching() {
    let supervisor = Arc::new(MockAgent::new("supervisor", vec!["  specialist-a\n"]));
    let spec_a = Arc::new(MockAgent::new("specialist-a", vec!["trimmed-match"]));
    let spec_b = Arc::new(MockAgent::new("specialist-b", vec!["wrong"]));

    let pipeline = Pipeline::new(
        config(
            Strategy::Supervisor,
            &["supervisor", "specialist-a", "specialist-b"],
            Some("supervisor"),
        ),
        agent_map(&[&supervisor, &spec_a, &spec_b]),
    )
    .unwrap();

    let result = pipeline.run("task").await.unwrap();
    assert_eq!(result, "trimmed-match");
    assert_eq!(spec_b.call_count(), 0);
}

#[tokio::test]
async fn supervisor_unknown_choice_falls_back_to_first_specialist() {
    let supervisor = Arc::new(MockAgent::new("supervisor", vec!["nonexistent-agent"]));
    let spec_a = Arc::new(MockAgent::new("specialist-a", vec!["fallback-answer"]));
    let spec_b = Arc::new(MockAgent::new("specialist-b", vec!["wrong"]));

    let (tx, mut rx) = mpsc::channel(64);
    let pipeline = Pipeline::new(
        config(
            Strategy::Supervisor,
            &["supervisor", "specialist-a", "specialist-b"],
            Some("supervisor"),
        ),
        agent_map(&[&supervisor, &spec_a, &spec_b]),
    )
    .unwrap()
    .with_events(EventSender::new(tx));

    let result = pipeline.run("task").await.unwrap();
    assert_eq!(result, "fallback-answer");
    assert_eq!(spec_a.received(), vec!["task"]);
    assert_eq!(spec_b.call_count(), 0);

    // The misroute must be surfaced, not silent.
    let mut saw_fallback = false;
    while let Ok(event) = rx.try_recv() {
        if let Event::SupervisorFallback { chosen, fallback } = event {
            assert_eq!(chosen, "nonexistent-agent");
            assert_eq!(fallback, "specialist-a");
            saw_fallback = true;
        }
    }
    assert!(saw_fallback, "expected a SupervisorFallback event");
}

#[tokio::test]
async fn group_without_native_backend_broadcasts_in_config_order() {
    let a = Arc::new(MockAgent::new("alpha", vec!["alpha says hi"]));
    let b = Arc::new(MockAgent::new("beta", vec!["beta says hi"]));

    let pipeline = Pipeline::new(
        config(Strategy::Group, &["alpha", "beta"], None),
        agent_map(&[&a, &b]),
    )
    .unwrap();

    let result = pipeline.run("introduce yourselves").await.unwrap();
    assert_eq!(result, "[alpha]: alpha says hi\n\n[beta]: beta says hi");

    // Broadcast sends the original task to everyone, unchanged.
    assert_eq!(a.received(), vec!["introduce yourselves"]);
    assert_eq!(b.received(), vec!["introduce yourselves"]);
}

#[tokio::test]
async fn group_with_native_backend_excludes_other_agents() {
    let host =
        Arc::new(MockAgent::new("host", vec!["solved TERMINATE"]).with_backend(Backend::OpenAi));
    let bystander = Arc::new(MockAgent::new("bystander", vec!["should not run"]));

    let pipeline = Pipeline::new(
        config(Strategy::Group, &["host", "bystander"], None),
        agent_map(&[&host, &bystander]),
    )
    .unwrap();

    let result = pipeline.run("group task").await.unwrap();

    // Native group chat, not the broadcast concatenation.
    assert_eq!(result, "solved");
    assert!(!result.contains("[host]:"));
    assert_eq!(bystander.call_count(), 0);

    // The host sees the shared kickoff with the task embedded.
    let seen = host.received();
    assert!(seen[0].contains("Task: group task"));
    assert!(seen[0].contains("TERMINATE"));
}

#[tokio::test]
async fn group_chat_terminate_ends_early_with_cleaned_reply() {
    let drafter =
        Arc::new(MockAgent::new("drafter", vec!["first draft"]).with_backend(Backend::OpenAi));
    let closer = Arc::new(
        MockAgent::new("closer", vec!["final answer TERMINATE"]).with_backend(Backend::OpenAi),
    );

    let pipeline = Pipeline::new(
        config(Strategy::Group, &["drafter", "closer"], None),
        agent_map(&[&drafter, &closer]),
    )
    .unwrap();

    let result = pipeline.run("write it").await.unwrap();
    assert_eq!(result, "final answer");

    // Ended in the first round, no further turns.
    assert_eq!(drafter.call_count(), 1);
    assert_eq!(closer.call_count(), 1);

    // The second participant sees the first one's contribution.
    let seen = closer.received();
    assert!(seen[0].contains("[drafter]: first draft"));
}

#[tokio::test]
async fn group_chat_round_limit_returns_last_reply() {
    let a = Arc::new(MockAgent::new("a", vec!["a-one", "a-two"]).with_backend(Backend::OpenAi));
    let b = Arc::new(MockAgent::new("b", vec!["b-one", "b-two"]).with_backend(Backend::OpenAi));

    let mut cfg = config(Strategy::Group, &["a", "b"], None);
    cfg.max_rounds = 2;
    let pipeline = Pipeline::new(cfg, agent_map(&[&a, &b])).unwrap();

    let result = pipeline.run("keep talking").await.unwrap();

    // No TERMINATE: the chat stops at the round cap with the last reply.
    assert_eq!(result, "b-two");
    assert_eq!(a.call_count(), 2);
    assert_eq!(b.call_count(), 2);
}

#[tokio::test]
async fn group_chat_single_agent_is_not_reprompted_on_silence() {
    let solo = Arc::new(MockAgent::new("solo", vec!["lone idea"]).with_backend(Backend::OpenAi));

    let mut cfg = config(Strategy::Group, &["solo"], None);
    cfg.max_rounds = 3;
    let pipeline = Pipeline::new(cfg, agent_map(&[&solo])).unwrap();

    let result = pipeline.run("task").await.unwrap();
    assert_eq!(result, "lone idea");

    // With nothing new in the transcript the agent gets no further turns.
    assert_eq!(solo.call_count(), 1);
}

#[tokio::test]
async fn group_broadcast_aborts_on_first_failure() {
    let ok = Arc::new(MockAgent::new("healthy", vec!["fine"]));
    let broken: Arc<dyn Agent> = Arc::new(FailingAgent::new("down"));

    let mut agents = agent_map(&[&ok]);
    agents.insert("down".to_string(), broken);

    let pipeline =
        Pipeline::new(config(Strategy::Group, &["healthy", "down"], None), agents).unwrap();

    let err = pipeline.run("task").await.unwrap_err();
    assert!(matches!(err, EnsembleError::Agent { .. }));
}

#[tokio::test]
async fn construction_rejects_unknown_agent_name() {
    let a = Arc::new(MockAgent::new("known", vec![]));

    let err = Pipeline::new(
        config(Strategy::Sequential, &["known", "missing"], None),
        agent_map(&[&a]),
    )
    .unwrap_err();

    match err {
        EnsembleError::Config(msg) => assert!(msg.contains("missing")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[tokio::test]
async fn construction_rejects_supervisor_without_supervisor_agent() {
    let a = Arc::new(MockAgent::new("a", vec![]));
    let b = Arc::new(MockAgent::new("b", vec![]));

    let err = Pipeline::new(
        config(Strategy::Supervisor, &["a", "b"], None),
        agent_map(&[&a, &b]),
    )
    .unwrap_err();
    assert!(matches!(err, EnsembleError::Config(_)));
}

#[tokio::test]
async fn routing_prompt_is_stable_and_excludes_supervisor() {
    let long_instructions = "x".repeat(150);
    let supervisor = Arc::new(MockAgent::new("supervisor", vec![]));
    let spec = Arc::new(MockAgent::new("worker", vec![]).with_instructions(&long_instructions));

    let pipeline = Pipeline::new(
        config(Strategy::Supervisor, &["supervisor", "worker"], Some("supervisor")),
        agent_map(&[&supervisor, &spec]),
    )
    .unwrap();

    let first = pipeline.routing_prompt("same task").unwrap();
    let second = pipeline.routing_prompt("same task").unwrap();
    assert_eq!(first, second);

    assert!(first.contains("- worker: "));
    assert!(!first.contains("- supervisor"));
    // Instructions are capped at 100 chars in the prompt.
    assert!(first.contains(&"x".repeat(100)));
    assert!(!first.contains(&"x".repeat(101)));
    assert!(first.ends_with("Reply with ONLY the name of the specialist that should handle this task."));
}

#[tokio::test]
async fn events_bracket_a_sequential_run() {
    let a = Arc::new(MockAgent::new("only", vec!["done"]));

    let (tx, mut rx) = mpsc::channel(64);
    let pipeline = Pipeline::new(
        config(Strategy::Sequential, &["only"], None),
        agent_map(&[&a]),
    )
    .unwrap()
    .with_events(EventSender::new(tx));

    pipeline.run("task").await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        kinds.push(match event {
            Event::PipelineStarted { .. } => "started",
            Event::SequentialStep { .. } => "step",
            Event::AgentStarted { .. } => "agent-started",
            Event::AgentCompleted { .. } => "agent-completed",
            Event::PipelineCompleted { .. } => "completed",
            _ => "other",
        });
    }
    assert_eq!(
        kinds,
        vec!["started", "step", "agent-started", "agent-completed", "completed"]
    );
}
