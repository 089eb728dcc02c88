use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::backends::openai::run_group_chat;
use crate::config::{PipelineConfig, Strategy};
use crate::error::EnsembleError;
use crate::event::{preview, Event, EventSender};

/// Chars of the task shown in the pipeline-start event.
const TASK_PREVIEW_CHARS: usize = 80;
/// Chars of the running value shown in sequential step events.
const INPUT_PREVIEW_CHARS: usize = 60;
/// Chars of each specialist's instructions included in the routing prompt.
const ROUTING_INSTRUCTIONS_CHARS: usize = 100;

/// A configured composition of agents executed under one strategy.
///
/// Agents are built by the caller and handed in by name; the pipeline only
/// addresses them through the [`Agent`] trait. Each `run` call is independent:
/// no orchestrator state survives between runs, and the name→agent map is
/// read-only during a run.
pub struct Pipeline {
    config: PipelineConfig,
    agents: HashMap<String, Arc<dyn Agent>>,
    ordered: Vec<Arc<dyn Agent>>,
    events: EventSender,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Construct a pipeline, checking every invariant the executors rely on.
    ///
    /// Fails with [`EnsembleError::Config`] if the config is invalid or any
    /// name in `config.agents` (or `supervisor_agent`) is missing from the
    /// agent map. Resolution happens here so strategy executors never see an
    /// unknown name at run time.
    pub fn new(
        config: PipelineConfig,
        agents: HashMap<String, Arc<dyn Agent>>,
    ) -> Result<Self, EnsembleError> {
        config.validate()?;

        let mut ordered = Vec::with_capacity(config.agents.len());
        for name in &config.agents {
            let agent = agents.get(name).ok_or_else(|| {
                EnsembleError::Config(format!(
                    "pipeline '{}' references unknown agent '{}'",
                    config.name, name
                ))
            })?;
            ordered.push(Arc::clone(agent));
        }

        Ok(Self {
            config,
            agents,
            ordered,
            events: EventSender::noop(),
        })
    }

    /// Attach an event sender for observability. Events are best-effort and
    /// never affect the run.
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn strategy(&self) -> Strategy {
        self.config.strategy
    }

    /// Drive `task` to completion under the configured strategy and return the
    /// final text result.
    pub async fn run(&self, task: &str) -> Result<String, EnsembleError> {
        info!(
            pipeline = %self.config.name,
            strategy = %self.config.strategy,
            task_preview = %preview(task, TASK_PREVIEW_CHARS),
            "pipeline started"
        );
        self.events.emit(Event::PipelineStarted {
            pipeline: self.config.name.clone(),
            strategy: self.config.strategy.to_string(),
            task_preview: preview(task, TASK_PREVIEW_CHARS),
        });

        let result = match self.config.strategy {
            Strategy::Sequential => self.run_sequential(task).await,
            Strategy::Group => self.run_group(task).await,
            Strategy::Supervisor => self.run_supervisor(task).await,
        };

        if result.is_ok() {
            info!(pipeline = %self.config.name, "pipeline completed");
            self.events.emit(Event::PipelineCompleted {
                pipeline: self.config.name.clone(),
            });
        }
        result
    }

    /// Call one agent, bracketing it with events and mapping its failure into
    /// the library error type. No retries at this layer.
    async fn call_agent(
        &self,
        agent: &Arc<dyn Agent>,
        input: &str,
    ) -> Result<String, EnsembleError> {
        self.events.emit(Event::AgentStarted {
            agent_name: agent.name().to_string(),
        });
        let output =
            agent
                .run(input)
                .await
                .map_err(|e| EnsembleError::Agent {
                    agent_name: agent.name().to_string(),
                    message: format!("{e:#}"),
                })?;
        self.events.emit(Event::AgentCompleted {
            agent_name: agent.name().to_string(),
            output_preview: preview(&output, INPUT_PREVIEW_CHARS),
        });
        Ok(output)
    }

    /// Thread the task through each agent in order; the final reply is the
    /// pipeline result.
    async fn run_sequential(&self, task: &str) -> Result<String, EnsembleError> {
        let mut current = task.to_string();
        for agent in &self.ordered {
            debug!(
                agent = agent.name(),
                input_preview = %preview(&current, INPUT_PREVIEW_CHARS),
                "sequential step"
            );
            self.events.emit(Event::SequentialStep {
                agent_name: agent.name().to_string(),
                input_preview: preview(&current, INPUT_PREVIEW_CHARS),
            });
            current = self.call_agent(agent, &current).await?;
        }
        Ok(current)
    }

    /// Group collaboration.
    ///
    /// If any agent's backend offers native group chat, the whole task is
    /// handed to that mechanism with the qualifying subset. Otherwise every
    /// agent answers the original task in isolation and the replies are
    /// concatenated in `agents` order.
    async fn run_group(&self, task: &str) -> Result<String, EnsembleError> {
        let native: Vec<Arc<dyn Agent>> = self
            .ordered
            .iter()
            .filter(|a| a.backend().supports_group_chat())
            .cloned()
            .collect();

        if !native.is_empty() {
            debug!(participants = native.len(), "using native group chat");
            return run_group_chat(&native, task, self.config.max_rounds)
                .await
                .map_err(EnsembleError::Internal);
        }

        // Fallback broadcast: independent calls, so they may run concurrently.
        // Concatenation order is fixed by the configured agent order, not by
        // completion order. First failure aborts the broadcast.
        let replies = futures::future::try_join_all(self.ordered.iter().map(|agent| async {
            self.events.emit(Event::BroadcastStep {
                agent_name: agent.name().to_string(),
            });
            let reply = self.call_agent(agent, task).await?;
            Ok::<_, EnsembleError>(format!("[{}]: {}", agent.name(), reply))
        }))
        .await?;

        Ok(replies.join("\n\n"))
    }

    /// Ask the supervisor which specialist should handle the task, then
    /// forward the original task to that specialist.
    async fn run_supervisor(&self, task: &str) -> Result<String, EnsembleError> {
        let supervisor_name = self.config.supervisor_agent.as_deref().ok_or_else(|| {
            // Construction already enforces this; kept so a hand-built config
            // cannot reach the routing phase without a supervisor.
            EnsembleError::Config(format!(
                "pipeline '{}': supervisor_agent not set",
                self.config.name
            ))
        })?;
        let supervisor = self.agents.get(supervisor_name).ok_or_else(|| {
            EnsembleError::Config(format!(
                "pipeline '{}': supervisor agent '{}' not found",
                self.config.name, supervisor_name
            ))
        })?;

        let specialists = self.specialists(supervisor_name);
        if specialists.is_empty() {
            return Err(EnsembleError::Config(format!(
                "pipeline '{}' has no specialists besides the supervisor",
                self.config.name
            )));
        }

        let prompt = build_routing_prompt(&specialists, task);
        let chosen = self.call_agent(supervisor, &prompt).await?;
        let chosen = chosen.trim();
        info!(chosen, "supervisor routing");
        self.events.emit(Event::SupervisorRouting {
            chosen: chosen.to_string(),
        });

        let specialist = match specialists.iter().find(|a| a.name() == chosen) {
            Some(agent) => Arc::clone(agent),
            None => {
                // Unknown name: route to the first specialist so routing
                // ambiguity never aborts the run. The warning is mandatory so
                // operators can see misroutes.
                let fallback = Arc::clone(&specialists[0]);
                warn!(chosen, fallback = fallback.name(), "supervisor named unknown specialist");
                self.events.emit(Event::SupervisorFallback {
                    chosen: chosen.to_string(),
                    fallback: fallback.name().to_string(),
                });
                fallback
            }
        };

        self.call_agent(&specialist, task).await
    }

    /// Every agent other than the supervisor, in configured order.
    fn specialists(&self, supervisor_name: &str) -> Vec<Arc<dyn Agent>> {
        self.ordered
            .iter()
            .filter(|a| a.name() != supervisor_name)
            .cloned()
            .collect()
    }

    /// The routing prompt the supervisor would receive for `task`.
    ///
    /// A pure function of the pipeline config and the task text, exposed so
    /// callers can inspect or log routing decisions. Only meaningful for the
    /// supervisor strategy.
    pub fn routing_prompt(&self, task: &str) -> Result<String, EnsembleError> {
        let supervisor_name = self.config.supervisor_agent.as_deref().ok_or_else(|| {
            EnsembleError::Config(format!(
                "pipeline '{}' is not a supervisor pipeline",
                self.config.name
            ))
        })?;
        Ok(build_routing_prompt(&self.specialists(supervisor_name), task))
    }
}

fn build_routing_prompt(specialists: &[Arc<dyn Agent>], task: &str) -> String {
    let specialist_info = specialists
        .iter()
        .map(|a| {
            format!(
                "- {}: {}",
                a.name(),
                preview(a.instructions(), ROUTING_INSTRUCTIONS_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a supervisor. Available specialists:\n{specialist_info}\n\n\
         Task: {task}\n\n\
         Reply with ONLY the name of the specialist that should handle this task."
    )
}
