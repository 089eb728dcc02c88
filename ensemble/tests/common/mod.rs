#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ensemble::{Agent, Backend};

/// Scripted agent for pipeline tests.
///
/// Pops one canned response per `run` call and records every message it
/// receives, so tests can assert on exactly what each agent was asked.
pub struct MockAgent {
    name: String,
    backend: Backend,
    instructions: String,
    responses: Mutex<VecDeque<String>>,
    received: Mutex<Vec<String>>,
    reset_count: Mutex<usize>,
}

impl MockAgent {
    pub fn new(name: &str, responses: Vec<&str>) -> Self {
        Self {
            name: name.to_string(),
            backend: Backend::Anthropic,
            instructions: format!("You are {name}."),
            responses: Mutex::new(responses.into_iter().map(str::to_string).collect()),
            received: Mutex::new(Vec::new()),
            reset_count: Mutex::new(0),
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.instructions = instructions.to_string();
        self
    }

    /// Every message this agent has been asked to handle, in call order.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    pub fn reset_count(&self) -> usize {
        *self.reset_count.lock().unwrap()
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn backend(&self) -> Backend {
        self.backend
    }

    fn instructions(&self) -> &str {
        &self.instructions
    }

    async fn run(&self, message: &str) -> Result<String> {
        self.received.lock().unwrap().push(message.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("mock agent '{}' ran out of scripted responses", self.name))
    }

    async fn reset(&self) {
        *self.reset_count.lock().unwrap() += 1;
    }
}

/// An agent whose every call fails, for error propagation tests.
pub struct FailingAgent {
    name: String,
}

impl FailingAgent {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Agent for FailingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn backend(&self) -> Backend {
        Backend::Anthropic
    }

    fn instructions(&self) -> &str {
        "always fails"
    }

    async fn run(&self, _message: &str) -> Result<String> {
        Err(anyhow!("simulated backend outage"))
    }

    async fn reset(&self) {}
}
