#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use events::{EventEnvelope, ProgressChannel, ProgressItem};
use forensics_core::{StepResult, TaskInput};
use orchestrator::{Analyzer, OrchestratorError, Result};
use reasoning::{ReasoningError, ReasoningRequest, ReasoningResult, ReasoningService};

pub const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Reasoning service answering by prompt role, recording every request.
pub struct ScriptedService {
    judge: Mutex<VecDeque<String>>,
    final_answer: String,
    fail_all: bool,
    requests: Mutex<Vec<ReasoningRequest>>,
    arguments: Mutex<u32>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self {
            judge: Mutex::new(VecDeque::new()),
            final_answer: r#"{"probability_score": 50, "explanation": "mixed evidence"}"#.to_string(),
            fail_all: false,
            requests: Mutex::new(Vec::new()),
            arguments: Mutex::new(0),
        }
    }

    /// Judge answers in call order; once exhausted the judge says CONTINUE.
    pub fn with_judge<I, S>(self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.judge.lock().unwrap() = answers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_final_answer(mut self, answer: impl Into<String>) -> Self {
        self.final_answer = answer.into();
        self
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::new()
        }
    }

    pub fn requests(&self) -> Vec<ReasoningRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn prompts_containing(&self, needle: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| r.prompt)
            .filter(|p| p.contains(needle))
            .collect()
    }
}

#[async_trait]
impl ReasoningService for ScriptedService {
    async fn query(&self, request: ReasoningRequest) -> ReasoningResult<String> {
        self.requests.lock().unwrap().push(request.clone());

        if self.fail_all {
            return Err(ReasoningError::Api {
                message: "quota exceeded".to_string(),
                status_code: Some(402),
            });
        }

        let prompt = &request.prompt;
        let answer = if prompt.contains("Judge Agent") {
            self.judge
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| r#"{"decision": "CONTINUE", "reasoning": "need more"}"#.to_string())
        } else if prompt.contains("Debate Agent") {
            let mut n = self.arguments.lock().unwrap();
            *n += 1;
            let side = if prompt.contains("AI-GENERATED") {
                "fake"
            } else {
                "real"
            };
            format!("{side} argument #{n}")
        } else if prompt.contains("final decision maker") {
            self.final_answer.clone()
        } else {
            String::new()
        };
        Ok(answer)
    }

    fn model_name(&self) -> &str {
        "scripted/model"
    }
}

/// Analyzer returning a fixed text result
pub struct StaticAnalyzer(pub &'static str);

#[async_trait]
impl Analyzer for StaticAnalyzer {
    fn name(&self) -> &str {
        self.0
    }

    async fn analyze(&self, _input: &TaskInput) -> Result<StepResult> {
        Ok(StepResult::text(self.0, format!("{} ok", self.0)))
    }
}

/// Analyzer that always fails
pub struct FailingAnalyzer(pub &'static str);

#[async_trait]
impl Analyzer for FailingAnalyzer {
    fn name(&self) -> &str {
        self.0
    }

    fn display_name(&self) -> &str {
        "Always Failing"
    }

    async fn analyze(&self, _input: &TaskInput) -> Result<StepResult> {
        Err(OrchestratorError::analyzer_failed(self.0, "boom"))
    }
}

/// Analyzer that panics mid-run
pub struct PanickingAnalyzer;

#[async_trait]
impl Analyzer for PanickingAnalyzer {
    fn name(&self) -> &str {
        "PanickingAnalyzer"
    }

    async fn analyze(&self, _input: &TaskInput) -> Result<StepResult> {
        panic!("index out of bounds");
    }
}

/// Read events until a terminal one arrives.
pub async fn collect_run(channel: &ProgressChannel) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    loop {
        match channel.recv_timeout(Duration::from_secs(5)).await {
            ProgressItem::Event(envelope) => {
                let terminal = envelope.event.is_terminal();
                events.push(envelope);
                if terminal {
                    return events;
                }
            }
            ProgressItem::Heartbeat => panic!("run stalled after {} events", events.len()),
        }
    }
}

pub fn event_types(events: &[EventEnvelope]) -> Vec<&'static str> {
    events.iter().map(|e| e.event.event_type()).collect()
}
