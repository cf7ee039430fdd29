//! Judge system: a bounded debate between a Pro-Fake agent, a Pro-Real agent
//! and a judge, all backed by the reasoning service.
//!
//! Each round both agents argue (Pro-Fake first), then the judge either
//! terminates with a verdict or asks for another round. The final round
//! always terminates, so the loop yields a [`JudgeDecision`] after at most
//! `max_rounds` rounds.

mod prompts;
mod state;

use std::sync::Arc;

use async_trait::async_trait;
use forensics_core::{DebateRound, JudgeDecision, StepResult, TaskInput};
use reasoning::{query_text, ImageAttachment, ReasoningRequest, ReasoningService};
use tracing::{debug, info, warn};

use crate::analyzer::{try_load_image, Analyzer};
use crate::error::Result;
use crate::json_recovery::ResponseParser;

pub use prompts::{DebatePrompts, Stance};
pub use state::{DebatePhase, DebateSession, DebateStateMachine};

pub const DEFAULT_MAX_ROUNDS: u32 = 3;

#[derive(Debug, Clone)]
pub struct DebateConfig {
    pub max_rounds: u32,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

/// Decision and full transcript of one debate
#[derive(Debug, Clone)]
pub struct DebateOutcome {
    pub decision: JudgeDecision,
    pub rounds: Vec<DebateRound>,
}

pub struct JudgeSystem {
    service: Arc<dyn ReasoningService>,
    config: DebateConfig,
}

impl JudgeSystem {
    pub const NAME: &'static str = "JudgeSystem";
    pub const DISPLAY_NAME: &'static str = "Judge System Debate";

    pub fn new(service: Arc<dyn ReasoningService>, config: DebateConfig) -> Self {
        Self { service, config }
    }

    pub async fn debate(&self, input: &TaskInput) -> Result<DebateOutcome> {
        let image = try_load_image(input).await;
        let mut session = DebateSession::new(self.config.max_rounds);

        info!(
            image = %input.image_ref,
            max_rounds = session.max_rounds(),
            with_image = image.is_some(),
            "Starting judge system debate"
        );

        while !session.is_done() {
            let round = session.round();
            session.begin_arguments()?;

            let pro_fake = self
                .argue(Stance::ProFake, input, session.history(), round, image.as_ref())
                .await;
            let pro_real = self
                .argue(Stance::ProReal, input, session.history(), round, image.as_ref())
                .await;
            session.record_arguments(pro_fake, pro_real)?;

            let prompt =
                DebatePrompts::judge(input, session.history(), round, session.max_rounds());
            let response = query_text(
                self.service.as_ref(),
                ReasoningRequest::new(prompt).with_image(image.as_ref()),
            )
            .await;

            match parse_judge_decision(&response) {
                Ok(decision) if decision.is_terminate() || session.is_final_round() => {
                    info!(
                        round,
                        decision = decision.decision.as_str(),
                        "Judge ended the debate"
                    );
                    session.finish(decision.into_terminal())?;
                }
                Ok(decision) => {
                    debug!(round, reasoning = %decision.reasoning, "Judge asked for another round");
                    session.next_round()?;
                }
                Err(e) if session.is_final_round() => {
                    warn!(round, error = %e, "Judge returned invalid JSON on the final round");
                    session.finish(JudgeDecision::invalid_json())?;
                }
                Err(e) => {
                    warn!(round, error = %e, "Judge returned invalid JSON, continuing");
                    session.next_round()?;
                }
            }
        }

        let (decision, rounds) = session.into_parts();
        Ok(DebateOutcome {
            decision: decision.unwrap_or_else(JudgeDecision::invalid_json),
            rounds,
        })
    }

    async fn argue(
        &self,
        stance: Stance,
        input: &TaskInput,
        history: &[DebateRound],
        round: u32,
        image: Option<&ImageAttachment>,
    ) -> String {
        let prompt = DebatePrompts::agent(stance, input, history, round);
        let argument = query_text(
            self.service.as_ref(),
            ReasoningRequest::new(prompt).with_image(image),
        )
        .await;
        debug!(round, stance = stance.label(), chars = argument.len(), "Agent argued");
        argument
    }
}

/// Parse judge output after removing code fence markers.
pub fn parse_judge_decision(response: &str) -> serde_json::Result<JudgeDecision> {
    serde_json::from_str(&ResponseParser::remove_fence_markers(response))
}

#[async_trait]
impl Analyzer for JudgeSystem {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn display_name(&self) -> &str {
        Self::DISPLAY_NAME
    }

    async fn analyze(&self, input: &TaskInput) -> Result<StepResult> {
        let outcome = self.debate(input).await?;
        Ok(StepResult::new(
            Self::NAME,
            serde_json::to_value(&outcome.decision)?,
        ))
    }
}
