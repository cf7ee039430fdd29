use std::fmt;

use forensics_core::{DebateRound, JudgeDecision};

use crate::error::{OrchestratorError, Result};

/// Phase of the adjudication loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebatePhase {
    RoundStart,
    AgentsArgue,
    JudgeEvaluates,
    Done,
}

impl DebatePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundStart => "round_start",
            Self::AgentsArgue => "agents_argue",
            Self::JudgeEvaluates => "judge_evaluates",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for DebatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct DebateStateMachine;

impl DebateStateMachine {
    pub fn validate_transition(from: &DebatePhase, to: &DebatePhase) -> Result<()> {
        let allowed = Self::allowed_transitions(from);

        if allowed.contains(to) {
            Ok(())
        } else {
            Err(OrchestratorError::InvalidTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }

    fn allowed_transitions(from: &DebatePhase) -> Vec<DebatePhase> {
        match from {
            DebatePhase::RoundStart => vec![DebatePhase::AgentsArgue],
            DebatePhase::AgentsArgue => vec![DebatePhase::JudgeEvaluates],
            DebatePhase::JudgeEvaluates => vec![DebatePhase::RoundStart, DebatePhase::Done],
            DebatePhase::Done => vec![],
        }
    }

    pub fn can_transition(from: &DebatePhase, to: &DebatePhase) -> bool {
        Self::validate_transition(from, to).is_ok()
    }
}

/// Mutable record of one debate: current phase, round counter and history.
#[derive(Debug)]
pub struct DebateSession {
    phase: DebatePhase,
    round: u32,
    max_rounds: u32,
    history: Vec<DebateRound>,
    decision: Option<JudgeDecision>,
}

impl DebateSession {
    /// Start at round 1. A budget of zero is treated as one round.
    pub fn new(max_rounds: u32) -> Self {
        Self {
            phase: DebatePhase::RoundStart,
            round: 1,
            max_rounds: max_rounds.max(1),
            history: Vec::new(),
            decision: None,
        }
    }

    pub fn phase(&self) -> DebatePhase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn history(&self) -> &[DebateRound] {
        &self.history
    }

    pub fn decision(&self) -> Option<&JudgeDecision> {
        self.decision.as_ref()
    }

    pub fn is_final_round(&self) -> bool {
        self.round >= self.max_rounds
    }

    pub fn is_done(&self) -> bool {
        self.phase == DebatePhase::Done
    }

    fn transition(&mut self, to: DebatePhase) -> Result<()> {
        DebateStateMachine::validate_transition(&self.phase, &to)?;
        self.phase = to;
        Ok(())
    }

    pub fn begin_arguments(&mut self) -> Result<()> {
        self.transition(DebatePhase::AgentsArgue)
    }

    /// Append both arguments of the current round and hand over to the judge.
    pub fn record_arguments(
        &mut self,
        pro_fake: impl Into<String>,
        pro_real: impl Into<String>,
    ) -> Result<()> {
        self.transition(DebatePhase::JudgeEvaluates)?;
        self.history
            .push(DebateRound::new(self.round, pro_fake, pro_real));
        Ok(())
    }

    /// Move on to the next round. Not allowed once the budget is used up.
    pub fn next_round(&mut self) -> Result<()> {
        if self.is_final_round() {
            return Err(OrchestratorError::InvalidTransition {
                from: format!("{} (round {}/{})", self.phase, self.round, self.max_rounds),
                to: DebatePhase::RoundStart.as_str().to_string(),
            });
        }
        self.transition(DebatePhase::RoundStart)?;
        self.round += 1;
        Ok(())
    }

    pub fn finish(&mut self, decision: JudgeDecision) -> Result<()> {
        self.transition(DebatePhase::Done)?;
        self.decision = Some(decision);
        Ok(())
    }

    pub fn into_parts(self) -> (Option<JudgeDecision>, Vec<DebateRound>) {
        (self.decision, self.history)
    }
}
