use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Judge instruction after evaluating a round.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Continue,
    Terminate,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "CONTINUE",
            Self::Terminate => "TERMINATE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONTINUE" => Some(Self::Continue),
            "TERMINATE" => Some(Self::Terminate),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Decision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| de::Error::unknown_variant(&raw, &["CONTINUE", "TERMINATE"]))
    }
}

/// Final authenticity verdict of the debate.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum Verdict {
    Real,
    Fake,
    Inconclusive,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Real => "Real",
            Self::Fake => "Fake",
            Self::Inconclusive => "Inconclusive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "real" => Some(Self::Real),
            "fake" => Some(Self::Fake),
            "inconclusive" => Some(Self::Inconclusive),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Verdict {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| de::Error::unknown_variant(&raw, &["Real", "Fake", "Inconclusive"]))
    }
}

/// Arguments exchanged in one completed debate round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct DebateRound {
    #[serde(rename = "round")]
    pub round_number: u32,
    #[serde(rename = "pro_fake")]
    pub pro_fake_argument: String,
    #[serde(rename = "pro_real")]
    pub pro_real_argument: String,
}

impl DebateRound {
    pub fn new(
        round_number: u32,
        pro_fake_argument: impl Into<String>,
        pro_real_argument: impl Into<String>,
    ) -> Self {
        Self {
            round_number,
            pro_fake_argument: pro_fake_argument.into(),
            pro_real_argument: pro_real_argument.into(),
        }
    }
}

pub const JUDGE_INVALID_JSON_EXPLANATION: &str = "Judge failed to return valid JSON";

/// Structured output of the judge agent.
///
/// `final_verdict`, `explanation` and `probability_score` are only expected
/// when `decision` is `TERMINATE`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct JudgeDecision {
    pub decision: Decision,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reasoning: String,
    #[serde(
        default,
        alias = "finalVerdict",
        skip_serializing_if = "Option::is_none"
    )]
    pub final_verdict: Option<Verdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(
        default,
        alias = "probabilityScore",
        deserialize_with = "deserialize_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub probability_score: Option<u8>,
}

impl JudgeDecision {
    /// Decision synthesized locally when the judge output on the final round
    /// could not be parsed.
    pub fn invalid_json() -> Self {
        Self {
            decision: Decision::Terminate,
            reasoning: String::new(),
            final_verdict: Some(Verdict::Inconclusive),
            explanation: Some(JUDGE_INVALID_JSON_EXPLANATION.to_string()),
            probability_score: None,
        }
    }

    pub fn is_terminate(&self) -> bool {
        self.decision == Decision::Terminate
    }

    /// Coerce into a terminal decision, filling an `Inconclusive` verdict when
    /// the judge did not provide one.
    pub fn into_terminal(mut self) -> Self {
        if self.decision == Decision::Continue {
            self.decision = Decision::Terminate;
        }
        if self.final_verdict.is_none() {
            self.final_verdict = Some(Verdict::Inconclusive);
        }
        if self.explanation.is_none() {
            self.explanation = Some(if self.reasoning.is_empty() {
                "Round budget exhausted before the judge reached a verdict".to_string()
            } else {
                self.reasoning.clone()
            });
        }
        self
    }
}

pub fn validate_score(value: i64) -> Result<u8, CoreError> {
    if (0..=100).contains(&value) {
        Ok(value as u8)
    } else {
        Err(CoreError::ScoreOutOfRange(value))
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u8>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let number = match value {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        Some(_) => None,
    };

    let number = number.ok_or_else(|| de::Error::custom("probability_score must be a number"))?;
    validate_score(number).map(Some).map_err(de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_parsing() {
        assert_eq!(Decision::parse("TERMINATE"), Some(Decision::Terminate));
        assert_eq!(Decision::parse("continue"), Some(Decision::Continue));
        assert_eq!(Decision::parse("maybe"), None);
        assert_eq!(Decision::Terminate.as_str(), "TERMINATE");
    }

    #[test]
    fn test_verdict_parsing() {
        assert_eq!(Verdict::parse("Fake"), Some(Verdict::Fake));
        assert_eq!(Verdict::parse("REAL"), Some(Verdict::Real));
        assert_eq!(Verdict::parse(" inconclusive "), Some(Verdict::Inconclusive));
        assert_eq!(Verdict::parse("deepfake"), None);
    }

    #[test]
    fn test_judge_decision_full_terminate() {
        let json = r#"{
            "decision": "TERMINATE",
            "reasoning": "Both sides exhausted",
            "final_verdict": "Fake",
            "explanation": "Lighting is inconsistent",
            "probability_score": 87
        }"#;

        let decision: JudgeDecision = serde_json::from_str(json).unwrap();
        assert!(decision.is_terminate());
        assert_eq!(decision.final_verdict, Some(Verdict::Fake));
        assert_eq!(decision.probability_score, Some(87));
    }

    #[test]
    fn test_judge_decision_camel_case_aliases() {
        let json = r#"{"decision":"TERMINATE","finalVerdict":"Real","probabilityScore":12.6}"#;
        let decision: JudgeDecision = serde_json::from_str(json).unwrap();

        assert_eq!(decision.final_verdict, Some(Verdict::Real));
        assert_eq!(decision.probability_score, Some(13));
        assert!(decision.reasoning.is_empty());
    }

    #[test]
    fn test_judge_decision_continue_minimal() {
        let json = r#"{"decision":"CONTINUE","reasoning":null}"#;
        let decision: JudgeDecision = serde_json::from_str(json).unwrap();

        assert!(!decision.is_terminate());
        assert!(decision.final_verdict.is_none());

        let out = serde_json::to_value(&decision).unwrap();
        assert_eq!(out["decision"], "CONTINUE");
        assert!(out.get("final_verdict").is_none());
    }

    #[test]
    fn test_judge_decision_rejects_out_of_range_score() {
        let json = r#"{"decision":"TERMINATE","probability_score":150}"#;
        assert!(serde_json::from_str::<JudgeDecision>(json).is_err());
    }

    #[test]
    fn test_judge_decision_rejects_unknown_decision() {
        let json = r#"{"decision":"PAUSE","reasoning":"?"}"#;
        assert!(serde_json::from_str::<JudgeDecision>(json).is_err());
    }

    #[test]
    fn test_invalid_json_decision() {
        let decision = JudgeDecision::invalid_json();
        assert!(decision.is_terminate());
        assert_eq!(decision.final_verdict, Some(Verdict::Inconclusive));
        assert_eq!(
            decision.explanation.as_deref(),
            Some(JUDGE_INVALID_JSON_EXPLANATION)
        );
    }

    #[test]
    fn test_into_terminal_from_continue() {
        let decision = JudgeDecision {
            decision: Decision::Continue,
            reasoning: "Need more evidence".to_string(),
            final_verdict: None,
            explanation: None,
            probability_score: None,
        }
        .into_terminal();

        assert!(decision.is_terminate());
        assert_eq!(decision.final_verdict, Some(Verdict::Inconclusive));
        assert_eq!(decision.explanation.as_deref(), Some("Need more evidence"));
    }

    #[test]
    fn test_into_terminal_keeps_existing_verdict() {
        let decision = JudgeDecision {
            decision: Decision::Terminate,
            reasoning: String::new(),
            final_verdict: Some(Verdict::Fake),
            explanation: Some("clear".to_string()),
            probability_score: Some(90),
        }
        .into_terminal();

        assert_eq!(decision.final_verdict, Some(Verdict::Fake));
        assert_eq!(decision.probability_score, Some(90));
    }

    #[test]
    fn test_debate_round_serialization() {
        let round = DebateRound::new(1, "fake arg", "real arg");
        let json = serde_json::to_value(&round).unwrap();

        assert_eq!(json["round"], 1);
        assert_eq!(json["pro_fake"], "fake arg");
        assert_eq!(json["pro_real"], "real arg");
    }

    #[test]
    fn test_validate_score() {
        assert_eq!(validate_score(0).unwrap(), 0);
        assert_eq!(validate_score(100).unwrap(), 100);
        assert!(validate_score(-1).is_err());
    }
}
