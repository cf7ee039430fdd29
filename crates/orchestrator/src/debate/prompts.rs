use forensics_core::{DebateRound, TaskInput};

/// Side an agent argues in the debate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stance {
    ProFake,
    ProReal,
}

impl Stance {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ProFake => "Pro-Fake",
            Self::ProReal => "Pro-Real",
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            Self::ProFake => "You are arguing that the image is AI-GENERATED (Deepfake).",
            Self::ProReal => "You are arguing that the image is REAL (not a deepfake).",
        }
    }
}

pub struct DebatePrompts;

impl DebatePrompts {
    /// Verbatim replay of every completed round
    pub fn history(history: &[DebateRound]) -> String {
        history
            .iter()
            .map(|round| {
                format!(
                    "Round {}:\nPro-Fake: {}\nPro-Real: {}\n\n",
                    round.round_number, round.pro_fake_argument, round.pro_real_argument
                )
            })
            .collect()
    }

    pub fn agent(stance: Stance, input: &TaskInput, history: &[DebateRound], round: u32) -> String {
        format!(
            r#"You are a Debate Agent in a forensic analysis system.
{instruction}

Input Image Path: {image}
User Text: {text}

Debate History:
{history}

Current Round: {round}

Your task:
1. Analyze the input and the history.
2. Provide a strong, concise argument supporting your stance.
3. Refute the opponent's points from previous rounds if applicable.

Return ONLY your argument as plain text."#,
            instruction = stance.instruction(),
            image = input.image_ref,
            text = input.text_or_empty(),
            history = Self::history(history),
            round = round
        )
    }

    pub fn judge(input: &TaskInput, history: &[DebateRound], round: u32, max_rounds: u32) -> String {
        format!(
            r#"You are the Judge Agent supervising a debate about whether an image is a deepfake.

Input Image Path: {image}
User Text: {text}

Debate History:
{history}

Current Round: {round} / {max_rounds}

Your task:
1. Evaluate the arguments from both sides.
2. Decide if the debate has reached sufficient clarity to make a final decision.
3. If YES or if this is the final round ({max_rounds}), output "TERMINATE" and your final verdict.
4. If NO and rounds remain, output "CONTINUE".

Return a JSON object with this structure:
{{
    "decision": "TERMINATE" or "CONTINUE",
    "reasoning": "Brief explanation of why you are terminating or continuing",
    "final_verdict": "Real" or "Fake" or "Inconclusive" (Only required if decision is TERMINATE),
    "explanation": "Final detailed explanation for the user" (Only required if decision is TERMINATE),
    "probability_score": <int 0-100> (Probability of being Fake, Only required if decision is TERMINATE)
}}"#,
            image = input.image_ref,
            text = input.text_or_empty(),
            history = Self::history(history),
            round = round,
            max_rounds = max_rounds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> TaskInput {
        TaskInput::new("suspect.png", Some("seen on instagram".to_string())).unwrap()
    }

    #[test]
    fn test_history_format() {
        let history = vec![
            DebateRound::new(1, "too smooth", "natural noise"),
            DebateRound::new(2, "bad shadows", "consistent light"),
        ];

        assert_eq!(
            DebatePrompts::history(&history),
            "Round 1:\nPro-Fake: too smooth\nPro-Real: natural noise\n\n\
             Round 2:\nPro-Fake: bad shadows\nPro-Real: consistent light\n\n"
        );
        assert_eq!(DebatePrompts::history(&[]), "");
    }

    #[test]
    fn test_agent_prompt_contains_stance_and_round() {
        let history = vec![DebateRound::new(1, "too smooth", "natural noise")];

        let fake = DebatePrompts::agent(Stance::ProFake, &input(), &history, 2);
        assert!(fake.contains("AI-GENERATED"));
        assert!(fake.contains("Current Round: 2"));
        assert!(fake.contains("Pro-Real: natural noise"));
        assert!(fake.contains("suspect.png"));
        assert!(fake.contains("seen on instagram"));

        let real = DebatePrompts::agent(Stance::ProReal, &input(), &history, 2);
        assert!(real.contains("REAL (not a deepfake)"));
    }

    #[test]
    fn test_judge_prompt_contains_budget() {
        let prompt = DebatePrompts::judge(&input(), &[], 1, 3);
        assert!(prompt.contains("Current Round: 1 / 3"));
        assert!(prompt.contains("final round (3)"));
        assert!(prompt.contains("\"decision\": \"TERMINATE\" or \"CONTINUE\""));
    }

    #[test]
    fn test_stance_labels() {
        assert_eq!(Stance::ProFake.label(), "Pro-Fake");
        assert_eq!(Stance::ProReal.label(), "Pro-Real");
    }
}
