mod common;

use std::sync::Arc;

use common::*;
use forensics_core::{Decision, TaskInput, Verdict, JUDGE_INVALID_JSON_EXPLANATION};
use orchestrator::{Analyzer, DebateConfig, JudgeSystem};
use tempfile::TempDir;

const CONTINUE: &str = r#"{"decision": "CONTINUE", "reasoning": "arguments are balanced"}"#;

fn judge_system(service: Arc<ScriptedService>, max_rounds: u32) -> JudgeSystem {
    JudgeSystem::new(service, DebateConfig { max_rounds })
}

fn input() -> TaskInput {
    TaskInput::new("/missing/suspect.png", Some("posted on social media".to_string())).unwrap()
}

#[tokio::test]
async fn test_always_continue_ends_inconclusive_at_budget() {
    let service = Arc::new(ScriptedService::new().with_judge([CONTINUE, CONTINUE, CONTINUE]));
    let judge = judge_system(service.clone(), 3);

    let outcome = judge.debate(&input()).await.unwrap();

    assert_eq!(outcome.rounds.len(), 3);
    assert_eq!(outcome.decision.decision, Decision::Terminate);
    assert_eq!(outcome.decision.final_verdict, Some(Verdict::Inconclusive));
    assert_eq!(service.prompts_containing("Judge Agent").len(), 3);
    assert_eq!(service.prompts_containing("Debate Agent").len(), 6);
}

#[tokio::test]
async fn test_terminate_in_first_round() {
    let service = Arc::new(ScriptedService::new().with_judge([
        "```json\n{\"decision\":\"TERMINATE\",\"reasoning\":\"clear\",\"finalVerdict\":\"Fake\",\"explanation\":\"melted hands\",\"probability_score\":87}\n```",
    ]));
    let judge = judge_system(service.clone(), 3);

    let outcome = judge.debate(&input()).await.unwrap();

    assert_eq!(outcome.rounds.len(), 1);
    assert_eq!(outcome.decision.final_verdict, Some(Verdict::Fake));
    assert_eq!(outcome.decision.probability_score, Some(87));
    assert_eq!(outcome.decision.explanation.as_deref(), Some("melted hands"));
    assert_eq!(service.prompts_containing("Judge Agent").len(), 1);
}

#[tokio::test]
async fn test_agents_argue_before_judge_in_stance_order() {
    let service = Arc::new(ScriptedService::new().with_judge([
        r#"{"decision": "TERMINATE", "final_verdict": "Real", "probability_score": 10}"#,
    ]));
    judge_system(service.clone(), 3).debate(&input()).await.unwrap();

    let prompts: Vec<String> = service.requests().into_iter().map(|r| r.prompt).collect();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].contains("AI-GENERATED"));
    assert!(prompts[1].contains("REAL (not a deepfake)"));
    assert!(prompts[2].contains("Judge Agent"));
    assert!(prompts[2].contains("Pro-Fake: fake argument #1"));
    assert!(prompts[2].contains("Pro-Real: real argument #2"));
    assert!(prompts[2].contains("Current Round: 1 / 3"));
}

#[tokio::test]
async fn test_malformed_judge_output_moves_to_next_round() {
    let service = Arc::new(ScriptedService::new().with_judge([
        "The Pro-Fake side is more convincing.",
        r#"{"decision": "TERMINATE", "reasoning": "settled", "final_verdict": "Fake", "probability_score": 80}"#,
    ]));
    let outcome = judge_system(service.clone(), 3).debate(&input()).await.unwrap();

    assert_eq!(outcome.rounds.len(), 2);
    assert_eq!(outcome.rounds[0].round_number, 1);
    assert_eq!(outcome.rounds[1].round_number, 2);
    assert_eq!(outcome.decision.final_verdict, Some(Verdict::Fake));

    // Round 2 agents see round 1 and nothing else
    let round_two_agents: Vec<String> = service
        .prompts_containing("Current Round: 2")
        .into_iter()
        .filter(|p| p.contains("Debate Agent"))
        .collect();
    assert_eq!(round_two_agents.len(), 2);
    for prompt in &round_two_agents {
        assert!(prompt.contains("Round 1:\nPro-Fake: fake argument #1\nPro-Real: real argument #2"));
        assert!(!prompt.contains("Round 2:"));
    }
}

#[tokio::test]
async fn test_malformed_judge_output_on_final_round_is_inconclusive() {
    let service = Arc::new(ScriptedService::new().with_judge([CONTINUE, "not json", "still not json"]));
    let outcome = judge_system(service, 3).debate(&input()).await.unwrap();

    assert_eq!(outcome.rounds.len(), 3);
    assert_eq!(outcome.decision.decision, Decision::Terminate);
    assert_eq!(outcome.decision.final_verdict, Some(Verdict::Inconclusive));
    assert_eq!(
        outcome.decision.explanation.as_deref(),
        Some(JUDGE_INVALID_JSON_EXPLANATION)
    );
}

#[tokio::test]
async fn test_continue_on_final_round_is_forced_to_terminate() {
    let service = Arc::new(ScriptedService::new().with_judge([CONTINUE]));
    let outcome = judge_system(service, 1).debate(&input()).await.unwrap();

    assert_eq!(outcome.rounds.len(), 1);
    assert!(outcome.decision.is_terminate());
    assert_eq!(outcome.decision.final_verdict, Some(Verdict::Inconclusive));
    assert_eq!(outcome.decision.reasoning, "arguments are balanced");
}

#[tokio::test]
async fn test_reasoning_failures_degrade_to_inconclusive() {
    let service = Arc::new(ScriptedService::failing());
    let outcome = judge_system(service.clone(), 2).debate(&input()).await.unwrap();

    assert_eq!(outcome.rounds.len(), 2);
    assert!(outcome.rounds[0]
        .pro_fake_argument
        .starts_with("Error querying reasoning service:"));
    assert_eq!(outcome.decision.final_verdict, Some(Verdict::Inconclusive));
    assert_eq!(service.requests().len(), 6);
}

#[tokio::test]
async fn test_missing_image_debates_with_text_only() {
    let service = Arc::new(ScriptedService::new());
    judge_system(service.clone(), 2).debate(&input()).await.unwrap();

    assert!(service.requests().iter().all(|r| r.images.is_empty()));
}

#[tokio::test]
async fn test_local_image_is_attached_to_every_call() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("suspect.png");
    std::fs::write(&path, PNG_HEADER).unwrap();
    let input = TaskInput::new(path.display().to_string(), None).unwrap();

    let service = Arc::new(ScriptedService::new());
    judge_system(service.clone(), 1).debate(&input).await.unwrap();

    let requests = service.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r.images.len() == 1));
}

#[tokio::test]
async fn test_step_result_shape() {
    let service = Arc::new(ScriptedService::new().with_judge([
        r#"{"decision": "TERMINATE", "reasoning": "done", "final_verdict": "Real", "explanation": "consistent lighting", "probability_score": 15}"#,
    ]));
    let judge = judge_system(service, 3);

    assert_eq!(judge.name(), "JudgeSystem");
    assert_eq!(judge.display_name(), "Judge System Debate");

    let result = judge.analyze(&input()).await.unwrap();
    assert_eq!(result.source, "JudgeSystem");
    assert_eq!(result.content["decision"], "TERMINATE");
    assert_eq!(result.content["final_verdict"], "Real");
    assert_eq!(result.content["probability_score"], 15);
    assert_eq!(result.content["explanation"], "consistent lighting");
}
