//! End-to-end pipeline test against a scripted in-memory provider.
//!
//! Drives the full flow: analysis run, hooks/scripts continuation, and
//! restructuring of the resulting flat scripts, with responses that
//! exercise the normalizer (fences, prose wrapping, trailing commas).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use adforge::config::PipelineConfig;
use adforge::error::CompletionError;
use adforge::llm::{CompletionProvider, CompletionRequest, CompletionResponse, Usage};
use adforge::pipeline::{
    PipelineState, ProductDescription, Stage, WorkflowManager,
};
use adforge::prompts::TemplateStore;
use adforge::restructure::restructure;

/// Provider that replays scripted responses and records the prompts it saw.
struct ScriptedProvider {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn seen_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        self.prompts.lock().unwrap().push(request.user_prompt);
        let text = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(CompletionError::EmptyResponse)?;
        Ok(CompletionResponse {
            text,
            usage: Usage {
                input_tokens: 500,
                output_tokens: 700,
            },
            truncated: false,
        })
    }
}

fn product() -> ProductDescription {
    ProductDescription {
        name: "SleepWell Tea".to_string(),
        description: "A calming herbal tea blend for the hour before bed".to_string(),
        target_audience: "Adults who struggle to fall asleep".to_string(),
        price: Some("$19.99".to_string()),
        problem_solved: "Restless, anxious evenings".to_string(),
        differentiation: "Organic, caffeine-free, clinically dosed herbs".to_string(),
        extras: Some("Subscription available".to_string()),
    }
}

fn templates() -> Arc<TemplateStore> {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/prompts");
    Arc::new(TemplateStore::load_dir(dir).expect("shipped templates load"))
}

// Responses deliberately vary in wrapping: fenced, prose-wrapped, bare,
// with a trailing comma; the normalizer must handle all of them.

const AVATAR_RESPONSE: &str = r#"Here is my analysis of the buyer:

```json
{"avatar_analysis": {"avatar_name": "Wired-but-tired professional",
 "demographics": {"age_range": "30-45", "occupation": "knowledge worker"},
 "pain_points": ["lies awake replaying the day", "wakes up groggy"],
 "desires": ["falling asleep without medication"],
 "buying_triggers": ["a bad night before a big meeting"]}}
```"#;

const JOURNEY_RESPONSE: &str = r#"{"customer_journey": {
  "summary": "From doomscrolling at 1am to a nightly ritual.",
  "stages": [
    {"name": "Problem aware", "description": "Knows sleep is broken", "emotional_state": "frustrated", "touchpoints": ["social feeds"]},
    {"name": "Solution aware", "description": "Researches alternatives to pills", "emotional_state": "hopeful", "touchpoints": ["search", "reviews"]},
    {"name": "Purchase", "description": "Tries a first box", "emotional_state": "cautious", "touchpoints": ["product page"]}
  ]
}}"#;

const OBJECTIONS_RESPONSE: &str = r#"Sure — the skeptical buyer would say:
{"objections_analysis": {"objections": [
  {"objection": "Tea can't fix real insomnia", "rebuttal": "Clinically dosed valerian and chamomile, not a pinch of lavender", "severity": "high"},
  {"objection": "I'll just wake up groggy anyway", "rebuttal": "Caffeine-free herbs that wear off by morning", "severity": "medium"}
]}}"#;

const ANGLES_RESPONSE: &str = r#"{"angles": {
  "supportive_angles": [
    {"angle_number": 1, "angle_id": "angle_1", "angle_category": "social proof", "angle_concept": "12,000 reviewers fall asleep faster", "angle_type": "positive"},
    {"angle_number": 2, "angle_id": "angle_2", "angle_category": "ritual", "concept": "the 9pm wind-down ritual"}
  ],
  "counter_angles": [
    {"angle_number": 3, "angle_id": "angle_3", "angle_category": "myth busting", "angle_concept": "melatonin is a hormone, not a habit",}
  ]
}}"#;

const HOOKS_RESPONSE: &str = r#"{"hooks": {
  "angle_1": {
    "curiosity": [
      {"hook_id": "angle_1_1", "hook_text": "12,000 people found the same 9pm trick", "hook_category": "curiosity"}
    ],
    "social proof": [
      "Why is everyone's nightstand suddenly a tea shelf?"
    ]
  },
  "angle_3": {
    "pattern interrupt": [
      {"hook_id": "angle_3_1", "hook_text": "Stop taking hormones for a habit problem", "hook_category": "pattern interrupt"}
    ]
  }
}}"#;

const SCRIPTS_RESPONSE: &str = r#"{"scripts": [
  {"script_id": "angle_1_1_1", "content": "12,000 people found the same 9pm trick...", "cta": "Try your first box", "target_emotion": "belonging"},
  {"script_id": "angle_1_1_2", "content": "You're not bad at sleeping...", "cta": "Start tonight", "target_emotion": "relief"},
  {"script_id": "angle_1_2_1", "content": "Why is everyone's nightstand suddenly a tea shelf?...", "cta": "See why", "target_emotion": "curiosity"},
  {"script_id": "angle_3_1_1", "content": "Stop taking hormones for a habit problem...", "cta": "Switch tonight", "target_emotion": "defiance"},
  {"script_id": "broken", "content": "this one has a malformed id", "cta": "", "target_emotion": ""}
]}"#;

#[tokio::test]
async fn full_pipeline_then_restructure() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        AVATAR_RESPONSE,
        JOURNEY_RESPONSE,
        OBJECTIONS_RESPONSE,
        ANGLES_RESPONSE,
        HOOKS_RESPONSE,
        SCRIPTS_RESPONSE,
    ]));
    let manager = WorkflowManager::new(
        provider.clone(),
        templates(),
        PipelineConfig::default(),
    );

    // Analysis run: avatar → journey → objections → angles.
    let mut ctx = manager
        .run_analysis("camp-tea-1", product(), vec![])
        .await
        .expect("analysis run succeeds");

    assert_eq!(ctx.state(), PipelineState::Completed);
    assert_eq!(
        ctx.completed_stages(),
        vec![Stage::Avatar, Stage::Journey, Stage::Objections, Stage::Angles]
    );

    let angles = ctx.get(Stage::Angles).unwrap().as_angles().unwrap();
    assert_eq!(angles.supportive.len(), 2);
    assert_eq!(angles.counter.len(), 1);
    // Alternate key spelling ("concept") canonicalized.
    assert_eq!(angles.supportive[1].concept, "the 9pm wind-down ritual");

    // Continuation with two user-selected angles.
    manager
        .run_continuation(&mut ctx, &["angle_1".to_string(), "angle_3".to_string()])
        .await
        .expect("continuation succeeds");

    let hooks = ctx.get(Stage::Hooks).unwrap().as_hooks().unwrap();
    assert_eq!(hooks.hooks.len(), 3);
    // The bare-string hook got a synthetic id and the enclosing category.
    let synthetic = hooks
        .hooks
        .iter()
        .find(|h| h.hook_id == "angle_1_2")
        .expect("synthetic hook present");
    assert_eq!(synthetic.category, "social proof");

    let scripts = ctx.get(Stage::Scripts).unwrap().as_scripts().unwrap();
    assert_eq!(scripts.scripts.len(), 5);

    // Restructure: 4 well-formed records over 2 angles and 3 hooks; the
    // malformed one is skipped, not fatal.
    let forest = restructure(&scripts.scripts);
    assert_eq!(forest.angles.len(), 2);
    assert_eq!(forest.hook_count(), 3);
    assert_eq!(forest.script_count(), 4);
    assert_eq!(forest.angles[0].angle_id, "angle_1");
    assert_eq!(forest.angles[1].angle_id, "angle_3");
    assert_eq!(forest.angles[0].hooks[0].scripts.len(), 2);

    // Stage prompts accumulate prior context: the scripts prompt must
    // carry the product, the avatar dump, and the hooks dump verbatim.
    let prompts = provider.seen_prompts();
    assert_eq!(prompts.len(), 6);
    let scripts_prompt = &prompts[5];
    assert!(scripts_prompt.contains("Product name: SleepWell Tea"));
    assert!(scripts_prompt.contains("Wired-but-tired professional"));
    assert!(scripts_prompt.contains("12,000 people found the same 9pm trick"));
    assert!(scripts_prompt.contains("## Selected angles"));

    // Earlier stages never see later context.
    let avatar_prompt = &prompts[0];
    assert!(!avatar_prompt.contains("### Avatar result"));
}

#[tokio::test]
async fn stage_failure_aborts_and_names_the_stage() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        AVATAR_RESPONSE,
        "no json here at all",
    ]));
    let manager = WorkflowManager::new(provider, templates(), PipelineConfig::default());

    let err = manager
        .run_analysis("camp-tea-2", product(), vec![])
        .await
        .expect_err("journey stage must fail");

    assert_eq!(err.stage(), Some(Stage::Journey));
    let message = err.to_string();
    assert!(message.contains("Journey stage"), "got: {}", message);
    assert!(message.contains("no json here"), "got: {}", message);
}

#[tokio::test]
async fn restructure_is_idempotent_on_pipeline_output() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        AVATAR_RESPONSE,
        JOURNEY_RESPONSE,
        OBJECTIONS_RESPONSE,
        ANGLES_RESPONSE,
        HOOKS_RESPONSE,
        SCRIPTS_RESPONSE,
    ]));
    let manager = WorkflowManager::new(provider, templates(), PipelineConfig::default());

    let mut ctx = manager
        .run_analysis("camp-tea-3", product(), vec![])
        .await
        .unwrap();
    manager
        .run_continuation(&mut ctx, &["angle_1".to_string(), "angle_3".to_string()])
        .await
        .unwrap();

    let scripts = ctx.get(Stage::Scripts).unwrap().as_scripts().unwrap();
    let first = serde_json::to_string(&restructure(&scripts.scripts)).unwrap();
    let second = serde_json::to_string(&restructure(&scripts.scripts)).unwrap();
    assert_eq!(first, second);
}
