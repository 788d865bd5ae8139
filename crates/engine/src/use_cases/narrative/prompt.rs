//! Prompt assembly for chapter events.
//!
//! Pure and deterministic: equal requests always produce equal assemblies,
//! which keeps recorded traffic and sandbox runs stable.

use buttonburgh_domain::{DispatchRequest, PlayerNarrativeSnapshot};
use chrono::SecondsFormat;

use crate::infrastructure::gemini::protocol::{
    Content, GenerateContentRequest, GenerationConfig, JSON_MIME_TYPE,
};
use crate::infrastructure::ports::PromptAssembly;

/// Identity and narrative contract of the game.
pub const HOUSE_RULES: &str = "\
You are the narrative director of Buttonburgh, a patchwork town stitched together \
from lost buttons, loose thread, and forgotten pockets. You write the next chapter \
event for one player.

House rules:
- Every choice has lasting consequence. Each option must change something the \
player can feel later: reputation, items, flags, quests, or status effects.
- Build on the player's past choices; never contradict them.
- Keep the tone warm, strange, and a little bittersweet. No gore.
- Each snippet offers three or four distinct choices. No option is a trap with no upside.";

/// The JSON shape the model must answer with.
pub const RESPONSE_CONTRACT: &str = "\
Respond with a single JSON object and nothing else:
{
  \"title\": string,
  \"summary\": string,
  \"snippets\": [
    {
      \"id\": snake_case string,
      \"text\": string,
      \"choiceOptions\": [3-4 strings],
      \"consequences\": { <choice option>: object },
      \"conditions\": { <requirement>: value }
    }
  ]
}";

/// Placeholder rendered for empty sections.
const NONE: &str = "none";

/// Builds prompt assemblies from dispatch requests.
#[derive(Debug, Clone, Default)]
pub struct PromptAssembler {
    temperature: Option<f32>,
}

impl PromptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sampling temperature forwarded in the generation config.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn assemble(&self, request: DispatchRequest) -> PromptAssembly {
        let system_instruction = system_instruction();
        let user_context = user_context(&request);

        let wire_request = GenerateContentRequest {
            system_instruction: Some(Content::system(system_instruction.clone())),
            contents: vec![Content::user(user_context.clone())],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some(JSON_MIME_TYPE.to_string()),
                temperature: self.temperature,
                max_output_tokens: None,
            }),
        };

        PromptAssembly {
            request,
            system_instruction,
            user_context,
            wire_request,
        }
    }
}

pub fn system_instruction() -> String {
    format!("{}\n\n{}", HOUSE_RULES, RESPONSE_CONTRACT)
}

/// Render the player context block.
///
/// Field order is fixed: player id, choice tags, quest log, status effects,
/// trigger reason.
pub fn user_context(request: &DispatchRequest) -> String {
    let snapshot = &request.snapshot;
    let mut out = String::new();

    out.push_str(&format!("player_id: {}\n", snapshot.player_id));
    out.push_str(&render_choices(snapshot));
    out.push_str(&format!("quest_log: {}\n", render_quests(snapshot)));
    out.push_str(&format!("status_effects: {}\n", render_effects(snapshot)));
    out.push_str(&format!(
        "trigger_reason: {}",
        request.trigger_reason().unwrap_or(NONE)
    ));

    out
}

fn render_choices(snapshot: &PlayerNarrativeSnapshot) -> String {
    if snapshot.choice_log.is_empty() {
        return format!("choice_tags: {}\n", NONE);
    }

    let mut out = String::from("choice_tags:\n");
    for choice in &snapshot.choice_log {
        out.push_str(&format!(
            "- {} ({})\n",
            choice.tag,
            choice.recorded_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }
    out
}

fn render_quests(snapshot: &PlayerNarrativeSnapshot) -> String {
    if snapshot.quest_progress.is_empty() {
        return NONE.to_string();
    }
    snapshot
        .quest_progress
        .iter()
        .map(|quest| quest.compact())
        .collect::<Vec<_>>()
        .join("; ")
}

fn render_effects(snapshot: &PlayerNarrativeSnapshot) -> String {
    if snapshot.active_effects.is_empty() {
        return NONE.to_string();
    }
    snapshot
        .active_effects
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
