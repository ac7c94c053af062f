use serde::{Deserialize, Serialize};

/// Model used when nothing has been selected yet
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

/// Claude models offered by the Anthropic provider (id, label)
pub const CLAUDE_MODELS: &[(&str, &str)] = &[
    ("claude-opus-4-5-20251101", "Claude Opus 4.5"),
    ("claude-opus-4-1-20250805", "Claude Opus 4.1"),
    ("claude-opus-4-20250514", "Claude Opus 4"),
    ("claude-sonnet-4-5-20250929", "Claude Sonnet 4.5"),
    ("claude-sonnet-4-20250514", "Claude Sonnet 4"),
    ("claude-haiku-4-5-20251001", "Claude Haiku 4.5"),
    ("claude-3-7-sonnet-20250219", "Claude 3.7 Sonnet"),
];

/// Models offered by the Parallel chat provider (id, label)
pub const PARALLEL_CHAT_MODELS: &[(&str, &str)] = &[("speed", "Speed")];

/// Single research "model" offered by the Parallel task API
pub const RESEARCH_MODEL: &str = "deep-research-default";

/// Short blurb shown next to the research option
pub const RESEARCH_DESCRIPTION: &str = "Comprehensive research with citations (5s-30min)";

/// A backend capable of answering chat messages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    #[default]
    Anthropic,
    ParallelChat,
    ParallelResearch,
}

impl Provider {
    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            Provider::Anthropic => "Claude",
            Provider::ParallelChat => "Parallel",
            Provider::ParallelResearch => "Parallel Deep Research",
        }
    }

    /// Whether this provider is keyed by the Parallel credential
    /// (as opposed to the Anthropic one)
    pub fn uses_parallel_key(&self) -> bool {
        matches!(self, Provider::ParallelChat | Provider::ParallelResearch)
    }

    /// Models selectable for this provider (id, label)
    pub fn models(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Provider::Anthropic => CLAUDE_MODELS,
            Provider::ParallelChat => PARALLEL_CHAT_MODELS,
            Provider::ParallelResearch => &[(RESEARCH_MODEL, "Parallel Deep Research")],
        }
    }

    /// Parse the kebab-case name used on the wire and in storage
    pub fn from_name(name: &str) -> Option<Provider> {
        match name {
            "anthropic" => Some(Provider::Anthropic),
            "parallel-chat" => Some(Provider::ParallelChat),
            "parallel-research" => Some(Provider::ParallelResearch),
            _ => None,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Provider::Anthropic => "anthropic",
            Provider::ParallelChat => "parallel-chat",
            Provider::ParallelResearch => "parallel-research",
        };
        write!(f, "{}", name)
    }
}

/// Look up the display label for a model id across all catalogs
pub fn model_label(model_id: &str) -> Option<&'static str> {
    CLAUDE_MODELS
        .iter()
        .chain(PARALLEL_CHAT_MODELS.iter())
        .find(|(id, _)| *id == model_id)
        .map(|(_, label)| *label)
}

/// Whether a Claude model accepts an extended-thinking budget.
/// Older models reject the `thinking` request field outright.
pub fn supports_extended_thinking(model_id: &str) -> bool {
    model_id.contains("claude-opus-4")
        || model_id.contains("claude-sonnet-4")
        || model_id.contains("claude-3-7")
}
