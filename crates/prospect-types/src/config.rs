//! Engine configuration types for Prospect.
//!
//! `EngineConfig` represents `config.toml`: debounce timing, batch pacing,
//! the topic pool, role-consistency phrases, and prompt templates. All
//! fields have defaults tuned for live training sessions; tests inject
//! shorter timings through the same struct.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Top-level configuration for the Prospect engine.
///
/// Loaded from `{data_dir}/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Quiet period after the last salesperson message before the buffered
    /// batch is dispatched, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Pause between consecutive replies within one batch, in milliseconds.
    #[serde(default = "default_send_spacing_ms")]
    pub send_spacing_ms: u64,

    /// How many recently used topics are excluded when sampling a new one
    /// for the same chat.
    #[serde(default = "default_recent_topic_window")]
    pub recent_topic_window: usize,

    /// Reply sent in place of a completion that failed outright.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,

    /// Case-insensitive phrases that mark a candidate reply as
    /// salesperson-voiced.
    #[serde(default = "default_forbidden_phrases")]
    pub forbidden_phrases: Vec<String>,

    /// Products and services the simulated customer can shop for.
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,

    /// System preamble seeded into every new session. `{topic}` is
    /// substituted with the session's assigned topic.
    #[serde(default = "default_preamble_template")]
    pub preamble_template: String,

    /// Corrective instruction appended to history after a role-consistency
    /// violation. `{topic}` is substituted.
    #[serde(default = "default_corrective_template")]
    pub corrective_template: String,

    /// Prompt asking the backend for an opening line. `{topic}` is
    /// substituted.
    #[serde(default = "default_greeting_prompt")]
    pub greeting_prompt: String,

    /// Opening line used when the backend cannot produce one. `{topic}` is
    /// substituted.
    #[serde(default = "default_greeting_fallback")]
    pub greeting_fallback: String,

    /// Sampling parameters passed to the completion backend.
    #[serde(default)]
    pub generation: GenerationParams,

    /// Outbound delivery settings.
    #[serde(default)]
    pub transport: TransportConfig,
}

impl EngineConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn send_spacing(&self) -> Duration {
        Duration::from_millis(self.send_spacing_ms)
    }

    /// Render the session preamble for an assigned topic.
    pub fn preamble_for(&self, topic: &str) -> String {
        self.preamble_template.replace("{topic}", topic)
    }

    /// Render the corrective role reminder for an assigned topic.
    pub fn corrective_for(&self, topic: &str) -> String {
        self.corrective_template.replace("{topic}", topic)
    }

    /// Render the greeting request prompt for an assigned topic.
    pub fn greeting_prompt_for(&self, topic: &str) -> String {
        self.greeting_prompt.replace("{topic}", topic)
    }

    /// Render the static greeting used when generation fails.
    pub fn greeting_fallback_for(&self, topic: &str) -> String {
        self.greeting_fallback.replace("{topic}", topic)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            send_spacing_ms: default_send_spacing_ms(),
            recent_topic_window: default_recent_topic_window(),
            fallback_reply: default_fallback_reply(),
            forbidden_phrases: default_forbidden_phrases(),
            topics: default_topics(),
            preamble_template: default_preamble_template(),
            corrective_template: default_corrective_template(),
            greeting_prompt: default_greeting_prompt(),
            greeting_fallback: default_greeting_fallback(),
            generation: GenerationParams::default(),
            transport: TransportConfig::default(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    10_000
}

fn default_send_spacing_ms() -> u64 {
    500
}

fn default_recent_topic_window() -> usize {
    5
}

fn default_fallback_reply() -> String {
    "Sorry, I'm having trouble responding right now. Can you say that again?".to_string()
}

fn default_forbidden_phrases() -> Vec<String> {
    [
        "how can i help you",
        "what are you looking for",
        "let me show you",
        "welcome to our store",
        "can i assist you",
        "what brings you in today",
        "are you looking for anything specific",
        "how may i help",
        "what can i do for you",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_preamble_template() -> String {
    "You are a CUSTOMER in a sales conversation. You are NOT the salesperson \
     and you must never act as one.\n\n\
     You came here to buy something. The salesperson serves YOUR needs: ask \
     about the product you want, react to prices and offers, voice your \
     concerns, and decide whether to buy. Never offer help, never ask what \
     the other person is looking for, and never greet them as if they walked \
     into your store. Stay in the customer mindset even if the conversation \
     gets confusing.\n\n\
     Keep replies brief and natural, usually 1-3 sentences, in casual spoken \
     English.\n\n\
     ## FOR THIS CONVERSATION:\n\
     You are interested in buying: {topic}\n\
     Start the conversation by expressing interest in this product when the \
     salesperson greets you."
        .to_string()
}

fn default_corrective_template() -> String {
    "CRITICAL REMINDER: YOU ARE THE CUSTOMER, NOT THE SALESPERSON. You came \
     here to buy {topic}. Express what YOU need or ask questions about the \
     product YOU want to buy. Do NOT offer help or ask what the salesperson \
     is looking for!"
        .to_string()
}

fn default_greeting_prompt() -> String {
    "You are a customer interested in buying {topic}. Generate a brief, \
     natural greeting (1-2 sentences) expressing interest in this product."
        .to_string()
}

fn default_greeting_fallback() -> String {
    "Hi! I'm interested in buying {topic}. Can you help me find the right one?".to_string()
}

fn default_topics() -> Vec<String> {
    [
        // Electronics
        "a new laptop for work",
        "wireless headphones",
        "a smartwatch",
        "a gaming console",
        "a tablet",
        "a camera",
        "a fitness tracker",
        "a Bluetooth speaker",
        "a drone",
        "noise-cancelling earbuds",
        "a monitor",
        "an e-reader",
        "a power bank",
        // Clothing
        "jeans",
        "running shoes",
        "a winter jacket",
        "a formal dress",
        "sneakers",
        "gym clothes",
        "a suit",
        "boots",
        "a leather jacket",
        "workout gear",
        // Home and furniture
        "a couch",
        "a mattress",
        "an office chair",
        "a desk",
        "a coffee table",
        "bedroom furniture",
        "a rug",
        "curtains",
        "a bookshelf",
        "lighting fixtures",
        // Kitchen
        "a coffee machine",
        "an air fryer",
        "a blender",
        "cookware",
        "a microwave",
        "kitchen knives",
        "a toaster",
        "a food processor",
        "a slow cooker",
        // Sports and fitness
        "gym equipment",
        "a yoga mat",
        "weights",
        "a bicycle",
        "a treadmill",
        "resistance bands",
        "a punching bag",
        "swimming gear",
        // Beauty and personal care
        "skincare products",
        "a hair dryer",
        "makeup",
        "perfume",
        "an electric shaver",
        // Automotive
        "car accessories",
        "a dash cam",
        "tires",
        "a GPS",
        "car cleaning supplies",
        // Books and media
        "books",
        "an audiobook subscription",
        "educational courses",
        // Health and wellness
        "vitamins",
        "protein powder",
        "supplements",
        "a massage gun",
        // Hobbies
        "a guitar",
        "art supplies",
        "board games",
        "gardening tools",
        "fishing gear",
        "craft supplies",
        "camping equipment",
        // Baby and kids
        "a stroller",
        "toys",
        "kids' shoes",
        "a baby monitor",
        "school supplies",
        // Pets
        "dog food",
        "a cat tree",
        "pet toys",
        "a fish tank",
        "pet grooming supplies",
        // Home improvement and tools
        "power tools",
        "a vacuum cleaner",
        "a lawn mower",
        "paint supplies",
        "a robot vacuum",
        "smart home devices",
        // Services
        "a gym membership",
        "online courses",
        "meal prep subscription",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Sampling parameters for the completion backend.
///
/// Defaults match a chatty, slightly repetition-averse customer persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_top_p")]
    pub top_p: f64,

    #[serde(default = "default_frequency_penalty")]
    pub frequency_penalty: f64,

    #[serde(default = "default_presence_penalty")]
    pub presence_penalty: f64,

    /// Generation halts if the model starts scripting the other side's
    /// lines.
    #[serde(default = "default_stop_sequences")]
    pub stop_sequences: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            frequency_penalty: default_frequency_penalty(),
            presence_penalty: default_presence_penalty(),
            stop_sequences: default_stop_sequences(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    150
}

fn default_temperature() -> f64 {
    0.85
}

fn default_top_p() -> f64 {
    0.92
}

fn default_frequency_penalty() -> f64 {
    0.5
}

fn default_presence_penalty() -> f64 {
    0.5
}

fn default_stop_sequences() -> Vec<String> {
    [
        "Salesperson:",
        "Sales person:",
        "Agent:",
        "SALESPERSON:",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Where outbound replies are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// In-process broadcast channels, consumed by the SSE event stream.
    Channel,
    /// HTTP POST of each reply to a configured receiver.
    Webhook,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Channel => write!(f, "channel"),
            TransportMode::Webhook => write!(f, "webhook"),
        }
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "channel" => Ok(TransportMode::Channel),
            "webhook" => Ok(TransportMode::Webhook),
            other => Err(format!("invalid transport mode: '{other}'")),
        }
    }
}

impl Default for TransportMode {
    fn default() -> Self {
        TransportMode::Channel
    }
}

/// Outbound delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TransportConfig {
    #[serde(default)]
    pub mode: TransportMode,

    /// Receiver endpoint, required when `mode = "webhook"`.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default_values() {
        let config = EngineConfig::default();
        assert_eq!(config.debounce_ms, 10_000);
        assert_eq!(config.send_spacing_ms, 500);
        assert_eq!(config.recent_topic_window, 5);
        assert_eq!(config.forbidden_phrases.len(), 9);
        assert_eq!(config.topics.len(), 93);
        assert_eq!(config.transport.mode, TransportMode::Channel);
    }

    #[test]
    fn test_engine_config_deserialize_with_defaults() {
        let toml_str = "";
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.debounce_ms, 10_000);
        assert_eq!(config.generation.model, "gpt-4o-mini");
        assert!(config.transport.webhook_url.is_none());
    }

    #[test]
    fn test_engine_config_deserialize_with_values() {
        let toml_str = r#"
debounce_ms = 250
send_spacing_ms = 20
topics = ["a kayak", "a espresso grinder"]

[generation]
model = "gpt-4o"
temperature = 0.5

[transport]
mode = "webhook"
webhook_url = "http://localhost:9000/replies"
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.send_spacing_ms, 20);
        assert_eq!(config.topics.len(), 2);
        assert_eq!(config.generation.model, "gpt-4o");
        assert!((config.generation.temperature - 0.5).abs() < f64::EPSILON);
        // Unspecified generation fields keep their defaults.
        assert_eq!(config.generation.max_tokens, 150);
        assert_eq!(config.transport.mode, TransportMode::Webhook);
        assert_eq!(
            config.transport.webhook_url.as_deref(),
            Some("http://localhost:9000/replies")
        );
    }

    #[test]
    fn test_duration_helpers() {
        let config = EngineConfig {
            debounce_ms: 1500,
            send_spacing_ms: 40,
            ..EngineConfig::default()
        };
        assert_eq!(config.debounce(), Duration::from_millis(1500));
        assert_eq!(config.send_spacing(), Duration::from_millis(40));
    }

    #[test]
    fn test_template_substitution() {
        let config = EngineConfig::default();
        let preamble = config.preamble_for("a drone");
        assert!(preamble.contains("You are interested in buying: a drone"));
        assert!(!preamble.contains("{topic}"));

        let corrective = config.corrective_for("a drone");
        assert!(corrective.contains("buy a drone"));

        let greeting = config.greeting_fallback_for("a drone");
        assert_eq!(
            greeting,
            "Hi! I'm interested in buying a drone. Can you help me find the right one?"
        );
    }

    #[test]
    fn test_generation_params_defaults() {
        let params = GenerationParams::default();
        assert_eq!(params.max_tokens, 150);
        assert!((params.temperature - 0.85).abs() < f64::EPSILON);
        assert!((params.top_p - 0.92).abs() < f64::EPSILON);
        assert_eq!(params.stop_sequences.len(), 4);
    }

    #[test]
    fn test_transport_mode_roundtrip() {
        for mode in [TransportMode::Channel, TransportMode::Webhook] {
            let s = mode.to_string();
            let parsed: TransportMode = s.parse().unwrap();
            assert_eq!(mode, parsed);
        }
    }

    #[test]
    fn test_engine_config_serde_roundtrip() {
        let config = EngineConfig {
            debounce_ms: 123,
            ..EngineConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.debounce_ms, 123);
        assert_eq!(parsed.topics.len(), config.topics.len());
    }
}
