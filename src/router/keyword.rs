//! Keyword routing strategy
//!
//! Fast, deterministic routing using substring matching on the lowercased
//! message. No model call is made for weather questions; the formatted
//! weather text is returned verbatim.

use super::{
    Branch, CLARIFICATION_PROMPT, CityExtractor, IntentRouter, RouteReply, chat_reply,
};
use crate::config::RoutingStrategy;
use crate::llm::ChatModel;
use crate::weather::WeatherLookup;
use async_trait::async_trait;
use std::sync::Arc;

/// Built-in weather vocabulary
pub const DEFAULT_WEATHER_KEYWORDS: &[&str] = &[
    "weather",
    "temperature",
    "forecast",
    "climate",
    "rain",
    "raining",
    "rainy",
    "rainfall",
    "humidity",
    "humid",
    "hot",
    "cold",
    "warm",
    "cool",
    "sunny",
    "cloudy",
    "cloud",
    "clouds",
    "wind",
    "windy",
    "storm",
    "stormy",
    "snow",
    "snowing",
    "snowy",
];

/// Substring classifier over a fixed keyword set
///
/// Matching is plain substring containment, so "school" contains "cool".
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    /// Keywords are lowercased once here
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_WEATHER_KEYWORDS)
    }

    /// True iff the lowercased message contains any keyword
    pub fn is_weather_related(&self, message: &str) -> bool {
        let lowered = message.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

/// What the keyword strategy will do with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordDecision {
    /// Weather question naming a city
    Lookup(String),
    /// Weather question without a recognisable city
    AskForCity,
    /// Everything else
    Chat,
}

/// Decide without performing any I/O
pub fn decide(
    classifier: &KeywordClassifier,
    extractor: &CityExtractor,
    message: &str,
) -> KeywordDecision {
    if !classifier.is_weather_related(message) {
        return KeywordDecision::Chat;
    }
    match extractor.extract(message) {
        Some(city) => KeywordDecision::Lookup(city),
        None => KeywordDecision::AskForCity,
    }
}

/// Router using the keyword heuristic and regex city extraction
pub struct KeywordRouter {
    classifier: KeywordClassifier,
    extractor: CityExtractor,
    weather: Arc<dyn WeatherLookup>,
    model: Arc<dyn ChatModel>,
}

impl KeywordRouter {
    pub fn new(
        classifier: KeywordClassifier,
        extractor: CityExtractor,
        weather: Arc<dyn WeatherLookup>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            classifier,
            extractor,
            weather,
            model,
        }
    }
}

#[async_trait]
impl IntentRouter for KeywordRouter {
    async fn route(&self, message: &str) -> RouteReply {
        let strategy = RoutingStrategy::Keyword;

        match decide(&self.classifier, &self.extractor, message) {
            KeywordDecision::Lookup(city) => {
                tracing::info!(city = %city, branch = "weather", "Keyword router matched weather question");
                let text = self.weather.fetch_text(&city).await;
                RouteReply::new(text, Branch::Weather, strategy)
            }
            KeywordDecision::AskForCity => {
                tracing::info!(branch = "weather", "Weather question without a city");
                RouteReply::new(CLARIFICATION_PROMPT, Branch::Weather, strategy)
            }
            KeywordDecision::Chat => {
                tracing::debug!(branch = "chat", "No weather keyword, forwarding to model");
                let text = chat_reply(self.model.as_ref(), message).await;
                RouteReply::new(text, Branch::Chat, strategy)
            }
        }
    }

    fn strategy(&self) -> RoutingStrategy {
        RoutingStrategy::Keyword
    }
}
