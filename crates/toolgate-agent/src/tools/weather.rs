//! Weather lookup tool.
//!
//! The canonical confirmation-gated tool: it is declared to the model but
//! never auto-executed — every invocation waits for a human decision.

use std::hash::{DefaultHasher, Hash, Hasher};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{AgentError, Result};
use crate::tool::Tool;

/// The possible weather conditions the tool reports.
const WEATHER_OPTIONS: [&str; 4] = ["sunny", "cloudy", "rainy", "snowy"];

/// Fixed output substituted when the user denies a weather lookup.
const DENIED_OUTPUT: &str = "Error: User denied access to weather information";

/// Reports the weather in a given city.
///
/// The condition is derived from a hash of the city name, so repeated lookups
/// for the same city agree within a process run.
#[derive(Debug, Default)]
pub struct WeatherTool;

impl WeatherTool {
    /// Create the tool.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather_information"
    }

    fn description(&self) -> &str {
        "show the weather in a given city to the user"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": { "type": "string" }
            },
            "required": ["city"]
        })
    }

    fn requires_confirmation(&self) -> bool {
        true
    }

    fn denied_output(&self) -> Value {
        Value::String(DENIED_OUTPUT.to_owned())
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let city = input["city"]
            .as_str()
            .ok_or_else(|| AgentError::ValidationError {
                reason: "weather input requires a string `city` field".into(),
            })?;

        let mut hasher = DefaultHasher::new();
        city.hash(&mut hasher);
        let condition = WEATHER_OPTIONS[(hasher.finish() % WEATHER_OPTIONS.len() as u64) as usize];

        tracing::debug!(city, condition, "weather lookup");
        Ok(Value::String(condition.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn output_is_one_of_the_declared_conditions() {
        let tool = WeatherTool::new();
        let output = tool.execute(json!({"city": "Paris"})).await.unwrap();
        let condition = output.as_str().unwrap();
        assert!(WEATHER_OPTIONS.contains(&condition));
    }

    #[tokio::test]
    async fn same_city_same_condition() {
        let tool = WeatherTool::new();
        let first = tool.execute(json!({"city": "Oslo"})).await.unwrap();
        let second = tool.execute(json!({"city": "Oslo"})).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_city_is_a_validation_error() {
        let tool = WeatherTool::new();
        let result = tool.execute(json!({})).await;
        assert!(matches!(result, Err(AgentError::ValidationError { .. })));
    }

    #[test]
    fn confirmation_flag_and_denial_text() {
        let tool = WeatherTool::new();
        assert!(tool.requires_confirmation());
        assert_eq!(
            tool.denied_output(),
            json!("Error: User denied access to weather information")
        );
    }
}
