//! Built-in tools available to every agent.

use std::sync::Arc;
use std::time::Duration;

use chrono::Timelike;
use serde_json::json;

use mori_core::tool::ParameterSchema;
use mori_core::{FunctionTool, Result, ToolResponse, Toolkit};

use crate::template::Clock;

/// Greeting for an hour of the day
pub fn greeting_for_hour(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Good morning",
        12..=13 => "Good noon",
        14..=17 => "Good afternoon",
        18..=21 => "Good evening",
        _ => "It's late",
    }
}

pub fn current_time_tool(clock: Arc<dyn Clock>) -> FunctionTool {
    FunctionTool::builder("get_current_time")
        .description("Get the current local date and time")
        .sync_handler(move |_call| {
            let now = clock.now();
            Ok(ToolResponse::text(format!("It is now {}", now.format("%Y-%m-%d %H:%M:%S"))))
        })
}

pub fn current_date_tool(clock: Arc<dyn Clock>) -> FunctionTool {
    FunctionTool::builder("get_current_date")
        .description("Get today's date and day of the week")
        .sync_handler(move |_call| {
            Ok(ToolResponse::text(format!("Today is {}", clock.now().format("%Y-%m-%d %A"))))
        })
}

pub fn greeting_tool(clock: Arc<dyn Clock>) -> FunctionTool {
    FunctionTool::builder("get_greeting")
        .description("Greet someone in a way that fits the time of day")
        .param(
            ParameterSchema::optional("name", "string", "How to address the person").with_default(json!("dear")),
        )
        .sync_handler(move |call| {
            let name = call.str_arg("name").unwrap_or("dear");
            let greeting = greeting_for_hour(clock.now().hour());
            Ok(ToolResponse::text(format!("{greeting}, {name}!")))
        })
}

/// Toolkit with every built-in tool registered
pub fn create_toolkit(clock: &Arc<dyn Clock>, timeout: Duration) -> Result<Toolkit> {
    let mut toolkit = Toolkit::new().with_timeout(timeout);
    toolkit.register(current_time_tool(Arc::clone(clock)))?;
    toolkit.register(current_date_tool(Arc::clone(clock)))?;
    toolkit.register(greeting_tool(Arc::clone(clock)))?;
    Ok(toolkit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::FixedClock;
    use mori_core::ToolCall;

    fn clock(hour: u32) -> Arc<dyn Clock> {
        Arc::new(FixedClock::at(2024, 3, 15, hour, 5, 9).unwrap())
    }

    #[test]
    fn test_greeting_bands() {
        assert_eq!(greeting_for_hour(4), "It's late");
        assert_eq!(greeting_for_hour(5), "Good morning");
        assert_eq!(greeting_for_hour(12), "Good noon");
        assert_eq!(greeting_for_hour(14), "Good afternoon");
        assert_eq!(greeting_for_hour(18), "Good evening");
        assert_eq!(greeting_for_hour(22), "It's late");
    }

    #[tokio::test]
    async fn test_builtin_toolkit() {
        let toolkit = create_toolkit(&clock(9), Duration::from_secs(5)).unwrap();
        assert_eq!(toolkit.names(), vec!["get_current_date", "get_current_time", "get_greeting"]);

        let time = toolkit.execute(&ToolCall::new("get_current_time")).await.unwrap();
        assert_eq!(time.to_text(), "It is now 2024-03-15 09:05:09");

        let date = toolkit.execute(&ToolCall::new("get_current_date")).await.unwrap();
        assert_eq!(date.to_text(), "Today is 2024-03-15 Friday");

        let hello = toolkit
            .execute(&ToolCall::new("get_greeting").with_arg("name", json!("Aki")))
            .await
            .unwrap();
        assert_eq!(hello.to_text(), "Good morning, Aki!");
    }

    #[tokio::test]
    async fn test_current_date_names_weekday() {
        let sunday: Arc<dyn Clock> = Arc::new(FixedClock::at(2024, 3, 17, 12, 0, 0).unwrap());
        let toolkit = create_toolkit(&sunday, Duration::from_secs(5)).unwrap();
        let date = toolkit.execute(&ToolCall::new("get_current_date")).await.unwrap();
        assert_eq!(date.to_text(), "Today is 2024-03-17 Sunday");
    }

    #[tokio::test]
    async fn test_greeting_default_name() {
        let toolkit = create_toolkit(&clock(23), Duration::from_secs(5)).unwrap();
        let hello = toolkit.execute(&ToolCall::new("get_greeting")).await.unwrap();
        assert_eq!(hello.to_text(), "It's late, dear!");
    }
}
