use std::sync::Arc;

use invoke_harness_core::{EntryTable, HandlerError, HandlerUnit, MockContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_GREETING: &str = "Hello";
pub const DEFAULT_NAME: &str = "World";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GreetingRequest {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GreetingResponse {
    pub message: String,
    pub request_id: String,
    pub function_name: String,
    pub memory_limit_in_mb: u32,
}

/// Asynchronous greeter. `handler` answers one request as JSON; `batch`
/// takes a list of requests, which the local harness cannot decode.
#[derive(Debug)]
pub struct Greeter {
    greeting: String,
}

impl HandlerUnit for Greeter {
    fn construct() -> Result<Self, HandlerError> {
        Ok(Self {
            greeting: DEFAULT_GREETING.to_string(),
        })
    }

    fn entry_points(table: &mut EntryTable<Self>) {
        table
            .handler_async("handler", Self::handler)
            .handler("batch", Self::batch);
    }
}

impl Greeter {
    pub async fn handler(
        self: Arc<Self>,
        request: GreetingRequest,
        context: MockContext,
    ) -> Result<Value, HandlerError> {
        // Yield once so the entry point really suspends before answering.
        tokio::task::yield_now().await;
        let response = self.greet(&request, &context);
        context.logger().log(format!("greeted {}", response.message));
        Ok(serde_json::to_value(response)?)
    }

    pub fn batch(
        &self,
        requests: Vec<GreetingRequest>,
        context: &MockContext,
    ) -> Result<Value, HandlerError> {
        let responses = requests
            .iter()
            .map(|request| self.greet(request, context))
            .collect::<Vec<_>>();
        Ok(serde_json::to_value(responses)?)
    }

    fn greet(&self, request: &GreetingRequest, context: &MockContext) -> GreetingResponse {
        let name = request
            .name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_NAME);
        GreetingResponse {
            message: format!("{}, {name}!", self.greeting),
            request_id: context.aws_request_id().to_string(),
            function_name: context.function_name().to_string(),
            memory_limit_in_mb: context.memory_limit_in_mb(),
        }
    }
}

#[cfg(test)]
mod tests {
    use invoke_harness_core::{build_context, ContextSettings};
    use serde_json::json;

    use super::*;

    fn greeter() -> Arc<Greeter> {
        Arc::new(Greeter::construct().expect("construct"))
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime")
            .block_on(future)
    }

    #[test]
    fn greets_named_caller_with_context_values() {
        let context = ContextSettings::new("greeter-fn", 300, None).build();
        let request = GreetingRequest {
            name: Some("Ada".to_string()),
        };

        let output = block_on(greeter().handler(request, context)).expect("handler");
        assert_eq!(
            output,
            json!({
                "message": "Hello, Ada!",
                "request_id": "AwsRequestId",
                "function_name": "greeter-fn",
                "memory_limit_in_mb": 256,
            })
        );
    }

    #[test]
    fn blank_name_falls_back_to_default() {
        let request = GreetingRequest {
            name: Some("  ".to_string()),
        };
        let output = block_on(greeter().handler(request, build_context())).expect("handler");
        assert_eq!(output["message"], json!("Hello, World!"));
    }

    #[test]
    fn batch_greets_each_request() {
        let requests = vec![
            GreetingRequest::default(),
            GreetingRequest {
                name: Some("Lin".to_string()),
            },
        ];
        let output = greeter().batch(requests, &build_context()).expect("batch");
        assert_eq!(output[0]["message"], json!("Hello, World!"));
        assert_eq!(output[1]["message"], json!("Hello, Lin!"));
    }
}
