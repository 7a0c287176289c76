use serde_json::{Value, json};

use crate::insight::{
    error::{ProviderError, ProviderErrorKind},
    types::{ConversationTurn, Role},
};

pub fn role_to_wire(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// System prompt first, then the turns in order.
pub fn turns_to_openai(system_prompt: &str, turns: &[ConversationTurn]) -> Vec<Value> {
    let mut messages = Vec::with_capacity(turns.len() + 1);
    if !system_prompt.is_empty() {
        messages.push(json!({"role": "system", "content": system_prompt}));
    }
    messages.extend(turns.iter().map(|turn| {
        json!({
            "role": role_to_wire(turn.role),
            "content": turn.content,
        })
    }));
    messages
}

pub fn map_http_error(status: u16, provider_id: &str, body: &str) -> ProviderError {
    let normalized_body = body.chars().take(240).collect::<String>();

    let mut err = if status == 401 {
        ProviderError::new(ProviderErrorKind::Authentication, "authentication failed")
            .with_retryable(false)
    } else if status == 403 {
        ProviderError::new(ProviderErrorKind::Authorization, "authorization failed")
            .with_retryable(false)
    } else if status == 408 || status == 429 {
        ProviderError::new(
            ProviderErrorKind::RateLimited,
            format!("provider returned status {}", status),
        )
        .with_retryable(true)
    } else if (400..500).contains(&status) {
        ProviderError::new(
            ProviderErrorKind::InvalidRequest,
            format!("provider returned status {}", status),
        )
        .with_retryable(false)
    } else {
        ProviderError::new(
            ProviderErrorKind::ProviderTransient,
            format!("provider returned status {}", status),
        )
        .with_retryable(true)
    };

    err = err
        .with_provider_id(provider_id)
        .with_provider_http_status(status);

    if !normalized_body.is_empty() {
        err.message = format!("{}: {}", err.message, normalized_body);
    }

    err
}
