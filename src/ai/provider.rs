//! Provider configuration and request payloads
//!
//! Both inference providers speak the same chat-completions dialect with
//! small differences (credential header, token-cap field name, whether a
//! system role is accepted). [`ProviderConfig`] captures those differences so
//! a single transport can serve every provider.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// Per-attempt request timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// How the credential is presented to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum CredentialScheme {
    /// Raw key in a named header, e.g. `api-key: <key>`
    Header { name: String },
    /// `Authorization: Bearer <key>`
    Bearer,
}

impl CredentialScheme {
    /// Header name and value carrying `credential`
    pub fn header(&self, credential: &str) -> (String, String) {
        match self {
            CredentialScheme::Header { name } => (name.clone(), credential.to_string()),
            CredentialScheme::Bearer => {
                ("Authorization".to_string(), format!("Bearer {}", credential))
            }
        }
    }
}

/// Where the system prompt goes in the message list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptPlacement {
    /// A leading `system` message
    SystemMessage,
    /// A leading `user` message, for models that reject the system role
    LeadingUserMessage,
}

/// Everything needed to talk to one provider
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub credential: Option<String>,
    pub credential_scheme: CredentialScheme,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    /// `max_tokens`, or a provider equivalent such as `max_completion_tokens`
    pub token_limit_field: String,
    pub token_limit: u32,
    pub prompt_placement: PromptPlacement,
    /// Opaque; sent exactly as configured
    pub system_prompt: String,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            credential: None,
            credential_scheme: CredentialScheme::Bearer,
            model: None,
            temperature: None,
            token_limit_field: "max_tokens".to_string(),
            token_limit: 1000,
            prompt_placement: PromptPlacement::SystemMessage,
            system_prompt: String::new(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The credential, if present and non-blank
    pub fn usable_credential(&self) -> Option<&str> {
        self.credential
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Why this provider cannot be called, or `None` when it can
    pub fn unconfigured_reason(&self) -> Option<String> {
        if self.endpoint.trim().is_empty() {
            return Some(format!("{}: endpoint is not set", self.name));
        }
        if self.usable_credential().is_none() {
            return Some(format!("{}: credential is not set", self.name));
        }
        None
    }

    pub fn is_configured(&self) -> bool {
        self.unconfigured_reason().is_none()
    }

    /// Headers for a call, including the credential header
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(credential) = self.usable_credential() {
            headers.push(self.credential_scheme.header(credential));
        }
        headers
    }

    /// Builds the request body for a single user message
    pub fn payload(&self, user_message: impl Into<String>) -> ChatPayload {
        let mut messages = Vec::with_capacity(2);
        if !self.system_prompt.is_empty() {
            let role = match self.prompt_placement {
                PromptPlacement::SystemMessage => "system",
                PromptPlacement::LeadingUserMessage => "user",
            };
            messages.push(Message::new(role, self.system_prompt.clone()));
        }
        messages.push(Message::new("user", user_message));

        ChatPayload {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            token_limit_field: self.token_limit_field.clone(),
            token_limit: self.token_limit,
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field(
                "credential",
                &self.usable_credential().map(|_| "<redacted>"),
            )
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Chat message in the provider request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Request body sent to a provider
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPayload {
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub temperature: Option<f64>,
    pub token_limit_field: String,
    pub token_limit: u32,
}

impl ChatPayload {
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        if let Some(model) = &self.model {
            body.insert("model".to_string(), Value::String(model.clone()));
        }
        body.insert(
            "messages".to_string(),
            Value::Array(
                self.messages
                    .iter()
                    .map(|m| serde_json::json!({ "role": m.role, "content": m.content }))
                    .collect(),
            ),
        );
        if let Some(temperature) = self.temperature {
            body.insert("temperature".to_string(), serde_json::json!(temperature));
        }
        body.insert(
            self.token_limit_field.clone(),
            Value::from(self.token_limit),
        );
        Value::Object(body)
    }
}
