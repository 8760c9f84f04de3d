use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// OpenAI-compatible chat client used for focus extraction and tone narration.
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl LlmClient {
    /// Build a client when `LLM_BASE_URL` or `LLM_API_KEY` is set.
    /// Returns `Ok(None)` when neither is, so callers run without narration.
    pub fn from_env() -> Result<Option<Self>> {
        let base_url = dotenv::var("LLM_BASE_URL").ok().filter(|u| !u.is_empty());
        let api_key = dotenv::var("LLM_API_KEY").ok().filter(|k| !k.is_empty());
        if base_url.is_none() && api_key.is_none() {
            return Ok(None);
        }

        let base_url = base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        let model = dotenv::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Some(Self {
            client,
            base_url,
            model,
            api_key,
        }))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Resolve the chat completions endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    /// Non-streaming chat completion.
    pub async fn chat(&self, messages: &[Message], max_tokens: u32) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.3,
            "max_tokens": max_tokens,
        });

        let mut req = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let resp = req.send().await.context("LLM request failed")?;
        let status = resp.status();
        let text = resp.text().await.context("Failed to read LLM response")?;
        if !status.is_success() {
            anyhow::bail!("LLM returned {}: {}", status, text.chars().take(200).collect::<String>());
        }
        let json: serde_json::Value =
            serde_json::from_str(&text).context("Failed to parse LLM JSON")?;

        // choices[0].message.content may be null
        let content = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .unwrap_or("")
            .trim()
            .to_string();

        Ok(content)
    }

    /// System + user prompt, reply parsed as a JSON object.
    pub async fn chat_json(&self, system: &str, prompt: &str, max_tokens: u32) -> Result<serde_json::Value> {
        let reply = self
            .chat(&[Message::system(system), Message::user(prompt)], max_tokens)
            .await?;
        serde_json::from_str(strip_code_fences(&reply)).context("LLM reply was not valid JSON")
    }
}

/// Drop a surrounding ```json ... ``` fence if the model added one.
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"b\": 2} "), "{\"b\": 2}");
    }
}
