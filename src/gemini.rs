use anyhow::Context as _;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Sampling configuration sent with every request.
#[derive(Debug, Clone, Copy)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
        }
    }
}

pub fn generate_endpoint(base_url: &str, model: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/v1beta/models/{model}:generateContent")
}

/// One `generateContent` call; returns the concatenated text parts of the
/// first candidate.
pub async fn generate_text(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    prompt: &str,
    config: GenerationConfig,
) -> anyhow::Result<String> {
    let body = serde_json::json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "temperature": config.temperature,
            "topP": config.top_p,
            "topK": config.top_k,
            "maxOutputTokens": config.max_output_tokens,
        },
    });

    let response = client
        .post(endpoint)
        .query(&[("key", api_key)])
        .json(&body)
        .send()
        .await
        .with_context(|| format!("POST {endpoint}"))?;

    let status = response.status();
    let raw = response.text().await.context("read Gemini response body")?;
    if !status.is_success() {
        let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
        anyhow::bail!("Gemini API error ({status}): {message}");
    }

    let value: serde_json::Value = serde_json::from_str(&raw).context("parse Gemini response")?;
    extract_candidate_text(&value).context("extract candidate text")
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

fn extract_candidate_text(value: &serde_json::Value) -> anyhow::Result<String> {
    let parts = value
        .get("candidates")
        .and_then(|v| v.as_array())
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow::anyhow!("missing `candidates[0].content.parts` in response"))?;

    let mut text = String::new();
    for part in parts {
        if let Some(part_text) = part.get("text").and_then(|v| v.as_str()) {
            text.push_str(part_text);
        }
    }

    if text.trim().is_empty() {
        anyhow::bail!("Gemini candidate text is empty");
    }
    Ok(text)
}

/// Drops anything between `<` and `>`. The model occasionally wraps its
/// output in markup even when told not to.
pub fn strip_html_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
