//! HTTP-backed oracle speaking the OpenAI-compatible chat-completions
//! shape. Transport only — retry policy lives in the resolver, which sees
//! throttling and network faults as retryable [`OracleError`] variants.

use crate::oracle::{Oracle, OracleError, Verdict, parse_verdict};
use crate::{Round, Team};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_TOKENS: u32 = 4096;

const SYSTEM_PROMPT: &str = "\
You are an expert NCAA basketball analyst tasked with predicting March Madness tournament outcomes.

For each matchup, analyze both teams objectively and make a final prediction on which team will win.

Your response MUST follow this exact format:

ANALYSIS:
[Your detailed analysis of both teams, comparing their strengths and weaknesses]

REASONING:
[Your reasoning for why one team has an advantage over the other]

PREDICTION:
[EXACT team name - just the name of the winning team, nothing else]

IMPORTANT: In the PREDICTION section, provide ONLY the exact name of the winning team. Do not include any additional text, explanations, or qualifiers in this section.";

/// Oracle backed by a chat-completions endpoint. One request per
/// prediction, no conversation state.
#[derive(Debug, Clone)]
pub struct LlmOracle {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    temperature: f32,
    max_tokens: u32,
}

impl LlmOracle {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent("mmbracket/0.1 (bracket generator)")
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut request = self.client.post(&self.endpoint).timeout(self.timeout).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| OracleError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(OracleError::Throttled(format!("{status} from {}", self.endpoint)));
        }
        if status.is_client_error() {
            return Err(OracleError::InvalidRequest(format!("{status} from {}", self.endpoint)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(format!("{}: {e}", self.endpoint)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                OracleError::InvalidResponse(format!("empty completion from {}", self.endpoint))
            })
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn predict(
        &self,
        team1: &Team,
        team2: &Team,
        round: Round,
    ) -> Result<Verdict, OracleError> {
        let prompt = matchup_prompt(team1, team2, round);
        debug!("asking {} about {} vs {}", self.model, team1.name, team2.name);
        let raw = self.complete(&prompt).await?;
        Ok(parse_verdict(&raw))
    }
}

fn matchup_prompt(team1: &Team, team2: &Team, round: Round) -> String {
    format!(
        "NCAA March Madness - {round} Matchup\n\n\
         Team 1: {team1}\n\
         Team 2: {team2}\n\n\
         Analyze both teams and predict which team will win this {round} matchup.\n\n\
         Remember to follow the exact format:\n\
         1. ANALYSIS: (detailed comparison)\n\
         2. REASONING: (why one team has the advantage)\n\
         3. PREDICTION: (ONLY the exact name of the winning team - either \"{}\" or \"{}\")\n\n\
         Your prediction must be clear and unambiguous.",
        team1.name, team2.name,
    )
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: ChatResponseMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}
