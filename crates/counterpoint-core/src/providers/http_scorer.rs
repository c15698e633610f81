use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::config::ScorerConfig;
use crate::error::PipelineError;
use crate::security::SecretValue;
use crate::verifier::{RawVerdict, VerificationScorer};

/// Verification scorer reached over HTTP.
///
/// POSTs the pair as JSON and expects `{score?, verdict?, reason?}` back.
#[derive(Clone)]
pub struct HttpVerificationScorer {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretValue>,
    description_chars: usize,
}

#[derive(Debug, Serialize, PartialEq)]
struct ScoreRequest<'a> {
    argument_text: &'a str,
    candidate_title: &'a str,
    candidate_description: String,
}

impl HttpVerificationScorer {
    pub fn new(config: &ScorerConfig, api_key: Option<SecretValue>) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| {
                PipelineError::InvalidConfiguration(format!("failed to build scorer client: {err}"))
            })?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key,
            description_chars: config.description_chars,
        })
    }

    fn request<'a>(&self, argument_text: &'a str, candidate_title: &'a str, description: &str) -> ScoreRequest<'a> {
        ScoreRequest {
            argument_text,
            candidate_title,
            candidate_description: description.chars().take(self.description_chars).collect(),
        }
    }
}

#[async_trait]
impl VerificationScorer for HttpVerificationScorer {
    async fn score(
        &self,
        argument_text: &str,
        candidate_title: &str,
        candidate_description: &str,
    ) -> Result<RawVerdict, PipelineError> {
        let body = self.request(argument_text, candidate_title, candidate_description);
        debug!(endpoint = %self.endpoint, title = %candidate_title, "scorer request");

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose());
        }

        let response = request
            .send()
            .await
            .map_err(|err| PipelineError::degraded(format!("scorer request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PipelineError::degraded(format!(
                "scorer returned {status}: {message}"
            )));
        }

        response
            .json::<RawVerdict>()
            .await
            .map_err(|err| PipelineError::degraded(format!("unparsable scorer response: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_description_to_configured_chars() {
        let config = ScorerConfig {
            description_chars: 5,
            ..ScorerConfig::default()
        };
        let scorer = HttpVerificationScorer::new(&config, None).unwrap();

        let request = scorer.request("argument", "title", "déjà vu all over again");
        assert_eq!(request.candidate_description, "déjà ");
        assert_eq!(request.argument_text, "argument");
    }

    #[test]
    fn keeps_bearer_token_out_of_debug_output() {
        let scorer =
            HttpVerificationScorer::new(&ScorerConfig::default(), Some(SecretValue::new("tok-xyz")))
                .unwrap();
        let key = scorer.api_key.as_ref().unwrap();
        assert_eq!(key.expose(), "tok-xyz");
        assert!(!format!("{key:?}").contains("tok-xyz"));
    }

    #[test]
    fn raw_verdict_accepts_partial_payloads() {
        let verdict: RawVerdict = serde_json::from_str(r#"{"score": 0.8}"#).unwrap();
        assert_eq!(verdict.score, Some(0.8));
        assert!(verdict.verdict.is_none());

        let verdict: RawVerdict = serde_json::from_str(r#"{"verdict": "reject", "extra": 1}"#).unwrap();
        assert_eq!(verdict.verdict.as_deref(), Some("reject"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades() {
        let config = ScorerConfig {
            endpoint: "http://127.0.0.1:9/verify".to_string(),
            timeout_ms: 500,
            ..ScorerConfig::default()
        };
        let scorer = HttpVerificationScorer::new(&config, None).unwrap();

        let err = scorer.score("a", "t", "d").await.unwrap_err();
        assert!(matches!(err, PipelineError::VerifierDegraded(_)));
    }
}
