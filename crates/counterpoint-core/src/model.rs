//! Domain model shared by the pipeline and its callers.
//!
//! External payloads are validated at the collaborator boundary (see
//! [`crate::search::RawCandidate`] and [`crate::verifier::RawVerdict`]); the
//! types in this module are the strict internal representation.

use serde::{Deserialize, Serialize};

use crate::search::normalize_query;

/// Rhetorical family of a counter-argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentKind {
    #[serde(alias = "ethical", alias = "ETHICAL")]
    Ethical,
    #[serde(alias = "empirical", alias = "EMPIRICAL")]
    Empirical,
    #[serde(alias = "logical", alias = "LOGICAL")]
    Logical,
}

impl ArgumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgumentKind::Ethical => "Ethical",
            ArgumentKind::Empirical => "Empirical",
            ArgumentKind::Logical => "Logical",
        }
    }
}

impl std::fmt::Display for ArgumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A media item suggested in support of a counter-argument.
///
/// Candidates are value objects; `url` is the only identity they carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoCandidate {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    /// Authority baseline from search, overwritten by verification.
    #[serde(default)]
    pub relevance_score: Option<f32>,
}

impl VideoCandidate {
    pub fn score(&self) -> f32 {
        self.relevance_score.unwrap_or(0.0)
    }
}

/// A generated position opposing a claim from the analysed content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterArgument {
    #[serde(rename = "type")]
    pub kind: ArgumentKind,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub source_reference: Option<String>,
    /// Search query for supporting media. `None` or blank means the argument
    /// is skipped by the pipeline.
    #[serde(default, alias = "youtube_query")]
    pub query: Option<String>,
    #[serde(default)]
    pub suggested_videos: Vec<VideoCandidate>,
    #[serde(default)]
    pub semantic_contrast_score: Option<f32>,
}

impl CounterArgument {
    pub fn new(
        kind: ArgumentKind,
        title: impl Into<String>,
        content: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            content: content.into(),
            source_reference: None,
            query: Some(query.into()),
            suggested_videos: Vec::new(),
            semantic_contrast_score: None,
        }
    }

    /// Cleaned query, or `None` when nothing searchable remains.
    pub fn search_query(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(normalize_query)
            .filter(|query| !query.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinedOpinion {
    pub target: String,
    pub assessment: String,
    pub sentiment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedClaim {
    pub text: String,
    pub sentiment: String,
    pub confidence_score: f32,
    #[serde(default)]
    pub opinions: Vec<MinedOpinion>,
}

/// Metadata of the analysed source media, injected after reasoning.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub video_title: String,
    pub channel_name: String,
    pub duration: String,
    pub view_count: String,
    pub upload_date: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// Aggregate root: one analysed piece of content and its counter-arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub video_url: String,
    #[serde(default)]
    pub topic_summary: String,
    #[serde(default)]
    pub overall_sentiment: String,
    #[serde(default)]
    pub claims: Vec<ExtractedClaim>,
    #[serde(default)]
    pub counter_arguments: Vec<CounterArgument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_metadata: Option<VideoMetadata>,
}

impl AnalysisResult {
    pub fn new(video_url: impl Into<String>, counter_arguments: Vec<CounterArgument>) -> Self {
        Self {
            video_url: video_url.into(),
            topic_summary: String::new(),
            overall_sentiment: String::new(),
            claims: Vec::new(),
            counter_arguments,
            video_metadata: None,
        }
    }
}

/// Accept/reject judgment of the verification scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Accept,
    Reject,
}

impl Verdict {
    /// Anything other than `accept` is a rejection.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("accept") {
            Verdict::Accept
        } else {
            Verdict::Reject
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Accept => "accept",
            Verdict::Reject => "reject",
        }
    }
}

/// Normalised relevance judgment for one (argument, candidate) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationVerdict {
    pub score: f32,
    pub verdict: Verdict,
    pub reason: String,
    /// Set when the scorer failed and the neutral verdict was substituted.
    #[serde(default)]
    pub degraded: bool,
}

impl VerificationVerdict {
    pub const NEUTRAL_SCORE: f32 = 0.65;
    pub const NEUTRAL_REASON: &'static str = "verification unavailable";

    pub fn neutral() -> Self {
        Self {
            score: Self::NEUTRAL_SCORE,
            verdict: Verdict::Accept,
            reason: Self::NEUTRAL_REASON.to_string(),
            degraded: true,
        }
    }
}

/// Fill blank queries produced by the reasoning service.
///
/// Applied by callers before orchestration; the orchestrator itself never
/// invents queries. Returns the number of arguments repaired.
pub fn repair_missing_queries(result: &mut AnalysisResult) -> usize {
    let mut repaired = 0;
    for argument in result.counter_arguments.iter_mut() {
        if argument.search_query().is_some() {
            continue;
        }

        let keywords = argument
            .title
            .split_whitespace()
            .take(4)
            .collect::<Vec<_>>()
            .join(" ");
        let query = if keywords.is_empty() {
            format!("{} counter argument research", argument.kind)
        } else {
            format!("{keywords} {} perspective research analysis", argument.kind)
        };

        tracing::debug!(kind = %argument.kind, %query, "repaired missing counter-argument query");
        argument.query = Some(query);
        repaired += 1;
    }
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_upstream_payload() {
        let payload = serde_json::json!({
            "video_url": "https://example.com/watch?v=1",
            "topic_summary": "Urban transit",
            "overall_sentiment": "positive",
            "claims": [{
                "text": "Trams reduce congestion",
                "sentiment": "positive",
                "confidence_score": 0.9,
                "opinions": [{"target": "trams", "assessment": "efficient", "sentiment": "positive"}]
            }],
            "counter_arguments": [{
                "type": "Empirical",
                "title": "Ridership data",
                "content": "Ridership has plateaued.",
                "youtube_query": "tram ridership study",
                "semantic_contrast_score": 0.85
            }]
        });

        let result: AnalysisResult = serde_json::from_value(payload).unwrap();
        let argument = &result.counter_arguments[0];
        assert_eq!(argument.kind, ArgumentKind::Empirical);
        assert_eq!(argument.query.as_deref(), Some("tram ridership study"));
        assert!(argument.suggested_videos.is_empty());
        assert_eq!(result.claims[0].opinions.len(), 1);
    }

    #[test]
    fn search_query_rejects_blank_and_quote_only() {
        let mut argument = CounterArgument::new(ArgumentKind::Logical, "t", "c", "   ");
        assert_eq!(argument.search_query(), None);

        argument.query = Some("\"''\"".into());
        assert_eq!(argument.search_query(), None);

        argument.query = None;
        assert_eq!(argument.search_query(), None);

        argument.query = Some(" \"causal inference\" ".into());
        assert_eq!(argument.search_query().as_deref(), Some("causal inference"));
    }

    #[test]
    fn repair_builds_query_from_title_and_kind() {
        let mut blank = CounterArgument::new(
            ArgumentKind::Ethical,
            "Liberty versus collective security trade-off",
            "c",
            "",
        );
        blank.query = None;
        let untitled = CounterArgument::new(ArgumentKind::Logical, "", "c", " ");
        let fine = CounterArgument::new(ArgumentKind::Empirical, "x", "c", "already set");

        let mut result = AnalysisResult::new("u", vec![blank, untitled, fine]);
        assert_eq!(repair_missing_queries(&mut result), 2);

        let queries: Vec<_> = result
            .counter_arguments
            .iter()
            .map(|a| a.query.clone().unwrap())
            .collect();
        assert_eq!(
            queries[0],
            "Liberty versus collective security Ethical perspective research analysis"
        );
        assert_eq!(queries[1], "Logical counter argument research");
        assert_eq!(queries[2], "already set");
    }

    #[test]
    fn verdict_parse_is_lenient_about_case() {
        assert_eq!(Verdict::parse(" Accept "), Verdict::Accept);
        assert_eq!(Verdict::parse("reject"), Verdict::Reject);
        assert_eq!(Verdict::parse("maybe"), Verdict::Reject);
    }
}
