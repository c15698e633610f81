use crate::search::RawCandidate;

const BASE_SCORE: f32 = 0.5;
const CATEGORY_BOOST: f32 = 0.3;
const CHANNEL_BOOST: f32 = 0.2;
const AUTHORITATIVE_CATEGORIES: &[&str] =
    &["News", "Education", "Documentary", "Science & Technology"];
const INSTITUTIONAL_KEYWORDS: &[&str] = &["university", "institute", "news", "academy", "research"];

/// Metadata-only baseline relevance, used before and instead of verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorityScorer;

impl AuthorityScorer {
    pub fn score(&self, candidate: &RawCandidate) -> f32 {
        let mut score = BASE_SCORE;

        let authoritative_category = candidate.categories.iter().any(|category| {
            AUTHORITATIVE_CATEGORIES
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(category.trim()))
        });
        if authoritative_category {
            score += CATEGORY_BOOST;
        }

        let uploader = candidate.uploader().unwrap_or_default().to_lowercase();
        if INSTITUTIONAL_KEYWORDS
            .iter()
            .any(|keyword| uploader.contains(keyword))
        {
            score += CHANNEL_BOOST;
        }

        score.min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(categories: &[&str], uploader: Option<&str>) -> RawCandidate {
        RawCandidate {
            title: "t".into(),
            url: Some("https://example.com/v".into()),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            uploader: uploader.map(str::to_string),
            ..RawCandidate::default()
        }
    }

    #[test]
    fn baseline_is_half() {
        assert_eq!(AuthorityScorer.score(&raw(&[], None)), 0.5);
        assert_eq!(AuthorityScorer.score(&raw(&["Gaming"], Some("xXgamerXx"))), 0.5);
    }

    #[test]
    fn category_and_channel_boosts_stack_and_clamp() {
        let category_only = AuthorityScorer.score(&raw(&["Education"], None));
        assert!((category_only - 0.8).abs() < 1e-6);

        let channel_only = AuthorityScorer.score(&raw(&[], Some("Stanford University")));
        assert!((channel_only - 0.7).abs() < 1e-6);

        let both = AuthorityScorer.score(&raw(&["News", "Documentary"], Some("PBS NewsHour")));
        assert_eq!(both, 1.0);
    }

    #[test]
    fn falls_back_to_channel_name() {
        let mut candidate = raw(&[], None);
        candidate.channel = Some("Max Planck Institute".into());
        assert!((AuthorityScorer.score(&candidate) - 0.7).abs() < 1e-6);
    }
}
