//! Title heuristics applied before any verification cost is spent.

const SENSATIONAL_MARKERS: &[&str] = &["SHOCKING", "YOU WON'T BELIEVE", "MUST WATCH", "GONE WRONG"];
/// Code points strictly above this count as emoji.
const EMOJI_FLOOR: u32 = 0x1F300;
const MAX_EMOJI: usize = 3;
const MAX_UPPERCASE_RATIO: f32 = 0.7;
const UPPERCASE_MIN_LEN: usize = 10;

/// Why a title was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualityRejection {
    EmptyTitle,
    Sensational(&'static str),
    ExcessiveEmoji(usize),
    ExcessiveUppercase,
}

impl std::fmt::Display for QualityRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityRejection::EmptyTitle => write!(f, "empty title"),
            QualityRejection::Sensational(marker) => write!(f, "sensational marker {marker:?}"),
            QualityRejection::ExcessiveEmoji(count) => write!(f, "{count} emoji"),
            QualityRejection::ExcessiveUppercase => write!(f, "mostly uppercase"),
        }
    }
}

/// Pure, deterministic title filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityFilter;

impl QualityFilter {
    pub fn accepts(&self, title: &str) -> bool {
        self.check(title).is_ok()
    }

    pub fn check(&self, title: &str) -> Result<(), QualityRejection> {
        if title.trim().is_empty() {
            return Err(QualityRejection::EmptyTitle);
        }

        // Typographic apostrophes would otherwise slip past "WON'T".
        let upper = title.replace('\u{2019}', "'").to_uppercase();
        if let Some(marker) = SENSATIONAL_MARKERS
            .iter()
            .find(|marker| upper.contains(*marker))
        {
            return Err(QualityRejection::Sensational(*marker));
        }

        let emoji = title
            .chars()
            .filter(|c| *c as u32 > EMOJI_FLOOR)
            .count();
        if emoji > MAX_EMOJI {
            return Err(QualityRejection::ExcessiveEmoji(emoji));
        }

        let length = title.chars().count();
        let uppercase = title.chars().filter(|c| c.is_uppercase()).count();
        let ratio = uppercase as f32 / length.max(1) as f32;
        if ratio > MAX_UPPERCASE_RATIO && length > UPPERCASE_MIN_LEN {
            return Err(QualityRejection::ExcessiveUppercase);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_titles() {
        let filter = QualityFilter;
        assert!(filter.accepts("Second Amendment deterrence: a meta-analysis"));
        assert!(filter.accepts("NASA"));
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert_eq!(QualityFilter.check(""), Err(QualityRejection::EmptyTitle));
        assert_eq!(QualityFilter.check("   "), Err(QualityRejection::EmptyTitle));
    }

    #[test]
    fn rejects_sensational_markers_case_insensitively() {
        assert_eq!(
            QualityFilter.check("This is shocking news"),
            Err(QualityRejection::Sensational("SHOCKING"))
        );
        assert!(!QualityFilter.accepts("You won't believe what happened"));
        assert!(!QualityFilter.accepts("You won\u{2019}t believe this"));
        assert!(!QualityFilter.accepts("Prank gone wrong"));
    }

    #[test]
    fn emoji_limit_is_three() {
        assert!(QualityFilter.accepts("Climate talk \u{1F30D}\u{1F525}\u{1F4A1}"));
        assert_eq!(
            QualityFilter.check("Climate talk \u{1F30D}\u{1F525}\u{1F4A1}\u{1F680}"),
            Err(QualityRejection::ExcessiveEmoji(4))
        );
    }

    #[test]
    fn cyclone_code_point_is_not_counted() {
        // U+1F300 itself sits on the floor of the range.
        assert!(QualityFilter.accepts("Storm season \u{1F300}\u{1F300}\u{1F300}\u{1F300}"));
        assert_eq!(
            QualityFilter.check("Storm season \u{1F300}\u{1F301}\u{1F302}\u{1F303}\u{1F304}"),
            Err(QualityRejection::ExcessiveEmoji(4))
        );
    }

    #[test]
    fn uppercase_ratio_only_applies_to_long_titles() {
        assert!(QualityFilter.accepts("BBC NEWS"));
        assert_eq!(
            QualityFilter.check("THE TRUTH ABOUT TAXES"),
            Err(QualityRejection::ExcessiveUppercase)
        );
        assert!(QualityFilter.accepts("The truth about TAXES"));
    }
}
