//! The closed set of recruiting-article categories.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// The four article categories the corpus is partitioned by.
///
/// Used to select the style rulebook, to filter document-store scans, and
/// to pick the localized category label in the metadata footer. Derives
/// `ValueEnum` so the CLI can accept it directly as a `--category` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[clap(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArticleType {
    Announcement,
    EventReport,
    Interview,
    Culture,
}

impl ArticleType {
    /// All four members, in a stable order (used by fixture/seeding code).
    pub const ALL: [ArticleType; 4] = [
        ArticleType::Announcement,
        ArticleType::EventReport,
        ArticleType::Interview,
        ArticleType::Culture,
    ];

    /// The machine-readable tag stored in the document/style/history tables.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Announcement => "ANNOUNCEMENT",
            Self::EventReport => "EVENT_REPORT",
            Self::Interview => "INTERVIEW",
            Self::Culture => "CULTURE",
        }
    }

    /// Parse the machine-readable tag back into a category.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim() {
            "ANNOUNCEMENT" => Some(Self::Announcement),
            "EVENT_REPORT" => Some(Self::EventReport),
            "INTERVIEW" => Some(Self::Interview),
            "CULTURE" => Some(Self::Culture),
            _ => None,
        }
    }

    /// Localized label for the metadata footer.
    #[must_use]
    pub const fn localized_label(self) -> &'static str {
        match self {
            Self::Announcement => "アナウンスメント",
            Self::EventReport => "イベントレポート",
            Self::Interview => "インタビュー",
            Self::Culture => "カルチャー/ストーリー",
        }
    }
}

impl std::fmt::Display for ArticleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_as_str() {
        for ty in ArticleType::ALL {
            assert_eq!(ArticleType::parse(ty.as_str()), Some(ty));
        }
    }

    #[test]
    fn unknown_tag_does_not_parse() {
        assert_eq!(ArticleType::parse("NOT_A_TYPE"), None);
    }

    #[test]
    fn localized_labels_match_known_values() {
        assert_eq!(ArticleType::Announcement.localized_label(), "アナウンスメント");
        assert_eq!(ArticleType::EventReport.localized_label(), "イベントレポート");
        assert_eq!(ArticleType::Interview.localized_label(), "インタビュー");
        assert_eq!(ArticleType::Culture.localized_label(), "カルチャー/ストーリー");
    }
}
