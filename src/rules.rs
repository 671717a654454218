//! # Keyword Rules
//!
//! Deterministic correction layer applied after the upstream classification.
//! The upstream model routinely misreads Indonesian marketplace reviews:
//! "belum dicoba" is not a complaint, "penipu" is fatal no matter how the
//! model scored the text, and a "puas banget" buried behind "biasa aja"
//! means the review is positive after all.
//!
//! Each rule is a keyword category plus a star/label adjustment. Rules run
//! in a fixed order and later rules overwrite earlier ones, so the fatal
//! rule can undo a hedging downgrade and the pending rule can undo an
//! initial negative classification. The ordering is part of the contract
//! and is pinned by tests.

use crate::models::Label;

/// Rule categories in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Qualifier words that soften a perfect score.
    Hedging,
    /// "Not yet tried / just arrived" phrases. Not a genuine complaint.
    Pending,
    /// "Just average" phrases.
    Average,
    /// Scam / severe-defect complaints. Forces the lowest rating.
    Fatal,
    /// Repeat-purchase / high-satisfaction phrases.
    Booster,
}

impl RuleKind {
    pub const ORDER: [RuleKind; 5] = [
        RuleKind::Hedging,
        RuleKind::Pending,
        RuleKind::Average,
        RuleKind::Fatal,
        RuleKind::Booster,
    ];

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            RuleKind::Hedging => &[
                "tapi", "cuma", "hanya", "agak", "sedikit", "sayang", "but", "only", "slightly",
            ],
            RuleKind::Pending => &[
                "belum dicoba",
                "belum coba",
                "belum sempat",
                "belum dipakai",
                "baru sampai",
                "baru datang",
                "baru tiba",
                "not yet tried",
                "just arrived",
            ],
            RuleKind::Average => &[
                "biasa aja",
                "biasa saja",
                "standar",
                "lumayan",
                "so so",
                "just average",
            ],
            RuleKind::Fatal => &[
                "penipu",
                "menipu",
                "scam",
                "palsu",
                "rusak parah",
                "jangan beli",
                "uang tidak kembali",
            ],
            RuleKind::Booster => &[
                "puas banget",
                "puas sekali",
                "beli lagi",
                "order lagi",
                "langganan",
                "recommended",
                "rekomendasi",
                "mantap banget",
                "repeat order",
            ],
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords().iter().any(|k| lowered.contains(k))
    }

    fn adjust(&self, stars: u8, label: Label) -> (u8, Label) {
        match self {
            RuleKind::Hedging if stars == 5 => (4, label),
            RuleKind::Pending => (3, Label::Neutral),
            RuleKind::Average if stars > 3 => (3, label),
            RuleKind::Fatal if stars > 1 => (1, Label::Negative),
            // A fatal 1 is never upgraded by a booster elsewhere in the text.
            RuleKind::Booster if stars > 1 && stars < 4 => (4, Label::Positive),
            _ => (stars, label),
        }
    }
}

/// Runs every matching rule over the text in `RuleKind::ORDER`, starting
/// from the score-mapped baseline. The returned pair is authoritative; it
/// is not re-derived afterwards.
pub fn apply_rules(text: &str, stars: u8, label: Label) -> (u8, Label) {
    let lowered = text.to_lowercase();
    let mut current = (stars, label);

    for rule in RuleKind::ORDER {
        if rule.matches(&lowered) {
            current = rule.adjust(current.0, current.1);
        }
    }

    current
}

#[cfg(test)]
mod tests {
    use super::{apply_rules, RuleKind};
    use crate::models::Label;

    #[test]
    fn test_hedging_only_downgrades_five_stars() {
        assert_eq!(
            apply_rules("bagus tapi pengiriman lama", 5, Label::Positive),
            (4, Label::Positive)
        );
        assert_eq!(
            apply_rules("bagus tapi pengiriman lama", 4, Label::Positive),
            (4, Label::Positive)
        );
    }

    #[test]
    fn test_pending_forces_neutral_over_negative() {
        assert_eq!(
            apply_rules("belum dicoba, semoga awet", 1, Label::Negative),
            (3, Label::Neutral)
        );
        assert_eq!(
            apply_rules("baru sampai, packing rapi", 5, Label::Positive),
            (3, Label::Neutral)
        );
    }

    #[test]
    fn test_average_downgrades_above_three() {
        assert_eq!(
            apply_rules("kualitas standar untuk harganya", 5, Label::Positive),
            (3, Label::Positive)
        );
        assert_eq!(
            apply_rules("kualitas standar untuk harganya", 2, Label::Negative),
            (2, Label::Negative)
        );
    }

    #[test]
    fn test_fatal_overrides_everything_above_one() {
        assert_eq!(
            apply_rules("barang ini penipu banget, jangan beli!", 5, Label::Positive),
            (1, Label::Negative)
        );
        assert_eq!(
            apply_rules("scam, uang tidak kembali", 3, Label::Neutral),
            (1, Label::Negative)
        );
    }

    #[test]
    fn test_fatal_runs_after_pending() {
        // Both phrase types in one text: pending sets 3/neutral first, then
        // fatal overwrites it. Listed order decides, not severity.
        assert_eq!(
            apply_rules("baru sampai tapi ternyata penipu", 4, Label::Positive),
            (1, Label::Negative)
        );
    }

    #[test]
    fn test_booster_upgrades_middle_band() {
        assert_eq!(
            apply_rules("puas banget, pasti beli lagi", 3, Label::Neutral),
            (4, Label::Positive)
        );
        assert_eq!(
            apply_rules("puas banget sama pelayanannya", 2, Label::Negative),
            (4, Label::Positive)
        );
    }

    #[test]
    fn test_booster_never_upgrades_fatal_one() {
        assert_eq!(
            apply_rules("penipu! padahal dulu langganan", 5, Label::Positive),
            (1, Label::Negative)
        );
        assert_eq!(
            apply_rules("recommended katanya, nyatanya penipu", 1, Label::Negative),
            (1, Label::Negative)
        );
    }

    #[test]
    fn test_booster_leaves_four_and_five_alone() {
        assert_eq!(
            apply_rules("mantap banget kualitasnya", 5, Label::Positive),
            (5, Label::Positive)
        );
    }

    #[test]
    fn test_no_keywords_passes_through() {
        assert_eq!(
            apply_rules("pengiriman cepat dan aman", 5, Label::Positive),
            (5, Label::Positive)
        );
    }

    #[test]
    fn test_order_is_pinned() {
        assert_eq!(
            RuleKind::ORDER,
            [
                RuleKind::Hedging,
                RuleKind::Pending,
                RuleKind::Average,
                RuleKind::Fatal,
                RuleKind::Booster,
            ]
        );
    }
}
