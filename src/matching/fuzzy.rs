use strsim::normalized_levenshtein;

/// Minimum similarity for a fuzzy keyword match.
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.75;

/// Similarity lookup over a fixed set of article stems.
#[derive(Debug, Clone, Default)]
pub struct FuzzyIndex {
    entries: Vec<String>,
}

impl FuzzyIndex {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = FuzzyIndex::default();
        for entry in entries {
            let entry = entry.into();
            if !index.entries.contains(&entry) {
                index.entries.push(entry);
            }
        }
        index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn similarity(a: &str, b: &str) -> f64 {
        normalized_levenshtein(a, b)
    }

    /// Most similar entry scoring at least `threshold`; ties keep the earlier entry.
    pub fn best_match(&self, query: &str, threshold: f64) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for entry in &self.entries {
            let score = Self::similarity(entry, query);
            if score < threshold {
                continue;
            }
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((entry.as_str(), score));
            }
        }
        best
    }
}
