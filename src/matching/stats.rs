use serde::Serialize;

use crate::index::Term;

/// Summary of a list of values. Every field is `NaN` for an empty list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Distribution {
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; `NaN` for fewer than two values.
    pub std: f64,
}

impl Distribution {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Distribution {
                max: f64::NAN,
                mean: f64::NAN,
                median: f64::NAN,
                std: f64::NAN,
            };
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let middle = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[middle - 1] + sorted[middle]) / 2.0
        } else {
            sorted[middle]
        };

        let std = if values.len() < 2 {
            f64::NAN
        } else {
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            variance.sqrt()
        };

        Distribution {
            max,
            mean,
            median,
            std,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PosStats {
    pub nouns: Distribution,
    pub verbs: Distribution,
    pub adjectives: Distribution,
    pub adverbs: Distribution,
    pub rest: Distribution,
}

/// Match rate and term distributions of one matched article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchStats {
    pub terms_total: usize,
    pub keywords_total: usize,
    pub matches_total: usize,
    /// Share of keywords that matched, in percent with two decimals.
    pub match_percentage: f64,
    pub term_frequency: Distribution,
    /// Over located terms only.
    pub first_occurrence: Distribution,
    pub pos: PosStats,
}

impl MatchStats {
    pub fn calculate(article_terms: &[Term], keywords_total: usize, matches_total: usize) -> Self {
        let match_percentage = if keywords_total == 0 {
            0.0
        } else {
            (matches_total as f64 / keywords_total as f64 * 10_000.0).round() / 100.0
        };

        let term_frequencies: Vec<f64> = article_terms
            .iter()
            .map(|t| t.term_frequency as f64)
            .collect();
        let first_occurrences: Vec<f64> = article_terms
            .iter()
            .filter_map(|t| t.first_occurrence)
            .collect();

        let pos_column = |bucket: usize| -> Distribution {
            let counts: Vec<f64> = article_terms
                .iter()
                .map(|t| t.pos.counts()[bucket] as f64)
                .collect();
            Distribution::from_values(&counts)
        };

        MatchStats {
            terms_total: article_terms.len(),
            keywords_total,
            matches_total,
            match_percentage,
            term_frequency: Distribution::from_values(&term_frequencies),
            first_occurrence: Distribution::from_values(&first_occurrences),
            pos: PosStats {
                nouns: pos_column(0),
                verbs: pos_column(1),
                adjectives: pos_column(2),
                adverbs: pos_column(3),
                rest: pos_column(4),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution() {
        let d = Distribution::from_values(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(d.max, 4.0);
        assert_eq!(d.mean, 2.5);
        assert_eq!(d.median, 2.5);
        assert!((d.std - 1.290_994).abs() < 1e-6);

        let d = Distribution::from_values(&[5.0, 1.0, 3.0]);
        assert_eq!(d.median, 3.0);
        assert_eq!(d.std, 2.0);
    }

    #[test]
    fn test_degenerate_distributions_are_nan() {
        let d = Distribution::from_values(&[]);
        assert!(d.mean.is_nan() && d.median.is_nan() && d.std.is_nan() && d.max.is_nan());
        let d = Distribution::from_values(&[2.0]);
        assert_eq!(d.mean, 2.0);
        assert!(d.std.is_nan());
    }

    #[test]
    fn test_match_percentage_rounding() {
        let stats = MatchStats::calculate(&[], 3, 1);
        assert_eq!(stats.match_percentage, 33.33);
        assert_eq!(MatchStats::calculate(&[], 0, 0).match_percentage, 0.0);
    }

    #[test]
    fn test_unlocated_terms_are_left_out_of_first_occurrence() {
        let mut located = Term::new("storm");
        located.term_frequency = 2;
        located.first_occurrence = Some(0.2);
        located.pos.nouns = vec!["storm".to_string()];
        let mut unlocated = Term::new("rain");
        unlocated.term_frequency = 4;

        let stats = MatchStats::calculate(&[located, unlocated], 2, 1);
        assert_eq!(stats.first_occurrence.mean, 0.2);
        assert_eq!(stats.term_frequency.mean, 3.0);
        assert_eq!(stats.pos.nouns.mean, 0.5);
        assert_eq!(stats.match_percentage, 50.0);
    }
}
