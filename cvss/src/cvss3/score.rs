use crate::cvss3::severity::Severity;

/// A CVSS v3.1 base score.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Score(f64);

impl Score {
    pub fn new(score: f64) -> Score {
        Score(score)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Round the score up to one decimal, per CVSS v3.1 Appendix A -
    /// Floating Point Rounding. This is a ceiling to the nearest 0.1, done
    /// in integer arithmetic to dodge binary-representation artifacts; it is
    /// NOT ordinary rounding.
    pub fn roundup(self) -> Score {
        let score_int = (self.0 * 100_000.0) as u64;

        if score_int % 10000 == 0 {
            Score((score_int as f64) / 100_000.0)
        } else {
            let score_floor = ((score_int as f64) / 10_000.0).floor();
            Score((score_floor + 1.0) / 10.0)
        }
    }

    pub fn severity(self) -> Severity {
        Severity::from_f64(self.0)
    }
}

impl From<f64> for Score {
    fn from(score: f64) -> Score {
        Score(score)
    }
}

impl From<Score> for f64 {
    fn from(score: Score) -> f64 {
        score.value()
    }
}

impl From<Score> for Severity {
    fn from(score: Score) -> Severity {
        score.severity()
    }
}

/// Round a raw sub-score half-to-even to one decimal. Sub-scores use
/// ordinary rounding, unlike the base score's roundup.
pub fn round_subscore(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}
