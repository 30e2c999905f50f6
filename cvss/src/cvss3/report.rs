use crate::cvss3::{
    AttackComplexity, AttackVector, Availability, Confidentiality, Cvss3Base, Integrity,
    PrivilegesRequired, Scope, UserInteraction,
    score::round_subscore,
    severity::Severity,
};
use serde::{Deserialize, Serialize};

/// The fully evaluated form of one CVSS v3.x vector: the 8 base metrics,
/// the derived scores, and the vector string exactly as given.
///
/// Field naming follows the CVSS JSON schema (`baseScore`, `baseSeverity`,
/// ...), so serializing a report yields the familiar record shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvssReport {
    pub attack_vector: AttackVector,
    pub attack_complexity: AttackComplexity,
    pub privileges_required: PrivilegesRequired,
    pub user_interaction: UserInteraction,
    pub scope: Scope,
    pub confidentiality_impact: Confidentiality,
    pub integrity_impact: Integrity,
    pub availability_impact: Availability,
    pub vector_string: String,
    pub base_score: f64,
    pub base_severity: Severity,
    pub exploitability_score: f64,
    pub impact_score: f64,
}

impl Cvss3Base {
    /// Evaluate into a [`CvssReport`], echoing `vector` verbatim as the
    /// report's vector string.
    pub fn report(&self, vector: &str) -> CvssReport {
        let base_score = self.score().value();

        CvssReport {
            attack_vector: self.av,
            attack_complexity: self.ac,
            privileges_required: self.pr,
            user_interaction: self.ui,
            scope: self.s,
            confidentiality_impact: self.c,
            integrity_impact: self.i,
            availability_impact: self.a,
            vector_string: vector.to_string(),
            base_score,
            base_severity: Severity::from_f64(base_score),
            exploitability_score: round_subscore(self.exploitability()),
            impact_score: round_subscore(self.impact()),
        }
    }
}
