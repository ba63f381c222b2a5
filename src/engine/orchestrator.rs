//! Triage orchestration: model first, rules on any failure.
//!
//! This function never fails. The worst case is the rule path with the
//! built-in default weights, which needs nothing but the snapshot itself.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::models::PatientSnapshot;

use super::model::ModelService;
use super::rules::score_rules;
use super::types::{ScoreMethod, TriageExplanation, TriageResult};
use super::weights::resolve_weights;

/// Injury index above this can trigger the safety floor.
const INJURY_INDEX_FLOOR: i64 = 80;
/// Scores below this are eligible for the override.
const OVERRIDE_BELOW_SCORE: i64 = 70;
/// The floored score.
const OVERRIDE_SCORE: i64 = 85;

/// Compute a triage score for a snapshot.
///
/// Weights are re-resolved on every call; nothing is cached between
/// computations, so an admin weight change takes effect on the next patient.
pub fn compute_triage(
    conn: &Connection,
    model: &dyn ModelService,
    snapshot: &PatientSnapshot,
) -> TriageResult {
    let weights = resolve_weights(conn);

    let mut result = match model.predict(snapshot) {
        Some(outcome) => {
            debug!(score = outcome.score, probability = outcome.probability, "model scored");
            TriageResult {
                score: outcome.score,
                method: ScoreMethod::model(),
                explanation: TriageExplanation::Model {
                    probability: outcome.probability,
                    features_used: outcome.features_used,
                },
            }
        }
        None => {
            let outcome = score_rules(snapshot, &weights);
            debug!(score = outcome.score, fired = ?outcome.fired, "rule fallback scored");
            TriageResult {
                score: outcome.score,
                method: ScoreMethod::rule(),
                explanation: TriageExplanation::Rule {
                    rules_fired: outcome.fired,
                    weights_applied: weights,
                },
            }
        }
    };

    apply_injury_override(&mut result, snapshot.injury_severity);
    result
}

/// Safety floor for severe external trauma.
///
/// A visual-assessment injury index above 80 paired with a low computed
/// score means the scorers missed something the eye did not. The score is
/// forced to 85 and the override is recorded in the method tag.
fn apply_injury_override(result: &mut TriageResult, injury_severity: Option<i64>) {
    let Some(index) = injury_severity else {
        return;
    };
    if index > INJURY_INDEX_FLOOR && result.score < OVERRIDE_BELOW_SCORE {
        info!(
            injury_index = index,
            original_score = result.score,
            "injury override applied"
        );
        result.score = OVERRIDE_SCORE;
        result.method.injury_override = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::engine::model::MockModelService;
    use crate::engine::types::BaseScorer;
    use crate::models::enums::Sex;
    use crate::models::Vitals;

    fn snapshot(age: u32, symptoms: &[&str], injury: Option<i64>) -> PatientSnapshot {
        PatientSnapshot {
            age,
            sex: Sex::Male,
            symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
            vitals: Vitals::default(),
            comorbid_count: 0,
            injury_severity: injury,
        }
    }

    #[test]
    fn model_path_wins_when_available() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(62, 0.9);
        let result = compute_triage(&conn, &model, &snapshot(40, &["chest_pain"], None));
        assert_eq!(result.score, 62);
        assert_eq!(result.method.base, BaseScorer::Model);
        assert_eq!(result.method.render(), "model");
        assert!(matches!(
            result.explanation,
            TriageExplanation::Model { probability, .. } if probability == 0.9
        ));
    }

    #[test]
    fn rule_fallback_when_model_unavailable() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::unavailable();
        let result = compute_triage(&conn, &model, &snapshot(70, &["chest_pain"], None));
        // chest_pain 30 + age_over_65 8 under default weights.
        assert_eq!(result.score, 38);
        assert_eq!(result.method.render(), "rule");
        match result.explanation {
            TriageExplanation::Rule { rules_fired, .. } => {
                assert_eq!(rules_fired, vec!["chest_pain", "age_over_65"]);
            }
            TriageExplanation::Model { .. } => panic!("expected rule explanation"),
        }
    }

    #[test]
    fn injury_override_floors_low_scores() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(40, 0.8);
        let result = compute_triage(&conn, &model, &snapshot(30, &[], Some(90)));
        assert_eq!(result.score, 85);
        assert!(result.method.injury_override);
        assert_eq!(result.method.render(), "model+injury_override");
    }

    #[test]
    fn injury_override_leaves_high_scores_alone() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(75, 0.8);
        let result = compute_triage(&conn, &model, &snapshot(30, &[], Some(90)));
        assert_eq!(result.score, 75);
        assert!(!result.method.injury_override);
    }

    #[test]
    fn injury_index_at_80_does_not_trigger() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::with_score(40, 0.8);
        let result = compute_triage(&conn, &model, &snapshot(30, &[], Some(80)));
        assert_eq!(result.score, 40);
    }

    #[test]
    fn override_applies_on_the_rule_path_too() {
        let conn = open_memory_database().unwrap();
        let model = MockModelService::unavailable();
        let result = compute_triage(&conn, &model, &snapshot(30, &[], Some(95)));
        assert_eq!(result.score, 85);
        assert_eq!(result.method.render(), "rule+injury_override");
    }
}
