//! Clinical message builder for vitals findings.
//!
//! These strings are displayed verbatim on the alert feed and copied into
//! alert payloads, so downstream tooling keys on their exact wording. Change
//! a template and the change shows up in every audit trail.
//!
//! `f64` Display drops the trailing `.0` of whole values, so a measured
//! `85.0` renders as `85` just as staff typed it.
pub struct ClinicalMessages;

impl ClinicalMessages {
    pub fn spo2_critical(value: f64) -> (String, String) {
        (
            format!("Critical: SpO2 at {value}% - Oxygen therapy needed immediately"),
            "Administer supplemental oxygen and assess respiratory status".to_string(),
        )
    }

    pub fn spo2_warning(value: f64) -> (String, String) {
        (
            format!("⚠️ Low SpO2: {value}% - Monitor closely"),
            "Consider supplemental oxygen, monitor continuously".to_string(),
        )
    }

    pub fn hr_tachycardia(value: f64) -> (String, String) {
        (
            format!("Critical: Severe tachycardia ({value} BPM) - Immediate evaluation required"),
            "Obtain ECG, assess for cardiac causes, consider cardioversion if unstable".to_string(),
        )
    }

    pub fn hr_bradycardia(value: f64) -> (String, String) {
        (
            format!("Critical: Severe bradycardia ({value} BPM) - Assess immediately"),
            "Check for hemodynamic compromise, consider atropine/pacing".to_string(),
        )
    }

    pub fn hr_warning(value: f64) -> (String, String) {
        (
            format!("⚠️ Elevated heart rate: {value} BPM"),
            "Assess for pain, anxiety, infection, or cardiac causes".to_string(),
        )
    }

    pub fn sbp_hypertensive_crisis(value: f64) -> (String, String) {
        (
            format!("Critical: Hypertensive crisis ({value} mmHg) - Risk of stroke/organ damage"),
            "Urgent BP reduction, CT brain if symptoms, consider ICU".to_string(),
        )
    }

    pub fn sbp_hypotension(value: f64) -> (String, String) {
        (
            format!("Critical: Hypotension ({value} mmHg) - Possible shock"),
            "IV access, fluid resuscitation, assess for bleeding/sepsis".to_string(),
        )
    }

    pub fn sbp_warning(value: f64) -> (String, String) {
        (
            format!("⚠️ Elevated BP: {value} mmHg"),
            "Monitor BP, check for end-organ damage if symptomatic".to_string(),
        )
    }

    pub fn hr_rising(previous: f64, latest: f64, change: f64, mins: i64) -> (String, String) {
        (
            format!(
                "⚠️ Rapid HR increase: {previous} → {latest} BPM (+{change}) in {mins} min"
            ),
            "Reassess patient immediately, check for pain/distress/arrhythmia".to_string(),
        )
    }

    pub fn spo2_dropping(previous: f64, latest: f64, drop: f64, mins: i64) -> (String, String) {
        (
            format!(
                "🚨 O2 saturation dropping: {previous}% → {latest}% (-{drop}%) in {mins} min"
            ),
            "Apply/increase oxygen immediately, assess airway and breathing".to_string(),
        )
    }

    pub fn sbp_rising(previous: f64, latest: f64, change: f64, mins: i64) -> (String, String) {
        (
            format!(
                "⚠️ BP rising rapidly: {previous} → {latest} mmHg (+{change}) in {mins} min"
            ),
            "Re-assess for pain, anxiety, or hypertensive emergency".to_string(),
        )
    }

    pub fn sbp_dropping(previous: f64, latest: f64, change: f64, mins: i64) -> (String, String) {
        (
            format!("🚨 BP dropping: {previous} → {latest} mmHg ({change}) in {mins} min"),
            "Assess for shock: IV access, fluids, check for bleeding".to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_values_render_without_decimal_point() {
        let (message, _) = ClinicalMessages::spo2_critical(85.0);
        assert_eq!(
            message,
            "Critical: SpO2 at 85% - Oxygen therapy needed immediately"
        );
    }

    #[test]
    fn fractional_values_keep_their_precision() {
        let (message, _) = ClinicalMessages::hr_warning(121.5);
        assert_eq!(message, "⚠️ Elevated heart rate: 121.5 BPM");
    }

    #[test]
    fn trend_messages_carry_both_readings_and_interval() {
        let (message, action) = ClinicalMessages::spo2_dropping(96.0, 91.0, 5.0, 12);
        assert_eq!(
            message,
            "🚨 O2 saturation dropping: 96% → 91% (-5%) in 12 min"
        );
        assert_eq!(
            action,
            "Apply/increase oxygen immediately, assess airway and breathing"
        );
    }

    #[test]
    fn falling_bp_embeds_the_signed_change() {
        let (message, _) = ClinicalMessages::sbp_dropping(120.0, 95.0, -25.0, 20);
        assert_eq!(message, "🚨 BP dropping: 120 → 95 mmHg (-25) in 20 min");
    }
}
