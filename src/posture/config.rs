use serde::{Deserialize, Serialize};

/// Tunable ceilings and thresholds for posture classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureConfig {
    /// Raw reading that normalizes a seat channel to 1.0
    pub seat_ceiling: f64,
    /// Raw reading that normalizes a back channel to 1.0
    pub back_ceiling: f64,

    /// Minimum normalized seat mass (S_SUM) for the seat to count as occupied
    pub seated_min_mass: f64,

    /// Forward perch: S_FB at or above this
    pub perch_front_back: f64,
    /// ...and either the back is barely loaded (B_SUM at or below this)
    pub perch_max_back_sum: f64,
    /// ...or the lower back carries at most this share of B_SUM
    pub perch_max_lower_back_share: f64,

    /// Lean checks only run when B_SUM exceeds this
    pub lean_min_back_sum: f64,
    /// |B_LR| at or above this is a lateral lean
    pub lean_left_right: f64,

    /// |S_LR| at or above this is a crossed leg
    pub leg_cross_left_right: f64,
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            seat_ceiling: 600.0,
            back_ceiling: 300.0,
            seated_min_mass: 0.2,
            perch_front_back: 0.25,
            perch_max_back_sum: 0.3,
            perch_max_lower_back_share: 0.4,
            lean_min_back_sum: 0.3,
            lean_left_right: 0.25,
            leg_cross_left_right: 0.15,
        }
    }
}

/// Sitting-duration escalation thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seated minutes after which the verdict is forced to danger
    pub prolonged_minutes: i64,
    /// Seated minutes after which a normal verdict is raised to warn (disabled when unset)
    pub warn_minutes: Option<i64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prolonged_minutes: 2,
            warn_minutes: None,
        }
    }
}
