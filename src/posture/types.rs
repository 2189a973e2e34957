use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a verdict. Ordered: `Normal < Warn < Danger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostureLevel {
    Normal,
    Warn,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostureLabel {
    #[serde(rename = "unoccupied")]
    Unoccupied,
    #[serde(rename = "good posture")]
    GoodPosture,
    #[serde(rename = "perched forward")]
    PerchedForward,
    #[serde(rename = "leaning left")]
    LeaningLeft,
    #[serde(rename = "leaning right")]
    LeaningRight,
    #[serde(rename = "left leg crossed")]
    LeftLegCrossed,
    #[serde(rename = "right leg crossed")]
    RightLegCrossed,
    #[serde(rename = "prolonged sitting — break recommended")]
    ProlongedSitting,
}

impl PostureLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostureLabel::Unoccupied => "unoccupied",
            PostureLabel::GoodPosture => "good posture",
            PostureLabel::PerchedForward => "perched forward",
            PostureLabel::LeaningLeft => "leaning left",
            PostureLabel::LeaningRight => "leaning right",
            PostureLabel::LeftLegCrossed => "left leg crossed",
            PostureLabel::RightLegCrossed => "right leg crossed",
            PostureLabel::ProlongedSitting => "prolonged sitting — break recommended",
        }
    }
}

/// Ratios the classifier branched on. Exposed for inspection only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostureMetrics {
    /// Back left/right imbalance, (left - right) / B_SUM
    pub b_lr: f64,
    /// Normalized backrest mass
    pub b_sum: f64,
    /// Seat left/right imbalance, (left - right) / S_SUM
    pub s_lr: f64,
    /// Seat front/back imbalance, (bottom - top) / S_SUM
    pub s_fb: f64,
    /// Normalized seat mass
    pub s_sum: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostureVerdict {
    pub is_seated: bool,
    pub level: PostureLevel,
    pub label: PostureLabel,
    pub metrics: PostureMetrics,
}

impl PostureVerdict {
    pub fn unoccupied(metrics: PostureMetrics) -> Self {
        Self {
            is_seated: false,
            level: PostureLevel::Normal,
            label: PostureLabel::Unoccupied,
            metrics,
        }
    }
}

/// The externally visible current truth: latest verdict plus session duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatState {
    pub is_seated: bool,
    pub level: PostureLevel,
    pub label: PostureLabel,
    pub metrics: PostureMetrics,
    pub seated_minutes: i64,
    /// Receive time of the snapshot the verdict came from
    pub detected_at: Option<DateTime<Utc>>,
}

impl SeatState {
    /// State reported when the log holds no sensor snapshot.
    pub fn empty() -> Self {
        let verdict = PostureVerdict::unoccupied(PostureMetrics::default());
        Self {
            is_seated: verdict.is_seated,
            level: verdict.level,
            label: verdict.label,
            metrics: verdict.metrics,
            seated_minutes: 0,
            detected_at: None,
        }
    }
}
