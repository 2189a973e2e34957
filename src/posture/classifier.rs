use crate::db::models::SensorChannels;

use super::config::PostureConfig;
use super::types::{PostureLabel, PostureLevel, PostureMetrics, PostureVerdict};

/// Classifies one snapshot. Pure: the same channels and config always give the same
/// verdict, and degenerate input (missing channels, zero mass) never fails.
pub fn classify(channels: &SensorChannels, config: &PostureConfig) -> PostureVerdict {
    let seat = channels.seat(config.seat_ceiling);
    let back = channels.back(config.back_ceiling);

    let b_sum = back.total;
    let s_sum = seat.total;

    let metrics = PostureMetrics {
        b_lr: ratio(back.left - back.right, b_sum),
        b_sum,
        s_lr: ratio(seat.left - seat.right, s_sum),
        s_fb: ratio(seat.bottom - seat.top, s_sum),
        s_sum,
    };

    if s_sum < config.seated_min_mass {
        return PostureVerdict::unoccupied(metrics);
    }

    let lower_back_share = ratio(back.bottom, b_sum);
    let (label, level) = if metrics.s_fb >= config.perch_front_back
        && (b_sum <= config.perch_max_back_sum
            || lower_back_share <= config.perch_max_lower_back_share)
    {
        (PostureLabel::PerchedForward, PostureLevel::Danger)
    } else if b_sum > config.lean_min_back_sum && metrics.b_lr >= config.lean_left_right {
        (PostureLabel::LeaningLeft, PostureLevel::Danger)
    } else if b_sum > config.lean_min_back_sum && metrics.b_lr <= -config.lean_left_right {
        (PostureLabel::LeaningRight, PostureLevel::Danger)
    } else if metrics.s_lr <= -config.leg_cross_left_right {
        (PostureLabel::RightLegCrossed, PostureLevel::Warn)
    } else if metrics.s_lr >= config.leg_cross_left_right {
        (PostureLabel::LeftLegCrossed, PostureLevel::Warn)
    } else {
        (PostureLabel::GoodPosture, PostureLevel::Normal)
    };

    PostureVerdict {
        is_seated: true,
        level,
        label,
        metrics,
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUADRANTS: [&str; 4] = ["top_left", "top_right", "bottom_left", "bottom_right"];

    fn channels(seat: [f64; 4], back: [f64; 4]) -> SensorChannels {
        let seat = QUADRANTS
            .iter()
            .zip(seat)
            .map(|(pad, value)| (format!("seat_{pad}"), value));
        let back = QUADRANTS
            .iter()
            .zip(back)
            .map(|(pad, value)| (format!("back_{pad}"), value));
        seat.chain(back).collect()
    }

    fn verdict(seat: [f64; 4], back: [f64; 4]) -> PostureVerdict {
        classify(&channels(seat, back), &PostureConfig::default())
    }

    #[test]
    fn light_seat_is_unoccupied_whatever_the_back_says() {
        // S_SUM = 4 * 25/600 ~= 0.167
        let v = verdict([25.0; 4], [300.0, 0.0, 300.0, 0.0]);
        assert!(!v.is_seated);
        assert_eq!(v.label, PostureLabel::Unoccupied);
        assert_eq!(v.level, PostureLevel::Normal);
    }

    #[test]
    fn empty_packet_is_unoccupied() {
        let v = classify(&SensorChannels::default(), &PostureConfig::default());
        assert!(!v.is_seated);
        assert_eq!(v.metrics, PostureMetrics::default());
    }

    #[test]
    fn even_seat_without_back_is_good_posture() {
        let v = verdict([300.0; 4], [0.0; 4]);
        assert!(v.is_seated);
        assert!((v.metrics.s_sum - 2.0).abs() < 1e-9);
        assert_eq!(v.metrics.b_sum, 0.0);
        assert_eq!(v.metrics.s_lr, 0.0);
        assert_eq!(v.label, PostureLabel::GoodPosture);
        assert_eq!(v.level, PostureLevel::Normal);
    }

    #[test]
    fn saturated_front_edge_is_perched_forward() {
        let v = verdict([0.0, 0.0, 600.0, 600.0], [0.0; 4]);
        assert_eq!(v.metrics.s_fb, 1.0);
        assert_eq!(v.label, PostureLabel::PerchedForward);
        assert_eq!(v.level, PostureLevel::Danger);
    }

    #[test]
    fn perch_wins_over_lean() {
        // Seat satisfies the perch rule, back is loaded on top-left only:
        // B_SUM = 1.0 > 0.3, B_LR = 1.0, lower back share = 0.
        let v = verdict([0.0, 0.0, 600.0, 600.0], [300.0, 0.0, 0.0, 0.0]);
        assert!(v.metrics.b_lr >= 0.25);
        assert_eq!(v.label, PostureLabel::PerchedForward);
    }

    #[test]
    fn loaded_lower_back_blocks_perch() {
        // B_SUM = 1.0 > 0.3 and lower-back share 1.0 > 0.4, so no perch.
        let v = verdict([100.0, 100.0, 300.0, 300.0], [0.0, 0.0, 150.0, 150.0]);
        assert!(v.metrics.s_fb >= 0.25);
        assert_eq!(v.label, PostureLabel::GoodPosture);
    }

    #[test]
    fn lateral_lean_both_ways() {
        let left = verdict([300.0; 4], [300.0, 0.0, 300.0, 60.0]);
        assert_eq!(left.label, PostureLabel::LeaningLeft);
        assert_eq!(left.level, PostureLevel::Danger);

        let right = verdict([300.0; 4], [0.0, 300.0, 60.0, 300.0]);
        assert_eq!(right.label, PostureLabel::LeaningRight);
        assert_eq!(right.level, PostureLevel::Danger);
    }

    #[test]
    fn lean_ignored_when_back_is_light() {
        // B_SUM = 0.2, B_LR = 1.0: below the lean gate.
        let v = verdict([300.0; 4], [60.0, 0.0, 0.0, 0.0]);
        assert_eq!(v.label, PostureLabel::GoodPosture);
    }

    #[test]
    fn crossed_legs_warn() {
        let right = verdict([200.0, 400.0, 200.0, 400.0], [0.0; 4]);
        assert!(right.metrics.s_lr <= -0.15);
        assert_eq!(right.label, PostureLabel::RightLegCrossed);
        assert_eq!(right.level, PostureLevel::Warn);

        let left = verdict([400.0, 200.0, 400.0, 200.0], [0.0; 4]);
        assert_eq!(left.label, PostureLabel::LeftLegCrossed);
        assert_eq!(left.level, PostureLevel::Warn);
    }

    #[test]
    fn readings_above_ceiling_are_clamped() {
        let v = verdict([1023.0; 4], [1023.0; 4]);
        assert_eq!(v.metrics.s_sum, 4.0);
        assert_eq!(v.metrics.b_sum, 4.0);
    }

    #[test]
    fn device_directional_packet_is_classified() {
        let device = serde_json::json!({
            "seat_front": 400, "seat_back": 380, "seat_left": 390, "seat_right": 410,
            "back_front": 100, "back_back": 120, "back_left": 100, "back_right": 100
        });
        let v = classify(
            &SensorChannels::from_json_map(device.as_object().unwrap()),
            &PostureConfig::default(),
        );

        assert!(v.is_seated);
        assert!(v.metrics.s_sum > 2.5);
        assert!(v.metrics.b_sum > 1.3);
        assert_eq!(v.label, PostureLabel::GoodPosture);
        assert_eq!(v.level, PostureLevel::Normal);
    }

    #[test]
    fn device_front_edge_load_is_perched_forward() {
        let device = serde_json::json!({
            "seat_front": 600, "seat_back": 0, "seat_left": 100, "seat_right": 100,
            "back_front": 0, "back_back": 0, "back_left": 0, "back_right": 0
        });
        let v = classify(
            &SensorChannels::from_json_map(device.as_object().unwrap()),
            &PostureConfig::default(),
        );
        assert_eq!(v.label, PostureLabel::PerchedForward);
    }

    #[test]
    fn label_serializes_to_display_text() {
        let json = serde_json::to_string(&PostureLabel::RightLegCrossed).unwrap();
        assert_eq!(json, "\"right leg crossed\"");
        assert_eq!(PostureLabel::PerchedForward.as_str(), "perched forward");
    }
}
