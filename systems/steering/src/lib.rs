#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Steering helpers that turn a tank toward a waypoint and detect arrival.
//!
//! Angles follow the tank heading convention: heading `h` faces
//! `(-sin h, cos h)` and turning left increases the heading.

use std::f32::consts::{PI, TAU};

use ctf_core::{Command, TankId};
use glam::Vec2;

/// Largest heading error, in radians, that still counts as aligned.
pub const DEAD_BAND: f32 = 5.0 * PI / 180.0;

/// Direction of a turn issued by [`steer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Turn {
    /// Toward increasing heading.
    Left,
    /// Toward decreasing heading.
    Right,
}

/// Heading a body at `from` needs in order to face `to`.
#[must_use]
pub fn bearing_to(from: Vec2, to: Vec2) -> f32 {
    let offset = (from - to).perp();
    offset.y.atan2(offset.x)
}

/// Signed difference `a - b` with both angles reduced modulo a full turn,
/// wrapped into `(-PI, PI]`.
#[must_use]
pub fn angular_error(a: f32, b: f32) -> f32 {
    let difference = a.rem_euclid(TAU) - b.rem_euclid(TAU);
    if difference > PI {
        difference - TAU
    } else if difference <= -PI {
        difference + TAU
    } else {
        difference
    }
}

/// Stops the tank and starts turning it toward `target` when the heading
/// error exceeds [`DEAD_BAND`]. Emits nothing otherwise.
pub fn steer(tank: TankId, current: f32, target: f32, out: &mut Vec<Command>) -> Option<Turn> {
    let error = angular_error(current, target);
    if error.abs() <= DEAD_BAND {
        return None;
    }

    out.push(Command::StopMoving { tank });
    if error.rem_euclid(TAU) >= PI {
        out.push(Command::TurnLeft { tank });
        Some(Turn::Left)
    } else {
        out.push(Command::TurnRight { tank });
        Some(Turn::Right)
    }
}

/// Reports whether `current` is within [`DEAD_BAND`] of `target`, stopping
/// the rotation when it is.
pub fn is_aligned(tank: TankId, target: f32, current: f32, out: &mut Vec<Command>) -> bool {
    if angular_error(target, current).abs() <= DEAD_BAND {
        out.push(Command::StopTurning { tank });
        true
    } else {
        false
    }
}

/// Outcome of a [`ProgressTracker`] sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    /// The distance to the waypoint did not grow.
    Approaching,
    /// The distance grew since the previous sample; the waypoint was passed.
    Overshot,
}

/// Detects the moment a tank starts moving away from its waypoint.
///
/// The last sampled distance is kept across waypoints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressTracker {
    last_distance: f32,
}

impl ProgressTracker {
    /// Distance assumed before the first sample.
    pub const INITIAL_DISTANCE: f32 = 1.0;

    /// Records the distance from `position` to `waypoint`.
    pub fn sample(&mut self, position: Vec2, waypoint: Vec2) -> Progress {
        let distance = position.distance(waypoint);
        let previous = std::mem::replace(&mut self.last_distance, distance);
        if distance > previous {
            Progress::Overshot
        } else {
            Progress::Approaching
        }
    }

    /// Distance recorded by the latest sample.
    #[must_use]
    pub const fn last_distance(&self) -> f32 {
        self.last_distance
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self {
            last_distance: Self::INITIAL_DISTANCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::FRAC_PI_2;

    const TANK: TankId = TankId::new(0);

    fn facing(heading: f32) -> Vec2 {
        Vec2::new(-heading.sin(), heading.cos())
    }

    #[test]
    fn bearing_matches_heading_convention() {
        let origin = Vec2::new(2.5, 2.5);
        for target in [
            Vec2::new(2.5, 3.5),
            Vec2::new(1.5, 2.5),
            Vec2::new(3.5, 2.5),
            Vec2::new(2.5, 1.5),
            Vec2::new(4.0, 5.0),
        ] {
            let heading = bearing_to(origin, target);
            let expected = (target - origin).normalize();
            assert!((facing(heading) - expected).length() < 1e-5, "{target:?}");
        }
    }

    #[test]
    fn error_wraps_across_zero() {
        let error = angular_error(0.1, TAU - 0.1);
        assert!((error - 0.2).abs() < 1e-5);
        assert!((angular_error(TAU - 0.1, 0.1) + 0.2).abs() < 1e-5);
    }

    #[test]
    fn steer_turns_toward_the_shorter_side() {
        let mut out = Vec::new();
        assert_eq!(steer(TANK, 0.0, FRAC_PI_2, &mut out), Some(Turn::Left));
        assert_eq!(
            out,
            vec![
                Command::StopMoving { tank: TANK },
                Command::TurnLeft { tank: TANK }
            ]
        );

        out.clear();
        assert_eq!(steer(TANK, FRAC_PI_2, 0.0, &mut out), Some(Turn::Right));
        assert_eq!(out[1], Command::TurnRight { tank: TANK });

        out.clear();
        assert_eq!(steer(TANK, 0.1, TAU - 0.1, &mut out), Some(Turn::Right));
    }

    #[test]
    fn steer_is_silent_inside_dead_band() {
        let mut out = Vec::new();
        assert_eq!(steer(TANK, 1.0, 1.0 + DEAD_BAND * 0.5, &mut out), None);
        assert!(out.is_empty());
    }

    #[test]
    fn alignment_stops_rotation() {
        let mut out = Vec::new();
        assert!(!is_aligned(TANK, FRAC_PI_2, 0.0, &mut out));
        assert!(out.is_empty());

        assert!(is_aligned(TANK, 0.02, TAU - 0.02, &mut out));
        assert_eq!(out, vec![Command::StopTurning { tank: TANK }]);
    }

    #[test]
    fn tracker_flags_growing_distance() {
        let mut tracker = ProgressTracker::default();
        let waypoint = Vec2::new(1.5, 0.5);

        assert_eq!(tracker.sample(Vec2::new(0.6, 0.5), waypoint), Progress::Approaching);
        assert_eq!(tracker.sample(Vec2::new(1.0, 0.5), waypoint), Progress::Approaching);
        assert_eq!(tracker.sample(Vec2::new(1.5, 0.5), waypoint), Progress::Approaching);
        assert_eq!(tracker.sample(Vec2::new(1.6, 0.5), waypoint), Progress::Overshot);
        assert!((tracker.last_distance() - 0.1).abs() < 1e-5);
    }

    #[test]
    fn first_sample_compares_against_initial_distance() {
        let mut tracker = ProgressTracker::default();
        assert_eq!(
            tracker.sample(Vec2::ZERO, Vec2::new(2.0, 0.0)),
            Progress::Overshot
        );
    }

    proptest! {
        #[test]
        fn error_of_equal_angles_is_zero(angle in -20.0f32..20.0) {
            prop_assert!(angular_error(angle, angle).abs() < 1e-5);
        }

        #[test]
        fn error_is_antisymmetric(a in 0.0f32..TAU, b in 0.0f32..TAU) {
            let forward = angular_error(a, b);
            let backward = angular_error(b, a);
            prop_assume!((forward.abs() - PI).abs() > 1e-3);
            prop_assert!((forward + backward).abs() < 1e-4);
        }

        #[test]
        fn error_stays_within_half_turn(a in -50.0f32..50.0, b in -50.0f32..50.0) {
            let error = angular_error(a, b);
            prop_assert!(error > -PI - 1e-5 && error <= PI + 1e-5);
        }

        #[test]
        fn equal_headings_are_aligned(heading in -50.0f32..50.0) {
            let mut out = Vec::new();
            prop_assert!(is_aligned(TANK, heading, heading, &mut out));
            prop_assert_eq!(out, vec![Command::StopTurning { tank: TANK }]);
        }

        #[test]
        fn quarter_turn_is_never_aligned(heading in -50.0f32..50.0) {
            let mut out = Vec::new();
            prop_assert!(!is_aligned(TANK, heading + FRAC_PI_2, heading, &mut out));
            prop_assert!(out.is_empty());
        }
    }
}
