//! Per-channel rotation state and the smooth rotation controller.
//!
//! Every animated dial element is a [`RotationChannel`]. The controller keeps
//! one [`RotationState`] per channel and turns each new target bearing into one
//! or two [`RotationStep`]s. A step that would sweep more than half a turn is
//! split at the 0°/360° seam so the renderer never animates the long way round.

use std::fmt;

use log::{debug, warn};

use crate::angle::wrap360;
use crate::error::DisplayError;

/// Seam bounds. Clockwise legs stop at 359 and resume at 0.
const SEAM_HIGH: f64 = 359.0;
const SEAM_LOW: f64 = 0.0;

/// Largest difference still animated directly. Exactly 180° is not split.
const MAX_DIRECT_SWEEP: f64 = 180.0;

/// One independently animated dial element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationChannel {
    Heading,
    AppWindAngle,
    AppWindValue,
    TrueWindAngle,
    TrueWindValue,
    CourseOverGround,
    Waypoint,
}

impl RotationChannel {
    pub const ALL: [RotationChannel; 7] = [
        RotationChannel::Heading,
        RotationChannel::AppWindAngle,
        RotationChannel::AppWindValue,
        RotationChannel::TrueWindAngle,
        RotationChannel::TrueWindValue,
        RotationChannel::CourseOverGround,
        RotationChannel::Waypoint,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    /// Channel that counter-rotates with this one to keep its label upright.
    pub const fn counter(self) -> Option<RotationChannel> {
        match self {
            RotationChannel::AppWindAngle => Some(RotationChannel::AppWindValue),
            RotationChannel::TrueWindAngle => Some(RotationChannel::TrueWindValue),
            _ => None,
        }
    }

    /// Channel whose transitions drive this one, if it is a counter channel.
    pub const fn driver(self) -> Option<RotationChannel> {
        match self {
            RotationChannel::AppWindValue => Some(RotationChannel::AppWindAngle),
            RotationChannel::TrueWindValue => Some(RotationChannel::TrueWindAngle),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            RotationChannel::Heading => "heading",
            RotationChannel::AppWindAngle => "appWindAngle",
            RotationChannel::AppWindValue => "appWindValue",
            RotationChannel::TrueWindAngle => "trueWindAngle",
            RotationChannel::TrueWindValue => "trueWindValue",
            RotationChannel::CourseOverGround => "courseOverGround",
            RotationChannel::Waypoint => "waypoint",
        }
    }
}

impl fmt::Display for RotationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationPhase {
    Idle,
    Transitioning,
}

/// Previous and target angle of one channel.
///
/// Primary channels always hold bearings in `[0, 360)`. Counter channels hold
/// the negated values of their driver and may be negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationState {
    pub previous: f64,
    pub target: f64,
    pub active: bool,
}

impl RotationState {
    fn at_rest() -> Self {
        Self {
            previous: SEAM_LOW,
            target: SEAM_LOW,
            active: false,
        }
    }

    pub fn phase(&self) -> RotationPhase {
        if self.active {
            RotationPhase::Transitioning
        } else {
            RotationPhase::Idle
        }
    }
}

/// A single animated rotation handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationCommand {
    pub channel: RotationChannel,
    pub from: f64,
    pub to: f64,
    pub duration_ms: u64,
}

impl RotationCommand {
    /// Signed sweep in degrees, positive clockwise.
    pub fn sweep(&self) -> f64 {
        self.to - self.from
    }

    /// Linear interpolation at `t` in `[0, 1]`.
    pub fn value_at(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }

    fn mirrored(&self, channel: RotationChannel) -> Self {
        Self {
            channel,
            // + 0.0 keeps a mirrored zero positive
            from: -self.from + 0.0,
            to: -self.to + 0.0,
            duration_ms: self.duration_ms,
        }
    }
}

/// Commands that must start together: a primary rotation and, for paired
/// channels, its counter-rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationStep {
    pub primary: RotationCommand,
    pub counter: Option<RotationCommand>,
}

impl RotationStep {
    pub fn commands(&self) -> impl Iterator<Item = &RotationCommand> {
        std::iter::once(&self.primary).chain(self.counter.iter())
    }
}

/// Ordered `(from, to)` legs from `current` to `target`.
///
/// A single leg when the direct path is at most half a turn, otherwise the
/// route is split at the seam in the direction of travel.
pub fn plan_route(current: f64, target: f64) -> Vec<(f64, f64)> {
    let diff = current - target;
    if diff.abs() <= MAX_DIRECT_SWEEP {
        return vec![(current, target)];
    }

    if diff > 0.0 {
        // clockwise through 359 -> 0
        if current == SEAM_HIGH {
            vec![(SEAM_LOW, target)]
        } else {
            vec![(current, SEAM_HIGH), (SEAM_LOW, target)]
        }
    } else if current == SEAM_LOW {
        // counter-clockwise through 0 -> 359
        vec![(SEAM_HIGH, target)]
    } else {
        vec![(current, SEAM_LOW), (SEAM_HIGH, target)]
    }
}

/// Owns every channel's rotation state and emits rotation steps.
#[derive(Debug, Clone)]
pub struct RotationController {
    states: [Option<RotationState>; 7],
    duration_ms: u64,
}

impl RotationController {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            states: [None; 7],
            duration_ms,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn state(&self, channel: RotationChannel) -> Option<&RotationState> {
        self.states[channel.index()].as_ref()
    }

    pub fn is_active(&self, channel: RotationChannel) -> bool {
        self.state(channel).is_some_and(|s| s.active)
    }

    /// Move `channel` to `bearing`, returning the steps to animate in order.
    ///
    /// Returns no steps when `bearing` already is the channel's target. A
    /// transition still running on the renderer is superseded: the new route
    /// starts from the last target.
    pub fn request_transition(
        &mut self,
        channel: RotationChannel,
        bearing: f64,
    ) -> Result<Vec<RotationStep>, DisplayError> {
        if let Some(driver) = channel.driver() {
            return Err(DisplayError::DrivenChannel(channel, driver));
        }
        if !bearing.is_finite() {
            warn!("Rejected {} bearing {}", channel, bearing);
            return Err(DisplayError::InvalidBearing {
                channel,
                value: bearing,
            });
        }

        let target = wrap360(bearing);
        let state = self.states[channel.index()].get_or_insert_with(RotationState::at_rest);
        let current = state.target;
        if current == target {
            return Ok(Vec::new());
        }

        let route = plan_route(current, target);
        if route.len() > 1 || route[0].0 != current {
            debug!(
                "{} crosses the seam: {} -> {} in {} leg(s)",
                channel,
                current,
                target,
                route.len()
            );
        }

        state.previous = current;
        state.target = target;
        state.active = true;

        let counter = channel.counter();
        if let Some(counter) = counter {
            let counter_state =
                self.states[counter.index()].get_or_insert_with(RotationState::at_rest);
            counter_state.previous = -current + 0.0;
            counter_state.target = -target + 0.0;
            counter_state.active = true;
        }

        let steps = route
            .into_iter()
            .map(|(from, to)| {
                let primary = RotationCommand {
                    channel,
                    from,
                    to,
                    duration_ms: self.duration_ms,
                };
                RotationStep {
                    primary,
                    counter: counter.map(|c| primary.mirrored(c)),
                }
            })
            .collect();

        Ok(steps)
    }

    /// Renderer reports the animation on `channel` finished.
    ///
    /// Completing a primary channel also completes its counter channel.
    pub fn complete(&mut self, channel: RotationChannel) {
        if let Some(state) = self.states[channel.index()].as_mut() {
            state.active = false;
        }
        if let Some(counter) = channel.counter() {
            if let Some(state) = self.states[counter.index()].as_mut() {
                state.active = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn legs(steps: &[RotationStep]) -> Vec<(f64, f64)> {
        steps.iter().map(|s| (s.primary.from, s.primary.to)).collect()
    }

    fn controller_at(channel: RotationChannel, bearing: f64) -> RotationController {
        let mut controller = RotationController::new(500);
        controller.request_transition(channel, bearing).unwrap();
        controller.complete(channel);
        controller
    }

    #[rstest]
    #[case(10.0, 50.0, vec![(10.0, 50.0)])]
    #[case(0.0, 180.0, vec![(0.0, 180.0)])] // exactly half a turn stays direct
    #[case(200.0, 20.0, vec![(200.0, 20.0)])]
    #[case(350.0, 10.0, vec![(350.0, 359.0), (0.0, 10.0)])]
    #[case(359.0, 1.0, vec![(0.0, 1.0)])]
    #[case(10.0, 350.0, vec![(10.0, 0.0), (359.0, 350.0)])]
    #[case(0.0, 270.0, vec![(359.0, 270.0)])]
    fn test_plan_route(
        #[case] current: f64,
        #[case] target: f64,
        #[case] expected: Vec<(f64, f64)>,
    ) {
        assert_eq!(plan_route(current, target), expected);
    }

    #[test]
    fn test_first_sample_starts_from_rest() {
        let mut controller = RotationController::new(500);
        let steps = controller
            .request_transition(RotationChannel::Heading, 90.0)
            .unwrap();

        assert_eq!(legs(&steps), vec![(0.0, 90.0)]);
        let state = controller.state(RotationChannel::Heading).unwrap();
        assert_eq!(state.previous, 0.0);
        assert_eq!(state.target, 90.0);
        assert_eq!(state.phase(), RotationPhase::Transitioning);
    }

    #[test]
    fn test_same_target_is_noop() {
        let mut controller = controller_at(RotationChannel::Heading, 42.0);
        let steps = controller
            .request_transition(RotationChannel::Heading, 42.0)
            .unwrap();
        assert!(steps.is_empty());
        assert!(!controller.is_active(RotationChannel::Heading));
    }

    #[test]
    fn test_input_is_wrapped() {
        let mut controller = controller_at(RotationChannel::Heading, 20.0);
        let steps = controller
            .request_transition(RotationChannel::Heading, 400.0)
            .unwrap();
        assert_eq!(legs(&steps), vec![(20.0, 40.0)]);
    }

    #[test]
    fn test_invalid_bearing_keeps_state() {
        let mut controller = controller_at(RotationChannel::Waypoint, 120.0);
        let before = *controller.state(RotationChannel::Waypoint).unwrap();

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = controller
                .request_transition(RotationChannel::Waypoint, bad)
                .unwrap_err();
            assert!(matches!(
                err,
                DisplayError::InvalidBearing {
                    channel: RotationChannel::Waypoint,
                    ..
                }
            ));
        }
        assert_eq!(*controller.state(RotationChannel::Waypoint).unwrap(), before);
    }

    #[test]
    fn test_counter_channel_cannot_be_driven() {
        let mut controller = RotationController::new(500);
        let err = controller
            .request_transition(RotationChannel::AppWindValue, 10.0)
            .unwrap_err();
        assert_eq!(
            err,
            DisplayError::DrivenChannel(RotationChannel::AppWindValue, RotationChannel::AppWindAngle)
        );
        assert!(controller.state(RotationChannel::AppWindValue).is_none());
    }

    #[test]
    fn test_seam_split_counter_clockwise() {
        let mut controller = controller_at(RotationChannel::Heading, 10.0);
        let steps = controller
            .request_transition(RotationChannel::Heading, 350.0)
            .unwrap();

        assert_eq!(legs(&steps), vec![(10.0, 0.0), (359.0, 350.0)]);
        for step in &steps {
            assert!(step.primary.sweep() < 0.0);
        }
    }

    #[test]
    fn test_paired_channel_mirrors_every_leg() {
        let mut controller = controller_at(RotationChannel::TrueWindAngle, 350.0);
        let steps = controller
            .request_transition(RotationChannel::TrueWindAngle, 10.0)
            .unwrap();

        assert_eq!(steps.len(), 2);
        let counters: Vec<_> = steps
            .iter()
            .map(|s| s.counter.unwrap())
            .map(|c| (c.channel, c.from, c.to))
            .collect();
        assert_eq!(
            counters,
            vec![
                (RotationChannel::TrueWindValue, -350.0, -359.0),
                (RotationChannel::TrueWindValue, 0.0, -10.0),
            ]
        );
        assert!(steps[1].counter.unwrap().from.is_sign_positive());

        let counter_state = controller.state(RotationChannel::TrueWindValue).unwrap();
        assert_eq!(counter_state.previous, -350.0);
        assert_eq!(counter_state.target, -10.0);
        assert!(counter_state.active);
    }

    #[test]
    fn test_unpaired_channel_has_no_counter() {
        let mut controller = RotationController::new(250);
        let steps = controller
            .request_transition(RotationChannel::CourseOverGround, 45.0)
            .unwrap();
        assert!(steps[0].counter.is_none());
        assert_eq!(steps[0].primary.duration_ms, 250);
        assert_eq!(steps[0].commands().count(), 1);
    }

    #[test]
    fn test_complete_clears_pair() {
        let mut controller = RotationController::new(500);
        controller
            .request_transition(RotationChannel::AppWindAngle, 30.0)
            .unwrap();
        assert!(controller.is_active(RotationChannel::AppWindValue));

        controller.complete(RotationChannel::AppWindAngle);
        assert!(!controller.is_active(RotationChannel::AppWindAngle));
        assert!(!controller.is_active(RotationChannel::AppWindValue));
    }

    #[test]
    fn test_request_mid_animation_supersedes() {
        let mut controller = RotationController::new(500);
        controller
            .request_transition(RotationChannel::Heading, 90.0)
            .unwrap();
        // renderer has not completed the first rotation yet
        let steps = controller
            .request_transition(RotationChannel::Heading, 120.0)
            .unwrap();
        assert_eq!(legs(&steps), vec![(90.0, 120.0)]);
        assert_eq!(controller.state(RotationChannel::Heading).unwrap().previous, 90.0);
    }

    #[test]
    fn test_command_value_at() {
        let command = RotationCommand {
            channel: RotationChannel::Heading,
            from: 10.0,
            to: 0.0,
            duration_ms: 500,
        };
        assert_eq!(command.value_at(0.0), 10.0);
        assert_eq!(command.value_at(0.5), 5.0);
        assert_eq!(command.value_at(2.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_every_leg_is_short(start in 0.0f64..360.0, next in 0.0f64..360.0) {
            let mut controller = RotationController::new(500);
            controller.request_transition(RotationChannel::Heading, start).unwrap();
            let steps = controller.request_transition(RotationChannel::Heading, next).unwrap();
            for step in steps {
                prop_assert!(step.primary.sweep().abs() <= 180.0);
                prop_assert!((0.0..360.0).contains(&step.primary.to));
            }
        }
    }
}
