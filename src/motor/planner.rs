// Absolute position planning
// Converts a target tacho position into a signed relative move from the current counter.

/// A bounded move derived from an absolute target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnPlan {
    /// Signed speed, direction towards the target
    pub speed: i8,
    /// Rotation magnitude in degrees
    pub degrees: u32,
}

/// Plan the move from `current` to `target` at the given speed magnitude
///
/// The path is the plain difference between the two counter values. Positions are
/// not wrapped to a single revolution, so a target of 10 from a counter of 350
/// turns back 340 degrees rather than forward 20.
///
/// A target equal to the current position yields a zero-degree move at positive
/// speed, which still has to be issued so braking is applied in place.
pub fn plan_turn(current: i32, target: i32, speed: i8) -> TurnPlan {
    if target >= current {
        TurnPlan {
            speed,
            degrees: target.abs_diff(current),
        }
    } else {
        TurnPlan {
            speed: speed.saturating_neg(),
            degrees: current.abs_diff(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_from_positive() {
        assert_eq!(
            plan_turn(100, 180, 10),
            TurnPlan {
                speed: 10,
                degrees: 80
            }
        );
    }

    #[test]
    fn test_forward_across_zero() {
        assert_eq!(
            plan_turn(-200, 90, 100),
            TurnPlan {
                speed: 100,
                degrees: 290
            }
        );
    }

    #[test]
    fn test_backward_from_positive() {
        assert_eq!(
            plan_turn(180, 100, 10),
            TurnPlan {
                speed: -10,
                degrees: 80
            }
        );
    }

    #[test]
    fn test_backward_across_zero() {
        assert_eq!(
            plan_turn(90, -200, 100),
            TurnPlan {
                speed: -100,
                degrees: 290
            }
        );
    }

    #[test]
    fn test_same_position_is_zero_move() {
        for position in [-720, 0, 45, 360] {
            assert_eq!(
                plan_turn(position, position, 30),
                TurnPlan {
                    speed: 30,
                    degrees: 0
                }
            );
        }
    }

    #[test]
    fn test_no_wraparound() {
        // 350 -> 10 goes the long way back, not 20 degrees forward
        assert_eq!(
            plan_turn(350, 10, 20),
            TurnPlan {
                speed: -20,
                degrees: 340
            }
        );
        assert_eq!(plan_turn(0, 720, 20).degrees, 720);
    }

    #[test]
    fn test_direction_matches_difference() {
        for current in (-1000..=1000).step_by(125) {
            for target in (-1000..=1000).step_by(75) {
                let plan = plan_turn(current, target, 50);
                let signed = if plan.speed > 0 {
                    plan.degrees as i64
                } else {
                    -(plan.degrees as i64)
                };
                assert_eq!(current as i64 + signed, target as i64);
            }
        }
    }

    #[test]
    fn test_extreme_counters() {
        assert_eq!(plan_turn(i32::MIN, i32::MAX, 1).degrees, u32::MAX);
        assert_eq!(
            plan_turn(i32::MAX, i32::MIN, 1),
            TurnPlan {
                speed: -1,
                degrees: u32::MAX
            }
        );
        assert_eq!(plan_turn(0, -1, i8::MIN).speed, i8::MAX);
    }
}
