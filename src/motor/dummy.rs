// Stand-in motor for running without a brick
//
// Bounded moves complete instantly: the counter jumps by the requested rotation
// as soon as the move is issued, so `wait` never blocks.

use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use super::{Motor, MotorError};

#[derive(Debug, Default)]
struct DummyState {
    counter: i32,
    speed: i8,
    braked: bool,
}

/// A motor that only keeps its counter in memory
#[derive(Debug, Default)]
pub struct DummyMotor {
    state: Mutex<DummyState>,
}

impl DummyMotor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a given counter value
    pub fn with_counter(counter: i32) -> Self {
        Self {
            state: Mutex::new(DummyState {
                counter,
                ..DummyState::default()
            }),
        }
    }

    /// Speed of the current continuous run (0 when stopped)
    pub fn speed(&self) -> Result<i8, MotorError> {
        Ok(self.state()?.speed)
    }

    /// Whether the motor is holding its position
    pub fn is_braked(&self) -> Result<bool, MotorError> {
        Ok(self.state()?.braked)
    }

    fn state(&self) -> Result<MutexGuard<'_, DummyState>, MotorError> {
        self.state.lock().map_err(|_| MotorError::Poisoned)
    }
}

impl Motor for DummyMotor {
    fn on(&self, speed: i8) -> Result<(), MotorError> {
        debug!("Dummy motor: on at speed {}", speed);
        let mut state = self.state()?;
        state.speed = speed;
        state.braked = false;
        Ok(())
    }

    fn on_for(&self, speed: i8, degrees: u32, brake: bool) -> Result<(), MotorError> {
        debug!(
            "Dummy motor: on at speed {} for {} degrees (brake={})",
            speed, degrees, brake
        );
        let delta = i32::try_from(degrees).map_err(|_| MotorError::TooFar(degrees))?;
        let mut state = self.state()?;
        state.counter = if speed < 0 {
            state.counter.wrapping_sub(delta)
        } else if speed > 0 {
            state.counter.wrapping_add(delta)
        } else {
            state.counter
        };
        state.speed = 0;
        state.braked = brake;
        Ok(())
    }

    fn off(&self) -> Result<(), MotorError> {
        debug!("Dummy motor: off");
        let mut state = self.state()?;
        state.speed = 0;
        state.braked = false;
        Ok(())
    }

    fn brake(&self) -> Result<(), MotorError> {
        debug!("Dummy motor: brake");
        let mut state = self.state()?;
        state.speed = 0;
        state.braked = true;
        Ok(())
    }

    fn wait(&self) -> Result<(), MotorError> {
        Ok(())
    }

    fn counter(&self) -> Result<i32, MotorError> {
        Ok(self.state()?.counter)
    }

    fn reset(&self) -> Result<(), MotorError> {
        debug!("Dummy motor: reset counter");
        self.state()?.counter = 0;
        Ok(())
    }
}
