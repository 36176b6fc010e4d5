// Motor control module for EV3 outputs
//
// Provides:
// - The `Motor` capability shared by hardware and stand-in motors
// - EV3 direct command protocol implementation
// - Absolute position planning

mod driver;
mod dummy;
pub mod ev3;
pub mod planner;
mod port;

pub use driver::{Brick, Ev3Motor};
pub use dummy::DummyMotor;
pub use ev3::{Ev3Bus, Ev3Error};
pub use planner::{plan_turn, TurnPlan};
pub use port::{Port, UnknownPort};

/// Largest rotation a single bounded move can request (the brick counts steps as i32)
pub const MAX_DEGREES: u32 = i32::MAX as u32;

/// Failure of a single motor call
#[derive(Debug, thiserror::Error)]
pub enum MotorError {
    #[error("Device error: {0}")]
    Device(#[from] Ev3Error),

    #[error("Move of {0} degrees exceeds the {max} degree limit", max = MAX_DEGREES)]
    TooFar(u32),

    #[error("Device connection poisoned by an earlier panic")]
    Poisoned,
}

/// Operations every motor (real or simulated) supports
///
/// Bounded moves start asynchronously: `on_for` returns once the move has been
/// accepted, and `wait` blocks until it has finished. Implementations serialize
/// access to the device themselves, so a motor can be shared between requests.
pub trait Motor: Send + Sync {
    /// Run continuously; the sign of `speed` gives the direction
    fn on(&self, speed: i8) -> Result<(), MotorError>;

    /// Run for `degrees` of rotation, then hold position if `brake` is set or coast otherwise
    ///
    /// Moves longer than `MAX_DEGREES` fail with `MotorError::TooFar` before anything moves.
    fn on_for(&self, speed: i8, degrees: u32, brake: bool) -> Result<(), MotorError>;

    /// Cut power and coast to a stop
    fn off(&self) -> Result<(), MotorError>;

    /// Stop and hold the current position
    fn brake(&self) -> Result<(), MotorError>;

    /// Block until the last bounded move has completed; returns at once when idle
    fn wait(&self) -> Result<(), MotorError>;

    /// Accumulated rotation since the last reset
    fn counter(&self) -> Result<i32, MotorError>;

    /// Zero the rotation counter without stopping
    fn reset(&self) -> Result<(), MotorError>;

    /// Move to an absolute counter position; direction is derived from the current counter
    fn turn_to(&self, speed: i8, target: i32, brake: bool) -> Result<(), MotorError> {
        let plan = plan_turn(self.counter()?, target, speed);
        self.on_for(plan.speed, plan.degrees, brake)
    }
}
