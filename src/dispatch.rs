// Request dispatch: validate port, action and parameters, then drive one motor

use tracing::{debug, error};

use crate::messages::{Action, Command, ErrorReply, ParamError, Params, Reply, UnknownAction};
use crate::motor::{Motor, MotorError, Port, UnknownPort};
use crate::registry::MotorRegistry;

/// Why a request was not carried out
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    BadRequest(#[from] ParamError),

    #[error("Motor {port} failed during {action}: {source}")]
    Device {
        port: Port,
        action: Action,
        #[source]
        source: MotorError,
    },
}

impl DispatchError {
    /// HTTP-style status code for the client
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::NotFound(_) => 404,
            DispatchError::BadRequest(_) => 400,
            // A planned move too long for one command is a client error, not a fault
            DispatchError::Device {
                source: MotorError::TooFar(_),
                ..
            } => 400,
            DispatchError::Device { .. } => 500,
        }
    }

    pub fn to_reply(&self) -> ErrorReply {
        ErrorReply {
            status: self.status(),
            message: self.to_string(),
        }
    }
}

/// Stateless translator from requests to motor calls
#[derive(Clone, Copy)]
pub struct Dispatcher<'a> {
    registry: &'a MotorRegistry,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a MotorRegistry) -> Self {
        Self { registry }
    }

    /// Handle one request addressed to `port` with the named `action`
    ///
    /// Everything is validated before the first motor call, so a rejected request
    /// never leaves a command half applied.
    pub fn dispatch(
        &self,
        port: &str,
        action: &str,
        params: &Params,
    ) -> Result<Reply, DispatchError> {
        let port: Port = port
            .parse()
            .map_err(|e: UnknownPort| DispatchError::NotFound(e.to_string()))?;
        let action: Action = action
            .parse()
            .map_err(|e: UnknownAction| DispatchError::NotFound(e.to_string()))?;
        let command = Command::parse(action, params)?;

        debug!("Motor {}: {:?}", port, command);
        execute(self.registry.get(port), command).map_err(|source| {
            error!("Motor {} failed during {}: {}", port, action, source);
            DispatchError::Device {
                port,
                action,
                source,
            }
        })
    }
}

/// Run a validated command against a motor
pub fn execute(motor: &dyn Motor, command: Command) -> Result<Reply, MotorError> {
    match command {
        Command::SwitchOn { speed } => motor.on(speed)?,
        Command::SwitchOff => motor.off()?,
        Command::TurnBy {
            speed,
            degrees,
            brake,
        } => motor.on_for(speed, degrees, brake)?,
        Command::TurnTo {
            speed,
            target,
            brake,
        } => motor.turn_to(speed, target, brake)?,
        Command::MoveBy {
            speed,
            degrees,
            brake,
        } => {
            motor.on_for(speed, degrees, brake)?;
            motor.wait()?;
        }
        Command::Wait => motor.wait()?,
        Command::GetCounter => return Ok(Reply::Counter(motor.counter()?)),
        Command::Reset => motor.reset()?,
        Command::Brake => motor.brake()?,
    }
    Ok(Reply::Empty)
}
