// Command vocabulary and reply types

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::motor::MAX_DEGREES;

/// Names of the actions a client can request on a motor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SwitchOn,
    SwitchOff,
    TurnBy,
    TurnTo,
    MoveBy,
    Wait,
    GetCounter,
    Reset,
    Brake,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::SwitchOn,
        Action::SwitchOff,
        Action::TurnBy,
        Action::TurnTo,
        Action::MoveBy,
        Action::Wait,
        Action::GetCounter,
        Action::Reset,
        Action::Brake,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::SwitchOn => "switchOn",
            Action::SwitchOff => "switchOff",
            Action::TurnBy => "turnBy",
            Action::TurnTo => "turnTo",
            Action::MoveBy => "moveBy",
            Action::Wait => "wait",
            Action::GetCounter => "getCounter",
            Action::Reset => "reset",
            Action::Brake => "brake",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown action '{0}'")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

/// A rejected request parameter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error("Missing parameter '{0}'")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for parameter '{name}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Query parameters of one request
pub type Params = HashMap<String, String>;

/// A fully validated command, ready to run against a motor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SwitchOn { speed: i8 },
    SwitchOff,
    TurnBy { speed: i8, degrees: u32, brake: bool },
    /// `speed` is a magnitude here; direction comes from the current position
    TurnTo { speed: i8, target: i32, brake: bool },
    MoveBy { speed: i8, degrees: u32, brake: bool },
    Wait,
    GetCounter,
    Reset,
    Brake,
}

impl Command {
    /// Build the command for `action`, checking every parameter it needs
    pub fn parse(action: Action, params: &Params) -> Result<Self, ParamError> {
        let command = match action {
            Action::SwitchOn => Command::SwitchOn {
                speed: required(params, "speed")?,
            },
            Action::SwitchOff => Command::SwitchOff,
            Action::TurnBy => Command::TurnBy {
                speed: required(params, "speed")?,
                degrees: degrees(params)?,
                brake: brake(params)?,
            },
            Action::TurnTo => {
                let speed: i8 = required(params, "speed")?;
                if speed < 0 {
                    return Err(ParamError::Invalid {
                        name: "speed",
                        value: speed.to_string(),
                        reason: "must not be negative".to_string(),
                    });
                }
                Command::TurnTo {
                    speed,
                    target: required(params, "degrees")?,
                    brake: brake(params)?,
                }
            }
            Action::MoveBy => Command::MoveBy {
                speed: required(params, "speed")?,
                degrees: degrees(params)?,
                brake: brake(params)?,
            },
            Action::Wait => Command::Wait,
            Action::GetCounter => Command::GetCounter,
            Action::Reset => Command::Reset,
            Action::Brake => Command::Brake,
        };
        Ok(command)
    }
}

fn required<T>(params: &Params, name: &'static str) -> Result<T, ParamError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let value = params.get(name).ok_or(ParamError::Missing(name))?;
    value.parse().map_err(|e: T::Err| ParamError::Invalid {
        name,
        value: value.clone(),
        reason: e.to_string(),
    })
}

/// Relative rotation, limited to what one bounded move can carry
fn degrees(params: &Params) -> Result<u32, ParamError> {
    let degrees: u32 = required(params, "degrees")?;
    if degrees > MAX_DEGREES {
        return Err(ParamError::Invalid {
            name: "degrees",
            value: degrees.to_string(),
            reason: format!("must not exceed {}", MAX_DEGREES),
        });
    }
    Ok(degrees)
}

fn brake(params: &Params) -> Result<bool, ParamError> {
    match params.get("brake").map(String::as_str) {
        None => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
        Some(v) => Err(ParamError::Invalid {
            name: "brake",
            value: v.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

/// Successful outcome of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Empty,
    Counter(i32),
}

impl Reply {
    /// Plain text body sent back to the client
    pub fn body(&self) -> String {
        match self {
            Reply::Empty => String::new(),
            Reply::Counter(value) => value.to_string(),
        }
    }
}

/// Error body sent back to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub status: u16,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_action_names() {
        for action in Action::ALL {
            assert_eq!(action.name().parse::<Action>(), Ok(action));
        }
        assert!("switchon".parse::<Action>().is_err());
        assert!("fly".parse::<Action>().is_err());
    }

    #[test]
    fn test_parse_switch_on() {
        let cmd = Command::parse(Action::SwitchOn, &params(&[("speed", "-40")])).unwrap();
        assert_eq!(cmd, Command::SwitchOn { speed: -40 });
    }

    #[test]
    fn test_parse_turn_by_defaults_to_coast() {
        let cmd = Command::parse(
            Action::TurnBy,
            &params(&[("speed", "20"), ("degrees", "360")]),
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::TurnBy {
                speed: 20,
                degrees: 360,
                brake: false
            }
        );
    }

    #[test]
    fn test_parse_brake_flag() {
        for (raw, expected) in [("true", true), ("1", true), ("False", false), ("0", false)] {
            let cmd = Command::parse(
                Action::TurnBy,
                &params(&[("speed", "20"), ("degrees", "10"), ("brake", raw)]),
            )
            .unwrap();
            assert!(matches!(cmd, Command::TurnBy { brake, .. } if brake == expected));
        }

        let err = Command::parse(
            Action::TurnBy,
            &params(&[("speed", "20"), ("degrees", "10"), ("brake", "maybe")]),
        )
        .unwrap_err();
        assert!(matches!(err, ParamError::Invalid { name: "brake", .. }));
    }

    #[test]
    fn test_parse_turn_to_accepts_negative_target() {
        let cmd = Command::parse(
            Action::TurnTo,
            &params(&[("speed", "100"), ("degrees", "-200"), ("brake", "true")]),
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::TurnTo {
                speed: 100,
                target: -200,
                brake: true
            }
        );
    }

    #[test]
    fn test_parse_turn_to_rejects_negative_speed() {
        let err = Command::parse(
            Action::TurnTo,
            &params(&[("speed", "-10"), ("degrees", "90")]),
        )
        .unwrap_err();
        assert!(matches!(err, ParamError::Invalid { name: "speed", .. }));
    }

    #[test]
    fn test_parse_rejects_bad_numbers() {
        let err = Command::parse(
            Action::TurnBy,
            &params(&[("speed", "10"), ("degrees", "-90")]),
        )
        .unwrap_err();
        assert!(matches!(err, ParamError::Invalid { name: "degrees", .. }));

        let err = Command::parse(Action::SwitchOn, &params(&[("speed", "fast")])).unwrap_err();
        assert!(matches!(err, ParamError::Invalid { name: "speed", .. }));

        let err = Command::parse(Action::SwitchOn, &params(&[("speed", "300")])).unwrap_err();
        assert!(matches!(err, ParamError::Invalid { name: "speed", .. }));
    }

    #[test]
    fn test_parse_rejects_oversized_relative_moves() {
        let limit = MAX_DEGREES.to_string();
        let over = (MAX_DEGREES + 1).to_string();

        for action in [Action::TurnBy, Action::MoveBy] {
            let ok = params(&[("speed", "10"), ("degrees", limit.as_str())]);
            assert!(Command::parse(action, &ok).is_ok(), "{}", action);

            let over = params(&[("speed", "10"), ("degrees", over.as_str())]);
            let err = Command::parse(action, &over).unwrap_err();
            assert!(matches!(err, ParamError::Invalid { name: "degrees", .. }), "{}", action);
        }
    }

    #[test]
    fn test_parse_missing_parameters() {
        assert_eq!(
            Command::parse(Action::MoveBy, &params(&[("speed", "10")])),
            Err(ParamError::Missing("degrees"))
        );
        assert_eq!(
            Command::parse(Action::SwitchOn, &Params::new()),
            Err(ParamError::Missing("speed"))
        );
    }

    #[test]
    fn test_parameterless_actions_ignore_extras() {
        let extra = params(&[("speed", "nonsense")]);
        assert_eq!(Command::parse(Action::Wait, &extra), Ok(Command::Wait));
        assert_eq!(Command::parse(Action::Reset, &extra), Ok(Command::Reset));
    }

    #[test]
    fn test_reply_body() {
        assert_eq!(Reply::Counter(10).body(), "10");
        assert_eq!(Reply::Counter(-5).body(), "-5");
        assert_eq!(Reply::Empty.body(), "");
    }

    #[test]
    fn test_error_reply_json() {
        let reply = ErrorReply {
            status: 404,
            message: "Unknown port 'e'".to_string(),
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(json, r#"{"status":404,"message":"Unknown port 'e'"}"#);
    }
}
