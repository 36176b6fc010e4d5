// Output port identifiers (a, b, c, d)

use std::fmt;
use std::str::FromStr;

/// One of the four motor outputs of the brick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    A,
    B,
    C,
    D,
}

impl Port {
    /// All ports in output order
    pub const ALL: [Port; 4] = [Port::A, Port::B, Port::C, Port::D];

    /// Zero-based output number (A=0 .. D=3)
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn letter(self) -> char {
        (b'a' + self.number()) as char
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown port '{0}'")]
pub struct UnknownPort(pub String);

impl FromStr for Port {
    type Err = UnknownPort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" => Ok(Port::A),
            "b" => Ok(Port::B),
            "c" => Ok(Port::C),
            "d" => Ok(Port::D),
            _ => Err(UnknownPort(s.to_string())),
        }
    }
}
