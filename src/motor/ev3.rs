// LEGO EV3 direct command protocol
//
// Every message is length-prefixed:
// Command: [len lo, len hi, counter lo, counter hi, type, globals lo, locals|globals hi, opcodes...]
// Reply:   [len lo, len hi, counter lo, counter hi, type, global vars...]

use serialport::{self, SerialPort};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::debug;

use crate::config::{EV3_BAUDRATE, EV3_TIMEOUT_MS};

/// Command types
const DIRECT_COMMAND_REPLY: u8 = 0x00;
const DIRECT_COMMAND_NO_REPLY: u8 = 0x80;

/// Reply types
const DIRECT_REPLY: u8 = 0x02;
const DIRECT_REPLY_ERROR: u8 = 0x04;

/// All outputs live on layer 0 when there is a single brick
const LAYER: u8 = 0;

/// Output opcodes
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Opcode {
    OutputStop = 0xA3,
    OutputSpeed = 0xA5,
    OutputStart = 0xA6,
    OutputTest = 0xA9,
    OutputStepSpeed = 0xAE,
    OutputClrCount = 0xB2,
    OutputGetCount = 0xB3,
}

/// Error types for EV3 communication
#[derive(Debug, thiserror::Error)]
pub enum Ev3Error {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout waiting for reply to message {counter}")]
    Timeout { counter: u16 },

    #[error("Invalid reply to message {counter}: {reason}")]
    InvalidReply { counter: u16, reason: String },

    #[error("Reply counter mismatch: expected {expected}, got {got}")]
    CounterMismatch { expected: u16, got: u16 },

    #[error("Brick rejected message {counter}")]
    CommandFailed { counter: u16 },

    #[error("Value {value} does not fit the {what} parameter")]
    OutOfRange { what: &'static str, value: i64 },
}

pub type Result<T> = std::result::Result<T, Ev3Error>;

/// Append a local constant using the shortest encoding that fits
pub fn push_lc(buf: &mut Vec<u8>, value: i32) {
    if (-31..=31).contains(&value) {
        // Short form: bit 7 clear, bit 6 clear (constant), 6-bit two's complement
        buf.push((value as u8) & 0x3F);
    } else if let Ok(v) = i8::try_from(value) {
        buf.push(0x81);
        buf.push(v as u8);
    } else if let Ok(v) = i16::try_from(value) {
        buf.push(0x82);
        buf.extend_from_slice(&v.to_le_bytes());
    } else {
        buf.push(0x83);
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

/// Append a reference to a global variable at the given byte offset
pub fn push_gv(buf: &mut Vec<u8>, offset: u8) {
    // Short form: bit 6 set (variable), bit 5 set (global)
    buf.push(0x60 | (offset & 0x1F));
}

/// Build a complete direct command frame
pub fn build_command(counter: u16, reply: bool, globals: u16, ops: &[u8]) -> Vec<u8> {
    // counter (2) + type (1) + header (2) + opcodes
    let length = (5 + ops.len()) as u16;
    let mut frame = Vec::with_capacity(2 + length as usize);

    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&counter.to_le_bytes());
    frame.push(if reply {
        DIRECT_COMMAND_REPLY
    } else {
        DIRECT_COMMAND_NO_REPLY
    });
    // No locals are used, so the high byte only carries the top two bits of globals
    frame.push((globals & 0xFF) as u8);
    frame.push(((globals >> 8) & 0x03) as u8);
    frame.extend_from_slice(ops);

    frame
}

/// Validate a reply body (everything after the length field) and return its global variables
pub fn parse_reply(expected: u16, body: &[u8]) -> Result<Vec<u8>> {
    if body.len() < 3 {
        return Err(Ev3Error::InvalidReply {
            counter: expected,
            reason: format!("Reply too short: {} bytes", body.len()),
        });
    }

    let got = u16::from_le_bytes([body[0], body[1]]);
    if got != expected {
        return Err(Ev3Error::CounterMismatch { expected, got });
    }

    match body[2] {
        DIRECT_REPLY => Ok(body[3..].to_vec()),
        DIRECT_REPLY_ERROR => Err(Ev3Error::CommandFailed { counter: got }),
        other => Err(Ev3Error::InvalidReply {
            counter: got,
            reason: format!("Unknown reply type 0x{:02X}", other),
        }),
    }
}

/// Bit mask addressing one output port (A=1, B=2, C=4, D=8)
fn mask(port_no: u8) -> i32 {
    1 << port_no
}

/// Byte stream carrying direct commands (a serial port outside of tests)
pub trait Link: Read + Write + Send {}

impl<T: Read + Write + Send> Link for T {}

/// Connection to an EV3 brick
pub struct Ev3Bus {
    port: Box<dyn Link>,
    counter: u16,
}

impl Ev3Bus {
    /// Open a serial connection to the brick
    pub fn open(port_name: &str) -> Result<Self> {
        let port: Box<dyn SerialPort> = serialport::new(port_name, EV3_BAUDRATE)
            .timeout(Duration::from_millis(EV3_TIMEOUT_MS))
            .open()?;

        Ok(Self::from_link(Box::new(port)))
    }

    /// Talk to the brick over an already open link
    pub fn from_link(port: Box<dyn Link>) -> Self {
        Self { port, counter: 0 }
    }

    fn next_counter(&mut self) -> u16 {
        self.counter = self.counter.wrapping_add(1);
        self.counter
    }

    /// Read one length-prefixed reply frame
    fn read_reply(&mut self, counter: u16) -> Result<Vec<u8>> {
        let mut length = [0u8; 2];
        self.port.read_exact(&mut length).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                Ev3Error::Timeout { counter }
            } else {
                Ev3Error::Io(e)
            }
        })?;

        let mut body = vec![0u8; u16::from_le_bytes(length) as usize];
        self.port.read_exact(&mut body)?;
        parse_reply(counter, &body)
    }

    /// Send opcodes as one direct command and wait for the brick's reply
    pub fn execute(&mut self, ops: &[u8], globals: u16) -> Result<Vec<u8>> {
        let counter = self.next_counter();
        let frame = build_command(counter, true, globals, ops);
        debug!("EV3 command {}: {:02X?}", counter, frame);

        self.port.write_all(&frame)?;
        self.port.flush()?;

        let vars = self.read_reply(counter)?;
        if vars.len() < globals as usize {
            return Err(Ev3Error::InvalidReply {
                counter,
                reason: format!("Expected {} global bytes, got {}", globals, vars.len()),
            });
        }
        Ok(vars)
    }

    // === Output commands ===

    /// Run an output continuously at the given speed
    pub fn start_speed(&mut self, port_no: u8, speed: i8) -> Result<()> {
        let mut ops = Vec::with_capacity(12);
        ops.push(Opcode::OutputSpeed as u8);
        push_lc(&mut ops, LAYER.into());
        push_lc(&mut ops, mask(port_no));
        push_lc(&mut ops, speed.into());
        ops.push(Opcode::OutputStart as u8);
        push_lc(&mut ops, LAYER.into());
        push_lc(&mut ops, mask(port_no));

        self.execute(&ops, 0).map(|_| ())
    }

    /// Run an output for a number of degrees at constant speed (no ramps)
    pub fn step_speed(&mut self, port_no: u8, speed: i8, degrees: u32, brake: bool) -> Result<()> {
        let steps = i32::try_from(degrees).map_err(|_| Ev3Error::OutOfRange {
            what: "step",
            value: degrees.into(),
        })?;

        let mut ops = Vec::with_capacity(20);
        ops.push(Opcode::OutputStepSpeed as u8);
        push_lc(&mut ops, LAYER.into());
        push_lc(&mut ops, mask(port_no));
        push_lc(&mut ops, speed.into());
        push_lc(&mut ops, 0); // ramp up
        push_lc(&mut ops, steps);
        push_lc(&mut ops, 0); // ramp down
        push_lc(&mut ops, brake.into());

        self.execute(&ops, 0).map(|_| ())
    }

    /// Stop an output, either holding position (brake) or coasting
    pub fn stop(&mut self, port_no: u8, brake: bool) -> Result<()> {
        self.stop_mask(mask(port_no), brake)
    }

    /// Stop every output at once
    pub fn stop_all(&mut self, brake: bool) -> Result<()> {
        self.stop_mask(0x0F, brake)
    }

    fn stop_mask(&mut self, nos: i32, brake: bool) -> Result<()> {
        let mut ops = Vec::with_capacity(4);
        ops.push(Opcode::OutputStop as u8);
        push_lc(&mut ops, LAYER.into());
        push_lc(&mut ops, nos);
        push_lc(&mut ops, brake.into());

        self.execute(&ops, 0).map(|_| ())
    }

    /// Check whether an output is still running a bounded move
    pub fn is_busy(&mut self, port_no: u8) -> Result<bool> {
        let mut ops = Vec::with_capacity(4);
        ops.push(Opcode::OutputTest as u8);
        push_lc(&mut ops, LAYER.into());
        push_lc(&mut ops, mask(port_no));
        push_gv(&mut ops, 0);

        let vars = self.execute(&ops, 1)?;
        Ok(vars[0] != 0)
    }

    /// Read the tacho counter of an output
    pub fn get_count(&mut self, port_no: u8) -> Result<i32> {
        let mut ops = Vec::with_capacity(4);
        ops.push(Opcode::OutputGetCount as u8);
        push_lc(&mut ops, LAYER.into());
        // This opcode takes the port number, not a mask
        push_lc(&mut ops, port_no.into());
        push_gv(&mut ops, 0);

        let vars = self.execute(&ops, 4)?;
        Ok(i32::from_le_bytes([vars[0], vars[1], vars[2], vars[3]]))
    }

    /// Zero the tacho counter of an output
    pub fn clear_count(&mut self, port_no: u8) -> Result<()> {
        let mut ops = Vec::with_capacity(3);
        ops.push(Opcode::OutputClrCount as u8);
        push_lc(&mut ops, LAYER.into());
        push_lc(&mut ops, mask(port_no));

        self.execute(&ops, 0).map(|_| ())
    }
}
