// Topics, device settings and command line options
use std::time::Duration;

use clap::Parser;

// Key expression prefix; motors answer on `{prefix}/v1/motor/{port}/{action}`
pub const DEFAULT_PREFIX: &str = "miss";
pub const MOTOR_ROUTE: &str = "v1/motor";

// EV3 serial link (ignored by Bluetooth RFCOMM devices, required by the API)
pub const EV3_BAUDRATE: u32 = 115_200;
pub const EV3_TIMEOUT_MS: u64 = 1000;

// How often a waiting request asks the brick whether the motor is still busy
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Where the motors come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Stand-in motors, no hardware attached
    Dummy,
    /// Motors of the brick on this serial device
    Ev3(String),
}

/// Remote motor server for an EV3 brick
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Args {
    /// Serial device of the brick (e.g. /dev/rfcomm0)
    #[arg(long, conflicts_with = "dummy")]
    pub device: Option<String>,

    /// Use stand-in motors instead of a brick (default when no device is given)
    #[arg(long)]
    pub dummy: bool,

    /// Key expression prefix to serve motors under
    #[arg(long, default_value = DEFAULT_PREFIX)]
    pub prefix: String,
}

impl Args {
    /// Motor backend selected on the command line
    pub fn backend(&self) -> Backend {
        match (&self.device, self.dummy) {
            (Some(device), false) => Backend::Ev3(device.clone()),
            // `--dummy`, or no device given
            _ => Backend::Dummy,
        }
    }

    /// Key expression matching every port and action
    pub fn motor_key_expr(&self) -> String {
        format!("{}/{}/*/*", self.prefix.trim_end_matches('/'), MOTOR_ROUTE)
    }
}
