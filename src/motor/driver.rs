// Hardware motor driver for EV3 outputs
//
// One `Brick` owns the serial connection; each `Ev3Motor` addresses one output
// port through a shared handle to it.

use std::sync::{Arc, Mutex};
use std::thread::sleep;

use tracing::{debug, info, warn};

use super::ev3::{Ev3Bus, Ev3Error};
use super::{Motor, MotorError, Port, MAX_DEGREES};
use crate::config::WAIT_POLL_INTERVAL;

/// Connection to an EV3 brick, shared by its motors
pub struct Brick {
    bus: Mutex<Ev3Bus>,
    device: String,
}

impl Brick {
    /// Open the connection to the brick on the given serial device
    pub fn connect(device: &str) -> Result<Self, Ev3Error> {
        info!("Connecting to the brick at {}...", device);
        let bus = Ev3Bus::open(device)?;
        info!("Connection established");

        Ok(Self::from_bus(bus, device))
    }

    /// Wrap an already open bus
    pub fn from_bus(bus: Ev3Bus, device: &str) -> Self {
        Self {
            bus: Mutex::new(bus),
            device: device.to_string(),
        }
    }

    /// Run one exchange with the brick while holding the connection
    fn exchange<T>(
        &self,
        f: impl FnOnce(&mut Ev3Bus) -> Result<T, Ev3Error>,
    ) -> Result<T, MotorError> {
        let mut bus = self.bus.lock().map_err(|_| MotorError::Poisoned)?;
        Ok(f(&mut bus)?)
    }

    pub fn device(&self) -> &str {
        &self.device
    }
}

impl Drop for Brick {
    fn drop(&mut self) {
        // Leave no output running once the connection goes away
        match self.bus.get_mut() {
            Ok(bus) => {
                if let Err(e) = bus.stop_all(false) {
                    warn!("Failed to stop motors on close: {}", e);
                }
            }
            Err(_) => warn!("Connection poisoned, motors may still be running"),
        }
        info!("Connection to {} closed", self.device);
    }
}

/// A motor attached to one output of a brick
pub struct Ev3Motor {
    brick: Arc<Brick>,
    port: Port,
}

impl Ev3Motor {
    pub fn new(brick: Arc<Brick>, port: Port) -> Self {
        Self { brick, port }
    }
}

impl Motor for Ev3Motor {
    fn on(&self, speed: i8) -> Result<(), MotorError> {
        debug!("Motor {}: on at speed {}", self.port, speed);
        self.brick
            .exchange(|bus| bus.start_speed(self.port.number(), speed))
    }

    fn on_for(&self, speed: i8, degrees: u32, brake: bool) -> Result<(), MotorError> {
        debug!(
            "Motor {}: on at speed {} for {} degrees (brake={})",
            self.port, speed, degrees, brake
        );
        if degrees > MAX_DEGREES {
            return Err(MotorError::TooFar(degrees));
        }
        if degrees == 0 {
            // A zero step count would run forever on the brick
            return self
                .brick
                .exchange(|bus| bus.stop(self.port.number(), brake));
        }
        self.brick
            .exchange(|bus| bus.step_speed(self.port.number(), speed, degrees, brake))
    }

    fn off(&self) -> Result<(), MotorError> {
        debug!("Motor {}: off", self.port);
        self.brick.exchange(|bus| bus.stop(self.port.number(), false))
    }

    fn brake(&self) -> Result<(), MotorError> {
        debug!("Motor {}: brake", self.port);
        self.brick.exchange(|bus| bus.stop(self.port.number(), true))
    }

    fn wait(&self) -> Result<(), MotorError> {
        // The connection is released between polls so other ports are not starved
        while self.brick.exchange(|bus| bus.is_busy(self.port.number()))? {
            sleep(WAIT_POLL_INTERVAL);
        }
        debug!("Motor {}: idle", self.port);
        Ok(())
    }

    fn counter(&self) -> Result<i32, MotorError> {
        self.brick.exchange(|bus| bus.get_count(self.port.number()))
    }

    fn reset(&self) -> Result<(), MotorError> {
        debug!("Motor {}: reset counter", self.port);
        self.brick
            .exchange(|bus| bus.clear_count(self.port.number()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::{Read, Write};

    /// In-memory link: records written bytes and answers from canned replies
    struct FakeLink {
        written: Arc<Mutex<Vec<u8>>>,
        replies: VecDeque<u8>,
    }

    impl Read for FakeLink {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.replies.len());
            for (slot, byte) in buf.iter_mut().zip(self.replies.drain(..n)) {
                *slot = byte;
            }
            Ok(n)
        }
    }

    impl Write for FakeLink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// A motor on `port` whose brick acknowledges the first command
    fn motor(port: Port) -> (Ev3Motor, Arc<Mutex<Vec<u8>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let link = FakeLink {
            written: Arc::clone(&written),
            // Empty ok reply to message 1
            replies: VecDeque::from(vec![0x03, 0x00, 0x01, 0x00, 0x02]),
        };
        let brick = Brick::from_bus(Ev3Bus::from_link(Box::new(link)), "fake");
        (Ev3Motor::new(Arc::new(brick), port), written)
    }

    #[test]
    fn test_zero_degree_move_stops_with_brake() {
        let (motor, written) = motor(Port::B);
        motor.on_for(20, 0, true).unwrap();
        assert_eq!(
            *written.lock().unwrap(),
            vec![0x09, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0xA3, 0x00, 0x02, 0x01]
        );
    }

    #[test]
    fn test_zero_degree_move_coasts_without_brake() {
        let (motor, written) = motor(Port::A);
        motor.on_for(-20, 0, false).unwrap();
        assert_eq!(
            *written.lock().unwrap(),
            vec![0x09, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0xA3, 0x00, 0x01, 0x00]
        );
    }

    #[test]
    fn test_bounded_move_steps_at_constant_speed() {
        let (motor, written) = motor(Port::B);
        motor.on_for(20, 90, true).unwrap();
        assert_eq!(
            *written.lock().unwrap(),
            vec![
                0x0E, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, // header
                0xAE, 0x00, 0x02, 0x14, // step speed, layer, port B, speed 20
                0x00, 0x81, 0x5A, 0x00, // ramp up 0, 90 degrees, ramp down 0
                0x01, // brake
            ]
        );
    }

    #[test]
    fn test_oversized_move_never_reaches_brick() {
        let (motor, written) = motor(Port::C);
        let err = motor.on_for(20, MAX_DEGREES + 1, false).unwrap_err();
        assert!(matches!(err, MotorError::TooFar(d) if d == MAX_DEGREES + 1));
        assert!(written.lock().unwrap().is_empty());
    }
}
