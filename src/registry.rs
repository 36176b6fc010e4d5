// Fixed mapping from output port to motor, built once at startup

use std::sync::Arc;

use tracing::info;

use crate::motor::{Brick, DummyMotor, Ev3Motor, Motor, Port};

/// The four motors addressable by port
pub struct MotorRegistry {
    motors: [Box<dyn Motor>; 4],
}

impl MotorRegistry {
    /// Build from one motor per port, in A..D order
    pub fn new(motors: [Box<dyn Motor>; 4]) -> Self {
        Self { motors }
    }

    /// Stand-in motors on every port
    pub fn dummy() -> Self {
        info!("Using dummy motors");
        Self::new(Port::ALL.map(|_| Box::new(DummyMotor::new()) as Box<dyn Motor>))
    }

    /// Motors on every output of a connected brick
    pub fn ev3(brick: Arc<Brick>) -> Self {
        info!("Using motors of the brick at {}", brick.device());
        Self::new(Port::ALL.map(|port| {
            Box::new(Ev3Motor::new(Arc::clone(&brick), port)) as Box<dyn Motor>
        }))
    }

    pub fn get(&self, port: Port) -> &dyn Motor {
        self.motors[port.number() as usize].as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ports_are_independent() {
        let registry = MotorRegistry::dummy();
        registry.get(Port::B).on_for(10, 45, false).unwrap();

        for port in Port::ALL {
            let expected = if port == Port::B { 45 } else { 0 };
            assert_eq!(registry.get(port).counter().unwrap(), expected);
        }
    }
}
