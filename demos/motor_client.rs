// Keyboard jog client: A-D select port, Left/Right turn, Space brake, O off, 0 reset, G counter, Q quit
//
// Usage: cargo run --example motor_client -- [prefix]
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::Duration;
use tracing::{info, warn};

use miss_motor_server::messages::{Action, ErrorReply};
use miss_motor_server::motor::Port;
use miss_motor_server::runtime::motor_selector;

const SPEED: i8 = 40;
const STEP_DEGREES: u32 = 30;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let prefix = std::env::args().nth(1).unwrap_or_else(|| "miss".to_string());

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Controls: A-D=port, Left/Right=turn, Space=brake, O=off, 0=reset, G=counter, Q=quit");

    enable_raw_mode()?;
    let result = run_jog(&session, &prefix).await;
    disable_raw_mode()?;

    result
}

async fn run_jog(
    session: &zenoh::Session,
    prefix: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut port = Port::A;
    info!("Port: {}", port);

    loop {
        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(KeyEvent { code, kind, .. }) = event::read()? else {
            continue;
        };
        if kind != KeyEventKind::Press {
            continue;
        }

        let turn = |speed: i8| {
            vec![
                ("speed", speed.to_string()),
                ("degrees", STEP_DEGREES.to_string()),
            ]
        };
        let (action, params) = match code {
            KeyCode::Char(c @ 'a'..='d') => {
                if let Ok(selected) = c.to_string().parse::<Port>() {
                    port = selected;
                    info!("Port: {}", port);
                }
                continue;
            }
            KeyCode::Left => (Action::TurnBy, turn(-SPEED)),
            KeyCode::Right => (Action::TurnBy, turn(SPEED)),
            KeyCode::Char(' ') => (Action::Brake, Vec::new()),
            KeyCode::Char('o') => (Action::SwitchOff, Vec::new()),
            KeyCode::Char('0') => (Action::Reset, Vec::new()),
            KeyCode::Char('g') => (Action::GetCounter, Vec::new()),
            KeyCode::Char('q') | KeyCode::Esc => break,
            _ => continue,
        };

        let selector = motor_selector(prefix, port, action, &params);
        send(session, &selector).await?;
    }

    Ok(())
}

async fn send(
    session: &zenoh::Session,
    selector: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let replies = session.get(selector).await?;

    while let Ok(reply) = replies.recv_async().await {
        match reply.result() {
            Ok(sample) => {
                let body = sample.payload().try_to_string()?;
                if body.is_empty() {
                    info!("{}: ok", selector);
                } else {
                    info!("{}: {}", selector, body);
                }
            }
            Err(err) => {
                let body = err.payload().try_to_string()?;
                match serde_json::from_str::<ErrorReply>(&body) {
                    Ok(e) => warn!("{}: {} {}", selector, e.status, e.message),
                    Err(_) => warn!("{}: {}", selector, body),
                }
            }
        }
    }

    Ok(())
}
