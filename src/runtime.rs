// Zenoh binding for the motor commands
// Each motor action is a query on `{prefix}/v1/motor/{port}/{action}?param=value;...`
// (zenoh separates selector parameters with `;`)
// Replies carry the plain text body; failures carry a JSON `ErrorReply`.

use std::sync::Arc;

use tokio::task::spawn_blocking;
use tracing::{debug, error, info, warn};
use zenoh::query::{Query, Selector};

use crate::config::{Args, Backend, MOTOR_ROUTE};
use crate::dispatch::{DispatchError, Dispatcher};
use crate::messages::{Action, ErrorReply, Params};
use crate::motor::{Brick, Port};
use crate::registry::MotorRegistry;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Selector a client queries to run `action` on `port`
pub fn motor_selector(
    prefix: &str,
    port: Port,
    action: Action,
    params: &[(&str, String)],
) -> String {
    let mut selector = format!(
        "{}/{}/{}/{}",
        prefix.trim_end_matches('/'),
        MOTOR_ROUTE,
        port,
        action
    );
    if !params.is_empty() {
        let pairs: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        selector.push('?');
        selector.push_str(&pairs.join(";"));
    }
    selector
}

/// Split a query key into its port and action chunks
fn route(key: &str) -> Option<(String, String)> {
    let mut chunks = key.rsplitn(3, '/');
    let action = chunks.next()?;
    let port = chunks.next()?;
    chunks.next()?;
    Some((port.to_string(), action.to_string()))
}

/// Extract port, action and parameters from a query selector
fn request(selector: &Selector<'_>) -> Option<(String, String, Params)> {
    let (port, action) = route(selector.key_expr().as_str())?;
    let params = selector
        .parameters()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Some((port, action, params))
}

/// Answer one query, running the motor calls off the async workers
async fn handle_query(registry: Arc<MotorRegistry>, query: Query) {
    let key = query.key_expr().as_str().to_string();
    debug!("Query {}", query.selector());

    let result = match request(&query.selector()) {
        Some((port, action, params)) => {
            spawn_blocking(move || Dispatcher::new(&registry).dispatch(&port, &action, &params))
                .await
                .map_err(|e| {
                    error!("Command task for {} failed: {}", key, e);
                    ErrorReply {
                        status: 500,
                        message: "Command task failed".to_string(),
                    }
                })
                .and_then(|r| r.map_err(|e: DispatchError| e.to_reply()))
        }
        None => Err(ErrorReply {
            status: 404,
            message: format!("No motor route for '{}'", key),
        }),
    };

    let sent = match result {
        Ok(reply) => query.reply(query.key_expr().clone(), reply.body()).await,
        Err(err) => {
            warn!("Query {} rejected ({}): {}", key, err.status, err.message);
            match serde_json::to_string(&err) {
                Ok(json) => query.reply_err(json).await,
                Err(e) => query.reply_err(e.to_string()).await,
            }
        }
    };

    if let Err(e) = sent {
        warn!("Failed to reply to {}: {}", key, e);
    }
}

/// Build the motors, then serve queries until Ctrl-C
pub async fn run(args: Args) -> Result<(), BoxError> {
    // The brick is closed when the registry holding it drops at the end of this function
    let registry = Arc::new(match args.backend() {
        Backend::Ev3(device) => MotorRegistry::ev3(Arc::new(Brick::connect(&device)?)),
        Backend::Dummy => MotorRegistry::dummy(),
    });

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    let key_expr = args.motor_key_expr();
    let queryable = session.declare_queryable(key_expr.as_str()).await?;
    info!("Serving motors on: {}", key_expr);

    loop {
        tokio::select! {
            query = queryable.recv_async() => {
                tokio::spawn(handle_query(Arc::clone(&registry), query?));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    queryable.undeclare().await?;
    session.close().await?;
    Ok(())
}
