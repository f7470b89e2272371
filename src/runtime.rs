// Bridge event loop
//
// Wires the serial link to the zenoh bus: velocity commands and the
// set-gains queryable come in from zenoh, telemetry lines come in from the
// controller, and the dispatcher's bus events go back out as JSON. Inbound
// serial lines are handled one at a time; nothing here blocks, the serial
// I/O lives on the link's own threads.

use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{info, warn};

use crate::config::{
    BridgeConfig, DriveGains, ParamStore, TOPIC_CMD_VEL, TOPIC_ODOM, TOPIC_SERIAL,
    TOPIC_SET_GAINS, TOPIC_TF,
};
use crate::dispatcher::Dispatcher;
use crate::link::SerialLink;
use crate::messages::{BusEvent, VelocityCommand};

pub async fn run(config: BridgeConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut link = SerialLink::open(&config.serial.port, config.serial.baud_rate)?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers, subscribers and queryables...");
    let cmd_sub = session.declare_subscriber(TOPIC_CMD_VEL).await?;
    let gains_queryable = session.declare_queryable(TOPIC_SET_GAINS).await?;
    let pub_odom = session.declare_publisher(TOPIC_ODOM).await?;
    let pub_tf = session.declare_publisher(TOPIC_TF).await?;
    let pub_serial = session.declare_publisher(TOPIC_SERIAL).await?;

    let (event_tx, mut event_rx) = unbounded_channel::<BusEvent>();
    let params = Arc::new(ParamStore::new(&config));
    let mut dispatcher = Dispatcher::new(params, event_tx, link.sender());

    info!("Bridge started on {}", config.serial.port);
    info!("Subscribed to: {}", TOPIC_CMD_VEL);
    info!("Serving: {}", TOPIC_SET_GAINS);
    info!(
        "Publishing to: {}, {}, {}",
        TOPIC_ODOM, TOPIC_TF, TOPIC_SERIAL
    );

    loop {
        tokio::select! {
            // Telemetry from the controller, one line per wakeup
            line = link.recv() => {
                match line {
                    Some(line) => dispatcher.handle_line(&line),
                    None => return Err("serial link closed".into()),
                }
            }

            // Velocity commands from teleop/planners
            sample = cmd_sub.recv_async() => {
                let sample = sample?;
                let payload = sample.payload().to_bytes();
                match serde_json::from_slice::<VelocityCommand>(&payload) {
                    Ok(command) => dispatcher.handle_velocity_command(&command),
                    Err(e) => warn!("Failed to parse velocity command: {}", e),
                }
            }

            // Synchronous set-gains request: persist, forward, empty reply
            query = gains_queryable.recv_async() => {
                let query = query?;
                let payload = query
                    .payload()
                    .map(|p| p.to_bytes().into_owned())
                    .unwrap_or_default();
                match serde_json::from_slice::<DriveGains>(&payload) {
                    Ok(gains) => {
                        dispatcher.handle_set_gains(&gains);
                        query.reply(TOPIC_SET_GAINS, "").await?;
                    }
                    Err(e) => {
                        warn!("Rejecting malformed set-gains request: {}", e);
                        query.reply_err(format!("malformed gains payload: {e}")).await?;
                    }
                }
            }

            // Dispatcher output back onto the bus
            event = event_rx.recv() => {
                let Some(event) = event else { continue };
                match event {
                    BusEvent::Odometry(report) => {
                        pub_odom.put(serde_json::to_string(&report)?).await?;
                    }
                    BusEvent::Transform(transform) => {
                        pub_tf.put(serde_json::to_string(&transform)?).await?;
                    }
                    BusEvent::Diagnostic(text) => {
                        pub_serial.put(text).await?;
                    }
                }
            }
        }
    }
}
