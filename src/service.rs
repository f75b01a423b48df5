use crate::command::Command;
use crate::controller::Controller;
use crate::config::ControllerConfig;
use crate::error::ConfigError;
use crate::event::Event;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Inbound events queued ahead of the decision loop.
pub const EVENT_QUEUE_DEPTH: usize = 1024;
/// Outbound instructions queued behind it.
pub const COMMAND_QUEUE_DEPTH: usize = 1024;

/// Handle to a running decision loop: feed events in, take commands out.
pub struct ControllerHandle {
    events: mpsc::Sender<Event>,
    commands: mpsc::Receiver<Command>,
}

impl ControllerHandle {
    pub async fn submit(&self, event: Event) -> anyhow::Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| anyhow::anyhow!("controller task is gone"))
    }

    /// `None` once the loop has exited and drained.
    pub async fn next_command(&mut self) -> Option<Command> {
        self.commands.recv().await
    }
}

/// Spawns the decision loop on the runtime. Events are processed strictly one
/// at a time; commands come out in the order decisions produced them.
pub fn spawn(config: ControllerConfig) -> Result<ControllerHandle, ConfigError> {
    let mut controller = Controller::new(config)?;
    let (event_tx, mut event_rx) = mpsc::channel::<Event>(EVENT_QUEUE_DEPTH);
    let (command_tx, command_rx) = mpsc::channel::<Command>(COMMAND_QUEUE_DEPTH);

    tokio::spawn(async move {
        info!("controller loop started");
        while let Some(event) = event_rx.recv().await {
            for command in controller.handle_event(event) {
                if command_tx.send(command).await.is_err() {
                    debug!("command receiver dropped, stopping loop");
                    return;
                }
            }
        }
        info!("event channel closed, controller loop done");
    });

    Ok(ControllerHandle { events: event_tx, commands: command_rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::FlowInstall;
    use std::collections::HashMap;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    #[tokio::test]
    async fn events_flow_through_to_commands() {
        init_tracing();
        let config = ControllerConfig { fattree_k: None, gateways: HashMap::new() };
        let mut handle = spawn(config).unwrap();
        handle
            .submit(Event::SwitchFeaturesReady { dpid: 5 })
            .await
            .unwrap();
        let command = handle.next_command().await.unwrap();
        assert_eq!(command, Command::FlowInstall(FlowInstall::table_miss(5)));
    }

    #[tokio::test]
    async fn loop_stops_when_events_close() {
        init_tracing();
        let config = ControllerConfig { fattree_k: None, gateways: HashMap::new() };
        let mut handle = spawn(config).unwrap();
        handle.events = {
            let (tx, _rx) = mpsc::channel(1);
            tx
        };
        // original sender dropped above; the loop exits and the command
        // stream terminates
        assert!(handle.next_command().await.is_none());
    }
}
