use anyhow::Result;
use common::{ActionEvent, ActionSink, ActionTrigger};
use log::info;
use rosc::{encoder, OscMessage, OscPacket, OscType};
use std::net::UdpSocket;

/// Emits one OSC message per action for executors that speak OSC
/// (common among assistive-tech bridges).
pub struct OscSink {
    socket: Option<UdpSocket>,
    target_addr: String,
}

impl OscSink {
    pub fn new(target_addr: &str) -> Self {
        Self {
            socket: None,
            target_addr: target_addr.to_string(),
        }
    }
}

impl ActionSink for OscSink {
    fn initialize(&mut self) -> Result<()> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        self.socket = Some(socket);
        info!("OSC sink initialized. Target: {}", self.target_addr);
        Ok(())
    }

    fn send(&self, event: &ActionEvent) -> Result<()> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("OscSink not initialized"))?;

        let trigger = match &event.trigger {
            ActionTrigger::Dwell => "dwell".to_string(),
            ActionTrigger::Gesture(name) => name.clone(),
        };

        let packet = OscPacket::Message(OscMessage {
            addr: "/gazed/action".to_string(),
            args: vec![
                OscType::String(format!("{:?}", event.kind)),
                OscType::Float(event.target.x),
                OscType::Float(event.target.y),
                OscType::String(trigger),
            ],
        });

        let msg_buf = encoder::encode(&packet)?;
        socket.send_to(&msg_buf, &self.target_addr)?;
        Ok(())
    }
}
