use anyhow::{Context, Result};
use common::{ActionEvent, ActionSink};
use log::info;
use std::net::UdpSocket;

/// Sends each ActionEvent as a JSON datagram to a generic consumer.
pub struct JsonUdpSink {
    socket: Option<UdpSocket>,
    target_address: String,
}

impl JsonUdpSink {
    pub fn new(target_address: String) -> Self {
        Self {
            socket: None,
            target_address,
        }
    }
}

impl ActionSink for JsonUdpSink {
    fn initialize(&mut self) -> Result<()> {
        info!("Initializing JSON UDP sink...");
        // Bind to 0.0.0.0:0 to let OS pick a port
        let socket = UdpSocket::bind("0.0.0.0:0").context("Failed to bind UDP socket")?;
        socket
            .connect(&self.target_address)
            .context(format!("Failed to connect to {}", self.target_address))?;
        socket
            .set_nonblocking(true)
            .context("Failed to set non-blocking mode")?;

        self.socket = Some(socket);
        info!("JSON UDP sink initialized. Target: {}", self.target_address);
        Ok(())
    }

    fn send(&self, event: &ActionEvent) -> Result<()> {
        if let Some(socket) = &self.socket {
            let json_data = serde_json::to_vec(event)?;
            socket.send(&json_data)?;
        }
        Ok(())
    }
}
