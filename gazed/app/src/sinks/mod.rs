pub mod json_udp;
pub mod osc;

use anyhow::Result;
use common::{ActionEvent, ActionSink, OutputConfig, SinkMode};
use json_udp::JsonUdpSink;
use osc::OscSink;

pub enum SinkBackend {
    Osc(OscSink),
    Json(JsonUdpSink),
}

impl ActionSink for SinkBackend {
    fn initialize(&mut self) -> Result<()> {
        match self {
            Self::Osc(s) => s.initialize(),
            Self::Json(s) => s.initialize(),
        }
    }

    fn send(&self, event: &ActionEvent) -> Result<()> {
        match self {
            Self::Osc(s) => s.send(event),
            Self::Json(s) => s.send(event),
        }
    }
}

pub fn create_sink(config: &OutputConfig) -> SinkBackend {
    let target = format!("{}:{}", config.send_address, config.send_port);
    match config.mode {
        SinkMode::Osc => SinkBackend::Osc(OscSink::new(&target)),
        SinkMode::JsonUdp => SinkBackend::Json(JsonUdpSink::new(target)),
    }
}
