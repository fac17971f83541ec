use crate::sinks::SinkBackend;
use anyhow::Result;
use common::{ActionEvent, ActionSink};

pub struct Dispatcher {
    backend: SinkBackend,
}

impl Dispatcher {
    pub fn new(backend: SinkBackend) -> Self {
        Self { backend }
    }

    pub fn initialize(&mut self) -> Result<()> {
        self.backend.initialize()
    }

    pub fn send(&self, event: &ActionEvent) -> Result<()> {
        self.backend.send(event)
    }
}
