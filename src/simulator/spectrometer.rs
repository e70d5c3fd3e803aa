//! Spectrometer simulator

use crate::simulator::InstrumentProtocol;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Fixed reading returned by `GETDATA`
pub const SAMPLE_READING: &str = "12341234";

/// Spectrometer with a single DAC register
///
/// The register belongs to the simulator instance, so every connection to one
/// server observes and mutates the same value.
#[derive(Debug)]
pub struct Spectrometer {
    dac: Mutex<String>,
}

impl Spectrometer {
    pub fn new() -> Self {
        Self {
            dac: Mutex::new("0".to_string()),
        }
    }
}

impl Default for Spectrometer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InstrumentProtocol for Spectrometer {
    fn name(&self) -> &'static str {
        "spectrometer"
    }

    async fn dispatch(&self, command: &str, argument: &str) -> Option<String> {
        match command {
            "getdata" => Some(SAMPLE_READING.to_string()),
            "setdac" => {
                *self.dac.lock().await = argument.to_string();
                Some("OK".to_string())
            }
            "getdac" => Some(self.dac.lock().await.clone()),
            _ => None,
        }
    }
}
