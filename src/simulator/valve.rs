//! Valve simulator

use crate::simulator::InstrumentProtocol;
use async_trait::async_trait;

/// Valve controller accepting `OPEN` and `CLOSE`
#[derive(Debug, Clone, Copy, Default)]
pub struct Valve;

#[async_trait]
impl InstrumentProtocol for Valve {
    fn name(&self) -> &'static str {
        "valve"
    }

    async fn dispatch(&self, command: &str, _argument: &str) -> Option<String> {
        match command {
            "open" | "close" => Some("OK".to_string()),
            _ => None,
        }
    }
}
