//! ==============================================================================
//! hal.rs - Hardware Abstraction Layer
//! ==============================================================================
//!
//! purpose:
//!     the two hardware capabilities the host depends on:
//!     - SensorReader: one blocking temperature/humidity read
//!     - DigitalOutput: a single on/off pin (the status LED)
//!     plus mock implementations so the host runs on a development machine.
//!
//! relationships:
//!     - used by: service.rs (sensor), main.rs (led routes)
//!     - implemented by: gpio.rs (real hardware), this file (mocks)
//!
//! ==============================================================================

use anyhow::Result;
use std::fmt;

/// raw values as reported by the driver, before rounding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub temperature: f64,
    pub humidity: f64,
}

/// how a sensor read failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorFault {
    /// routine timing/checksum failure; the next read will likely succeed
    Transient(String),
    /// the sensor cannot be reached at all; further reads are pointless
    Unavailable(String),
    /// anything the driver did not expect
    Fatal(String),
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient(msg) => write!(f, "{msg}"),
            Self::Unavailable(msg) => write!(f, "sensor unavailable: {msg}"),
            Self::Fatal(msg) => write!(f, "unexpected sensor error: {msg}"),
        }
    }
}

impl std::error::Error for SensorFault {}

/// a single-wire temperature/humidity sensor
///
/// `read` blocks for the duration of one hardware transaction and must bound
/// its own latency. it is not reentrant; callers serialize access.
pub trait SensorReader: Send {
    fn read(&mut self) -> Result<Sample, SensorFault>;

    /// short name for logs (e.g. "dht11-gpio4")
    fn name(&self) -> String;
}

/// an on/off output pin
pub trait DigitalOutput: Send {
    fn set(&mut self, on: bool) -> Result<()>;
    fn is_on(&self) -> bool;
}

// ==============================================================================================
// MOCK IMPLEMENTATIONS (For development machines)
// ==============================================================================================

/// fake dht11 producing a slow drift around room conditions
///
/// with `fail_every = n > 0`, every n-th read fails transiently, the way a
/// real dht11 regularly does.
pub struct MockSensor {
    reads: u64,
    fail_every: u64,
}

impl MockSensor {
    pub fn new(fail_every: u64) -> Self {
        tracing::info!("Using MOCK sensor (No hardware access)");
        Self { reads: 0, fail_every }
    }
}

impl SensorReader for MockSensor {
    fn read(&mut self) -> Result<Sample, SensorFault> {
        self.reads += 1;
        if self.fail_every > 0 && self.reads % self.fail_every == 0 {
            tracing::debug!("[MOCK DHT11] Simulated timing failure on read {}", self.reads);
            return Err(SensorFault::Transient(
                "A full buffer was not returned. Try again.".to_string(),
            ));
        }

        let phase = self.reads as f64 / 12.0;
        Ok(Sample {
            temperature: 22.0 + 1.5 * phase.sin(),
            humidity: 45.0 + 5.0 * phase.cos(),
        })
    }

    fn name(&self) -> String {
        "mock-dht11".to_string()
    }
}

/// fake output that only remembers its state
#[derive(Default)]
pub struct MockOutput {
    on: bool,
}

impl DigitalOutput for MockOutput {
    fn set(&mut self, on: bool) -> Result<()> {
        tracing::debug!("[MOCK LED] set to {}", if on { "ON" } else { "OFF" });
        self.on = on;
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.on
    }
}
