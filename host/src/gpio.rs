//! ==============================================================================
//! gpio.rs - real hardware drivers for the dht11 sensor and the status led
//! ==============================================================================
//!
//! purpose:
//!     provides REAL gpio/hardware access on the raspberry pi.
//!     - Dht11Subprocess: reads the dht11 through python's adafruit_dht
//!     - PinOutput: drives the led pin through rppal (feature = "hardware")
//!
//! relationships:
//!     - implements: hal.rs (SensorReader, DigitalOutput)
//!     - used by: main.rs (picks drivers from config)
//!     - uses: python3/adafruit_dht (via subprocess for reliable timing)
//!
//! why subprocess to python?:
//!     dht11 sensors require precise bit-banging timing (~microseconds).
//!     pure rust in userspace is unreliable due to lack of real-time guarantees.
//!     adafruit_dht handles this correctly, including its own read timeout.
//!
//! ==============================================================================

use crate::hal::{Sample, SensorFault, SensorReader};

use serde::Deserialize;
use std::process::Command;

/// what the read script prints on stdout: exactly one json object
#[derive(Debug, Default, Deserialize)]
struct ScriptOutput {
    t: Option<f64>,
    h: Option<f64>,
    transient: Option<String>,
    unavailable: Option<String>,
    fatal: Option<String>,
}

/// dht11 on a bcm gpio pin, read via `python3 -c <script>`
pub struct Dht11Subprocess {
    python: String,
    pin: u8,
}

impl Dht11Subprocess {
    /// check that python, adafruit_dht and the board pin are all present
    ///
    /// a failure here means the sensor is unavailable for the whole run.
    pub fn probe(python: &str, pin: u8) -> Result<Self, SensorFault> {
        let script = format!("import adafruit_dht, board\nboard.D{pin}\n");
        let output = Command::new(python)
            .arg("-c")
            .arg(&script)
            .output()
            .map_err(|e| SensorFault::Unavailable(format!("failed to run {python}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last = stderr.lines().last().unwrap_or("unknown error").trim();
            return Err(SensorFault::Unavailable(last.to_string()));
        }

        tracing::info!("DHT11 driver ready on GPIO {}", pin);
        Ok(Self {
            python: python.to_string(),
            pin,
        })
    }

    fn script(&self) -> String {
        format!(
            r#"
import sys, json
try:
    import adafruit_dht, board
except Exception as e:
    print(json.dumps({{"unavailable": str(e)}}))
    sys.exit(0)

dht = None
try:
    dht = adafruit_dht.DHT11(board.D{})
    t, h = dht.temperature, dht.humidity
    if t is None or h is None:
        print(json.dumps({{"transient": "sensor returned no data"}}))
    else:
        print(json.dumps({{"t": t, "h": h}}))
except RuntimeError as e:
    # DHT sensors can be finicky, this is normal
    print(json.dumps({{"transient": str(e.args[0]) if e.args else str(e)}}))
except Exception as e:
    print(json.dumps({{"fatal": str(e)}}))
finally:
    if dht is not None:
        dht.exit()
"#,
            self.pin
        )
    }
}

impl SensorReader for Dht11Subprocess {
    fn read(&mut self) -> Result<Sample, SensorFault> {
        let output = Command::new(&self.python)
            .arg("-c")
            .arg(self.script())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    SensorFault::Unavailable(format!("{} not found", self.python))
                }
                _ => SensorFault::Fatal(format!("failed to run {}: {}", self.python, e)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SensorFault::Fatal(format!("python error: {}", stderr.trim())));
        }

        parse_output(&String::from_utf8_lossy(&output.stdout))
    }

    fn name(&self) -> String {
        format!("dht11-gpio{}", self.pin)
    }
}

/// classify the script's json line into a sample or a fault
fn parse_output(stdout: &str) -> Result<Sample, SensorFault> {
    let stdout = stdout.trim();
    let parsed: ScriptOutput = serde_json::from_str(stdout)
        .map_err(|e| SensorFault::Fatal(format!("json parse error: {} (got: {})", e, stdout)))?;

    if let Some(msg) = parsed.unavailable {
        return Err(SensorFault::Unavailable(msg));
    }
    if let Some(msg) = parsed.fatal {
        return Err(SensorFault::Fatal(msg));
    }
    if let Some(msg) = parsed.transient {
        return Err(SensorFault::Transient(msg));
    }

    match (parsed.t, parsed.h) {
        (Some(temperature), Some(humidity)) => Ok(Sample {
            temperature,
            humidity,
        }),
        _ => Err(SensorFault::Transient("sensor returned no data".to_string())),
    }
}

// ==============================================================================
// led output - plain gpio pin via rppal
// ==============================================================================

#[cfg(feature = "hardware")]
pub use pin::PinOutput;

#[cfg(feature = "hardware")]
mod pin {
    use crate::hal::DigitalOutput;
    use anyhow::Result;
    use rppal::gpio::{Gpio, OutputPin};

    pub struct PinOutput {
        pin: OutputPin,
    }

    impl PinOutput {
        pub fn new(bcm_pin: u8) -> Result<Self> {
            let gpio = Gpio::new()?;
            let mut pin = gpio.get(bcm_pin)?.into_output_low();
            // keep the level when the host exits
            pin.set_reset_on_drop(false);
            tracing::info!("LED output ready on GPIO {}", bcm_pin);
            Ok(Self { pin })
        }
    }

    impl DigitalOutput for PinOutput {
        fn set(&mut self, on: bool) -> Result<()> {
            if on {
                self.pin.set_high();
            } else {
                self.pin.set_low();
            }
            Ok(())
        }

        fn is_on(&self) -> bool {
            self.pin.is_set_high()
        }
    }
}
