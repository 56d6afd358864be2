//! ==============================================================================
//! main.rs - dht11 monitor host entry point
//! ==============================================================================
//!
//! purpose:
//!     a small web server on a raspberry pi that reads a dht11
//!     temperature/humidity sensor on demand and serves the latest reading,
//!     a bounded history and summary statistics as json.
//!
//! responsibilities:
//!     - load configuration (config.rs)
//!     - set up the sensor driver, falling back to "not initialized"
//!     - take one initial reading so the history is not empty at start
//!     - optionally push readings to a remote database (telemetry.rs)
//!     - serve the dashboard and json api (api.rs)
//!
//! architecture:
//!
//!     ┌─────────────────────────────────────────────────────────────┐
//!     │                    rust host (this file)                     │
//!     │  ┌─────────────┐  ┌─────────────────┐  ┌─────────────────┐  │
//!     │  │ web server  │  │ telemetry loop  │  │ led output      │  │
//!     │  │ (port 5000) │  │ (optional)      │  │ (optional)      │  │
//!     │  └──────┬──────┘  └────────┬────────┘  └─────────────────┘  │
//!     │         └─────────┬────────┘                                │
//!     │             ┌─────┴──────┐                                  │
//!     │             │  service   │ <- service.rs                    │
//!     │             └──┬──────┬──┘                                  │
//!     │     ┌──────────┘      └──────────┐                          │
//!     │ ┌───┴────────────┐      ┌────────┴───────┐                  │
//!     │ │ sensor (mutex) │      │ history buffer │                  │
//!     │ └───┬────────────┘      └────────────────┘                  │
//!     └─────┼───────────────────────────────────────────────────────┘
//!           ▼
//!     dht11 via python adafruit_dht (gpio.rs) or mock (hal.rs)
//!
//! ==============================================================================

mod api;
mod buffer;
mod config;
mod domain;
mod gpio;
mod hal;
mod service;
mod stats;
mod telemetry;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing_subscriber::{prelude::*, reload, EnvFilter, Registry};

use crate::api::AppState;
use crate::buffer::ReadingBuffer;
use crate::config::{HostConfig, LedConfig, SensorConfig, SensorDriver};
use crate::hal::{DigitalOutput, MockSensor, SensorFault, SensorReader};
use crate::service::QueryService;
use crate::telemetry::TelemetrySink;

// ==============================================================================
// main entry point
// ==============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: logging, then configuration (the config may change the level)
    let log_filter = init_logging();

    tracing::info!("===========================================================");
    tracing::info!("  DHT11 Monitor Host");
    tracing::info!("===========================================================");

    let config = HostConfig::load_or_default();
    if std::env::var_os("RUST_LOG").is_none() {
        match EnvFilter::try_new(&config.logging.level) {
            Ok(filter) => {
                if let Err(e) = log_filter.reload(filter) {
                    tracing::warn!("[CONFIG] Could not apply log level: {}", e);
                }
            }
            Err(e) => tracing::warn!("[CONFIG] Invalid log level {:?}: {}", config.logging.level, e),
        }
    }
    config.log_summary();

    // step 2: sensor + history
    let buffer = ReadingBuffer::new(config.history.capacity);
    let service = match build_sensor(&config.sensor) {
        Ok(reader) => {
            tracing::info!("[STARTUP] ✓ Sensor ready: {}", reader.name());
            QueryService::new(reader, buffer)
        }
        Err(fault) => {
            tracing::error!("[STARTUP] ✗ Sensor failed to initialize: {}", fault);
            QueryService::without_sensor(buffer)
        }
    };

    // step 3: initial reading
    let initial = service.current().await;
    match initial.values() {
        Some((t, h)) => tracing::info!("[STARTUP] Initial reading: {:.1}°C | {:.1}%", t, h),
        None => tracing::warn!(
            "[STARTUP] Initial reading failed: {}",
            initial.error().unwrap_or("unknown error")
        ),
    }

    // step 4: optional collaborators
    let led = if config.led.enabled {
        match build_led(&config.led) {
            Ok(output) => Some(Arc::new(Mutex::new(output))),
            Err(e) => {
                tracing::error!("[STARTUP] ✗ LED unavailable on GPIO {}: {:#}", config.led.gpio_pin, e);
                None
            }
        }
    } else {
        None
    };

    if config.telemetry.enabled {
        match TelemetrySink::new(&config.telemetry) {
            Ok(sink) => {
                let interval = Duration::from_secs(config.telemetry.interval_seconds);
                tokio::spawn(telemetry::push_loop(service.clone(), sink, interval));
            }
            Err(e) => tracing::error!("[STARTUP] ✗ Telemetry disabled: {:#}", e),
        }
    }

    // step 5: web server
    let app = api::router(AppState {
        service,
        led,
        show_sensor_data: config.logging.show_sensor_data,
    });

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    tracing::info!("[STARTUP] ✓ Dashboard live at http://{}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("web server error")?;

    tracing::info!("[SHUTDOWN] Bye");
    Ok(())
}

/// fmt subscriber filtered by RUST_LOG, or "info" until the config is read
fn init_logging() -> reload::Handle<EnvFilter, Registry> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
    handle
}

fn build_sensor(config: &SensorConfig) -> Result<Box<dyn SensorReader>, SensorFault> {
    match config.driver {
        SensorDriver::Mock => Ok(Box::new(MockSensor::new(config.mock_fail_every))),
        SensorDriver::Dht11 => {
            let sensor = gpio::Dht11Subprocess::probe(&config.python, config.gpio_pin)?;
            Ok(Box::new(sensor))
        }
    }
}

#[cfg(feature = "hardware")]
fn build_led(config: &LedConfig) -> Result<Box<dyn DigitalOutput>> {
    Ok(Box::new(gpio::PinOutput::new(config.gpio_pin)?))
}

#[cfg(not(feature = "hardware"))]
fn build_led(config: &LedConfig) -> Result<Box<dyn DigitalOutput>> {
    tracing::info!(
        "Using MOCK LED for GPIO {} (built without the hardware feature)",
        config.gpio_pin
    );
    Ok(Box::new(hal::MockOutput::default()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[SHUTDOWN] failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("[SHUTDOWN] ctrl-c received, stopping");
}
