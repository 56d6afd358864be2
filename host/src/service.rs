//! ==============================================================================
//! service.rs - query facade over the sensor and the reading history
//! ==============================================================================
//!
//! purpose:
//!     the three operations the http layer maps 1:1 onto endpoints:
//!     - current(): one sensor read, stored if successful, always returned
//!     - history(): the buffered readings, oldest first
//!     - stats():   aggregates over the history
//!     plus sample(), a read that is returned but never stored.
//!
//! concurrency:
//!     the dht11 protocol is not reentrant, so the sensor sits behind an
//!     async mutex held for exactly one read. the blocking read itself runs
//!     on tokio's blocking pool with the owned guard moved into it, and the
//!     append to the history happens before that guard is dropped.
//!     history() and stats() never touch the sensor.
//!
//! ==============================================================================

use crate::buffer::ReadingBuffer;
use crate::domain::{now_seconds, Reading, Stats, SENSOR_NOT_INITIALIZED};
use crate::hal::{SensorFault, SensorReader};
use crate::stats::{self, NoDataError};

use std::sync::Arc;
use tokio::sync::Mutex;

/// the sensor, or nothing once it has been declared unavailable
struct SensorSlot {
    reader: Option<Box<dyn SensorReader>>,
}

impl SensorSlot {
    fn read(&mut self) -> Reading {
        let Some(reader) = self.reader.as_mut() else {
            return Reading::failed(SENSOR_NOT_INITIALIZED, now_seconds());
        };

        let result = reader.read();
        let timestamp = now_seconds();
        match result {
            Ok(sample) => Reading::ok(sample.temperature, sample.humidity, timestamp),
            Err(SensorFault::Transient(msg)) => {
                tracing::warn!("[DHT11] Reading error: {}", msg);
                Reading::failed(msg, timestamp)
            }
            Err(fault @ SensorFault::Unavailable(_)) => {
                tracing::error!(
                    "[DHT11] {} - no further reads will be attempted from {}",
                    fault,
                    reader.name()
                );
                self.reader = None;
                Reading::failed(fault.to_string(), timestamp)
            }
            Err(fault @ SensorFault::Fatal(_)) => {
                tracing::error!("[DHT11] {} ({})", fault, reader.name());
                Reading::failed(fault.to_string(), timestamp)
            }
        }
    }
}

/// cloneable handle shared by all request handlers
#[derive(Clone)]
pub struct QueryService {
    sensor: Arc<Mutex<SensorSlot>>,
    buffer: Arc<ReadingBuffer>,
}

impl QueryService {
    pub fn new(reader: Box<dyn SensorReader>, buffer: ReadingBuffer) -> Self {
        Self::with_slot(Some(reader), buffer)
    }

    /// a service whose sensor failed to initialise
    ///
    /// every current() call answers "sensor not initialized" without
    /// touching hardware; history and stats still work.
    pub fn without_sensor(buffer: ReadingBuffer) -> Self {
        Self::with_slot(None, buffer)
    }

    fn with_slot(reader: Option<Box<dyn SensorReader>>, buffer: ReadingBuffer) -> Self {
        Self {
            sensor: Arc::new(Mutex::new(SensorSlot { reader })),
            buffer: Arc::new(buffer),
        }
    }

    /// read the sensor once and store the result if it succeeded
    ///
    /// never fails: any fault comes back as a reading with success = false.
    pub async fn current(&self) -> Reading {
        self.read_sensor(true).await
    }

    /// read the sensor once without touching the history
    ///
    /// shares the sensor lock with current(); used by the telemetry push so
    /// the history stays request-driven.
    pub async fn sample(&self) -> Reading {
        self.read_sensor(false).await
    }

    // the append happens while the sensor guard is still held, so the
    // history follows read order even under concurrent requests.
    async fn read_sensor(&self, store: bool) -> Reading {
        let mut slot = self.sensor.clone().lock_owned().await;
        let buffer = self.buffer.clone();
        let task = tokio::task::spawn_blocking(move || {
            let reading = slot.read();
            if store && buffer.append(reading.clone()) {
                tracing::debug!("[HISTORY] stored reading ({}/{})", buffer.len(), buffer.capacity());
            }
            reading
        });

        match task.await {
            Ok(reading) => reading,
            Err(e) => {
                tracing::error!("[DHT11] sensor task failed: {}", e);
                Reading::failed(format!("sensor task failed: {}", e), now_seconds())
            }
        }
    }

    /// buffered readings, oldest first
    pub fn history(&self) -> Vec<Reading> {
        self.buffer.snapshot()
    }

    pub fn stats(&self) -> Result<Stats, NoDataError> {
        stats::compute(&self.buffer.snapshot())
    }
}
