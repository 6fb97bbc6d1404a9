use embedded_aht20::{Aht20, DEFAULT_I2C_ADDRESS, Error as Aht20Error};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::debug;

use super::{Reading, Sensor, SensorError};

/// Fixed I2C address of the AHT10/AHT20 family.
pub const AHT20_ADDRESS: u8 = DEFAULT_I2C_ADDRESS;

const SENSOR_NAME: &str = "AHT20";

const POWER_UP_DELAY_MS: u32 = 20;

enum DriverState<I, D> {
    /// Bus and delay not yet handed to the driver.
    Unopened(I, D),
    Ready(Aht20<I, D>),
    /// A failed bring-up consumed the bus.
    Lost,
}

/// AHT10/AHT20 temperature and humidity sensor.
///
/// The driver is only constructed by [`Sensor::init`], which is where
/// `embedded-aht20` checks the calibration status and calibrates if needed.
pub struct Aht20Sensor<I, D> {
    state: DriverState<I, D>,
}

impl<I: I2c, D: DelayNs> Aht20Sensor<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            state: DriverState::Unopened(i2c, delay),
        }
    }
}

impl<I: I2c, D: DelayNs> Sensor for Aht20Sensor<I, D> {
    async fn init(&mut self) -> Result<(), SensorError> {
        let (i2c, mut delay) = match core::mem::replace(&mut self.state, DriverState::Lost) {
            DriverState::Unopened(i2c, delay) => (i2c, delay),
            DriverState::Ready(driver) => {
                self.state = DriverState::Ready(driver);
                return Ok(());
            }
            DriverState::Lost => {
                return Err(SensorError::InitializationFailed {
                    sensor: SENSOR_NAME,
                    details: "bus lost to an earlier failed initialization",
                });
            }
        };

        delay.delay_ms(POWER_UP_DELAY_MS).await;

        let driver = Aht20::new(i2c, AHT20_ADDRESS, delay)
            .await
            .map_err(|e| {
                debug!("AHT20 initialization failed: {:?}", e);
                SensorError::InitializationFailed {
                    sensor: SENSOR_NAME,
                    details: "no calibrated AHT20 answering",
                }
            })?;

        self.state = DriverState::Ready(driver);
        Ok(())
    }

    async fn read(&mut self) -> Result<Reading, SensorError> {
        let DriverState::Ready(driver) = &mut self.state else {
            return Err(SensorError::ReadFailed {
                sensor: SENSOR_NAME,
                operation: "read before initialization",
            });
        };

        let measurement = driver.measure().await.map_err(|e| {
            debug!("AHT20 measurement failed: {:?}", e);
            match e {
                Aht20Error::UnexpectedBusy => SensorError::Timeout {
                    sensor: SENSOR_NAME,
                    operation: "complete measurement",
                },
                Aht20Error::InvalidCrc => SensorError::ReadFailed {
                    sensor: SENSOR_NAME,
                    operation: "verify measurement checksum",
                },
                Aht20Error::I2c(_) => SensorError::ReadFailed {
                    sensor: SENSOR_NAME,
                    operation: "read measurement",
                },
            }
        })?;

        Ok(Reading::new(
            measurement.temperature.0,
            measurement.relative_humidity.value(),
        ))
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec;
    use std::vec::Vec;

    use embassy_futures::block_on;
    use log::Level;

    use super::*;
    use crate::test_support::{FakeI2c, NoopDelay, RecordingDelay, capture_logs};

    const CHECK_STATUS: [u8; 1] = [0x71];
    const INITIALIZE: [u8; 3] = [0xBE, 0x08, 0x00];
    const TRIGGER: [u8; 3] = [0xAC, 0x33, 0x00];

    const CALIBRATED: u8 = 0x08;
    const BUSY: u8 = 0x80;

    /// Status byte, 20.18 degC / 48.32 %RH, CRC.
    const FRAME: [u8; 7] = [CALIBRATED, 0x7b, 0xb3, 0x05, 0x9d, 0x49, 0x7d];

    /// A bus whose part reports calibrated on the first status check.
    fn ready_bus() -> FakeI2c {
        let mut bus = FakeI2c::new();
        bus.queue_read(&[CALIBRATED]);
        bus
    }

    fn commands(bus: &FakeI2c) -> Vec<Vec<u8>> {
        bus.writes().iter().map(|(_, w)| w.clone()).collect()
    }

    #[test]
    fn test_new_does_not_touch_the_bus() {
        let mut bus = FakeI2c::new();
        drop(Aht20Sensor::new(&mut bus, NoopDelay));
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn test_init_waits_for_power_up_then_checks_status() {
        let mut bus = ready_bus();
        let mut delay = RecordingDelay::default();

        let mut sensor = Aht20Sensor::new(&mut bus, &mut delay);
        assert_eq!(block_on(sensor.init()), Ok(()));
        drop(sensor);

        assert_eq!(delay.waits_ms.first(), Some(&POWER_UP_DELAY_MS));
        assert_eq!(commands(&bus), vec![CHECK_STATUS.to_vec()]);
        assert!(bus.writes().iter().all(|(addr, _)| *addr == AHT20_ADDRESS));
    }

    #[test]
    fn test_init_leaves_announcing_to_the_caller() {
        let mut bus = ready_bus();
        let mut sensor = Aht20Sensor::new(&mut bus, NoopDelay);
        let (result, lines) = capture_logs(|| block_on(sensor.init()));

        assert_eq!(result, Ok(()));
        assert!(lines.iter().all(|(level, _)| *level > Level::Info));
    }

    #[test]
    fn test_init_calibrates_uncalibrated_part() {
        let mut bus = FakeI2c::new();
        bus.queue_read(&[0x00]);
        bus.queue_read(&[CALIBRATED]);

        let mut sensor = Aht20Sensor::new(&mut bus, NoopDelay);
        assert_eq!(block_on(sensor.init()), Ok(()));
        drop(sensor);

        assert_eq!(
            commands(&bus),
            vec![CHECK_STATUS.to_vec(), INITIALIZE.to_vec(), CHECK_STATUS.to_vec()]
        );
    }

    #[test]
    fn test_init_twice_keeps_the_driver() {
        let mut bus = ready_bus();
        let mut sensor = Aht20Sensor::new(&mut bus, NoopDelay);
        assert_eq!(block_on(sensor.init()), Ok(()));
        assert_eq!(block_on(sensor.init()), Ok(()));
        drop(sensor);

        assert_eq!(commands(&bus).len(), 1);
    }

    #[test]
    fn test_init_fails_without_device() {
        let mut bus = FakeI2c::new();
        let mut sensor = Aht20Sensor::new(&mut bus, NoopDelay);
        assert!(matches!(
            block_on(sensor.init()),
            Err(SensorError::InitializationFailed { .. })
        ));

        // The bus went down with the driver.
        assert!(matches!(
            block_on(sensor.init()),
            Err(SensorError::InitializationFailed { .. })
        ));
        assert!(matches!(
            block_on(sensor.read()),
            Err(SensorError::ReadFailed { .. })
        ));
    }

    #[test]
    fn test_read_before_init_fails() {
        let mut bus = ready_bus();
        let mut sensor = Aht20Sensor::new(&mut bus, NoopDelay);
        assert_eq!(
            block_on(sensor.read()),
            Err(SensorError::ReadFailed {
                sensor: "AHT20",
                operation: "read before initialization",
            })
        );
        drop(sensor);

        assert!(bus.writes().is_empty());
    }

    #[test]
    fn test_read_triggers_and_converts_measurement() {
        let mut bus = ready_bus();
        bus.queue_read(&[CALIBRATED]);
        bus.queue_read(&FRAME);

        let mut sensor = Aht20Sensor::new(&mut bus, NoopDelay);
        block_on(sensor.init()).unwrap();
        let reading = block_on(sensor.read()).unwrap();
        drop(sensor);

        assert!((reading.temperature_celsius - 20.18).abs() < 0.01);
        assert!((reading.humidity_percent - 48.32).abs() < 0.01);
        assert_eq!(
            commands(&bus),
            vec![CHECK_STATUS.to_vec(), TRIGGER.to_vec(), CHECK_STATUS.to_vec()]
        );
    }

    #[test]
    fn test_read_waits_while_busy() {
        let mut bus = ready_bus();
        bus.queue_read(&[CALIBRATED | BUSY]);
        bus.queue_read(&[CALIBRATED | BUSY]);
        bus.queue_read(&[CALIBRATED]);
        bus.queue_read(&FRAME);

        let mut sensor = Aht20Sensor::new(&mut bus, NoopDelay);
        block_on(sensor.init()).unwrap();
        assert!(block_on(sensor.read()).is_ok());
    }

    #[test]
    fn test_busy_frame_maps_to_timeout() {
        let mut bus = ready_bus();
        bus.queue_read(&[CALIBRATED]);
        bus.queue_read(&[CALIBRATED | BUSY, 0x7b, 0xb3, 0x05, 0x9d, 0x49, 0x91]);

        let mut sensor = Aht20Sensor::new(&mut bus, NoopDelay);
        block_on(sensor.init()).unwrap();
        assert!(matches!(
            block_on(sensor.read()),
            Err(SensorError::Timeout { .. })
        ));
    }

    #[test]
    fn test_bad_checksum_maps_to_read_failure() {
        let mut bus = ready_bus();
        bus.queue_read(&[CALIBRATED]);
        bus.queue_read(&[CALIBRATED | BUSY, 0x7b, 0xb3, 0x05, 0x9d, 0x49, 0x90]);

        let mut sensor = Aht20Sensor::new(&mut bus, NoopDelay);
        block_on(sensor.init()).unwrap();
        assert_eq!(
            block_on(sensor.read()),
            Err(SensorError::ReadFailed {
                sensor: "AHT20",
                operation: "verify measurement checksum",
            })
        );
    }

    #[test]
    fn test_bus_error_maps_to_read_failure() {
        // Status answers, the data frame never arrives.
        let mut bus = ready_bus();
        bus.queue_read(&[CALIBRATED]);

        let mut sensor = Aht20Sensor::new(&mut bus, NoopDelay);
        block_on(sensor.init()).unwrap();
        assert_eq!(
            block_on(sensor.read()),
            Err(SensorError::ReadFailed {
                sensor: "AHT20",
                operation: "read measurement",
            })
        );
    }
}
