//! One-wire thermometer reader
//!
//! The Linux `w1_therm` driver exposes each thermometer as
//! `<device_dir>/<family>-<serial>/w1_slave`:
//!
//! ```text
//! 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
//! 72 01 4b 46 7f ff 0e 10 57 t=23125
//! ```
//!
//! The first line must end in `YES` (CRC ok); `t=` carries millidegrees.

use super::{SensorError, TemperatureSensor};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Family codes of one-wire thermometers handled by `w1_therm`
const THERMOMETER_FAMILIES: [&str; 5] = ["10-", "22-", "28-", "3b-", "42-"];

pub struct OneWireSensor {
    device_dir: PathBuf,
}

impl OneWireSensor {
    pub fn new(device_dir: impl Into<PathBuf>) -> Self {
        Self {
            device_dir: device_dir.into(),
        }
    }

    /// First thermometer under the device tree, in name order
    fn find_device(device_dir: &Path) -> Result<PathBuf, SensorError> {
        let entries = std::fs::read_dir(device_dir).map_err(|_| {
            SensorError::NoDevice(device_dir.display().to_string())
        })?;

        let mut devices: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy().to_lowercase();
                THERMOMETER_FAMILIES
                    .iter()
                    .any(|family| name.starts_with(family))
            })
            .map(|entry| entry.path().join("w1_slave"))
            .filter(|path| path.is_file())
            .collect();
        devices.sort();

        devices
            .into_iter()
            .next()
            .ok_or_else(|| SensorError::NoDevice(device_dir.display().to_string()))
    }

    fn read_blocking(device_dir: &Path) -> Result<f64, SensorError> {
        let path = Self::find_device(device_dir)?;
        let contents = std::fs::read_to_string(&path).map_err(|source| SensorError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(device = %path.display(), "Read one-wire thermometer");
        parse_w1_slave(&path, &contents)
    }
}

#[async_trait]
impl TemperatureSensor for OneWireSensor {
    async fn read_temperature(&self) -> Result<f64, SensorError> {
        let device_dir = self.device_dir.clone();
        tokio::task::spawn_blocking(move || Self::read_blocking(&device_dir))
            .await
            .map_err(|e| SensorError::TaskFailed(e.to_string()))?
    }
}

/// Parse the contents of a `w1_slave` file into degrees Celsius
pub fn parse_w1_slave(path: &Path, contents: &str) -> Result<f64, SensorError> {
    let mut lines = contents.lines();

    let crc_line = lines.next().ok_or_else(|| SensorError::InvalidReading {
        path: path.to_path_buf(),
        reason: "empty file".to_string(),
    })?;
    if !crc_line.trim_end().ends_with("YES") {
        return Err(SensorError::CrcMismatch(path.to_path_buf()));
    }

    let data_line = lines.next().unwrap_or_default();
    let raw = data_line
        .rsplit_once("t=")
        .map(|(_, raw)| raw.trim())
        .ok_or_else(|| SensorError::InvalidReading {
            path: path.to_path_buf(),
            reason: "missing t= field".to_string(),
        })?;

    let millidegrees: i64 = raw.parse().map_err(|_| SensorError::InvalidReading {
        path: path.to_path_buf(),
        reason: format!("'{raw}' is not an integer"),
    })?;

    Ok(millidegrees as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const GOOD_READING: &str = "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n\
                                72 01 4b 46 7f ff 0e 10 57 t=23125\n";

    fn write_device(root: &Path, name: &str, contents: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("w1_slave"), contents).unwrap();
    }

    #[test]
    fn test_parse_valid_reading() {
        let value = parse_w1_slave(Path::new("w1_slave"), GOOD_READING).unwrap();
        assert!((value - 23.125).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_negative_reading() {
        let contents = "5e ff 4b 46 7f ff 02 10 21 : crc=21 YES\n\
                        5e ff 4b 46 7f ff 02 10 21 t=-10125\n";
        let value = parse_w1_slave(Path::new("w1_slave"), contents).unwrap();
        assert!((value + 10.125).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_crc_failure() {
        let contents = "72 01 4b 46 7f ff 0e 10 57 : crc=57 NO\n\
                        72 01 4b 46 7f ff 0e 10 57 t=23125\n";
        assert!(matches!(
            parse_w1_slave(Path::new("w1_slave"), contents),
            Err(SensorError::CrcMismatch(_))
        ));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_w1_slave(Path::new("w1_slave"), ""),
            Err(SensorError::InvalidReading { .. })
        ));
        assert!(matches!(
            parse_w1_slave(Path::new("w1_slave"), "aa : crc=57 YES\n"),
            Err(SensorError::InvalidReading { .. })
        ));
        assert!(matches!(
            parse_w1_slave(Path::new("w1_slave"), "aa : crc=57 YES\naa t=warm\n"),
            Err(SensorError::InvalidReading { .. })
        ));
    }

    #[tokio::test]
    async fn test_reads_first_thermometer() {
        let root = tempfile::tempdir().unwrap();
        write_device(root.path(), "w1_bus_master1", "not a thermometer");
        write_device(
            root.path(),
            "28-000000000002",
            "aa : crc=00 YES\naa t=30000\n",
        );
        write_device(root.path(), "28-000000000001", GOOD_READING);

        let sensor = OneWireSensor::new(root.path());
        let value = sensor.read_temperature().await.unwrap();
        assert!((value - 23.125).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_no_device_found() {
        let root = tempfile::tempdir().unwrap();
        write_device(root.path(), "w1_bus_master1", "x");

        let sensor = OneWireSensor::new(root.path());
        assert!(matches!(
            sensor.read_temperature().await,
            Err(SensorError::NoDevice(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_device_dir() {
        let sensor = OneWireSensor::new("/nonexistent/w1/devices");
        assert!(matches!(
            sensor.read_temperature().await,
            Err(SensorError::NoDevice(_))
        ));
    }
}
