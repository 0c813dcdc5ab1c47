//! Device configuration and its fixed-size wire form.
//!
//! The config payload is versionless and always exactly
//! [`CONFIG_WIRE_SIZE`] bytes: a fixed name field, identity words, three
//! descriptor counts, and fixed-capacity parallel arrays for each descriptor
//! class.  Unused array slots are zero.  All integers are little-endian.
//!
//! Layout:
//! ```text
//! name[256]          NUL-terminated device name
//! vid:u16 pid:u16    USB identity
//! abs:u32 rel:u32 btn:u32   descriptor counts
//! abs_id[64]:u32
//! abs_min[64]:i32 abs_max[64]:i32 abs_fuzz[64]:i32
//! abs_flat[64]:i32 abs_res[64]:i32
//! rel_id[16]:u32
//! btn_id[128]:u32
//! ```

use thiserror::Error;

use super::report::ReportLayout;

/// Size of the name field (255 bytes + NUL terminator).
pub const NAME_FIELD_SIZE: usize = 256;
/// Maximum number of absolute-axis descriptors.
pub const MAX_ABS_AXES: usize = 64;
/// Maximum number of relative-axis descriptors.
pub const MAX_REL_AXES: usize = 16;
/// Maximum number of button descriptors.
pub const MAX_BUTTONS: usize = 128;

const VID_OFFSET: usize = NAME_FIELD_SIZE;
const PID_OFFSET: usize = VID_OFFSET + 2;
const COUNTS_OFFSET: usize = PID_OFFSET + 2;
const ABS_ID_OFFSET: usize = COUNTS_OFFSET + 12;
const ABS_MIN_OFFSET: usize = ABS_ID_OFFSET + 4 * MAX_ABS_AXES;
const ABS_MAX_OFFSET: usize = ABS_MIN_OFFSET + 4 * MAX_ABS_AXES;
const ABS_FUZZ_OFFSET: usize = ABS_MAX_OFFSET + 4 * MAX_ABS_AXES;
const ABS_FLAT_OFFSET: usize = ABS_FUZZ_OFFSET + 4 * MAX_ABS_AXES;
const ABS_RES_OFFSET: usize = ABS_FLAT_OFFSET + 4 * MAX_ABS_AXES;
const REL_ID_OFFSET: usize = ABS_RES_OFFSET + 4 * MAX_ABS_AXES;
const BTN_ID_OFFSET: usize = REL_ID_OFFSET + 4 * MAX_REL_AXES;

/// Exact size of the config payload on the wire.
pub const CONFIG_WIRE_SIZE: usize = BTN_ID_OFFSET + 4 * MAX_BUTTONS;

/// Errors from converting a [`DeviceConfig`] to or from its wire form.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ConfigError {
    /// The payload is not exactly [`CONFIG_WIRE_SIZE`] bytes.
    #[error("config payload must be {expected} bytes, got {actual}")]
    WrongSize { expected: usize, actual: usize },

    /// A descriptor count exceeds its class capacity.
    #[error("{count} descriptors exceeds the capacity of {max}")]
    TooManyDescriptors { count: usize, max: usize },

    /// The device name does not fit the name field.
    #[error("device name of {0} bytes exceeds the 255-byte limit")]
    NameTooLong(usize),
}

/// Calibration descriptor for one absolute axis.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct AbsAxisSpec {
    /// OS event code for this axis.
    pub id: u32,
    pub min: i32,
    pub max: i32,
    pub fuzz: i32,
    pub flat: i32,
    pub resolution: i32,
}

/// A virtual input device's capabilities and identity.
///
/// Descriptor order is significant: it defines the slot order of every
/// report sent on the same connection.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct DeviceConfig {
    pub name: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub abs_axes: Vec<AbsAxisSpec>,
    pub rel_axes: Vec<u32>,
    pub buttons: Vec<u32>,
}

impl DeviceConfig {
    /// The report shape implied by this config.
    pub fn report_layout(&self) -> ReportLayout {
        ReportLayout::new(self.abs_axes.len(), self.rel_axes.len(), self.buttons.len())
    }

    /// Serializes the config to its fixed-size wire form.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NameTooLong`] or [`ConfigError::TooManyDescriptors`] if
    /// a bound is exceeded; nothing is written in that case.
    pub fn to_wire(&self) -> Result<Vec<u8>, ConfigError> {
        let name = self.name.as_bytes();
        if name.len() >= NAME_FIELD_SIZE {
            return Err(ConfigError::NameTooLong(name.len()));
        }
        check_count(self.abs_axes.len(), MAX_ABS_AXES)?;
        check_count(self.rel_axes.len(), MAX_REL_AXES)?;
        check_count(self.buttons.len(), MAX_BUTTONS)?;

        let mut buf = vec![0u8; CONFIG_WIRE_SIZE];
        buf[..name.len()].copy_from_slice(name);
        buf[VID_OFFSET..VID_OFFSET + 2].copy_from_slice(&self.vendor_id.to_le_bytes());
        buf[PID_OFFSET..PID_OFFSET + 2].copy_from_slice(&self.product_id.to_le_bytes());
        write_u32(&mut buf, COUNTS_OFFSET, self.abs_axes.len() as u32);
        write_u32(&mut buf, COUNTS_OFFSET + 4, self.rel_axes.len() as u32);
        write_u32(&mut buf, COUNTS_OFFSET + 8, self.buttons.len() as u32);

        for (i, axis) in self.abs_axes.iter().enumerate() {
            write_u32(&mut buf, ABS_ID_OFFSET + 4 * i, axis.id);
            write_i32(&mut buf, ABS_MIN_OFFSET + 4 * i, axis.min);
            write_i32(&mut buf, ABS_MAX_OFFSET + 4 * i, axis.max);
            write_i32(&mut buf, ABS_FUZZ_OFFSET + 4 * i, axis.fuzz);
            write_i32(&mut buf, ABS_FLAT_OFFSET + 4 * i, axis.flat);
            write_i32(&mut buf, ABS_RES_OFFSET + 4 * i, axis.resolution);
        }
        for (i, &id) in self.rel_axes.iter().enumerate() {
            write_u32(&mut buf, REL_ID_OFFSET + 4 * i, id);
        }
        for (i, &id) in self.buttons.iter().enumerate() {
            write_u32(&mut buf, BTN_ID_OFFSET + 4 * i, id);
        }
        Ok(buf)
    }

    /// Parses a config from its wire form.
    ///
    /// The name is taken up to the first NUL and decoded lossily; descriptor
    /// counts above their class capacity are rejected.
    ///
    /// # Errors
    ///
    /// [`ConfigError::WrongSize`] or [`ConfigError::TooManyDescriptors`].
    pub fn from_wire(buf: &[u8]) -> Result<Self, ConfigError> {
        if buf.len() != CONFIG_WIRE_SIZE {
            return Err(ConfigError::WrongSize {
                expected: CONFIG_WIRE_SIZE,
                actual: buf.len(),
            });
        }

        let name_end = buf[..NAME_FIELD_SIZE]
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_FIELD_SIZE - 1);
        let name = String::from_utf8_lossy(&buf[..name_end]).into_owned();

        let vendor_id = u16::from_le_bytes([buf[VID_OFFSET], buf[VID_OFFSET + 1]]);
        let product_id = u16::from_le_bytes([buf[PID_OFFSET], buf[PID_OFFSET + 1]]);

        let abs_count = read_u32(buf, COUNTS_OFFSET) as usize;
        let rel_count = read_u32(buf, COUNTS_OFFSET + 4) as usize;
        let btn_count = read_u32(buf, COUNTS_OFFSET + 8) as usize;
        check_count(abs_count, MAX_ABS_AXES)?;
        check_count(rel_count, MAX_REL_AXES)?;
        check_count(btn_count, MAX_BUTTONS)?;

        let mut abs_axes = Vec::with_capacity(abs_count);
        for i in 0..abs_count {
            abs_axes.push(AbsAxisSpec {
                id: read_u32(buf, ABS_ID_OFFSET + 4 * i),
                min: read_i32(buf, ABS_MIN_OFFSET + 4 * i),
                max: read_i32(buf, ABS_MAX_OFFSET + 4 * i),
                fuzz: read_i32(buf, ABS_FUZZ_OFFSET + 4 * i),
                flat: read_i32(buf, ABS_FLAT_OFFSET + 4 * i),
                resolution: read_i32(buf, ABS_RES_OFFSET + 4 * i),
            });
        }
        let rel_axes = (0..rel_count)
            .map(|i| read_u32(buf, REL_ID_OFFSET + 4 * i))
            .collect();
        let buttons = (0..btn_count)
            .map(|i| read_u32(buf, BTN_ID_OFFSET + 4 * i))
            .collect();

        Ok(Self {
            name,
            vendor_id,
            product_id,
            abs_axes,
            rel_axes,
            buttons,
        })
    }
}

fn check_count(count: usize, max: usize) -> Result<(), ConfigError> {
    if count > max {
        return Err(ConfigError::TooManyDescriptors { count, max });
    }
    Ok(())
}

fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn write_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

fn read_i32(buf: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn gamepad() -> DeviceConfig {
        DeviceConfig {
            name: "pad".to_string(),
            vendor_id: 0xDEAD,
            product_id: 0xBEEF,
            abs_axes: vec![
                AbsAxisSpec { id: 0, min: -16384, max: 16384, fuzz: 16, flat: 128, resolution: 100 },
                AbsAxisSpec { id: 1, min: -16384, max: 16384, fuzz: 16, flat: 128, resolution: 100 },
            ],
            rel_axes: vec![],
            buttons: vec![0x130, 0x131, 0x132, 0x133, 0x134, 0x135, 0x136, 0x137],
        }
    }

    #[test]
    fn test_wire_size_constant() {
        assert_eq!(CONFIG_WIRE_SIZE, 2384);
        assert_eq!(gamepad().to_wire().unwrap().len(), CONFIG_WIRE_SIZE);
    }

    #[test]
    fn test_round_trip_preserves_all_fields() {
        let config = gamepad();
        let decoded = DeviceConfig::from_wire(&config.to_wire().unwrap()).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_round_trip_empty_device() {
        let config = DeviceConfig::default();
        let decoded = DeviceConfig::from_wire(&config.to_wire().unwrap()).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_round_trip_full_capacity() {
        let config = DeviceConfig {
            name: "n".repeat(255),
            vendor_id: 1,
            product_id: 2,
            abs_axes: (0..MAX_ABS_AXES as u32)
                .map(|id| AbsAxisSpec { id, min: -1, max: 1, ..Default::default() })
                .collect(),
            rel_axes: (0..MAX_REL_AXES as u32).collect(),
            buttons: (0..MAX_BUTTONS as u32).collect(),
        };
        let decoded = DeviceConfig::from_wire(&config.to_wire().unwrap()).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_name_at_limit_is_accepted_and_over_limit_rejected() {
        let mut config = gamepad();
        config.name = "x".repeat(255);
        assert!(config.to_wire().is_ok());
        config.name = "x".repeat(256);
        assert_eq!(config.to_wire(), Err(ConfigError::NameTooLong(256)));
    }

    #[test]
    fn test_too_many_buttons_rejected_at_encode() {
        let mut config = gamepad();
        config.buttons = vec![0; MAX_BUTTONS + 1];
        assert!(matches!(
            config.to_wire(),
            Err(ConfigError::TooManyDescriptors { max: MAX_BUTTONS, .. })
        ));
    }

    #[test]
    fn test_wrong_payload_size_rejected_at_decode() {
        assert!(matches!(
            DeviceConfig::from_wire(&[0u8; 100]),
            Err(ConfigError::WrongSize { actual: 100, .. })
        ));
    }

    #[test]
    fn test_out_of_range_count_rejected_at_decode() {
        let mut wire = gamepad().to_wire().unwrap();
        // Corrupt the abs-axis count field.
        wire[COUNTS_OFFSET..COUNTS_OFFSET + 4]
            .copy_from_slice(&(MAX_ABS_AXES as u32 + 1).to_le_bytes());
        assert!(matches!(
            DeviceConfig::from_wire(&wire),
            Err(ConfigError::TooManyDescriptors { .. })
        ));
    }

    #[test]
    fn test_report_layout_matches_counts() {
        let layout = gamepad().report_layout();
        assert_eq!(layout.byte_len(), 2 * 4 + 8);
    }
}
