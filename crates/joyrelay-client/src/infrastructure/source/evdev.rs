//! Linux evdev event source.
//!
//! Describes a device node under `/dev/input` through the evdev ioctls
//! (identity, name, capability bitmaps, absolute-axis ranges) and then reads
//! `input_event` records from it with plain blocking `read(2)` calls.

use std::fs::File;
use std::os::fd::AsRawFd;
use std::path::Path;

use joyrelay_core::device::config::{MAX_ABS_AXES, MAX_BUTTONS, MAX_REL_AXES};
use joyrelay_core::{AbsAxisSpec, DeviceConfig, EventClass, RawEvent};
use tracing::{debug, warn};

use super::{EventSource, SourceError};

// Event types from <linux/input-event-codes.h>.
const EV_SYN: u16 = 0x00;
const EV_KEY: u16 = 0x01;
const EV_REL: u16 = 0x02;
const EV_ABS: u16 = 0x03;
const SYN_REPORT: u16 = 0;

const KEY_MAX: usize = 0x2FF;
const REL_MAX: usize = 0x0F;
const ABS_MAX: usize = 0x3F;

/// Axis resolution to report when the kernel gives 0 (units unknown).
const DEFAULT_RESOLUTION: i32 = 100;

// ── ioctl request encoding ────────────────────────────────────────────────────

// Linux _IOC layout: dir[2] | size[14] | type[8] | nr[8].
const IOC_TYPESHIFT: u64 = 8;
const IOC_SIZESHIFT: u64 = 16;
const IOC_DIRSHIFT: u64 = 30;
const IOC_READ: u64 = 2;

const fn ior(nr: u64, size: u64) -> u64 {
    (IOC_READ << IOC_DIRSHIFT) | ((b'E' as u64) << IOC_TYPESHIFT) | nr | (size << IOC_SIZESHIFT)
}

const EVIOCGID: u64 = ior(0x02, std::mem::size_of::<InputId>() as u64);

const fn eviocgname(len: usize) -> u64 {
    ior(0x06, len as u64)
}

const fn eviocgbit(ev: u16, len: usize) -> u64 {
    ior(0x20 + ev as u64, len as u64)
}

const fn eviocgabs(axis: u16) -> u64 {
    ior(0x40 + axis as u64, std::mem::size_of::<InputAbsinfo>() as u64)
}

// ── Kernel struct mirrors ─────────────────────────────────────────────────────

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct InputId {
    bustype: u16,
    vendor: u16,
    product: u16,
    version: u16,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct InputAbsinfo {
    value: i32,
    minimum: i32,
    maximum: i32,
    fuzz: i32,
    flat: i32,
    resolution: i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct InputEvent {
    time: libc::timeval,
    type_: u16,
    code: u16,
    value: i32,
}

fn xioctl<T>(fd: libc::c_int, request: u64, arg: *mut T) -> std::io::Result<()> {
    // SAFETY: request/argument pairs match the kernel's evdev ABI above.
    let rc = unsafe { libc::ioctl(fd, request as libc::c_ulong, arg) };
    if rc < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

fn bit_is_set(bitmap: &[u8], bit: usize) -> bool {
    bitmap[bit / 8] & (1 << (bit % 8)) != 0
}

/// Collects the set bits of a capability bitmap, capped at `max` codes.
fn set_bits(bitmap: &[u8], limit: usize, max: usize, what: &str) -> Vec<u32> {
    let mut codes: Vec<u32> = (0..=limit)
        .filter(|&bit| bit_is_set(bitmap, bit))
        .map(|bit| bit as u32)
        .collect();
    if codes.len() > max {
        warn!(count = codes.len(), max, "truncating {what} descriptors");
        codes.truncate(max);
    }
    codes
}

/// An open evdev device node.
pub struct EvdevSource {
    file: File,
}

impl EvdevSource {
    /// Opens the device node, e.g. `/dev/input/event3`.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        Ok(Self { file })
    }
}

impl EventSource for EvdevSource {
    fn describe(&mut self) -> Result<DeviceConfig, SourceError> {
        let fd = self.file.as_raw_fd();

        let mut id = InputId::default();
        xioctl(fd, EVIOCGID, &mut id as *mut InputId)?;

        let mut name_buf = [0u8; 256];
        xioctl(fd, eviocgname(name_buf.len()), name_buf.as_mut_ptr())?;
        let name_len = name_buf.iter().position(|&b| b == 0).unwrap_or(name_buf.len());
        let name = String::from_utf8_lossy(&name_buf[..name_len]).into_owned();

        let mut key_bits = [0u8; KEY_MAX / 8 + 1];
        let mut rel_bits = [0u8; REL_MAX / 8 + 1];
        let mut abs_bits = [0u8; ABS_MAX / 8 + 1];
        xioctl(fd, eviocgbit(EV_KEY, key_bits.len()), key_bits.as_mut_ptr())?;
        xioctl(fd, eviocgbit(EV_REL, rel_bits.len()), rel_bits.as_mut_ptr())?;
        xioctl(fd, eviocgbit(EV_ABS, abs_bits.len()), abs_bits.as_mut_ptr())?;

        let mut abs_axes = Vec::new();
        for code in set_bits(&abs_bits, ABS_MAX, MAX_ABS_AXES, "absolute-axis") {
            let mut info = InputAbsinfo::default();
            xioctl(fd, eviocgabs(code as u16), &mut info as *mut InputAbsinfo)?;
            abs_axes.push(AbsAxisSpec {
                id: code,
                min: info.minimum,
                max: info.maximum,
                fuzz: info.fuzz,
                flat: info.flat,
                resolution: if info.resolution == 0 {
                    DEFAULT_RESOLUTION
                } else {
                    info.resolution
                },
            });
        }

        let config = DeviceConfig {
            name,
            vendor_id: id.vendor,
            product_id: id.product,
            abs_axes,
            rel_axes: set_bits(&rel_bits, REL_MAX, MAX_REL_AXES, "relative-axis"),
            buttons: set_bits(&key_bits, KEY_MAX, MAX_BUTTONS, "button"),
        };
        debug!(
            name = %config.name,
            abs = config.abs_axes.len(),
            rel = config.rel_axes.len(),
            buttons = config.buttons.len(),
            "device described"
        );
        Ok(config)
    }

    fn read_events(&mut self) -> Result<Vec<RawEvent>, SourceError> {
        const BATCH: usize = 64;
        let record = std::mem::size_of::<InputEvent>();
        let mut buf = vec![0u8; BATCH * record];

        let fd = self.file.as_raw_fd();
        // SAFETY: buf lives for the whole call and the length is its size.
        let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            let e = std::io::Error::last_os_error();
            if e.kind() == std::io::ErrorKind::Interrupted {
                return Ok(Vec::new());
            }
            return Err(e.into());
        }
        if n == 0 {
            return Err(SourceError::Closed);
        }

        let mut events = Vec::with_capacity(n as usize / record);
        for chunk in buf[..n as usize].chunks_exact(record) {
            // SAFETY: the kernel only returns whole input_event records.
            let raw: InputEvent =
                unsafe { std::ptr::read_unaligned(chunk.as_ptr() as *const InputEvent) };
            let class = match raw.type_ {
                EV_SYN if raw.code == SYN_REPORT => EventClass::Sync,
                EV_KEY => EventClass::Button,
                EV_REL => EventClass::Relative,
                EV_ABS => EventClass::Absolute,
                _ => continue,
            };
            events.push(RawEvent {
                class,
                code: raw.code as u32,
                value: raw.value,
            });
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_scan_finds_set_codes() {
        let mut bitmap = [0u8; 4];
        bitmap[0] = 0b0000_0101; // bits 0 and 2
        bitmap[2] = 0b1000_0000; // bit 23
        assert_eq!(set_bits(&bitmap, 31, 16, "test"), vec![0, 2, 23]);
    }

    #[test]
    fn test_bit_scan_truncates_to_cap() {
        let bitmap = [0xFFu8; 2]; // 16 set bits
        assert_eq!(set_bits(&bitmap, 15, 4, "test").len(), 4);
    }

    #[test]
    fn test_ioctl_requests_match_kernel_headers() {
        // Spot-check against the values from <linux/input.h>.
        assert_eq!(EVIOCGID, 0x8008_4502);
        assert_eq!(eviocgname(256), 0x8100_4506);
        assert_eq!(eviocgabs(0), 0x8018_4540);
    }
}
