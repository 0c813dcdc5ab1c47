//! Linux uinput device driver.
//!
//! Registers one kernel virtual input device per accepted config through
//! `/dev/uinput`: capability bits first, then axis setup, then
//! `UI_DEV_SETUP`/`UI_DEV_CREATE`.  Events are injected by writing
//! `input_event` records to the device fd; `UI_DEV_DESTROY` unregisters the
//! device.  Requires write access to `/dev/uinput` (typically root or the
//! `uinput` group).

use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;

use joyrelay_core::{DeviceConfig, EventClass, RawEvent};
use tracing::debug;

use super::{DeviceDriver, DriverError};

const UINPUT_PATH: &str = "/dev/uinput";
const UINPUT_MAX_NAME_SIZE: usize = 80;

// Event types from <linux/input-event-codes.h>.
const EV_SYN: u16 = 0x00;
const EV_KEY: u16 = 0x01;
const EV_REL: u16 = 0x02;
const EV_ABS: u16 = 0x03;
const SYN_REPORT: u16 = 0;

const BUS_VIRTUAL: u16 = 0x06;

// ── ioctl request encoding ────────────────────────────────────────────────────

// Linux _IOC layout: dir[2] | size[14] | type[8] | nr[8].
const IOC_NRSHIFT: u64 = 0;
const IOC_TYPESHIFT: u64 = 8;
const IOC_SIZESHIFT: u64 = 16;
const IOC_DIRSHIFT: u64 = 30;
const IOC_WRITE: u64 = 1;

const fn ioc(dir: u64, ty: u64, nr: u64, size: u64) -> u64 {
    (dir << IOC_DIRSHIFT) | (ty << IOC_TYPESHIFT) | (nr << IOC_NRSHIFT) | (size << IOC_SIZESHIFT)
}

const fn io(ty: u64, nr: u64) -> u64 {
    ioc(0, ty, nr, 0)
}

const fn iow(ty: u64, nr: u64, size: u64) -> u64 {
    ioc(IOC_WRITE, ty, nr, size)
}

// uinput ioctls from <linux/uinput.h>, type 'U'.
const UI_DEV_CREATE: u64 = io(b'U' as u64, 1);
const UI_DEV_DESTROY: u64 = io(b'U' as u64, 2);
const UI_DEV_SETUP: u64 = iow(
    b'U' as u64,
    3,
    std::mem::size_of::<UinputSetup>() as u64,
);
const UI_ABS_SETUP: u64 = iow(
    b'U' as u64,
    4,
    std::mem::size_of::<UinputAbsSetup>() as u64,
);
const UI_SET_EVBIT: u64 = iow(b'U' as u64, 100, std::mem::size_of::<libc::c_int>() as u64);
const UI_SET_KEYBIT: u64 = iow(b'U' as u64, 101, std::mem::size_of::<libc::c_int>() as u64);
const UI_SET_RELBIT: u64 = iow(b'U' as u64, 102, std::mem::size_of::<libc::c_int>() as u64);
const UI_SET_ABSBIT: u64 = iow(b'U' as u64, 103, std::mem::size_of::<libc::c_int>() as u64);

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
struct UinputSetup {
    id: InputId,
    name: [u8; UINPUT_MAX_NAME_SIZE],
    ff_effects_max: u32,
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
struct UinputAbsSetup {
    code: u16,
    _pad: u16,
    absinfo: InputAbsinfo,
}

#[repr(C)]
struct InputEvent {
    time: libc::timeval,
    type_: u16,
    code: u16,
    value: i32,
}

fn xioctl<T>(fd: libc::c_int, request: u64, arg: T) -> std::io::Result<()> {
    // SAFETY: request/argument pairs match the kernel's uinput ABI above.
    let rc = unsafe { libc::ioctl(fd, request as libc::c_ulong, arg) };
    if rc < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// An open, registered uinput device.
pub struct UinputHandle {
    file: File,
}

/// Driver backed by the kernel uinput subsystem.
#[derive(Default)]
pub struct UinputDriver;

impl UinputDriver {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceDriver for UinputDriver {
    type Handle = UinputHandle;

    fn create(&self, config: &DeviceConfig) -> Result<UinputHandle, DriverError> {
        let file = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(UINPUT_PATH)?;
        let fd = file.as_raw_fd();

        // Capability bits must be declared before device setup.
        if !config.abs_axes.is_empty() {
            xioctl(fd, UI_SET_EVBIT, EV_ABS as libc::c_int)?;
            for axis in &config.abs_axes {
                xioctl(fd, UI_SET_ABSBIT, axis.id as libc::c_int)?;
            }
        }
        if !config.rel_axes.is_empty() {
            xioctl(fd, UI_SET_EVBIT, EV_REL as libc::c_int)?;
            for &code in &config.rel_axes {
                xioctl(fd, UI_SET_RELBIT, code as libc::c_int)?;
            }
        }
        if !config.buttons.is_empty() {
            xioctl(fd, UI_SET_EVBIT, EV_KEY as libc::c_int)?;
            for &code in &config.buttons {
                xioctl(fd, UI_SET_KEYBIT, code as libc::c_int)?;
            }
        }

        for axis in &config.abs_axes {
            let setup = UinputAbsSetup {
                code: axis.id as u16,
                _pad: 0,
                absinfo: InputAbsinfo {
                    value: 0,
                    minimum: axis.min,
                    maximum: axis.max,
                    fuzz: axis.fuzz,
                    flat: axis.flat,
                    resolution: axis.resolution,
                },
            };
            xioctl(fd, UI_ABS_SETUP, &setup as *const UinputAbsSetup)?;
        }

        let mut setup = UinputSetup {
            id: InputId {
                bustype: BUS_VIRTUAL,
                vendor: config.vendor_id,
                product: config.product_id,
                version: 1,
            },
            name: [0u8; UINPUT_MAX_NAME_SIZE],
            ff_effects_max: 0,
        };
        // Truncate to the kernel limit, keeping the trailing NUL.
        let name = config.name.as_bytes();
        let len = name.len().min(UINPUT_MAX_NAME_SIZE - 1);
        setup.name[..len].copy_from_slice(&name[..len]);

        xioctl(fd, UI_DEV_SETUP, &setup as *const UinputSetup)?;
        xioctl(fd, UI_DEV_CREATE, 0 as libc::c_int)?;

        debug!(name = %config.name, "uinput device registered");
        Ok(UinputHandle { file })
    }

    fn emit(&self, handle: &mut UinputHandle, event: RawEvent) -> Result<(), DriverError> {
        let (type_, code) = match event.class {
            EventClass::Absolute => (EV_ABS, event.code as u16),
            EventClass::Relative => (EV_REL, event.code as u16),
            EventClass::Button => (EV_KEY, event.code as u16),
            EventClass::Sync => (EV_SYN, SYN_REPORT),
        };
        let record = InputEvent {
            time: libc::timeval { tv_sec: 0, tv_usec: 0 },
            type_,
            code,
            value: event.value,
        };

        let fd = handle.file.as_raw_fd();
        let size = std::mem::size_of::<InputEvent>();
        // SAFETY: record is a valid, fully-initialised repr(C) struct.
        let written =
            unsafe { libc::write(fd, &record as *const InputEvent as *const libc::c_void, size) };
        if written != size as isize {
            return Err(DriverError::Io(std::io::Error::last_os_error()));
        }
        Ok(())
    }

    fn destroy(&self, handle: UinputHandle) -> Result<(), DriverError> {
        xioctl(handle.file.as_raw_fd(), UI_DEV_DESTROY, 0 as libc::c_int)?;
        Ok(())
    }
}
