//! State report layout, decoding view, and client-side builder.
//!
//! A report is three parallel value arrays concatenated in config order:
//! absolute-axis values (i32), relative-axis deltas (i32), button states
//! (u8, 0/1).  Its size is fully determined by the config's three counts, so
//! the receiver can validate a payload before touching it.

use std::ops::Range;

use thiserror::Error;

use super::config::DeviceConfig;

/// A report payload whose size does not match the expected layout.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("report payload must be {expected} bytes, got {actual}")]
pub struct ReportSizeError {
    pub expected: usize,
    pub actual: usize,
}

/// Report shape derived once from a config's descriptor counts.
///
/// All offsets are computed here; nothing else in the codebase does report
/// arithmetic.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ReportLayout {
    abs_count: usize,
    rel_count: usize,
    button_count: usize,
}

impl ReportLayout {
    pub fn new(abs_count: usize, rel_count: usize, button_count: usize) -> Self {
        Self {
            abs_count,
            rel_count,
            button_count,
        }
    }

    pub fn abs_count(&self) -> usize {
        self.abs_count
    }

    pub fn rel_count(&self) -> usize {
        self.rel_count
    }

    pub fn button_count(&self) -> usize {
        self.button_count
    }

    /// Total payload size: `4·abs + 4·rel + 1·buttons`.
    pub fn byte_len(&self) -> usize {
        4 * self.abs_count + 4 * self.rel_count + self.button_count
    }

    fn abs_region(&self) -> Range<usize> {
        0..4 * self.abs_count
    }

    fn rel_region(&self) -> Range<usize> {
        let start = 4 * self.abs_count;
        start..start + 4 * self.rel_count
    }

    fn button_region(&self) -> Range<usize> {
        let start = 4 * (self.abs_count + self.rel_count);
        start..start + self.button_count
    }
}

/// Zero-copy view over a validated report payload.
#[derive(Debug, Clone, Copy)]
pub struct ReportView<'a> {
    layout: ReportLayout,
    bytes: &'a [u8],
}

impl<'a> ReportView<'a> {
    /// Wraps `bytes` after checking they match the layout's exact size.
    pub fn new(layout: ReportLayout, bytes: &'a [u8]) -> Result<Self, ReportSizeError> {
        if bytes.len() != layout.byte_len() {
            return Err(ReportSizeError {
                expected: layout.byte_len(),
                actual: bytes.len(),
            });
        }
        Ok(Self { layout, bytes })
    }

    /// Absolute-axis values in slot order.
    pub fn abs_values(&self) -> impl Iterator<Item = i32> + 'a {
        read_i32_region(&self.bytes[self.layout.abs_region()])
    }

    /// Relative-axis deltas in slot order.
    pub fn rel_values(&self) -> impl Iterator<Item = i32> + 'a {
        read_i32_region(&self.bytes[self.layout.rel_region()])
    }

    /// Button states in slot order.
    pub fn button_values(&self) -> impl Iterator<Item = u8> + 'a {
        self.bytes[self.layout.button_region()].iter().copied()
    }
}

fn read_i32_region(region: &[u8]) -> impl Iterator<Item = i32> + '_ {
    region
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
}

/// Client-side owned report, updated in place and snapshotted on sync.
///
/// Absolute values are clamped to their axis's configured range on write;
/// buttons normalise to 0/1.
pub struct ReportBuffer {
    layout: ReportLayout,
    bytes: Vec<u8>,
    abs_ranges: Vec<(i32, i32)>,
}

impl ReportBuffer {
    /// Creates an all-zero report shaped for `config`.
    pub fn for_config(config: &DeviceConfig) -> Self {
        let layout = config.report_layout();
        Self {
            layout,
            bytes: vec![0u8; layout.byte_len()],
            abs_ranges: config.abs_axes.iter().map(|a| (a.min, a.max)).collect(),
        }
    }

    /// Stores an absolute-axis value, clamped to the axis range.  Returns
    /// `false` if the slot is out of range.
    pub fn set_abs(&mut self, slot: usize, value: i32) -> bool {
        if slot >= self.layout.abs_count() {
            return false;
        }
        let (min, max) = self.abs_ranges[slot];
        let offset = self.layout.abs_region().start + 4 * slot;
        self.bytes[offset..offset + 4].copy_from_slice(&value.clamp(min, max).to_le_bytes());
        true
    }

    /// Stores a relative-axis delta.  Returns `false` if the slot is out of
    /// range.
    pub fn set_rel(&mut self, slot: usize, value: i32) -> bool {
        if slot >= self.layout.rel_count() {
            return false;
        }
        let offset = self.layout.rel_region().start + 4 * slot;
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        true
    }

    /// Stores a button state.  Returns `false` if the slot is out of range.
    pub fn set_button(&mut self, slot: usize, pressed: bool) -> bool {
        if slot >= self.layout.button_count() {
            return false;
        }
        let offset = self.layout.button_region().start + slot;
        self.bytes[offset] = u8::from(pressed);
        true
    }

    /// The current report payload, ready to transmit.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
