//! Big-endian serialization shared by the spill file and the XDR writer.
//!
//! Wire types:
//!
//! | Rust      | Wire                      |
//! |-----------|---------------------------|
//! | `f64`     | IEEE-754 64-bit, big-endian |
//! | `usize`   | signed 32-bit, big-endian  |
//!
//! Cell indices and counts are written as `i32` because that is what XDR
//! consumers expect; values that do not fit are rejected.
//!
//! A spill record is one sparse entry:
//!
//! ```text
//! f64 longitude | f64 latitude | i32 column | i32 row | [i32 layer] | i32 count | f64 value
//! ```

use bytes::{Buf, BufMut};

use crate::error::{RegridError, Result};
use crate::types::SparseEntry;

/// Encoded size of an `f64`.
pub const F64_SIZE: usize = 8;

/// Encoded size of an index or count.
pub const I32_SIZE: usize = 4;

/// Encoded size of one spill record.
pub const fn record_stride(layered: bool) -> usize {
    let base = 3 * F64_SIZE + 3 * I32_SIZE;
    if layered {
        base + I32_SIZE
    } else {
        base
    }
}

/// Write `values` as big-endian f64s.
pub fn put_f64s<B: BufMut>(buf: &mut B, values: &[f64]) {
    for &value in values {
        buf.put_f64(value);
    }
}

/// Write one index or count as a big-endian i32.
pub fn put_index<B: BufMut>(buf: &mut B, value: usize) -> Result<()> {
    let value = i32::try_from(value)
        .map_err(|_| RegridError::invalid_input(format!("{} does not fit in i32", value)))?;
    buf.put_i32(value);
    Ok(())
}

/// Write indices or counts as big-endian i32s.
pub fn put_indices<B: BufMut>(buf: &mut B, values: &[usize]) -> Result<()> {
    for &value in values {
        put_index(buf, value)?;
    }
    Ok(())
}

fn ensure_remaining<B: Buf>(buf: &B, needed: usize) -> Result<()> {
    if buf.remaining() < needed {
        return Err(RegridError::invalid_input(format!(
            "truncated data: need {} bytes, {} remain",
            needed,
            buf.remaining()
        )));
    }
    Ok(())
}

/// Read `count` big-endian f64s.
pub fn get_f64s<B: Buf>(buf: &mut B, count: usize) -> Result<Vec<f64>> {
    ensure_remaining(buf, count * F64_SIZE)?;
    Ok((0..count).map(|_| buf.get_f64()).collect())
}

/// Read one big-endian i32 index or count.
pub fn get_index<B: Buf>(buf: &mut B) -> Result<usize> {
    ensure_remaining(buf, I32_SIZE)?;
    let value = buf.get_i32();
    usize::try_from(value)
        .map_err(|_| RegridError::invalid_input(format!("negative index {}", value)))
}

/// Read `count` big-endian i32 indices or counts.
pub fn get_indices<B: Buf>(buf: &mut B, count: usize) -> Result<Vec<usize>> {
    ensure_remaining(buf, count * I32_SIZE)?;
    (0..count).map(|_| get_index(buf)).collect()
}

/// Encode the spill fields of `entry`.
pub fn put_record<B: BufMut>(buf: &mut B, entry: &SparseEntry, layered: bool) -> Result<()> {
    buf.put_f64(entry.longitude);
    buf.put_f64(entry.latitude);
    put_index(buf, entry.column)?;
    put_index(buf, entry.row)?;
    if layered {
        let layer = entry
            .layer
            .ok_or_else(|| RegridError::spill("layered record without a layer"))?;
        put_index(buf, layer)?;
    }
    put_index(buf, entry.count)?;
    buf.put_f64(entry.value);
    Ok(())
}

/// Decode one spill record. Fields not stored in the record are left empty.
pub fn get_record<B: Buf>(buf: &mut B, layered: bool) -> Result<SparseEntry> {
    ensure_remaining(buf, record_stride(layered))?;
    let longitude = buf.get_f64();
    let latitude = buf.get_f64();
    let column = get_index(buf)?;
    let row = get_index(buf)?;
    let layer = if layered { Some(get_index(buf)?) } else { None };
    let count = get_index(buf)?;
    let value = buf.get_f64();

    Ok(SparseEntry {
        column,
        row,
        layer,
        longitude,
        latitude,
        elevation: None,
        value,
        value2: None,
        count,
        note: None,
    })
}
