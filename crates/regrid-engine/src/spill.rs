//! Temporary spill file for compacted timesteps.
//!
//! Long footprint runs can produce more compacted timesteps than are worth
//! holding in memory. [`SpillWriter`] appends each timestep as fixed-stride
//! records (see [`crate::codec`]) to an anonymous temporary file; the
//! [`SpillReader`] it turns into seeks straight to any timestep using the
//! cumulative point counts of the timesteps before it.
//!
//! Only the spill fields (coordinates, column, row, layer, count, value) are
//! stored. Layer elevations are recomputed by the caller on read.

use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};

use bytes::BytesMut;

use crate::codec::{self, record_stride};
use crate::error::{RegridError, Result};
use crate::types::{SparseLayout, SparseTimestepResult};

pub struct SpillWriter {
    file: BufWriter<File>,
    layered: bool,
    point_counts: Vec<usize>,
    buffer: BytesMut,
}

impl SpillWriter {
    /// Create a writer backed by a new temporary file, removed when the
    /// writer or reader is dropped.
    pub fn new(layered: bool) -> Result<Self> {
        let file = tempfile::tempfile()
            .map_err(|e| RegridError::spill(format!("failed to create spill file: {}", e)))?;
        Ok(Self {
            file: BufWriter::new(file),
            layered,
            point_counts: Vec::new(),
            buffer: BytesMut::new(),
        })
    }

    /// Append one compacted timestep.
    pub fn append(&mut self, timestep: &SparseTimestepResult) -> Result<()> {
        if timestep.layers.is_some() != self.layered {
            return Err(RegridError::spill(format!(
                "timestep {} layers but spill file is {}",
                if timestep.layers.is_some() { "has" } else { "has no" },
                if self.layered { "layered" } else { "2-D" }
            )));
        }

        self.buffer.clear();
        self.buffer.reserve(timestep.len() * record_stride(self.layered));
        for entry in timestep.iter() {
            codec::put_record(&mut self.buffer, &entry, self.layered)?;
        }
        self.file.write_all(&self.buffer)?;
        self.point_counts.push(timestep.len());
        Ok(())
    }

    /// Timesteps appended so far.
    pub fn timestep_count(&self) -> usize {
        self.point_counts.len()
    }

    /// Points appended so far.
    pub fn total_points(&self) -> usize {
        self.point_counts.iter().sum()
    }

    /// Flush and switch to reading.
    pub fn into_reader(self) -> Result<SpillReader> {
        let file = self
            .file
            .into_inner()
            .map_err(|e| RegridError::spill(format!("failed to flush spill file: {}", e)))?;

        let mut offsets = Vec::with_capacity(self.point_counts.len());
        let mut offset = 0u64;
        for &count in &self.point_counts {
            offsets.push(offset);
            offset += (count * record_stride(self.layered)) as u64;
        }

        tracing::debug!(
            timesteps = self.point_counts.len(),
            bytes = offset,
            "Spill file written"
        );

        Ok(SpillReader {
            file,
            layered: self.layered,
            point_counts: self.point_counts,
            offsets,
        })
    }
}

pub struct SpillReader {
    file: File,
    layered: bool,
    point_counts: Vec<usize>,
    offsets: Vec<u64>,
}

impl SpillReader {
    pub fn timestep_count(&self) -> usize {
        self.point_counts.len()
    }

    pub fn point_counts(&self) -> &[usize] {
        &self.point_counts
    }

    /// Read timestep `index`, seeking to `stride * sum(point_counts[..index])`.
    pub fn read_timestep(&mut self, index: usize) -> Result<SparseTimestepResult> {
        let (Some(&count), Some(&offset)) = (self.point_counts.get(index), self.offsets.get(index))
        else {
            return Err(RegridError::spill(format!(
                "timestep {} out of range ({} spilled)",
                index,
                self.point_counts.len()
            )));
        };

        let mut bytes = vec![0u8; count * record_stride(self.layered)];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut bytes)?;

        let layout = SparseLayout {
            layers: self.layered,
            ..Default::default()
        };
        let mut timestep = SparseTimestepResult::with_layout(layout, count);
        let mut buf = bytes.as_slice();
        for _ in 0..count {
            timestep.push(&codec::get_record(&mut buf, self.layered)?);
        }
        Ok(timestep)
    }
}
