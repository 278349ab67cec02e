use std::io::{self, Cursor};

use byteorder::{BigEndian, ReadBytesExt};

use crate::SidxError;

/// Four-character code of the segment index box.
pub const SIDX_BOX_TYPE: [u8; 4] = *b"sidx";

// size (4) + type (4)
const BOX_HEADER_SIZE: u64 = 8;
// size (4) + type (4) + largesize (8)
const LARGE_BOX_HEADER_SIZE: u64 = 16;

/// One reference (segment) described by a `sidx` box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentEntry {
    /// 0 for media, 1 for a reference to another `sidx` box.
    pub reference_type: u8,
    /// Referenced size in bytes (31 bits).
    pub size: u32,
    /// Subsegment duration in timescale ticks.
    pub duration: u32,
    /// Whether the subsegment starts with a stream access point.
    pub starts_with_sap: bool,
    /// SAP type (3 bits).
    pub sap_type: u8,
    /// SAP delta time (28 bits).
    pub sap_delta_time: u32,
}

impl SegmentEntry {
    /// Alias for [`SegmentEntry::starts_with_sap`], the sync-sample flag of the reference.
    pub fn is_sync_sample(&self) -> bool {
        self.starts_with_sap
    }

    fn parse(reader: &mut Cursor<&[u8]>) -> io::Result<Self> {
        let reference = reader.read_u32::<BigEndian>()?;
        let duration = reader.read_u32::<BigEndian>()?;
        let sap = reader.read_u32::<BigEndian>()?;

        Ok(Self {
            reference_type: (reference >> 31) as u8,
            size: reference & 0x7fff_ffff,
            duration,
            starts_with_sap: (sap >> 31) == 1,
            sap_type: ((sap >> 28) & 0x7) as u8,
            sap_delta_time: sap & 0x0fff_ffff,
        })
    }
}

/// A decoded segment index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentIndex {
    /// Box version. Version 1 carries 64-bit time and offset fields.
    pub version: u8,
    /// Ticks per second.
    pub timescale: u32,
    /// Presentation time of the first segment, in ticks.
    pub earliest_presentation_time: u64,
    /// Distance in bytes from the end of the `sidx` box to the first segment.
    pub first_offset: u64,
    /// Segment references, in file order. Never empty.
    pub segments: Vec<SegmentEntry>,
}

impl SegmentIndex {
    /// Decodes the first `sidx` box in `data`, returning `None` on any failure.
    ///
    /// Use [`SegmentIndex::parse`] when the failure reason matters.
    pub fn decode(data: &[u8]) -> Option<Self> {
        Self::parse(data).ok()
    }

    /// Scans `data` box by box and decodes the first `sidx` box found.
    ///
    /// Boxes in front of the index are skipped as long as they use the 32-bit
    /// size form. The whole `sidx` box must be present in `data`; a buffer
    /// shorter than the declared box size is rejected rather than decoded
    /// partially.
    pub fn parse(data: &[u8]) -> Result<Self, SidxError> {
        let mut reader = Cursor::new(data);

        loop {
            let box_start = reader.position();
            if (data.len() as u64).saturating_sub(box_start) < BOX_HEADER_SIZE {
                return Err(SidxError::NotFound);
            }

            let size = reader.read_u32::<BigEndian>()? as u64;
            let mut box_type = [0u8; 4];
            io::Read::read_exact(&mut reader, &mut box_type)?;

            let (box_size, header_size) = match size {
                1 => (reader.read_u64::<BigEndian>()?, LARGE_BOX_HEADER_SIZE),
                // a zero size extends the box to the end of the buffer
                0 => (data.len() as u64 - box_start, BOX_HEADER_SIZE),
                _ => (size, BOX_HEADER_SIZE),
            };

            if box_size < header_size {
                return Err(SidxError::InvalidBoxSize {
                    box_type: fourcc(&box_type),
                    size: box_size,
                });
            }

            if box_type == SIDX_BOX_TYPE {
                let box_end = box_start
                    .checked_add(box_size)
                    .filter(|end| *end <= data.len() as u64)
                    .ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            format!("sidx box declares {box_size} bytes"),
                        )
                    })?;
                let body = &data[(box_start + header_size) as usize..box_end as usize];
                return Self::parse_body(body);
            }

            if size == 1 {
                return Err(SidxError::UnsupportedLargeBox(fourcc(&box_type)));
            }
            if size == 0 {
                return Err(SidxError::NotFound);
            }

            reader.set_position(box_start + box_size);
        }
    }

    fn parse_body(body: &[u8]) -> Result<Self, SidxError> {
        let mut reader = Cursor::new(body);

        let version = reader.read_u8()?;
        let _flags = reader.read_u24::<BigEndian>()?;
        let _reference_id = reader.read_u32::<BigEndian>()?;
        let timescale = reader.read_u32::<BigEndian>()?;

        let (earliest_presentation_time, first_offset) = if version == 0 {
            (
                reader.read_u32::<BigEndian>()? as u64,
                reader.read_u32::<BigEndian>()? as u64,
            )
        } else {
            (
                reader.read_u64::<BigEndian>()?,
                reader.read_u64::<BigEndian>()?,
            )
        };

        let _reserved = reader.read_u16::<BigEndian>()?;
        let reference_count = reader.read_u16::<BigEndian>()?;

        if timescale == 0 {
            return Err(SidxError::ZeroTimescale);
        }
        if reference_count == 0 {
            return Err(SidxError::NoReferences);
        }

        let segments = (0..reference_count)
            .map(|_| SegmentEntry::parse(&mut reader))
            .collect::<io::Result<Vec<_>>>()?;

        Ok(Self {
            version,
            timescale,
            earliest_presentation_time,
            first_offset,
            segments,
        })
    }

    /// Target-duration hint for playlists: `ceil(max duration / timescale) + 1` seconds.
    pub fn max_segment_duration(&self) -> u64 {
        let max = self
            .segments
            .iter()
            .map(|s| s.duration as u64)
            .max()
            .unwrap_or_default();
        max.div_ceil(u64::from(self.timescale.max(1))) + 1
    }

    /// Duration of one segment in seconds.
    pub fn duration_secs(&self, segment: &SegmentEntry) -> f64 {
        segment.duration as f64 / self.timescale as f64
    }

    /// Sum of all referenced sizes.
    pub fn total_size(&self) -> u64 {
        self.segments.iter().map(|s| s.size as u64).sum()
    }
}

fn fourcc(box_type: &[u8; 4]) -> String {
    String::from_utf8_lossy(box_type).into_owned()
}
