use std::io;

/// Errors that can occur when decoding a `sidx` box.
#[derive(Debug, thiserror::Error)]
pub enum SidxError {
    /// The buffer ended before a field or the declared box extent could be read.
    #[error("truncated sidx data: {0}")]
    Truncated(#[from] io::Error),
    /// The buffer was scanned to its end without meeting a `sidx` box.
    #[error("no sidx box found")]
    NotFound,
    /// A box declared a size smaller than its own header.
    #[error("invalid size {size} for box '{box_type}'")]
    InvalidBoxSize {
        /// Four-character code of the offending box.
        box_type: String,
        /// Declared size.
        size: u64,
    },
    /// A box other than `sidx` used the 64-bit size form; skipping it is not supported.
    #[error("cannot skip extended-size box '{0}'")]
    UnsupportedLargeBox(String),
    /// The timescale field was zero.
    #[error("sidx timescale is zero")]
    ZeroTimescale,
    /// The box carried no segment references.
    #[error("sidx box has no references")]
    NoReferences,
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use byteorder::ReadBytesExt;
    use io::Cursor;

    use super::*;

    #[test]
    fn test_error_display() {
        let cases = [
            (
                SidxError::Truncated(Cursor::new(Vec::<u8>::new()).read_u8().unwrap_err()),
                "truncated sidx data: failed to fill whole buffer",
            ),
            (SidxError::NotFound, "no sidx box found"),
            (
                SidxError::InvalidBoxSize {
                    box_type: "moof".to_string(),
                    size: 4,
                },
                "invalid size 4 for box 'moof'",
            ),
            (
                SidxError::UnsupportedLargeBox("mdat".to_string()),
                "cannot skip extended-size box 'mdat'",
            ),
            (SidxError::ZeroTimescale, "sidx timescale is zero"),
            (SidxError::NoReferences, "sidx box has no references"),
        ];

        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }
}
