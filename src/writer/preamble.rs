//! Fixed 512-byte file preamble.
//!
//! Consumers identify the format from these bytes alone, independent of the
//! container signature that follows: an ASCII banner space-padded to 116
//! bytes, a 12-byte binary marker (8-byte subsystem offset, version 0x0200
//! little-endian, `IM` endian tag), then zero padding.

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::util::{Error, Result};

/// Total preamble size; matches the substrate's reserved leading block.
pub const PREAMBLE_LEN: usize = 512;

/// Space-padded banner text length.
const BANNER_LEN: usize = 116;

/// Subsystem offset (8 zero bytes), version 0x0200 LE, endian tag.
const MARKER: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0x00, 0x02, b'I', b'M'];

const PLATFORM: &str = "PCWIN64";

const CREATED_STAMP: &[FormatItem<'static>] = format_description!(
    "[weekday repr:short] [month repr:short] [day] [hour]:[minute]:[second] [year]"
);

/// Render the full 512-byte preamble for the given creation time.
pub(crate) fn render(created: OffsetDateTime) -> Result<[u8; PREAMBLE_LEN]> {
    let stamp = created.format(&CREATED_STAMP)?;
    let banner = format!(
        "MATLAB 7.3 MAT-file, Platform: {PLATFORM}, Created on: {stamp} HDF5 schema 1.00 ."
    );
    if banner.len() > BANNER_LEN {
        return Err(Error::config(format!(
            "preamble banner overflows {BANNER_LEN} bytes: {banner:?}"
        )));
    }

    let mut block = [0u8; PREAMBLE_LEN];
    block[..banner.len()].copy_from_slice(banner.as_bytes());
    block[banner.len()..BANNER_LEN].fill(b' ');
    block[BANNER_LEN..BANNER_LEN + MARKER.len()].copy_from_slice(&MARKER);
    Ok(block)
}

/// Overwrite the reserved leading bytes of `path` with the preamble.
pub(crate) fn write(path: &Path, created: OffsetDateTime) -> Result<()> {
    let block = render(created)?;
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&block)?;
    file.sync_all()?;
    Ok(())
}
