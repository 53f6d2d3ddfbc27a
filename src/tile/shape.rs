// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Compact shape encoding: a varint point count, followed by zig-zag varint
//! deltas of fixed-point (1e-7°) longitudes and latitudes.

use protobuf::{CodedInputStream, CodedOutputStream};

use super::{from_fixed, to_fixed};
use crate::Coordinate;

/// Appends an encoded shape to `out`.
pub(super) fn encode(shape: &[Coordinate], out: &mut Vec<u8>) -> Result<(), protobuf::Error> {
    let mut os = CodedOutputStream::vec(out);
    os.write_raw_varint32(shape.len() as u32)?;

    let mut previous = (0i64, 0i64);
    for point in shape {
        let current = (to_fixed(point.lon) as i64, to_fixed(point.lat) as i64);
        os.write_sint64_no_tag(current.0 - previous.0)?;
        os.write_sint64_no_tag(current.1 - previous.1)?;
        previous = current;
    }

    os.flush()
}

/// Decodes a shape starting at the beginning of `data`.
/// Any bytes after the shape are ignored.
pub(super) fn decode(data: &[u8]) -> Result<Vec<Coordinate>, protobuf::Error> {
    let mut is = CodedInputStream::from_bytes(data);
    let count = is.read_raw_varint32()?;

    let mut shape = Vec::with_capacity(count as usize);
    let mut current = (0i64, 0i64);
    for _ in 0..count {
        current.0 += is.read_sint64()?;
        current.1 += is.read_sint64()?;
        shape.push(Coordinate::new(
            from_fixed(current.0 as i32),
            from_fixed(current.1 as i32),
        ));
    }

    return Ok(shape);
}
