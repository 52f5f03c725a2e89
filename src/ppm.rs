//! Plain-text PPM (P3) image output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Error;
use crate::frame::Frame;

/// Quantize a linear channel value to a display byte.
fn to_byte(v: f32) -> u8 {
    (255.0 * v.clamp(0.0, 1.0)).round() as u8
}

/// Write the frame as a P3 PPM image, top row first.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be created or written.
pub fn write_p3<P: AsRef<Path>>(frame: &Frame, path: P) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    writeln!(out, "P3\n{} {}\n255", frame.width, frame.height)?;

    for row in frame.pixels.chunks(frame.width) {
        for px in row {
            write!(
                out,
                "{} {} {}  ",
                to_byte(px[0]),
                to_byte(px[1]),
                to_byte(px[2])
            )?;
        }
        writeln!(out)?;
    }

    out.flush()?;
    Ok(())
}
