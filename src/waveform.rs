//! Scope waveform transfers.
//!
//! A waveform comes back as a preamble describing the record followed by a
//! binary block of unsigned big-endian 16-bit samples. Sample `i` with raw
//! value `v` maps to the point
//! `((i - x_reference) * x_increment + x_origin, (v - y_reference) * y_increment + y_origin)`.

use crate::error::{IviError, IviResult};

/// Word transfer format code.
const FORMAT_WORD: i64 = 1;
/// Peak detect acquisition type code.
const TYPE_PEAK_DETECT: i64 = 1;

/// Scaling information of one waveform record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preamble {
    /// Transfer format code; only words are decoded.
    pub format: i64,
    /// Acquisition type code.
    pub acquisition_type: i64,
    /// Number of points in the record.
    pub points: usize,
    /// Number of averages.
    pub count: i64,
    pub x_increment: f64,
    pub x_origin: f64,
    pub x_reference: i64,
    pub y_increment: f64,
    pub y_origin: f64,
    pub y_reference: i64,
}

impl Preamble {
    /// Parse the ten comma separated preamble fields.
    ///
    /// # Errors
    ///
    /// [`IviError::MalformedResponse`] for a short or non-numeric reply or a
    /// format other than words; [`IviError::InvalidAcquisitionType`] for a
    /// peak detect record.
    pub fn parse(command: &str, reply: &str) -> IviResult<Self> {
        let malformed = || IviError::malformed(command, reply.trim());
        let fields: Vec<&str> = reply.trim().split(',').map(str::trim).collect();
        if fields.len() < 10 {
            return Err(malformed());
        }
        let float = |i: usize| {
            fields[i]
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(malformed)
        };
        // integers are sometimes sent in float notation
        let int = |i: usize| float(i).map(|v| v as i64);

        let preamble = Self {
            format: int(0)?,
            acquisition_type: int(1)?,
            points: usize::try_from(int(2)?).map_err(|_| malformed())?,
            count: int(3)?,
            x_increment: float(4)?,
            x_origin: float(5)?,
            x_reference: int(6)?,
            y_increment: float(7)?,
            y_origin: float(8)?,
            y_reference: int(9)?,
        };

        if preamble.acquisition_type == TYPE_PEAK_DETECT {
            return Err(IviError::InvalidAcquisitionType("peak detect".to_string()));
        }
        if preamble.format != FORMAT_WORD {
            return Err(malformed());
        }
        Ok(preamble)
    }

    /// Scale `data` into `(time, voltage)` points.
    ///
    /// # Errors
    ///
    /// [`IviError::MalformedResponse`] when the block holds fewer samples
    /// than the preamble announces.
    pub fn decode(&self, data: &[u8]) -> IviResult<Vec<(f64, f64)>> {
        if data.len() < self.points * 2 {
            return Err(IviError::malformed(
                "waveform data",
                format!("{} bytes for {} points", data.len(), self.points),
            ));
        }
        Ok(data
            .chunks_exact(2)
            .take(self.points)
            .enumerate()
            .map(|(i, word)| {
                let raw = i64::from(u16::from_be_bytes([word[0], word[1]]));
                let x = (i as i64 - self.x_reference) as f64 * self.x_increment + self.x_origin;
                let y = (raw - self.y_reference) as f64 * self.y_increment + self.y_origin;
                (x, y)
            })
            .collect())
    }
}

/// Build the query of a waveform measurement from the function's wire text.
///
/// The first word gets a `?`; with a qualifier the last word also gets a
/// trailing comma, so `vrms display` on `channel1` becomes
/// `:measure:vrms? display, channel1`.
pub fn measurement_query(prefix: &str, function: &str, channel: &str, reference: Option<&str>) -> String {
    let mut words: Vec<String> = function.split(' ').map(str::to_string).collect();
    words[0].push('?');
    if words.len() > 1 {
        if let Some(last) = words.last_mut() {
            last.push(',');
        }
    }
    let mut query = format!("{prefix}{} {channel}", words.join(" "));
    if let Some(reference) = reference {
        query.push_str(", ");
        query.push_str(reference);
    }
    query
}
