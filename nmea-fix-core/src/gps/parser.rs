// gps/parser.rs
use crate::gps::provider::{CustomValue, FieldProvider};
use crate::gps::types::{Date, Datum, Location, NmeaError, RawDegreeValue, ReaderHealth, TimeOfDay};
use embassy_time::Instant;
use heapless::Vec;

/// Longest sentence we buffer. NMEA caps sentences at 82 bytes.
pub const MAX_SENTENCE_LEN: usize = 128;
/// Enough for GSA, which carries the most fields of the sentences we read.
pub const MAX_FIELDS: usize = 24;
pub const MAX_WATCHED_FIELDS: usize = 4;

pub fn validate_checksum(line: &[u8]) -> bool {
    let mut parts = line.split(|&b| b == b'*');
    let payload = parts.next().unwrap_or(&[]);
    let checksum_hex = parts.next().unwrap_or(&[]);
    if payload.is_empty() || checksum_hex.len() < 2 {
        return false;
    }

    let mut calc = 0u8;
    let start = if payload.starts_with(b"$") { 1 } else { 0 };
    for &b in &payload[start..] {
        calc ^= b;
    }

    core::str::from_utf8(&checksum_hex[..2])
        .ok()
        .and_then(|s| u8::from_str_radix(s, 16).ok())
        .map_or(false, |prov| calc == prov)
}

#[derive(Clone, Debug, Default)]
struct WatchedField {
    sentence: &'static str,
    index: u8,
    datum: Datum<CustomValue>,
}

/// Byte-at-a-time NMEA reader.
///
/// Understands `GGA` and `RMC` from any talker plus whatever custom fields
/// were registered with [`FieldProvider::watch`]. Fields are only committed
/// once the whole sentence has passed its checksum.
#[derive(Clone, Debug, Default)]
pub struct NmeaReader {
    line: Vec<u8, MAX_SENTENCE_LEN>,
    overflowed: bool,
    location: Datum<Location>,
    time: Datum<TimeOfDay>,
    date: Datum<Date>,
    hdop: Datum<u32>,
    satellites: Datum<u32>,
    course: Datum<i32>,
    altitude: Datum<i32>,
    geoid_height: Datum<i32>,
    fix_quality: u8,
    watched: Vec<WatchedField, MAX_WATCHED_FIELDS>,
    health: ReaderHealth,
}

impl NmeaReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn health(&self) -> ReaderHealth {
        self.health
    }

    /// Parses one complete sentence (without the line terminator) and
    /// commits its fields.
    ///
    /// Returns true if the sentence committed a field we consume: anything
    /// from `GGA` or `RMC`, or a watched custom field.
    pub fn process_line(&mut self, line: &[u8], now: Instant) -> Result<bool, NmeaError> {
        if !validate_checksum(line) {
            return Err(NmeaError::InvalidChecksum);
        }
        let Ok(sentence) = core::str::from_utf8(line) else {
            return Err(NmeaError::InvalidData);
        };

        let body = sentence.split('*').next().unwrap_or("");
        let fields: Vec<&str, MAX_FIELDS> = body.split(',').take(MAX_FIELDS).collect();
        let name = fields
            .first()
            .and_then(|f| f.strip_prefix('$'))
            .ok_or(NmeaError::InvalidData)?;

        let known = match name.get(2..) {
            Some("GGA") => {
                self.commit_gga(&fields, now);
                true
            }
            Some("RMC") => {
                self.commit_rmc(&fields, now);
                true
            }
            Some(_) => false,
            None => return Err(NmeaError::InvalidData),
        };

        let watched = self.commit_watched(name, &fields, now);
        Ok(known || watched)
    }

    // An empty numeric field commits as 0, so a blank HDOP reads as an
    // incomplete DOP rather than leaving the previous value in place.
    fn commit_gga(&mut self, fields: &[&str], now: Instant) {
        let quality = field(fields, 6);
        self.fix_quality = quality.parse::<u8>().unwrap_or(0);
        let has_fix = quality.bytes().next().map_or(false, |c| c > b'0');

        if let Some(time) = parse_time(field(fields, 1)) {
            self.time.commit(time, now);
        }
        if has_fix {
            if let Some(loc) = parse_location(&fields[2.min(fields.len())..]) {
                self.location.commit(loc, now);
            }
            self.altitude.commit(parse_decimal(field(fields, 9)), now);
            self.geoid_height.commit(parse_decimal(field(fields, 11)), now);
        }
        self.satellites.commit(atoi(field(fields, 7)).max(0) as u32, now);
        self.hdop.commit(parse_decimal(field(fields, 8)).max(0) as u32, now);
    }

    fn commit_rmc(&mut self, fields: &[&str], now: Instant) {
        let has_fix = field(fields, 2) == "A";

        if let Some(time) = parse_time(field(fields, 1)) {
            self.time.commit(time, now);
        }
        if !field(fields, 9).is_empty() {
            self.date.commit(Date(atoi(field(fields, 9)).max(0) as u32), now);
        }
        if has_fix {
            if let Some(loc) = parse_location(&fields[3.min(fields.len())..]) {
                self.location.commit(loc, now);
            }
            self.course.commit(parse_decimal(field(fields, 8)), now);
        }
    }

    fn commit_watched(&mut self, name: &str, fields: &[&str], now: Instant) -> bool {
        let mut committed = false;
        for watched in self.watched.iter_mut().filter(|w| w.sentence == name) {
            let Some(raw) = fields.get(watched.index as usize) else {
                continue;
            };
            let mut value = CustomValue::new();
            if value.push_str(raw).is_ok() {
                watched.datum.commit(value, now);
                committed = true;
            }
        }
        committed
    }

    fn push(&mut self, byte: u8) {
        if self.line.push(byte).is_err() {
            self.overflowed = true;
        }
    }

    fn finish_line(&mut self, now: Instant) -> bool {
        if self.line.is_empty() {
            return false;
        }
        let line = core::mem::take(&mut self.line);
        if core::mem::take(&mut self.overflowed) {
            self.health.parse_errors = self.health.parse_errors.saturating_add(1);
            return false;
        }

        match self.process_line(&line, now) {
            Ok(consumed) => {
                self.health.sentences = self.health.sentences.wrapping_add(1);
                consumed
            }
            Err(NmeaError::InvalidChecksum) => {
                self.health.checksum_errors = self.health.checksum_errors.saturating_add(1);
                crate::trace!("NMEA checksum mismatch");
                false
            }
            Err(_) => {
                self.health.parse_errors = self.health.parse_errors.saturating_add(1);
                false
            }
        }
    }
}

impl FieldProvider for NmeaReader {
    fn encode(&mut self, byte: u8, now: Instant) -> bool {
        match byte {
            b'\r' | b'\n' => self.finish_line(now),
            b'$' => {
                // A new sentence start discards any unterminated fragment.
                self.line.clear();
                self.overflowed = false;
                self.push(byte);
                false
            }
            _ => {
                self.push(byte);
                false
            }
        }
    }

    fn location(&mut self) -> &mut Datum<Location> {
        &mut self.location
    }
    fn time(&mut self) -> &mut Datum<TimeOfDay> {
        &mut self.time
    }
    fn date(&mut self) -> &mut Datum<Date> {
        &mut self.date
    }
    fn hdop(&mut self) -> &mut Datum<u32> {
        &mut self.hdop
    }
    fn satellites(&mut self) -> &mut Datum<u32> {
        &mut self.satellites
    }
    fn course(&mut self) -> &mut Datum<i32> {
        &mut self.course
    }
    fn altitude(&mut self) -> &mut Datum<i32> {
        &mut self.altitude
    }
    fn geoid_height(&mut self) -> &mut Datum<i32> {
        &mut self.geoid_height
    }

    fn fix_quality(&self) -> u8 {
        self.fix_quality
    }

    fn watch(&mut self, sentence: &'static str, index: u8) -> bool {
        if self
            .watched
            .iter()
            .any(|w| w.sentence == sentence && w.index == index)
        {
            return true;
        }
        self.watched
            .push(WatchedField {
                sentence,
                index,
                datum: Datum::default(),
            })
            .is_ok()
    }

    fn custom(&mut self, sentence: &str, index: u8) -> Option<&mut Datum<CustomValue>> {
        self.watched
            .iter_mut()
            .find(|w| w.sentence == sentence && w.index == index)
            .map(|w| &mut w.datum)
    }
}

fn field<'a>(fields: &[&'a str], index: usize) -> &'a str {
    fields.get(index).copied().unwrap_or("")
}

/// Leading integer of `raw`, `atoi` style: stops at the first non-digit and
/// yields 0 when there is none.
pub fn atoi(raw: &str) -> i32 {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i32, |acc, c| {
            acc.saturating_mul(10).saturating_add(i32::from(c - b'0'))
        });
    if negative { -value } else { value }
}

/// Parses a decimal into hundredths, truncating past the second fractional
/// digit ("545.4" -> 54540, "0.9" -> 90).
pub fn parse_decimal(raw: &str) -> i32 {
    let s = raw.trim_start();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let mut ret = atoi(s).saturating_mul(100);
    if let Some((_, frac)) = s.split_once('.') {
        let mut digits = frac.bytes();
        if let Some(d) = digits.next().filter(u8::is_ascii_digit) {
            ret = ret.saturating_add(10 * i32::from(d - b'0'));
            if let Some(d) = digits.next().filter(u8::is_ascii_digit) {
                ret = ret.saturating_add(i32::from(d - b'0'));
            }
        }
    }
    if negative { -ret } else { ret }
}

/// Parses a `DDDMM.MMMMM` coordinate into whole degrees and billionths.
///
/// Minutes are accumulated in ten-millionths and rescaled by 100/60 with
/// rounding, so up to seven fractional minute digits are kept.
pub fn parse_degrees(raw: &str) -> Option<RawDegreeValue> {
    if raw.is_empty() {
        return None;
    }
    let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
    let left = whole.parse::<u32>().ok()?;

    let mut multiplier: u64 = 10_000_000;
    let mut ten_millionths = u64::from(left % 100) * multiplier;
    for c in frac.bytes().take_while(u8::is_ascii_digit) {
        multiplier /= 10;
        ten_millionths += u64::from(c - b'0') * multiplier;
    }
    let billionths = (5 * ten_millionths + 1) / 3;

    Some(RawDegreeValue::new(
        (left / 100) as i32,
        billionths as i32,
        false,
    ))
}

/// Expects `[lat, N|S, lon, E|W]` at the front of `fields`.
fn parse_location(fields: &[&str]) -> Option<Location> {
    let mut lat = parse_degrees(field(fields, 0))?;
    lat.negative = field(fields, 1) == "S";
    let mut lng = parse_degrees(field(fields, 2))?;
    lng.negative = field(fields, 3) == "W";
    Some(Location { lat, lng })
}

fn parse_time(raw: &str) -> Option<TimeOfDay> {
    if raw.is_empty() {
        return None;
    }
    Some(TimeOfDay(parse_decimal(raw).max(0) as u32))
}
