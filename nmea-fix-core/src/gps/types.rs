// gps/types.rs
use embassy_time::{Duration, Instant};

/// A coordinate as reported by the sentence parser: whole degrees plus the
/// fractional part in billionths of a degree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawDegreeValue {
    pub degrees: i32,
    pub billionths: i32,
    pub negative: bool,
}

impl RawDegreeValue {
    pub const fn new(degrees: i32, billionths: i32, negative: bool) -> Self {
        Self {
            degrees,
            billionths,
            negative,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Location {
    pub lat: RawDegreeValue,
    pub lng: RawDegreeValue,
}

/// UTC time of day packed as `hhmmsscc`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeOfDay(pub u32);

impl TimeOfDay {
    pub const fn hour(&self) -> u8 {
        (self.0 / 1_000_000) as u8
    }
    pub const fn minute(&self) -> u8 {
        ((self.0 / 10_000) % 100) as u8
    }
    pub const fn second(&self) -> u8 {
        ((self.0 / 100) % 100) as u8
    }
    pub const fn centisecond(&self) -> u8 {
        (self.0 % 100) as u8
    }
}

/// UTC date packed as `ddmmyy`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Date(pub u32);

impl Date {
    pub const fn day(&self) -> u8 {
        (self.0 / 10_000) as u8
    }
    pub const fn month(&self) -> u8 {
        ((self.0 / 100) % 100) as u8
    }
    /// Full year; NMEA only carries two digits, always read as 20yy.
    pub const fn year(&self) -> u16 {
        (self.0 % 100) as u16 + 2000
    }
}

/// One parsed field together with its bookkeeping.
///
/// `valid` means the field has been parsed at least once. `updated` is set on
/// every commit and cleared by [`Datum::value`], so a caller can tell whether
/// it is looking at a reading it has already consumed.
#[derive(Clone, Debug, Default)]
pub struct Datum<T> {
    value: T,
    valid: bool,
    updated: bool,
    last_commit: Option<Instant>,
}

impl<T: Clone> Datum<T> {
    pub fn commit(&mut self, value: T, now: Instant) {
        self.value = value;
        self.valid = true;
        self.updated = true;
        self.last_commit = Some(now);
    }

    /// Reads the value and marks it as consumed.
    pub fn value(&mut self) -> T {
        self.updated = false;
        self.value.clone()
    }

    /// Reads the value without touching the updated flag.
    pub fn peek(&self) -> T {
        self.value.clone()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    /// Time since the last commit. A field that was never parsed is
    /// infinitely old.
    pub fn age(&self, now: Instant) -> Duration {
        match (self.valid, self.last_commit) {
            (true, Some(at)) => now
                .checked_duration_since(at)
                .unwrap_or(Duration::from_ticks(0)),
            _ => Duration::MAX,
        }
    }
}

/// Counters kept by the sentence reader.
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReaderHealth {
    pub sentences: u32,
    pub checksum_errors: u16,
    pub parse_errors: u16,
}

impl ReaderHealth {
    pub const fn new() -> Self {
        Self {
            sentences: 0,
            checksum_errors: 0,
            parse_errors: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NmeaError {
    InvalidChecksum,
    InvalidData,
    Overflow,
}
