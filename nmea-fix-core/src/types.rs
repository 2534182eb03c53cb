// types.rs
use crate::gps::types::{Date, TimeOfDay};
use chrono::NaiveDate;
use embassy_time::Duration;

/// Degrees scaled by 1e7.
pub type FixedPointDegree = i32;

/// Fields older than this are not combined into one fix.
pub const STALENESS_WINDOW_MS: u64 = 300;

/// The last accepted fix plus the most recent lock indicators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FixState {
    pub latitude: FixedPointDegree,
    pub longitude: FixedPointDegree,
    /// Meters, above mean sea level or the ellipsoid per [`AltitudeMode`].
    pub altitude: i32,
    /// Meters between the geoid and the ellipsoid.
    pub geoidal_height: i32,
    /// Dilution of precision scaled by 100.
    pub dop: u32,
    /// Degrees scaled by 1e5.
    pub heading: i32,
    pub satellites: u8,
    /// Unix epoch seconds of the fix.
    pub timestamp: i64,
    pub fix_quality: u8,
    pub fix_type: u8,
}

impl FixState {
    pub const fn new() -> Self {
        Self {
            latitude: 0,
            longitude: 0,
            altitude: 0,
            geoidal_height: 0,
            dop: 0,
            heading: 0,
            satellites: 0,
            timestamp: 0,
            fix_quality: 0,
            fix_type: 0,
        }
    }
}

/// Broken-down UTC time in `struct tm` conventions: month 0-11, year since 1900.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarTime {
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

impl CalendarTime {
    pub const fn from_fields(time: TimeOfDay, date: Date) -> Self {
        Self {
            second: time.second(),
            minute: time.minute(),
            hour: time.hour(),
            day: date.day(),
            month: date.month().wrapping_sub(1),
            year: date.year() - 1900,
        }
    }

    /// Seconds since the Unix epoch, or `None` if the fields do not name a
    /// real instant.
    pub fn unix_seconds(&self) -> Option<i64> {
        let date = NaiveDate::from_ymd_opt(
            1900 + i32::from(self.year),
            u32::from(self.month) + 1,
            u32::from(self.day),
        )?;
        let datetime = date.and_hms_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
        )?;
        Some(datetime.and_utc().timestamp())
    }
}

/// How trustworthy a time handed to the clock is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockQuality {
    None,
    Device,
    FromNet,
    Gps,
}

/// Consumer of satellite time, typically the real-time clock.
pub trait ClockSync {
    /// `time` is passed through as the receiver reported it and may not be
    /// a real date; see [`CalendarTime::unix_seconds`].
    fn set_clock(&mut self, quality: ClockQuality, time: &CalendarTime);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AltitudeMode {
    /// Altitude as reported, above mean sea level.
    MeanSeaLevel,
    /// Height above the WGS84 ellipsoid (altitude plus geoidal height).
    Ellipsoid,
}

impl Default for AltitudeMode {
    fn default() -> Self {
        if cfg!(feature = "altitude-hae") {
            AltitudeMode::Ellipsoid
        } else {
            AltitudeMode::MeanSeaLevel
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FixConfig {
    pub altitude: AltitudeMode,
    pub staleness_ms: u64,
}

impl FixConfig {
    pub fn staleness(&self) -> Duration {
        Duration::from_millis(self.staleness_ms)
    }
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            altitude: AltitudeMode::default(),
            staleness_ms: STALENESS_WINDOW_MS,
        }
    }
}
