// fix.rs
use crate::datacells::DataCell;
use crate::gps::precision::PrecisionSource;
use crate::gps::provider::FieldProvider;
use crate::gps::types::RawDegreeValue;
use crate::transport::{ingest, Transport};
use crate::types::{AltitudeMode, CalendarTime, ClockQuality, ClockSync, FixConfig, FixState, FixedPointDegree};
use embassy_time::Instant;

/// Course readings at or above this (hundredths of a degree) are bogus.
pub const COURSE_LIMIT: i32 = 36_000;

/// PDOP estimate from HDOP alone, in percent. Assumes VDOP == HDOP, so
/// sqrt(2) rather than the real 3D composition.
pub const PDOP_PER_HDOP_PERCENT: u32 = 141;

/// Why a candidate fix was not committed. Callers normally retry on the next
/// poll instead of acting on these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FixRejected {
    NoLock,
    StaleData,
    NoNewData,
    BogusZeroPosition,
    IncompleteDilutionOfPrecision,
}

/// Converts degrees plus billionths into degrees scaled by 1e7.
pub const fn to_fixed_degrees(d: RawDegreeValue) -> FixedPointDegree {
    let r = d.degrees * 10_000_000 + d.billionths / 100;
    if d.negative { -r } else { r }
}

/// Lock from the position sentence's fix quality, refined by the GSA fix type
/// when that source exists. A fix type of 0 means "no GSA data" and does not
/// block lock.
pub const fn has_lock(fix_quality: u8, fix_type: u8, precision_available: bool) -> bool {
    if fix_quality < 1 || fix_quality > 5 {
        return false;
    }
    !precision_available || fix_type == 3 || fix_type == 0
}

/// PDOP approximated from HDOP, both scaled by 100, rounded to nearest.
pub const fn estimate_pdop(hdop: u32) -> u32 {
    ((hdop as u64 * PDOP_PER_HDOP_PERCENT as u64 + 50) / 100) as u32
}

/// Turns parsed sentence fields into committed position fixes.
pub struct GpsFix<P, S> {
    fields: P,
    precision: S,
    config: FixConfig,
    state: FixState,
}

impl<P: FieldProvider, S: PrecisionSource> GpsFix<P, S> {
    pub fn new(mut fields: P, mut precision: S, config: FixConfig) -> Self {
        if precision.attach(&mut fields) {
            crate::info!("Using GSA for 3D fix type and PDOP");
        } else {
            crate::info!("GSA not available, lock from fix quality only");
        }
        Self {
            fields,
            precision,
            config,
            state: FixState::new(),
        }
    }

    pub fn state(&self) -> &FixState {
        &self.state
    }

    pub fn config(&self) -> &FixConfig {
        &self.config
    }

    pub fn fields(&self) -> &P {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut P {
        &mut self.fields
    }

    pub fn precision(&self) -> &S {
        &self.precision
    }

    /// Drains the transport into the parser. Run this every idle tick.
    pub fn while_idle<T: Transport>(&mut self, transport: &mut T, now: Instant) -> bool {
        ingest(transport, &mut self.fields, now)
    }

    /// Hands satellite time to the clock whenever time and date have been
    /// parsed, regardless of their age.
    ///
    /// The calendar is forwarded as composed; rejecting an impossible date
    /// is up to the clock.
    pub fn look_for_time<C: ClockSync>(&mut self, clock: &mut C) -> bool {
        if !(self.fields.time().is_valid() && self.fields.date().is_valid()) {
            return false;
        }
        let t = CalendarTime::from_fields(self.fields.time().peek(), self.fields.date().peek());
        crate::trace!("NMEA GPS time {}:{}:{}", t.hour, t.minute, t.second);
        clock.set_clock(ClockQuality::Gps, &t);
        true
    }

    pub fn has_lock(&self) -> bool {
        has_lock(
            self.state.fix_quality,
            self.state.fix_type,
            self.precision.is_available(),
        )
    }

    /// Returns true if a new fix was committed.
    pub fn look_for_location(&mut self, now: Instant) -> bool {
        self.try_location(now).is_ok()
    }

    /// Evaluates the current fields and commits a fix if every gate passes.
    ///
    /// Only `fix_quality` and `fix_type` are written on rejection.
    pub fn try_location(&mut self, now: Instant) -> Result<(), FixRejected> {
        let precision_available = self.precision.is_available();
        self.state.fix_quality = self.fields.fix_quality();
        self.state.fix_type = self.precision.fix_type(&mut self.fields);
        if precision_available {
            crate::trace!("fix quality {} type {}", self.state.fix_quality, self.state.fix_type);
        }

        if !self.has_lock() {
            return Err(FixRejected::NoLock);
        }

        // Age of a field that was never parsed is infinite, so this also
        // checks validity. DOP age is not part of the gate.
        let window = self.config.staleness();
        let fresh = self.fields.location().age(now) < window
            && (!precision_available || self.precision.fix_type_age(&mut self.fields, now) < window)
            && self.fields.time().age(now) < window
            && self.fields.date().age(now) < window;
        if !fresh {
            crate::trace!("Stale GPS fields, fix skipped");
            return Err(FixRejected::StaleData);
        }

        if !self.fields.location().is_updated() {
            return Err(FixRejected::NoNewData);
        }

        let loc = self.fields.location().value();
        let latitude = to_fixed_degrees(loc.lat);
        // Some receivers report zeros while the fix is bogus; keep the last
        // good position instead.
        if latitude == 0 {
            crate::debug!("Zero latitude, discarding position");
            return Err(FixRejected::BogusZeroPosition);
        }

        let dop = match self.precision.pdop(&mut self.fields) {
            Some(pdop) => pdop,
            None => estimate_pdop(self.fields.hdop().value()),
        };
        if dop == 0 {
            return Err(FixRejected::IncompleteDilutionOfPrecision);
        }

        self.state.latitude = latitude;
        self.state.longitude = to_fixed_degrees(loc.lng);
        self.state.dop = dop;

        let geoidal_cm = self.fields.geoid_height().value();
        let altitude_cm = self.fields.altitude().value();
        self.state.geoidal_height = geoidal_cm / 100;
        self.state.altitude = match self.config.altitude {
            AltitudeMode::MeanSeaLevel => altitude_cm / 100,
            AltitudeMode::Ellipsoid => altitude_cm.saturating_add(self.state.geoidal_height * 100) / 100,
        };

        let t = CalendarTime::from_fields(self.fields.time().peek(), self.fields.date().peek());
        self.state.timestamp = t.unix_seconds().unwrap_or_else(|| {
            crate::debug!("GPS date does not form a timestamp");
            0
        });

        if self.fields.satellites().is_updated() {
            let count = self.fields.satellites().value();
            self.set_satellites(count);
        }

        let course = self.fields.course();
        if course.is_updated() && course.is_valid() {
            let raw = course.value();
            if raw < COURSE_LIMIT {
                // hundredths of a degree to 1e-5 degrees
                self.state.heading = raw.saturating_mul(1_000);
            } else {
                crate::warn!("Bogus course rejected: {}", raw);
            }
        }

        Ok(())
    }

    fn set_satellites(&mut self, count: u32) {
        self.state.satellites = count.min(u32::from(u8::MAX)) as u8;
    }

    /// Copies the current state into `cell` for readers in other contexts.
    pub fn publish(&self, cell: &DataCell<FixState>, now: Instant) {
        cell.update(self.state, now);
    }
}

#[cfg(test)]
mod tests;
