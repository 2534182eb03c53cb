// fix/tests.rs
#[cfg(test)]
mod tests {
    use crate::gps::provider::CustomValue;
    use crate::{
        estimate_pdop, has_lock, to_fixed_degrees, AltitudeMode, CalendarTime, ClockQuality,
        ClockSync, DataCell, Date, Datum, FieldProvider, FixConfig, FixRejected, FixState, GpsFix,
        GsaPrecision, Location, NmeaReader, NoPrecision, PrecisionSource, RawDegreeValue, TimeOfDay,
    };
    use core::fmt::Write;
    use embassy_time::Instant;

    /// Field provider whose fields are set directly by the test.
    #[derive(Default)]
    struct Fields {
        location: Datum<Location>,
        time: Datum<TimeOfDay>,
        date: Datum<Date>,
        hdop: Datum<u32>,
        satellites: Datum<u32>,
        course: Datum<i32>,
        altitude: Datum<i32>,
        geoid_height: Datum<i32>,
        fix_quality: u8,
        gsa: bool,
        fix_type: Datum<CustomValue>,
        pdop: Datum<CustomValue>,
    }

    impl FieldProvider for Fields {
        fn encode(&mut self, _byte: u8, _now: Instant) -> bool {
            false
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
        fn watch(&mut self, sentence: &'static str, _index: u8) -> bool {
            self.gsa && sentence == "GNGSA"
        }
        fn custom(&mut self, sentence: &str, index: u8) -> Option<&mut Datum<CustomValue>> {
            match (self.gsa, sentence, index) {
                (true, "GNGSA", 2) => Some(&mut self.fix_type),
                (true, "GNGSA", 15) => Some(&mut self.pdop),
                _ => None,
            }
        }
    }

    fn text(s: &str) -> CustomValue {
        let mut v = CustomValue::new();
        v.push_str(s).unwrap();
        v
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    /// 37.520825N 122.309162W, 2024-03-09 12:35:19, all committed at `t`.
    fn fresh_fields(t: Instant) -> Fields {
        let mut f = Fields::default();
        f.fix_quality = 1;
        f.location.commit(
            Location {
                lat: RawDegreeValue::new(37, 520_825_000, false),
                lng: RawDegreeValue::new(122, 309_162_000, true),
            },
            t,
        );
        f.time.commit(TimeOfDay(12_351_900), t);
        f.date.commit(Date(90_324), t);
        f.hdop.commit(150, t);
        f.altitude.commit(15_870, t);
        f.geoid_height.commit(-3_220, t);
        f
    }

    fn with_gsa(mut f: Fields, fix_type: &str, pdop: &str, t: Instant) -> Fields {
        f.gsa = true;
        f.fix_type.commit(text(fix_type), t);
        f.pdop.commit(text(pdop), t);
        f
    }

    #[derive(Default)]
    struct RecordingClock {
        calls: u32,
        last: Option<(ClockQuality, CalendarTime)>,
    }

    impl ClockSync for RecordingClock {
        fn set_clock(&mut self, quality: ClockQuality, time: &CalendarTime) {
            self.calls += 1;
            self.last = Some((quality, *time));
        }
    }

    #[test]
    fn test_degree_conversion() {
        assert_eq!(
            to_fixed_degrees(RawDegreeValue::new(37, 520_825_000, false)),
            375_208_250
        );
        assert_eq!(
            to_fixed_degrees(RawDegreeValue::new(122, 309_162_000, true)),
            -1_223_091_620
        );
        // Sub-hundred billionths are truncated.
        assert_eq!(to_fixed_degrees(RawDegreeValue::new(0, 99, false)), 0);
        assert_eq!(to_fixed_degrees(RawDegreeValue::new(1, 199, true)), -10_000_001);
        assert_eq!(
            to_fixed_degrees(RawDegreeValue::new(180, 0, true)),
            -1_800_000_000
        );
    }

    #[test]
    fn test_lock_table() {
        assert!(!has_lock(0, 3, true));
        assert!(has_lock(1, 3, true));
        assert!(!has_lock(1, 2, true));
        assert!(has_lock(1, 0, true));
        assert!(has_lock(5, 3, true));
        assert!(!has_lock(6, 3, true));

        // Without the secondary sentence only the quality matters.
        assert!(has_lock(1, 2, false));
        assert!(has_lock(4, 0, false));
        assert!(!has_lock(0, 0, false));
        assert!(!has_lock(6, 3, false));
    }

    #[test]
    fn test_estimate_pdop_rounds() {
        assert_eq!(estimate_pdop(150), 212);
        assert_eq!(estimate_pdop(100), 141);
        assert_eq!(estimate_pdop(1), 1);
        assert_eq!(estimate_pdop(0), 0);
    }

    #[test]
    fn test_end_to_end_without_gsa() {
        let t = at(10_000);
        let mut gps = GpsFix::new(fresh_fields(t), NoPrecision, FixConfig::default());
        assert!(gps.look_for_location(at(10_100)));

        let state = gps.state();
        assert_eq!(state.latitude, 375_208_250);
        assert_eq!(state.longitude, -1_223_091_620);
        assert_eq!(state.dop, 212);
        assert_eq!(state.altitude, 158);
        assert_eq!(state.geoidal_height, -32);
        assert_eq!(state.fix_quality, 1);
        assert_eq!(state.fix_type, 0);
        // 2024-03-09T12:35:19Z
        assert_eq!(state.timestamp, 1_709_987_719);
    }

    #[test]
    fn test_end_to_end_with_gsa() {
        let t = at(10_000);
        let fields = with_gsa(fresh_fields(t), "3", "1.83", t);
        let mut gps = GpsFix::new(fields, GsaPrecision::default(), FixConfig::default());
        assert!(gps.precision().is_available());

        assert_eq!(gps.try_location(at(10_050)), Ok(()));
        assert_eq!(gps.state().fix_type, 3);
        assert_eq!(gps.state().dop, 183);
    }

    #[test]
    fn test_two_d_fix_has_no_lock() {
        let t = at(0);
        let fields = with_gsa(fresh_fields(t), "2", "1.83", t);
        let mut gps = GpsFix::new(fields, GsaPrecision::default(), FixConfig::default());
        assert_eq!(gps.try_location(t), Err(FixRejected::NoLock));
        // The indicators are captured even though the fix was refused.
        assert_eq!(gps.state().fix_quality, 1);
        assert_eq!(gps.state().fix_type, 2);
        assert_eq!(gps.state().latitude, 0);
    }

    #[test]
    fn test_no_quality_has_no_lock() {
        let t = at(0);
        let mut fields = fresh_fields(t);
        fields.fix_quality = 0;
        let mut gps = GpsFix::new(fields, NoPrecision, FixConfig::default());
        assert_eq!(gps.try_location(t), Err(FixRejected::NoLock));
        assert!(!gps.has_lock());
    }

    #[test]
    fn test_stale_location_rejected_first() {
        let mut fields = fresh_fields(at(1_000));
        fields.location.commit(
            Location {
                lat: RawDegreeValue::new(37, 520_825_000, false),
                lng: RawDegreeValue::new(122, 309_162_000, true),
            },
            at(600),
        );
        // Would also fail the DOP gate if it got that far.
        fields.hdop.commit(0, at(1_000));
        let mut gps = GpsFix::new(fields, NoPrecision, FixConfig::default());
        assert_eq!(gps.try_location(at(1_000)), Err(FixRejected::StaleData));
        assert!(gps.fields_mut().location().is_updated());
    }

    #[test]
    fn test_stale_fix_type_rejected() {
        let t = at(5_000);
        let fields = with_gsa(fresh_fields(t), "3", "1.83", at(4_000));
        let mut gps = GpsFix::new(fields, GsaPrecision::default(), FixConfig::default());
        assert_eq!(gps.try_location(t), Err(FixRejected::StaleData));
    }

    #[test]
    fn test_missing_gsa_blocks_fix() {
        let t = at(5_000);
        let mut fields = fresh_fields(t);
        fields.gsa = true;
        let mut gps = GpsFix::new(fields, GsaPrecision::default(), FixConfig::default());
        // No GSA yet: type 0 keeps lock, but the type has never been seen.
        assert_eq!(gps.try_location(t), Err(FixRejected::StaleData));
        assert!(gps.has_lock());
    }

    #[test]
    fn test_never_parsed_date_is_stale() {
        let t = at(0);
        let mut fields = fresh_fields(t);
        fields.date = Datum::default();
        let mut gps = GpsFix::new(fields, NoPrecision, FixConfig::default());
        assert_eq!(gps.try_location(t), Err(FixRejected::StaleData));
    }

    #[test]
    fn test_dop_age_is_not_checked() {
        let mut fields = fresh_fields(at(10_000));
        fields.hdop.commit(150, at(0));
        let mut gps = GpsFix::new(fields, NoPrecision, FixConfig::default());
        assert!(gps.look_for_location(at(10_000)));
    }

    #[test]
    fn test_same_location_not_reprocessed() {
        let t = at(0);
        let mut gps = GpsFix::new(fresh_fields(t), NoPrecision, FixConfig::default());
        assert_eq!(gps.try_location(t), Ok(()));
        assert_eq!(gps.try_location(at(100)), Err(FixRejected::NoNewData));
    }

    #[test]
    fn test_zero_latitude_keeps_previous_fix() {
        let t = at(0);
        let mut gps = GpsFix::new(fresh_fields(t), NoPrecision, FixConfig::default());
        assert!(gps.look_for_location(t));
        let before = *gps.state();

        let t2 = at(1_000);
        let fields = gps.fields_mut();
        fields.location.commit(
            Location {
                lat: RawDegreeValue::new(0, 0, false),
                lng: RawDegreeValue::new(122, 0, true),
            },
            t2,
        );
        fields.time.commit(TimeOfDay(12_352_000), t2);
        fields.date.commit(Date(90_324), t2);

        assert_eq!(gps.try_location(t2), Err(FixRejected::BogusZeroPosition));
        assert_eq!(*gps.state(), before);
    }

    #[test]
    fn test_zero_longitude_is_accepted() {
        let t = at(0);
        let mut fields = fresh_fields(t);
        fields.location.commit(
            Location {
                lat: RawDegreeValue::new(51, 477_500_000, false),
                lng: RawDegreeValue::new(0, 0, false),
            },
            t,
        );
        let mut gps = GpsFix::new(fields, NoPrecision, FixConfig::default());
        assert!(gps.look_for_location(t));
        assert_eq!(gps.state().longitude, 0);
    }

    #[test]
    fn test_zero_dop_rejected() {
        let t = at(0);
        let mut fields = fresh_fields(t);
        fields.hdop.commit(0, t);
        let mut gps = GpsFix::new(fields, NoPrecision, FixConfig::default());
        assert_eq!(
            gps.try_location(t),
            Err(FixRejected::IncompleteDilutionOfPrecision)
        );
        assert_eq!(*gps.state(), {
            let mut s = FixState::new();
            s.fix_quality = 1;
            s
        });
    }

    #[test]
    fn test_empty_pdop_rejected() {
        let t = at(0);
        let fields = with_gsa(fresh_fields(t), "3", "", t);
        let mut gps = GpsFix::new(fields, GsaPrecision::default(), FixConfig::default());
        assert_eq!(
            gps.try_location(t),
            Err(FixRejected::IncompleteDilutionOfPrecision)
        );
    }

    #[test]
    fn test_heading_bounds() {
        let t = at(0);
        let mut fields = fresh_fields(t);
        fields.course.commit(35_999, t);
        let mut gps = GpsFix::new(fields, NoPrecision, FixConfig::default());
        assert!(gps.look_for_location(t));
        assert_eq!(gps.state().heading, 35_999_000);

        let t2 = at(500);
        let fields = gps.fields_mut();
        fields.course.commit(36_000, t2);
        fields.location.commit(fields.location.peek(), t2);
        fields.time.commit(TimeOfDay(12_352_000), t2);
        fields.date.commit(Date(90_324), t2);
        assert!(gps.look_for_location(t2));
        assert_eq!(gps.state().heading, 35_999_000);
    }

    #[test]
    fn test_heading_needs_update() {
        let t = at(0);
        let mut fields = fresh_fields(t);
        fields.course.commit(9_000, t);
        fields.course.value();
        let mut gps = GpsFix::new(fields, NoPrecision, FixConfig::default());
        assert!(gps.look_for_location(t));
        assert_eq!(gps.state().heading, 0);
    }

    #[test]
    fn test_satellites_only_when_updated() {
        let t = at(0);
        let mut fields = fresh_fields(t);
        fields.satellites.commit(9, t);
        let mut gps = GpsFix::new(fields, NoPrecision, FixConfig::default());
        assert!(gps.look_for_location(t));
        assert_eq!(gps.state().satellites, 9);

        let t2 = at(200);
        let fields = gps.fields_mut();
        fields.location.commit(fields.location.peek(), t2);
        fields.time.commit(TimeOfDay(12_352_000), t2);
        fields.date.commit(Date(90_324), t2);
        fields.satellites.commit(400, t2);
        assert!(gps.look_for_location(t2));
        assert_eq!(gps.state().satellites, u8::MAX);
    }

    #[test]
    fn test_ellipsoid_altitude() {
        let t = at(0);
        let config = FixConfig {
            altitude: AltitudeMode::Ellipsoid,
            ..FixConfig::default()
        };
        let mut gps = GpsFix::new(fresh_fields(t), NoPrecision, config);
        assert!(gps.look_for_location(t));
        // 158.70 m + (-32 m)
        assert_eq!(gps.state().altitude, 126);
        assert_eq!(gps.state().geoidal_height, -32);
    }

    #[test]
    fn test_look_for_time() {
        let mut fields = fresh_fields(at(0));
        fields.date = Datum::default();
        let mut gps = GpsFix::new(fields, NoPrecision, FixConfig::default());
        let mut clock = RecordingClock::default();
        assert!(!gps.look_for_time(&mut clock));
        assert_eq!(clock.calls, 0);

        gps.fields_mut().date.commit(Date(90_324), at(0));
        // Old readings still set the clock.
        assert!(gps.look_for_time(&mut clock));
        let (quality, time) = clock.last.unwrap();
        assert_eq!(quality, ClockQuality::Gps);
        assert_eq!(
            time,
            CalendarTime {
                second: 19,
                minute: 35,
                hour: 12,
                day: 9,
                month: 2,
                year: 124,
            }
        );
    }

    #[test]
    fn test_look_for_time_forwards_impossible_date() {
        let mut fields = fresh_fields(at(0));
        fields.date.commit(Date(0), at(0));
        let mut gps = GpsFix::new(fields, NoPrecision, FixConfig::default());
        let mut clock = RecordingClock::default();
        assert!(gps.look_for_time(&mut clock));
        assert_eq!(clock.calls, 1);
        let (quality, time) = clock.last.unwrap();
        assert_eq!(quality, ClockQuality::Gps);
        assert_eq!(time.day, 0);
        assert!(time.unix_seconds().is_none());
    }

    #[test]
    fn test_publish() {
        let t = at(0);
        let mut gps = GpsFix::new(fresh_fields(t), NoPrecision, FixConfig::default());
        assert!(gps.look_for_location(t));
        let cell = DataCell::new(FixState::new());
        gps.publish(&cell, Instant::from_ticks(42));
        assert_eq!(cell.read(), *gps.state());
        assert_eq!(cell.last_updated(), 42);
    }

    fn with_checksum(body: &str) -> heapless::String<128> {
        let cs = body.bytes().fold(0u8, |acc, b| acc ^ b);
        let mut s = heapless::String::new();
        write!(s, "${}*{:02X}\r\n", body, cs).unwrap();
        s
    }

    #[test]
    fn test_sentences_to_fix() {
        let mut gps = GpsFix::new(NmeaReader::new(), GsaPrecision::default(), FixConfig::default());
        let t = at(20_000);
        for body in [
            "GNRMC,123519.00,A,3731.2495,N,12218.54972,W,0.02,45.10,090324,,,A",
            "GNGGA,123519.00,3731.2495,N,12218.54972,W,1,09,1.50,158.7,M,-32.2,M,,",
            "GNGSA,A,3,10,23,27,32,,,,,,,,,2.10,1.50,1.48,1",
        ] {
            for &b in with_checksum(body).as_bytes() {
                gps.fields_mut().encode(b, t);
            }
        }

        let mut clock = RecordingClock::default();
        assert!(gps.look_for_time(&mut clock));
        assert_eq!(gps.try_location(at(20_100)), Ok(()));
        let state = gps.state();
        assert_eq!(state.latitude, 375_208_250);
        assert_eq!(state.longitude, -1_223_091_620);
        assert_eq!(state.dop, 210);
        assert_eq!(state.fix_type, 3);
        assert_eq!(state.satellites, 9);
        assert_eq!(state.heading, 4_510_000);
        assert_eq!(state.altitude, 158);
        assert_eq!(state.timestamp, 1_709_987_719);

        assert_eq!(gps.try_location(at(20_200)), Err(FixRejected::NoNewData));
        assert_eq!(gps.try_location(at(20_400)), Err(FixRejected::StaleData));
    }

    fn feed(gps: &mut GpsFix<NmeaReader, NoPrecision>, body: &str, now: Instant) {
        for &b in with_checksum(body).as_bytes() {
            gps.fields_mut().encode(b, now);
        }
    }

    #[test]
    fn test_empty_hdop_rejects_next_fix() {
        let mut gps = GpsFix::new(NmeaReader::new(), NoPrecision, FixConfig::default());
        let t = at(30_000);
        feed(&mut gps, "GNRMC,123519.00,A,3731.2495,N,12218.54972,W,0.02,45.10,090324,,,A", t);
        feed(&mut gps, "GNGGA,123519.00,3731.2495,N,12218.54972,W,1,09,1.50,158.7,M,-32.2,M,,", t);
        assert_eq!(gps.try_location(t), Ok(()));
        assert_eq!(gps.state().dop, 212);

        let t = at(31_000);
        feed(&mut gps, "GNRMC,123520.00,A,3731.3000,N,12218.54972,W,0.02,45.10,090324,,,A", t);
        feed(&mut gps, "GNGGA,123520.00,3731.3000,N,12218.54972,W,1,09,,158.7,M,-32.2,M,,", t);
        assert_eq!(
            gps.try_location(t),
            Err(FixRejected::IncompleteDilutionOfPrecision)
        );
        assert_eq!(gps.state().latitude, 375_208_250);
        assert_eq!(gps.state().dop, 212);
    }
}
