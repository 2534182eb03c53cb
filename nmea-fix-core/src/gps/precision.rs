// gps/precision.rs
use crate::gps::parser::{atoi, parse_decimal};
use crate::gps::provider::FieldProvider;
use embassy_time::{Duration, Instant};

/// Default sentence carrying the 2D/3D fix type and PDOP.
pub const GSA_SENTENCE: &str = "GNGSA";
pub const GSA_FIX_TYPE_FIELD: u8 = 2;
pub const GSA_PDOP_FIELD: u8 = 15;

/// Secondary source of fix type and positional DOP.
///
/// Chosen once when the fix tracker is built. [`NoPrecision`] stands in when
/// the receiver (or the parser) cannot supply the secondary sentence.
pub trait PrecisionSource {
    /// Registers whatever fields the source needs on the provider.
    fn attach<P: FieldProvider>(&mut self, fields: &mut P) -> bool;

    fn is_available(&self) -> bool;

    /// 2 for a 2D fix, 3 for 3D, 0 when nothing was received.
    fn fix_type<P: FieldProvider>(&self, fields: &mut P) -> u8;

    fn fix_type_age<P: FieldProvider>(&self, fields: &mut P, now: Instant) -> Duration;

    /// PDOP scaled by 100, `None` when the source has no PDOP to offer.
    fn pdop<P: FieldProvider>(&self, fields: &mut P) -> Option<u32>;
}

/// Reads fix type and PDOP from a GSA sentence.
#[derive(Clone, Copy, Debug)]
pub struct GsaPrecision {
    sentence: &'static str,
    attached: bool,
}

impl GsaPrecision {
    pub const fn new(sentence: &'static str) -> Self {
        Self {
            sentence,
            attached: false,
        }
    }

    pub fn sentence(&self) -> &'static str {
        self.sentence
    }
}

impl Default for GsaPrecision {
    fn default() -> Self {
        Self::new(GSA_SENTENCE)
    }
}

impl PrecisionSource for GsaPrecision {
    fn attach<P: FieldProvider>(&mut self, fields: &mut P) -> bool {
        self.attached = fields.watch(self.sentence, GSA_FIX_TYPE_FIELD)
            && fields.watch(self.sentence, GSA_PDOP_FIELD);
        self.attached
    }

    fn is_available(&self) -> bool {
        self.attached
    }

    fn fix_type<P: FieldProvider>(&self, fields: &mut P) -> u8 {
        fields
            .custom(self.sentence, GSA_FIX_TYPE_FIELD)
            .map_or(0, |d| atoi(d.value().as_str()).clamp(0, u8::MAX as i32) as u8)
    }

    fn fix_type_age<P: FieldProvider>(&self, fields: &mut P, now: Instant) -> Duration {
        fields
            .custom(self.sentence, GSA_FIX_TYPE_FIELD)
            .map_or(Duration::MAX, |d| d.age(now))
    }

    fn pdop<P: FieldProvider>(&self, fields: &mut P) -> Option<u32> {
        fields
            .custom(self.sentence, GSA_PDOP_FIELD)
            .map(|d| parse_decimal(d.value().as_str()).max(0) as u32)
    }
}

/// The secondary sentence is not available; lock and DOP rely on the
/// position sentence alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPrecision;

impl PrecisionSource for NoPrecision {
    fn attach<P: FieldProvider>(&mut self, _fields: &mut P) -> bool {
        false
    }

    fn is_available(&self) -> bool {
        false
    }

    fn fix_type<P: FieldProvider>(&self, _fields: &mut P) -> u8 {
        0
    }

    fn fix_type_age<P: FieldProvider>(&self, _fields: &mut P, _now: Instant) -> Duration {
        Duration::from_ticks(0)
    }

    fn pdop<P: FieldProvider>(&self, _fields: &mut P) -> Option<u32> {
        None
    }
}
