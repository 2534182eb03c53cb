// gps/provider.rs
use crate::gps::types::{Date, Datum, Location, TimeOfDay};
use embassy_time::Instant;

/// Raw text of a watched sentence field.
pub type CustomValue = heapless::String<16>;

/// A byte-fed sentence parser exposing the fields a fix is built from.
///
/// Units follow the NMEA text: `hdop`, `course`, `altitude` and
/// `geoid_height` are decimals scaled by 100 (hundredths, centimeters).
pub trait FieldProvider {
    /// Feeds one byte. Returns true when the byte completed a valid sentence
    /// that updated a field this trait exposes.
    fn encode(&mut self, byte: u8, now: Instant) -> bool;

    fn location(&mut self) -> &mut Datum<Location>;
    fn time(&mut self) -> &mut Datum<TimeOfDay>;
    fn date(&mut self) -> &mut Datum<Date>;
    fn hdop(&mut self) -> &mut Datum<u32>;
    fn satellites(&mut self) -> &mut Datum<u32>;
    fn course(&mut self) -> &mut Datum<i32>;
    fn altitude(&mut self) -> &mut Datum<i32>;
    fn geoid_height(&mut self) -> &mut Datum<i32>;

    /// Fix quality indicator from the position sentence, 0 when there is no fix.
    fn fix_quality(&self) -> u8;

    /// Starts tracking field `index` of `sentence` (e.g. `"GNGSA"`, 2).
    /// Returns false when the provider cannot track custom fields.
    fn watch(&mut self, _sentence: &'static str, _index: u8) -> bool {
        false
    }

    fn custom(&mut self, _sentence: &str, _index: u8) -> Option<&mut Datum<CustomValue>> {
        None
    }
}
