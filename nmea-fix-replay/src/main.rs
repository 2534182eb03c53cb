use clap::Parser;
use log::{info, warn};
use nmea_fix_core::{
    AltitudeMode, CalendarTime, ClockQuality, ClockSync, DataCell, FixConfig, FixState, GpsFix,
    GsaPrecision, NmeaReader, NoPrecision, PrecisionSource, Transport,
};
use embassy_time::Instant;
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;

/// Replays a recorded NMEA log through the fix pipeline.
#[derive(Debug, Clone, Parser)]
struct Opts {
    /// File holding raw receiver output.
    pub input: PathBuf,
    /// Report height above the ellipsoid instead of mean sea level.
    #[clap(long)]
    pub hae: bool,
    /// Ignore GSA sentences; lock and DOP come from GGA alone.
    #[clap(long)]
    pub no_gsa: bool,
    #[clap(long, default_value = "GNGSA")]
    pub gsa_sentence: String,
    #[clap(long, default_value = "9600")]
    pub baud: u32,
    /// Idle tick in milliseconds.
    #[clap(long, default_value = "100")]
    pub tick_ms: u64,
    /// Sleep between ticks as the firmware would.
    #[clap(long)]
    pub realtime: bool,
}

/// Hands out the recording at serial line speed, one tick's worth at a time.
struct SerialReplay {
    data: Vec<u8>,
    pos: usize,
    budget: usize,
}

impl SerialReplay {
    fn refill(&mut self, bytes: usize) {
        self.budget = bytes;
    }

    fn finished(&self) -> bool {
        self.pos >= self.data.len()
    }
}

impl Transport for SerialReplay {
    fn available(&mut self) -> usize {
        self.budget.min(self.data.len() - self.pos)
    }

    fn read(&mut self) -> Option<u8> {
        if self.available() == 0 {
            return None;
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        self.budget -= 1;
        Some(byte)
    }
}

#[derive(Default)]
struct PrintClock {
    last: Option<CalendarTime>,
}

impl ClockSync for PrintClock {
    fn set_clock(&mut self, quality: ClockQuality, time: &CalendarTime) {
        if time.unix_seconds().is_none() {
            warn!("ignoring impossible date from {:?}", quality);
            return;
        }
        if self.last.as_ref() != Some(time) {
            info!(
                "clock {:?}: {}-{:02}-{:02} {:02}:{:02}:{:02}",
                quality,
                1900 + u32::from(time.year),
                time.month + 1,
                time.day,
                time.hour,
                time.minute,
                time.second
            );
            self.last = Some(*time);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let opts = Opts::parse();

    let config = FixConfig {
        altitude: if opts.hae {
            AltitudeMode::Ellipsoid
        } else {
            AltitudeMode::MeanSeaLevel
        },
        ..FixConfig::default()
    };

    if opts.no_gsa {
        run(&opts, NoPrecision, config)
    } else {
        let sentence: &'static str = Box::leak(opts.gsa_sentence.clone().into_boxed_str());
        run(&opts, GsaPrecision::new(sentence), config)
    }
}

fn run<S: PrecisionSource>(
    opts: &Opts,
    precision: S,
    config: FixConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(&opts.input)?;
    println!("Replaying {} bytes from {}", data.len(), opts.input.display());

    // 10 bits per byte on the wire.
    let bytes_per_tick = ((opts.baud as u64 / 10) * opts.tick_ms / 1000).max(1) as usize;
    let mut serial = SerialReplay {
        data,
        pos: 0,
        budget: 0,
    };
    let mut gps = GpsFix::new(NmeaReader::new(), precision, config);
    let mut clock = PrintClock::default();
    let published = DataCell::new(FixState::new());

    let mut tick: u64 = 0;
    let mut fixes = 0u32;
    while !serial.finished() {
        let now = Instant::from_millis(tick * opts.tick_ms);
        serial.refill(bytes_per_tick);

        if gps.while_idle(&mut serial, now) {
            gps.look_for_time(&mut clock);
        }
        match gps.try_location(now) {
            Ok(()) => {
                fixes += 1;
                gps.publish(&published, now);
                let fix = published.read();
                println!(
                    "fix #{fixes}: lat={:.7} lon={:.7} alt={}m dop={:.2} heading={:.2} sats={} t={}",
                    fix.latitude as f64 * 1e-7,
                    fix.longitude as f64 * 1e-7,
                    fix.altitude,
                    fix.dop as f64 * 1e-2,
                    fix.heading as f64 * 1e-5,
                    fix.satellites,
                    fix.timestamp
                );
            }
            Err(reason) => log::debug!("no fix: {:?}", reason),
        }

        tick += 1;
        if opts.realtime {
            sleep(Duration::from_millis(opts.tick_ms));
        }
    }

    let health = gps.fields().health();
    if health.checksum_errors > 0 || health.parse_errors > 0 {
        warn!(
            "{} checksum errors, {} parse errors",
            health.checksum_errors, health.parse_errors
        );
    }
    println!(
        "Done: {} sentences, {} fixes, last state {:?}",
        health.sentences, fixes, published.read()
    );
    Ok(())
}
