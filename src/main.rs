use std::io::{self, BufRead};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

use clap::Parser;
use rand::Rng;
use windrose::{add_heading, wrap360, DisplayConfig, TelemetryCommand, WindInstrument};

#[derive(Parser, Debug)]
#[command(author = "Windrose", version, about = "Animated wind instrument", long_about = None)]
struct Args {
    /// Angle between true wind and each layline, in degrees.
    #[arg(long, default_value_t = 40.0)]
    layline_offset: f64,

    /// Dial radius in pixels.
    #[arg(long, default_value_t = 220.0)]
    radius: f64,

    /// Rotation animation duration in milliseconds.
    #[arg(long, default_value_t = 500)]
    duration: u64,

    /// Font file for compass letters and wind speed labels.
    #[arg(long)]
    font: Option<std::path::PathBuf>,

    /// Read telemetry lines from stdin instead of simulating.
    #[arg(long)]
    stdin: bool,

    /// Level of verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let mut log_config = simplelog::ConfigBuilder::new();
    log_config.set_target_level(log::LevelFilter::Off);
    log_config.set_location_level(log::LevelFilter::Off);

    simplelog::TermLogger::init(
        log_level,
        log_config.build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let config = DisplayConfig::builder()
        .layline_offset_deg(args.layline_offset)
        .radius(args.radius)
        .animation_duration_ms(args.duration)
        .build();
    log::trace!("{:#?}", config);

    let mut instrument = WindInstrument::new(config)?;
    if let Some(path) = &args.font {
        instrument = instrument.with_font_data(std::fs::read(path)?)?;
    }

    let (sender, receiver) = mpsc::channel();
    if args.stdin {
        thread::spawn(move || read_stdin(sender));
    } else {
        thread::spawn(move || simulate(sender));
    }

    instrument
        .show_with_commands(receiver)
        .map_err(|e| anyhow::anyhow!("display failed: {}", e))
}

/// Forward telemetry lines such as `heading 123` or `twa 40 12.5`.
fn read_stdin(sender: Sender<TelemetryCommand>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines().map_while(Result::ok) {
        match parse_line(&line) {
            Some(command) => {
                if sender.send(command).is_err() {
                    break;
                }
            }
            None => log::warn!("Ignoring telemetry line: {}", line.trim()),
        }
    }
}

fn parse_line(line: &str) -> Option<TelemetryCommand> {
    let mut parts = line.split_whitespace();
    let field = parts.next()?;
    let values = parts
        .map(|v| v.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;

    match (field, values.as_slice()) {
        ("heading", [v]) => Some(TelemetryCommand::SetHeading(*v)),
        ("twa", [angle, speed]) => Some(TelemetryCommand::SetTrueWind(*angle, *speed)),
        ("awa", [angle, speed]) => Some(TelemetryCommand::SetApparentWind(*angle, *speed)),
        ("cog", [v]) => Some(TelemetryCommand::SetCourseOverGround(*v)),
        ("wpt", [v]) => Some(TelemetryCommand::SetWaypoint(*v)),
        ("cog-on", []) => Some(TelemetryCommand::EnableCourseOverGround(true)),
        ("cog-off", []) => Some(TelemetryCommand::EnableCourseOverGround(false)),
        ("wpt-on", []) => Some(TelemetryCommand::EnableWaypoint(true)),
        ("wpt-off", []) => Some(TelemetryCommand::EnableWaypoint(false)),
        ("hist", [min, mid, max]) => Some(TelemetryCommand::SetHistoricWind(*min, *mid, *max)),
        _ => None,
    }
}

/// Boat beating upwind with a wandering breeze.
fn simulate(sender: Sender<TelemetryCommand>) {
    let mut rng = rand::rng();
    let mut heading: f64 = rng.random_range(0.0..360.0);
    let reference = add_heading(heading, 40.0);
    let mut wind_direction = reference;
    let mut wind_speed: f64 = 12.0;
    let (mut min_shift, mut max_shift) = (0.0f64, 0.0f64);

    let setup = [
        TelemetryCommand::EnableCourseOverGround(true),
        TelemetryCommand::EnableWaypoint(true),
        TelemetryCommand::SetWaypoint(rng.random_range(0.0..360.0)),
    ];
    if setup.into_iter().any(|cmd| sender.send(cmd).is_err()) {
        return;
    }

    loop {
        heading = wrap360(heading + rng.random_range(-4.0..4.0));
        wind_direction = wrap360(wind_direction + rng.random_range(-3.0..3.0));
        wind_speed = (wind_speed + rng.random_range(-0.5..0.5)).clamp(2.0, 30.0);

        // shift range is tracked relative to the first wind direction
        let shift = wrap360(wind_direction - reference + 180.0) - 180.0;
        min_shift = min_shift.min(shift);
        max_shift = max_shift.max(shift);
        let min = add_heading(reference, min_shift);
        let mid = add_heading(reference, (min_shift + max_shift) / 2.0);
        let max = add_heading(reference, max_shift);

        let twa = wrap360(wind_direction - heading);
        let commands = [
            TelemetryCommand::SetHeading(heading),
            TelemetryCommand::SetTrueWind(twa, wind_speed),
            TelemetryCommand::SetApparentWind(wrap360(twa * 0.8), wind_speed * 1.3),
            TelemetryCommand::SetCourseOverGround(add_heading(heading, rng.random_range(-5.0..5.0))),
            TelemetryCommand::SetHistoricWind(min, mid, max),
        ];
        if commands.into_iter().any(|cmd| sender.send(cmd).is_err()) {
            break;
        }

        thread::sleep(Duration::from_millis(700));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("heading 12.5"), Some(TelemetryCommand::SetHeading(12.5)));
        assert_eq!(
            parse_line("twa 40 10"),
            Some(TelemetryCommand::SetTrueWind(40.0, 10.0))
        );
        assert_eq!(
            parse_line("hist 300 340 20"),
            Some(TelemetryCommand::SetHistoricWind(300.0, 340.0, 20.0))
        );
        assert_eq!(
            parse_line("cog-on"),
            Some(TelemetryCommand::EnableCourseOverGround(true))
        );
        assert_eq!(parse_line("twa 40"), None);
        assert_eq!(parse_line("heading north"), None);
        assert_eq!(parse_line(""), None);
    }
}
