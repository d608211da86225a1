use rand::Rng;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use windrose::{DialStyle, DisplayConfig, TelemetryCommand, WindInstrument};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Wide laylines and a slow sweep make the seam handling easy to watch
    let config = DisplayConfig::builder()
        .layline_offset_deg(45.0)
        .animation_duration_ms(900)
        .build();
    let style = DialStyle::builder().ticks_count(72).sector_alpha(0.35).build();

    let mut instrument = WindInstrument::new(config)?.with_style(style);

    let (sender, receiver) = mpsc::channel();

    // Spin the heading through north in both directions
    thread::spawn(move || {
        let mut rng = rand::rng();
        let headings = [350.0, 10.0, 340.0, 20.0, 190.0, 359.0, 1.0];
        for heading in headings.iter().cycle() {
            let commands = [
                TelemetryCommand::SetHeading(*heading),
                TelemetryCommand::SetTrueWind(rng.random_range(0.0..360.0), rng.random_range(4.0..20.0)),
                TelemetryCommand::SetApparentWind(rng.random_range(0.0..360.0), rng.random_range(4.0..25.0)),
                TelemetryCommand::SetHistoricWind(
                    rng.random_range(300.0..330.0),
                    rng.random_range(340.0..350.0),
                    rng.random_range(0.0..30.0),
                ),
            ];

            if commands.iter().any(|cmd| sender.send(cmd.clone()).is_err()) {
                break;
            }

            thread::sleep(Duration::from_millis(1500));
        }
    });

    println!("Displaying wind instrument with a heading sweeping across north.");
    println!("Press Ctrl+C to exit");

    instrument.show_with_commands(receiver)
}
