// ============================================================================
// DISPLAY SESSION
// ============================================================================

use std::sync::mpsc::Receiver;
use std::time::Instant;

use log::{info, warn};
use pixels::{Pixels, SurfaceTexture};
use rusttype::Font;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::angle::{add_heading, wrap360};
use crate::config::{DialStyle, DisplayConfig, WindowConfig};
use crate::error::DisplayError;
use crate::geometry::{compute_laylines, HistoricWind, LaylinePair, WindSector, WindSectorTracker};
use crate::render::{render_dial, Animator, Canvas, DialView};
use crate::rotation::{RotationChannel, RotationController, RotationStep};

/// One snapshot of telemetry readings. `None` means "no data", not zero.
///
/// Wind angles are relative to the bow. Heading, course over ground, waypoint
/// and historic wind are true bearings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySample {
    pub heading: Option<f64>,
    pub true_wind_angle: Option<f64>,
    pub true_wind_speed: Option<f64>,
    pub apparent_wind_angle: Option<f64>,
    pub apparent_wind_speed: Option<f64>,
    pub course_over_ground: Option<f64>,
    pub cog_enabled: bool,
    pub waypoint_bearing: Option<f64>,
    pub waypoint_enabled: bool,
    pub historic_wind_min: Option<f64>,
    pub historic_wind_mid: Option<f64>,
    pub historic_wind_max: Option<f64>,
}

impl TelemetrySample {
    fn validate(&self) -> Result<(), DisplayError> {
        let bearings = [
            (RotationChannel::Heading, self.heading),
            (RotationChannel::TrueWindAngle, self.true_wind_angle),
            (RotationChannel::AppWindAngle, self.apparent_wind_angle),
            (RotationChannel::CourseOverGround, self.course_over_ground),
            (RotationChannel::Waypoint, self.waypoint_bearing),
        ];
        for (channel, value) in bearings {
            if let Some(value) = value.filter(|v| !v.is_finite()) {
                return Err(DisplayError::InvalidBearing { channel, value });
            }
        }
        Ok(())
    }

    fn historic_wind(&self) -> HistoricWind {
        HistoricWind::new(
            self.historic_wind_min.unwrap_or(f64::NAN),
            self.historic_wind_mid.unwrap_or(f64::NAN),
            self.historic_wind_max.unwrap_or(f64::NAN),
        )
    }
}

/// Command enum for single-reading updates
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryCommand {
    SetHeading(f64),
    SetTrueWind(f64, f64),     // angle, speed
    SetApparentWind(f64, f64), // angle, speed
    SetCourseOverGround(f64),
    EnableCourseOverGround(bool),
    SetWaypoint(f64),
    EnableWaypoint(bool),
    SetHistoricWind(f64, f64, f64), // min, mid, max
    SetSample(TelemetrySample),
}

/// Everything the renderer needs after one update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Rotation steps in emission order.
    pub steps: Vec<RotationStep>,
    pub laylines: Option<LaylinePair>,
    pub laylines_visible: bool,
    pub sector: Option<WindSector>,
    pub sector_visible: bool,
    pub cog_visible: bool,
    pub waypoint_visible: bool,
    pub true_wind_angle: Option<f64>,
    pub true_wind_speed: Option<f64>,
    pub apparent_wind_angle: Option<f64>,
    pub apparent_wind_speed: Option<f64>,
}

/// A wind instrument display session.
pub struct WindInstrument {
    config: DisplayConfig,
    controller: RotationController,
    telemetry: TelemetrySample,
    laylines: Option<LaylinePair>,
    sectors: WindSectorTracker,
    style: DialStyle,
    window: WindowConfig,
    font: Option<Font<'static>>,
}

impl WindInstrument {
    pub fn new(config: DisplayConfig) -> Result<Self, DisplayError> {
        config.validate()?;
        Ok(Self {
            controller: RotationController::new(config.animation_duration_ms),
            config,
            telemetry: TelemetrySample::default(),
            laylines: None,
            sectors: WindSectorTracker::new(),
            style: DialStyle::default(),
            window: WindowConfig::default(),
            font: None,
        })
    }

    pub fn with_style(mut self, style: DialStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    /// Font used for compass letters and wind speed labels.
    pub fn with_font_data(mut self, data: Vec<u8>) -> Result<Self, DisplayError> {
        let font = Font::try_from_vec(data)
            .ok_or_else(|| DisplayError::configuration("font data could not be parsed"))?;
        self.font = Some(font);
        Ok(self)
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn controller(&self) -> &RotationController {
        &self.controller
    }

    pub fn telemetry(&self) -> &TelemetrySample {
        &self.telemetry
    }

    /// Process one telemetry snapshot.
    ///
    /// An invalid bearing rejects the whole sample and leaves every channel
    /// untouched.
    pub fn update(&mut self, sample: TelemetrySample) -> Result<Frame, DisplayError> {
        sample.validate()?;

        let mut steps = Vec::new();
        for (channel, target) in channel_targets(&sample) {
            steps.extend(self.controller.request_transition(channel, target)?);
        }

        let DisplayConfig {
            layline_offset_deg,
            center,
            radius,
            ..
        } = self.config;

        self.laylines = sample
            .true_wind_angle
            .map(|twa| compute_laylines(twa, layline_offset_deg, center, radius));
        self.sectors.update(
            sample.historic_wind(),
            sample.heading.unwrap_or(0.0),
            layline_offset_deg,
            center,
            radius,
        );
        self.telemetry = sample;

        Ok(self.frame(steps))
    }

    pub fn apply(&mut self, command: TelemetryCommand) -> Result<Frame, DisplayError> {
        let mut sample = self.telemetry.clone();
        match command {
            TelemetryCommand::SetHeading(heading) => sample.heading = Some(heading),
            TelemetryCommand::SetTrueWind(angle, speed) => {
                sample.true_wind_angle = Some(angle);
                sample.true_wind_speed = Some(speed);
            }
            TelemetryCommand::SetApparentWind(angle, speed) => {
                sample.apparent_wind_angle = Some(angle);
                sample.apparent_wind_speed = Some(speed);
            }
            TelemetryCommand::SetCourseOverGround(cog) => sample.course_over_ground = Some(cog),
            TelemetryCommand::EnableCourseOverGround(enabled) => sample.cog_enabled = enabled,
            TelemetryCommand::SetWaypoint(bearing) => sample.waypoint_bearing = Some(bearing),
            TelemetryCommand::EnableWaypoint(enabled) => sample.waypoint_enabled = enabled,
            TelemetryCommand::SetHistoricWind(min, mid, max) => {
                sample.historic_wind_min = Some(min);
                sample.historic_wind_mid = Some(mid);
                sample.historic_wind_max = Some(max);
            }
            TelemetryCommand::SetSample(next) => sample = next,
        }
        self.update(sample)
    }

    /// The renderer finished animating `channel`.
    pub fn complete(&mut self, channel: RotationChannel) {
        self.controller.complete(channel);
    }

    fn frame(&self, steps: Vec<RotationStep>) -> Frame {
        let t = &self.telemetry;
        let sector = self.sectors.current().cloned();
        Frame {
            steps,
            laylines: self.laylines,
            laylines_visible: self.config.show_laylines && self.laylines.is_some(),
            sector_visible: self.config.show_sectors && sector.is_some(),
            sector,
            cog_visible: t.cog_enabled && t.course_over_ground.is_some(),
            waypoint_visible: t.waypoint_enabled && t.waypoint_bearing.is_some(),
            true_wind_angle: t.true_wind_angle,
            true_wind_speed: t.true_wind_speed.filter(|v| v.is_finite()),
            apparent_wind_angle: t.apparent_wind_angle,
            apparent_wind_speed: t.apparent_wind_speed.filter(|v| v.is_finite()),
        }
    }
}

/// Dial targets for a validated sample.
///
/// The compass card turns against the heading so the bow stays up. Course
/// over ground and waypoint are rebased to the bow; wind angles already are.
fn channel_targets(sample: &TelemetrySample) -> Vec<(RotationChannel, f64)> {
    let heading = sample.heading.unwrap_or(0.0);
    let to_bow = |bearing: f64| add_heading(bearing, -heading);

    let mut targets = Vec::new();
    if let Some(heading) = sample.heading {
        targets.push((RotationChannel::Heading, wrap360(-heading)));
    }
    if let Some(awa) = sample.apparent_wind_angle {
        targets.push((RotationChannel::AppWindAngle, wrap360(awa)));
    }
    if let Some(twa) = sample.true_wind_angle {
        targets.push((RotationChannel::TrueWindAngle, wrap360(twa)));
    }
    if let Some(cog) = sample.course_over_ground.filter(|_| sample.cog_enabled) {
        targets.push((RotationChannel::CourseOverGround, to_bow(cog)));
    }
    if let Some(waypoint) = sample.waypoint_bearing.filter(|_| sample.waypoint_enabled) {
        targets.push((RotationChannel::Waypoint, to_bow(waypoint)));
    }
    targets
}

// ============================================================================
// WINDOW
// ============================================================================

impl WindInstrument {
    pub fn show(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.run_window(None)
    }

    pub fn show_with_commands(
        &mut self,
        receiver: Receiver<TelemetryCommand>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.run_window(Some(receiver))
    }

    fn run_window(
        &mut self,
        receiver: Option<Receiver<TelemetryCommand>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title("Wind")
            .with_inner_size(LogicalSize::new(
                self.window.width as f64,
                self.window.height as f64,
            ))
            .with_resizable(false)
            .build(&event_loop)?;
        let window = std::sync::Arc::new(window);

        let size = window.inner_size();
        let mut fb_width = size.width as usize;
        let mut fb_height = size.height as usize;
        let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
        let mut pixels = Pixels::new(size.width, size.height, surface_texture)?;
        info!("Wind display opened at {}x{}", fb_width, fb_height);

        let mut animator = Animator::new();
        let mut current = self.frame(Vec::new());

        let frame_duration = std::time::Duration::from_secs_f64(1.0 / self.window.max_framerate);
        let mut last_frame = Instant::now();
        let window_clone = window.clone();

        event_loop.run(move |event, window_target| {
            window_target.set_control_flow(ControlFlow::Poll);
            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => window_target.exit(),
                    WindowEvent::Resized(new_size) => {
                        fb_width = new_size.width as usize;
                        fb_height = new_size.height as usize;
                        let _ = pixels.resize_buffer(new_size.width, new_size.height);
                        let _ = pixels.resize_surface(new_size.width, new_size.height);
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        if let Some(ref receiver) = receiver {
                            while let Ok(command) = receiver.try_recv() {
                                match self.apply(command) {
                                    Ok(frame) => {
                                        animator.submit(&frame.steps, now);
                                        current = frame;
                                    }
                                    Err(err) => warn!("Dropped telemetry update: {}", err),
                                }
                            }
                        }
                        for channel in animator.advance(now) {
                            self.complete(channel);
                        }

                        let view = DialView {
                            center: self.config.center,
                            radius: self.config.radius,
                            frame: &current,
                        };
                        let mut canvas = Canvas::new(pixels.frame_mut(), fb_width, fb_height);
                        render_dial(&mut canvas, &view, &animator, &self.style, self.font.as_ref());
                        if let Err(err) = pixels.render() {
                            warn!("Render failed: {}", err);
                        }
                    }
                    _ => {}
                },
                Event::AboutToWait => {
                    if last_frame.elapsed() >= frame_duration {
                        window_clone.request_redraw();
                        last_frame = Instant::now();
                    }
                }
                _ => {}
            }
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::Point;

    fn instrument() -> WindInstrument {
        let config = DisplayConfig::builder()
            .center(Point::new(0.0, 0.0))
            .radius(100.0)
            .layline_offset_deg(45.0)
            .build();
        WindInstrument::new(config).unwrap()
    }

    #[test]
    fn test_rejects_invalid_configuration() {
        let config = DisplayConfig::builder().radius(0.0).build();
        assert!(matches!(
            WindInstrument::new(config),
            Err(DisplayError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_heading_turns_compass_card_against_heading() {
        let mut instrument = instrument();
        let frame = instrument.apply(TelemetryCommand::SetHeading(90.0)).unwrap();

        assert_eq!(frame.steps.len(), 1);
        assert_eq!(frame.steps[0].primary.channel, RotationChannel::Heading);
        assert_eq!(frame.steps[0].primary.to, 270.0);
    }

    #[test]
    fn test_true_wind_drives_counter_and_laylines() {
        let mut instrument = instrument();
        let frame = instrument
            .apply(TelemetryCommand::SetTrueWind(30.0, 12.5))
            .unwrap();

        let counter = frame.steps[0].counter.unwrap();
        assert_eq!(counter.channel, RotationChannel::TrueWindValue);
        assert_eq!(counter.to, -30.0);

        let laylines = frame.laylines.unwrap();
        assert!(frame.laylines_visible);
        assert_eq!(laylines.port.bearing, 345.0);
        assert_eq!(laylines.starboard.bearing, 75.0);
        assert_eq!(frame.true_wind_speed, Some(12.5));
    }

    #[test]
    fn test_missing_true_wind_hides_laylines() {
        let mut instrument = instrument();
        instrument
            .apply(TelemetryCommand::SetTrueWind(30.0, 12.5))
            .unwrap();
        let frame = instrument.update(TelemetrySample::default()).unwrap();
        assert!(frame.laylines.is_none());
        assert!(!frame.laylines_visible);
    }

    #[test]
    fn test_invalid_sample_is_rejected_without_mutation() {
        let mut instrument = instrument();
        instrument.apply(TelemetryCommand::SetHeading(10.0)).unwrap();
        let before = instrument.telemetry().clone();

        let err = instrument
            .apply(TelemetryCommand::SetApparentWind(f64::NAN, 5.0))
            .unwrap_err();
        assert!(matches!(
            err,
            DisplayError::InvalidBearing {
                channel: RotationChannel::AppWindAngle,
                ..
            }
        ));
        assert_eq!(instrument.telemetry(), &before);
        assert!(instrument
            .controller()
            .state(RotationChannel::AppWindAngle)
            .is_none());
    }

    #[test]
    fn test_cog_requires_enable_flag() {
        let mut instrument = instrument();
        let frame = instrument
            .apply(TelemetryCommand::SetCourseOverGround(100.0))
            .unwrap();
        assert!(frame.steps.is_empty());
        assert!(!frame.cog_visible);

        let frame = instrument
            .apply(TelemetryCommand::EnableCourseOverGround(true))
            .unwrap();
        assert!(frame.cog_visible);
        assert_eq!(frame.steps[0].primary.to, 100.0);
    }

    #[test]
    fn test_waypoint_rebased_to_bow() {
        let mut instrument = instrument();
        instrument.apply(TelemetryCommand::SetHeading(20.0)).unwrap();
        instrument.apply(TelemetryCommand::EnableWaypoint(true)).unwrap();
        let frame = instrument.apply(TelemetryCommand::SetWaypoint(10.0)).unwrap();

        assert!(frame.waypoint_visible);
        let step = frame
            .steps
            .iter()
            .find(|s| s.primary.channel == RotationChannel::Waypoint)
            .unwrap();
        assert_eq!(step.primary.to, 350.0);
    }

    #[test]
    fn test_historic_wind_sector_retained_on_missing_data() {
        let mut instrument = instrument();
        let frame = instrument
            .apply(TelemetryCommand::SetHistoricWind(300.0, 340.0, 20.0))
            .unwrap();
        assert!(frame.sector_visible);
        let sector = frame.sector.unwrap();

        let frame = instrument
            .apply(TelemetryCommand::SetHistoricWind(f64::NAN, 340.0, 20.0))
            .unwrap();
        assert_eq!(frame.sector, Some(sector));
        assert!(frame.sector_visible);
    }

    #[test]
    fn test_hidden_sectors_by_config() {
        let config = DisplayConfig::builder().show_sectors(false).build();
        let mut instrument = WindInstrument::new(config).unwrap();
        let frame = instrument
            .apply(TelemetryCommand::SetHistoricWind(300.0, 340.0, 20.0))
            .unwrap();
        assert!(frame.sector.is_some());
        assert!(!frame.sector_visible);
    }

    #[test]
    fn test_bad_font_data_is_configuration_error() {
        let result = instrument().with_font_data(vec![0, 1, 2, 3]);
        assert!(matches!(result, Err(DisplayError::ConfigurationError(_))));
    }
}
