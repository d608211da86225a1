use bon::Builder;

use crate::angle::Point;
use crate::error::DisplayError;

/// Color representation for dial elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn as_tuple(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }
}

/// Host-supplied constants for the instrument core.
#[derive(Debug, Clone, Builder)]
pub struct DisplayConfig {
    /// Angle between the true wind and each close-hauled layline.
    #[builder(default = 40.0)]
    pub layline_offset_deg: f64,
    #[builder(default = Point::new(300.0, 300.0))]
    pub center: Point,
    #[builder(default = 220.0)]
    pub radius: f64,
    #[builder(default = 500)]
    pub animation_duration_ms: u64,
    #[builder(default = true)]
    pub show_laylines: bool,
    #[builder(default = true)]
    pub show_sectors: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DisplayConfig {
    /// Reject configurations that can never produce valid geometry.
    pub fn validate(&self) -> Result<(), DisplayError> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(DisplayError::configuration(format!(
                "radius must be positive, got {}",
                self.radius
            )));
        }
        if !self.center.is_finite() {
            return Err(DisplayError::configuration(format!(
                "center must be finite, got ({}, {})",
                self.center.x, self.center.y
            )));
        }
        if !self.layline_offset_deg.is_finite() {
            return Err(DisplayError::configuration(format!(
                "layline offset must be finite, got {}",
                self.layline_offset_deg
            )));
        }
        Ok(())
    }
}

/// Colors and stroke widths used by the pixel renderer.
#[derive(Debug, Clone, Builder)]
pub struct DialStyle {
    #[builder(default = Color::new(0xff, 0xff, 0xff))]
    pub background: Color,
    #[builder(default = Color::new(0x00, 0x00, 0x00))]
    pub dial: Color,
    #[builder(default = 4)]
    pub ring_thickness: i32,
    #[builder(default = 36)]
    pub ticks_count: usize,
    #[builder(default = 18)]
    pub major_tick_length: i32,
    #[builder(default = 2.0)]
    pub major_tick_thickness: f32,
    #[builder(default = 8)]
    pub minor_tick_length: i32,
    #[builder(default = 0.5)]
    pub minor_tick_thickness: f32,
    #[builder(default = Color::new(0x00, 0x00, 0x00))]
    pub heading_marker: Color,
    #[builder(default = Color::new(0x00, 0x7f, 0xff))]
    pub apparent_wind: Color,
    #[builder(default = Color::new(0x00, 0x40, 0x90))]
    pub true_wind: Color,
    #[builder(default = Color::new(0x20, 0xa0, 0x20))]
    pub course_over_ground: Color,
    #[builder(default = Color::new(0xa0, 0x20, 0xa0))]
    pub waypoint: Color,
    #[builder(default = Color::new(0xff, 0x00, 0x00))]
    pub port: Color,
    #[builder(default = Color::new(0x00, 0xa0, 0x00))]
    pub starboard: Color,
    #[builder(default = 0.25)]
    pub sector_alpha: f32,
    #[builder(default = 2.0)]
    pub layline_thickness: f32,
    #[builder(default = 4.0)]
    pub needle_width: f32,
    #[builder(default = 6)]
    pub dot_radius: i32,
    #[builder(default = 22.0)]
    pub label_font_size: f32,
}

impl Default for DialStyle {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Configuration for the demo window
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub width: usize,
    pub height: usize,
    pub max_framerate: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 600,
            height: 600,
            max_framerate: 60.0,
        }
    }
}
