// ============================================================================
// PIXEL RENDERER ADAPTER
// ============================================================================
//
// Consumes rotation steps and geometry paths from the instrument core and
// draws them into an RGBA frame. All time-based interpolation lives here.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use rusttype::{point, Font, PositionedGlyph, Scale};

use crate::angle::{wrap360, Point};
use crate::config::{Color, DialStyle};
use crate::display::Frame;
use crate::geometry::{LaylinePair, SectorPath};
use crate::rotation::{RotationChannel, RotationCommand, RotationStep};

// ============================================================================
// ANIMATION
// ============================================================================

#[derive(Debug, Clone)]
struct Track {
    value: f64,
    running: Option<(RotationCommand, Instant)>,
    queued: VecDeque<RotationCommand>,
}

impl Track {
    fn new(value: f64) -> Self {
        Self {
            value,
            running: None,
            queued: VecDeque::new(),
        }
    }
}

/// Plays rotation commands per channel against a clock.
#[derive(Debug, Clone, Default)]
pub struct Animator {
    tracks: HashMap<RotationChannel, Track>,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue steps emitted by one update. A channel receiving new commands
    /// drops whatever it was still playing.
    pub fn submit(&mut self, steps: &[RotationStep], now: Instant) {
        let mut superseded: Vec<RotationChannel> = Vec::new();
        for command in steps.iter().flat_map(|s| s.commands()) {
            let track = self
                .tracks
                .entry(command.channel)
                .or_insert_with(|| Track::new(command.from));
            if !superseded.contains(&command.channel) {
                superseded.push(command.channel);
                track.running = None;
                track.queued.clear();
            }
            track.queued.push_back(*command);
        }
        for channel in superseded {
            if let Some(track) = self.tracks.get_mut(&channel) {
                start_next(track, now);
            }
        }
    }

    /// Advance every track to `now`. Returns primary channels whose last
    /// queued command finished during this call.
    pub fn advance(&mut self, now: Instant) -> Vec<RotationChannel> {
        let mut finished = Vec::new();
        for (channel, track) in self.tracks.iter_mut() {
            let mut was_running = false;
            while let Some((command, started)) = track.running {
                was_running = true;
                let duration = Duration::from_millis(command.duration_ms);
                let elapsed = now.saturating_duration_since(started);
                if elapsed >= duration {
                    track.value = command.to;
                    track.running = None;
                    // chained legs start where the previous one ended in time
                    start_next(track, started + duration);
                } else {
                    let t = elapsed.as_secs_f64() / duration.as_secs_f64();
                    track.value = command.value_at(t);
                    break;
                }
            }
            if was_running && track.running.is_none() && channel.driver().is_none() {
                finished.push(*channel);
            }
        }
        finished
    }

    /// Current displayed angle of `channel`, if it ever received a command.
    pub fn value(&self, channel: RotationChannel) -> Option<f64> {
        self.tracks.get(&channel).map(|t| t.value)
    }

    pub fn is_idle(&self) -> bool {
        self.tracks
            .values()
            .all(|t| t.running.is_none() && t.queued.is_empty())
    }
}

fn start_next(track: &mut Track, at: Instant) {
    if let Some(next) = track.queued.pop_front() {
        track.value = next.from;
        track.running = Some((next, at));
    }
}

// ============================================================================
// RETAINED MODE ABSTRACTIONS
// ============================================================================

#[derive(Clone, Debug)]
enum DrawCommand {
    Clear((u8, u8, u8)),
    Ring {
        center: Point,
        r: f64,
        thickness: f64,
        color: (u8, u8, u8),
    },
    Tick {
        center: Point,
        r: f64,
        bearing: f64,
        length: i32,
        thickness: f32,
        color: (u8, u8, u8),
    },
    Wedge {
        center: Point,
        r: f64,
        start: f64,
        end: f64,
        clockwise: bool,
        alpha: f32,
        color: (u8, u8, u8),
    },
    Line {
        from: Point,
        to: Point,
        thickness: f32,
        tapered: bool,
        color: (u8, u8, u8),
    },
    Circle {
        center: Point,
        radius: i32,
        color: (u8, u8, u8),
    },
    Label {
        at: Point,
        text: String,
        font_size: f32,
        rotation_deg: f64,
        color: (u8, u8, u8),
    },
}

struct Scene {
    commands: Vec<DrawCommand>,
}

impl Scene {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    fn add_command(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    fn render(&self, canvas: &mut Canvas, font: Option<&Font<'static>>) {
        for command in &self.commands {
            match command {
                DrawCommand::Clear(color) => canvas.clear(*color),
                DrawCommand::Ring {
                    center,
                    r,
                    thickness,
                    color,
                } => draw_ring(canvas, *center, *r, *thickness, *color),
                DrawCommand::Tick {
                    center,
                    r,
                    bearing,
                    length,
                    thickness,
                    color,
                } => {
                    let outer = Point::on_circle(*center, r - 1.0, *bearing);
                    let inner = Point::on_circle(*center, r - *length as f64, *bearing);
                    draw_thick_line_aa(canvas, inner, outer, *thickness, *color);
                }
                DrawCommand::Wedge {
                    center,
                    r,
                    start,
                    end,
                    clockwise,
                    alpha,
                    color,
                } => fill_wedge(canvas, *center, *r, *start, *end, *clockwise, *alpha, *color),
                DrawCommand::Line {
                    from,
                    to,
                    thickness,
                    tapered,
                    color,
                } => {
                    if *tapered {
                        draw_thick_line_tapered_aa(canvas, *from, *to, *thickness, *color);
                    } else {
                        draw_thick_line_aa(canvas, *from, *to, *thickness, *color);
                    }
                }
                DrawCommand::Circle {
                    center,
                    radius,
                    color,
                } => draw_circle(canvas, *center, *radius, *color),
                DrawCommand::Label {
                    at,
                    text,
                    font_size,
                    rotation_deg,
                    color,
                } => {
                    // labels need a font; without one they are skipped
                    if let Some(font) = font {
                        draw_rotated_text(
                            canvas,
                            *at,
                            text,
                            font,
                            Scale::uniform(*font_size),
                            rotation_deg.to_radians(),
                            *color,
                        );
                    }
                }
            }
        }
    }
}

// ============================================================================
// CORE DATA TYPES
// ============================================================================

pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: usize,
    height: usize,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: usize, height: usize) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    fn clear(&mut self, color: (u8, u8, u8)) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[color.0, color.1, color.2, 0xff]);
        }
    }
}

/// Everything the renderer needs besides the animated angles.
pub struct DialView<'a> {
    pub center: Point,
    pub radius: f64,
    pub frame: &'a Frame,
}

// ============================================================================
// RENDERING
// ============================================================================

/// Draw the whole dial for the current animation state.
pub fn render_dial(
    canvas: &mut Canvas,
    view: &DialView,
    animator: &Animator,
    style: &DialStyle,
    font: Option<&Font<'static>>,
) {
    let mut scene = Scene::new();
    scene.add_command(DrawCommand::Clear(style.background.as_tuple()));

    let angle = |channel| animator.value(channel).unwrap_or(0.0);

    if view.frame.sector_visible {
        if let Some(sector) = &view.frame.sector {
            add_sector(&mut scene, view, &sector.port, style.port, style.sector_alpha);
            add_sector(&mut scene, view, &sector.starboard, style.starboard, style.sector_alpha);
        }
    }

    add_compass_card(&mut scene, view, angle(RotationChannel::Heading), style);

    if view.frame.laylines_visible {
        if let Some(laylines) = &view.frame.laylines {
            add_laylines(&mut scene, laylines, style);
        }
    }

    if view.frame.cog_visible {
        add_needle(
            &mut scene,
            view,
            angle(RotationChannel::CourseOverGround),
            0.75,
            style.course_over_ground,
            style,
        );
    }
    if view.frame.waypoint_visible {
        add_needle(
            &mut scene,
            view,
            angle(RotationChannel::Waypoint),
            0.95,
            style.waypoint,
            style,
        );
    }

    if view.frame.true_wind_angle.is_some() {
        add_wind_needle(
            &mut scene,
            view,
            angle(RotationChannel::TrueWindAngle),
            angle(RotationChannel::TrueWindValue),
            view.frame.true_wind_speed,
            style.true_wind,
            style,
        );
    }
    if view.frame.apparent_wind_angle.is_some() {
        add_wind_needle(
            &mut scene,
            view,
            angle(RotationChannel::AppWindAngle),
            angle(RotationChannel::AppWindValue),
            view.frame.apparent_wind_speed,
            style.apparent_wind,
            style,
        );
    }

    // lubber line: the bow always points up
    scene.add_command(DrawCommand::Line {
        from: Point::new(view.center.x, view.center.y - view.radius - 4.0),
        to: Point::new(view.center.x, view.center.y - view.radius + 20.0),
        thickness: style.needle_width,
        tapered: false,
        color: style.heading_marker.as_tuple(),
    });
    scene.add_command(DrawCommand::Circle {
        center: view.center,
        radius: style.dot_radius,
        color: style.dial.as_tuple(),
    });

    scene.render(canvas, font);
}

fn add_compass_card(scene: &mut Scene, view: &DialView, rotation: f64, style: &DialStyle) {
    let color = style.dial.as_tuple();
    scene.add_command(DrawCommand::Ring {
        center: view.center,
        r: view.radius,
        thickness: style.ring_thickness as f64,
        color,
    });

    let step = 360.0 / style.ticks_count.max(1) as f64;
    for i in 0..style.ticks_count {
        let bearing = wrap360(i as f64 * step + rotation);
        scene.add_command(DrawCommand::Tick {
            center: view.center,
            r: view.radius,
            bearing,
            length: style.major_tick_length,
            thickness: style.major_tick_thickness,
            color,
        });
        scene.add_command(DrawCommand::Tick {
            center: view.center,
            r: view.radius,
            bearing: wrap360(bearing + step / 2.0),
            length: style.minor_tick_length,
            thickness: style.minor_tick_thickness,
            color,
        });
    }

    let label_radius = view.radius - style.major_tick_length as f64 - style.label_font_size as f64;
    for (text, bearing) in [("N", 0.0), ("E", 90.0), ("S", 180.0), ("W", 270.0)] {
        let bearing = wrap360(bearing + rotation);
        scene.add_command(DrawCommand::Label {
            at: Point::on_circle(view.center, label_radius, bearing),
            text: text.to_string(),
            font_size: style.label_font_size,
            rotation_deg: bearing,
            color,
        });
    }
}

fn add_laylines(scene: &mut Scene, laylines: &LaylinePair, style: &DialStyle) {
    for (layline, color) in [
        (&laylines.port, style.port),
        (&laylines.starboard, style.starboard),
    ] {
        scene.add_command(DrawCommand::Line {
            from: layline.start,
            to: layline.end,
            thickness: style.layline_thickness,
            tapered: false,
            color: color.as_tuple(),
        });
    }
}

fn add_sector(scene: &mut Scene, view: &DialView, sector: &SectorPath, color: Color, alpha: f32) {
    scene.add_command(DrawCommand::Wedge {
        center: view.center,
        r: view.radius,
        start: sector.min_bearing,
        end: sector.max_bearing,
        clockwise: sector.sweep,
        alpha,
        color: color.as_tuple(),
    });
}

fn add_needle(
    scene: &mut Scene,
    view: &DialView,
    bearing: f64,
    length_factor: f64,
    color: Color,
    style: &DialStyle,
) {
    scene.add_command(DrawCommand::Line {
        from: view.center,
        to: Point::on_circle(view.center, view.radius * length_factor, bearing),
        thickness: style.needle_width,
        tapered: true,
        color: color.as_tuple(),
    });
}

fn add_wind_needle(
    scene: &mut Scene,
    view: &DialView,
    bearing: f64,
    counter: f64,
    speed: Option<f64>,
    color: Color,
    style: &DialStyle,
) {
    add_needle(scene, view, bearing, 0.85, color, style);
    let Some(speed) = speed else {
        return;
    };
    // the counter channel cancels the needle's rotation to keep the label upright
    scene.add_command(DrawCommand::Label {
        at: Point::on_circle(view.center, view.radius * 0.55, bearing),
        text: format!("{:.1}", speed),
        font_size: style.label_font_size,
        rotation_deg: bearing + counter,
        color: color.as_tuple(),
    });
}

// ============================================================================
// DRAWING PRIMITIVES
// ============================================================================

fn set_pixel(canvas: &mut Canvas, x: usize, y: usize, color: (u8, u8, u8), alpha: f32) {
    if x < canvas.width && y < canvas.height {
        let idx = (y * canvas.width + x) * 4;
        if idx + 4 > canvas.frame.len() {
            return;
        }
        let dst = &mut canvas.frame[idx..idx + 4];
        let a = alpha.clamp(0.0, 1.0);
        let blend = |src: u8, dst: u8| (src as f32 * a + dst as f32 * (1.0 - a)).round() as u8;
        let out = [
            blend(color.0, dst[0]),
            blend(color.1, dst[1]),
            blend(color.2, dst[2]),
            0xff,
        ];
        dst.copy_from_slice(&out);
    }
}

fn line_bounds(canvas: &Canvas, from: Point, to: Point, thickness: f32) -> (i32, i32, i32, i32) {
    let pad = thickness.ceil() as f64 + 1.0;
    let min_x = (from.x.min(to.x) - pad).floor().max(0.0) as i32;
    let max_x = (from.x.max(to.x) + pad).ceil().min(canvas.width as f64 - 1.0) as i32;
    let min_y = (from.y.min(to.y) - pad).floor().max(0.0) as i32;
    let max_y = (from.y.max(to.y) + pad).ceil().min(canvas.height as f64 - 1.0) as i32;
    (min_x, max_x, min_y, max_y)
}

fn draw_line_with(
    canvas: &mut Canvas,
    from: Point,
    to: Point,
    thickness: f32,
    color: (u8, u8, u8),
    width_at: impl Fn(f32) -> f32,
) {
    let (min_x, max_x, min_y, max_y) = line_bounds(canvas, from, to, thickness);
    let dx = (to.x - from.x) as f32;
    let dy = (to.y - from.y) as f32;
    let len_sq = (dx * dx + dy * dy).max(f32::EPSILON);
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let px = x as f32 - from.x as f32;
            let py = y as f32 - from.y as f32;
            let t = ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0);
            let lx = from.x as f32 + t * dx;
            let ly = from.y as f32 + t * dy;
            let dist = ((lx - x as f32).powi(2) + (ly - y as f32).powi(2)).sqrt();
            let aa = (1.0 - (dist - width_at(t) / 2.0).clamp(0.0, 1.0)).clamp(0.0, 1.0);
            if aa > 0.01 {
                set_pixel(canvas, x as usize, y as usize, color, aa);
            }
        }
    }
}

fn draw_thick_line_aa(canvas: &mut Canvas, from: Point, to: Point, thickness: f32, color: (u8, u8, u8)) {
    draw_line_with(canvas, from, to, thickness, color, |_| thickness);
}

fn draw_thick_line_tapered_aa(
    canvas: &mut Canvas,
    from: Point,
    to: Point,
    thickness: f32,
    color: (u8, u8, u8),
) {
    // 0.05 keeps the tip from vanishing
    draw_line_with(canvas, from, to, thickness, color, |t| thickness * (1.0 - t * 0.95));
}

fn draw_circle(canvas: &mut Canvas, center: Point, radius: i32, color: (u8, u8, u8)) {
    let (cx, cy) = (center.x.round() as i32, center.y.round() as i32);
    for y in -radius - 1..=radius + 1 {
        for x in -radius - 1..=radius + 1 {
            let dist = ((x * x + y * y) as f64).sqrt();
            let aa = 1.0 - (dist - radius as f64).clamp(0.0, 1.0);
            let (px, py) = (cx + x, cy + y);
            if aa > 0.0 && px >= 0 && py >= 0 {
                set_pixel(canvas, px as usize, py as usize, color, aa as f32);
            }
        }
    }
}

fn draw_ring(canvas: &mut Canvas, center: Point, r: f64, thickness: f64, color: (u8, u8, u8)) {
    let inner = r - thickness;
    for y in 0..canvas.height {
        for x in 0..canvas.width {
            let dist = (x as f64 - center.x).hypot(y as f64 - center.y);
            if dist < inner - 1.0 || dist > r + 1.0 {
                continue;
            }
            let aa = if dist > r {
                1.0 - (dist - r).min(1.0)
            } else if dist < inner {
                1.0 - (inner - dist).min(1.0)
            } else {
                1.0
            };
            if aa > 0.0 {
                set_pixel(canvas, x, y, color, aa as f32);
            }
        }
    }
}

/// Bearing of screen pixel `(x, y)` seen from `center`.
fn pixel_bearing(center: Point, x: f64, y: f64) -> f64 {
    wrap360((x - center.x).atan2(center.y - y).to_degrees())
}

#[allow(clippy::too_many_arguments)]
fn fill_wedge(
    canvas: &mut Canvas,
    center: Point,
    r: f64,
    start: f64,
    end: f64,
    clockwise: bool,
    alpha: f32,
    color: (u8, u8, u8),
) {
    let span = if clockwise {
        wrap360(end - start)
    } else {
        wrap360(start - end)
    };
    for y in 0..canvas.height {
        for x in 0..canvas.width {
            let dist = (x as f64 - center.x).hypot(y as f64 - center.y);
            if dist > r {
                continue;
            }
            let bearing = pixel_bearing(center, x as f64, y as f64);
            let offset = if clockwise {
                wrap360(bearing - start)
            } else {
                wrap360(start - bearing)
            };
            if offset <= span {
                set_pixel(canvas, x, y, color, alpha);
            }
        }
    }
}

fn draw_rotated_text(
    canvas: &mut Canvas,
    at: Point,
    text: &str,
    font: &Font<'static>,
    scale: Scale,
    rotation: f64,
    color: (u8, u8, u8),
) {
    let v_metrics = font.v_metrics(scale);
    let glyphs: Vec<PositionedGlyph> = font
        .layout(text, scale, point(0.0, v_metrics.ascent))
        .collect();

    let (min_x, max_x, min_y, max_y) = glyphs.iter().filter_map(|g| g.pixel_bounding_box()).fold(
        (i32::MAX, i32::MIN, i32::MAX, i32::MIN),
        |(min_x, max_x, min_y, max_y), bb| {
            (
                min_x.min(bb.min.x),
                max_x.max(bb.max.x),
                min_y.min(bb.min.y),
                max_y.max(bb.max.y),
            )
        },
    );
    if min_x >= max_x || min_y >= max_y {
        return;
    }
    let text_center_x = (min_x + max_x) as f64 / 2.0;
    let text_center_y = (min_y + max_y) as f64 / 2.0;
    let (sin_r, cos_r) = rotation.sin_cos();

    for glyph in &glyphs {
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, v| {
                if v > 0.001 {
                    let local_x = gx as f64 + bb.min.x as f64 - text_center_x;
                    let local_y = gy as f64 + bb.min.y as f64 - text_center_y;
                    let x = at.x + local_x * cos_r - local_y * sin_r;
                    let y = at.y + local_x * sin_r + local_y * cos_r;
                    draw_antialiased_pixel(canvas, x, y, color, v);
                }
            });
        }
    }
}

fn draw_antialiased_pixel(canvas: &mut Canvas, x: f64, y: f64, color: (u8, u8, u8), alpha: f32) {
    let x_floor = x.floor();
    let y_floor = y.floor();
    let x_frac = x - x_floor;
    let y_frac = y - y_floor;

    // bilinear spread over the four nearest pixels
    let samples = [
        (x_floor, y_floor, (1.0 - x_frac) * (1.0 - y_frac)),
        (x_floor + 1.0, y_floor, x_frac * (1.0 - y_frac)),
        (x_floor, y_floor + 1.0, (1.0 - x_frac) * y_frac),
        (x_floor + 1.0, y_floor + 1.0, x_frac * y_frac),
    ];
    for (px, py, weight) in samples {
        let final_alpha = alpha * weight as f32;
        if px >= 0.0 && py >= 0.0 && final_alpha > 0.001 {
            set_pixel(canvas, px as usize, py as usize, color, final_alpha);
        }
    }
}
