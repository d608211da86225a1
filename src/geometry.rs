//! Layline and wind-shift sector geometry.
//!
//! Everything here is a pure function of its inputs. Paths are plain point
//! lists with arc metadata so any renderer can draw them.

use std::f64::consts::FRAC_PI_2;

use log::debug;

use crate::angle::{add_heading, signed_angle_between, wrap360, Point};

/// One drawing instruction of a [`Path`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(Point),
    LineTo(Point),
    /// Circular arc from the current point to `to`.
    Arc {
        radius: f64,
        large_arc: bool,
        sweep: bool,
        to: Point,
    },
    Close,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    pub segments: Vec<PathSegment>,
}

impl Path {
    /// Every point the path visits, in drawing order.
    pub fn points(&self) -> Vec<Point> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                PathSegment::MoveTo(p) | PathSegment::LineTo(p) => Some(*p),
                PathSegment::Arc { to, .. } => Some(*to),
                PathSegment::Close => None,
            })
            .collect()
    }
}

/// A close-hauled line from the dial center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layline {
    pub bearing: f64,
    pub start: Point,
    pub end: Point,
}

impl Layline {
    pub fn path(&self) -> Path {
        Path {
            segments: vec![PathSegment::MoveTo(self.start), PathSegment::LineTo(self.end)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaylinePair {
    pub port: Layline,
    pub starboard: Layline,
}

/// Port and starboard laylines either side of the true wind angle.
pub fn compute_laylines(
    true_wind_angle: f64,
    layline_offset_deg: f64,
    center: Point,
    radius: f64,
) -> LaylinePair {
    let layline = |bearing: f64| Layline {
        bearing,
        start: center,
        end: Point::on_circle(center, radius, bearing),
    };

    LaylinePair {
        port: layline(add_heading(true_wind_angle, -layline_offset_deg)),
        starboard: layline(add_heading(true_wind_angle, layline_offset_deg)),
    }
}

/// Historic true wind directions, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoricWind {
    pub min: f64,
    pub mid: f64,
    pub max: f64,
}

impl HistoricWind {
    pub fn new(min: f64, mid: f64, max: f64) -> Self {
        Self { min, mid, max }
    }

    /// All three bearings are usable. `NaN` marks a missing sample.
    pub fn is_complete(&self) -> bool {
        self.min.is_finite() && self.mid.is_finite() && self.max.is_finite()
    }
}

/// One side's wedge of the wind-shift sector.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorPath {
    pub min_bearing: f64,
    pub mid_bearing: f64,
    pub max_bearing: f64,
    pub min_point: Point,
    pub mid_point: Point,
    pub max_point: Point,
    pub large_arc: bool,
    pub sweep: bool,
    pub path: Path,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindSector {
    pub port: SectorPath,
    pub starboard: SectorPath,
}

fn sector_side(
    wind: &HistoricWind,
    heading_deg: f64,
    side_offset: f64,
    center: Point,
    radius: f64,
) -> SectorPath {
    let rebase = |historic: f64| wrap360(add_heading(wrap360(historic - heading_deg), side_offset));
    let (min_bearing, mid_bearing, max_bearing) =
        (rebase(wind.min), rebase(wind.mid), rebase(wind.max));

    let min_point = Point::on_circle(center, radius, min_bearing);
    let mid_point = Point::on_circle(center, radius, mid_bearing);
    let max_point = Point::on_circle(center, radius, max_bearing);

    // A tight shift takes the large arc so the wedge bulges through mid.
    let large_arc = signed_angle_between(min_point, mid_point, max_point).abs() <= FRAC_PI_2;
    let sweep = signed_angle_between(max_point, min_point, mid_point) <= 0.0;

    let path = Path {
        segments: vec![
            PathSegment::MoveTo(center),
            PathSegment::LineTo(min_point),
            PathSegment::Arc {
                radius,
                large_arc,
                sweep,
                to: max_point,
            },
            PathSegment::Close,
        ],
    };

    SectorPath {
        min_bearing,
        mid_bearing,
        max_bearing,
        min_point,
        mid_point,
        max_point,
        large_arc,
        sweep,
        path,
    }
}

/// Port and starboard wind-shift wedges, rebased to the current heading.
///
/// Returns `None` when any historic bearing is `NaN` or infinite.
pub fn compute_sectors(
    wind: HistoricWind,
    heading_deg: f64,
    layline_offset_deg: f64,
    center: Point,
    radius: f64,
) -> Option<WindSector> {
    if !wind.is_complete() {
        return None;
    }

    Some(WindSector {
        port: sector_side(&wind, heading_deg, -layline_offset_deg, center, radius),
        starboard: sector_side(&wind, heading_deg, layline_offset_deg, center, radius),
    })
}

/// Keeps the last valid [`WindSector`] across updates with missing data.
#[derive(Debug, Clone, Default)]
pub struct WindSectorTracker {
    current: Option<WindSector>,
}

impl WindSectorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the sector, or keep the previous one if `wind` is incomplete.
    pub fn update(
        &mut self,
        wind: HistoricWind,
        heading_deg: f64,
        layline_offset_deg: f64,
        center: Point,
        radius: f64,
    ) -> Option<&WindSector> {
        match compute_sectors(wind, heading_deg, layline_offset_deg, center, radius) {
            Some(sector) => self.current = Some(sector),
            None => debug!("Historic wind incomplete ({:?}), keeping previous sector", wind),
        }
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&WindSector> {
        self.current.as_ref()
    }
}
