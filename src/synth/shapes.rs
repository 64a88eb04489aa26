use geo::Point;
use itertools::Itertools as _;
use tracing::warn;

use crate::geodesy::{destination, distance_nm, initial_bearing};

/// Line segment between two coordinates.
pub type Segment = (Point, Point);

const CIRCLE_SEGMENTS: usize = 18;
const DASH_COUNT_TOLERANCE: f64 = 1e-6;

/// Consecutive points chained into segments, `n` points giving `n - 1` segments.
pub fn polyline(coordinates: &[Point]) -> Vec<Segment> {
    coordinates.iter().copied().tuple_windows().collect()
}

/// Dashes of `dash_nm` from `start` to `end`. With an even number of dashes fitting, one less
/// is drawn and the pattern is centred on the line. Only even steps are drawn, odd steps are the
/// gaps. A line shorter than one dash draws nothing.
pub fn dashes(start: Point, end: Point, dash_nm: f64) -> Vec<Segment> {
    let total = distance_nm(start, end);
    if total == 0.0 || dash_nm <= 0.0 {
        warn!("Skipping degenerate dashed line at {:?}", start.x_y());
        return vec![];
    }
    let bearing = initial_bearing(start, end).to_radians();

    // law of cosines comes out a hair short on whole multiples of the dash length
    let count = (total / dash_nm + DASH_COUNT_TOLERANCE).floor() as usize;
    if count == 0 {
        warn!("Dashed line at {:?} is shorter than one dash", start.x_y());
        return vec![];
    }
    let (offset, steps) = if count % 2 == 0 {
        ((total - dash_nm * (count - 1) as f64) / 2.0, count - 1)
    } else {
        (0.0, count)
    };

    (0..steps)
        .step_by(2)
        .map(|step| {
            let from = offset + dash_nm * step as f64;
            (
                destination(start, bearing, from),
                destination(start, bearing, from + dash_nm),
            )
        })
        .collect()
}

/// Circle around `centre` through `edge`, as 18 chords of 20° starting at `edge`.
pub fn circle(centre: Point, edge: Point) -> Vec<Segment> {
    let radius = distance_nm(centre, edge);
    if radius == 0.0 {
        warn!("Skipping circle without radius at {:?}", centre.x_y());
        return vec![];
    }
    let start = initial_bearing(centre, edge);
    let step = 360.0 / CIRCLE_SEGMENTS as f64;

    let points = (0..CIRCLE_SEGMENTS)
        .map(|i| destination(centre, (start + step * i as f64).to_radians(), radius))
        .collect::<Vec<_>>();
    (0..CIRCLE_SEGMENTS)
        .map(|i| (points[i], points[(i + 1) % CIRCLE_SEGMENTS]))
        .collect()
}
