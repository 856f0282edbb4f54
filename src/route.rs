//! Wires between ports.

use itertools::Itertools;

use crate::geometry::{Point, Polygon, Region};
use crate::layout::error::{ensure, ensure_positive, LayoutResult};
use crate::layout::Port;

const COLLINEAR_TOL: f64 = 1e-6;

/// The quadrilateral spanning the edges of two ports.
///
/// `width1` and `width2` override the edge lengths at each port; by default
/// the port widths are used. The vertex order is chosen so the quadrilateral
/// never self-intersects.
pub fn route_quad(p1: &Port, p2: &Port, width1: Option<f64>, width2: Option<f64>) -> Polygon {
    let (a1, b1) = Port {
        width: width1.unwrap_or(p1.width),
        ..p1.clone()
    }
    .endpoints();
    let (a2, b2) = Port {
        width: width2.unwrap_or(p2.width),
        ..p2.clone()
    }
    .endpoints();
    let straight = Polygon::new(vec![a1, b1, a2, b2]);
    let crossed = Polygon::new(vec![a1, b1, b2, a2]);
    if straight.area() >= crossed.area() {
        straight
    } else {
        crossed
    }
}

/// A straight wire between two ports that face each other along one line.
pub fn route_straight(p1: &Port, p2: &Port) -> LayoutResult<Polygon> {
    let facing = (p1.orientation - p2.orientation).abs();
    ensure((facing - 180.0).abs() < COLLINEAR_TOL, || {
        format!(
            "ports `{}` and `{}` do not face each other ({} vs {} degrees)",
            p1.name, p2.name, p1.orientation, p2.orientation
        )
    })?;
    let delta = p2.center - p1.center;
    let n = p1.normal();
    let off_axis = (delta.x * n.y - delta.y * n.x).abs();
    ensure(off_axis < COLLINEAR_TOL && delta.dot(n) > 0.0, || {
        format!(
            "port `{}` does not lie in front of port `{}`",
            p2.name, p1.name
        )
    })?;
    Ok(route_quad(p1, p2, None, None))
}

/// The outline of a polyline of the given `width`.
///
/// Segments end flush with their vertices. Each interior vertex gets a square
/// patch of side `width` so that right-angle corners are filled. With
/// `square_ends`, the first and last vertices get the same patch.
pub fn path_region(points: &[Point], width: f64, square_ends: bool) -> LayoutResult<Region> {
    ensure_positive(&[("width", width)])?;
    let points: Vec<Point> = points
        .iter()
        .copied()
        .dedup_by(|a, b| a.distance(*b) < COLLINEAR_TOL)
        .collect();
    ensure(points.len() >= 2, || {
        "a path needs at least two distinct points".to_string()
    })?;

    let half = width / 2.0;
    let mut polys = Vec::new();
    let mut dir = Point::zero();
    for (i, (a, b)) in points.iter().tuple_windows().enumerate() {
        let d = (*b - *a) * (1.0 / a.distance(*b));
        let n = Point::new(-d.y, d.x) * half;
        polys.push(Polygon::new(vec![*a + n, *b + n, *b - n, *a - n]));
        if i == 0 && square_ends {
            polys.push(square_at(*a, d, half));
        }
        if i > 0 {
            polys.push(square_at(*a, dir, half));
        }
        dir = d;
    }
    if square_ends {
        polys.push(square_at(points[points.len() - 1], dir, half));
    }
    Ok(Region::from_polygons(polys.iter()))
}

fn square_at(center: Point, dir: Point, half: f64) -> Polygon {
    let d = dir * half;
    let n = Point::new(-dir.y, dir.x) * half;
    Polygon::new(vec![
        center - d - n,
        center + d - n,
        center + d + n,
        center - d + n,
    ])
}

/// A rectilinear wire of `width` between two ports.
///
/// The wire leaves each port along its normal, tapering from the port width
/// to `width` over a lead of length `width`, then joins the two leads with an
/// L (perpendicular ports) or a Z (parallel ports).
pub fn route_manhattan(p1: &Port, p2: &Port, width: f64) -> LayoutResult<Region> {
    ensure_positive(&[("width", width)])?;
    let s1 = p1.center + p1.normal() * width;
    let e1 = p2.center + p2.normal() * width;
    let lead1 = Port::new("lead1", s1, width, p1.orientation + 180.0, p1.layer);
    let lead2 = Port::new("lead2", e1, width, p2.orientation + 180.0, p2.layer);

    let horizontal = |p: &Port| p.normal().x.abs() > p.normal().y.abs();
    let mut pts = vec![s1];
    match (horizontal(p1), horizontal(p2)) {
        (true, false) => pts.push(Point::new(e1.x, s1.y)),
        (false, true) => pts.push(Point::new(s1.x, e1.y)),
        (true, true) => {
            let mx = (s1.x + e1.x) / 2.0;
            pts.push(Point::new(mx, s1.y));
            pts.push(Point::new(mx, e1.y));
        }
        (false, false) => {
            let my = (s1.y + e1.y) / 2.0;
            pts.push(Point::new(s1.x, my));
            pts.push(Point::new(e1.x, my));
        }
    }
    pts.push(e1);

    let mut region = Region::from_polygon(&route_quad(p1, &lead1, None, None))
        .union(&Region::from_polygon(&route_quad(p2, &lead2, None, None)));
    if s1.distance(e1) > COLLINEAR_TOL {
        region = region.union(&path_region(&pts, width, true)?);
    }
    Ok(region)
}
