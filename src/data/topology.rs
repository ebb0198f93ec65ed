use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("malformed TopoJSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("topology has no object named '{0}'")]
    MissingObject(String),
    #[error("arc index {0} out of range")]
    ArcIndex(i64),
    #[error("arc position has fewer than two coordinates")]
    ShortPosition,
}

// ---------------------------------------------------------------------------
// TopoJSON wire format (only what the map needs)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Topology {
    #[serde(default)]
    transform: Option<Transform>,
    arcs: Vec<Vec<Vec<f64>>>,
    objects: BTreeMap<String, Geometry>,
}

#[derive(Debug, Deserialize)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "countryCode")]
    country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    GeometryCollection {
        geometries: Vec<Geometry>,
    },
    Polygon {
        arcs: Vec<Vec<i64>>,
        #[serde(default)]
        properties: Option<Properties>,
    },
    MultiPolygon {
        arcs: Vec<Vec<Vec<i64>>>,
        #[serde(default)]
        properties: Option<Properties>,
    },
    #[serde(other)]
    Other,
}

// ---------------------------------------------------------------------------
// Decoded, projected shapes
// ---------------------------------------------------------------------------

/// A polygon in projected map coordinates. The first ring is the exterior.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Vec<[f64; 2]>,
    pub holes: Vec<Vec<[f64; 2]>>,
}

impl Polygon {
    pub fn contains(&self, point: [f64; 2]) -> bool {
        ring_contains(&self.exterior, point) && !self.holes.iter().any(|h| ring_contains(h, point))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryShape {
    pub name: String,
    pub code: Option<String>,
    pub polygons: Vec<Polygon>,
    bbox: [f64; 4],
}

impl CountryShape {
    pub fn contains(&self, [x, y]: [f64; 2]) -> bool {
        let [min_x, min_y, max_x, max_y] = self.bbox;
        if x < min_x || x > max_x || y < min_y || y > max_y {
            return false;
        }
        self.polygons.iter().any(|p| p.contains([x, y]))
    }
}

/// World geometry ready for drawing, projected with Equal Earth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldMap {
    pub countries: Vec<CountryShape>,
}

impl WorldMap {
    /// Decode the named object of a TopoJSON document.
    pub fn from_topojson(text: &str, object: &str) -> Result<Self, TopologyError> {
        let topo: Topology = serde_json::from_str(text)?;
        let arcs = decode_arcs(&topo)?;
        let root = topo
            .objects
            .get(object)
            .ok_or_else(|| TopologyError::MissingObject(object.to_string()))?;

        let mut countries = Vec::new();
        collect_countries(root, &arcs, &mut countries)?;
        Ok(WorldMap { countries })
    }

    /// Index of the country under a point given in projected coordinates.
    pub fn country_at(&self, point: [f64; 2]) -> Option<usize> {
        self.countries.iter().position(|c| c.contains(point))
    }
}

fn decode_arcs(topo: &Topology) -> Result<Vec<Vec<[f64; 2]>>, TopologyError> {
    topo.arcs
        .iter()
        .map(|arc| {
            let (mut x, mut y) = (0.0, 0.0);
            arc.iter()
                .map(|pos| {
                    let (&px, &py) = match pos.as_slice() {
                        [px, py, ..] => (px, py),
                        _ => return Err(TopologyError::ShortPosition),
                    };
                    Ok(match &topo.transform {
                        // Quantized arcs are delta-encoded.
                        Some(t) => {
                            x += px;
                            y += py;
                            [x * t.scale[0] + t.translate[0], y * t.scale[1] + t.translate[1]]
                        }
                        None => [px, py],
                    })
                })
                .collect()
        })
        .collect()
}

fn collect_countries(
    geometry: &Geometry,
    arcs: &[Vec<[f64; 2]>],
    out: &mut Vec<CountryShape>,
) -> Result<(), TopologyError> {
    let (rings_per_polygon, properties): (Vec<&Vec<Vec<i64>>>, _) = match geometry {
        Geometry::GeometryCollection { geometries } => {
            for g in geometries {
                collect_countries(g, arcs, out)?;
            }
            return Ok(());
        }
        Geometry::Polygon { arcs: rings, properties } => (vec![rings], properties),
        Geometry::MultiPolygon { arcs: polys, properties } => (polys.iter().collect(), properties),
        Geometry::Other => return Ok(()),
    };

    let mut polygons = Vec::with_capacity(rings_per_polygon.len());
    for rings in rings_per_polygon {
        let mut decoded = rings
            .iter()
            .map(|ring| stitch_ring(ring, arcs))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter();
        if let Some(exterior) = decoded.next() {
            polygons.push(Polygon {
                exterior,
                holes: decoded.collect(),
            });
        }
    }

    let props = properties.as_ref();
    out.push(CountryShape {
        name: props.and_then(|p| p.name.clone()).unwrap_or_default(),
        code: props.and_then(|p| p.country_code.clone()),
        bbox: bounding_box(&polygons),
        polygons,
    });
    Ok(())
}

/// Join arcs into one projected ring. A negative index `i` refers to arc
/// `!i` traversed backwards; shared endpoints are emitted once.
fn stitch_ring(indices: &[i64], arcs: &[Vec<[f64; 2]>]) -> Result<Vec<[f64; 2]>, TopologyError> {
    let mut ring: Vec<[f64; 2]> = Vec::new();
    for &idx in indices {
        let arc_idx = if idx >= 0 { idx } else { !idx };
        let arc = usize::try_from(arc_idx)
            .ok()
            .and_then(|i| arcs.get(i))
            .ok_or(TopologyError::ArcIndex(idx))?;

        let points: Box<dyn Iterator<Item = &[f64; 2]>> = if idx >= 0 {
            Box::new(arc.iter())
        } else {
            Box::new(arc.iter().rev())
        };
        let skip = usize::from(!ring.is_empty());
        ring.extend(points.skip(skip).map(|&[lon, lat]| equal_earth(lon, lat)));
    }
    Ok(ring)
}

fn bounding_box(polygons: &[Polygon]) -> [f64; 4] {
    polygons
        .iter()
        .flat_map(|p| p.exterior.iter())
        .fold(
            [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY],
            |[x0, y0, x1, y1], &[x, y]| [x0.min(x), y0.min(y), x1.max(x), y1.max(y)],
        )
}

// ---------------------------------------------------------------------------
// Geometry helpers
// ---------------------------------------------------------------------------

/// Equal Earth projection of a longitude/latitude pair in degrees.
/// Output is in unit-sphere coordinates, y pointing north.
pub fn equal_earth(lon: f64, lat: f64) -> [f64; 2] {
    const A1: f64 = 1.340264;
    const A2: f64 = -0.081106;
    const A3: f64 = 0.000893;
    const A4: f64 = 0.003796;
    let m = 3f64.sqrt() / 2.0;

    let lambda = lon.to_radians();
    let theta = (m * lat.to_radians().sin()).asin();
    let t2 = theta * theta;
    let t6 = t2 * t2 * t2;

    let x = lambda * theta.cos() / (m * (A1 + 3.0 * A2 * t2 + t6 * (7.0 * A3 + 9.0 * A4 * t2)));
    let y = theta * (A1 + A2 * t2 + t6 * (A3 + A4 * t2));
    [x, y]
}

/// Even-odd ray casting test.
pub fn ring_contains(ring: &[[f64; 2]], [px, py]: [f64; 2]) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    // Two unit squares sharing the edge at lon = 10, quantized with a
    // scale of 1 and delta encoded.
    const TWO_SQUARES: &str = r#"{
        "type": "Topology",
        "transform": { "scale": [1, 1], "translate": [0, 0] },
        "arcs": [
            [[10, 0], [0, 10]],
            [[10, 10], [-10, 0], [0, -10], [10, 0]],
            [[10, 0], [10, 0], [0, 10], [-10, 0]]
        ],
        "objects": {
            "countries": {
                "type": "GeometryCollection",
                "geometries": [
                    { "type": "Polygon", "arcs": [[0, 1]],
                      "properties": { "name": "Westland", "countryCode": "WL" } },
                    { "type": "MultiPolygon", "arcs": [[[2, -1]]],
                      "properties": { "name": "Eastland" } },
                    { "type": "Point", "coordinates": [0, 0] }
                ]
            }
        }
    }"#;

    #[test]
    fn equal_earth_keeps_origin_and_symmetry() {
        assert_eq!(equal_earth(0.0, 0.0), [0.0, 0.0]);
        let [x, y] = equal_earth(90.0, 45.0);
        let [mx, my] = equal_earth(-90.0, -45.0);
        assert_relative_eq!(x, -mx);
        assert_relative_eq!(y, -my);
        assert!(x > 0.0 && y > 0.0);
    }

    #[test]
    fn decodes_shared_arcs_into_closed_rings() {
        let map = WorldMap::from_topojson(TWO_SQUARES, "countries").unwrap();
        assert_eq!(map.countries.len(), 2);

        let west = &map.countries[0];
        assert_eq!(west.name, "Westland");
        assert_eq!(west.code.as_deref(), Some("WL"));
        let ring = &west.polygons[0].exterior;
        // 2 points from arc 0, 3 more from arc 1 (its first point is shared).
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());

        let east = &map.countries[1];
        assert_eq!(east.code, None);
        assert_eq!(east.polygons[0].exterior.len(), 5);
    }

    #[test]
    fn finds_country_under_point() {
        let map = WorldMap::from_topojson(TWO_SQUARES, "countries").unwrap();
        let name = |i: usize| map.countries[i].name.as_str();
        let west = map.country_at(equal_earth(5.0, 5.0)).map(name);
        let east = map.country_at(equal_earth(15.0, 5.0)).map(name);
        assert_eq!(west, Some("Westland"));
        assert_eq!(east, Some("Eastland"));
        assert!(map.country_at(equal_earth(-40.0, 5.0)).is_none());
    }

    #[test]
    fn rejects_unknown_object_and_bad_arc_index() {
        assert!(matches!(
            WorldMap::from_topojson(TWO_SQUARES, "land"),
            Err(TopologyError::MissingObject(_))
        ));
        let bad = r#"{ "arcs": [], "objects": { "countries":
            { "type": "Polygon", "arcs": [[3]] } } }"#;
        assert!(matches!(
            WorldMap::from_topojson(bad, "countries"),
            Err(TopologyError::ArcIndex(3))
        ));
    }

    #[test]
    fn ring_contains_respects_holes() {
        let square = |lo: f64, hi: f64| vec![[lo, lo], [hi, lo], [hi, hi], [lo, hi], [lo, lo]];
        let poly = Polygon {
            exterior: square(0.0, 10.0),
            holes: vec![square(4.0, 6.0)],
        };
        assert!(poly.contains([1.0, 1.0]));
        assert!(!poly.contains([5.0, 5.0]));
        assert!(!poly.contains([11.0, 5.0]));
    }
}
