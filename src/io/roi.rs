//! Region-of-interest loading. The ROI is read once per run from a vector
//! source (shapefile or any OGR-readable format), reprojected into the raster
//! CRS when the two differ, and kept as plain `geo-types` polygons so it can
//! be shared read-only across rayon workers.

use crate::types::{BoundingBox, TsmError, TsmResult};
use gdal::spatial_ref::{CoordTransform, SpatialRef};
use gdal::vector::{Geometry, LayerAccess};
use gdal::Dataset;
use gdal_sys::OGRwkbGeometryType;
use geo::Contains;
use geo_types::{Coord, LineString, MultiPolygon, Point, Polygon};
use std::path::Path;

/// One or more ROI polygons in a known CRS, loaded once and reused read-only
/// across every clip invocation of a run.
#[derive(Debug, Clone)]
pub struct Roi {
    pub polygons: MultiPolygon<f64>,
    pub epsg: u32,
}

impl Roi {
    /// Load ROI polygons and reproject them into `target_epsg`. An unreadable
    /// or empty ROI is a configuration error and aborts the run.
    pub fn from_file<P: AsRef<Path>>(path: P, target_epsg: u32) -> TsmResult<Self> {
        let path = path.as_ref();
        log::info!("Loading ROI: {}", path.display());

        let dataset = Dataset::open(path).map_err(|e| {
            TsmError::Config(format!("cannot open ROI file {}: {}", path.display(), e))
        })?;
        let mut layer = dataset.layer(0).map_err(|e| {
            TsmError::Config(format!("ROI file {} has no vector layer: {}", path.display(), e))
        })?;

        let target_ref = SpatialRef::from_epsg(target_epsg)?;
        target_ref.set_axis_mapping_strategy(
            gdal_sys::OSRAxisMappingStrategy::OAMS_TRADITIONAL_GIS_ORDER,
        );

        let transform = match layer.spatial_ref() {
            Some(source_ref) => {
                source_ref.set_axis_mapping_strategy(
                    gdal_sys::OSRAxisMappingStrategy::OAMS_TRADITIONAL_GIS_ORDER,
                );
                let same = source_ref
                    .auth_code()
                    .map(|code| code as u32 == target_epsg)
                    .unwrap_or(false);
                if same {
                    None
                } else {
                    log::info!("Reprojecting ROI to EPSG:{}", target_epsg);
                    Some(CoordTransform::new(&source_ref, &target_ref)?)
                }
            }
            None => {
                log::warn!(
                    "ROI {} has no CRS, assuming EPSG:{}",
                    path.display(),
                    target_epsg
                );
                None
            }
        };

        let mut polygons = Vec::new();
        for feature in layer.features() {
            if let Some(geometry) = feature.geometry() {
                collect_polygons(geometry, transform.as_ref(), &mut polygons)?;
            }
        }

        if polygons.is_empty() {
            return Err(TsmError::Config(format!(
                "ROI file {} contains no polygon geometry",
                path.display()
            )));
        }

        log::info!("Loaded {} ROI polygon(s)", polygons.len());
        Ok(Self { polygons: MultiPolygon(polygons), epsg: target_epsg })
    }

    /// Construct directly from polygons, bypassing file I/O
    pub fn from_polygons(polygons: MultiPolygon<f64>, epsg: u32) -> Self {
        Self { polygons, epsg }
    }

    /// Bounding box over every exterior ring vertex
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox {
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
        };
        for polygon in self.polygons.iter() {
            for coord in polygon.exterior().coords() {
                bbox.min_lon = bbox.min_lon.min(coord.x);
                bbox.max_lon = bbox.max_lon.max(coord.x);
                bbox.min_lat = bbox.min_lat.min(coord.y);
                bbox.max_lat = bbox.max_lat.max(coord.y);
            }
        }
        bbox
    }

    /// True when the point lies inside any ROI polygon
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.polygons.contains(&Point::new(lon, lat))
    }
}

/// Recursively flatten polygons out of a (possibly multi/collection) geometry,
/// applying the coordinate transform ring by ring.
fn collect_polygons(
    geometry: &Geometry,
    transform: Option<&CoordTransform>,
    out: &mut Vec<Polygon<f64>>,
) -> TsmResult<()> {
    match geometry.geometry_type() {
        OGRwkbGeometryType::wkbPolygon | OGRwkbGeometryType::wkbPolygon25D => {
            out.push(polygon_from_gdal(geometry, transform)?);
        }
        OGRwkbGeometryType::wkbMultiPolygon
        | OGRwkbGeometryType::wkbMultiPolygon25D
        | OGRwkbGeometryType::wkbGeometryCollection => {
            for i in 0..geometry.geometry_count() {
                let child = geometry.get_geometry(i);
                collect_polygons(&child, transform, out)?;
            }
        }
        other => {
            log::warn!("Ignoring non-polygon ROI geometry (OGR type {})", other);
        }
    }
    Ok(())
}

fn polygon_from_gdal(
    polygon: &Geometry,
    transform: Option<&CoordTransform>,
) -> TsmResult<Polygon<f64>> {
    let ring_count = polygon.geometry_count();
    if ring_count == 0 {
        return Err(TsmError::InvalidFormat("ROI polygon has no rings".to_string()));
    }

    let mut rings = Vec::with_capacity(ring_count);
    for i in 0..ring_count {
        let ring = polygon.get_geometry(i);
        rings.push(ring_from_gdal(&ring, transform)?);
    }

    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

fn ring_from_gdal(
    ring: &Geometry,
    transform: Option<&CoordTransform>,
) -> TsmResult<LineString<f64>> {
    let points = ring.get_point_vec();
    let mut xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let mut ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    let mut zs: Vec<f64> = vec![0.0; points.len()];

    if let Some(ct) = transform {
        ct.transform_coords(&mut xs, &mut ys, &mut zs)?;
    }

    Ok(LineString::from(
        xs.into_iter()
            .zip(ys)
            .map(|(x, y)| Coord { x, y })
            .collect::<Vec<_>>(),
    ))
}
