//! GeoJSON and shapefile readers, GeoJSON writer.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use geo::{Geometry, GeometryCollection};
use geojson::{FeatureCollection, GeoJson, JsonObject};
use shapefile::dbase::{self, FieldValue};
use tracing::debug;

use super::{AttrValue, Crs, Feature, Layer, LayerError, LayerResult};
use crate::fsutil::write_atomic;

/// Reads a layer, picking the reader from the file extension.
pub fn read_layer(path: &Path) -> LayerResult<Layer> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("geojson") | Some("json") => read_geojson(path),
        Some("shp") => read_shapefile(path),
        _ => Err(LayerError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Reads a GeoJSON file (feature collection, single feature or bare geometry).
///
/// A legacy `crs` member naming EPSG:3857 tags the layer as Web Mercator;
/// everything else is treated as WGS84.
pub fn read_geojson(path: &Path) -> LayerResult<Layer> {
    let text = fs::read_to_string(path).map_err(|e| LayerError::io(path, e))?;
    let geojson: GeoJson = text.parse().map_err(|e| LayerError::GeoJson {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    let (crs, features) = match geojson {
        GeoJson::FeatureCollection(fc) => (crs_member(fc.foreign_members.as_ref()), fc.features),
        GeoJson::Feature(f) => (Crs::Wgs84, vec![f]),
        GeoJson::Geometry(g) => (Crs::Wgs84, vec![geojson::Feature::from(g)]),
    };

    let mut layer = Layer::new(crs);
    for feature in features {
        let geometry = match feature.geometry {
            Some(g) => Geometry::<f64>::try_from(g).map_err(|e| LayerError::Geometry {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?,
            None => Geometry::GeometryCollection(GeometryCollection(Vec::new())),
        };
        let mut out = Feature::new(geometry);
        if let Some(props) = feature.properties {
            for (name, value) in &props {
                out.set(name.clone(), AttrValue::from_json(value));
            }
        }
        layer.push(out);
    }

    debug!(path = %path.display(), features = layer.len(), "Read GeoJSON layer");
    Ok(layer)
}

fn crs_member(members: Option<&JsonObject>) -> Crs {
    members
        .and_then(|m| m.get("crs"))
        .and_then(|crs| crs.pointer("/properties/name"))
        .and_then(|name| name.as_str())
        .map(Crs::from_code)
        .unwrap_or(Crs::Wgs84)
}

/// Writes a layer as a GeoJSON feature collection.
///
/// Properties follow the layer's column order; absent values are written as
/// `null`. Non-WGS84 layers carry a `crs` member so they read back tagged.
pub fn write_geojson(layer: &Layer, path: &Path) -> LayerResult<()> {
    let features = layer
        .iter()
        .map(|f| {
            let mut props = JsonObject::new();
            for column in layer.columns() {
                props.insert(column.clone(), f.get(column).to_json());
            }
            geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&f.geometry))),
                id: None,
                properties: Some(props),
                foreign_members: None,
            }
        })
        .collect();

    let foreign_members = match layer.crs() {
        Crs::Wgs84 => None,
        crs => {
            let mut members = JsonObject::new();
            members.insert(
                "crs".to_string(),
                serde_json::json!({
                    "type": "name",
                    "properties": { "name": crs_urn(crs) }
                }),
            );
            Some(members)
        }
    };

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    };

    let text = GeoJson::from(collection).to_string();
    write_atomic(path, text.as_bytes()).map_err(|e| LayerError::io(path, e))?;
    debug!(path = %path.display(), features = layer.len(), "Wrote GeoJSON layer");
    Ok(())
}

fn crs_urn(crs: &Crs) -> String {
    match crs.code().strip_prefix("EPSG:") {
        Some(code) => format!("urn:ogc:def:crs:EPSG::{}", code),
        None => crs.code().to_string(),
    }
}

/// Reads a shapefile and its `.dbf` attributes.
///
/// The CRS comes from the `.prj` sidecar; without one the data is assumed
/// to be WGS84, which is what Natural Earth ships.
pub fn read_shapefile(path: &Path) -> LayerResult<Layer> {
    let shp_err = |source| LayerError::Shapefile {
        path: path.to_path_buf(),
        source,
    };

    let prj = path.with_extension("prj");
    let crs = match fs::read_to_string(&prj) {
        Ok(wkt) => Crs::from_wkt(&wkt),
        Err(_) => Crs::Wgs84,
    };

    let dbf = path.with_extension("dbf");
    if !dbf.exists() {
        return Err(shp_err(shapefile::Error::MissingDbf));
    }
    let shapes = shapefile::ShapeReader::from_path(path).map_err(shp_err)?;
    let table = dbase::Reader::from_path(&dbf)
        .map_err(|e| shp_err(shapefile::Error::from(e)))?;

    let mut layer = Layer::new(crs);
    for field in table.fields() {
        layer.add_column(field.name().to_string());
    }
    let mut reader = shapefile::Reader::new(shapes, table);

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.map_err(shp_err)?;
        let geometry = match shape {
            shapefile::Shape::NullShape => {
                Geometry::GeometryCollection(GeometryCollection(Vec::new()))
            }
            shape => Geometry::<f64>::try_from(shape).map_err(|e| LayerError::Geometry {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?,
        };

        let fields: HashMap<String, FieldValue> = record.into();
        let mut feature = Feature::new(geometry);
        for (name, value) in fields {
            feature.set(name, field_value(value));
        }
        layer.push(feature);
    }

    debug!(path = %path.display(), features = layer.len(), crs = %layer.crs(), "Read shapefile");
    Ok(layer)
}

fn field_value(value: FieldValue) -> AttrValue {
    match value {
        FieldValue::Character(s) => s.map(AttrValue::Text).unwrap_or_default(),
        FieldValue::Memo(s) => AttrValue::Text(s),
        FieldValue::Numeric(n) => n.map(AttrValue::Number).unwrap_or_default(),
        FieldValue::Float(n) => n.map(|n| AttrValue::Number(f64::from(n))).unwrap_or_default(),
        FieldValue::Double(n) | FieldValue::Currency(n) => AttrValue::Number(n),
        FieldValue::Integer(n) => AttrValue::Number(f64::from(n)),
        FieldValue::Logical(b) => b.map(AttrValue::Bool).unwrap_or_default(),
        FieldValue::Date(d) => d
            .map(|d| AttrValue::Text(format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day())))
            .unwrap_or_default(),
        other => AttrValue::Text(format!("{:?}", other)),
    }
}
