//! Point layer output.
//!
//! Wraps the `shapefile` writer to produce the `.shp`/`.shx`/`.dbf` triplet
//! plus a WGS 84 `.prj` sidecar. Attribute records are built from the row's
//! cells according to the inferred [`FieldDef`] schema; values that cannot
//! be represented in the field's dBase type are written as nulls rather than
//! aborting the run.

use std::{
    fs,
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use chrono::Datelike;
use shapefile::{
    Point, Writer,
    dbase::{self, FieldName, FieldValue, Record, TableWriterBuilder},
};

use crate::data::CellValue;
use crate::fields::{self, FieldDef, FieldKind};

/// ESRI well-known text for plain WGS 84 geographic coordinates.
pub const WGS84_PRJ: &str = "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",\
SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],PRIMEM[\"Greenwich\",0.0],\
UNIT[\"Degree\",0.0174532925199433]]";

pub struct PointLayer {
    writer: Writer<BufWriter<File>>,
    defs: Vec<FieldDef>,
    path: PathBuf,
    feature_count: usize,
}

impl PointLayer {
    /// Creates the layer files and writes the `.prj` sidecar. The last three
    /// entries of `defs` must be the provenance fields.
    pub fn create(path: &Path, defs: &[FieldDef]) -> Result<Self> {
        let mut builder = TableWriterBuilder::new();
        for def in defs {
            let name = FieldName::try_from(def.name.as_str())
                .map_err(|err| anyhow!("Invalid attribute field name '{}': {err:?}", def.name))?;
            builder = match def.kind {
                FieldKind::Character => builder.add_character_field(name, def.width),
                FieldKind::Numeric => builder.add_numeric_field(name, def.width, def.precision),
                FieldKind::Float => builder.add_float_field(name, def.width, def.precision),
                FieldKind::Logical => builder.add_logical_field(name),
                FieldKind::Date => builder.add_date_field(name),
            };
        }
        let writer = Writer::from_path(path, builder)
            .map_err(|err| anyhow!("Creating point layer {path:?}: {err}"))?;
        write_prj(path)?;
        Ok(Self {
            writer,
            defs: defs.to_vec(),
            path: path.to_path_buf(),
            feature_count: 0,
        })
    }

    /// Appends one geocoded row: the point geometry, the row's cells, and
    /// the provenance attributes.
    pub fn write_point(
        &mut self,
        longitude: f64,
        latitude: f64,
        cells: &[CellValue],
        query: &str,
        provider_ref: &str,
        confidence: f64,
    ) -> Result<()> {
        let mut record = Record::default();
        let split = self.defs.len().saturating_sub(3);
        for (def, cell) in self.defs[..split].iter().zip(cells) {
            record.insert(def.name.clone(), field_value(def, cell));
        }
        if let [query_def, ref_def, confidence_def] = &self.defs[split..] {
            record.insert(
                query_def.name.clone(),
                character_value(query, query_def.width),
            );
            record.insert(
                ref_def.name.clone(),
                character_value(provider_ref, ref_def.width),
            );
            record.insert(
                confidence_def.name.clone(),
                FieldValue::Float(Some(confidence as f32)),
            );
        }
        self.writer
            .write_shape_and_record(&Point::new(longitude, latitude), &record)
            .map_err(|err| anyhow!("Writing feature to {:?}: {err}", self.path))?;
        self.feature_count += 1;
        Ok(())
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Writes an empty layer carrying only the attribute schema, plus its
/// `.prj`. Used by the `template` command.
pub fn create_template(path: &Path, defs: &[FieldDef]) -> Result<()> {
    let layer = PointLayer::create(path, defs)?;
    drop(layer);
    Ok(())
}

fn write_prj(shp_path: &Path) -> Result<()> {
    let path = shp_path.with_extension("prj");
    fs::write(&path, WGS84_PRJ).with_context(|| format!("Writing projection file {path:?}"))
}

fn character_value(value: &str, width: u8) -> FieldValue {
    let text = fields::truncate_bytes(value.trim(), width as usize);
    if text.is_empty() {
        FieldValue::Character(None)
    } else {
        FieldValue::Character(Some(text.to_string()))
    }
}

fn field_value(def: &FieldDef, cell: &CellValue) -> FieldValue {
    match def.kind {
        FieldKind::Character => character_value(&cell.as_display(), def.width),
        FieldKind::Numeric => FieldValue::Numeric(cell.as_f64()),
        FieldKind::Float => FieldValue::Float(cell.as_f64().map(|v| v as f32)),
        FieldKind::Logical => FieldValue::Logical(cell.as_bool()),
        FieldKind::Date => FieldValue::Date(cell.as_datetime().map(|stamp| {
            let date = stamp.date();
            dbase::Date::new(date.day(), date.month(), date.year() as u32)
        })),
    }
}
