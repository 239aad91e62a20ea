//! Parquet export loading

use log;
use polars::prelude::*;

use crate::data::preprocessing::normalize_work;
use crate::error::{Error, Result};
use crate::model::Work;

/// Load works from a Parquet export of the works table.
///
/// `oa_id` and `publication_year` are required. `referenced_works` and
/// `in_decade_references` hold JSON-encoded arrays; every other column is optional.
pub fn load_works(path: &str) -> Result<Vec<Work>> {
    log::info!("Reading parquet file: {}", path);

    if !std::path::Path::new(path).exists() {
        return Err(Error::Input(format!("file not found: {path}")));
    }

    let df = LazyFrame::scan_parquet(path, Default::default())?.collect()?;
    log::info!("File schema: {:?}", df.schema());
    log::info!("Loaded {} rows", df.height());

    let ids = str_values(&df, "oa_id")?
        .ok_or_else(|| Error::Input("missing required column `oa_id`".into()))?;
    let years = int_values(&df, "publication_year")?
        .ok_or_else(|| Error::Input("missing required column `publication_year`".into()))?;
    let height = df.height();
    let doi = str_values(&df, "doi")?.unwrap_or_else(|| vec![None; height]);
    let title = str_values(&df, "title")?.unwrap_or_else(|| vec![None; height]);
    let abstract_text = str_values(&df, "abstract")?.unwrap_or_else(|| vec![None; height]);
    let domain = str_values(&df, "domain")?.unwrap_or_else(|| vec![None; height]);
    let field = str_values(&df, "field")?.unwrap_or_else(|| vec![None; height]);
    let topic = str_values(&df, "topic")?.unwrap_or_else(|| vec![None; height]);
    let refs = str_values(&df, "referenced_works")?.unwrap_or_else(|| vec![None; height]);
    let in_decade = str_values(&df, "in_decade_references")?.unwrap_or_else(|| vec![None; height]);
    let cited_by = int_values(&df, "cited_by_count")?.unwrap_or_else(|| vec![None; height]);
    let layer = int_values(&df, "layer")?.unwrap_or_else(|| vec![None; height]);

    let mut works = Vec::with_capacity(height);
    for i in 0..height {
        let (Some(id), Some(year)) = (ids[i].clone(), years[i]) else {
            log::warn!("Skipping row {} without id or publication year", i);
            continue;
        };
        let publication_year = i32::try_from(year)
            .map_err(|_| Error::Input(format!("row {i}: publication_year {year} out of range")))?;
        let layer = match layer[i] {
            None => 0,
            Some(value) => u32::try_from(value)
                .map_err(|_| Error::Input(format!("row {i}: layer {value} out of range")))?,
        };
        let mut work = Work {
            id,
            doi: doi[i].clone(),
            title: title[i].clone(),
            publication_year,
            cited_by_count: cited_by[i].unwrap_or(0),
            abstract_text: abstract_text[i].clone(),
            referenced_works: parse_list(refs[i].as_deref())
                .map_err(|e| Error::Input(format!("row {i}: referenced_works: {e}")))?,
            domain: domain[i].clone(),
            field: field[i].clone(),
            topic: topic[i].clone(),
            layer,
            in_decade_references: parse_list(in_decade[i].as_deref())
                .map_err(|e| Error::Input(format!("row {i}: in_decade_references: {e}")))?,
        };
        normalize_work(&mut work);
        works.push(work);
    }

    log::info!("Parsed {} works from {}", works.len(), path);
    Ok(works)
}

fn str_values(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<String>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let column = column.cast(&DataType::String)?;
    let values = column.str()?;
    Ok(Some(
        (0..df.height()).map(|i| values.get(i).map(str::to_string)).collect(),
    ))
}

fn int_values(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<i64>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let column = column.cast(&DataType::Int64)?;
    let values = column.i64()?;
    Ok(Some((0..df.height()).map(|i| values.get(i)).collect()))
}

fn parse_list(raw: Option<&str>) -> serde_json::Result<Vec<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(text) => serde_json::from_str(text),
    }
}
