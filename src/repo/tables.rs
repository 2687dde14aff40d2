//! CSV tables: facility inventory, per-period demand and result artifacts.
//!
//! Readers and writers are generic over `io::Read` / `io::Write`; the path
//! wrappers live in the parent module. Rows keep file order, so the n-th
//! data row is facility or demand point `n` everywhere downstream.

use std::io::{Read, Write};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::{Deserialize, Serialize};

use super::RepoError;
use crate::domain::{Customer, Facility, Point};
use crate::postprocess::ResultRecord;

const X_COLUMN: &str = "x_coordinate";
const Y_COLUMN: &str = "y_coordinate";
const DEMAND_INDEX_COLUMN: &str = "demand_point_index";

/// Columns of a demand table that are not periods
const DEMAND_FIXED_COLUMNS: [&str; 3] = [DEMAND_INDEX_COLUMN, X_COLUMN, Y_COLUMN];

/// Facility inventory row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FacilityRow {
    supply_point_index: usize,
    x_coordinate: f64,
    y_coordinate: f64,
    total_parking_slots: u32,
    #[serde(rename = "existing_num_SCS")]
    existing_num_scs: u32,
    #[serde(rename = "existing_num_FCS")]
    existing_num_fcs: u32,
}

impl From<FacilityRow> for Facility {
    fn from(row: FacilityRow) -> Self {
        Facility::new((row.x_coordinate, row.y_coordinate), row.total_parking_slots)
            .with_existing(row.existing_num_scs, row.existing_num_fcs)
    }
}

pub fn read_facilities<R: Read>(reader: R) -> Result<Vec<Facility>, RepoError> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut facilities = Vec::new();
    for row in rdr.deserialize::<FacilityRow>() {
        facilities.push(row?.into());
    }
    Ok(facilities)
}

/// Write `facilities` in the inventory layout, e.g. after a roll-forward
pub fn write_facilities<W: Write>(writer: W, facilities: &[Facility]) -> Result<(), RepoError> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    for (index, facility) in facilities.iter().enumerate() {
        wtr.serialize(FacilityRow {
            supply_point_index: index,
            x_coordinate: facility.location.x,
            y_coordinate: facility.location.y,
            total_parking_slots: facility.max_slots,
            existing_num_scs: facility.existing_slow,
            existing_num_fcs: facility.existing_fast,
        })?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn column_index(headers: &StringRecord, column: &str) -> Result<usize, RepoError> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| RepoError::MissingColumn {
            column: column.to_string(),
        })
}

fn parse_field(record: &StringRecord, row: usize, index: usize, column: &str) -> Result<f64, RepoError> {
    let raw = record.get(index).unwrap_or_default();
    raw.parse().map_err(|_| RepoError::InvalidValue {
        row,
        column: column.to_string(),
        value: raw.to_string(),
    })
}

/// Period columns of a demand table, in file order
pub fn read_demand_periods<R: Read>(reader: R) -> Result<Vec<String>, RepoError> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?;
    Ok(headers
        .iter()
        .filter(|h| !h.is_empty() && !DEMAND_FIXED_COLUMNS.contains(h))
        .map(str::to_string)
        .collect())
}

/// Demand points of one period, selected by column name
pub fn read_demand<R: Read>(reader: R, period: &str) -> Result<Vec<Customer>, RepoError> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let x = column_index(&headers, X_COLUMN)?;
    let y = column_index(&headers, Y_COLUMN)?;
    let demand = column_index(&headers, period)?;

    let mut customers = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let location = Point::new(
            parse_field(&record, row, x, X_COLUMN)?,
            parse_field(&record, row, y, Y_COLUMN)?,
        );
        customers.push(Customer::new(location, parse_field(&record, row, demand, period)?));
    }
    Ok(customers)
}

pub fn write_records<W: Write>(writer: W, records: &[ResultRecord]) -> Result<(), RepoError> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn read_records<R: Read>(reader: R) -> Result<Vec<ResultRecord>, RepoError> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    for record in rdr.deserialize::<ResultRecord>() {
        records.push(record?);
    }
    Ok(records)
}
