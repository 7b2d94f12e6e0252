//! Field metadata for company master-data records.
//!
//! Records stay opaque maps; this table only drives rendering and the parsing
//! of `field=value` assignments.

use serde_json::Value;
use thiserror::Error;

pub const ID_FIELD: &str = "company_code";
pub const SEARCH_FIELDS: [&str; 3] = ["company_code", "company_name", "subscriber_id"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Checkbox,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    BasicInformation,
    LocationAndCurrency,
    FiscalSettings,
    AdditionalSettings,
    SystemFlags,
    SystemInformation,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::BasicInformation,
        Section::LocationAndCurrency,
        Section::FiscalSettings,
        Section::AdditionalSettings,
        Section::SystemFlags,
        Section::SystemInformation,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Section::BasicInformation => "Basic Information",
            Section::LocationAndCurrency => "Location and Currency",
            Section::FiscalSettings => "Fiscal Settings",
            Section::AdditionalSettings => "Additional Settings",
            Section::SystemFlags => "System Flags",
            Section::SystemInformation => "System Information",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub section: Option<Section>,
    /// Grid header, for fields shown as a column.
    pub column: Option<&'static str>,
}

const fn field(
    name: &'static str,
    label: &'static str,
    kind: FieldKind,
    section: Option<Section>,
    column: Option<&'static str>,
) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind,
        section,
        column,
    }
}

use FieldKind::{Checkbox, Text, Timestamp};
use Section::*;

pub const COMPANY_FIELDS: &[FieldSpec] = &[
    field("subscriber_id", "Subscriber ID", Text, None, Some("Subscriber ID")),
    field("company_code", "Company Code", Text, Some(BasicInformation), Some("Co Code")),
    field("company_name", "Company Name", Text, Some(BasicInformation), Some("Company Name")),
    field("company_type", "Company Type", Text, Some(BasicInformation), Some("Type")),
    field("country_code", "Country Code", Text, Some(LocationAndCurrency), Some("Country Code")),
    field("country_type", "Country Type", Text, Some(LocationAndCurrency), Some("Country Type")),
    field("company_country", "Company Country", Text, Some(LocationAndCurrency), Some("Country")),
    field("currency_code", "Currency Code", Text, Some(LocationAndCurrency), Some("Currency Code")),
    field("currency_mode", "Currency Mode", Text, Some(LocationAndCurrency), Some("Curr Mode")),
    field("currency_time", "Currency Time", Text, Some(LocationAndCurrency), Some("Curr Time")),
    field("current_fiscal_year", "Current Fiscal Year", Text, Some(FiscalSettings), Some("Fiscal Year")),
    field("current_period", "Current Period", Text, Some(FiscalSettings), Some("Current Period")),
    field("fiscal_start_period", "Fiscal Start Period", Text, Some(FiscalSettings), Some("Fiscal Start")),
    field("fiscal_end_period", "Fiscal End Period", Text, Some(FiscalSettings), Some("Fiscal End")),
    field("fiscal_period_pattern", "Fiscal Period Pattern", Text, Some(FiscalSettings), Some("Fiscal Pattern")),
    field("fiscal_setting", "Fiscal Setting", Text, Some(FiscalSettings), Some("Fiscal Setting")),
    field("year_code", "Year Code", Text, Some(FiscalSettings), Some("Year Code")),
    field("date_format", "Date Format", Text, Some(AdditionalSettings), Some("Date Format")),
    field("calendar_type", "Calendar Type", Text, Some(AdditionalSettings), Some("Calendar Type")),
    field("company_prefix", "Company Prefix", Text, Some(AdditionalSettings), None),
    field("category_code1", "Category Code 1", Text, Some(AdditionalSettings), Some("Cat Code 1")),
    field("category_code2", "Category Code 2", Text, Some(AdditionalSettings), Some("Cat Code 2")),
    field("unit_number", "Unit Number", Text, Some(AdditionalSettings), Some("Unit Number")),
    field("detail_level", "Detail Level", Text, Some(AdditionalSettings), Some("Detail Level")),
    field("maturity_calc_type", "Maturity Calc Type", Text, Some(AdditionalSettings), Some("Maturity Calc")),
    field("no_printing", "No Printing", Checkbox, Some(SystemFlags), Some("No Printing")),
    field("special_handling", "Special Handling", Checkbox, Some(SystemFlags), Some("Special Handling")),
    field("no_52_period", "No 52 Period", Checkbox, Some(SystemFlags), Some("No 52 Period")),
    field("capital_reports", "Capital Reports", Checkbox, Some(SystemFlags), Some("Capital Reports")),
    field("is_deleted", "Is Deleted", Checkbox, Some(SystemFlags), Some("Deleted")),
    field("created_by", "Created By", Text, Some(SystemInformation), None),
    field("created_program", "Created Program", Text, Some(SystemInformation), None),
    field("updated_by", "Updated By", Text, Some(SystemInformation), None),
    field("updated_program", "Updated Program", Text, Some(SystemInformation), None),
    field("system_created_by", "System Created By", Text, Some(SystemInformation), None),
    field("updated_time", "Updated Time", Timestamp, Some(SystemInformation), None),
    field("job_name", "Job Name", Text, Some(SystemInformation), None),
    field("deleted_by", "Deleted By", Text, Some(SystemInformation), Some("Deleted By")),
    field("deleted_date", "Deleted Date", Timestamp, None, Some("Deleted Date")),
];

/// Columns shown when the grid is not asked for every column.
pub const BASIC_COLUMNS: [&str; 6] = [
    "company_code",
    "company_name",
    "company_type",
    "company_country",
    "currency_code",
    "current_fiscal_year",
];

pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    COMPANY_FIELDS.iter().find(|spec| spec.name == name)
}

pub fn grid_columns() -> impl Iterator<Item = &'static FieldSpec> {
    COMPANY_FIELDS.iter().filter(|spec| spec.column.is_some())
}

pub fn section_fields(section: Section) -> impl Iterator<Item = &'static FieldSpec> {
    COMPANY_FIELDS
        .iter()
        .filter(move |spec| spec.section == Some(section))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignmentError {
    #[error("expected field=value, got '{0}'")]
    MissingEquals(String),
    #[error("field name must not be empty")]
    EmptyField,
    #[error("field '{field}' expects true/false, got '{value}'")]
    InvalidFlag { field: String, value: String },
}

/// Parses a `field=value` assignment into a typed JSON value.
///
/// Checkbox fields take `true/false`, `yes/no` or `1/0`; every other field,
/// known or not, is kept as a string.
pub fn parse_assignment(raw: &str) -> Result<(String, Value), AssignmentError> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| AssignmentError::MissingEquals(raw.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(AssignmentError::EmptyField);
    }

    let kind = field_spec(name).map_or(FieldKind::Text, |spec| spec.kind);
    let value = match kind {
        FieldKind::Checkbox => Value::Bool(parse_flag(value).ok_or_else(|| {
            AssignmentError::InvalidFlag {
                field: name.to_string(),
                value: value.to_string(),
            }
        })?),
        FieldKind::Text | FieldKind::Timestamp => Value::String(value.to_string()),
    };

    Ok((name.to_string(), value))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
