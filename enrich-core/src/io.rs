//! Reading expense rows and writing enriched output.

use std::{
    collections::BTreeSet,
    fmt,
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
    str::FromStr,
};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::model::{EnrichedRow, InputRow};

pub const INPUT_COLUMNS: [&str; 4] = ["city", "country_code", "local_currency", "amount"];

pub const OUTPUT_COLUMNS: [&str; 11] = [
    "city",
    "country_code",
    "local_currency",
    "amount_local",
    "fx_rate_to_usd",
    "amount_usd",
    "latitude",
    "longitude",
    "temperature_c",
    "wind_speed_mps",
    "retrieved_at",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(anyhow!("Unknown output format '{value}'. Supported formats: json, csv.")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRow {
    city: String,
    country_code: String,
    local_currency: String,
    amount: String,
}

pub fn read_rows(path: &Path) -> Result<Vec<InputRow>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open input file: {}", path.display()))?;

    read_rows_from(file).with_context(|| format!("Failed to read input file: {}", path.display()))
}

/// Parse CSV with exactly the [`INPUT_COLUMNS`] headers, in any order.
pub fn read_rows_from<R: Read>(reader: R) -> Result<Vec<InputRow>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = rdr.headers().context("Failed to read CSV header row")?.clone();
    check_headers(headers.iter())?;

    let mut rows = Vec::new();
    for (idx, record) in rdr.deserialize::<RawRow>().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let raw = record.with_context(|| format!("Malformed record on line {line}"))?;
        let row = InputRow::parse(&raw.city, &raw.country_code, &raw.local_currency, &raw.amount)
            .with_context(|| format!("Invalid row on line {line}"))?;
        rows.push(row);
    }

    Ok(rows)
}

fn check_headers<'a>(found: impl Iterator<Item = &'a str>) -> Result<()> {
    let found: BTreeSet<&str> = found.collect();
    let expected: BTreeSet<&str> = INPUT_COLUMNS.into_iter().collect();

    if found == expected {
        return Ok(());
    }

    let missing: Vec<_> = expected.difference(&found).collect();
    let extra: Vec<_> = found.difference(&expected).collect();
    Err(anyhow!(
        "Invalid headers. Expected {:?}. Missing: {:?} Extra: {:?}",
        INPUT_COLUMNS,
        missing,
        extra
    ))
}

pub fn write_output(rows: &[EnrichedRow], path: &Path, format: OutputFormat, pretty: bool) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Json => write_json_to(rows, &mut writer, pretty)?,
        OutputFormat::Csv => write_csv_to(rows, &mut writer)?,
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write output file: {}", path.display()))
}

pub fn write_json_to<W: Write>(rows: &[EnrichedRow], mut writer: W, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, rows)
    } else {
        serde_json::to_writer(&mut writer, rows)
    }
    .context("Failed to serialize rows to JSON")?;

    writeln!(writer).context("Failed to write JSON output")
}

/// CSV with [`OUTPUT_COLUMNS`]; null values become empty fields.
pub fn write_csv_to<W: Write>(rows: &[EnrichedRow], writer: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);

    wtr.write_record(OUTPUT_COLUMNS).context("Failed to write CSV header")?;
    for row in rows {
        wtr.serialize(row).context("Failed to serialize row to CSV")?;
    }

    wtr.flush().context("Failed to write CSV output")
}
