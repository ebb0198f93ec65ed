use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Builder, Int32Array, StringArray, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const FIRST_YEAR: i32 = 1960;
const LAST_YEAR: i32 = 2023;

/// Indicator id, first year with data, chance that a year is observed.
const INDICATORS: [(&str, i32, f64); 6] = [
    ("SP.DYN.LE00.IN", 1960, 0.6),
    ("SH.XPD.CHEX.GD.ZS", 2000, 0.5),
    ("SP.POP.TOTL", 1960, 0.4),
    ("SH.DTH.COMM.ZS", 2000, 0.3),
    ("SH.DTH.INJR.ZS", 2000, 0.3),
    ("SH.DTH.NCOM.ZS", 2000, 0.3),
];

struct Country {
    code: &'static str,
    name: &'static str,
    region: Option<&'static str>,
    /// Life expectancy in 1960 and in the last year.
    life: (f64, f64),
    /// Health expenditure, % of GDP, in 2000 and in the last year.
    health: (f64, f64),
    /// Population in 1960 and in the last year.
    population: (f64, f64),
    /// Share of deaths by communicable disease in 2000 and the last year.
    communicable: (f64, f64),
}

const COUNTRIES: [Country; 8] = [
    Country { code: "FR", name: "France", region: Some("Europe"), life: (69.9, 82.3), health: (9.6, 12.1), population: (46.6e6, 68.2e6), communicable: (6.0, 4.5) },
    Country { code: "DE", name: "Germany", region: Some("Europe"), life: (69.3, 80.9), health: (9.8, 12.7), population: (72.8e6, 84.5e6), communicable: (5.0, 4.0) },
    Country { code: "US", name: "United States", region: Some("Americas"), life: (69.8, 77.4), health: (12.5, 16.6), population: (180.7e6, 334.9e6), communicable: (5.5, 6.0) },
    Country { code: "BR", name: "Brazil", region: Some("Americas"), life: (52.1, 75.8), health: (8.0, 9.9), population: (72.2e6, 216.4e6), communicable: (20.0, 12.0) },
    Country { code: "NG", name: "Nigeria", region: Some("Africa"), life: (37.0, 53.6), health: (3.4, 4.1), population: (45.1e6, 223.8e6), communicable: (68.0, 61.0) },
    Country { code: "IN", name: "India", region: Some("Asia"), life: (45.2, 70.4), health: (4.0, 3.3), population: (445.9e6, 1428.6e6), communicable: (38.0, 25.0) },
    Country { code: "AU", name: "Australia", region: Some("Oceania"), life: (70.8, 83.1), health: (7.6, 10.5), population: (10.3e6, 26.6e6), communicable: (3.0, 3.5) },
    // An aggregate; the loader drops it.
    Country { code: "1W", name: "World", region: None, life: (50.0, 73.2), health: (8.6, 10.3), population: (3.0e9, 8.0e9), communicable: (26.0, 18.0) },
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform jitter in `[-amount, amount]`.
    fn jitter(&mut self, amount: f64) -> f64 {
        (self.next_f64() * 2.0 - 1.0) * amount
    }
}

/// Linear trend from `from` (at `first`) to `to` (at LAST_YEAR).
fn trend((from, to): (f64, f64), first: i32, year: i32) -> f64 {
    let t = f64::from(year - first) / f64::from(LAST_YEAR - first);
    from + t * (to - from)
}

fn value_for(country: &Country, indicator: &str, first: i32, year: i32, rng: &mut SimpleRng) -> f64 {
    let communicable = trend(country.communicable, first, year);
    let injury = 6.0 + rng.jitter(1.5);
    match indicator {
        "SP.DYN.LE00.IN" => trend(country.life, first, year) + rng.jitter(0.4),
        "SH.XPD.CHEX.GD.ZS" => trend(country.health, first, year) + rng.jitter(0.3),
        "SP.POP.TOTL" => (trend(country.population, first, year) * (1.0 + rng.jitter(0.01))).round(),
        "SH.DTH.COMM.ZS" => communicable,
        "SH.DTH.INJR.ZS" => injury,
        _ => 100.0 - communicable - injury,
    }
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let mut dates: Vec<i32> = Vec::new();
    let mut indicator_ids: Vec<&str> = Vec::new();
    let mut country_ids: Vec<&str> = Vec::new();
    let mut country_names: Vec<&str> = Vec::new();
    let mut regions = StringBuilder::new();
    let mut values = Float64Builder::new();

    for country in &COUNTRIES {
        for (indicator, first, coverage) in INDICATORS {
            for year in first.max(FIRST_YEAR)..=LAST_YEAR {
                // Always observe the first year so every series has an anchor.
                let observed = year == first || rng.next_f64() < coverage;
                let missing_value = rng.next_f64() < 0.05;
                if !observed {
                    continue;
                }
                dates.push(year);
                indicator_ids.push(indicator);
                country_ids.push(country.code);
                country_names.push(country.name);
                regions.append_option(country.region);
                if missing_value {
                    values.append_null();
                } else {
                    values.append_value(value_for(country, indicator, first, year, &mut rng));
                }
            }
        }
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("date", DataType::Int32, false),
        Field::new("indicator_id", DataType::Utf8, false),
        Field::new("country_id", DataType::Utf8, false),
        Field::new("country_name", DataType::Utf8, false),
        Field::new("region", DataType::Utf8, true),
        Field::new("value", DataType::Float64, true),
    ]));

    let rows = dates.len();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int32Array::from(dates)),
            Arc::new(StringArray::from(indicator_ids)),
            Arc::new(StringArray::from(country_ids)),
            Arc::new(StringArray::from(country_names)),
            Arc::new(regions.finish()),
            Arc::new(values.finish()),
        ],
    )
    .context("Failed to create RecordBatch")?;

    let output_path = "sample_databank.parquet";
    let file = std::fs::File::create(output_path)
        .with_context(|| format!("Failed to create {output_path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("Failed to create writer")?;
    writer.write(&batch).context("Failed to write batch")?;
    writer.close().context("Failed to close writer")?;

    println!(
        "Wrote {rows} sparse observations for {} countries to {output_path}",
        COUNTRIES.len()
    );
    Ok(())
}
