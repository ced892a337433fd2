use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

/// Write a synthetic gasification dataset as parquet and `;`-delimited text.
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
struct Args {
    /// Output directory.
    #[arg(long, default_value = "data")]
    out: PathBuf,

    /// Sampling times per experiment.
    #[arg(long, default_value_t = 30)]
    steps: i64,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

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
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

#[derive(Default)]
struct Rows {
    time: Vec<i64>,
    temperature: Vec<i64>,
    process_temperature: Vec<i64>,
    agent_type: Vec<&'static str>,
    agent_flow: Vec<f64>,
    sample_type: Vec<&'static str>,
    catalyst_type: Vec<&'static str>,
    catalyst_ratio: Vec<f64>,
    /// CO, CO2, CH4, O2, H2, calorific value
    outputs: [Vec<f64>; 6],
}

/// Rough syngas composition for one operating point.  Oxygen feeds and hot
/// reactors shift the gas towards H2 and CO; catalysts crack more methane.
fn composition(
    rng: &mut SimpleRng,
    minute: f64,
    t_pr: f64,
    oxygen: bool,
    leather: bool,
    catalyst: &str,
    ratio: f64,
) -> [f64; 6] {
    let heat = (t_pr - 800.0) / 400.0;
    let ramp = 1.0 - (-minute / 8.0).exp();
    let boost = match catalyst {
        "Al-Ni" => 1.0 + ratio / 40.0,
        "Marble dust" => 1.0 + ratio / 80.0,
        _ => 1.0,
    };

    let h2 = ramp * (18.0 + 10.0 * heat) * boost * if oxygen { 1.3 } else { 1.0 };
    let co = ramp * (14.0 + 6.0 * heat) * if leather { 1.1 } else { 1.0 };
    let ch4 = ramp * (6.0 - 2.0 * heat) / boost;
    let co2 = 12.0 + 4.0 * (1.0 - ramp) + if oxygen { 3.0 } else { 0.0 };
    let o2 = if oxygen { 2.0 } else { 1.0 } * (1.0 - ramp) * 8.0;
    let lhv = 0.1079 * h2 + 0.1263 * co + 0.3581 * ch4;

    [
        (co + rng.gauss(0.0, 0.4)).max(0.0),
        (co2 + rng.gauss(0.0, 0.4)).max(0.0),
        (ch4 + rng.gauss(0.0, 0.2)).max(0.0),
        (o2 + rng.gauss(0.0, 0.2)).max(0.0),
        (h2 + rng.gauss(0.0, 0.5)).max(0.0),
        (lhv + rng.gauss(0.0, 0.05)).max(0.0),
    ]
}

fn generate(args: &Args) -> Rows {
    let mut rng = SimpleRng::new(args.seed);
    let mut rows = Rows::default();

    let agents = [("Air", 0.02), ("Oxygen", 0.015)];
    let samples = ["TWTS", "Leather scraps"];
    let catalysts = [("None", 0.0), ("Marble dust", 10.0), ("Al-Ni", 5.0)];
    let process_temperatures = [800, 900, 1000];

    for &(agent, flow) in &agents {
        for &sample in &samples {
            for &(catalyst, ratio) in &catalysts {
                for &t_pr in &process_temperatures {
                    let t_in = 450 + (rng.next_f64() * 100.0) as i64;
                    for step in 0..args.steps {
                        let minute = step as f64;
                        let out = composition(
                            &mut rng,
                            minute,
                            t_pr as f64,
                            agent == "Oxygen",
                            sample == "Leather scraps",
                            catalyst,
                            ratio,
                        );

                        rows.time.push(step);
                        rows.temperature.push(t_in);
                        rows.process_temperature.push(t_pr);
                        rows.agent_type.push(agent);
                        rows.agent_flow.push(flow);
                        rows.sample_type.push(sample);
                        rows.catalyst_type.push(catalyst);
                        rows.catalyst_ratio.push(ratio);
                        for (col, v) in rows.outputs.iter_mut().zip(out) {
                            col.push((v * 1000.0).round() / 1000.0);
                        }
                    }
                }
            }
        }
    }
    rows
}

const OUTPUT_NAMES: [&str; 6] = [
    "CarbonMonoxide",
    "CarbonDioxide",
    "Methane",
    "Oxygen",
    "Hydrogen",
    "CalorificValue",
];

fn to_batch(rows: &Rows) -> Result<RecordBatch> {
    let mut fields = vec![
        Field::new("Time", DataType::Int64, false),
        Field::new("Temperature", DataType::Int64, false),
        Field::new("ProcessTemperature", DataType::Int64, false),
        Field::new("AgentType", DataType::Utf8, false),
        Field::new("AgentFlow", DataType::Float64, false),
        Field::new("SampleType", DataType::Utf8, false),
        Field::new("CatalystType", DataType::Utf8, false),
        Field::new("CatalystRatio", DataType::Float64, false),
    ];
    fields.extend(OUTPUT_NAMES.iter().map(|n| Field::new(*n, DataType::Float64, false)));

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(rows.time.clone())),
        Arc::new(Int64Array::from(rows.temperature.clone())),
        Arc::new(Int64Array::from(rows.process_temperature.clone())),
        Arc::new(StringArray::from(rows.agent_type.clone())),
        Arc::new(Float64Array::from(rows.agent_flow.clone())),
        Arc::new(StringArray::from(rows.sample_type.clone())),
        Arc::new(StringArray::from(rows.catalyst_type.clone())),
        Arc::new(Float64Array::from(rows.catalyst_ratio.clone())),
    ];
    columns.extend(
        rows.outputs
            .iter()
            .map(|c| Arc::new(Float64Array::from(c.clone())) as ArrayRef),
    );

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).context("building record batch")
}

fn write_parquet(batch: &RecordBatch, path: &PathBuf) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

fn write_csv(rows: &Rows, path: &PathBuf) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec![
        "Time",
        "Temperature",
        "ProcessTemperature",
        "AgentType",
        "AgentFlow",
        "SampleType",
        "CatalystType",
        "CatalystRatio",
    ];
    header.extend(OUTPUT_NAMES);
    writer.write_record(&header)?;

    for i in 0..rows.time.len() {
        let mut record = vec![
            rows.time[i].to_string(),
            rows.temperature[i].to_string(),
            rows.process_temperature[i].to_string(),
            rows.agent_type[i].to_string(),
            rows.agent_flow[i].to_string(),
            rows.sample_type[i].to_string(),
            rows.catalyst_type[i].to_string(),
            rows.catalyst_ratio[i].to_string(),
        ];
        record.extend(rows.outputs.iter().map(|c| c[i].to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;

    let rows = generate(&args);
    let batch = to_batch(&rows)?;

    let parquet_path = args.out.join("GasificationDataset.parquet");
    let csv_path = args.out.join("GasificationDataset.csv");
    write_parquet(&batch, &parquet_path)?;
    write_csv(&rows, &csv_path)?;

    println!(
        "Wrote {} rows to {} and {}",
        batch.num_rows(),
        parquet_path.display(),
        csv_path.display()
    );
    Ok(())
}
