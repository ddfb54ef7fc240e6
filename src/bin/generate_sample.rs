use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// A customer archetype; its index doubles as the `Cluster` id.
struct Profile {
    recency: (f64, f64),
    frequency: (f64, f64),
    monetary: (f64, f64),
    count: usize,
}

const PROFILES: [Profile; 4] = [
    // Recent, frequent, high spend
    Profile { recency: (1.0, 30.0), frequency: (8.0, 20.0), monetary: (2000.0, 12000.0), count: 60 },
    // Regulars
    Profile { recency: (15.0, 90.0), frequency: (3.0, 9.0), monetary: (400.0, 3000.0), count: 120 },
    // Lapsing
    Profile { recency: (90.0, 200.0), frequency: (1.0, 4.0), monetary: (100.0, 900.0), count: 90 },
    // Gone
    Profile { recency: (200.0, 365.0), frequency: (1.0, 2.0), monetary: (5.0, 200.0), count: 80 },
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

    fn uniform(&mut self, (lo, hi): (f64, f64)) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

/// Quartile score 1..=4 against fixed cut points; `higher_is_better` flips
/// the scale for recency.
fn score(value: f64, cuts: [f64; 3], higher_is_better: bool) -> i64 {
    let rank = cuts.iter().filter(|&&c| value > c).count() as i64 + 1;
    if higher_is_better {
        rank
    } else {
        5 - rank
    }
}

#[derive(Default)]
struct Columns {
    customer_id: Vec<i64>,
    recency: Vec<i64>,
    frequency: Vec<i64>,
    monetary: Vec<f64>,
    r_score: Vec<i64>,
    f_score: Vec<i64>,
    m_score: Vec<i64>,
    cluster: Vec<i64>,
}

fn generate(rng: &mut SimpleRng) -> Columns {
    let mut cols = Columns::default();
    let mut next_id: i64 = 12346;
    for (cluster, profile) in PROFILES.iter().enumerate() {
        for _ in 0..profile.count {
            let recency = rng.uniform(profile.recency).round() as i64;
            let frequency = rng.uniform(profile.frequency).round() as i64;
            let monetary = (rng.uniform(profile.monetary) * 100.0).round() / 100.0;

            cols.customer_id.push(next_id);
            cols.recency.push(recency);
            cols.frequency.push(frequency);
            cols.monetary.push(monetary);
            cols.r_score.push(score(recency as f64, [30.0, 90.0, 180.0], false));
            cols.f_score.push(score(frequency as f64, [1.0, 3.0, 8.0], true));
            cols.m_score.push(score(monetary, [250.0, 1000.0, 3000.0], true));
            cols.cluster.push(cluster as i64);
            next_id += 1;
        }
    }
    cols
}

fn write_csv(cols: &Columns, path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    writer.write_record([
        "CustomerID", "Recency", "Frequency", "Monetary", "R_Score", "F_Score", "M_Score", "Cluster",
    ])?;
    for i in 0..cols.customer_id.len() {
        writer.write_record([
            cols.customer_id[i].to_string(),
            cols.recency[i].to_string(),
            cols.frequency[i].to_string(),
            cols.monetary[i].to_string(),
            cols.r_score[i].to_string(),
            cols.f_score[i].to_string(),
            cols.m_score[i].to_string(),
            cols.cluster[i].to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(cols: Columns, path: &str) -> Result<()> {
    let int_field = |name: &str| Field::new(name, DataType::Int64, false);
    let schema = Arc::new(Schema::new(vec![
        int_field("CustomerID"),
        int_field("Recency"),
        int_field("Frequency"),
        Field::new("Monetary", DataType::Float64, false),
        int_field("R_Score"),
        int_field("F_Score"),
        int_field("M_Score"),
        int_field("Cluster"),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(cols.customer_id)),
            Arc::new(Int64Array::from(cols.recency)),
            Arc::new(Int64Array::from(cols.frequency)),
            Arc::new(Float64Array::from(cols.monetary)),
            Arc::new(Int64Array::from(cols.r_score)),
            Arc::new(Int64Array::from(cols.f_score)),
            Arc::new(Int64Array::from(cols.m_score)),
            Arc::new(Int64Array::from(cols.cluster)),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let cols = generate(&mut rng);
    let n = cols.customer_id.len();

    write_csv(&cols, "sample_rfm.csv")?;
    write_parquet(cols, "sample_rfm.parquet")?;

    println!("Wrote {n} customers to sample_rfm.csv and sample_rfm.parquet");
    Ok(())
}
