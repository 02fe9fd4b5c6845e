//! A small YCSB-style generator that drives a [`KvClient`] with a seeded,
//! reproducible mix of operations.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;

use crate::{
    client::KvClient,
    config::ClientConfig,
    connection::SqlConnection,
    errors::SqlKvError,
    executor::Record,
    status::Status,
};

#[derive(Clone, Debug, PartialEq)]
pub struct WorkloadSpec {
    pub table: String,
    pub field_names: Vec<String>,
    pub record_count: u64,
    pub operation_count: u64,
    pub read_proportion: f64,
    pub update_proportion: f64,
    pub insert_proportion: f64,
    pub scan_proportion: f64,
    pub delete_proportion: f64,
    pub max_scan_length: usize,
    pub value_length: usize,
    pub seed: u64,
}

impl WorkloadSpec {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            table: config.table.clone(),
            field_names: config.field_names(),
            record_count: 1_000,
            operation_count: 1_000,
            read_proportion: 0.5,
            update_proportion: 0.3,
            insert_proportion: 0.1,
            scan_proportion: 0.05,
            delete_proportion: 0.05,
            max_scan_length: 10,
            value_length: 16,
            seed: 0x5EED,
        }
    }

    fn choose(&self, roll: f64) -> Operation {
        let total = self.read_proportion
            + self.update_proportion
            + self.insert_proportion
            + self.scan_proportion
            + self.delete_proportion;
        let mut point = roll * total;
        for (op, weight) in [
            (Operation::Read, self.read_proportion),
            (Operation::Update, self.update_proportion),
            (Operation::Insert, self.insert_proportion),
            (Operation::Scan, self.scan_proportion),
            (Operation::Delete, self.delete_proportion),
        ] {
            if point < weight {
                return op;
            }
            point -= weight;
        }
        Operation::Read
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Insert,
    Read,
    Update,
    Scan,
    Delete,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OpCounts {
    pub ok: u64,
    pub not_found: u64,
    pub bad_request: u64,
    pub error: u64,
}

impl OpCounts {
    fn record(&mut self, status: Status) {
        match status {
            Status::Ok => self.ok += 1,
            Status::NotFound => self.not_found += 1,
            Status::BadRequest => self.bad_request += 1,
            Status::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.ok + self.not_found + self.bad_request + self.error
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WorkloadReport {
    pub operations: BTreeMap<Operation, OpCounts>,
}

impl WorkloadReport {
    pub fn record(&mut self, op: Operation, status: Status) {
        self.operations.entry(op).or_default().record(status);
    }

    pub fn merge(&mut self, other: &WorkloadReport) {
        for (op, counts) in &other.operations {
            let entry = self.operations.entry(*op).or_default();
            entry.ok += counts.ok;
            entry.not_found += counts.not_found;
            entry.bad_request += counts.bad_request;
            entry.error += counts.error;
        }
    }

    pub fn count(&self, op: Operation) -> OpCounts {
        self.operations.get(&op).copied().unwrap_or_default()
    }
}

/// Keys are zero padded so that lexical order matches numeric order.
pub fn build_key(idx: u64) -> String {
    format!("user{idx:012}")
}

pub fn build_record(fields: &[String], value_length: usize, rng: &mut StdRng) -> Record {
    fields
        .iter()
        .map(|field| (field.clone(), random_value(value_length, rng)))
        .collect()
}

/// Inserts keys `range` with every field populated, then flushes.
pub fn run_load<C: SqlConnection>(
    client: &KvClient<C>,
    spec: &WorkloadSpec,
    range: std::ops::Range<u64>,
) -> Result<WorkloadReport, SqlKvError> {
    let mut rng = StdRng::seed_from_u64(spec.seed ^ range.start);
    let mut report = WorkloadReport::default();
    for idx in range {
        let record = build_record(&spec.field_names, spec.value_length, &mut rng);
        let status = client.insert(&spec.table, &build_key(idx), &record);
        report.record(Operation::Insert, status);
    }
    client.cleanup()?;
    Ok(report)
}

/// Runs `spec.operation_count` mixed operations. `worker` separates the seed
/// and the key space of new inserts between concurrent workers.
pub fn run_operations<C: SqlConnection>(
    client: &KvClient<C>,
    spec: &WorkloadSpec,
    worker: u64,
) -> Result<WorkloadReport, SqlKvError> {
    let mut rng = StdRng::seed_from_u64(spec.seed.wrapping_add(worker.wrapping_mul(0x9E37_79B9)));
    let mut report = WorkloadReport::default();
    let mut next_insert = spec.record_count + worker * spec.operation_count;
    let existing = spec.record_count.max(1);
    for _ in 0..spec.operation_count {
        let op = spec.choose(rng.r#gen::<f64>());
        let status = match op {
            Operation::Read => {
                let key = build_key(rng.gen_range(0..existing));
                let mut record = Record::new();
                client.read(&spec.table, &key, None, &mut record)
            }
            Operation::Update => {
                let key = build_key(rng.gen_range(0..existing));
                let field = &spec.field_names[rng.gen_range(0..spec.field_names.len())];
                let mut record = Record::new();
                record.insert(field.clone(), random_value(spec.value_length, &mut rng));
                client.update(&spec.table, &key, &record)
            }
            Operation::Insert => {
                let key = build_key(next_insert);
                next_insert += 1;
                let record = build_record(&spec.field_names, spec.value_length, &mut rng);
                client.insert(&spec.table, &key, &record)
            }
            Operation::Scan => {
                let key = build_key(rng.gen_range(0..existing));
                let length = rng.gen_range(1..=spec.max_scan_length.max(1));
                let mut rows = Vec::new();
                client.scan(
                    &spec.table,
                    &key,
                    length,
                    Some(spec.field_names.as_slice()),
                    Some(&mut rows),
                )
            }
            Operation::Delete => {
                let key = build_key(rng.gen_range(0..existing));
                client.delete(&spec.table, &key)
            }
        };
        report.record(op, status);
    }
    client.cleanup()?;
    Ok(report)
}

fn random_value(len: usize, rng: &mut StdRng) -> String {
    (0..len)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect()
}
