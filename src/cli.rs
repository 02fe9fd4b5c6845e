use crate::{
    config::{ClientConfig, Properties},
    errors::SqlKvError,
    workload::WorkloadSpec,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Config,
    Load,
    Run,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommandLineConfig {
    pub command: Command,
    pub properties: Properties,
    pub threads: usize,
    pub records: Option<u64>,
    pub operations: Option<u64>,
    pub seed: Option<u64>,
}

impl CommandLineConfig {
    pub fn from_args(args: &[&str]) -> Result<Self, String> {
        let mut properties = Properties::new();
        let mut overrides = Vec::new();
        let mut command = None;
        let mut threads = 1usize;
        let mut records = None;
        let mut operations = None;
        let mut seed = None;
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match *arg {
                "-P" => {
                    let path = iter.next().ok_or_else(|| "-P requires a file".to_string())?;
                    properties.merge(Properties::load(path).map_err(|e| e.to_string())?);
                }
                "-p" => {
                    let pair = iter
                        .next()
                        .ok_or_else(|| "-p requires key=value".to_string())?;
                    overrides.push(*pair);
                }
                "--threads" => threads = parse_value(arg, iter.next())?,
                "--records" => records = Some(parse_value(arg, iter.next())?),
                "--operations" => operations = Some(parse_value(arg, iter.next())?),
                "--seed" => seed = Some(parse_value(arg, iter.next())?),
                other if other.starts_with('-') => {
                    return Err(format!("unknown flag {other}"));
                }
                "config" => command = Some(Command::Config),
                "load" => command = Some(Command::Load),
                "run" => command = Some(Command::Run),
                other => return Err(format!("unknown command {other}")),
            }
        }
        // -p always wins over -P, whatever the argument order.
        for pair in overrides {
            properties.apply_override(pair).map_err(|e| e.to_string())?;
        }
        if threads == 0 {
            return Err("--threads must be positive".to_string());
        }
        Ok(Self {
            command: command.ok_or_else(|| "missing command".to_string())?,
            properties,
            threads,
            records,
            operations,
            seed,
        })
    }

    pub fn client_config(&self) -> Result<ClientConfig, SqlKvError> {
        ClientConfig::from_properties(&self.properties)
    }

    pub fn workload(&self, config: &ClientConfig) -> WorkloadSpec {
        let mut spec = WorkloadSpec::from_config(config);
        if let Some(records) = self.records {
            spec.record_count = records;
        }
        if let Some(operations) = self.operations {
            spec.operation_count = operations;
        }
        if let Some(seed) = self.seed {
            spec.seed = seed;
        }
        spec
    }

    pub fn help() -> &'static str {
        "Usage: sqlkv [-P FILE]... [-p KEY=VALUE]... [--threads N] [--records N] \
         [--operations N] [--seed N] <config|load|run>\n"
    }
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<&&str>) -> Result<T, String> {
    let raw = value.ok_or_else(|| format!("{flag} requires a value"))?;
    raw.parse()
        .map_err(|_| format!("{flag} expects a number, got {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_after_files() {
        let cfg = CommandLineConfig::from_args(&[
            "sqlkv",
            "-p",
            "db.batchsize=3",
            "--threads",
            "4",
            "load",
        ])
        .unwrap();
        assert_eq!(cfg.command, Command::Load);
        assert_eq!(cfg.threads, 4);
        assert_eq!(cfg.client_config().unwrap().batch_size, 3);
    }

    #[test]
    fn test_rejects_missing_command_and_bad_numbers() {
        assert!(CommandLineConfig::from_args(&["sqlkv"]).is_err());
        assert!(CommandLineConfig::from_args(&["sqlkv", "--threads", "x", "run"]).is_err());
        assert!(CommandLineConfig::from_args(&["sqlkv", "--threads", "0", "run"]).is_err());
        assert!(CommandLineConfig::from_args(&["sqlkv", "--bogus", "run"]).is_err());
    }
}
