use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use candle_core::Device;
use chrono::Local;
use clap::Parser;
use serde::Serialize;

/// Generate with a seq2seq model and save per-position confidences,
/// predictions and tokenized references.
///
/// Arguments after `--` are forwarded to generation, e.g.
/// `-- --do_sample true --top_k=20`.
#[derive(Parser, Debug, Clone, Serialize)]
#[command(name = "run-extract", version, about)]
pub struct Args {
    /// Hub model id or local directory, like t5-small
    #[arg(long)]
    pub model_name: String,

    /// Hub revision of the model
    #[arg(long, default_value = "main")]
    pub revision: String,

    /// Source examples, one per line, like cnn_dm/test.source
    #[arg(long)]
    pub input_path: PathBuf,

    /// References, one per line, like cnn_dm/test.target
    #[arg(long)]
    pub reference_path: PathBuf,

    /// Directory the tensors are saved to
    #[arg(long)]
    pub save_path: PathBuf,

    /// Also write the JSON report to this file
    #[arg(long)]
    pub score_path: Option<PathBuf>,

    /// cpu, cuda, cuda:1, metal. Defaults to cuda when available
    #[arg(long)]
    pub device: Option<String>,

    /// Run the model in half precision
    #[arg(long)]
    pub fp16: bool,

    /// Added to the beginning of every source example
    #[arg(long)]
    pub prefix: Option<String>,

    /// Selects the model's task specific parameters
    #[arg(long, default_value = "summarization")]
    pub task: String,

    /// Batch size
    #[arg(long, default_value_t = 8)]
    pub bs: usize,

    /// How many observations. Defaults to all
    #[arg(long)]
    pub n_obs: Option<usize>,

    /// Print the arguments with the results
    #[arg(long)]
    pub dump_args: bool,

    /// Extra info printed with `--dump-args`, the current time when given without a value
    #[arg(long, num_args = 0..=1)]
    pub info: Option<Option<String>>,

    /// Generation options
    #[arg(last = true, allow_hyphen_values = true)]
    pub generate_args: Vec<String>,
}

impl Args {
    /// The `--info` value, with a bare `--info` resolved to the current time.
    pub fn info(&self) -> Option<String> {
        self.info.as_ref().map(|value| value.clone().unwrap_or_else(datetime_now))
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSpec {
    Cpu,
    Cuda(usize),
    Metal,
}

impl FromStr for DeviceSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpu" => Ok(DeviceSpec::Cpu),
            "cuda" => Ok(DeviceSpec::Cuda(0)),
            "metal" => Ok(DeviceSpec::Metal),
            other => match other.strip_prefix("cuda:") {
                Some(ordinal) => {
                    let ordinal = ordinal
                        .parse::<usize>()
                        .with_context(|| format!("invalid cuda ordinal in `{other}`"))?;
                    Ok(DeviceSpec::Cuda(ordinal))
                }
                None => bail!("unknown device `{other}`, expected cpu, cuda, cuda:N or metal"),
            },
        }
    }
}

/// Resolve `--device`, falling back to the first cuda device when one exists.
pub fn device(spec: Option<&str>) -> Result<Device> {
    let device = match spec.map(DeviceSpec::from_str).transpose()? {
        None => Device::cuda_if_available(0)?,
        Some(DeviceSpec::Cpu) => Device::Cpu,
        Some(DeviceSpec::Cuda(ordinal)) => Device::new_cuda(ordinal)?,
        Some(DeviceSpec::Metal) => Device::new_metal(0)?,
    };
    Ok(device)
}

/// Current local time as `YYYY-MM-DD HH:MM:SS`.
pub fn datetime_now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 9] = [
        "run-extract",
        "--model-name", "t5-small",
        "--input-path", "in.source",
        "--reference-path", "in.target",
        "--save-path", "out",
    ];

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(REQUIRED).unwrap();
        assert_eq!(args.bs, 8);
        assert_eq!(args.task, "summarization");
        assert_eq!(args.revision, "main");
        assert!(args.n_obs.is_none());
        assert!(args.info().is_none());
        assert!(args.generate_args.is_empty());
        assert!(args.score_path.is_none());
    }

    #[test]
    fn test_score_path() {
        let args = Args::try_parse_from(REQUIRED.iter().copied().chain(["--score-path", "out/metrics.json"])).unwrap();
        assert_eq!(args.score_path, Some(PathBuf::from("out/metrics.json")));
    }

    #[test]
    fn test_trailing_generation_options() {
        let argv = REQUIRED.iter().copied().chain(["--bs", "2", "--", "--num_beams", "2", "--do_sample=true"]);
        let args = Args::try_parse_from(argv).unwrap();
        assert_eq!(args.bs, 2);
        assert_eq!(args.generate_args, vec!["--num_beams", "2", "--do_sample=true"]);
    }

    #[test]
    fn test_info_with_and_without_value() {
        let args = Args::try_parse_from(REQUIRED.iter().copied().chain(["--info", "lang=en-de"])).unwrap();
        assert_eq!(args.info().as_deref(), Some("lang=en-de"));

        let args = Args::try_parse_from(REQUIRED.iter().copied().chain(["--info"])).unwrap();
        let info = args.info().unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(&info, "%Y-%m-%d %H:%M:%S").is_ok(), "{info}");
    }

    #[test]
    fn test_device_spec_parsing() {
        assert_eq!("cpu".parse::<DeviceSpec>().unwrap(), DeviceSpec::Cpu);
        assert_eq!("cuda".parse::<DeviceSpec>().unwrap(), DeviceSpec::Cuda(0));
        assert_eq!("cuda:3".parse::<DeviceSpec>().unwrap(), DeviceSpec::Cuda(3));
        assert_eq!("metal".parse::<DeviceSpec>().unwrap(), DeviceSpec::Metal);
        assert!("cuda:x".parse::<DeviceSpec>().is_err());
        assert!("tpu".parse::<DeviceSpec>().is_err());
    }

    #[test]
    fn test_cpu_device() {
        assert!(device(Some("cpu")).unwrap().is_cpu());
    }

    #[test]
    fn test_datetime_now_is_local_time() {
        let now = datetime_now();
        let parsed = chrono::NaiveDateTime::parse_from_str(&now, "%Y-%m-%d %H:%M:%S").unwrap();
        let drift = Local::now().naive_local() - parsed;
        assert!(drift.num_seconds().abs() < 120, "{now} is not local time");
    }
}
