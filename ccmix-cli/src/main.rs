use std::fs;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use ccmix_core::types::DEFAULT_SEED;
use ccmix_core::{parse_documents, write_report, DocumentSet, OovPolicy, Sampler, SamplerConfig};

/// Fit the cross-collection mixture topic model with collapsed Gibbs sampling
/// and print train/test log-likelihood per iteration.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Training documents, one per line: corpus id then tokens ("-" for stdin)
    train: PathBuf,
    /// Held-out test documents in the same format
    test: PathBuf,
    /// Report file for log-likelihoods and final estimates ("-" for stdout)
    output: PathBuf,
    /// Number of topics (K)
    topics: usize,
    /// Weight of the corpus-specific word distributions, in [0, 1]
    lambda: f64,
    /// Document-topic Dirichlet pseudo-count
    alpha: f64,
    /// Topic-word Dirichlet pseudo-count
    beta: f64,
    /// Total number of iterations
    num_iters: usize,
    /// Iterations excluded from the posterior mean
    num_burn_in: usize,
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    /// Policy for test tokens missing from the training vocabulary
    #[arg(long, value_enum, default_value_t = Oov::Skip)]
    oov: Oov,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Oov {
    Skip,
    Reject,
}

impl From<Oov> for OovPolicy {
    fn from(o: Oov) -> Self {
        match o {
            Oov::Skip => OovPolicy::Skip,
            Oov::Reject => OovPolicy::Reject,
        }
    }
}

impl Args {
    fn config(&self) -> SamplerConfig {
        SamplerConfig::new(self.topics)
            .lambda(self.lambda)
            .alpha(self.alpha)
            .beta(self.beta)
            .num_iters(self.num_iters)
            .burn_in(self.num_burn_in)
            .seed(self.seed)
            .oov(self.oov.into())
    }
}

fn read_all(path: &Path) -> io::Result<String> {
    if path.as_os_str() == "-" {
        use std::io::Read;
        let mut s = String::new();
        io::stdin().read_to_string(&mut s)?;
        Ok(s)
    } else {
        fs::read_to_string(path)
    }
}

fn write_all(path: &Path, data: &str) -> io::Result<()> {
    if path.as_os_str() == "-" {
        print!("{data}");
        Ok(())
    } else {
        fs::write(path, data)
    }
}

fn load(path: &Path, label: &str) -> anyhow::Result<DocumentSet> {
    let s = read_all(path).with_context(|| format!("reading {label} file {}", path.display()))?;
    parse_documents(&s).with_context(|| format!("parsing {label} file {}", path.display()))
}

fn run(args: &Args, out: &mut impl Write) -> anyhow::Result<()> {
    let config = args.config();
    config.validate()?;
    let train = load(&args.train, "train")?;
    let test = load(&args.test, "test")?;

    let mut sampler = Sampler::new(&train, &test, config)?;
    let mut io_err = None;
    let reports = sampler.run_with(|r| {
        match writeln!(out, "{} {}", r.train_log_likelihood, r.test_log_likelihood).and_then(|_| out.flush()) {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => {
                io_err = Some(e);
                ControlFlow::Break(())
            }
        }
    })?;
    if let Some(e) = io_err {
        return Err(e).context("writing log-likelihoods");
    }

    let (train_est, test_est) = sampler.final_estimates();
    let report = write_report(&reports, sampler.train().vocabulary(), &train_est, &test_est);
    write_all(&args.output, &report).with_context(|| format!("writing report {}", args.output.display()))?;
    log::info!("report written to {}", args.output.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let stdout = io::stdout();
    run(&args, &mut stdout.lock())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_for(dir: &Path, extra: &[&str]) -> Args {
        let train = dir.join("train.txt");
        let test = dir.join("test.txt");
        fs::write(&train, "0 a b a\n1 b c b\n").unwrap();
        fs::write(&test, "0 a c\n").unwrap();
        let output = dir.join("out.txt");
        let mut argv = vec![
            "ccmix".to_string(),
            train.display().to_string(),
            test.display().to_string(),
            output.display().to_string(),
        ];
        argv.extend(["2", "0.5", "0.1", "0.01", "5", "2"].map(String::from));
        argv.extend(extra.iter().map(|s| s.to_string()));
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn prints_one_line_per_iteration_and_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let args = args_for(dir.path(), &["--seed", "3"]);
        let mut out = Vec::new();
        run(&args, &mut out).unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed.lines().count(), 5);
        for line in printed.lines() {
            let values: Vec<f64> = line.split_whitespace().map(|v| v.parse().unwrap()).collect();
            assert_eq!(values.len(), 2);
            assert!(values.iter().all(|v| v.is_finite() && *v < 0.0));
        }

        let report = fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert!(report.starts_with("# log-likelihood 5\n"));
        assert!(report.contains("# vocabulary 3\na b c\n"));
    }

    #[test]
    fn fails_fast_on_missing_or_bad_arguments() {
        assert!(Args::try_parse_from(["ccmix", "train.txt", "test.txt", "out.txt", "2", "0.5", "0.1", "0.01", "5"]).is_err());
        assert!(Args::try_parse_from(["ccmix", "a", "b", "c", "two", "0.5", "0.1", "0.01", "5", "2"]).is_err());
        assert!(Args::try_parse_from(["ccmix", "a", "b", "c", "2", "0.5", "0.1", "0.01", "5", "x"]).is_err());
    }

    #[test]
    fn rejects_out_of_range_values_before_reading_files() {
        let args = Args::try_parse_from(["ccmix", "missing", "missing", "out", "2", "1.5", "0.1", "0.01", "5", "2"]).unwrap();
        let err = run(&args, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("lambda"));
    }

    #[test]
    fn reject_policy_surfaces_unknown_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let args = args_for(dir.path(), &["--oov", "reject"]);
        fs::write(&args.test, "0 a zebra\n").unwrap();
        let err = run(&args, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("zebra"));
    }
}
