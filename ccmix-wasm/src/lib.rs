use ccmix_core::{parse_documents, write_report, Sampler, SamplerConfig};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct FitOutput {
    train_log_likelihoods: Vec<f64>,
    test_log_likelihoods: Vec<f64>,
    report: String,
}

#[wasm_bindgen]
impl FitOutput {
    #[wasm_bindgen(getter)]
    pub fn train_log_likelihoods(&self) -> Vec<f64> {
        self.train_log_likelihoods.clone()
    }
    #[wasm_bindgen(getter)]
    pub fn test_log_likelihoods(&self) -> Vec<f64> {
        self.test_log_likelihoods.clone()
    }
    #[wasm_bindgen(getter)]
    pub fn report(&self) -> String {
        self.report.clone()
    }
}

fn fit(
    train_text: &str,
    test_text: &str,
    config: SamplerConfig,
) -> Result<FitOutput, String> {
    let train = parse_documents(train_text).map_err(|e| format!("train: {e}"))?;
    let test = parse_documents(test_text).map_err(|e| format!("test: {e}"))?;
    let mut sampler = Sampler::new(&train, &test, config).map_err(|e| e.to_string())?;
    let reports = sampler.run().map_err(|e| e.to_string())?;
    let (train_est, test_est) = sampler.final_estimates();
    Ok(FitOutput {
        train_log_likelihoods: reports.iter().map(|r| r.train_log_likelihood).collect(),
        test_log_likelihoods: reports.iter().map(|r| r.test_log_likelihood).collect(),
        report: write_report(&reports, sampler.train().vocabulary(), &train_est, &test_est),
    })
}

#[wasm_bindgen]
pub fn fit_plaintext(
    train_text: &str,
    test_text: &str,
    num_topics: usize,
    lambda: f64,
    alpha: f64,
    beta: f64,
    num_iters: usize,
    burn_in: usize,
    seed: u64,
) -> Result<FitOutput, JsValue> {
    let config = SamplerConfig::new(num_topics)
        .lambda(lambda)
        .alpha(alpha)
        .beta(beta)
        .num_iters(num_iters)
        .burn_in(burn_in)
        .seed(seed);
    fit(train_text, test_text, config).map_err(|e| JsValue::from_str(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_returns_one_value_per_iteration() {
        let config = SamplerConfig::new(2).lambda(0.5).alpha(0.1).beta(0.01).num_iters(4).burn_in(1);
        let out = fit("0 a b a\n1 b c b\n", "0 a c\n", config).unwrap();
        assert_eq!(out.train_log_likelihoods.len(), 4);
        assert_eq!(out.test_log_likelihoods.len(), 4);
        assert!(out.report.starts_with("# log-likelihood 4\n"));
    }

    #[test]
    fn fit_reports_parse_errors() {
        let err = fit("7 a b\n", "0 a\n", SamplerConfig::new(2).num_iters(1).burn_in(0)).err().unwrap();
        assert!(err.starts_with("train: "));
    }
}
