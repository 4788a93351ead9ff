use serde::{Deserialize, Serialize};

/// Sampling parameters forwarded verbatim to the completion endpoint.
///
/// The field names match the llama.cpp server `/completion` body so the
/// struct can be flattened straight into the request. Every field falls back
/// to its default when absent from the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    pub stream: bool,
    pub n_predict: i64,
    pub temperature: f64,
    pub stop: Vec<String>,
    pub repeat_last_n: i64,
    pub repeat_penalty: f64,
    pub penalize_nl: bool,
    pub top_k: i64,
    pub top_p: f64,
    pub min_p: f64,
    pub tfs_z: f64,
    pub typical_p: f64,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    pub mirostat: i64,
    pub mirostat_tau: f64,
    pub mirostat_eta: f64,
    pub grammar: String,
    pub n_probs: i64,
    pub min_keep: i64,
    pub image_data: Vec<serde_json::Value>,
    pub cache_prompt: bool,
    pub api_key: String,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            stream: false,
            n_predict: 400,
            temperature: 0.7,
            stop: vec![
                "</s>".to_string(),
                "\u{415}\u{432}\u{430}:".to_string(),
                "\u{413}\u{435}\u{43e}\u{440}\u{433}\u{438}\u{439}:".to_string(),
                "User:".to_string(),
            ],
            repeat_last_n: 256,
            repeat_penalty: 1.18,
            penalize_nl: false,
            top_k: 40,
            top_p: 0.95,
            min_p: 0.05,
            tfs_z: 1.0,
            typical_p: 1.0,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            mirostat: 0,
            mirostat_tau: 5.0,
            mirostat_eta: 0.1,
            grammar: String::new(),
            n_probs: 0,
            min_keep: 0,
            image_data: Vec::new(),
            cache_prompt: true,
            api_key: String::new(),
        }
    }
}
