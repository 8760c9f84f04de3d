use std::collections::HashMap;
use std::ffi::CString;

use anyhow::{Context, Result};
use async_trait::async_trait;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use tracing::{debug, info, warn};

use super::{SentimentModel, SentimentScores};

pub const DEFAULT_MODEL: &str = "ProsusAI/finbert";

/// Loads a transformers text-classification pipeline and exposes `classify(text)`
/// returning `{label: probability}` for every label. Inputs are truncated to
/// the model's 512-token window.
const SETUP: &str = r#"
from transformers import pipeline

_classifier = pipeline("text-classification", model=MODEL_NAME, top_k=None)

def classify(text):
    out = _classifier(text, truncation=True, max_length=512)
    while isinstance(out, list) and out and isinstance(out[0], list):
        out = out[0]
    return {d["label"].lower(): float(d["score"]) for d in out}
"#;

struct ScoreRequest {
    text: String,
    reply: std::sync::mpsc::Sender<Result<SentimentScores>>,
}

/// A FinBERT classifier living on a dedicated Python thread.
/// The model is loaded once; requests are served over std channels.
pub struct FinbertSession {
    tx: std::sync::mpsc::Sender<ScoreRequest>,
    model_name: String,
}

impl FinbertSession {
    /// Start the Python thread and wait until the model has loaded.
    pub async fn spawn(model_name: &str) -> Result<Self> {
        let (tx, rx) = std::sync::mpsc::channel::<ScoreRequest>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<()>>();
        let name = model_name.to_string();

        std::thread::spawn(move || {
            Python::with_gil(|py| {
                let globals = PyDict::new(py);
                if let Err(e) = load_classifier(py, &globals, &name) {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                debug!(model = %name, "Sentiment session ready");
                // Plain OS-level blocking recv, outside any tokio runtime.
                while let Ok(req) = rx.recv() {
                    let result = classify(&globals, &req.text);
                    let _ = req.reply.send(result);
                }
                debug!(model = %name, "Sentiment session shutting down");
            });
        });

        info!(model = model_name, "Loading sentiment model...");
        tokio::task::spawn_blocking(move || {
            ready_rx
                .recv()
                .map_err(|_| anyhow::anyhow!("Sentiment thread exited during start-up"))?
        })
        .await??;
        info!(model = model_name, "Sentiment model loaded");

        Ok(Self {
            tx,
            model_name: model_name.to_string(),
        })
    }
}

#[async_trait]
impl SentimentModel for FinbertSession {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn score(&self, text: &str) -> Result<SentimentScores> {
        let (reply_tx, reply_rx) = std::sync::mpsc::channel();
        self.tx
            .send(ScoreRequest {
                text: text.to_string(),
                reply: reply_tx,
            })
            .map_err(|_| anyhow::anyhow!("Sentiment thread died"))?;

        // Await reply without blocking the tokio runtime
        tokio::task::spawn_blocking(move || {
            reply_rx
                .recv()
                .map_err(|_| anyhow::anyhow!("Sentiment reply channel closed"))?
        })
        .await?
    }
}

fn load_classifier(py: Python<'_>, globals: &Bound<'_, PyDict>, model_name: &str) -> Result<()> {
    globals.set_item("MODEL_NAME", model_name)?;
    let code = CString::new(SETUP).context("Invalid setup script")?;
    py.run(&code, Some(globals), None)
        .with_context(|| format!("Failed to load {}", model_name))?;
    Ok(())
}

fn classify(globals: &Bound<'_, PyDict>, text: &str) -> Result<SentimentScores> {
    let func = globals
        .get_item("classify")?
        .context("classify() missing from session")?;
    let probs: HashMap<String, f64> = func.call1((text,))?.extract()?;
    scores_from_labels(&probs)
}

/// Map label probabilities onto the three sentiment classes.
fn scores_from_labels(probs: &HashMap<String, f64>) -> Result<SentimentScores> {
    let get = |label: &str| probs.get(label).copied().unwrap_or(0.0);
    let scores = SentimentScores {
        positive: get("positive"),
        negative: get("negative"),
        neutral: get("neutral"),
    };
    if scores.positive + scores.negative + scores.neutral <= 0.0 {
        warn!(labels = ?probs.keys().collect::<Vec<_>>(), "Unexpected sentiment labels");
        anyhow::bail!("Model returned no positive/negative/neutral scores");
    }
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_from_labels() {
        let probs = HashMap::from([
            ("positive".to_string(), 0.7),
            ("negative".to_string(), 0.1),
            ("neutral".to_string(), 0.2),
        ]);
        let scores = scores_from_labels(&probs).unwrap();
        assert_eq!(scores.positive, 0.7);
        assert_eq!(scores.neutral, 0.2);
    }

    #[test]
    fn test_unknown_labels_rejected() {
        let probs = HashMap::from([("label_0".to_string(), 1.0)]);
        assert!(scores_from_labels(&probs).is_err());
    }
}
