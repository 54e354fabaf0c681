use crate::domain::preset::PresetsDocument;
use anyhow::Context;

/// Loads the presets document from an `http(s)` URL or a local path.
pub async fn load_presets(http: &reqwest::Client, source: &str) -> anyhow::Result<PresetsDocument> {
    let text = if is_url(source) {
        let res = http
            .get(source)
            .send()
            .await
            .with_context(|| format!("presets request failed: {source}"))?;
        let status = res.status();
        let text = res.text().await.context("failed to read presets response")?;
        if !status.is_success() {
            anyhow::bail!("presets HTTP {status}: {source}");
        }
        text
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("failed to read presets file {source}"))?
    };

    parse_presets(&text).with_context(|| format!("invalid presets document at {source}"))
}

pub fn parse_presets(text: &str) -> anyhow::Result<PresetsDocument> {
    let doc = serde_json::from_str::<PresetsDocument>(text)?;
    for preset in &doc.presets {
        anyhow::ensure!(!preset.id.trim().is_empty(), "preset id must be non-empty");
    }
    Ok(doc)
}

fn is_url(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
