//! Model catalog entries and the helpers the model pickers use.

use serde::{Deserialize, Deserializer, Serialize};

/// USD per token for prompt and completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    #[serde(default, deserialize_with = "price_from_str_or_number")]
    pub prompt: f64,
    #[serde(default, deserialize_with = "price_from_str_or_number")]
    pub completion: f64,
}

/// The models endpoint sends prices as decimal strings ("0.0000015").
fn price_from_str_or_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
        Null,
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Num(n) => n,
        Raw::Str(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Raw::Null => 0.0,
    })
}

/// A usable model as shown in pickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pricing: Option<Pricing>,
    /// Everything in `id` before the first `/`.
    pub provider: String,
    #[serde(default)]
    pub context_length: Option<u64>,
}

impl ModelCatalogEntry {
    pub fn provider_of(id: &str) -> String {
        id.split('/').next().unwrap_or(id).to_string()
    }

    /// "Name (In:$0.50 Out:$1.50)" as used by the pickers.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, format_pricing(self.pricing.as_ref(), false))
    }
}

fn per_million(price: f64) -> String {
    if price > 0.0 {
        format!("${:.2}", price * 1_000_000.0)
    } else {
        "N/A".to_string()
    }
}

pub fn format_pricing(pricing: Option<&Pricing>, verbose: bool) -> String {
    let Some(pricing) = pricing else {
        return "Pricing unavailable".to_string();
    };
    let prompt = per_million(pricing.prompt);
    let completion = per_million(pricing.completion);
    if verbose {
        format!(
            "Input: {} per million tokens\nOutput: {} per million tokens",
            prompt, completion
        )
    } else {
        format!("In:{} Out:{}", prompt, completion)
    }
}

/// Case-insensitive match against the visible label text or the description.
pub fn filter_models<'a>(models: &'a [ModelCatalogEntry], query: &str) -> Vec<&'a ModelCatalogEntry> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return models.iter().collect();
    }
    models
        .iter()
        .filter(|m| {
            let shown = format!(
                "{} {} {}",
                m.name,
                m.provider,
                format_pricing(m.pricing.as_ref(), false)
            )
            .to_lowercase();
            shown.contains(&query) || m.description.to_lowercase().contains(&query)
        })
        .collect()
}

/// Case-insensitive ordering key for display names.
pub fn name_key(model: &ModelCatalogEntry) -> String {
    model.name.to_lowercase()
}

/// The user's enabled subset, sorted by display name.
pub fn enabled_models<'a>(
    models: &'a [ModelCatalogEntry],
    selected: &[String],
) -> Vec<&'a ModelCatalogEntry> {
    let mut out: Vec<_> = models
        .iter()
        .filter(|m| selected.iter().any(|s| s == &m.id))
        .collect();
    out.sort_by_cached_key(|m| name_key(m));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, name: &str, prompt: f64, completion: f64) -> ModelCatalogEntry {
        ModelCatalogEntry {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{} description", name),
            pricing: Some(Pricing { prompt, completion }),
            provider: ModelCatalogEntry::provider_of(id),
            context_length: None,
        }
    }

    #[test]
    fn test_pricing_accepts_strings_and_numbers() {
        let p: Pricing = serde_json::from_str(r#"{"prompt":"0.0000005","completion":0.0000015}"#).unwrap();
        assert!((p.prompt - 0.0000005).abs() < 1e-12);
        assert!((p.completion - 0.0000015).abs() < 1e-12);
    }

    #[test]
    fn test_format_pricing() {
        let p = Pricing {
            prompt: 0.0000005,
            completion: 0.0000015,
        };
        assert_eq!(format_pricing(Some(&p), false), "In:$0.50 Out:$1.50");
        assert_eq!(
            format_pricing(Some(&p), true),
            "Input: $0.50 per million tokens\nOutput: $1.50 per million tokens"
        );
        assert_eq!(format_pricing(None, false), "Pricing unavailable");
        assert_eq!(format_pricing(Some(&Pricing::default()), false), "In:N/A Out:N/A");
    }

    #[test]
    fn test_provider_is_prefix_before_slash() {
        assert_eq!(ModelCatalogEntry::provider_of("openai/gpt-4o"), "openai");
        assert_eq!(ModelCatalogEntry::provider_of("standalone"), "standalone");
    }

    #[test]
    fn test_filter_models_matches_provider_and_description() {
        let models = vec![
            entry("openai/gpt-4o", "GPT-4o", 0.000005, 0.000015),
            entry("anthropic/claude-3-haiku", "Claude 3 Haiku", 0.00000025, 0.00000125),
        ];
        let hits = filter_models(&models, "ANTHROPIC");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "anthropic/claude-3-haiku");

        let hits = filter_models(&models, "gpt-4o description");
        assert_eq!(hits.len(), 1);
        assert_eq!(filter_models(&models, "").len(), 2);
    }

    #[test]
    fn test_enabled_models_sorted_by_name() {
        let models = vec![
            entry("z/zeta", "Zeta", 0.0, 0.0),
            entry("a/alpha", "Alpha", 0.0, 0.0),
            entry("m/mid", "Mid", 0.0, 0.0),
        ];
        let selected = vec!["z/zeta".to_string(), "a/alpha".to_string()];
        let names: Vec<_> = enabled_models(&models, &selected)
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn test_name_order_ignores_case() {
        let models = vec![
            entry("x/beta", "beta", 0.0, 0.0),
            entry("x/alpha", "Alpha", 0.0, 0.0),
            entry("x/zulu", "Zulu", 0.0, 0.0),
            entry("x/charlie", "charlie", 0.0, 0.0),
        ];
        let selected: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
        let names: Vec<_> = enabled_models(&models, &selected)
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["Alpha", "beta", "charlie", "Zulu"]);
    }
}
