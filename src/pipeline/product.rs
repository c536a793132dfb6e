//! Product description input.

use serde::{Deserialize, Serialize};

/// The immutable input to a pipeline run.
///
/// Created once per run from user input and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDescription {
    /// Product name.
    pub name: String,
    /// Long-form product description.
    pub description: String,
    /// Target audience.
    pub target_audience: String,
    /// Price, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// The problem the product solves.
    pub problem_solved: String,
    /// What differentiates the product.
    pub differentiation: String,
    /// Free-text extras supplied by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<String>,
}

impl ProductDescription {
    /// Renders the product as labeled prompt sections.
    ///
    /// Optional fields are omitted entirely rather than rendered empty.
    pub fn render_for_prompt(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Product name: {}\n", self.name));
        out.push_str(&format!("Description: {}\n", self.description));
        out.push_str(&format!("Target audience: {}\n", self.target_audience));
        if let Some(price) = &self.price {
            out.push_str(&format!("Price: {}\n", price));
        }
        out.push_str(&format!("Problem solved: {}\n", self.problem_solved));
        out.push_str(&format!("Differentiation: {}\n", self.differentiation));
        if let Some(extras) = &self.extras {
            out.push_str(&format!("Additional notes: {}\n", extras));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProductDescription {
        ProductDescription {
            name: "SleepWell Tea".to_string(),
            description: "A calming herbal tea blend".to_string(),
            target_audience: "Adults with trouble sleeping".to_string(),
            price: None,
            problem_solved: "Restless nights".to_string(),
            differentiation: "Organic, caffeine-free blend".to_string(),
            extras: None,
        }
    }

    #[test]
    fn optional_fields_omitted_from_rendering() {
        let rendered = sample().render_for_prompt();
        assert!(rendered.contains("Product name: SleepWell Tea"));
        assert!(!rendered.contains("Price:"));
        assert!(!rendered.contains("Additional notes:"));
    }

    #[test]
    fn price_rendered_when_present() {
        let mut product = sample();
        product.price = Some("$19.99".to_string());
        assert!(product.render_for_prompt().contains("Price: $19.99"));
    }
}
