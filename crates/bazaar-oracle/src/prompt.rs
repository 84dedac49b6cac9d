//! Prompt template loading and rendering via `minijinja`.
//!
//! Two templates make up a prompt: `system.j2` sets the merchant's persona
//! and the reply format, `negotiation.j2` describes the item, the player,
//! the conversation so far, and the offer. Both ship compiled into the
//! crate; a directory with files of the same names overrides them so
//! writers can tune merchant voices without recompiling.

use std::fmt;

use minijinja::Environment;

use bazaar_pricing::{RelationshipTier, round_price};
use bazaar_types::NegotiationContext;

use crate::error::OracleError;

const TEMPLATE_NAMES: [&str; 2] = ["system", "negotiation"];

const BUILTIN_SYSTEM: &str = include_str!("../templates/system.j2");
const BUILTIN_NEGOTIATION: &str = include_str!("../templates/negotiation.j2");

/// The rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// Persona and output contract.
    pub system: String,
    /// The situation being judged.
    pub user: String,
}

/// Holds the negotiation prompt templates.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl fmt::Debug for PromptEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptEngine").finish_non_exhaustive()
    }
}

impl PromptEngine {
    /// Engine using the templates compiled into the crate.
    pub fn builtin() -> Result<Self, OracleError> {
        Self::from_sources(BUILTIN_SYSTEM.to_owned(), BUILTIN_NEGOTIATION.to_owned())
    }

    /// Engine loading `system.j2` and `negotiation.j2` from a directory.
    pub fn from_dir(templates_dir: &str) -> Result<Self, OracleError> {
        let system = load_template(templates_dir, "system.j2")?;
        let negotiation = load_template(templates_dir, "negotiation.j2")?;
        Self::from_sources(system, negotiation)
    }

    /// Engine from an optional directory, falling back to the built-ins.
    pub fn from_optional_dir(templates_dir: Option<&str>) -> Result<Self, OracleError> {
        templates_dir.map_or_else(Self::builtin, Self::from_dir)
    }

    fn from_sources(system: String, negotiation: String) -> Result<Self, OracleError> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATE_NAMES.into_iter().zip([system, negotiation]) {
            env.add_template_owned(name, source).map_err(|e| {
                OracleError::Template(format!("failed to add {name} template: {e}"))
            })?;
        }
        Ok(Self { env })
    }

    /// Render the prompt for one negotiation round.
    pub fn render(&self, context: &NegotiationContext) -> Result<RenderedPrompt, OracleError> {
        let vars = template_vars(context)?;
        Ok(RenderedPrompt {
            system: self.render_one("system", &vars)?,
            user: self.render_one("negotiation", &vars)?,
        })
    }

    fn render_one(&self, name: &str, vars: &serde_json::Value) -> Result<String, OracleError> {
        self.env
            .get_template(name)
            .map_err(|e| OracleError::Template(format!("missing {name} template: {e}")))?
            .render(vars)
            .map_err(|e| OracleError::Template(format!("{name} render failed: {e}")))
    }
}

/// Flatten the context into template variables, adding the derived values
/// the templates display.
fn template_vars(context: &NegotiationContext) -> Result<serde_json::Value, OracleError> {
    let mut vars = serde_json::to_value(context)
        .map_err(|e| OracleError::Template(format!("context serialization failed: {e}")))?;

    let shared_language = context
        .merchant
        .languages
        .iter()
        .find(|lang| context.skills.language_level(lang) > 0);

    if let Some(map) = vars.as_object_mut() {
        map.insert(
            "personality".to_owned(),
            context.merchant.personality.description().into(),
        );
        map.insert(
            "resistance_percent".to_owned(),
            resistance_percent(context.merchant.haggle_resistance).into(),
        );
        map.insert(
            "stubbornness".to_owned(),
            stubbornness(context.merchant.haggle_resistance).into(),
        );
        map.insert(
            "tier".to_owned(),
            RelationshipTier::from_score(context.relationship_score).as_str().into(),
        );
        map.insert(
            "rarity".to_owned(),
            format!("{:?}", context.item.rarity).into(),
        );
        map.insert(
            "categories".to_owned(),
            context
                .item
                .categories
                .iter()
                .map(|c| format!("{c:?}"))
                .collect::<Vec<_>>()
                .into(),
        );
        map.insert(
            "ratio_percent".to_owned(),
            round_price(context.price_ratio() * 100.0).into(),
        );
        map.insert(
            "shared_language".to_owned(),
            shared_language.cloned().into(),
        );
    }
    Ok(vars)
}

/// Haggle resistance as a whole percentage in `[0, 100]`.
fn resistance_percent(resistance: f64) -> u32 {
    let percent = if resistance.is_finite() {
        (resistance.clamp(0.0, 1.0) * 100.0).round()
    } else {
        50.0
    };
    // Clamped into [0, 100] above.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let percent = percent as u32;
    percent
}

/// Plain-words label for a haggle resistance in `[0, 1]`.
fn stubbornness(resistance: f64) -> &'static str {
    if resistance < 0.34 {
        "easily swayed"
    } else if resistance < 0.67 {
        "firm but fair"
    } else {
        "very stubborn"
    }
}

/// Read a template file from disk.
fn load_template(dir: &str, filename: &str) -> Result<String, OracleError> {
    let path = std::path::Path::new(dir).join(filename);
    std::fs::read_to_string(&path)
        .map_err(|e| OracleError::Template(format!("failed to read {}: {e}", path.display())))
}
