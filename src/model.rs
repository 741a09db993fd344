//! Model name resolution.

/// Short name aliases for the Gemini models this relay talks to.
const ALIASES: &[(&str, &str)] = &[
    ("nano-banana", "gemini-2.5-flash-image"),
    ("nano-banana-pro", "gemini-3-pro-image-preview"),
    ("flash", "gemini-2.5-flash"),
    ("pro", "gemini-2.5-pro"),
];

/// Resolve a model name (alias or exact) to the full model identifier.
#[must_use]
pub fn resolve_model(name: &str) -> String {
    for &(alias, full) in ALIASES {
        if name == alias {
            return full.to_string();
        }
    }
    name.to_string()
}

/// Check that a resolved name addresses a Gemini model.
///
/// # Errors
///
/// Returns an error if the model name doesn't start with `gemini`.
pub fn validate_gemini_model(model: &str) -> Result<(), String> {
    if model.starts_with("gemini") {
        Ok(())
    } else {
        Err(format!("Unknown model '{model}'. Expected a 'gemini-*' model or a known alias."))
    }
}

/// Resolved model identifiers used by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoles {
    /// Text model: summaries, grounding, document extraction.
    pub text: String,
    /// Image model: generation and editing.
    pub image: String,
}

impl ModelRoles {
    /// Resolve both roles from configured names.
    ///
    /// # Errors
    ///
    /// Returns an error if either name is not a Gemini model.
    pub fn resolve(text: &str, image: &str) -> Result<Self, String> {
        let text = resolve_model(text);
        let image = resolve_model(image);
        validate_gemini_model(&text)?;
        validate_gemini_model(&image)?;
        Ok(Self { text, image })
    }
}
