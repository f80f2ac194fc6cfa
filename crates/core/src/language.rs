//! Language code registry and validation.

use crate::error::PipelineError;

/// Language codes the pipeline serves end to end (speech recognition,
/// translation, and a synthesis voice all exist for each).
pub const SUPPORTED_LANGUAGES: [&str; 13] = [
    "hi", "bn", "ta", "te", "mr", "gu", "kn", "ml", "pa", "or", "as", "ur", "en",
];

/// Maximum length of a language code.
const MAX_CODE_LEN: usize = 16;

/// Whether a code is in the supported registry.
pub fn is_supported(code: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&code)
}

/// Validate a single language code.
///
/// Rules:
/// - Must not be empty.
/// - Must not exceed `MAX_CODE_LEN` characters.
/// - Must contain only ASCII alphanumeric or hyphen characters.
/// - When `strict`, must be in [`SUPPORTED_LANGUAGES`].
pub fn validate_code(code: &str, strict: bool) -> Result<(), PipelineError> {
    if code.is_empty() {
        return Err(PipelineError::Validation(
            "Language code must not be empty".to_string(),
        ));
    }
    if code.len() > MAX_CODE_LEN {
        return Err(PipelineError::Validation(format!(
            "Language code must not exceed {MAX_CODE_LEN} characters"
        )));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(PipelineError::Validation(
            "Language code may only contain alphanumeric or hyphen characters".to_string(),
        ));
    }
    if strict && !is_supported(code) {
        return Err(PipelineError::Validation(format!(
            "Unsupported language code: \"{code}\""
        )));
    }
    Ok(())
}

/// Validate a source/target language pair.
///
/// Both codes must pass [`validate_code`] and must differ from each other.
pub fn validate_pair(from: &str, to: &str, strict: bool) -> Result<(), PipelineError> {
    validate_code(from, strict)?;
    validate_code(to, strict)?;
    if from == to {
        return Err(PipelineError::Validation(
            "Source and target language must differ".to_string(),
        ));
    }
    Ok(())
}
