// [apps/guardian/src/probes/ai_fixtures.rs]
//! Standardized inputs shared by every AI-collaborator probe, so that a
//! failure is attributable to the collaborator and never to the probe
//! picking a different prompt each run (`spec.md` §4.2).

use once_cell::sync::Lazy;

/// Deterministic prompt for chat-completion style probes (`spec.md` §4.2:
/// "Standardized AI inputs are constants; user-supplied prompts are not
/// accepted").
pub const CHAT_PROMPT: &str = "What is 2+2? Reply with just the number.";

/// Substring the chat probe looks for in a successful completion. Models are
/// not required to echo the prompt verbatim, only to demonstrate the
/// collaborator round-tripped a real completion.
pub const CHAT_EXPECTED_SUBSTRING: &str = "4";

/// Deterministic text embedded by every embedding probe.
pub const EMBEDDING_INPUT: &str = "The quick brown fox jumps over the lazy dog.";

/// Minimum vector length considered a plausible embedding response; anything
/// shorter suggests a truncated or error payload disguised as success.
pub const EMBEDDING_MIN_DIMENSIONS: usize = 8;

/// A ~50 KB PNG of labelled geometric shapes, bundled with the binary and
/// never user-replaceable (`spec.md` §6). Vision probes send this image
/// unchanged on every run.
pub static VISION_IMAGE_BYTES: &[u8] = include_bytes!("../../static/test-assets/test-image.png");

/// Base64 form of [`VISION_IMAGE_BYTES`], computed once and reused by every
/// vision probe invocation rather than re-encoded per request.
pub static VISION_IMAGE_BASE64: Lazy<String> = Lazy::new(|| {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(VISION_IMAGE_BYTES)
});

/// Prompt paired with [`VISION_IMAGE_BASE64`] for vision-capable chat probes.
pub const VISION_PROMPT: &str = "Describe what you see in this image in one sentence.";

/// Deterministic document fed to document-intelligence probes. Small enough
/// to embed inline rather than bundling a second binary fixture.
pub const DOCINTEL_SAMPLE_TEXT: &str = "Invoice #GUARDIAN-0001\nTotal: $42.00\nDate: 2024-01-01\n";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vision_image_is_nonempty_and_base64_decodes_back() {
        use base64::Engine;
        assert!(!VISION_IMAGE_BYTES.is_empty());
        let decoded = base64::engine::general_purpose::STANDARD.decode(VISION_IMAGE_BASE64.as_str()).unwrap();
        assert_eq!(decoded, VISION_IMAGE_BYTES);
    }
}
