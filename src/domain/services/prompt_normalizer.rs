use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::domain::{DomainError, Normalization, NormalizationWarning, NormalizedPrompt};

/// Substituted when nothing usable survives normalization.
pub const FALLBACK_PROMPT: &str =
    "cinematic portrait, dramatic lighting, ultra-detailed, 8k, photorealistic, cinematic composition";

/// Lead-in phrases removed from the start of a paragraph, applied repeatedly.
/// Ordered longest-first within each alternation.
pub const DEFAULT_PREFIX_PATTERNS: &[&str] = &[
    r"(?i)^(?:sure thing|sure|certainly|of course|absolutely|okay|alright)\s*[,.!]+\s*",
    r"(?i)^(?:(?:sure|certainly|of course|okay)\s+)?(?:here\s+is|here\s+are|here['’]s|below\s+is)\b[^:\n]*:\s*",
    r"(?i)^(?:(?:final|positive|sdxl|cinematic|image|generated)\s+)*prompt\s*:\s*",
];

/// Trailing commentary removed from the end of the chosen paragraph.
pub const DEFAULT_SUFFIX_PATTERNS: &[&str] = &[
    r"(?is)\s*(?:let me know|i hope (?:this|that)|hope this helps|feel free to|happy (?:creating|generating|prompting))\b.*$",
    r"(?is)\s*negative\s+prompt\s*:.*$",
    r"(?s)\s*--neg\b.*$",
];

/// Fixpoint guard; real output settles after one or two passes.
const MAX_PASSES: usize = 4;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid think-block pattern"));
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*```[A-Za-z]*[ \t]*$").expect("valid fence pattern"));
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("valid paragraph pattern"));
static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[-*•+]|\d+[.)])[ \t]+").expect("valid list-marker pattern")
});
static BLOCKQUOTE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(?:>[ \t]*)+").expect("valid blockquote pattern"));
static HEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*#+[ \t]*").expect("valid heading pattern"));
static FRAGMENT_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)|[,;\n]").expect("valid fragment pattern"));

/// Boilerplate strip rules. The model's phrasing is not fixed, so callers can
/// extend the built-in lists.
#[derive(Debug, Clone)]
pub struct NormalizerRules {
    prefixes: Vec<Regex>,
    suffixes: Vec<Regex>,
}

impl Default for NormalizerRules {
    fn default() -> Self {
        Self {
            prefixes: compile_builtin(DEFAULT_PREFIX_PATTERNS),
            suffixes: compile_builtin(DEFAULT_SUFFIX_PATTERNS),
        }
    }
}

fn compile_builtin(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

impl NormalizerRules {
    /// Rules with no boilerplate patterns at all.
    pub fn empty() -> Self {
        Self {
            prefixes: Vec::new(),
            suffixes: Vec::new(),
        }
    }

    /// Add a prefix pattern. It only applies where it matches at the very
    /// start of the text.
    pub fn with_prefix(mut self, pattern: &str) -> Result<Self, DomainError> {
        self.prefixes.push(compile_user_pattern(pattern)?);
        Ok(self)
    }

    /// Add a suffix pattern. Everything from its first match to the end is dropped.
    pub fn with_suffix(mut self, pattern: &str) -> Result<Self, DomainError> {
        let extended = if pattern.ends_with('$') {
            pattern.to_string()
        } else {
            format!("(?s)(?:{}).*$", pattern)
        };
        self.suffixes.push(compile_user_pattern(&extended)?);
        Ok(self)
    }

    pub fn prefix_count(&self) -> usize {
        self.prefixes.len()
    }

    pub fn suffix_count(&self) -> usize {
        self.suffixes.len()
    }

    fn strip_prefixes(&self, text: &str) -> String {
        let mut current = text.trim().to_string();
        loop {
            let stripped = self
                .prefixes
                .iter()
                .find_map(|re| {
                    re.find(&current)
                        .filter(|m| m.start() == 0 && !m.is_empty())
                        .map(|m| current[m.end()..].trim_start().to_string())
                });
            match stripped {
                Some(next) => current = next,
                None => return current,
            }
        }
    }

    fn strip_suffixes(&self, text: &str) -> String {
        let mut current = text.to_string();
        for re in &self.suffixes {
            if let Some(m) = re.find(&current) {
                current.truncate(m.start());
            }
        }
        current.trim_end().to_string()
    }
}

fn compile_user_pattern(pattern: &str) -> Result<Regex, DomainError> {
    Regex::new(pattern)
        .map_err(|e| DomainError::invalid_input(format!("invalid strip pattern '{}': {}", pattern, e)))
}

/// Turns free-form model output into a single-line, comma-separated prompt.
///
/// Steps, per pass:
/// 1. drop `<think>` blocks and code fences;
/// 2. take the first paragraph that still has content after cleaning, so
///    trailing explanations after a blank line are ignored;
/// 3. remove markdown decorations, lead-in phrases and trailing commentary;
/// 4. split on sentence ends, commas, semicolons and line breaks, trim quotes
///    and punctuation off each fragment, and join with `", "`.
///
/// Passes repeat until the output stops changing, which makes the result a
/// fixpoint: normalizing a normalized prompt returns it unchanged.
#[derive(Debug, Clone)]
pub struct PromptNormalizer {
    rules: NormalizerRules,
    fallback: String,
}

impl Default for PromptNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptNormalizer {
    pub fn new() -> Self {
        Self {
            rules: NormalizerRules::default(),
            fallback: FALLBACK_PROMPT.to_string(),
        }
    }

    pub fn with_rules(mut self, rules: NormalizerRules) -> Self {
        self.rules = rules;
        self
    }

    /// Replace the placeholder prompt. A blank placeholder is ignored.
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        let fallback = fallback.into();
        let tagged = self.pass(&fallback);
        if !tagged.is_empty() {
            self.fallback = tagged;
        }
        self
    }

    pub fn fallback_prompt(&self) -> &str {
        &self.fallback
    }

    pub fn normalize(&self, raw_text: &str) -> Normalization {
        let mut current = self.pass(raw_text);
        for _ in 0..MAX_PASSES {
            let next = self.pass(&current);
            if next == current {
                break;
            }
            current = next;
        }

        if current.is_empty() {
            warn!(
                "Normalization produced an empty prompt ({} raw chars); using placeholder",
                raw_text.len()
            );
            return Normalization {
                prompt: NormalizedPrompt::new(self.fallback.clone()),
                warning: Some(NormalizationWarning::Fallback),
            };
        }

        debug!("Normalized prompt: {}", current);
        Normalization {
            prompt: NormalizedPrompt::new(current),
            warning: None,
        }
    }

    /// Clean a prose answer without converting it to tags: boilerplate and
    /// decorations are removed and the first paragraph is collapsed to one line.
    pub fn clean_text(&self, raw_text: &str) -> String {
        let text = preprocess(raw_text);
        for paragraph in PARAGRAPH_BREAK.split(&text) {
            let body = self.strip_boilerplate(paragraph);
            let line = body.split_whitespace().collect::<Vec<_>>().join(" ");
            let line = line
                .trim_matches(|c: char| is_edge_noise(c) && c != '!' && c != '?')
                .to_string();
            if !line.is_empty() {
                return line;
            }
        }
        String::new()
    }

    fn pass(&self, raw_text: &str) -> String {
        let text = preprocess(raw_text);
        for paragraph in PARAGRAPH_BREAK.split(&text) {
            let body = self.strip_boilerplate(paragraph);
            let tags = tagify(&body);
            if !tags.is_empty() {
                return tags;
            }
        }
        String::new()
    }

    fn strip_boilerplate(&self, paragraph: &str) -> String {
        let undecorated = strip_decorations(paragraph);
        let body = self.rules.strip_prefixes(&undecorated);
        self.rules.strip_suffixes(&body)
    }
}

fn preprocess(raw_text: &str) -> String {
    let text = raw_text.replace("\r\n", "\n");
    let text = THINK_BLOCK.replace_all(&text, "");
    CODE_FENCE.replace_all(&text, "").into_owned()
}

fn strip_decorations(paragraph: &str) -> String {
    let text = BLOCKQUOTE_MARKER.replace_all(paragraph, "");
    let text = LIST_MARKER.replace_all(&text, "");
    let text = HEADING_MARKER.replace_all(&text, "");
    text.replace("__", "").replace(['*', '`'], "")
}

/// Underscores only count at fragment edges so tags like `film_grain` survive.
fn is_edge_noise(c: char) -> bool {
    c.is_whitespace()
        || matches!(c, '"' | '\'' | '“' | '”' | '‘' | '’' | '_' | '.' | ',' | ':' | ';' | '!' | '?')
}

fn tagify(body: &str) -> String {
    FRAGMENT_SPLIT
        .split(body)
        .map(|fragment| {
            let collapsed = fragment.split_whitespace().collect::<Vec<_>>().join(" ");
            collapsed.trim_matches(is_edge_noise).to_string()
        })
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
