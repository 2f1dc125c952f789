//! Generator variants and their domain-specific controls.
//!
//! Every variant shares the same mechanics (prompting, streaming, extraction,
//! history); they differ in persona text and in which [`GenerationOptions`]
//! fields they care about.

use serde::{Deserialize, Serialize};

/// Opening delimiter the personas ask the model to emit.
pub const OPEN_TAG: &str = "<markdown_code>";
/// Closing delimiter the personas ask the model to emit.
pub const CLOSE_TAG: &str = "</markdown_code>";

const OUTPUT_RULES: &str = "\
Output format rules (always follow them):
- Put the complete generated artifact between <markdown_code> and </markdown_code>.
- Emit exactly one such block per reply, containing the whole artifact, not a diff.
- Do not wrap the block in additional code fences.
- Keep any explanation short and outside the tags.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    ProfileReadme,
    CodeSnippet,
    AnimatedSvg,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::ProfileReadme => "profile-readme",
            Variant::CodeSnippet => "code-snippet",
            Variant::AnimatedSvg => "animated-svg",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "profile-readme" | "readme" | "profile" => Some(Variant::ProfileReadme),
            "code-snippet" | "snippet" | "code" => Some(Variant::CodeSnippet),
            "animated-svg" | "svg" | "animation" => Some(Variant::AnimatedSvg),
            _ => None,
        }
    }

    pub fn all() -> Vec<Variant> {
        vec![Variant::ProfileReadme, Variant::CodeSnippet, Variant::AnimatedSvg]
    }

    pub fn next(&self) -> Variant {
        match self {
            Variant::ProfileReadme => Variant::CodeSnippet,
            Variant::CodeSnippet => Variant::AnimatedSvg,
            Variant::AnimatedSvg => Variant::ProfileReadme,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Variant::ProfileReadme => "Profile README",
            Variant::CodeSnippet => "Code Snippet",
            Variant::AnimatedSvg => "Animated SVG",
        }
    }

    /// Name of the persisted session blob for this variant.
    pub fn storage_key(&self) -> &'static str {
        match self {
            Variant::ProfileReadme => "profile_readme_state",
            Variant::CodeSnippet => "code_snippet_state",
            Variant::AnimatedSvg => "animated_svg_state",
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            Variant::ProfileReadme => {
                "e.g. Backend dev who loves Rust and Go, show my stats and a short bio"
            }
            Variant::CodeSnippet => "e.g. A function that debounces calls with a configurable delay",
            Variant::AnimatedSvg => "e.g. A typing banner that says 'Hi, I'm Sam' in neon green",
        }
    }

    /// File the "apply" action writes the current artifact to.
    pub fn default_file_name(&self, options: &GenerationOptions) -> String {
        match self {
            Variant::ProfileReadme => "README.md".to_string(),
            Variant::CodeSnippet => format!("snippet.{}", options.target_language.extension()),
            Variant::AnimatedSvg => "animation.svg".to_string(),
        }
    }

    /// Fixed system instruction sent with every request for this variant.
    pub fn persona(&self) -> String {
        let role = match self {
            Variant::ProfileReadme => {
                "You are an expert GitHub profile designer. You write eye-catching, well \
                 structured profile README.md files in GitHub-flavored Markdown. You may use \
                 badges from shields.io, GitHub stats cards, emoji and HTML that GitHub renders \
                 (<p align=\"center\">, <img>, <details>). Never invent personal facts the user \
                 did not give you; use clearly marked placeholders instead."
            }
            Variant::CodeSnippet => {
                "You are a senior software engineer who writes small, idiomatic, self-contained \
                 code snippets. Snippets must compile or run as written, include only the \
                 imports they need, and carry brief comments where the intent is not obvious. \
                 Prefer the standard library of the requested language."
            }
            Variant::AnimatedSvg => {
                "You are a motion designer who hand-writes animated SVG banners for GitHub \
                 READMEs. Produce a single standalone <svg> document with an explicit viewBox, \
                 width and height. Animate with CSS @keyframes inside <style> or SMIL; never use \
                 JavaScript or external resources, because GitHub strips them."
            }
        };
        format!("{}\n\n{}", role, OUTPUT_RULES)
    }

    /// Which option controls apply to this variant.
    pub fn controls(&self) -> &'static [OptionKind] {
        match self {
            Variant::ProfileReadme => &[OptionKind::Style],
            Variant::CodeSnippet => &[OptionKind::Language],
            Variant::AnimatedSvg => &[OptionKind::Style, OptionKind::Speed, OptionKind::Direction],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Style,
    Speed,
    Direction,
    Language,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignStyle {
    Minimal,
    #[default]
    Professional,
    Creative,
    Playful,
    Terminal,
}

impl DesignStyle {
    pub fn all() -> Vec<DesignStyle> {
        vec![
            DesignStyle::Minimal,
            DesignStyle::Professional,
            DesignStyle::Creative,
            DesignStyle::Playful,
            DesignStyle::Terminal,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DesignStyle::Minimal => "minimal",
            DesignStyle::Professional => "professional",
            DesignStyle::Creative => "creative",
            DesignStyle::Playful => "playful",
            DesignStyle::Terminal => "terminal",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|v| v.as_str() == s.to_lowercase())
    }

    pub fn label(&self) -> &'static str {
        match self {
            DesignStyle::Minimal => "Minimal",
            DesignStyle::Professional => "Professional",
            DesignStyle::Creative => "Creative",
            DesignStyle::Playful => "Playful",
            DesignStyle::Terminal => "Terminal / hacker",
        }
    }

    pub fn next(&self) -> DesignStyle {
        cycle(&Self::all(), self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl AnimationSpeed {
    pub fn all() -> Vec<AnimationSpeed> {
        vec![AnimationSpeed::Slow, AnimationSpeed::Normal, AnimationSpeed::Fast]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnimationSpeed::Slow => "slow",
            AnimationSpeed::Normal => "normal",
            AnimationSpeed::Fast => "fast",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|v| v.as_str() == s.to_lowercase())
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnimationSpeed::Slow => "Slow",
            AnimationSpeed::Normal => "Normal",
            AnimationSpeed::Fast => "Fast",
        }
    }

    /// Length of one animation cycle, in seconds.
    pub fn cycle_seconds(&self) -> f32 {
        match self {
            AnimationSpeed::Slow => 6.0,
            AnimationSpeed::Normal => 3.0,
            AnimationSpeed::Fast => 1.5,
        }
    }

    pub fn next(&self) -> AnimationSpeed {
        cycle(&Self::all(), self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationDirection {
    #[default]
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

impl AnimationDirection {
    pub fn all() -> Vec<AnimationDirection> {
        vec![
            AnimationDirection::LeftToRight,
            AnimationDirection::RightToLeft,
            AnimationDirection::TopToBottom,
            AnimationDirection::BottomToTop,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnimationDirection::LeftToRight => "left-to-right",
            AnimationDirection::RightToLeft => "right-to-left",
            AnimationDirection::TopToBottom => "top-to-bottom",
            AnimationDirection::BottomToTop => "bottom-to-top",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let normalized = s.to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "ltr" => Some(AnimationDirection::LeftToRight),
            "rtl" => Some(AnimationDirection::RightToLeft),
            "down" => Some(AnimationDirection::TopToBottom),
            "up" => Some(AnimationDirection::BottomToTop),
            other => Self::all().into_iter().find(|v| v.as_str() == other),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnimationDirection::LeftToRight => "Left → Right",
            AnimationDirection::RightToLeft => "Right → Left",
            AnimationDirection::TopToBottom => "Top → Bottom",
            AnimationDirection::BottomToTop => "Bottom → Top",
        }
    }

    pub fn next(&self) -> AnimationDirection {
        cycle(&Self::all(), self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetLanguage {
    #[default]
    Rust,
    Python,
    TypeScript,
    JavaScript,
    Go,
    Java,
    Cpp,
    Bash,
}

impl TargetLanguage {
    pub fn all() -> Vec<TargetLanguage> {
        vec![
            TargetLanguage::Rust,
            TargetLanguage::Python,
            TargetLanguage::TypeScript,
            TargetLanguage::JavaScript,
            TargetLanguage::Go,
            TargetLanguage::Java,
            TargetLanguage::Cpp,
            TargetLanguage::Bash,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetLanguage::Rust => "rust",
            TargetLanguage::Python => "python",
            TargetLanguage::TypeScript => "typescript",
            TargetLanguage::JavaScript => "javascript",
            TargetLanguage::Go => "go",
            TargetLanguage::Java => "java",
            TargetLanguage::Cpp => "cpp",
            TargetLanguage::Bash => "bash",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "rs" => Some(TargetLanguage::Rust),
            "py" => Some(TargetLanguage::Python),
            "ts" => Some(TargetLanguage::TypeScript),
            "js" => Some(TargetLanguage::JavaScript),
            "golang" => Some(TargetLanguage::Go),
            "c++" => Some(TargetLanguage::Cpp),
            "sh" | "shell" => Some(TargetLanguage::Bash),
            other => Self::all().into_iter().find(|v| v.as_str() == other),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TargetLanguage::Rust => "Rust",
            TargetLanguage::Python => "Python",
            TargetLanguage::TypeScript => "TypeScript",
            TargetLanguage::JavaScript => "JavaScript",
            TargetLanguage::Go => "Go",
            TargetLanguage::Java => "Java",
            TargetLanguage::Cpp => "C++",
            TargetLanguage::Bash => "Bash",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TargetLanguage::Rust => "rs",
            TargetLanguage::Python => "py",
            TargetLanguage::TypeScript => "ts",
            TargetLanguage::JavaScript => "js",
            TargetLanguage::Go => "go",
            TargetLanguage::Java => "java",
            TargetLanguage::Cpp => "cpp",
            TargetLanguage::Bash => "sh",
        }
    }

    pub fn next(&self) -> TargetLanguage {
        cycle(&Self::all(), self)
    }
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: &T) -> T {
    let idx = all.iter().position(|v| v == current).unwrap_or(0);
    all[(idx + 1) % all.len()]
}

/// The user-selected input controls. Fields a variant ignores are still
/// persisted so switching variants back and forth keeps them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub design_style: DesignStyle,
    pub animation_speed: AnimationSpeed,
    pub animation_direction: AnimationDirection,
    pub target_language: TargetLanguage,
}

impl GenerationOptions {
    /// (label, value) pairs for the controls relevant to `variant`.
    pub fn describe(&self, variant: Variant) -> Vec<(&'static str, String)> {
        variant
            .controls()
            .iter()
            .map(|kind| match kind {
                OptionKind::Style => ("Design style", self.design_style.label().to_string()),
                OptionKind::Speed => (
                    "Animation speed",
                    format!(
                        "{} ({}s per cycle)",
                        self.animation_speed.label(),
                        self.animation_speed.cycle_seconds()
                    ),
                ),
                OptionKind::Direction => {
                    ("Animation direction", self.animation_direction.label().to_string())
                }
                OptionKind::Language => ("Language", self.target_language.label().to_string()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_aliases() {
        assert_eq!(Variant::from_str("readme"), Some(Variant::ProfileReadme));
        assert_eq!(Variant::from_str("SVG"), Some(Variant::AnimatedSvg));
        assert_eq!(Variant::from_str("code_snippet"), Some(Variant::CodeSnippet));
        assert_eq!(Variant::from_str("poem"), None);
    }

    #[test]
    fn test_variant_next_visits_all() {
        let mut v = Variant::ProfileReadme;
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(v);
            v = v.next();
        }
        assert_eq!(v, Variant::ProfileReadme);
        assert_eq!(seen, Variant::all());
    }

    #[test]
    fn test_storage_keys_are_distinct() {
        let keys: std::collections::HashSet<_> =
            Variant::all().iter().map(|v| v.storage_key()).collect();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_personas_mention_delimiter() {
        for variant in Variant::all() {
            let persona = variant.persona();
            assert!(persona.contains(OPEN_TAG));
            assert!(persona.contains(CLOSE_TAG));
        }
    }

    #[test]
    fn test_option_cycling_wraps() {
        assert_eq!(AnimationSpeed::Fast.next(), AnimationSpeed::Slow);
        assert_eq!(DesignStyle::Terminal.next(), DesignStyle::Minimal);
        assert_eq!(TargetLanguage::Bash.next(), TargetLanguage::Rust);
        assert_eq!(AnimationDirection::BottomToTop.next(), AnimationDirection::LeftToRight);
    }

    #[test]
    fn test_language_aliases_and_extension() {
        assert_eq!(TargetLanguage::from_str("ts"), Some(TargetLanguage::TypeScript));
        assert_eq!(TargetLanguage::from_str("C++"), Some(TargetLanguage::Cpp));
        let options = GenerationOptions {
            target_language: TargetLanguage::Python,
            ..Default::default()
        };
        assert_eq!(Variant::CodeSnippet.default_file_name(&options), "snippet.py");
        assert_eq!(Variant::ProfileReadme.default_file_name(&options), "README.md");
    }

    #[test]
    fn test_describe_only_relevant_controls() {
        let options = GenerationOptions::default();
        let readme: Vec<_> = options
            .describe(Variant::ProfileReadme)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(readme, vec!["Design style"]);

        let svg = options.describe(Variant::AnimatedSvg);
        assert_eq!(svg.len(), 3);
        assert!(svg[1].1.contains("3s per cycle"));
    }

    #[test]
    fn test_options_tolerate_missing_fields() {
        let options: GenerationOptions =
            serde_json::from_str(r#"{"design_style":"playful"}"#).unwrap();
        assert_eq!(options.design_style, DesignStyle::Playful);
        assert_eq!(options.animation_speed, AnimationSpeed::Normal);
    }
}
