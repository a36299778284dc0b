//! Code block extraction from model replies

use regex::Regex;
use std::sync::LazyLock;

/// Keywords that mark a block or line as Python source
const PYTHON_MARKERS: [&str; 4] = ["def ", "class ", "import ", "from "];

/// A closed fenced block: info string and body
struct FencedBlock<'a> {
    lang: &'a str,
    body: String,
}

/// Extract the strategy source from a model reply.
///
/// Tries, in order:
/// 1. the first closed fence tagged `python` or `py`;
/// 2. the first closed untagged fence whose body looks like Python;
/// 3. unfenced code from the first `from`/`import`/`class`/`def` line to the
///    end, accepted only if it mentions `QCAlgorithm` or `AlgorithmImports`.
///
/// Unclosed fences are ignored. The result is trimmed and never empty.
pub fn extract_python_code(text: &str) -> Option<String> {
    let blocks = fenced_blocks(text);

    let tagged = blocks.iter().find(|b| {
        let lang = b.lang.to_ascii_lowercase();
        lang == "python" || lang == "py" || lang == "python3"
    });
    if let Some(block) = tagged
        && let Some(code) = non_empty(&block.body)
    {
        return Some(code);
    }

    let untagged = blocks
        .iter()
        .filter(|b| b.lang.is_empty())
        .find(|b| PYTHON_MARKERS.iter().any(|kw| b.body.contains(kw)));
    if let Some(block) = untagged
        && let Some(code) = non_empty(&block.body)
    {
        return Some(code);
    }

    unfenced_code(text)
}

/// Opening fence anywhere on a line, info string up to the newline, body
/// up to the next fence (which may share a line with the last statement)
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_+.-]*)[^\n]*\n(.*?)```").unwrap()
});

fn fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    FENCE
        .captures_iter(text)
        .map(|caps| FencedBlock {
            lang: caps.get(1).map_or("", |m| m.as_str()),
            body: caps.get(2).map_or("", |m| m.as_str()).to_string(),
        })
        .collect()
}

fn unfenced_code(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.iter().position(|line| {
        let t = line.trim_start();
        PYTHON_MARKERS.iter().any(|kw| t.starts_with(kw))
    })?;

    let code = lines[start..].join("\n");
    let code = code.trim();
    if code.contains("QCAlgorithm") || code.contains("AlgorithmImports") {
        Some(code.to_string())
    } else {
        None
    }
}

fn non_empty(body: &str) -> Option<String> {
    let trimmed = body.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALGO: &str = "from AlgorithmImports import *\n\nclass Spx(QCAlgorithm):\n    def initialize(self):\n        pass";

    #[test]
    fn test_python_fence_with_prose() {
        let text = format!("Here is the strategy:\n\n```python\n{}\n```\n\nLet me know.", ALGO);
        assert_eq!(extract_python_code(&text).unwrap(), ALGO);
    }

    #[test]
    fn test_first_closed_block_wins() {
        let text = "```python\nx = 1\n```\nand then\n```python\ny = 2\n```";
        assert_eq!(extract_python_code(text).unwrap(), "x = 1");
    }

    #[test]
    fn test_tagged_block_preferred_over_earlier_untagged() {
        let text = "```\nimport os\n```\n```py\nimport sys\n```";
        assert_eq!(extract_python_code(text).unwrap(), "import sys");
    }

    #[test]
    fn test_untagged_block_must_look_like_python() {
        let text = "```\nsome output\n```\n```\nclass A:\n    pass\n```";
        assert_eq!(extract_python_code(text).unwrap(), "class A:\n    pass");
    }

    #[test]
    fn test_other_language_fence_ignored() {
        let text = "```json\n{\"import \": 1}\n```";
        assert_eq!(extract_python_code(text), None);
    }

    #[test]
    fn test_unclosed_fence_is_not_a_block() {
        let text = "```python\nclass A(QCAlgorithm):\n    pass";
        // Falls through to the unfenced path, which starts at `class`
        assert_eq!(
            extract_python_code(text).unwrap(),
            "class A(QCAlgorithm):\n    pass"
        );
    }

    #[test]
    fn test_unfenced_requires_quantconnect_marker() {
        let text = format!("Sure thing.\n{}", ALGO);
        assert_eq!(extract_python_code(&text).unwrap(), ALGO);

        assert_eq!(extract_python_code("Sure.\nimport os\nprint(1)"), None);
    }

    #[test]
    fn test_closing_fence_on_last_code_line() {
        let text = "Here:\n```python\nfrom AlgorithmImports import *\nclass A(QCAlgorithm):\n    pass```\nThanks!";
        assert_eq!(
            extract_python_code(text).unwrap(),
            "from AlgorithmImports import *\nclass A(QCAlgorithm):\n    pass"
        );
    }

    #[test]
    fn test_opening_fence_mid_sentence() {
        let text = format!("Sure! ```python\n{}\n```\nGood luck with the backtest.", ALGO);
        assert_eq!(extract_python_code(&text).unwrap(), ALGO);
    }

    #[test]
    fn test_no_code() {
        assert_eq!(extract_python_code("I cannot help with that."), None);
        assert_eq!(extract_python_code("```python\n\n```"), None);
    }
}
