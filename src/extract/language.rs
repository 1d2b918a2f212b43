//! Code block language detection
//!
//! An explicit class on the `<code>`/`<pre>` element wins. Otherwise a
//! lexical heuristic picks one of a fixed set of languages, checked from the
//! most to the least distinctive syntax.

/// Extracts a language from class tokens such as `language-rust`,
/// `lang-python` or `highlight-js`
pub fn language_from_class(class: &str) -> Option<String> {
    class.split_whitespace().find_map(|token| {
        ["language-", "lang-", "highlight-"]
            .iter()
            .find_map(|prefix| token.strip_prefix(prefix))
            .filter(|lang| !lang.is_empty())
            .map(|lang| lang.to_ascii_lowercase())
    })
}

/// Guesses the language of an unlabeled code block
///
/// Returns one of `json`, `html`, `bash`, `rust`, `python`, `tsx`, `jsx`,
/// `typescript`, `javascript`, `css`, `yaml`, `markdown` or `text`.
pub fn detect_language(code: &str) -> &'static str {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return "text";
    }
    let lower = trimmed.to_lowercase();

    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
    {
        return "json";
    }

    if lower.starts_with("<!doctype") || lower.contains("<html") {
        return "html";
    }

    if looks_like_shell(trimmed) {
        return "bash";
    }

    if looks_like_rust(trimmed) {
        return "rust";
    }

    if looks_like_python(trimmed) {
        return "python";
    }

    if let Some(lang) = javascript_family(trimmed, &lower) {
        return lang;
    }

    if trimmed.contains('{')
        && trimmed.contains('}')
        && trimmed.contains(':')
        && ["color", "margin", "padding", "display"]
            .iter()
            .any(|prop| lower.contains(prop))
    {
        return "css";
    }

    if looks_like_yaml(trimmed) {
        return "yaml";
    }

    if trimmed.starts_with('#') || trimmed.contains("```") {
        return "markdown";
    }

    "text"
}

const SHELL_COMMANDS: &[&str] = &[
    "npm ", "npx ", "yarn ", "pnpm ", "pip ", "pip3 ", "git ", "cargo ", "curl ", "wget ",
    "brew ", "sudo ", "apt ", "apt-get ", "docker ", "cd ", "export ", "mkdir ",
];

fn looks_like_shell(code: &str) -> bool {
    if code.starts_with("#!") {
        return true;
    }

    code.lines().map(str::trim_start).any(|line| {
        let line = line.strip_prefix("$ ").unwrap_or(line);
        SHELL_COMMANDS.iter().any(|cmd| line.starts_with(cmd))
    }) && !code.contains("=>")
        && !code.contains(';')
}

fn looks_like_rust(code: &str) -> bool {
    code.contains("fn ") && (code.contains("->") || code.contains("let ") || code.contains("()"))
        || code.contains("let mut ")
        || code.contains("impl ")
        || code.contains("pub struct ")
        || code.contains("use std::")
        || code.contains("println!")
        || code.contains("#[derive")
}

fn looks_like_python(code: &str) -> bool {
    if code.contains("def ")
        || code.contains("self.")
        || code.contains("__init__")
        || code.contains("elif ")
    {
        return true;
    }

    // `import x` / `from x import y` without JavaScript module syntax
    code.lines().map(str::trim).any(|line| {
        (line.starts_with("import ") || (line.starts_with("from ") && line.contains(" import ")))
            && !line.ends_with(';')
            && !line.contains(" from '")
            && !line.contains(" from \"")
            && !line.contains('{')
    })
}

fn javascript_family(code: &str, lower: &str) -> Option<&'static str> {
    let is_script = ["import ", "export ", "const ", "let ", "var ", "=>", "function "]
        .iter()
        .any(|kw| code.contains(kw));
    let is_jsx = code.contains('<')
        && code.contains("/>")
        || ["className", "onClick", "useState", "useEffect"]
            .iter()
            .any(|kw| code.contains(kw));
    let is_typed = lower.contains("typescript")
        || [": string", ": number", ": boolean", "interface ", "type "]
            .iter()
            .any(|kw| code.contains(kw));

    match (is_script || is_jsx, is_jsx, is_typed) {
        (false, _, _) => None,
        (true, true, true) => Some("tsx"),
        (true, true, false) => Some("jsx"),
        (true, false, true) => Some("typescript"),
        (true, false, false) => Some("javascript"),
    }
}

fn looks_like_yaml(code: &str) -> bool {
    let lines: Vec<&str> = code
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .collect();

    if lines.len() < 2 || code.contains('{') || code.contains(';') {
        return false;
    }

    lines.iter().all(|line| {
        let line = line.trim_start();
        line == "---" || line.starts_with("- ") || line.contains(": ") || line.ends_with(':')
    })
}
