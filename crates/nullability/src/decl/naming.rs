//! Host-language names for imported selectors and functions.

use std::fmt;

/// A callable's host name: `methodF(_:second:)` has base `methodF` and
/// labels `[None, Some("second")]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostName {
    pub base: String,
    pub labels: Vec<Option<String>>,
}

impl HostName {
    pub fn plain(base: &str) -> Self {
        Self {
            base: base.to_string(),
            labels: Vec::new(),
        }
    }

    pub fn unlabeled(base: &str, arity: usize) -> Self {
        Self {
            base: base.to_string(),
            labels: vec![None; arity],
        }
    }

    pub fn label_list(&self) -> String {
        render_labels(self.labels.iter().map(|label| label.as_deref()))
    }
}

impl fmt::Display for HostName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.base, self.label_list())
    }
}

/// `a:_:` style rendering used in label diagnostics.
pub fn render_labels<'l>(labels: impl Iterator<Item = Option<&'l str>>) -> String {
    let mut out = String::new();
    for label in labels {
        out.push_str(label.unwrap_or("_"));
        out.push(':');
    }
    out
}

fn selector_pieces(selector: &str) -> Result<(Vec<&str>, usize), String> {
    let arity = selector.matches(':').count();
    if arity == 0 {
        return Ok((vec![selector], 0));
    }
    if !selector.ends_with(':') {
        return Err(format!("selector '{selector}' must end with ':'"));
    }
    let pieces: Vec<&str> = selector[..selector.len() - 1].split(':').collect();
    Ok((pieces, arity))
}

fn valid_piece(piece: &str) -> bool {
    !piece.is_empty()
        && piece
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && piece.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Lowercase the leading run of capitals: `Int` -> `int`, `URLString` -> `urlString`.
pub fn lowercase_initialism(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    let run = chars.iter().take_while(|c| c.is_ascii_uppercase()).count();
    if run == 0 {
        return word.to_string();
    }
    let keep_last = run > 1 && run < chars.len() && chars[run].is_ascii_lowercase();
    let lower_count = if keep_last { run - 1 } else { run };
    chars
        .iter()
        .enumerate()
        .map(|(idx, c)| {
            if idx < lower_count {
                c.to_ascii_lowercase()
            } else {
                *c
            }
        })
        .collect()
}

/// `methodF:second:` -> `methodF(_:second:)`.
pub fn method_name(selector: &str) -> Result<HostName, String> {
    let (pieces, arity) = selector_pieces(selector)?;
    if pieces.iter().any(|piece| !valid_piece(piece)) {
        return Err(format!("invalid selector '{selector}'"));
    }
    let base = pieces[0].to_string();
    if arity == 0 {
        return Ok(HostName::plain(&base));
    }
    let mut labels = vec![None];
    labels.extend(pieces[1..].iter().map(|piece| Some(piece.to_string())));
    Ok(HostName { base, labels })
}

/// `initWithInt:` -> `init(int:)`, `init` -> `init()`.
pub fn initializer_name(selector: &str) -> Result<HostName, String> {
    let (pieces, arity) = selector_pieces(selector)?;
    let first = pieces[0];
    let Some(rest) = first.strip_prefix("init") else {
        return Err(format!("initializer selector '{selector}' must start with 'init'"));
    };
    if rest.chars().next().is_some_and(|c| c.is_ascii_lowercase()) {
        return Err(format!("'{selector}' is not in the init family"));
    }
    if pieces[1..].iter().any(|piece| !valid_piece(piece)) {
        return Err(format!("invalid selector '{selector}'"));
    }
    if arity == 0 {
        return Ok(HostName::plain("init"));
    }
    let rest = rest.strip_prefix("With").unwrap_or(rest);
    let first_label = if rest.is_empty() {
        None
    } else {
        Some(lowercase_initialism(rest))
    };
    let mut labels = vec![first_label];
    labels.extend(pieces[1..].iter().map(|piece| Some(piece.to_string())));
    Ok(HostName {
        base: "init".to_string(),
        labels,
    })
}

/// Explicit override such as `make(_:with:)` or a bare `name`.
pub fn parse_host_name(text: &str) -> Result<HostName, String> {
    let text = text.trim();
    let Some(open) = text.find('(') else {
        if valid_piece(text) {
            return Ok(HostName::plain(text));
        }
        return Err(format!("invalid host name '{text}'"));
    };
    let Some(inner) = text[open + 1..].strip_suffix(')') else {
        return Err(format!("host name '{text}' is missing ')'"));
    };
    let base = &text[..open];
    if !valid_piece(base) {
        return Err(format!("invalid host name '{text}'"));
    }
    let mut labels = Vec::new();
    if !inner.is_empty() {
        let Some(inner) = inner.strip_suffix(':') else {
            return Err(format!("argument labels in '{text}' must end with ':'"));
        };
        for label in inner.split(':') {
            match label {
                "_" => labels.push(None),
                label if valid_piece(label) => labels.push(Some(label.to_string())),
                _ => return Err(format!("invalid argument label '{label}' in '{text}'")),
            }
        }
    }
    Ok(HostName {
        base: base.to_string(),
        labels,
    })
}
