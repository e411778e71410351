/// How default coding keys are derived from field and variant names.
///
/// Only names without an explicit path or key are re-cased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyCase {
    /// Use the name unchanged.
    #[default]
    AsIs,
    /// `userName`
    CamelCase,
    /// `UserName`
    PascalCase,
    /// `user_name`
    SnakeCase,
    /// `USER_NAME`
    ScreamingSnakeCase,
    /// `user-name`
    KebabCase,
    /// `USER-NAME`
    ScreamingKebabCase,
    /// `username`
    LowerCase,
    /// `USERNAME`
    UpperCase,
}

impl KeyCase {
    /// Converts `name` to this case.
    pub fn apply(self, name: &str) -> String {
        if self == KeyCase::AsIs {
            return name.to_string();
        }
        let words = split_words(name);
        match self {
            KeyCase::AsIs => name.to_string(),
            KeyCase::CamelCase => words
                .iter()
                .enumerate()
                .map(|(i, w)| if i == 0 { w.to_lowercase() } else { capitalize(w) })
                .collect(),
            KeyCase::PascalCase => words.iter().map(|w| capitalize(w)).collect(),
            KeyCase::SnakeCase => join(&words, "_", str::to_lowercase),
            KeyCase::ScreamingSnakeCase => join(&words, "_", str::to_uppercase),
            KeyCase::KebabCase => join(&words, "-", str::to_lowercase),
            KeyCase::ScreamingKebabCase => join(&words, "-", str::to_uppercase),
            KeyCase::LowerCase => join(&words, "", str::to_lowercase),
            KeyCase::UpperCase => join(&words, "", str::to_uppercase),
        }
    }
}

fn join(words: &[&str], sep: &str, f: fn(&str) -> String) -> String {
    words.iter().map(|w| f(w)).collect::<Vec<_>>().join(sep)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Splits an identifier into words on `_`, `-`, spaces, lower-to-upper
/// transitions and the end of an uppercase run (`HTTPServer` is
/// `HTTP` + `Server`).
fn split_words(name: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = name.char_indices().collect();
    let mut words = Vec::new();
    let mut start: Option<usize> = None;

    for (i, &(offset, c)) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if let Some(s) = start.take() {
                words.push(&name[s..offset]);
            }
            continue;
        }
        let Some(s) = start else {
            start = Some(offset);
            continue;
        };
        let prev = chars[i - 1].1;
        let next = chars.get(i + 1).map(|&(_, n)| n);
        let boundary = c.is_uppercase()
            && (prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next.is_some_and(char::is_lowercase)));
        if boundary {
            words.push(&name[s..offset]);
            start = Some(offset);
        }
    }
    if let Some(s) = start {
        words.push(&name[s..]);
    }
    words
}
