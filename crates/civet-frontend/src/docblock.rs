// docblock.rs
//
// Docblock (`/** ... */`) tag extraction. The analyzer only cares
// about the `@tag param param...` rows; free text is skipped.

/// One `@tag` row of a docblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTag {
    /// Tag name without the `@`.
    pub name: String,
    /// Whitespace-separated words after the tag.
    pub params: Vec<String>,
    /// The raw remainder of the line after the tag name.
    pub rest: String,
}

/// Whether a comment looks like a docblock at all.
pub fn is_docblock(text: &str) -> bool {
    text.starts_with("/**")
}

/// Extract all `@tag` rows from a docblock comment.
pub fn parse(text: &str) -> Vec<DocTag> {
    if !is_docblock(text) {
        return Vec::new();
    }
    let inner = text
        .trim_start_matches("/**")
        .trim_end_matches("*/");

    let mut tags = Vec::new();
    for line in inner.lines() {
        let line = line.trim().trim_start_matches('*').trim();
        let Some(rest) = line.strip_prefix('@') else {
            continue;
        };
        let mut words = rest.split_whitespace();
        let Some(name) = words.next() else {
            continue;
        };
        let params: Vec<String> = words.map(str::to_string).collect();
        let rest_text = rest[name.len()..].trim().to_string();
        tags.push(DocTag {
            name: name.to_string(),
            params,
            rest: rest_text,
        });
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_param_and_return() {
        let tags = parse(
            "/**\n * Does a thing.\n * @param int $x\n * @return string\n */",
        );
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "param");
        assert_eq!(tags[0].params, vec!["int", "$x"]);
        assert_eq!(tags[1].name, "return");
        assert_eq!(tags[1].params, vec!["string"]);
    }

    #[test]
    fn deprecated_keeps_note_text() {
        let tags = parse("/** @deprecated use g() instead */");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].rest, "use g() instead");
    }

    #[test]
    fn single_line_var() {
        let tags = parse("/** @var Foo $x */");
        assert_eq!(tags[0].params, vec!["Foo", "$x"]);
    }

    #[test]
    fn non_docblock_is_ignored() {
        assert!(parse("/* @var Foo $x */").is_empty());
        assert!(parse("// @var Foo $x").is_empty());
    }
}
