//! Identifier normalization shared by validation and code generation.

use convert_case::{Case, Casing};
use std::collections::BTreeSet;

/// Rust keywords that can never be used as a bare generated identifier.
pub const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod",
    "move", "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "yield",
];

/// Normalize an entity name into the type identifier used by generated code.
#[must_use]
pub fn normalize_entity_name(name: &str) -> String {
    name.to_case(Case::Pascal)
}

/// Normalize a member (property, relationship, collection) name.
#[must_use]
pub fn normalize_member_name(name: &str) -> String {
    name.to_case(Case::Snake)
}

/// English-ish plural used for accessor collection members.
#[must_use]
pub fn pluralize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{word}es");
    }

    let mut chars = lower.chars().rev();
    if let (Some('y'), Some(prev)) = (chars.next(), chars.next())
        && !matches!(prev, 'a' | 'e' | 'i' | 'o' | 'u')
    {
        return format!("{}ies", &word[..word.len() - 1]);
    }

    format!("{word}s")
}

/// True when `ident` is a plain ASCII identifier (`[A-Za-z_][A-Za-z0-9_]*`).
#[must_use]
pub fn is_valid_ident(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[must_use]
pub fn is_keyword(ident: &str) -> bool {
    RUST_KEYWORDS.contains(&ident)
}

/// True when `ident` can name a generated item or path segment as written:
/// a valid identifier that is neither a keyword, `Self`, nor only underscores.
#[must_use]
pub fn is_item_ident(ident: &str) -> bool {
    is_valid_ident(ident)
        && !is_keyword(ident)
        && ident != "Self"
        && !ident.chars().all(|c| c == '_')
}

///
/// Disambiguator
///
/// Hands out unique names within one scope. A name that is reserved or
/// already taken gets `_1`, `_2`, ... appended until it is free, so the
/// result only depends on the order names are claimed in.
///

#[derive(Clone, Debug, Default)]
pub struct Disambiguator {
    reserved: BTreeSet<String>,
    taken: BTreeSet<String>,
}

impl Disambiguator {
    #[must_use]
    pub fn new<I, S>(reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut reserved: BTreeSet<String> = reserved.into_iter().map(Into::into).collect();
        reserved.extend(RUST_KEYWORDS.iter().map(|kw| (*kw).to_string()));

        Self {
            reserved,
            taken: BTreeSet::new(),
        }
    }

    /// Claim `base`, or the first free suffixed variant of it.
    pub fn claim(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut counter = 0u32;

        while self.reserved.contains(&candidate) || self.taken.contains(&candidate) {
            counter += 1;
            candidate = format!("{base}_{counter}");
        }

        self.taken.insert(candidate.clone());

        candidate
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_names_normalize_to_pascal_case() {
        assert_eq!(normalize_entity_name("order_item"), "OrderItem");
        assert_eq!(normalize_entity_name("OrderItem"), "OrderItem");
        assert_eq!(normalize_entity_name("customer"), "Customer");
    }

    #[test]
    fn pluralize_covers_common_endings() {
        assert_eq!(pluralize("customer"), "customers");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
    }

    #[test]
    fn idents_must_be_ascii_words() {
        assert!(is_valid_ident("customer_id"));
        assert!(is_valid_ident("_hidden"));
        assert!(!is_valid_ident("1st"));
        assert!(!is_valid_ident("first name"));
        assert!(!is_valid_ident(""));
    }

    #[test]
    fn item_idents_exclude_keywords_and_placeholders() {
        assert!(is_item_ident("DataContext"));
        assert!(is_item_ident("_hidden"));
        assert!(!is_item_ident("type"));
        assert!(!is_item_ident("Self"));
        assert!(!is_item_ident("_"));
        assert!(!is_item_ident("__"));
    }

    #[test]
    fn underscore_only_names_normalize_to_nothing() {
        assert_eq!(normalize_entity_name("_"), "");
        assert_eq!(normalize_member_name("__"), "");
    }

    #[test]
    fn disambiguator_appends_counter_for_reserved_and_taken() {
        let mut names = Disambiguator::new(["connection"]);

        assert_eq!(names.claim("connection"), "connection_1");
        assert_eq!(names.claim("orders"), "orders");
        assert_eq!(names.claim("orders"), "orders_1");
        assert_eq!(names.claim("orders"), "orders_2");
        assert_eq!(names.claim("type"), "type_1");
    }
}
