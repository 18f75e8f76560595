//! CP-007: Identifier naming for generated Go source.

/// Longest suffix taken from a property value when naming a block.
pub const MAX_CLEANED_LEN: usize = 20;

/// Package name used when none can be derived.
pub const FALLBACK_PACKAGE: &str = "imported";

const GO_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

pub fn is_keyword(s: &str) -> bool {
    GO_KEYWORDS.contains(&s)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True if `s` can be used verbatim as a Go identifier.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if is_ident_start(first) => {}
        _ => return false,
    }
    chars.all(is_ident_continue) && !is_keyword(s)
}

/// Make `name` a valid identifier: an invalid leading character becomes `_`,
/// other invalid characters are dropped, keywords gain a trailing `_`.
/// Idempotent.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, c) in name.chars().enumerate() {
        if i == 0 {
            out.push(if is_ident_start(c) { c } else { '_' });
        } else if is_ident_continue(c) {
            out.push(c);
        }
    }
    if out.is_empty() {
        return "_".to_string();
    }
    if is_keyword(&out) {
        out.push('_');
    }
    out
}

/// Turn a free-form value (`web-server/v1.2`) into a name fragment
/// (`Webserverv12`): separators and other non-identifier characters are
/// dropped, the first letter is capitalized, and the result is capped at
/// [`MAX_CLEANED_LEN`] characters.
pub fn clean_for_name(s: &str) -> String {
    let kept: String = s.chars().filter(|&c| is_ident_continue(c) && c != '_').collect();
    let mut chars = kept.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    capitalized.chars().take(MAX_CLEANED_LEN).collect()
}

/// Singular form of a plural property name: `Policies` → `Policy`,
/// `Addresses` → `Address`, `Origins` → `Origin`. Names ending in `ss` are
/// left alone.
pub fn singularize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    if name.ends_with("sses") {
        return name[..name.len() - 2].to_string();
    }
    if name.ends_with('s') && !name.ends_with("ss") {
        return name[..name.len() - 1].to_string();
    }
    name.to_string()
}

/// Package name for a template file stem: lowercase, `-` and `.` become `_`,
/// a leading digit is replaced by `_`, empty falls back to `imported`.
pub fn derive_package_name(stem: &str) -> String {
    let mut name: String = stem
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c == '.' { '_' } else { c })
        .filter(|&c| is_ident_continue(c))
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.replace_range(..1, "_");
    }
    if name.is_empty() {
        return FALLBACK_PACKAGE.to_string();
    }
    if is_keyword(&name) {
        name.push('_');
    }
    name
}

/// Package name for a template path, from its file stem.
pub fn package_name_for_path(path: &std::path::Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    derive_package_name(&stem)
}

/// Top-level declaration kinds, in the order they claim variable names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclKind {
    Resource,
    Parameter,
    Mapping,
    Condition,
    Output,
}

impl DeclKind {
    pub const ALL: [DeclKind; 5] = [
        Self::Resource,
        Self::Parameter,
        Self::Mapping,
        Self::Condition,
        Self::Output,
    ];

    /// Appended to the logical id before sanitizing.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Resource | Self::Parameter => "",
            Self::Mapping => "Mapping",
            Self::Condition => "Condition",
            Self::Output => "Output",
        }
    }

    /// Preferred variable name, before collisions are resolved.
    pub fn base_name(self, id: &str) -> String {
        sanitize_identifier(&format!("{}{}", id, self.suffix()))
    }

    /// True when the logical id needs no rewriting to become its base name.
    pub fn is_verbatim(self, id: &str) -> bool {
        let raw = format!("{}{}", id, self.suffix());
        self.base_name(id) == raw
    }
}

/// First of `base`, `base2`, `base3`, ... not in `taken`. A base ending in a
/// digit takes `_2`, `_3`, ... so `Port80` never becomes `Port802`.
pub fn disambiguate(base: &str, taken: &std::collections::BTreeSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    let separator = if base.ends_with(|c: char| c.is_ascii_digit()) {
        "_"
    } else {
        ""
    };
    (2usize..)
        .map(|n| format!("{}{}{}", base, separator, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Go constant for a pseudo-parameter, if one exists.
pub fn pseudo_constant(name: &str) -> Option<&'static str> {
    Some(match name {
        "AWS::Region" => "AWS_REGION",
        "AWS::AccountId" => "AWS_ACCOUNT_ID",
        "AWS::StackName" => "AWS_STACK_NAME",
        "AWS::StackId" => "AWS_STACK_ID",
        "AWS::Partition" => "AWS_PARTITION",
        "AWS::URLSuffix" => "AWS_URL_SUFFIX",
        "AWS::NoValue" => "AWS_NO_VALUE",
        "AWS::NotificationARNs" => "AWS_NOTIFICATION_ARNS",
        _ => return None,
    })
}
