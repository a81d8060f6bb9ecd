//! Parser for the C / Objective-C type spellings carried by a module
//! manifest, e.g. `SomeClass * _Nullable` or `nullable instancetype`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Specifier {
    NonNull,
    Nullable,
    Unspecified,
    /// `null_resettable`: nullable setter, nonnull getter.
    Resettable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecifierUse {
    pub specifier: Specifier,
    pub spelling: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CScalar {
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    Bool,
    ObjCBool,
    NSInteger,
    NSUInteger,
    CGFloat,
}

impl CScalar {
    pub fn c_name(self) -> &'static str {
        match self {
            CScalar::Char => "char",
            CScalar::SChar => "signed char",
            CScalar::UChar => "unsigned char",
            CScalar::Short => "short",
            CScalar::UShort => "unsigned short",
            CScalar::Int => "int",
            CScalar::UInt => "unsigned int",
            CScalar::Long => "long",
            CScalar::ULong => "unsigned long",
            CScalar::LongLong => "long long",
            CScalar::ULongLong => "unsigned long long",
            CScalar::Float => "float",
            CScalar::Double => "double",
            CScalar::Bool => "bool",
            CScalar::ObjCBool => "BOOL",
            CScalar::NSInteger => "NSInteger",
            CScalar::NSUInteger => "NSUInteger",
            CScalar::CGFloat => "CGFloat",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseType {
    Void,
    Scalar(CScalar),
    Id,
    Class,
    InstanceType,
    Struct(String),
    /// A class or typedef name, looked up against the module.
    Named(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointerLevel {
    /// `const` written after this `*`; it qualifies the pointer itself.
    pub is_const: bool,
    pub specifiers: Vec<SpecifierUse>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CType {
    pub base: BaseType,
    pub base_const: bool,
    pub kindof: bool,
    /// `_Nullable`-style specifiers written directly after the base type.
    pub base_specifiers: Vec<SpecifierUse>,
    /// Innermost first.
    pub pointers: Vec<PointerLevel>,
    /// Context-keyword specifiers (`nullable id`); they apply to the outermost level.
    pub context_specifiers: Vec<SpecifierUse>,
    pub spelling: String,
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spelling)
    }
}

fn keyword_specifier(word: &str) -> Option<Specifier> {
    match word {
        "nonnull" => Some(Specifier::NonNull),
        "nullable" => Some(Specifier::Nullable),
        "null_unspecified" => Some(Specifier::Unspecified),
        "null_resettable" => Some(Specifier::Resettable),
        _ => None,
    }
}

fn attached_specifier(word: &str) -> Option<Specifier> {
    match word {
        "_Nonnull" | "__nonnull" => Some(Specifier::NonNull),
        "_Nullable" | "__nullable" => Some(Specifier::Nullable),
        "_Null_unspecified" | "__null_unspecified" => Some(Specifier::Unspecified),
        _ => None,
    }
}

fn looks_like_specifier(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    lower.starts_with("_null") || lower.starts_with("__null") || lower.starts_with("__nonnull")
        || lower.starts_with("_nonnull")
}

fn tokenize(spelling: &str) -> Vec<&str> {
    let mut out = Vec::new();
    for word in spelling.split_whitespace() {
        let mut rest = word;
        while !rest.is_empty() {
            if let Some(tail) = rest.strip_prefix('*') {
                out.push("*");
                rest = tail;
                continue;
            }
            let end = rest.find('*').unwrap_or(rest.len());
            out.push(&rest[..end]);
            rest = &rest[end..];
        }
    }
    out
}

fn scalar_from_words(words: &[&str]) -> Option<CScalar> {
    let scalar = match words {
        ["char"] => CScalar::Char,
        ["signed", "char"] => CScalar::SChar,
        ["unsigned", "char"] => CScalar::UChar,
        ["short"] | ["short", "int"] | ["signed", "short"] => CScalar::Short,
        ["unsigned", "short"] | ["unsigned", "short", "int"] => CScalar::UShort,
        ["int"] | ["signed"] | ["signed", "int"] => CScalar::Int,
        ["unsigned"] | ["unsigned", "int"] => CScalar::UInt,
        ["long"] | ["long", "int"] | ["signed", "long"] => CScalar::Long,
        ["unsigned", "long"] | ["unsigned", "long", "int"] => CScalar::ULong,
        ["long", "long"] | ["long", "long", "int"] | ["signed", "long", "long"] => {
            CScalar::LongLong
        }
        ["unsigned", "long", "long"] | ["unsigned", "long", "long", "int"] => CScalar::ULongLong,
        _ => return None,
    };
    Some(scalar)
}

fn named_base(word: &str) -> BaseType {
    match word {
        "void" => BaseType::Void,
        "id" => BaseType::Id,
        "Class" => BaseType::Class,
        "instancetype" => BaseType::InstanceType,
        "float" => BaseType::Scalar(CScalar::Float),
        "double" => BaseType::Scalar(CScalar::Double),
        "bool" | "_Bool" => BaseType::Scalar(CScalar::Bool),
        "BOOL" => BaseType::Scalar(CScalar::ObjCBool),
        "NSInteger" => BaseType::Scalar(CScalar::NSInteger),
        "NSUInteger" => BaseType::Scalar(CScalar::NSUInteger),
        "CGFloat" => BaseType::Scalar(CScalar::CGFloat),
        other => BaseType::Named(other.to_string()),
    }
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn parse_ctype(spelling: &str) -> Result<CType, String> {
    let tokens = tokenize(spelling);
    if tokens.is_empty() {
        return Err("missing type".to_string());
    }

    let mut base: Option<BaseType> = None;
    let mut scalar_words: Vec<&str> = Vec::new();
    let mut base_const = false;
    let mut kindof = false;
    let mut base_specifiers = Vec::new();
    let mut pointers: Vec<PointerLevel> = Vec::new();
    let mut context_specifiers = Vec::new();

    let mut idx = 0;
    while idx < tokens.len() {
        let word = tokens[idx];
        idx += 1;

        if word == "*" {
            if base.is_none() && scalar_words.is_empty() {
                return Err(format!("expected a type before '*' in '{spelling}'"));
            }
            pointers.push(PointerLevel::default());
            continue;
        }
        if let Some(specifier) = keyword_specifier(word) {
            context_specifiers.push(SpecifierUse {
                specifier,
                spelling: word.to_string(),
            });
            continue;
        }
        if let Some(specifier) = attached_specifier(word) {
            let entry = SpecifierUse {
                specifier,
                spelling: word.to_string(),
            };
            match pointers.last_mut() {
                Some(level) => level.specifiers.push(entry),
                None => base_specifiers.push(entry),
            }
            continue;
        }
        match word {
            "const" | "volatile" | "restrict" | "__restrict" => {
                if let Some(level) = pointers.last_mut() {
                    level.is_const |= word == "const";
                } else {
                    base_const |= word == "const";
                }
                continue;
            }
            "__kindof" => {
                kindof = true;
                continue;
            }
            "__strong" | "__weak" | "__unsafe_unretained" | "__autoreleasing" => continue,
            _ => {}
        }
        if looks_like_specifier(word) {
            return Err(format!("unknown nullability specifier '{word}'"));
        }
        if !is_identifier(word) {
            return Err(format!("unexpected '{word}' in type '{spelling}'"));
        }
        if !pointers.is_empty() {
            return Err(format!("unexpected '{word}' after '*' in '{spelling}'"));
        }
        if matches!(word, "unsigned" | "signed" | "long" | "short" | "int" | "char") {
            if base.is_some() {
                return Err(format!("cannot combine '{word}' with a named type in '{spelling}'"));
            }
            scalar_words.push(word);
            continue;
        }
        if word == "struct" {
            let Some(name) = tokens.get(idx).copied().filter(|name| is_identifier(name)) else {
                return Err(format!("expected a struct name in '{spelling}'"));
            };
            idx += 1;
            if base.is_some() || !scalar_words.is_empty() {
                return Err(format!("multiple base types in '{spelling}'"));
            }
            base = Some(BaseType::Struct(name.to_string()));
            continue;
        }
        if base.is_some() || !scalar_words.is_empty() {
            return Err(format!("multiple base types in '{spelling}'"));
        }
        base = Some(named_base(word));
    }

    let base = match base {
        Some(base) => base,
        None if !scalar_words.is_empty() => match scalar_from_words(&scalar_words) {
            Some(scalar) => BaseType::Scalar(scalar),
            None => {
                return Err(format!("invalid scalar type '{}'", scalar_words.join(" ")));
            }
        },
        None => return Err(format!("missing base type in '{spelling}'")),
    };

    Ok(CType {
        base,
        base_const,
        kindof,
        base_specifiers,
        pointers,
        context_specifiers,
        spelling: spelling.trim().to_string(),
    })
}
