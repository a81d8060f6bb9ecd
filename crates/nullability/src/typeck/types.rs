use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Int,
    UInt,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    CGFloat,
    Bool,
    CChar,
    CSignedChar,
    CUnsignedChar,
    CShort,
    CUnsignedShort,
    CInt,
    CUnsignedInt,
    CLong,
    CUnsignedLong,
    CLongLong,
    CUnsignedLongLong,
    CFloat,
    CDouble,
    CBool,
}

const SCALARS: &[Scalar] = &[
    Scalar::Int,
    Scalar::UInt,
    Scalar::Int8,
    Scalar::Int16,
    Scalar::Int32,
    Scalar::Int64,
    Scalar::UInt8,
    Scalar::UInt16,
    Scalar::UInt32,
    Scalar::UInt64,
    Scalar::Float,
    Scalar::Double,
    Scalar::CGFloat,
    Scalar::Bool,
    Scalar::CChar,
    Scalar::CSignedChar,
    Scalar::CUnsignedChar,
    Scalar::CShort,
    Scalar::CUnsignedShort,
    Scalar::CInt,
    Scalar::CUnsignedInt,
    Scalar::CLong,
    Scalar::CUnsignedLong,
    Scalar::CLongLong,
    Scalar::CUnsignedLongLong,
    Scalar::CFloat,
    Scalar::CDouble,
    Scalar::CBool,
];

impl Scalar {
    pub fn name(self) -> &'static str {
        match self {
            Scalar::Int => "Int",
            Scalar::UInt => "UInt",
            Scalar::Int8 => "Int8",
            Scalar::Int16 => "Int16",
            Scalar::Int32 => "Int32",
            Scalar::Int64 => "Int64",
            Scalar::UInt8 => "UInt8",
            Scalar::UInt16 => "UInt16",
            Scalar::UInt32 => "UInt32",
            Scalar::UInt64 => "UInt64",
            Scalar::Float => "Float",
            Scalar::Double => "Double",
            Scalar::CGFloat => "CGFloat",
            Scalar::Bool => "Bool",
            Scalar::CChar => "CChar",
            Scalar::CSignedChar => "CSignedChar",
            Scalar::CUnsignedChar => "CUnsignedChar",
            Scalar::CShort => "CShort",
            Scalar::CUnsignedShort => "CUnsignedShort",
            Scalar::CInt => "CInt",
            Scalar::CUnsignedInt => "CUnsignedInt",
            Scalar::CLong => "CLong",
            Scalar::CUnsignedLong => "CUnsignedLong",
            Scalar::CLongLong => "CLongLong",
            Scalar::CUnsignedLongLong => "CUnsignedLongLong",
            Scalar::CFloat => "CFloat",
            Scalar::CDouble => "CDouble",
            Scalar::CBool => "CBool",
        }
    }

    pub fn from_name(name: &str) -> Option<Scalar> {
        SCALARS.iter().copied().find(|scalar| scalar.name() == name)
    }

    /// C type aliases collapse onto the fixed-width type they name.
    pub fn canonical(self) -> Scalar {
        match self {
            Scalar::CChar | Scalar::CSignedChar => Scalar::Int8,
            Scalar::CUnsignedChar => Scalar::UInt8,
            Scalar::CShort => Scalar::Int16,
            Scalar::CUnsignedShort => Scalar::UInt16,
            Scalar::CInt => Scalar::Int32,
            Scalar::CUnsignedInt => Scalar::UInt32,
            Scalar::CLong => Scalar::Int,
            Scalar::CUnsignedLong => Scalar::UInt,
            Scalar::CLongLong => Scalar::Int64,
            Scalar::CUnsignedLongLong => Scalar::UInt64,
            Scalar::CFloat => Scalar::Float,
            Scalar::CDouble => Scalar::Double,
            Scalar::CBool => Scalar::Bool,
            other => other,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self.canonical(),
            Scalar::Int
                | Scalar::UInt
                | Scalar::Int8
                | Scalar::Int16
                | Scalar::Int32
                | Scalar::Int64
                | Scalar::UInt8
                | Scalar::UInt16
                | Scalar::UInt32
                | Scalar::UInt64
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self.canonical(), Scalar::Float | Scalar::Double | Scalar::CGFloat)
    }
}

/// A host-language type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Produced after an error or by dynamic lookup; compatible with everything.
    Unknown,
    Void,
    Scalar(Scalar),
    String,
    /// An Objective-C class.
    Object(String),
    /// A Core Foundation reference type.
    CoreFoundation(String),
    AnyObject,
    AnyClass,
    Pointer { pointee: Box<Type>, mutable: bool },
    RawPointer { mutable: bool },
    OpaquePointer,
    Optional(Box<Type>),
    /// A class name used as a value, e.g. the receiver of a class method.
    Metatype(String),
}

impl Type {
    pub fn optional(inner: Type) -> Type {
        match inner {
            Type::Optional(_) | Type::Unknown => inner,
            other => Type::Optional(Box::new(other)),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Type::Optional(_))
    }

    /// The wrapped type of an optional, or the type itself.
    pub fn non_optional(&self) -> &Type {
        match self {
            Type::Optional(inner) => inner,
            other => other,
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Scalar(scalar) if scalar.canonical() == Scalar::Bool)
    }

    /// Types that carry null semantics when imported.
    pub fn is_reference_like(&self) -> bool {
        matches!(
            self,
            Type::Object(_)
                | Type::CoreFoundation(_)
                | Type::AnyObject
                | Type::AnyClass
                | Type::Pointer { .. }
                | Type::RawPointer { .. }
                | Type::OpaquePointer
        )
    }

    /// Class-like references that convert to `AnyObject`.
    pub fn is_object_like(&self) -> bool {
        matches!(
            self,
            Type::Object(_) | Type::CoreFoundation(_) | Type::AnyObject | Type::AnyClass
        )
    }

    pub fn name(&self) -> String {
        match self {
            Type::Unknown => "_".to_string(),
            Type::Void => "Void".to_string(),
            Type::Scalar(scalar) => scalar.name().to_string(),
            Type::String => "String".to_string(),
            Type::Object(name) | Type::CoreFoundation(name) => name.clone(),
            Type::AnyObject => "AnyObject".to_string(),
            Type::AnyClass => "AnyClass".to_string(),
            Type::Pointer { pointee, mutable } => {
                if *mutable {
                    format!("UnsafeMutablePointer<{}>", pointee.name())
                } else {
                    format!("UnsafePointer<{}>", pointee.name())
                }
            }
            Type::RawPointer { mutable: true } => "UnsafeMutableRawPointer".to_string(),
            Type::RawPointer { mutable: false } => "UnsafeRawPointer".to_string(),
            Type::OpaquePointer => "OpaquePointer".to_string(),
            Type::Optional(inner) => format!("{}?", inner.name()),
            Type::Metatype(name) => format!("{name}.Type"),
        }
    }

    /// Structural equality that looks through C scalar aliases.
    pub fn same_as(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Scalar(a), Type::Scalar(b)) => a.canonical() == b.canonical(),
            (Type::Optional(a), Type::Optional(b)) => a.same_as(b),
            (
                Type::Pointer {
                    pointee: a,
                    mutable: ma,
                },
                Type::Pointer {
                    pointee: b,
                    mutable: mb,
                },
            ) => ma == mb && a.same_as(b),
            _ => self == other,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A foreign slot's host type, before optional wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectedType {
    pub base: Type,
    pub optional: bool,
}

impl ProjectedType {
    pub fn plain(base: Type) -> Self {
        Self {
            base,
            optional: false,
        }
    }

    pub fn to_type(&self) -> Type {
        if self.optional {
            Type::optional(self.base.clone())
        } else {
            self.base.clone()
        }
    }
}

impl fmt::Display for ProjectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_render_like_the_host_language() {
        let ty = Type::optional(Type::Pointer {
            pointee: Box::new(Type::Scalar(Scalar::CChar)),
            mutable: false,
        });
        assert_eq!(ty.name(), "UnsafePointer<CChar>?");
        assert_eq!(Type::optional(Type::Object("SomeClass".into())).name(), "SomeClass?");
    }

    #[test]
    fn optional_never_nests() {
        let once = Type::optional(Type::AnyObject);
        let twice = Type::optional(once.clone());
        assert_eq!(once, twice);
        assert_eq!(Type::optional(Type::Unknown), Type::Unknown);
    }

    #[test]
    fn aliases_compare_through_canonical_scalars() {
        assert!(Type::Scalar(Scalar::CInt).same_as(&Type::Scalar(Scalar::Int32)));
        assert!(!Type::Scalar(Scalar::CInt).same_as(&Type::Scalar(Scalar::Int)));
        assert_eq!(Scalar::from_name("CInt"), Some(Scalar::CInt));
        assert_eq!(Scalar::from_name("Widget"), None);
    }
}
