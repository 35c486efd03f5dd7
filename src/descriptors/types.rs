// src/descriptors/types.rs
//
// Resolved type references and type substitutions. Cross-references are
// descriptor ids, never owning references.

use rustc_hash::FxHashMap;

use super::arena::DescriptorId;

/// Primitive types of the managed target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Char,
    Unit,
}

impl Primitive {
    /// Source-language spelling.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::Char => "char",
            Primitive::Unit => "unit",
        }
    }

    pub fn by_name(name: &str) -> Option<Primitive> {
        Some(match name {
            "bool" => Primitive::Bool,
            "i8" => Primitive::I8,
            "i16" => Primitive::I16,
            "i32" => Primitive::I32,
            "i64" => Primitive::I64,
            "f32" => Primitive::F32,
            "f64" => Primitive::F64,
            "char" => Primitive::Char,
            "unit" => Primitive::Unit,
            _ => return None,
        })
    }
}

/// A fully resolved type reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Primitive(Primitive),
    Class {
        class: DescriptorId,
        args: Vec<TypeRef>,
    },
    TypeParam(DescriptorId),
    Array(Box<TypeRef>),
    /// Stand-in for a reference that failed to resolve; already reported.
    Error,
}

impl TypeRef {
    pub fn class(class: DescriptorId) -> Self {
        TypeRef::Class {
            class,
            args: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TypeRef::Error)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeRef::Primitive(_))
    }

    /// Whether the type mentions any type parameter (directly or nested).
    pub fn mentions_type_params(&self) -> bool {
        match self {
            TypeRef::TypeParam(_) => true,
            TypeRef::Class { args, .. } => args.iter().any(TypeRef::mentions_type_params),
            TypeRef::Array(elem) => elem.mentions_type_params(),
            TypeRef::Primitive(_) | TypeRef::Error => false,
        }
    }
}

/// A mapping from type-parameter descriptors to type arguments.
#[derive(Debug, Clone, Default)]
pub struct TypeSubstitution {
    map: FxHashMap<DescriptorId, TypeRef>,
}

impl TypeSubstitution {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(pairs: impl IntoIterator<Item = (DescriptorId, TypeRef)>) -> Self {
        Self {
            map: pairs.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, param: DescriptorId, argument: TypeRef) {
        self.map.insert(param, argument);
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Apply the substitution, leaving unmapped parameters in place.
    pub fn apply(&self, ty: &TypeRef) -> TypeRef {
        match ty {
            TypeRef::TypeParam(param) => self
                .map
                .get(param)
                .cloned()
                .unwrap_or(TypeRef::TypeParam(*param)),
            TypeRef::Class { class, args } => TypeRef::Class {
                class: *class,
                args: args.iter().map(|arg| self.apply(arg)).collect(),
            },
            TypeRef::Array(elem) => TypeRef::Array(Box::new(self.apply(elem))),
            TypeRef::Primitive(p) => TypeRef::Primitive(*p),
            TypeRef::Error => TypeRef::Error,
        }
    }
}

/// One value parameter of a function or constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
}

/// Resolved callable signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<Param>,
    pub return_type: TypeRef,
}

impl Signature {
    pub fn substituted(&self, substitution: &TypeSubstitution) -> Signature {
        Signature {
            params: self
                .params
                .iter()
                .map(|param| Param {
                    name: param.name.clone(),
                    ty: substitution.apply(&param.ty),
                })
                .collect(),
            return_type: substitution.apply(&self.return_type),
        }
    }
}

/// A resolved annotation value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Fully-qualified dotted name of the annotation class.
    pub name: String,
    pub arguments: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_names_round_trip() {
        for p in [
            Primitive::Bool,
            Primitive::I32,
            Primitive::F64,
            Primitive::Unit,
        ] {
            assert_eq!(Primitive::by_name(p.name()), Some(p));
        }
        assert_eq!(Primitive::by_name("widget"), None);
    }

    #[test]
    fn substitution_applies_recursively() {
        let param = DescriptorId::from_index(3);
        let class = DescriptorId::from_index(9);
        let subst = TypeSubstitution::of([(param, TypeRef::Primitive(Primitive::I64))]);

        let nested = TypeRef::Class {
            class,
            args: vec![TypeRef::Array(Box::new(TypeRef::TypeParam(param)))],
        };
        let applied = subst.apply(&nested);
        assert_eq!(
            applied,
            TypeRef::Class {
                class,
                args: vec![TypeRef::Array(Box::new(TypeRef::Primitive(Primitive::I64)))],
            }
        );
    }

    #[test]
    fn unmapped_params_stay_in_place() {
        let param = DescriptorId::from_index(3);
        let subst = TypeSubstitution::empty();
        assert_eq!(
            subst.apply(&TypeRef::TypeParam(param)),
            TypeRef::TypeParam(param)
        );
    }
}
