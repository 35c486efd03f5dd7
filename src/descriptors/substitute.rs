// src/descriptors/substitute.rs
//
// Descriptor substitution. Non-generic descriptors are returned as-is;
// generic ones get a fresh substituted copy. The original is never mutated.
//
// Substitution is only meaningful once the relevant lazy fields are resolved;
// demanding an unresolved signature here is a caller bug.

use crate::identity::NameTable;
use crate::memo::{OnceSlot, ResolveState};

use super::arena::{
    ClassData, ClassOrigin, ConstructorData, Descriptor, DescriptorArena, DescriptorId,
    DescriptorKind, FunctionData, PropertyData,
};
use super::types::{Param, TypeSubstitution};

pub fn substitute(
    arena: &mut DescriptorArena,
    names: &NameTable,
    id: DescriptorId,
    substitution: &TypeSubstitution,
) -> DescriptorId {
    if substitution.is_empty() {
        return id;
    }
    match &arena.get(id).kind {
        DescriptorKind::Module(_)
        | DescriptorKind::PackageFragment(_)
        | DescriptorKind::TypeParameter(_) => id,
        DescriptorKind::Class(class) => {
            if class.type_params.is_empty() {
                return id;
            }
            substitute_class(arena, names, id, substitution)
        }
        DescriptorKind::Function(function) => {
            let path = arena.path(names, id);
            let signature = function.signature.demand(format_args!("signature of {path}"));
            if function.type_params.is_empty() && !mentions(signature.params.iter(), || {
                signature.return_type.mentions_type_params()
            }) {
                return id;
            }
            let substituted = signature.substituted(substitution);
            let copy = FunctionData {
                type_params: function.type_params.clone(),
                signature: slot_with(substituted, &path),
                signature_state: ResolveState::Done,
                is_static: function.is_static,
                is_abstract: function.is_abstract,
                has_body: function.has_body,
                raw: None,
                original: Some(id),
            };
            alloc_copy(arena, id, DescriptorKind::Function(copy))
        }
        DescriptorKind::Property(property) => {
            let path = arena.path(names, id);
            let ty = property.ty.demand(format_args!("type of {path}"));
            if !ty.mentions_type_params() {
                return id;
            }
            let copy = PropertyData {
                ty: slot_with(substitution.apply(ty), &path),
                ty_state: ResolveState::Done,
                is_mutable: property.is_mutable,
                is_static: property.is_static,
                raw: None,
                original: Some(id),
            };
            alloc_copy(arena, id, DescriptorKind::Property(copy))
        }
        DescriptorKind::Constructor(constructor) => {
            let path = arena.path(names, id);
            let params = constructor
                .params
                .demand(format_args!("parameters of {path}"));
            if !mentions(params.iter(), || false) {
                return id;
            }
            let substituted: Vec<Param> = params
                .iter()
                .map(|param| Param {
                    name: param.name.clone(),
                    ty: substitution.apply(&param.ty),
                })
                .collect();
            let copy = ConstructorData {
                params: slot_with(substituted, &path),
                params_state: ResolveState::Done,
                raw: None,
                original: Some(id),
            };
            alloc_copy(arena, id, DescriptorKind::Constructor(copy))
        }
    }
}

fn substitute_class(
    arena: &mut DescriptorArena,
    names: &NameTable,
    id: DescriptorId,
    substitution: &TypeSubstitution,
) -> DescriptorId {
    let class = arena.class(id);
    let path = arena.path(names, id);
    let supertypes = class
        .supertypes
        .demand(format_args!("supertypes of {path}"));
    let substituted: Vec<_> = supertypes.iter().map(|st| substitution.apply(st)).collect();

    let mut copy = ClassData::new(class.fq, class.kind, ClassOrigin::Substituted { original: id });
    copy.type_params = class.type_params.clone();
    copy.supertypes = slot_with(substituted, &path);
    copy.supertypes_state = ResolveState::Done;
    if let Some(eligible) = class.sam_eligible.get() {
        copy.sam_eligible = slot_with(*eligible, &path);
    }
    alloc_copy(arena, id, DescriptorKind::Class(copy))
}

fn mentions<'a>(
    params: impl Iterator<Item = &'a Param>,
    rest: impl FnOnce() -> bool,
) -> bool {
    let mut any = false;
    for param in params {
        if param.ty.mentions_type_params() {
            any = true;
            break;
        }
    }
    any || rest()
}

fn slot_with<T>(value: T, what: &str) -> OnceSlot<T> {
    let mut slot = OnceSlot::empty();
    slot.set(value, what);
    slot
}

fn alloc_copy(arena: &mut DescriptorArena, original: DescriptorId, kind: DescriptorKind) -> DescriptorId {
    let name = arena.name(original).to_string();
    let containing = arena.containing(original);
    arena.alloc(Descriptor {
        name,
        containing,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::arena::{ModuleData, TypeParameterData};
    use crate::descriptors::types::{Primitive, Signature, TypeRef};

    fn setup() -> (NameTable, DescriptorArena, DescriptorId) {
        let names = NameTable::new();
        let mut arena = DescriptorArena::new();
        let module = arena.alloc(Descriptor {
            name: "<main>".to_string(),
            containing: None,
            kind: DescriptorKind::Module(ModuleData {
                default_imports: vec![],
            }),
        });
        (names, arena, module)
    }

    #[test]
    fn module_substitutes_to_itself() {
        let (names, mut arena, module) = setup();
        let tp = arena.alloc(Descriptor {
            name: "T".to_string(),
            containing: Some(module),
            kind: DescriptorKind::TypeParameter(TypeParameterData { index: 0 }),
        });
        let subst = TypeSubstitution::of([(tp, TypeRef::Primitive(Primitive::I32))]);
        assert_eq!(substitute(&mut arena, &names, module, &subst), module);
    }

    #[test]
    fn generic_function_gets_fresh_copy() {
        let (names, mut arena, module) = setup();
        let tp = arena.alloc(Descriptor {
            name: "T".to_string(),
            containing: Some(module),
            kind: DescriptorKind::TypeParameter(TypeParameterData { index: 0 }),
        });
        let mut data = FunctionData {
            type_params: vec![tp],
            signature: OnceSlot::empty(),
            signature_state: ResolveState::Done,
            is_static: true,
            is_abstract: false,
            has_body: true,
            raw: None,
            original: None,
        };
        data.signature.set(
            Signature {
                params: vec![Param {
                    name: "value".to_string(),
                    ty: TypeRef::TypeParam(tp),
                }],
                return_type: TypeRef::TypeParam(tp),
            },
            "signature of identity",
        );
        let f = arena.alloc(Descriptor {
            name: "identity".to_string(),
            containing: Some(module),
            kind: DescriptorKind::Function(data),
        });

        let subst = TypeSubstitution::of([(tp, TypeRef::Primitive(Primitive::I64))]);
        let copy = substitute(&mut arena, &names, f, &subst);
        assert_ne!(copy, f);
        assert_eq!(arena.function(copy).original, Some(f));
        let copied_sig = arena.function(copy).signature.get().unwrap();
        assert_eq!(copied_sig.return_type, TypeRef::Primitive(Primitive::I64));
        // The original is untouched.
        let original_sig = arena.function(f).signature.get().unwrap();
        assert_eq!(original_sig.return_type, TypeRef::TypeParam(tp));
    }

    #[test]
    fn non_generic_function_substitutes_to_itself() {
        let (names, mut arena, module) = setup();
        let tp = arena.alloc(Descriptor {
            name: "T".to_string(),
            containing: Some(module),
            kind: DescriptorKind::TypeParameter(TypeParameterData { index: 0 }),
        });
        let mut data = FunctionData {
            type_params: vec![],
            signature: OnceSlot::empty(),
            signature_state: ResolveState::Done,
            is_static: true,
            is_abstract: false,
            has_body: true,
            raw: None,
            original: None,
        };
        data.signature.set(
            Signature {
                params: vec![],
                return_type: TypeRef::Primitive(Primitive::Unit),
            },
            "signature of main",
        );
        let f = arena.alloc(Descriptor {
            name: "main".to_string(),
            containing: Some(module),
            kind: DescriptorKind::Function(data),
        });
        let subst = TypeSubstitution::of([(tp, TypeRef::Primitive(Primitive::I64))]);
        assert_eq!(substitute(&mut arena, &names, f, &subst), f);
    }
}
