// src/codegen/mapper.rs
//
// Mapping from descriptors and resolved types to binary output names and
// textual signature descriptors.

use crate::descriptors::{DescriptorId, Param, Signature, TypeRef};
use crate::identity::NameId;
use crate::resolve::session::ResolveSession;

/// Short name of the synthesized container holding a package's top-level
/// members.
pub const PACKAGE_UNIT: &str = "PackageUnit";

/// Suffix distinguishing a trait's default-implementation container from the
/// trait's own unit.
pub const DEFAULTS_SUFFIX: &str = "$Defaults";

/// Binary name of a class's implementation unit: the fq name with slashes.
pub fn class_unit_name(session: &ResolveSession, class: DescriptorId) -> String {
    session
        .names
        .display(session.arena.class(class).fq)
        .replace('.', "/")
}

/// Binary name of a trait's default-implementation unit.
pub fn trait_defaults_name(session: &ResolveSession, class: DescriptorId) -> String {
    format!("{}{}", class_unit_name(session, class), DEFAULTS_SUFFIX)
}

/// Binary name of the package-members unit for a package.
pub fn package_unit_name(session: &ResolveSession, fq: NameId) -> String {
    let dotted = session.names.display(fq);
    if dotted.is_empty() {
        PACKAGE_UNIT.to_string()
    } else {
        format!("{}/{}", dotted.replace('.', "/"), PACKAGE_UNIT)
    }
}

/// Human-readable spelling of a resolved type for the text builder.
pub fn type_text(session: &ResolveSession, ty: &TypeRef) -> String {
    match ty {
        TypeRef::Primitive(primitive) => primitive.name().to_string(),
        TypeRef::Class { class, args } => {
            let name = session
                .names
                .display(session.arena.class(*class).fq)
                .to_string();
            if args.is_empty() {
                name
            } else {
                let args: Vec<String> =
                    args.iter().map(|arg| type_text(session, arg)).collect();
                format!("{}<{}>", name, args.join(", "))
            }
        }
        TypeRef::TypeParam(param) => session.arena.name(*param).to_string(),
        TypeRef::Array(elem) => format!("{}[]", type_text(session, elem)),
        TypeRef::Error => "<error>".to_string(),
    }
}

pub fn method_descriptor(session: &ResolveSession, signature: &Signature) -> String {
    format!(
        "({}) -> {}",
        param_list(session, &signature.params),
        type_text(session, &signature.return_type)
    )
}

pub fn constructor_descriptor(session: &ResolveSession, params: &[Param]) -> String {
    format!("({})", param_list(session, params))
}

fn param_list(session: &ResolveSession, params: &[Param]) -> String {
    let rendered: Vec<String> = params
        .iter()
        .map(|param| type_text(session, &param.ty))
        .collect();
    rendered.join(", ")
}
