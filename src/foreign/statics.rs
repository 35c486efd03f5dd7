// src/foreign/statics.rs
//
// Static-member namespace detection for foreign classes, plus
// single-abstract-method interface eligibility.

use super::model::{ForeignClass, ForeignClassKind, ForeignField, ForeignMethod};

/// Exclusion rules consulted by the static-member predicate.
pub trait MemberExclusions {
    fn excludes_method(&self, owner: &ForeignClass, method: &ForeignMethod) -> bool;
    fn excludes_field(&self, owner: &ForeignClass, field: &ForeignField) -> bool;
}

/// Default exclusion rules.
///
/// Provisional: the exact exclusion set for enum-related synthetic members is
/// pending product-owner confirmation, so it is policy, not hard-coded.
#[derive(Debug, Clone)]
pub struct StaticMemberPolicy {
    /// Static methods on enum classes that belong to the enum's companion
    /// scope rather than the package namespace.
    pub enum_companion_methods: Vec<String>,
    /// Whether enum constant fields are excluded.
    pub exclude_enum_constants: bool,
    /// Whether compiler-synthesized methods are excluded.
    pub exclude_synthetic: bool,
}

impl Default for StaticMemberPolicy {
    fn default() -> Self {
        Self {
            enum_companion_methods: vec!["values".to_string(), "valueOf".to_string()],
            exclude_enum_constants: true,
            exclude_synthetic: true,
        }
    }
}

impl MemberExclusions for StaticMemberPolicy {
    fn excludes_method(&self, owner: &ForeignClass, method: &ForeignMethod) -> bool {
        if self.exclude_synthetic && method.is_synthetic {
            return true;
        }
        owner.kind == ForeignClassKind::Enum
            && self
                .enum_companion_methods
                .iter()
                .any(|name| name == &method.name)
    }

    fn excludes_field(&self, owner: &ForeignClass, field: &ForeignField) -> bool {
        self.exclude_enum_constants
            && owner.kind == ForeignClassKind::Enum
            && field.is_enum_constant
    }
}

/// Detects interfaces eligible for function-literal conversion.
#[derive(Debug, Default)]
pub struct SamConverter;

impl SamConverter {
    pub fn new() -> Self {
        Self
    }

    /// An interface with exactly one abstract, non-synthetic, non-generic
    /// method and no fields.
    pub fn is_sam_interface(&self, class: &ForeignClass) -> bool {
        if !class.is_interface() || !class.fields.is_empty() {
            return false;
        }
        let mut abstract_methods = class
            .methods
            .iter()
            .filter(|m| m.is_abstract && !m.is_synthetic);
        match (abstract_methods.next(), abstract_methods.next()) {
            (Some(only), None) => only.type_params.is_empty(),
            _ => false,
        }
    }
}

/// The recursive static-member predicate deciding whether a foreign class
/// contributes a package-level namespace.
pub struct StaticMemberFilter {
    policy: Box<dyn MemberExclusions>,
    sam: SamConverter,
}

impl StaticMemberFilter {
    pub fn new(policy: StaticMemberPolicy) -> Self {
        Self::with_exclusions(Box::new(policy))
    }

    pub fn with_exclusions(policy: Box<dyn MemberExclusions>) -> Self {
        Self {
            policy,
            sam: SamConverter::new(),
        }
    }

    /// True if the class has a non-excluded static method or field, a nested
    /// eligible SAM interface, or a static nested class that recursively has
    /// static members. Short-circuits on the first qualifying member.
    pub fn has_static_members(&self, class: &ForeignClass) -> bool {
        for method in &class.methods {
            if method.is_static && !self.policy.excludes_method(class, method) {
                return true;
            }
        }
        for field in &class.fields {
            if field.is_static && !self.policy.excludes_field(class, field) {
                return true;
            }
        }
        for nested in &class.nested {
            if self.sam.is_sam_interface(nested) {
                return true;
            }
            if nested.is_static && self.has_static_members(nested) {
                return true;
            }
        }
        false
    }

    /// Whether a static member survives the exclusion policy, for the
    /// statics-scope view.
    pub fn admits_method(&self, owner: &ForeignClass, method: &ForeignMethod) -> bool {
        method.is_static && !self.policy.excludes_method(owner, method)
    }

    pub fn admits_field(&self, owner: &ForeignClass, field: &ForeignField) -> bool {
        field.is_static && !self.policy.excludes_field(owner, field)
    }
}

impl std::fmt::Debug for StaticMemberFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticMemberFilter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::foreign::model::build;
    use crate::foreign::model::ForeignTypeRef;

    fn filter() -> StaticMemberFilter {
        StaticMemberFilter::new(StaticMemberPolicy::default())
    }

    fn int() -> ForeignTypeRef {
        ForeignTypeRef::Primitive("int".to_string())
    }

    #[test]
    fn static_field_qualifies() {
        let mut class = build::class("host.Util", ForeignClassKind::Class);
        class.fields.push(build::field("MAX", true, int()));
        assert!(filter().has_static_members(&class));
    }

    #[test]
    fn instance_members_only_do_not_qualify() {
        let mut class = build::class("host.Point", ForeignClassKind::Class);
        class.fields.push(build::field("x", false, int()));
        class.methods.push(build::method("norm", false, int()));
        assert!(!filter().has_static_members(&class));
    }

    #[test]
    fn recursive_nested_static_field_qualifies() {
        let mut inner = build::class("host.Outer.Holder", ForeignClassKind::Class);
        inner.is_static = true;
        inner.fields.push(build::field("UNIT", true, int()));
        let mut outer = build::class("host.Outer", ForeignClassKind::Class);
        outer.nested.push(Rc::new(inner));
        assert!(filter().has_static_members(&outer));
    }

    #[test]
    fn nested_sam_interface_qualifies() {
        let mut listener = build::class("host.Widget.Listener", ForeignClassKind::Interface);
        let mut on_event = build::method("onEvent", false, int());
        on_event.is_abstract = true;
        listener.methods.push(on_event);

        let mut outer = build::class("host.Widget", ForeignClassKind::Class);
        outer.nested.push(Rc::new(listener));
        assert!(filter().has_static_members(&outer));
    }

    #[test]
    fn enum_companion_members_are_excluded() {
        let mut colors = build::class("host.Color", ForeignClassKind::Enum);
        colors
            .methods
            .push(build::method("values", true, ForeignTypeRef::named("host.Color")));
        colors
            .methods
            .push(build::method("valueOf", true, ForeignTypeRef::named("host.Color")));
        let mut red = build::field("RED", true, ForeignTypeRef::named("host.Color"));
        red.is_enum_constant = true;
        colors.fields.push(red);
        assert!(!filter().has_static_members(&colors));

        // A genuine static helper on the enum still qualifies.
        colors.methods.push(build::method("parse", true, int()));
        assert!(filter().has_static_members(&colors));
    }

    struct CountingExclusions {
        checks: Rc<Cell<usize>>,
    }

    impl MemberExclusions for CountingExclusions {
        fn excludes_method(&self, _: &ForeignClass, _: &ForeignMethod) -> bool {
            self.checks.set(self.checks.get() + 1);
            false
        }

        fn excludes_field(&self, _: &ForeignClass, _: &ForeignField) -> bool {
            self.checks.set(self.checks.get() + 1);
            false
        }
    }

    #[test]
    fn short_circuits_on_first_qualifying_member() {
        let checks = Rc::new(Cell::new(0));
        let filter = StaticMemberFilter::with_exclusions(Box::new(CountingExclusions {
            checks: checks.clone(),
        }));

        let mut class = build::class("host.Fast", ForeignClassKind::Class);
        class.methods.push(build::method("first", true, int()));
        class.methods.push(build::method("second", true, int()));
        class.fields.push(build::field("LATER", true, int()));

        assert!(filter.has_static_members(&class));
        // Only the first static method was ever policy-checked.
        assert_eq!(checks.get(), 1);
    }

    #[test]
    fn sam_requires_exactly_one_abstract_method() {
        let mut runnable = build::class("host.Run", ForeignClassKind::Interface);
        let mut run = build::method("run", false, int());
        run.is_abstract = true;
        runnable.methods.push(run.clone());
        let sam = SamConverter::new();
        assert!(sam.is_sam_interface(&runnable));

        runnable.methods.push({
            let mut stop = build::method("stop", false, int());
            stop.is_abstract = true;
            stop
        });
        assert!(!sam.is_sam_interface(&runnable));

        let plain = build::class("host.Data", ForeignClassKind::Class);
        assert!(!sam.is_sam_interface(&plain));
    }
}
