//! Property tests for the registration table.
//!
//! For any set of distinct names, registering then looking up returns the
//! binding that was registered, and a second registration under a taken name
//! fails without touching the table.

use std::sync::Arc;

use plinth_core::fixtures::EchoUnit;
use plinth_core::Unit;
use plinth_registry::{Binding, NoClassLoader, RegistrationTable};
use proptest::collection::btree_set;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum BindingShape {
    Instance,
    ClassName(String),
}

fn shape() -> impl Strategy<Value = BindingShape> {
    prop_oneof![
        Just(BindingShape::Instance),
        "[a-z]{1,8}(\\.[A-Z][a-z]{1,8}){1,2}".prop_map(BindingShape::ClassName),
    ]
}

fn build(name: &str, shape: &BindingShape) -> Binding<dyn Unit> {
    match shape {
        BindingShape::Instance => Binding::unit(EchoUnit::new(name)),
        BindingShape::ClassName(class) => Binding::class_name(class.clone()),
    }
}

fn same_binding(a: &Binding<dyn Unit>, b: &Binding<dyn Unit>) -> bool {
    match (a, b) {
        (Binding::Instance(x), Binding::Instance(y)) => Arc::ptr_eq(x, y),
        _ => a.declared_class().is_some() && a.declared_class() == b.declared_class(),
    }
}

proptest! {
    #[test]
    fn register_then_find_returns_same_binding(
        names in btree_set("[a-z][a-z0-9_-]{0,12}", 1..12),
        shapes in proptest::collection::vec(shape(), 12),
    ) {
        let mut table = RegistrationTable::new();
        let mut expected = Vec::new();

        for (name, shape) in names.iter().zip(shapes.iter().cycle()) {
            let binding = build(name, shape);
            table.register_unit(name.as_str(), binding.clone()).unwrap();
            expected.push((name.clone(), binding));
        }

        for (name, binding) in &expected {
            let handle = table.find_unit(name).unwrap();
            prop_assert_eq!(handle.name(), name.as_str());
            prop_assert!(same_binding(handle.binding(), binding));
        }
        prop_assert_eq!(table.unit_count(), names.len());
    }

    #[test]
    fn duplicate_registration_leaves_table_unchanged(
        names in btree_set("[a-z]{1,10}", 1..8),
        pick in any::<prop::sample::Index>(),
        pattern in "/[a-z]{1,6}",
    ) {
        let names: Vec<_> = names.into_iter().collect();
        let mut table = RegistrationTable::new();
        for name in &names {
            table
                .register_unit(name.as_str(), Binding::unit(EchoUnit::new(name.as_str())))
                .unwrap()
                .add_mapping(&pattern)
                .unwrap();
        }
        let taken = pick.get(&names);
        let before = table.find_unit(taken).unwrap().binding().clone();

        let err = table
            .register_unit(taken.as_str(), Binding::class_name("app.Other"))
            .unwrap_err();

        prop_assert_eq!(err.code(), "DUPLICATE_NAME");
        prop_assert_eq!(table.unit_count(), names.len());
        prop_assert_eq!(table.unit_mappings().len(), names.len());
        prop_assert!(same_binding(table.find_unit(taken).unwrap().binding(), &before));
    }

    #[test]
    fn freeze_preserves_lookups(names in btree_set("[a-z]{1,10}", 0..8)) {
        let mut table = RegistrationTable::new();
        for name in &names {
            table
                .register_unit(name.as_str(), Binding::unit(EchoUnit::new(name.as_str())))
                .unwrap();
        }

        let frozen = table.freeze(&NoClassLoader).unwrap();
        for name in &names {
            prop_assert!(frozen.find_unit(name).is_some());
            prop_assert!(frozen.unit(name).is_some());
        }
        prop_assert!(frozen.find_unit("UNREGISTERED").is_none());
    }
}
