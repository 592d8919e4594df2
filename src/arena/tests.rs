use super::*;
use crate::node::{CpuRegister, Label, Scope, VariableDeclaration};

#[test]
fn test_scope_keeps_insertion_order() {
    let mut ir = Ir::new();
    let root = ir.scope();
    let a = ir.label("a");
    let b = ir.label("b");
    ir.push_child(root, a).unwrap();
    ir.push_child(root, b).unwrap();

    let scope = ir.get(root).unwrap();
    assert_eq!(scope.children, vec![a.raw(), b.raw()]);
    assert_eq!(scope.len(), 2);
}

#[test]
fn test_components_keep_order_and_repeats() {
    let mut ir = Ir::new();
    let byte = ir.type_with_width("u8", 1);
    let word = ir.type_with_width("u16", 2);
    let triple = ir.composite_type("triple", vec![byte, word, byte]).unwrap();
    assert_eq!(ir.get(triple).unwrap().components, vec![byte, word, byte]);
    assert_eq!(ir.owner_count(byte).unwrap(), 2);

    ir.push_component(triple, word).unwrap();
    assert_eq!(ir.get(triple).unwrap().components.len(), 4);
    assert_eq!(ir.owner_count(word).unwrap(), 2);
}

#[test]
fn test_weak_operand_expires_with_its_scope_entry() {
    let mut ir = Ir::new();
    let root = ir.scope();
    let int = ir.type_with_width("int32", 4);
    let x = ir.variable_declaration(int, "x").unwrap();
    let eax = ir.cpu_register("eax");
    let assign = ir.assignment(x, eax).unwrap();
    ir.push_child(root, x).unwrap();
    ir.push_child(root, assign).unwrap();

    let removed = ir.remove_child(root, 0).unwrap();
    assert_eq!(removed, x.raw());
    assert!(!ir.contains(x));
    assert!(!ir.contains(int));

    let lhs = ir.get(assign).unwrap().lhs;
    assert_eq!(ir.node(lhs).unwrap_err(), IrError::Expired { id: x.raw() });
    assert!(ir.contains(eax));
}

#[test]
fn test_shared_child_survives_one_owner() {
    let mut ir = Ir::new();
    let a = ir.scope();
    let b = ir.scope();
    let label = ir.label("shared");
    ir.push_child(a, label).unwrap();
    ir.push_child(b, label).unwrap();
    assert_eq!(ir.owner_count(label).unwrap(), 2);

    ir.free(a).unwrap();
    assert!(ir.contains(label));
    assert_eq!(ir.owner_count(label).unwrap(), 1);

    ir.remove_child(b, 0).unwrap();
    assert!(!ir.contains(label));
}

#[test]
fn test_duplicate_shares_children() {
    let mut ir = Ir::new();
    let root = ir.scope();
    let top = ir.label("top");
    let jump = ir.jump(top).unwrap();
    ir.push_child(root, top).unwrap();
    ir.push_child(root, jump).unwrap();

    let copy = ir.duplicate(root).unwrap();
    assert_ne!(copy, root);
    assert_eq!(ir.owner_count(jump).unwrap(), 2);

    ir.free(root).unwrap();
    assert!(!ir.contains(root));
    assert_eq!(ir.get(copy).unwrap().children, vec![top.raw(), jump.raw()]);
    let target = ir.get(jump).unwrap().label;
    assert_eq!(ir.get(target).unwrap().name, "top");
}

#[test]
fn test_duplicate_with_expired_operand_fails() {
    let mut ir = Ir::new();
    let int = ir.type_identifier("int");
    let x = ir.variable_declaration(int, "x").unwrap();
    let eax = ir.cpu_register("eax");
    let assign = ir.assignment(x, eax).unwrap();
    ir.free(x).unwrap();
    assert_eq!(
        ir.duplicate(assign).unwrap_err(),
        IrError::Expired { id: x.raw() }
    );
}

#[test]
fn test_cycles_are_rejected() {
    let mut ir = Ir::new();
    let outer = ir.scope();
    let inner = ir.scope();
    ir.push_child(outer, inner).unwrap();

    assert_eq!(
        ir.push_child(inner, outer).unwrap_err(),
        IrError::Cycle {
            parent: inner.raw(),
            child: outer.raw()
        }
    );
    assert!(matches!(
        ir.push_child(outer, outer),
        Err(IrError::Cycle { .. })
    ));
    assert!(ir.get(outer).unwrap().children == vec![inner.raw()]);
    assert_eq!(ir.owner_count(outer).unwrap(), 0);

    let body = ir.scope();
    let lp = ir.loop_over(body).unwrap();
    assert!(matches!(
        ir.push_child(body, lp),
        Err(IrError::Cycle { .. })
    ));

    let ty = ir.type_identifier("node");
    assert!(matches!(
        ir.push_component(ty, ty),
        Err(IrError::Cycle { .. })
    ));
}

#[test]
fn test_remove_child_out_of_range() {
    let mut ir = Ir::new();
    let root = ir.scope();
    let l = ir.label("l");
    ir.push_child(root, l).unwrap();
    assert_eq!(
        ir.remove_child(root, 3).unwrap_err(),
        IrError::ChildOutOfRange {
            scope: root.raw(),
            index: 3,
            len: 1
        }
    );
    assert!(ir.contains(l));
}

#[test]
fn test_free_refuses_owned_nodes() {
    let mut ir = Ir::new();
    let root = ir.scope();
    let l = ir.label("l");
    ir.push_child(root, l).unwrap();
    assert_eq!(
        ir.free(l).unwrap_err(),
        IrError::InUse {
            id: l.raw(),
            owners: 1
        }
    );
    ir.free(root).unwrap();
    assert!(ir.is_empty());
}

#[test]
fn test_stale_handle_after_slot_reuse() {
    let mut ir = Ir::new();
    let old = ir.label("old");
    ir.free(old).unwrap();
    let new = ir.cpu_register("eax");

    assert_eq!(old.raw().index(), new.raw().index());
    assert_ne!(old.raw().generation(), new.raw().generation());
    assert_eq!(ir.get(old).unwrap_err(), IrError::Expired { id: old.raw() });
    assert_eq!(ir.get(new).unwrap().name, "eax");
    assert_eq!(ir.len(), 1);
}

#[test]
fn test_downcast() {
    let mut ir = Ir::new();
    let reg = ir.cpu_register("eax");
    let erased: NodeId = reg.into();
    assert_eq!(ir.downcast::<CpuRegister>(erased).unwrap(), reg);
    assert_eq!(
        ir.downcast::<Label>(erased).unwrap_err(),
        IrError::KindMismatch {
            id: erased,
            expected: NodeKind::Label,
            found: NodeKind::CpuRegister
        }
    );
}

#[test]
fn test_resolve_location_replaces_and_clears() {
    let mut ir = Ir::new();
    let int = ir.type_identifier("int");
    let x = ir.variable_declaration(int, "x").unwrap();
    assert!(ir.get(x).unwrap().location.is_none());

    let eax = ir.cpu_register("eax");
    ir.resolve_location(x, eax).unwrap();
    assert_eq!(ir.owner_count(eax).unwrap(), 1);

    let slot = ir.memory_address(0x100);
    ir.resolve_location(x, slot).unwrap();
    assert!(!ir.contains(eax));
    assert_eq!(
        ir.get(x).unwrap().location.map(|loc| loc.id()),
        Some(slot.raw())
    );

    ir.clear_location(x).unwrap();
    assert!(!ir.contains(slot));
    assert!(ir.get(x).unwrap().location.is_none());
}

#[test]
fn test_resolve_location_same_target_twice() {
    let mut ir = Ir::new();
    let int = ir.type_identifier("int");
    let x = ir.variable_declaration(int, "x").unwrap();
    let eax = ir.cpu_register("eax");
    ir.resolve_location(x, eax).unwrap();
    ir.resolve_location(x, eax).unwrap();
    assert!(ir.contains(eax));
    assert_eq!(ir.owner_count(eax).unwrap(), 1);
}

#[test]
fn test_constructor_with_expired_handle() {
    let mut ir = Ir::new();
    let body = ir.scope();
    ir.free(body).unwrap();
    assert_eq!(
        ir.loop_over(body).unwrap_err(),
        IrError::Expired { id: body.raw() }
    );
    assert!(ir.is_empty());
}

#[test]
fn test_detached_lists_roots() {
    let mut ir = Ir::new();
    let root = ir.scope();
    let f = ir.function_definition("f");
    let l = ir.label("l");
    ir.push_child(root, l).unwrap();

    let detached = ir.detached();
    assert_eq!(detached, vec![root.raw(), f.raw()]);
    assert_eq!(ir.ids().count(), 4);
}

#[test]
fn test_free_cascades_through_function() {
    let mut ir = Ir::new();
    let int = ir.type_identifier("int");
    let p = ir.variable_declaration(int, "p").unwrap();
    let f = ir.function_definition("f");
    ir.push_parameter(f, p).unwrap();
    let body = ir.get(f).unwrap().body;
    let l = ir.label("l");
    ir.push_child(body, l).unwrap();
    assert_eq!(ir.len(), 5);

    ir.free(f).unwrap();
    assert!(ir.is_empty());
}

#[test]
fn test_function_with_existing_parts() {
    let mut ir = Ir::new();
    let int = ir.type_identifier("int");
    let a = ir.variable_declaration(int, "a").unwrap();
    let b = ir.variable_declaration(int, "b").unwrap();
    let body = ir.scope();
    let f = ir.function_with("g", vec![a, b], body).unwrap();
    let func = ir.get(f).unwrap();
    assert_eq!(func.parameters, vec![a, b]);
    assert_eq!(func.body, body);
    assert_eq!(ir.owner_count(body).unwrap(), 1);
}

#[test]
fn test_typed_handle_debug() {
    let mut ir = Ir::new();
    let _ = ir.label("skip");
    let s: Id<Scope> = ir.scope();
    assert_eq!(format!("{:?}", s), "Id<scope>(1v0)");
    assert_eq!(s.to_string(), "#1");
}

#[test]
fn test_serde_round_trip() {
    let mut ir = Ir::new();
    let root = ir.scope();
    let int = ir.type_with_width("int32", 4);
    let x = ir.variable_declaration(int, "x").unwrap();
    let eax = ir.cpu_register("eax");
    ir.resolve_location(x, eax).unwrap();
    ir.push_child(root, x).unwrap();
    let dropped = ir.label("dropped");
    ir.free(dropped).unwrap();

    let json = serde_json::to_string(&ir).unwrap();
    let back: Ir = serde_json::from_str(&json).unwrap();
    assert_eq!(back.len(), ir.len());
    assert_eq!(back.dump(root).unwrap(), ir.dump(root).unwrap());
    assert!(!back.contains(dropped));
    let var: &VariableDeclaration = back.get(x).unwrap();
    assert_eq!(var.name, "x");
}

#[test]
fn test_resolve_location_on_wrong_kind_leaves_location_untouched() {
    let mut ir = Ir::new();
    let label = ir.label("not_a_var");
    let eax = ir.cpu_register("eax");
    let forged: Id<VariableDeclaration> = Id::from_raw(label.raw());

    assert_eq!(
        ir.resolve_location(forged, eax).unwrap_err(),
        IrError::KindMismatch {
            id: label.raw(),
            expected: NodeKind::VariableDeclaration,
            found: NodeKind::Label
        }
    );
    assert_eq!(ir.owner_count(eax).unwrap(), 0);
    ir.free(eax).unwrap();
    assert!(!ir.contains(eax));
}

#[test]
fn test_function_body_is_owned_by_its_function() {
    let mut ir = Ir::new();
    let f = ir.function_definition("f");
    let body = ir.get(f).unwrap().body;
    assert_eq!(ir.owner_count(body).unwrap(), 1);
    assert_eq!(
        ir.free(body).unwrap_err(),
        IrError::InUse {
            id: body.raw(),
            owners: 1
        }
    );
    assert_eq!(ir.detached(), vec![f.raw()]);
}

// ─── Loading ──────────────────────────────────────────────────────

fn load(value: serde_json::Value) -> Result<Ir, serde_json::Error> {
    serde_json::from_value(value)
}

#[test]
fn test_load_ignores_persisted_free_list() {
    let mut ir = load(serde_json::json!({ "slots": [], "free": [5], "live": 0 })).unwrap();
    let boom = ir.label("boom");
    assert_eq!(ir.get(boom).unwrap().name, "boom");
    assert_eq!(ir.len(), 1);

    let mut ir = load(serde_json::json!({
        "slots": [
            { "generation": 0, "entry": { "node": { "Label": { "name": "kept" } } } }
        ],
        "free": [0],
        "live": 7
    }))
    .unwrap();
    assert_eq!(ir.len(), 1);
    let kept: Id<Label> = ir.downcast(NodeId::new(0, 0)).unwrap();
    let eax = ir.cpu_register("eax");
    assert_ne!(eax.raw().index(), 0);
    assert_eq!(ir.get(kept).unwrap().name, "kept");
    assert_eq!(ir.len(), 2);
}

#[test]
fn test_load_reuses_empty_slots() {
    let mut ir = load(serde_json::json!({
        "slots": [
            { "generation": 3, "entry": null },
            { "generation": 0, "entry": { "node": { "Label": { "name": "l" } } } }
        ]
    }))
    .unwrap();
    assert_eq!(ir.len(), 1);
    let eax = ir.cpu_register("eax");
    assert_eq!(eax.raw(), NodeId::new(0, 3));
}

#[test]
fn test_load_recomputes_owner_counts() {
    let mut ir = Ir::new();
    let root = ir.scope();
    let l = ir.label("l");
    ir.push_child(root, l).unwrap();
    ir.push_child(root, l).unwrap();

    let mut value = serde_json::to_value(&ir).unwrap();
    assert!(value.get("free").is_none());
    value["slots"][1]["entry"]["owners"] = serde_json::json!(0);

    let mut back = load(value).unwrap();
    assert_eq!(back.owner_count(l).unwrap(), 2);
    assert!(matches!(back.free(l), Err(IrError::InUse { owners: 2, .. })));
    back.free(root).unwrap();
    assert!(back.is_empty());
}

#[test]
fn test_load_rejects_dangling_owned_edge() {
    let err = load(serde_json::json!({
        "slots": [
            { "generation": 0, "entry": { "node": { "Scope": {
                "children": [{ "index": 3, "generation": 0 }]
            } } } }
        ]
    }))
    .unwrap_err();
    assert!(err.to_string().contains("reference to #3 has expired"), "{}", err);
}

#[test]
fn test_load_rejects_ownership_cycles() {
    let err = load(serde_json::json!({
        "slots": [
            { "generation": 0, "entry": { "node": { "Scope": {
                "children": [{ "index": 0, "generation": 0 }]
            } } } }
        ]
    }))
    .unwrap_err();
    assert!(err.to_string().contains("ownership cycle"), "{}", err);

    let err = load(serde_json::json!({
        "slots": [
            { "generation": 0, "entry": { "node": { "Scope": {
                "children": [{ "index": 1, "generation": 0 }]
            } } } },
            { "generation": 0, "entry": { "node": { "Loop": {
                "body": { "index": 0, "generation": 0 }
            } } } }
        ]
    }))
    .unwrap_err();
    assert!(err.to_string().contains("ownership cycle"), "{}", err);
}

#[test]
fn test_load_keeps_dead_weak_operands() {
    let ir = load(serde_json::json!({
        "slots": [
            { "generation": 1, "entry": null },
            { "generation": 0, "entry": { "node": { "CpuRegister": { "name": "eax" } } } },
            { "generation": 0, "entry": { "node": { "Assignment": {
                "lhs": { "index": 0, "generation": 0 },
                "rhs": { "index": 1, "generation": 0 }
            } } } }
        ]
    }))
    .unwrap();
    let assign: Id<crate::node::Assignment> = ir.downcast(NodeId::new(2, 0)).unwrap();
    let lhs = ir.get(assign).unwrap().lhs;
    assert_eq!(
        ir.node(lhs).unwrap_err(),
        IrError::Expired {
            id: NodeId::new(0, 0)
        }
    );
    assert_eq!(ir.owner_count(NodeId::new(1, 0)).unwrap(), 0);
}
