use pretty_assertions::assert_eq;
use scifiweb_core::resolver::{Authorize, Constraint, EntryTarget, ResolutionError};
use scifiweb_core::{parse, resolve};

fn resolve_source(source: &str) -> Result<scifiweb_core::ResolvedProgram, Vec<ResolutionError>> {
    resolve(vec![parse(source).unwrap()])
}

#[test]
fn test_resolution_is_deterministic() {
    let source = "\
        collectable Coin has amount;\n\
        collectable Gem has amount;\n\
        group Currency [Coin, Gem];\n\
        distribution Drop {\n\
            amount range 1 to 10;\n\
            group range 1 to 2;\n\
            weighted [50% for Coin, 50% for Gem];\n\
        }";
    let a = resolve_source(source).unwrap();
    let b = resolve_source(source).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_duplicate_definition_is_fatal() {
    let err = resolve_source("collectable Coin;\ncollectable Coin;").unwrap_err();
    assert!(matches!(
        err[0],
        ResolutionError::DuplicateDefinition { ref name, line: 2, .. } if name == "Coin"
    ));
}

#[test]
fn test_duplicate_across_kinds_is_fatal() {
    let err = resolve_source("collectable Coin;\ngroup Coin [];").unwrap_err();
    assert_eq!(err.len(), 1);
    assert!(matches!(err[0], ResolutionError::DuplicateDefinition { .. }));
}

#[test]
fn test_group_cycle_is_fatal() {
    let source = "\
        collectable Coin;\n\
        group A [B, Coin];\n\
        group B [A];";
    let err = resolve_source(source).unwrap_err();
    assert!(
        err.iter()
            .any(|e| matches!(e, ResolutionError::CyclicGroup { .. })),
        "{:?}",
        err
    );
}

#[test]
fn test_group_dag_is_allowed() {
    // a diamond is a DAG, not a cycle
    let source = "\
        collectable Coin;\n\
        group Left [Coin];\n\
        group Right [Coin];\n\
        group Top [Left, Right];";
    let program = resolve_source(source).unwrap();
    let top = program.group("Top").unwrap();
    assert_eq!(top.leaf_types, vec!["Coin".to_string()]);
}

#[test]
fn test_undefined_group_member() {
    let err = resolve_source("group Loot [Ghost];").unwrap_err();
    assert!(matches!(
        err[0],
        ResolutionError::UndefinedReference { ref name, .. } if name == "Ghost"
    ));
}

#[test]
fn test_undefined_reference_in_event_body() {
    let source = "\
        collectable Coin has amount;\n\
        event Pay {\n\
            params [payer user];\n\
            award 1 x Coin to nobody;\n\
        }";
    let err = resolve_source(source).unwrap_err();
    assert!(matches!(
        err[0],
        ResolutionError::UndefinedReference { ref name, .. } if name == "nobody"
    ));
}

#[test]
fn test_set_variable_enters_scope_in_order() {
    let source = "\
        collectable Coin has amount;\n\
        event Pay {\n\
            params [payer user];\n\
            set stash = payer;\n\
            award 1 x Coin to stash;\n\
        }";
    assert!(resolve_source(source).is_ok());

    let reversed = "\
        collectable Coin has amount;\n\
        event Pay {\n\
            params [payer user];\n\
            award 1 x Coin to stash;\n\
            set stash = payer;\n\
        }";
    assert!(resolve_source(reversed).is_err());
}

#[test]
fn test_property_inheritance_with_override() {
    let source = "\
        collectable Relic in Lootable {\n\
            property sellable switch = off;\n\
        }\n\
        collectable Chest in Lootable;\n\
        group Lootable [] {\n\
            property sellable switch = on;\n\
        }";
    let program = resolve_source(source).unwrap();
    let chest = program.collectable("Chest").unwrap();
    assert!(chest.properties.contains_key("sellable"));
    let relic = program.collectable("Relic").unwrap();
    // the override keeps the type's own default
    let prop = relic.properties.get("sellable").unwrap();
    assert_eq!(
        prop.default,
        Some(scifiweb_core::ast::Expression::Literal(
            scifiweb_core::ast::Literal::Switch(false)
        ))
    );
}

#[test]
fn test_distribution_inverted_group_range_is_fatal() {
    let source = "\
        collectable Coin has amount;\n\
        distribution Bad {\n\
            amount range 1 to 10;\n\
            group range 3 to 1;\n\
            weighted [100% for Coin];\n\
        }";
    let err = resolve_source(source).unwrap_err();
    assert!(matches!(err[0], ResolutionError::DistributionConfig { .. }));
}

#[test]
fn test_distribution_all_zero_weights_is_fatal() {
    let source = "\
        collectable Coin;\n\
        collectable Gem;\n\
        distribution Bad {\n\
            amount range 1 to 10;\n\
            group range 1 to 1;\n\
            weighted [0% for Coin, 0% for Gem];\n\
        }";
    let err = resolve_source(source).unwrap_err();
    assert!(matches!(err[0], ResolutionError::DistributionConfig { .. }));
}

#[test]
fn test_distribution_entry_kinds_resolve() {
    let source = "\
        collectable Coin has amount;\n\
        collectable Relic;\n\
        group Treasure [Relic];\n\
        distribution Drop {\n\
            amount range 1 to 10;\n\
            group range 1 to 2;\n\
            weighted [80% for Coin, Treasure x max 1];\n\
        }";
    let program = resolve_source(source).unwrap();
    let drop = program.distribution("Drop").unwrap();
    assert_eq!(drop.entries.len(), 2);
    assert_eq!(drop.entries[0].target, EntryTarget::Type("Coin".to_string()));
    assert_eq!(drop.entries[0].cap, None);
    assert_eq!(
        drop.entries[1].target,
        EntryTarget::Group("Treasure".to_string())
    );
    assert_eq!(drop.entries[1].cap, Some(1));
    // the capped entry shares the mean declared weight
    assert_eq!(drop.entries[1].weight, 0.8);
}

#[test]
fn test_authorize_classification() {
    let source = "\
        collectable Chest;\n\
        event A { authorize gameserver; }\n\
        event B { authorize user; }\n\
        event C {\n\
            params [chest Chest];\n\
            authorize chest.owner;\n\
        }";
    let program = resolve_source(source).unwrap();
    assert_eq!(
        program.event("A").unwrap().authorize,
        Some(Authorize::Role("gameserver".to_string()))
    );
    assert_eq!(program.event("B").unwrap().authorize, Some(Authorize::AnyUser));
    assert_eq!(
        program.event("C").unwrap().authorize,
        Some(Authorize::ParamOwner {
            param: "chest".to_string()
        })
    );
}

#[test]
fn test_authorize_unknown_param_is_fatal() {
    let source = "event A { authorize ghost.owner; }";
    let err = resolve_source(source).unwrap_err();
    assert!(matches!(err[0], ResolutionError::UndefinedReference { .. }));
}

#[test]
fn test_param_constraints_resolve() {
    let source = "\
        collectable Chest;\n\
        group Lootable [Chest];\n\
        event Open {\n\
            params [chest Chest, loot Lootable, opener user, level integer >= 3];\n\
        }";
    let program = resolve_source(source).unwrap();
    let params = &program.event("Open").unwrap().params;
    assert_eq!(params[0].constraint, Constraint::CollectableType("Chest".to_string()));
    assert_eq!(params[1].constraint, Constraint::Group("Lootable".to_string()));
    assert_eq!(params[2].constraint, Constraint::User);
    assert_eq!(params[3].constraint, Constraint::Integer);
    assert!(params[3].guard.is_some());
}

#[test]
fn test_cost_table_must_be_non_decreasing() {
    let source = "\
        collectable Gem has amount;\n\
        collectable Chest {\n\
            redemptions [\n\
                cost 100 - amount x Gem for amount range 1 to 50\n\
            ];\n\
        }";
    let err = resolve_source(source).unwrap_err();
    assert!(matches!(err[0], ResolutionError::CostTable { .. }), "{:?}", err);
}

#[test]
fn test_cost_table_tiers_must_not_overlap() {
    let source = "\
        collectable Gem has amount;\n\
        collectable Chest {\n\
            upgrades [\n\
                cost 10 x Gem for amount range 1 to 10,\n\
                cost 20 x Gem for amount range 5 to 20\n\
            ];\n\
        }";
    let err = resolve_source(source).unwrap_err();
    assert!(matches!(err[0], ResolutionError::CostTable { .. }));
}

#[test]
fn test_notify_requires_remote_event() {
    let source = "\
        event Ping {\n\
            params [who user];\n\
            notify who of Missing with [who];\n\
        }";
    let err = resolve_source(source).unwrap_err();
    assert!(matches!(
        err[0],
        ResolutionError::UndefinedReference { ref name, .. } if name == "Missing"
    ));
}

#[test]
fn test_all_diagnostics_reported_at_once() {
    let source = "\
        collectable Coin;\n\
        collectable Coin;\n\
        group Loot [Ghost];\n\
        event Pay { award 1 x Missing to nobody; }";
    let err = resolve_source(source).unwrap_err();
    assert!(err.len() >= 3, "expected a complete list, got {:?}", err);
}

#[test]
fn test_multiple_files_share_one_namespace() {
    let a = parse("collectable Coin has amount;").unwrap();
    let b = parse("event Pay { params [payer user]; award 1 x Coin to payer; }").unwrap();
    let program = resolve(vec![a, b]).unwrap();
    assert!(program.collectable("Coin").is_some());
    assert!(program.event("Pay").is_some());
}
