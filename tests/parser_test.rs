use pretty_assertions::assert_eq;
use scifiweb_core::ast::{Item, Statement};
use scifiweb_core::parse;

const FULL_PROGRAM: &str = r#"
# economy for the first dungeon
collectable Coin has amount;
collectable Gem has amount;
collectable Relic;

collectable Chest in Lootable {
    has amount;
    property opened switch = off;
    property quality integer = random range(1, 100);
    upgrades [
        cost 10 * amount x Gem for amount range 1 to 9,
        cost 25 * amount x Gem for amount range 10 to 20
    ];
}

group Lootable [Relic] {
    property sellable switch = on;
}

distribution ChestLoot {
    amount range 50 to 100;
    group range 1 to 3;
    weighted [
        90% for Coin,
        10% for Gem,
        Relic x max 2
    ];
}

remote event ChestOpened [chest Chest, opener user];

event OpenChest {
    params [chest Chest, opener user];
    authorize chest.owner;
    assert chest.opened = off;
    option:
        timer 4 hours
    or
        cost 5 x Gem
    end;
    award ChestLoot to opener;
    notify opener of ChestOpened with [chest, opener];
}
"#;

#[test]
fn test_parse_full_program() {
    let file = parse(FULL_PROGRAM).unwrap();
    assert_eq!(file.items.len(), 8);

    let event = file
        .items
        .iter()
        .find_map(|item| match item {
            Item::Event(def) if def.name.name == "OpenChest" => Some(def),
            _ => None,
        })
        .expect("OpenChest parsed");
    assert_eq!(event.params.len(), 2);
    assert!(event.authorize.is_some());
    assert_eq!(event.body.len(), 4);
    assert!(matches!(event.body[1], Statement::Option { .. }));
}

#[test]
fn test_parse_keeps_include_items() {
    let file = parse("#include 'items.scifi'\ncollectable Coin;").unwrap();
    match &file.items[0] {
        Item::Include(decl) => assert_eq!(decl.path, "items.scifi"),
        other => panic!("expected include, got {:?}", other),
    }
}

#[test]
fn test_parse_error_carries_position() {
    // missing closing brace
    let err = parse("event Broken {\n    assert on;\n").unwrap_err();
    assert!(err.line >= 1);
    assert!(!err.message.is_empty());
}

#[test]
fn test_parse_fails_fast_on_unexpected_token() {
    let err = parse("collectable 42;").unwrap_err();
    assert_eq!(err.line, 1);
    assert!(err.message.contains("identifier"), "{}", err.message);
}

#[test]
fn test_parse_error_on_unbalanced_list() {
    let err = parse("group Broken [A, B;").unwrap_err();
    assert_eq!(err.line, 1);
}

#[test]
fn test_parse_rejects_trailing_garbage() {
    let err = parse("collectable Coin; award").unwrap_err();
    assert_eq!(err.line, 1);
}

#[test]
fn test_parse_is_deterministic() {
    let a = parse(FULL_PROGRAM).unwrap();
    let b = parse(FULL_PROGRAM).unwrap();
    assert_eq!(a, b);
}
