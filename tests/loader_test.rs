use std::collections::HashMap;
use std::io;

use scifiweb_core::loader::{LoadError, ProgramLoader};
use scifiweb_core::preprocessor::SourceLoader;

struct MapLoader(HashMap<&'static str, &'static str>);

impl SourceLoader for MapLoader {
    fn read(&self, path: &str) -> io::Result<String> {
        self.0
            .get(path)
            .map(|s| s.to_string())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }
}

#[test]
fn test_load_expands_includes_into_one_namespace() {
    let loader = ProgramLoader::new(MapLoader(HashMap::from([
        (
            "main.scifi",
            "#include 'items.scifi'\n\
             event Grant {\n\
                 params [grantee user];\n\
                 authorize gameserver;\n\
                 award 10 x Coin to grantee;\n\
             }",
        ),
        ("items.scifi", "collectable Coin has amount;"),
    ])));

    let program = loader.load("main.scifi").unwrap();
    assert!(program.collectable("Coin").is_some());
    assert!(program.event("Grant").is_some());
}

#[test]
fn test_load_source_with_shared_include() {
    let loader = ProgramLoader::new(MapLoader(HashMap::from([
        ("a.scifi", "#include 'base.scifi'\ncollectable Gem;"),
        ("base.scifi", "collectable Coin;"),
    ])));

    // base.scifi is pulled in once even when included again at the top
    let program = loader
        .load_source("#include 'a.scifi'\n#include 'base.scifi'")
        .unwrap();
    assert!(program.collectable("Coin").is_some());
    assert!(program.collectable("Gem").is_some());
}

#[test]
fn test_missing_include_is_a_load_error() {
    let loader = ProgramLoader::new(MapLoader(HashMap::new()));
    let err = loader.load_source("#include 'ghost.scifi'").unwrap_err();
    assert!(matches!(err, LoadError::Include(_)));
}

#[test]
fn test_parse_error_in_included_file() {
    let loader = ProgramLoader::new(MapLoader(HashMap::from([(
        "bad.scifi",
        "collectable 42;",
    )])));
    let err = loader.load_source("#include 'bad.scifi'").unwrap_err();
    assert!(matches!(err, LoadError::Parse(_)));
}

#[test]
fn test_resolution_diagnostics_void_the_load() {
    let loader = ProgramLoader::new(MapLoader(HashMap::from([(
        "dup.scifi",
        "collectable Coin;",
    )])));
    // the same declaration arriving twice collides in the one namespace
    let err = loader
        .load_source("#include 'dup.scifi'\ncollectable Coin;")
        .unwrap_err();
    match err {
        LoadError::Resolution(diagnostics) => assert_eq!(diagnostics.len(), 1),
        other => panic!("expected resolution failure, got {:?}", other),
    }
}
