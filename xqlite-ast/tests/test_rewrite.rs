use insta::assert_snapshot;
use rstest::rstest;

use xqlite_ast::{parse, rewrite, Error, NodeKind};

#[test]
fn test_rewrite_simple_join() {
    let mut ast = parse(
        "for $x in doc()/root/a, $y in doc()/root/b where $x/k = $y/k return <m>{$x/k}</m>",
    )
    .unwrap();
    assert_eq!(rewrite(&mut ast).unwrap(), 1);
    assert!(ast.is_consistent());
    assert_snapshot!(ast.to_string(), @r###"
    FLWRExpression
      ForClause
        VariableDef [$tuple]
          Join [$x = $y]
            FLWRExpression
              ForClause
                VariableDef [$x]
                  PathSeparator [/]
                    PathSeparator [/]
                      Document
                      TagName [root]
                    TagName [a]
              ReturnClause
                Tag [tuple]
                  Tag [x]
                    Variable [$x]
            FLWRExpression
              ForClause
                VariableDef [$y]
                  PathSeparator [/]
                    PathSeparator [/]
                      Document
                      TagName [root]
                    TagName [b]
              ReturnClause
                Tag [tuple]
                  Tag [y]
                    Variable [$y]
            PathSeparator [/]
              Variable [$x]
              TagName [k]
            PathSeparator [/]
              Variable [$y]
              TagName [k]
      ReturnClause
        Tag [m]
          PathSeparator [/]
            PathSeparator [/]
              PathSeparator [/]
                Variable [$tuple]
                TagName [x]
              PathGlobbing [node()]
            TagName [k]
    "###);
}

#[test]
fn test_rewrite_moves_residual_to_its_side() {
    let mut ast = parse(r#"for $x in a, $y in b where ($x/k = $y/k) and $x/v = "1" return $y"#).unwrap();
    assert_eq!(rewrite(&mut ast).unwrap(), 1);
    assert!(ast.is_consistent());
    assert_snapshot!(ast.to_string(), @r###"
    FLWRExpression
      ForClause
        VariableDef [$tuple]
          Join [$x = $y]
            FLWRExpression
              ForClause
                VariableDef [$x]
                  TagName [a]
              WhereClause
                Equality [=]
                  PathSeparator [/]
                    Variable [$x]
                    TagName [v]
                  ConstantString ["1"]
              ReturnClause
                Tag [tuple]
                  Tag [x]
                    Variable [$x]
            FLWRExpression
              ForClause
                VariableDef [$y]
                  TagName [b]
              ReturnClause
                Tag [tuple]
                  Tag [y]
                    Variable [$y]
            PathSeparator [/]
              Variable [$x]
              TagName [k]
            PathSeparator [/]
              Variable [$y]
              TagName [k]
      ReturnClause
        PathSeparator [/]
          PathSeparator [/]
            Variable [$tuple]
            TagName [y]
          PathGlobbing [node()]
    "###);
}

#[test]
fn test_rewrite_moves_dependent_ranges() {
    let mut ast =
        parse("for $d in doc(), $x in $d/a, $y in b, $z in c where $x/k = $y/k return ($x, $z)")
            .unwrap();
    assert_eq!(rewrite(&mut ast).unwrap(), 1);
    assert!(ast.is_consistent());
    let root = ast.root().unwrap();
    let for_clause = ast.children(root)[0];
    let ranged = ast
        .children(for_clause)
        .iter()
        .map(|&def| ast.label(def))
        .collect::<Vec<_>>();
    // the tuple takes the place of `$d`, the first moved range
    assert_eq!(ranged, vec!["VariableDef [$tuple]", "VariableDef [$z]"]);
    let join = ast.children(ast.children(for_clause)[0])[0];
    let left = ast.children(join)[0];
    let left_for = ast.children(left)[0];
    let left_ranged = ast
        .children(left_for)
        .iter()
        .map(|&def| ast.label(def))
        .collect::<Vec<_>>();
    assert_eq!(left_ranged, vec!["VariableDef [$d]", "VariableDef [$x]"]);
}

#[test]
fn test_rewrite_keeps_independent_residual_outside() {
    let mut ast = parse("for $x in a, $y in b, $z in c where $x/k = $y/k and $z return $z").unwrap();
    assert_eq!(rewrite(&mut ast).unwrap(), 1);
    let root = ast.root().unwrap();
    let where_clause = ast
        .find_child(root, |kind| kind == &NodeKind::WhereClause)
        .unwrap();
    assert_eq!(ast.label(ast.children(where_clause)[0]), "Variable [$z]");
}

#[test]
fn test_rewrite_is_idempotent() {
    let mut ast = parse("for $x in a, $y in b where $x/k = $y/k return $x").unwrap();
    assert_eq!(rewrite(&mut ast).unwrap(), 1);
    let once = ast.to_string();
    assert_eq!(rewrite(&mut ast).unwrap(), 0);
    assert_eq!(ast.to_string(), once);
}

#[test]
fn test_rewrite_respects_shadowing() {
    let mut ast =
        parse("for $x in a, $y in b where $x/k = $y/k return let $x := c return $x").unwrap();
    rewrite(&mut ast).unwrap();
    let dump = ast.to_string();
    assert!(dump.contains("VariableDef [$x]\n          TagName [c]"));
    assert!(dump.ends_with("      Variable [$x]\n"));
}

#[test]
fn test_rewrite_nested_flwr() {
    let mut ast = parse(
        "<r>{for $a in doc()/a return for $x in $a/b, $y in doc()/c where $x = $y return $x}</r>",
    )
    .unwrap();
    assert_eq!(rewrite(&mut ast).unwrap(), 1);
    assert!(ast.is_consistent());
}

#[rstest]
#[case("for $x in a, $y in $x/b where $x/k = $y/k return $y")]
#[case("for $x in a where $x/k = $y/k return $x")]
#[case("for $x in a, $y in b where $x/k == $y/k return $x")]
#[case("for $x in a, $y in b where $x/k = $y/k or $x return $x")]
#[case("for $x in a, $y in b where not($x/k = $y/k) return $x")]
#[case("for $x in a, $y in b where $x/k = $x/j return $x")]
#[case("for $x in a, $y in b where $x/k = $y/k/$x return $x")]
fn test_not_a_join(#[case] query: &str) {
    let mut ast = parse(query).unwrap();
    let before = ast.to_string();
    assert_eq!(rewrite(&mut ast).unwrap(), 0);
    assert_eq!(ast.to_string(), before);
}

#[rstest]
#[case("for $x in a, $y in b where $x/k = $y/k and $x/v = $y/v return $x")]
#[case("for $x in a, $y in b let $z := c where $x/k = $y/k and $x = $z return $x")]
#[case("for $x in a, $y in b, $w in c where $x/k = $y/k and $x = $w return $x")]
fn test_unresolvable_join(#[case] query: &str) {
    let mut ast = parse(query).unwrap();
    let err = rewrite(&mut ast).unwrap_err();
    assert!(matches!(err, Error::UnresolvableJoin(_)));
}

#[test]
fn test_unresolvable_join_message() {
    let mut ast =
        parse("for $x in a, $y in b where $x/k = $y/k and $x/v = $y/v return $x").unwrap();
    assert_eq!(
        rewrite(&mut ast).unwrap_err().to_string(),
        "cannot decorrelate join: the rest of the `where` clause references $x, $y and fits neither side"
    );
}

#[test]
fn test_failed_rewrite_leaves_tree_unchanged() {
    // the first `for` decorrelates; the second cannot
    let mut ast = parse(
        "(for $x in a, $y in b where $x/k = $y/k return $x), \
         (for $p in c, $q in d where $p/k = $q/k and $p/v = $q/v return $p)",
    )
    .unwrap();
    let before = ast.to_string();
    let len = ast.len();
    assert!(matches!(rewrite(&mut ast), Err(Error::UnresolvableJoin(_))));
    assert_eq!(ast.to_string(), before);
    assert_eq!(ast.len(), len);
    assert!(ast.is_consistent());
}
