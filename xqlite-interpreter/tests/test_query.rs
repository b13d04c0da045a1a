use insta::assert_snapshot;
use rstest::rstest;
use xot::Xot;

use xqlite_interpreter::{Documents, Error, EvalOptions, EvalResult, Interpreter, Query};

const ROOT: &str = "<root><a><k>1</k></a><a><k>2</k></a><b><k>2</k></b></root>";

const PLAYS: &str = concat!(
    "<root>",
    "<a><k>1</k><v>p</v></a>",
    "<a><k>2</k><v>q</v></a>",
    "<a><k>2</k><v>p</v></a>",
    "<b><k>2</k><v>r</v></b>",
    "<b><k>3</k><v>s</v></b>",
    "<b><k>2</k><v>t</v></b>",
    "</root>"
);

fn run_with(xml: &str, query: &str, rewrite: bool) -> Result<String, Error> {
    let mut xot = Xot::new();
    let mut documents = Documents::default();
    let root = xot.parse(xml).unwrap();
    documents.set_context(root);
    documents.add_string(&mut xot, "plays.xml", PLAYS)?;
    let mut query = Query::parse(query)?;
    if rewrite {
        query.rewrite()?;
    }
    query.run(&mut xot, &mut documents, &EvalOptions::default())
}

fn run(query: &str) -> String {
    run_with(ROOT, query, false).unwrap()
}

#[test]
fn test_end_to_end_join_without_rewrite() {
    let query = "for $x in doc()/root/a, $y in doc()/root/b where $x/k = $y/k return <m>{$x/k}</m>";
    assert_eq!(
        run_with(ROOT, query, false).unwrap(),
        "<result><m><k>2</k></m></result>"
    );
}

#[test]
fn test_end_to_end_join_with_rewrite() {
    let query = "for $x in doc()/root/a, $y in doc()/root/b where $x/k = $y/k return <m>{$x/k}</m>";
    assert_eq!(
        run_with(ROOT, query, true).unwrap(),
        "<result><m><k>2</k></m></result>"
    );
}

#[rstest]
#[case(
    r#"for $x in doc("plays.xml")/root/a, $y in doc("plays.xml")/root/b where $x/k = $y/k return <m>{$x/v, $y/v}</m>"#
)]
#[case(
    r#"for $x in doc("plays.xml")/root/a, $y in doc("plays.xml")/root/b where $x/k = $y/k and $x/v/text() = "p" return <m>{$x/v, $y/v}</m>"#
)]
#[case(
    r#"for $x in doc("plays.xml")/root/a, $y in doc("plays.xml")/root/b where $y/v/text() = "t" and ($x/k = $y/k) return $x/v"#
)]
#[case(
    r#"for $r in doc("plays.xml")/root, $x in $r/a, $y in doc("plays.xml")/root/b where $x/k = $y/k return <m>{$x/v, $y/v}</m>"#
)]
#[case(
    r#"for $x in doc("plays.xml")/root/a, $y in doc("plays.xml")/root/b let $kv := $x/k where $x/k eq $y/k return <m>{$kv}</m>"#
)]
#[case(
    r#"for $x in doc("plays.xml")/root/a, $y in doc("plays.xml")/root/b, $z in doc("plays.xml")/root/b where $x/k = $y/k return <m>{$x/v, $y/v, $z/v}</m>"#
)]
#[case("for $d in doc(), $y in doc()/root/b where $d/root/b/k = $y/k return $y")]
#[case("for $x in doc()/root/a/k, $y in doc()/root/b/k where $x = $y return $x/..")]
#[case("for $x in doc()/root/a, $y in doc()/root/b where $x/k = $y/k return doc()/root/a[. == $x]")]
fn test_join_rewrite_is_sound(#[case] query: &str) {
    let plain = run_with(ROOT, query, false).unwrap();
    let rewritten = run_with(ROOT, query, true).unwrap();
    assert_eq!(plain, rewritten);
    assert_ne!(plain, "<result/>");
}

#[rstest]
#[case(
    "for $d in doc(), $y in doc()/root/b where $d/root/b/k = $y/k return $y",
    "<result><b><k>2</k></b></result>"
)]
#[case(
    "for $x in doc()/root/a/k, $y in doc()/root/b/k where $x = $y return $x/..",
    "<result><a><k>2</k></a></result>"
)]
#[case(
    "for $x in doc()/root/a, $y in doc()/root/b where $x/k = $y/k return doc()/root/a[. == $x]",
    "<result><a><k>2</k></a></result>"
)]
fn test_join_keeps_node_identity(#[case] query: &str, #[case] expected: &str) {
    assert_eq!(run_with(ROOT, query, false).unwrap(), expected);
    assert_eq!(run_with(ROOT, query, true).unwrap(), expected);
}

#[test]
fn test_join_pairs_in_left_major_order() {
    let query = r#"for $x in doc("plays.xml")/root/a, $y in doc("plays.xml")/root/b where $x/k = $y/k return <m>{$x/v, $y/v}</m>"#;
    assert_snapshot!(run_with(ROOT, query, true).unwrap(), @"<result><m><v>q</v><v>r</v></m><m><v>q</v><v>t</v></m><m><v>p</v><v>r</v></m><m><v>p</v><v>t</v></m></result>");
}

#[test]
fn test_concatenation_keeps_order_and_length() {
    let mut xot = Xot::new();
    let mut documents = Documents::default();
    let root = xot.parse(ROOT).unwrap();
    documents.set_context(root);
    let a = Query::parse("doc()/root/a")
        .unwrap()
        .evaluate(&mut xot, &mut documents)
        .unwrap();
    let b = Query::parse("doc()/root/b")
        .unwrap()
        .evaluate(&mut xot, &mut documents)
        .unwrap();
    let both = Query::parse("doc()/root/b, doc()/root/a")
        .unwrap()
        .evaluate(&mut xot, &mut documents)
        .unwrap();
    assert_eq!(both.len(), a.len() + b.len());
    assert_eq!(both.as_slice(), b.concat(a).as_slice());
}

#[test]
fn test_self_is_identity() {
    let mut xot = Xot::new();
    let mut documents = Documents::default();
    let root = xot.parse(ROOT).unwrap();
    documents.set_context(root);
    let plain = Query::parse("doc()//k")
        .unwrap()
        .evaluate(&mut xot, &mut documents)
        .unwrap();
    let with_self = Query::parse("doc()//k/.")
        .unwrap()
        .evaluate(&mut xot, &mut documents)
        .unwrap();
    assert_eq!(plain.len(), 3);
    assert_eq!(plain, with_self);
}

#[rstest]
#[case("doc()//k", "<result><k>1</k><k>2</k><k>2</k></result>")]
#[case("doc()//k/..", "<result><a><k>1</k></a><a><k>2</k></a><b><k>2</k></b></result>")]
#[case("doc()/root/*[k/text() = \"2\"]/k", "<result><k>2</k><k>2</k></result>")]
#[case("doc()/root/a/k/text()", "<result>12</result>")]
#[case("doc()/root/b or doc()/root/a", "<result><a><k>1</k></a><a><k>2</k></a><b><k>2</k></b></result>")]
#[case("doc()//k and doc()/root/b/k", "<result><k>2</k></result>")]
#[case("empty(doc()/root/c)", "<result>true</result>")]
#[case("not(doc()/root/a)", "<result>false</result>")]
#[case("some $a in doc()/root/a satisfies $a/k = doc()/root/b/k", "<result>true</result>")]
#[case("some $a in doc()/root/a satisfies $a == doc()/root/b", "<result>false</result>")]
#[case("doc()/root/a[k == k]", "<result><a><k>1</k></a><a><k>2</k></a></result>")]
#[case("<e/>", "<result><e/></result>")]
#[case("<m>{\"hi\"}<n/></m>", "<result><m>hi<n/></m></result>")]
#[case("let $x := doc()/root/a return (let $x := doc()/root/b return $x, $x)", "<result><b><k>2</k></b><a><k>1</k></a><a><k>2</k></a></result>")]
#[case("for $a in doc()/root/a let $k := $a/k where $k = doc()/root/b/k return $a", "<result><a><k>2</k></a></result>")]
#[case("root/b", "<result><b><k>2</k></b></result>")]
#[case("doc()/root/a[k = doc()/root/b/k]", "<result><a><k>2</k></a></result>")]
fn test_query(#[case] query: &str, #[case] expected: &str) {
    assert_eq!(run(query), expected);
}

#[test]
fn test_indented_output() {
    let mut xot = Xot::new();
    let mut documents = Documents::default();
    let root = xot.parse(ROOT).unwrap();
    documents.set_context(root);
    let options = EvalOptions {
        result_root: "out".to_string(),
        indent: true,
        ..Default::default()
    };
    let query = Query::parse("doc()/root/b").unwrap();
    let out = query.run(&mut xot, &mut documents, &options).unwrap();
    assert!(out.starts_with("<out>\n"));
    assert!(out.contains("<k>2</k>"));
}

#[test]
fn test_undefined_variable() {
    let err = run_with(ROOT, "for $x in doc()/root/a return ($x, $nope)", false).unwrap_err();
    assert!(matches!(err, Error::UndefinedVariable(name) if name == "nope"));
}

#[test]
fn test_scopes_are_closed_after_failure() {
    let mut xot = Xot::new();
    let mut documents = Documents::default();
    let root = xot.parse(ROOT).unwrap();
    documents.set_context(root);
    let query = Query::parse(
        "for $x in doc()/root/a, $y in doc()/root/b let $z := $x return some $w in $y satisfies $nope",
    )
    .unwrap();
    let mut interpreter = Interpreter::new(query.ast(), &mut xot, &mut documents);
    assert!(interpreter.run().is_err());
    assert!(interpreter.context().is_empty());
}

#[test]
fn test_scopes_are_closed_after_early_some() {
    let mut xot = Xot::new();
    let mut documents = Documents::default();
    let root = xot.parse(ROOT).unwrap();
    documents.set_context(root);
    // the second `k` matches and the last one is never visited
    let query = Query::parse("some $k in doc()/root//k satisfies $k = doc()/root/b/k")
    .unwrap();
    let mut interpreter = Interpreter::new(query.ast(), &mut xot, &mut documents);
    assert!(matches!(interpreter.run(), Ok(EvalResult::Boolean(true))));
    assert!(interpreter.context().is_empty());
}

#[rstest]
#[case("doc()/root/a/k/text()/text()")]
#[case("(doc()/root/a = doc()/root/b)/k")]
#[case("for $x in doc()/root/a return $x = $x")]
fn test_type_mismatch(#[case] query: &str) {
    match run_with(ROOT, query, false) {
        Err(Error::TypeMismatch { .. }) => {}
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_missing_document() {
    let mut xot = Xot::new();
    let mut documents = Documents::new("/nonexistent-xqlite-dir");
    let query = Query::parse(r#"doc("missing.xml")/a"#).unwrap();
    let err = query.evaluate(&mut xot, &mut documents).unwrap_err();
    assert!(matches!(err, Error::DocumentLoadFailure { .. }));
}

#[test]
fn test_document_is_loaded_once() {
    let mut xot = Xot::new();
    let mut documents = Documents::default();
    documents.add_string(&mut xot, "d.xml", ROOT).unwrap();
    let query = Query::parse(r#"doc("d.xml")/root/a == doc("d.xml")/root/a"#).unwrap();
    let result = query.run(&mut xot, &mut documents, &EvalOptions::default()).unwrap();
    assert_eq!(result, "<result>true</result>");
}

#[test]
fn test_options_resolve_documents_against_base_dir() {
    let options = EvalOptions {
        base_dir: "/nonexistent-xqlite-dir".into(),
        ..Default::default()
    };
    let mut xot = Xot::new();
    let mut documents = options.documents();
    assert!(documents.is_empty());
    let err = Query::parse(r#"doc("x.xml")"#)
        .unwrap()
        .run(&mut xot, &mut documents, &options)
        .unwrap_err();
    assert!(matches!(err, Error::DocumentLoadFailure { name, .. } if name == "x.xml"));
}
