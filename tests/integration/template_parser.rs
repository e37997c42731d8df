#![allow(clippy::all)]

use bindrow::error::BindrowError;
use bindrow::parse_template;
use proptest::prelude::*;

#[test]
fn variable_spans_index_the_original_text() {
    let text = "SELECT * FROM table WHERE id = :id AND name = :name;";
    let template = parse_template(text).expect("parse");
    let vars = template.variables();

    assert_eq!(vars.len(), 2);
    assert_eq!((vars[0].name.as_str(), vars[0].start, vars[0].end), ("id", 31, 33));
    assert_eq!((vars[1].name.as_str(), vars[1].start, vars[1].end), ("name", 46, 50));
    assert_eq!(&text[vars[0].start..=vars[0].end], ":id");
    assert_eq!(&text[vars[1].start..=vars[1].end], ":name");
}

#[test]
fn quoted_lookalike_is_excluded_end_to_end() {
    let text = "SELECT '* FROM table WHERE id = :id' AND name = :name;";
    let template = parse_template(text).expect("parse");
    let vars = template.variables();

    assert_eq!(vars.len(), 1);
    assert_eq!((vars[0].name.as_str(), vars[0].start, vars[0].end), ("name", 48, 52));
    assert_eq!(
        template.prepared_text(),
        "SELECT '* FROM table WHERE id = :id' AND name = ?;"
    );
}

#[test]
fn dollar_quoted_regions_with_identical_tag_pairs_are_excluded() {
    let text = "SELECT * FROM table WHERE id = :id AND $:name_d$ $:name_d$ = :name;";
    let template = parse_template(text).expect("parse");
    let vars = template.variables();

    assert_eq!(vars.len(), 2);
    assert_eq!((vars[0].name.as_str(), vars[0].start, vars[0].end), ("id", 31, 33));
    assert_eq!((vars[1].name.as_str(), vars[1].start, vars[1].end), ("name", 61, 65));
    assert_eq!(
        template.prepared_text(),
        "SELECT * FROM table WHERE id = ? AND $:name_d$ $:name_d$ = ?;"
    );
}

#[test]
fn repeated_parameter_binds_once_per_occurrence() {
    let template = parse_template("SELECT :a WHERE x = :a OR y = :a;").expect("parse");
    assert_eq!(template.variables().len(), 3);
    assert_eq!(template.prepared_text(), "SELECT ? WHERE x = ? OR y = ?;");
}

#[test]
fn parse_errors_carry_positions() {
    match parse_template("WHERE a = : ;").unwrap_err() {
        BindrowError::Parse { position, .. } => assert_eq!(position, 11),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(parse_template("WHERE a = 'unterminated").is_err());
    assert!(parse_template("WHERE a = $tag$ unterminated").is_err());
}

#[derive(Debug, Clone)]
enum Fragment {
    Plain(String),
    Quoted(String),
    Dollar(String, String),
    Var(String),
}

fn fragment() -> impl Strategy<Value = Fragment> {
    prop_oneof![
        "[a-zA-Z0-9_,;=() ]{0,12}".prop_map(Fragment::Plain),
        "[a-zA-Z0-9_:. ]{0,12}".prop_map(Fragment::Quoted),
        ("[a-z]{0,6}", "[a-zA-Z0-9_:'. ]{0,12}")
            .prop_map(|(tag, inner)| Fragment::Dollar(tag, inner)),
        "[a-z][a-z0-9_]{0,7}".prop_map(Fragment::Var),
    ]
}

// Renders fragments into a template, predicting the variables and the
// substituted text. Fragments are space-separated so identifiers terminate.
fn render(fragments: &[Fragment]) -> (String, Vec<(String, usize, usize)>, String) {
    let mut text = String::from("SELECT");
    let mut prepared = String::from("SELECT");
    let mut vars = Vec::new();
    for fragment in fragments {
        text.push(' ');
        prepared.push(' ');
        match fragment {
            Fragment::Plain(s) => {
                text.push_str(s);
                prepared.push_str(s);
            }
            Fragment::Quoted(s) => {
                let quoted = format!("'{s}'");
                text.push_str(&quoted);
                prepared.push_str(&quoted);
            }
            Fragment::Dollar(tag, inner) => {
                let region = format!("${tag}${inner}${tag}$");
                text.push_str(&region);
                prepared.push_str(&region);
            }
            Fragment::Var(name) => {
                let start = text.len();
                text.push(':');
                text.push_str(name);
                vars.push((name.clone(), start, text.len() - 1));
                prepared.push('?');
            }
        }
    }
    text.push(';');
    prepared.push(';');
    (text, vars, prepared)
}

proptest! {
    #[test]
    fn literal_regions_never_contribute_variables(
        fragments in proptest::collection::vec(fragment(), 0..12)
    ) {
        let (text, expected, expected_prepared) = render(&fragments);
        let template = parse_template(&text).expect("generated template parses");

        let vars = template.variables();
        prop_assert_eq!(vars.len(), expected.len());
        for (var, (name, start, end)) in vars.iter().zip(expected.iter()) {
            prop_assert_eq!(&var.name, name);
            prop_assert_eq!(var.start, *start);
            prop_assert_eq!(var.end, *end);
            prop_assert_eq!(&text[var.start..=var.end], format!(":{name}"));
        }

        // spans are non-decreasing and inside the text
        for pair in vars.windows(2) {
            prop_assert!(pair[0].end < pair[1].start);
        }
        for var in vars {
            prop_assert!(var.end < text.len());
        }

        prop_assert_eq!(template.prepared_text(), expected_prepared);
    }
}
