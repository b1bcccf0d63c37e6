use boolmatch::{
    field, BoolmatchError, Criteria, Document, IndexError, IndexGroup, Range, ValidationError,
    NO_MATCH,
};

#[test]
fn all_negative_conjunction_matches_empty_document() {
    let group = IndexGroup::new("e");
    group
        .add_criteria(
            Criteria::dnf("not_banned")
                .clause(|c| c.with(!field("banned").eq(true)))
                .build()
                .unwrap(),
        )
        .unwrap();

    assert!(group.search(&Document::new()).unwrap().contains("not_banned"));
    assert!(group
        .search(&Document::new().set("banned", false))
        .unwrap()
        .contains("not_banned"));
    assert!(group
        .search(&Document::new().set("banned", true))
        .unwrap()
        .is_empty());
    assert_eq!(group.search(&Document::new()).unwrap().score("not_banned"), Some(0.0));
}

#[test]
fn default_override_routes_to_residual() {
    let group = IndexGroup::new("e");
    let lenient = Criteria::dnf("lenient")
        .clause(|c| c.with(field("age").in_range(Range::at_least(18.0)).with_default(true)))
        .build()
        .unwrap();
    let strict = Criteria::dnf("strict")
        .clause(|c| c.with(field("region").not_in(["eu"]).with_default(false)))
        .build()
        .unwrap();
    group.add_criteria(lenient).unwrap();
    group.add_criteria(strict).unwrap();
    assert_eq!(group.stats().residual, 2);

    let empty = group.search(&Document::new()).unwrap();
    assert!(empty.contains("lenient"));
    assert!(!empty.contains("strict"));

    let minor = group.search(&Document::new().set("age", 12_i64).set("region", "us")).unwrap();
    assert_eq!(minor.ids(), ["strict"]);
}

#[test]
fn empty_and_malformed_criteria_are_rejected() {
    assert!(matches!(Criteria::dnf("").clause(|c| c.with(field("a").eq(1_i64))).build(), Err(ValidationError::EmptyId)));
    assert!(matches!(Criteria::dnf("x").build(), Err(ValidationError::EmptyCriteria { .. })));
    assert!(matches!(Criteria::cnf("x").clause(|c| c).build(), Err(ValidationError::EmptyClause { .. })));
    assert!(Criteria::dnf("x").clause(|c| c.with(field("a").matches("("))).build().is_err());
    assert!(Criteria::dnf("x")
        .clause(|c| c.with(field("a").in_range(Range::closed(5.0, 1.0))))
        .build()
        .is_err());
    assert!(Criteria::dnf("x")
        .clause(|c| c.with(field("a").is_in(Vec::<i64>::new())))
        .build()
        .is_err());
}

#[test]
fn malformed_criteria_leaves_index_untouched() {
    let group = IndexGroup::new("e");
    let bad = Criteria::dnf("bad").clause(|c| c.with(field("a").matches("[")));
    assert!(bad.build().is_err());

    let err = group.load_dsl(r#"dnf "bad" { (a matches "[") }"#).unwrap_err();
    assert!(matches!(err, BoolmatchError::Validation(_)), "{err}");
    assert!(group.is_empty());
    assert_eq!(group.stats().posting_entries, 0);
}

#[test]
fn score_of_non_match_is_sentinel() {
    let c = Criteria::dnf("c")
        .clause(|c| c.with(field("a").eq("x").with_weight(3.0)))
        .build()
        .unwrap();
    assert_eq!(c.score(&Document::new()), NO_MATCH);
    assert_eq!(c.score(&Document::new().set("a", "x")), 3.0);
}

#[test]
fn dnf_scores_best_conjunction() {
    let group = IndexGroup::new("e");
    group
        .add_criteria(
            Criteria::dnf("c")
                .clause(|c| c.with(field("a").eq("x").with_weight(2.0)))
                .clause(|c| {
                    c.with(field("a").eq("x").with_weight(1.0))
                        .with(field("b").eq("y").with_weight(4.0))
                })
                .build()
                .unwrap(),
        )
        .unwrap();
    let doc = Document::new().set("a", "x").set("b", "y");
    assert_eq!(group.search(&doc).unwrap().score("c"), Some(5.0));
    assert_eq!(group.search(&doc.clone().set("b", "z")).unwrap().score("c"), Some(2.0));
}

#[test]
fn repeated_literal_needs_only_one_value() {
    let group = IndexGroup::new("e");
    group
        .add_criteria(
            Criteria::dnf("c")
                .clause(|c| c.with(field("a").eq("x")).with(field("a").is_in(["x", "y"])))
                .build()
                .unwrap(),
        )
        .unwrap();
    assert!(group.search(&Document::new().set("a", "x")).unwrap().contains("c"));
    assert!(!group.search(&Document::new().set("a", "y")).unwrap().contains("c"));
}

#[test]
fn nan_and_bool_never_satisfy_ranges() {
    let group = IndexGroup::new("e");
    group
        .add_criteria(
            Criteria::dnf("r")
                .clause(|c| c.with(field("n").in_range(Range::new(None, None, false, false))))
                .build()
                .unwrap(),
        )
        .unwrap();
    assert!(group.search(&Document::new().set("n", 1e300)).unwrap().contains("r"));
    assert!(group.search(&Document::new().set("n", f64::NAN)).unwrap().is_empty());
    assert!(group.search(&Document::new().set("n", true)).unwrap().is_empty());
}

#[test]
fn unknown_group_error_message() {
    let registry = boolmatch::Registry::new();
    let err = registry.delete_criteria("nope", "x").unwrap_err();
    assert!(matches!(err, IndexError::GroupNotFound { .. }));
    assert!(err.to_string().contains("nope"));
}

#[test]
fn debug_trace_explains_outcome() {
    let c = Criteria::cnf("c")
        .clause(|c| c.with(field("a").eq("x")).with(field("b").not_in(["y"])))
        .build()
        .unwrap();
    let trace = c.debug(&Document::new().set("b", "y"));
    assert!(!trace.result());
    assert_eq!(trace.score(), NO_MATCH);
    let json = serde_json::to_value(&trace).unwrap();
    assert_eq!(json["id"], "c");
}
