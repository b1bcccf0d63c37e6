use boolmatch::{field, Criteria, Document, IndexGroup, Range};

fn main() {
    let group = IndexGroup::new("campaigns");

    let adults = Criteria::dnf("adults-eu")
        .clause(|c| {
            c.with(field("user.age").in_range(Range::at_least(18.0)).with_weight(1.0))
                .with(field("geo.country").is_in(["FR", "DE"]).with_weight(2.0))
        })
        .build()
        .expect("invalid criteria");
    let not_banned = Criteria::cnf("not-banned")
        .clause(|c| c.with(!field("user.banned").eq(true)))
        .build()
        .expect("invalid criteria");

    group.add_criteria(adults).expect("index failed");
    group.add_criteria(not_banned).expect("index failed");

    let doc = Document::new()
        .set("user.age", 31_i64)
        .set("geo.country", "FR")
        .set("user.banned", false);

    let matches = group.search(&doc).expect("search failed");
    for m in matches.ranked() {
        println!("{m}");
    }
}
