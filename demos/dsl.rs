use boolmatch::{Document, IndexGroup};

fn main() {
    let group = IndexGroup::new("campaigns");
    let loaded = group
        .load_file("demos/criteria.bm")
        .expect("failed to load criteria");
    println!("loaded {loaded} criteria");

    let doc = Document::parse_json(
        r#"{
            "geo": {"country": "FR"},
            "tags": ["news", "sport"],
            "device": {"os": "android"},
            "user": {"name": "ana", "age": 17},
            "app": {"version": "2.10"}
        }"#,
    )
    .expect("invalid document");

    for m in group.search(&doc).expect("search failed").ranked() {
        println!("{m}");
    }

    if let Some(criteria) = group.get("teens") {
        println!("{}", criteria.debug(&doc));
    }
}
