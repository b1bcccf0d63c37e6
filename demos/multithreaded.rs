use std::sync::Arc;
use std::thread;

use boolmatch::{field, Criteria, Document, GroupConfig, Registry};

fn main() {
    let registry = Arc::new(Registry::with_config(
        GroupConfig::default().with_parallel_search(true),
    ));
    registry.create_or_get_group("campaigns");

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..1000 {
                    let criteria = Criteria::dnf(&format!("w{t}-{i}"))
                        .clause(|c| c.with(field("segment").eq(i64::from(i % 50))))
                        .build()
                        .expect("invalid criteria");
                    registry
                        .add_criteria("campaigns", criteria)
                        .expect("index failed");
                }
            })
        })
        .collect();
    for w in writers {
        w.join().expect("writer panicked");
    }

    let readers: Vec<_> = (0..4_i64)
        .map(|segment| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let doc = Document::new().set("segment", segment);
                let matches = registry.search("campaigns", &doc).expect("search failed");
                println!("segment {segment}: {} matches", matches.len());
            })
        })
        .collect();
    for r in readers {
        r.join().expect("reader panicked");
    }

    let group = registry.group("campaigns").expect("group exists");
    println!("{:?}", group.stats());
}
