//! This bench renders a large, densely linked tree of requirements to HTML
//! and builds its traceability matrix.

#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use reqpub::{
    storage::BuiltinTemplates, Document, Item, MemoryFileSystem, PublishConfig, Publisher,
    Target, Tree, Uid,
};

/// Builds three documents of 300 items, each child item linking to two
/// parents.
fn large_tree() -> Tree {
    let mut documents = Vec::new();
    let mut parent: Option<&str> = None;
    for prefix in ["SYS", "HLR", "LLR"] {
        let mut document = Document::new(prefix).unwrap();
        if let Some(parent) = parent {
            document = document.with_parent(parent).unwrap();
        }
        for number in 1..=300 {
            let uid = Uid::from_parts(prefix, "", number, 3).unwrap();
            let mut item = Item::new(uid).unwrap();
            item.set_text(format!("The {prefix} shall satisfy **condition {number}**."));
            if let Some(parent) = parent {
                for target in [number, number % 300 + 1] {
                    item.add_link(Uid::from_parts(parent, "", target, 3).unwrap());
                }
            }
            document.add_item(item).unwrap();
        }
        document.renumber();
        documents.push(document);
        parent = Some(prefix);
    }
    Tree::new(documents).unwrap()
}

fn publish_tree(c: &mut Criterion) {
    let tree = large_tree();
    let config = PublishConfig {
        linkify: true,
        ..PublishConfig::default()
    };

    c.bench_function("publish tree", |b| {
        b.iter_batched(
            MemoryFileSystem::new,
            |fs| {
                let publisher = Publisher::new(&fs, &BuiltinTemplates, config.clone());
                publisher
                    .publish(&tree, Target::Tree, std::path::Path::new("/out"), Some(reqpub::Format::Html))
                    .unwrap();
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("traceability", |b| b.iter(|| tree.traceability().len()));
}

criterion_group!(benches, publish_tree);
criterion_main!(benches);
