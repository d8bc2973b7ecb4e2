mod common;

use std::sync::Arc;
use std::thread;
use common::{config, day, Expense, Person, TextDocument};
use kiradb::{Core, ErrorKind, Query, Resolved};

fn keys<T>(hits: &[Resolved<T>]) -> Vec<&str> {
    hits.iter().filter_map(Resolved::as_key).collect()
}

fn store_expenses(core: &Core) {
    let expenses = [
        Expense::new("14856", day(2010, 1, 5), "Clothing", "Target", Some("socks and shoes")),
        Expense::new("14857", day(2010, 2, 10), "Groceries", "Safeway", Some("weekly groceries")),
        Expense::new("14858", day(2010, 3, 15), "Clothing", "Macys", Some("winter coat")),
        Expense::new("14859", day(2010, 4, 20), "Utilities", "PGE", None),
    ];
    for expense in &expenses {
        core.store_object(expense).unwrap();
    }
}

#[test]
fn test_index_mode_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    let john = Person::new("1234", "John Smith");

    core.store_object(&john).unwrap();

    let found = core
        .retrieve_object_by_primary_key(&Person::prototype(), "1234")
        .unwrap()
        .and_then(Resolved::into_object);
    assert_eq!(found, Some(john));
}

#[test]
fn test_upsert_keeps_one_document_per_key() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));

    core.store_object(&Person::new("1234", "John Smith")).unwrap();
    core.store_object(&Person::new("1234", "John Smith")).unwrap();
    core.store_object(&Person::new("1234", "Johnny Smith")).unwrap();

    assert_eq!(core.dump_documents("person").unwrap(), 1);
    let found = core
        .retrieve_object_by_primary_key(&Person::prototype(), "1234")
        .unwrap()
        .and_then(Resolved::into_object)
        .unwrap();
    assert_eq!(found.name, "Johnny Smith");

    let old_name = core.execute_query(&Person::prototype(), "name", "John Smith").unwrap();
    assert_eq!(old_name.total_hits, 0);
}

#[test]
fn test_remove_reports_whether_anything_was_indexed() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    core.store_object(&Person::new("1234", "John Smith")).unwrap();

    assert!(core.remove_object_by_primary_key(&Person::prototype(), "1234").unwrap());
    assert!(!core.remove_object_by_primary_key(&Person::prototype(), "1234").unwrap());
    assert!(core
        .retrieve_object_by_primary_key(&Person::prototype(), "1234")
        .unwrap()
        .is_none());
}

#[test]
fn test_string_field_query_returns_objects() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    core.store_object(&Person::new("1", "Ann Lee")).unwrap();
    core.store_object(&Person::new("2", "Bob Stone")).unwrap();

    let results = core.execute_query(&Person::prototype(), "name", "Bob Stone").unwrap();
    assert_eq!(results.total_hits, 1);
    let hit = results.hits.into_iter().next().and_then(Resolved::into_object).unwrap();
    assert_eq!(hit.account, "2");

    // exact fields do not match partial values
    let partial = core.execute_query(&Person::prototype(), "name", "Bob").unwrap();
    assert!(partial.hits.is_empty());
}

#[test]
fn test_unknown_query_field_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    let err = core.execute_query(&Person::prototype(), "email", "x").unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn test_none_mode_query_returns_keys() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    store_expenses(&core);

    let results = core.execute_query(&Expense::prototype(), "cat", "Clothing").unwrap();
    assert_eq!(results.total_hits, 2);
    // default order: newest first
    assert_eq!(keys(&results.hits), vec!["14858", "14856"]);
}

#[test]
fn test_none_mode_retrieve_returns_indexed_fields() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    store_expenses(&core);

    let found = core
        .retrieve_object_by_primary_key(&Expense::prototype(), "14857")
        .unwrap()
        .unwrap();
    let fields = found.fields().unwrap();
    assert_eq!(fields.get("txId").map(String::as_str), Some("14857"));
    assert_eq!(fields.get("cat").map(String::as_str), Some("Groceries"));
    assert_eq!(fields.get("date").map(String::as_str), Some("20100210120000.0000"));
    assert!(found.as_key().is_none());
}

#[test]
fn test_compound_query_is_a_conjunction() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    store_expenses(&core);

    let query = Query::new(&Expense::prototype())
        .where_matches_named("cat", "Clothing")
        .unwrap()
        .where_matches_named("payee", "target")
        .unwrap();
    let results = core.execute_query_with(&Expense::prototype(), &query).unwrap();
    assert_eq!(keys(&results.hits), vec!["14856"]);

    let narrowed = query.where_matches_named("memo", "coat").unwrap();
    let results = core.execute_query_with(&Expense::prototype(), &narrowed).unwrap();
    assert!(results.hits.is_empty());
    assert_eq!(results.total_hits, 0);
}

#[test]
fn test_fulltext_query_matches_stemmed_forms() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    store_expenses(&core);

    let results = core.execute_query(&Expense::prototype(), "memo", "shoe").unwrap();
    assert_eq!(keys(&results.hits), vec!["14856"]);

    let results = core.execute_query(&Expense::prototype(), "memo", "GROCERIES").unwrap();
    assert_eq!(keys(&results.hits), vec!["14857"]);

    // nothing left to match once stopwords are dropped
    let results = core.execute_query(&Expense::prototype(), "memo", "and the").unwrap();
    assert!(results.hits.is_empty());
}

#[test]
fn test_date_sort_in_both_directions() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    store_expenses(&core);

    let ascending = Query::new(&Expense::prototype()).sort_by_named("date", false).unwrap();
    let results = core.execute_query_with(&Expense::prototype(), &ascending).unwrap();
    assert_eq!(keys(&results.hits), vec!["14856", "14857", "14858", "14859"]);

    let descending = Query::new(&Expense::prototype()).sort_by_named("date", true).unwrap();
    let results = core.execute_query_with(&Expense::prototype(), &descending).unwrap();
    assert_eq!(keys(&results.hits), vec!["14859", "14858", "14857", "14856"]);

    let unsorted = Query::new(&Expense::prototype());
    let results = core.execute_query_with(&Expense::prototype(), &unsorted).unwrap();
    assert_eq!(keys(&results.hits), vec!["14859", "14858", "14857", "14856"]);
}

#[test]
fn test_pagination_skips_ranked_hits() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    store_expenses(&core);

    let page = Query::new(&Expense::prototype())
        .sort_by_named("date", false)
        .unwrap()
        .start(1)
        .limit(1);
    let results = core.execute_query_with(&Expense::prototype(), &page).unwrap();
    assert_eq!(keys(&results.hits), vec!["14857"]);
    assert_eq!(results.total_hits, 4);

    let past_the_end = Query::new(&Expense::prototype()).start(10).limit(5);
    let results = core.execute_query_with(&Expense::prototype(), &past_the_end).unwrap();
    assert!(results.hits.is_empty());
    assert_eq!(results.total_hits, 4);
}

#[test]
fn test_record_kinds_share_one_index() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    store_expenses(&core);
    core.store_object(&Person::new("14856", "Same Key")).unwrap();

    assert_eq!(core.dump_documents("ex").unwrap(), 4);
    assert_eq!(core.dump_documents("person").unwrap(), 1);

    // same key value under another kind is a different document
    assert!(core.remove_object_by_primary_key(&Person::prototype(), "14856").unwrap());
    assert!(core
        .retrieve_object_by_primary_key(&Expense::prototype(), "14856")
        .unwrap()
        .is_some());
}

#[test]
fn test_related_objects_excludes_the_source() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    let source = TextDocument::new(
        "CACM-1",
        "Square roots",
        "Computing square roots with iterative numerical methods",
    );
    core.store_object(&source).unwrap();
    core.store_object(&TextDocument::new(
        "CACM-2",
        "Matrix roots",
        "Numerical methods for square roots of matrices",
    ))
    .unwrap();
    core.store_object(&TextDocument::new(
        "CACM-3",
        "Compilers",
        "Compiler construction for block structured languages",
    ))
    .unwrap();

    let related = core
        .related_objects(&TextDocument::prototype(), &source.body, &["body"], 10, Some("CACM-1"))
        .unwrap();
    assert_eq!(related, vec!["CACM-2"]);

    let unfiltered = core
        .related_objects(&TextDocument::prototype(), &source.body, &["body"], 10, None)
        .unwrap();
    assert_eq!(unfiltered.len(), 2);
    assert!(unfiltered.contains(&"CACM-1".to_string()));

    let limited = core
        .related_objects(&TextDocument::prototype(), &source.body, &["body"], 1, None)
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[test]
fn test_related_objects_rejects_unknown_fields() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    let err = core
        .related_objects(&TextDocument::prototype(), "text", &["abstract"], 10, None)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn test_path_unsafe_identifiers_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(&dir.path().join("index")));

    for bad in ["../escape", "a/b", "..", ""] {
        let err = core.store_object(&Person::new(bad, "Mallory")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRecordIdentifier);
    }
    assert!(!dir.path().join("index").exists());
}

#[test]
fn test_path_unsafe_keys_are_rejected_on_remove() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(&dir.path().join("index")));

    for bad in ["../escape", "a/b", ".."] {
        let err = core.remove_object_by_primary_key(&Person::prototype(), bad).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRecordIdentifier);
    }
    assert!(!dir.path().join("index").exists());
}

#[test]
fn test_cursor_walks_index_objects_in_key_order() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    for (account, name) in [("c", "Cy"), ("a", "Al"), ("b", "Bo")] {
        core.store_object(&Person::new(account, name)).unwrap();
    }

    let mut seen = Vec::new();
    let mut next = core.first_object(&Person::prototype()).unwrap();
    while let Some(person) = next {
        seen.push(person.account);
        next = core.next_object(&Person::prototype()).unwrap();
    }
    assert_eq!(seen, vec!["a", "b", "c"]);
    assert!(core.next_object(&Person::prototype()).unwrap().is_none());
}

#[test]
fn test_cursor_over_none_mode_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    let err = core.first_object(&Expense::prototype()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
}

#[test]
fn test_optimize_keeps_live_documents() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    for i in 0..10 {
        core.store_object(&Person::new(&format!("p{}", i), "Someone")).unwrap();
    }
    for i in 0..5 {
        core.remove_object_by_primary_key(&Person::prototype(), &format!("p{}", i)).unwrap();
    }

    core.optimize_index().unwrap();

    let segments = std::fs::read_dir(dir.path().join("segments")).unwrap().count();
    assert_eq!(segments, 1);
    assert_eq!(core.dump_documents("person").unwrap(), 5);
    assert!(core
        .retrieve_object_by_primary_key(&Person::prototype(), "p7")
        .unwrap()
        .is_some());
}

#[test]
fn test_repeated_upserts_do_not_accumulate_segments() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    for n in 0..200 {
        core.store_object(&Person::new("1234", &format!("Revision {}", n))).unwrap();
    }

    let segments = std::fs::read_dir(dir.path().join("segments")).unwrap().count();
    assert!(segments <= core.config().max_segments, "{} segment files", segments);
    assert_eq!(core.dump_documents("person").unwrap(), 1);
    let found = core
        .retrieve_object_by_primary_key(&Person::prototype(), "1234")
        .unwrap()
        .and_then(Resolved::into_object)
        .unwrap();
    assert_eq!(found.name, "Revision 199");
}

#[test]
fn test_distinct_keys_keep_segment_count_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    for n in 0..60 {
        core.store_object(&Person::new(&format!("p{:02}", n), "Someone")).unwrap();
    }

    let segments = std::fs::read_dir(dir.path().join("segments")).unwrap().count();
    assert!(segments <= core.config().max_segments, "{} segment files", segments);
    assert_eq!(core.dump_documents("person").unwrap(), 60);
}

#[test]
fn test_create_index_clears_everything() {
    let dir = tempfile::tempdir().unwrap();
    let core = Core::new(config(dir.path()));
    store_expenses(&core);

    core.create_index().unwrap();
    assert_eq!(core.dump_documents("ex").unwrap(), 0);

    core.delete_index().unwrap();
    let results = core.execute_query(&Expense::prototype(), "cat", "Clothing").unwrap();
    assert!(results.hits.is_empty());

    store_expenses(&core);
    assert_eq!(core.dump_documents("ex").unwrap(), 4);
}

#[test]
fn test_concurrent_stores_from_separate_engines() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = config(dir.path());
    settings.writer_max_attempts = 2_000;

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let core = Arc::new(Core::new(settings.clone()));
            thread::spawn(move || {
                for i in 0..10 {
                    let account = format!("t{}-{}", t, i);
                    core.store_object(&Person::new(&account, "Worker")).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let core = Core::new(settings);
    assert_eq!(core.dump_documents("person").unwrap(), 40);
}

#[test]
fn test_concurrent_stores_through_one_engine() {
    let dir = tempfile::tempdir().unwrap();
    let core = Arc::new(Core::new(config(dir.path())));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let core = core.clone();
            thread::spawn(move || {
                for i in 0..10 {
                    core.store_object(&Person::new(&format!("{}-{}", t, i), "Worker")).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(core.dump_documents("person").unwrap(), 40);
}
