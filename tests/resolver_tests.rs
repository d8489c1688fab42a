use storesync::core::{RecordDraft, TermDraft};
use storesync::sync::{ClassificationLookup, RecordLookup, TermLookup};
use storesync::{
    ContentStore, CreateAttribute, EntityProfile, InMemoryCatalogStore, InMemoryContentStore,
    ResolveError, Resolver, StoreOp, SyncConfig, SyncStatus, in_memory_engine,
};

fn draft(name: &str, slug: &str) -> RecordDraft {
    RecordDraft {
        name: name.to_string(),
        slug: slug.to_string(),
        description: None,
    }
}

#[tokio::test]
async fn numeric_id_resolves_through_filtered_query() {
    let content = InMemoryContentStore::new();
    let created = content
        .create_record("works", &draft("Dune", "dune"))
        .await
        .unwrap();
    let numeric = created.numeric_id.unwrap().to_string();

    let lookup = RecordLookup {
        store: &content,
        collection: "works",
    };
    let found = Resolver::new(1000).resolve(&lookup, &numeric).await.unwrap();

    assert_eq!(found.stable_id, created.stable_id);
    let calls = content.calls().await;
    assert!(calls.contains(&StoreOp::QueryRecords));
    assert!(!calls.contains(&StoreOp::ListRecords));
}

#[tokio::test]
async fn unreliable_filters_fall_back_to_scan() {
    let content = InMemoryContentStore::new();
    for name in ["Dune", "Emma", "Ulysses"] {
        content
            .create_record("works", &draft(name, &name.to_lowercase()))
            .await
            .unwrap();
    }
    content.set_unreliable_filters(true);

    let lookup = RecordLookup {
        store: &content,
        collection: "works",
    };
    let found = Resolver::new(1000).resolve(&lookup, "3").await.unwrap();

    assert_eq!(found.name, "Ulysses");
    assert_eq!(content.calls().await.last(), Some(&StoreOp::ListRecords));
}

#[tokio::test]
async fn scan_is_bounded_by_limit() {
    let content = InMemoryContentStore::new();
    for name in ["Dune", "Emma", "Ulysses"] {
        content
            .create_record("works", &draft(name, &name.to_lowercase()))
            .await
            .unwrap();
    }
    content.set_unreliable_filters(true);

    let lookup = RecordLookup {
        store: &content,
        collection: "works",
    };
    let err = Resolver::new(2).resolve(&lookup, "3").await.unwrap_err();
    assert!(matches!(err, ResolveError::NotFound { .. }));
}

#[tokio::test]
async fn absent_record_is_not_found_and_outage_is_unavailable() {
    let content = InMemoryContentStore::new();
    let lookup = RecordLookup {
        store: &content,
        collection: "works",
    };
    let resolver = Resolver::new(1000);

    let err = resolver.resolve(&lookup, "missing").await.unwrap_err();
    assert!(matches!(err, ResolveError::NotFound { ref id } if id == "missing"));

    for op in [StoreOp::FetchRecord, StoreOp::QueryRecords, StoreOp::ListRecords] {
        content.fail_on(op, 0).await;
    }
    let err = resolver.resolve(&lookup, "42").await.unwrap_err();
    let ResolveError::Unavailable { source, .. } = err else {
        panic!("expected unavailable");
    };
    assert!(source.is_transport());
}

#[tokio::test]
async fn partial_outage_still_reports_not_found() {
    let content = InMemoryContentStore::new();
    content.fail_on(StoreOp::FetchRecord, 503).await;
    let lookup = RecordLookup {
        store: &content,
        collection: "works",
    };

    let err = Resolver::new(1000).resolve(&lookup, "42").await.unwrap_err();
    assert!(matches!(err, ResolveError::NotFound { .. }));
}

#[tokio::test]
async fn classification_code_ignores_store_prefix() {
    let catalog = InMemoryCatalogStore::new();
    let genre = catalog.add_classification("pa_genre", "Genre").await;
    let lookup = ClassificationLookup { store: &catalog };
    let resolver = Resolver::new(1000);

    assert_eq!(resolver.resolve(&lookup, "genre").await.unwrap().id, genre.id);
    assert_eq!(
        resolver.resolve(&lookup, "pa_genre").await.unwrap().id,
        genre.id
    );
    assert_eq!(
        resolver
            .resolve(&lookup, &genre.id.to_string())
            .await
            .unwrap()
            .slug,
        "pa_genre"
    );
}

#[tokio::test]
async fn terms_resolve_by_slug_even_when_filters_are_ignored() {
    let catalog = InMemoryCatalogStore::new();
    let genre = catalog.add_classification("pa_genre", "Genre").await;
    let noir = catalog
        .insert_term(
            genre.id,
            &TermDraft {
                name: "Noir".to_string(),
                slug: "noir".to_string(),
                description: None,
            },
        )
        .await;
    catalog.set_unreliable_filters(true);

    let lookup = TermLookup {
        store: &catalog,
        classification_id: genre.id,
    };
    let found = Resolver::new(1000).resolve(&lookup, "noir").await.unwrap();
    assert_eq!(found.id, noir.id);
}

#[tokio::test]
async fn engine_reports_linkage_of_resolved_records() {
    let (engine, content, catalog) = in_memory_engine(&SyncConfig::default());
    catalog
        .add_classification("pa_literary-work", "Literary Work")
        .await;
    let profile = EntityProfile::literary_work();

    let outcome = engine
        .synchronize_create(&profile, CreateAttribute::named("Dune"))
        .await
        .unwrap();
    let linked = engine
        .resolve_record(&profile, &outcome.stable_id)
        .await
        .unwrap();
    assert_eq!(linked.status(), SyncStatus::Linked);
    assert_eq!(linked.external_ref, Some(outcome.external_id));

    let tentative = content
        .create_record("works", &draft("Emma", "emma"))
        .await
        .unwrap();
    let numeric = tentative.numeric_id.unwrap().to_string();
    let found = engine.resolve_record(&profile, &numeric).await.unwrap();
    assert_eq!(found.status(), SyncStatus::Tentative);
}
