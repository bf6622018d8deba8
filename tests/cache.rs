use lisogo_odm::prelude::*;

use crate::fixtures::{ConcreteDocument, DocumentWithReference};
use crate::{object_id, setup_database};

#[tokio::test]
async fn test_default_cache_is_enabled() {
    let db = setup_database().await;
    assert!(db.cache_is_enabled());
}

#[tokio::test]
async fn test_enable_disable_cache() {
    let db = setup_database().await;

    db.enable_cache();
    assert!(db.cache_is_enabled());

    db.disable_cache();
    assert!(!db.cache_is_enabled());

    db.enable_cache();
    assert!(db.cache_is_enabled());
}

#[tokio::test]
async fn test_create_cache_for_collection() {
    let db = setup_database().await;

    db.disable_cache();
    assert!(db.collection("collection").unwrap().cache().is_none());

    db.enable_cache();
    let collection = db.collection("collection").unwrap();
    let cache = collection.cache().unwrap();
    assert!(cache.ptr_eq(&collection.cache().unwrap()));
}

#[tokio::test]
async fn test_disabling_the_database_disables_the_caches() {
    let db = setup_database().await;
    let collection = db.collection("concrete_collection").unwrap();

    let mut document = ConcreteDocument::new("foo", "bar");
    collection.save(&mut document).await.unwrap();
    let cache = collection.cache().unwrap();
    assert_eq!(cache.len(), 1);

    db.disable_cache();
    assert!(!cache.is_enabled());
    assert!(cache.is_empty());

    db.enable_cache();
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_set_cache() {
    let db = setup_database().await;
    let collection = db.collection("collection").unwrap();

    let cache = ObjectCache::default();
    collection.set_cache(cache.clone());

    assert!(collection.cache().unwrap().ptr_eq(&cache));
}

#[tokio::test]
async fn test_caches_are_per_database() {
    let db = setup_database().await;
    let other = setup_database().await;

    let cache = db.collection("collection").unwrap().cache().unwrap();
    let other_cache = other.collection("collection").unwrap().cache().unwrap();
    assert!(!cache.ptr_eq(&other_cache));
}

#[tokio::test]
async fn test_add_in_cache_on_save() {
    let db = setup_database().await;
    let collection = db.collection("concrete_collection").unwrap();

    let mut document = ConcreteDocument::new("foo", "bar");
    let id = collection.save(&mut document).await.unwrap();

    let cache = collection.cache().unwrap();
    let cached = cache.get::<ConcreteDocument>(&object_id(Some(&id))).unwrap();
    assert_eq!(*cached, document);
    assert_eq!(cached.id(), Some(&id));
}

#[tokio::test]
async fn test_add_in_cache_on_save_with_reference() {
    let db = setup_database().await;

    let mut document = DocumentWithReference::new("what", ConcreteDocument::new("hello", "world"));
    document.save(&db).await.unwrap();

    let nested = document.referenced().unwrap();
    let nested_cache = db.collection("concrete_collection").unwrap().cache().unwrap();
    let cached = nested_cache
        .get::<ConcreteDocument>(&object_id(nested.id()))
        .unwrap();
    assert_eq!(&*cached, nested);

    let cache = db.collection("document_with_reference").unwrap().cache().unwrap();
    let cached = cache
        .get::<DocumentWithReference>(&object_id(document.id()))
        .unwrap();
    assert_eq!(*cached, document);
}

#[tokio::test]
async fn test_add_in_cache_on_insert() {
    let db = setup_database().await;
    let collection = db.collection("concrete_collection").unwrap();

    let mut document = ConcreteDocument::new("foo", "bar");
    let id = collection.insert(&mut document).await.unwrap();

    let cache = collection.cache().unwrap();
    assert!(cache.contains(&object_id(Some(&id))));
}

#[tokio::test]
async fn test_add_in_cache_on_insert_several() {
    let db = setup_database().await;
    let collection = db.collection("concrete_collection").unwrap();

    let mut documents = vec![
        ConcreteDocument::new("foo", "bar"),
        ConcreteDocument::new("bar", "baz"),
    ];
    collection.insert_many(&mut documents).await.unwrap();

    let cache = collection.cache().unwrap();
    for document in &documents {
        let cached = cache
            .get::<ConcreteDocument>(&object_id(document.id()))
            .unwrap();
        assert_eq!(&*cached, document);
    }
}

#[tokio::test]
async fn test_add_in_cache_on_update() {
    let db = setup_database().await;
    let collection = db.collection("concrete_collection").unwrap();

    let mut document = ConcreteDocument::new("foo", "first");
    db.disable_cache();
    let id = collection.insert(&mut document).await.unwrap();
    db.enable_cache();
    assert!(collection.cache().unwrap().is_empty());

    document.set_bar("second");
    collection
        .update(doc! { "_id": id.clone() }, &mut document)
        .await
        .unwrap();

    let cached = collection
        .cache()
        .unwrap()
        .get::<ConcreteDocument>(&object_id(Some(&id)))
        .unwrap();
    assert_eq!(cached.bar(), "second");
}

#[tokio::test]
async fn test_update_without_id_refreshes_the_cache() {
    let db = setup_database().await;
    let collection = db.collection("concrete_collection").unwrap();

    let mut document = ConcreteDocument::new("foo", "old");
    let id = collection.save(&mut document).await.unwrap();
    assert!(collection.cache().unwrap().contains(&object_id(Some(&id))));

    let mut replacement = ConcreteDocument::new("foo", "new");
    let matched = collection
        .update(doc! { "_id": id.clone() }, &mut replacement)
        .await
        .unwrap();
    assert_eq!(matched, 1);
    assert!(replacement.id().is_none());
    assert!(!collection.cache().unwrap().contains(&object_id(Some(&id))));

    let found: ConcreteDocument = collection
        .find_one(doc! { "_id": id.clone() })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.bar(), "new");
}

#[tokio::test]
async fn test_update_raw_evicts_the_replaced_document() {
    let db = setup_database().await;
    let collection = db.collection("concrete_collection").unwrap();

    let mut document = ConcreteDocument::new("foo", "old");
    let id = collection.save(&mut document).await.unwrap();

    let mut changed = document.to_son().unwrap();
    changed.insert("bar", "new");
    let matched = collection
        .update_raw(doc! { "_id": id.clone() }, changed)
        .await
        .unwrap();
    assert_eq!(matched, 1);

    let found: ConcreteDocument = collection
        .find_one(doc! { "_id": id })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.bar(), "new");
}

#[tokio::test]
async fn test_find_returns_cached_object_if_id_is_in_cache() {
    let db = setup_database().await;
    let collection = db.collection("concrete_collection").unwrap();

    let mut document = ConcreteDocument::new("foo", "first");
    let id = collection.insert(&mut document).await.unwrap();

    let mut changed = document.to_son().unwrap();
    changed.insert("bar", "changed behind the cache");
    db.store()
        .replace_one("concrete_collection", &doc! { "_id": id.clone() }, changed)
        .await
        .unwrap();

    let found: Vec<ConcreteDocument> = collection.find(doc! { "_id": id.clone() }).await.unwrap();
    assert_eq!(found, vec![document.clone()]);

    let mut retrieved = ConcreteDocument::default();
    retrieved.retrieve(id, &db).await.unwrap();
    assert_eq!(retrieved.bar(), "changed behind the cache");
}

#[tokio::test]
async fn test_find_caches_retrieved_objects() {
    let db = setup_database().await;
    let collection = db.collection("concrete_collection").unwrap();

    let oid = ObjectId::new();
    collection
        .insert_raw(doc! { "_id": oid, "foo": "foo", "bar": "bar", "_type": "ConcreteDocument" })
        .await
        .unwrap();
    assert!(collection.cache().unwrap().is_empty());

    let found: Option<ConcreteDocument> = collection.find_one(filter!(foo = "foo")).await.unwrap();
    let found = found.unwrap();

    let cached = collection.cache().unwrap().get::<ConcreteDocument>(&oid).unwrap();
    assert_eq!(*cached, found);
}

#[tokio::test]
async fn test_disabled_cache_is_bypassed() {
    let db = setup_database().await;
    let collection = db.collection("concrete_collection").unwrap();

    let mut document = ConcreteDocument::new("foo", "first");
    let id = collection.insert(&mut document).await.unwrap();

    let mut changed = document.to_son().unwrap();
    changed.insert("bar", "second");
    collection
        .update_raw(doc! { "_id": id.clone() }, changed)
        .await
        .unwrap();

    db.disable_cache();
    let found: Option<ConcreteDocument> = collection.find_one(doc! { "_id": id }).await.unwrap();
    assert_eq!(found.unwrap().bar(), "second");
}
