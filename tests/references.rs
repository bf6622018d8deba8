use lisogo_odm::prelude::*;

use crate::fixtures::{ConcreteDocument, DocumentWithNested, DocumentWithReference, NestedDocument};
use crate::setup_database;

#[tokio::test]
async fn test_save_document_with_nested_document() {
    let db = setup_database().await;
    let collection = db.collection("document_with_nested").unwrap();
    let count_before = collection.count(filter!()).await.unwrap();

    let mut document = DocumentWithNested::new("foo", NestedDocument::new("bar"));
    document.save(&db).await.unwrap();

    assert_eq!(collection.count(filter!()).await.unwrap(), count_before + 1);
    assert!(document.nested().as_ref().unwrap().id().is_none());
}

#[tokio::test]
async fn test_find_document_with_nested_document() {
    let db = setup_database().await;
    db.disable_cache();

    let mut document = DocumentWithNested::new("foo", NestedDocument::new("bar"));
    document.save(&db).await.unwrap();

    let retrieved: DocumentWithNested = db
        .collection("document_with_nested")
        .unwrap()
        .find_one(doc! { "_id": document.id().cloned() })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(retrieved.nested(), document.nested());
    assert_eq!(retrieved, document);
}

#[tokio::test]
async fn test_save_document_with_reference_to_new_object() {
    let db = setup_database().await;
    let documents = db.collection("document_with_reference").unwrap();
    let referenced = db.collection("concrete_collection").unwrap();

    let mut document = DocumentWithReference::new("foo", ConcreteDocument::new("foo", "bar"));
    document.save(&db).await.unwrap();

    assert!(document.id().is_some());
    let nested = document.referenced().unwrap();
    assert!(nested.id().is_some());
    assert!(!nested.is_modified());

    assert_eq!(documents.count(filter!()).await.unwrap(), 1);
    assert_eq!(referenced.count(filter!()).await.unwrap(), 1);

    let stored = documents.find_raw(filter!()).await.unwrap().remove(0);
    let nested_id = nested.id().unwrap();
    assert_eq!(stored.get("reference"), Some(nested_id));

    let mapping = stored.get_document("_types_mapping").unwrap();
    let key = match nested_id {
        Bson::ObjectId(oid) => oid.to_hex(),
        other => panic!("unexpected id {other}"),
    };
    assert_eq!(mapping.get_str(key).unwrap(), "ConcreteDocument");
    assert_eq!(stored.get_str("_type").unwrap(), "WithReference");
}

#[tokio::test]
async fn test_saving_a_parent_saves_modified_references() {
    let db = setup_database().await;

    let mut document = DocumentWithReference::new("foo", ConcreteDocument::new("foo", "bar"));
    document.save(&db).await.unwrap();

    document.reference_mut().unwrap().get_mut().unwrap().set_bar("changed");
    document.set_data("again");
    document.save(&db).await.unwrap();

    let found: Vec<ConcreteDocument> = db
        .collection("concrete_collection")
        .unwrap()
        .find(filter!(bar = "changed"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn test_retrieve_document_with_reference_to_object() {
    let db = setup_database().await;
    db.disable_cache();

    let nested = ConcreteDocument::new("foo", "bar");
    let mut document = DocumentWithReference::new("foo", nested.clone());
    document.save(&db).await.unwrap();

    let mut other = DocumentWithReference::default();
    other.retrieve(document.id().cloned().unwrap(), &db).await.unwrap();

    assert_eq!(other, document);
    let loaded = other.referenced().unwrap();
    assert_eq!(loaded, &nested);
    assert_eq!(loaded.id(), document.referenced().unwrap().id());
}

#[tokio::test]
async fn test_reference_to_nested_only_type_is_stored_in_place() {
    let db = setup_database().await;

    let mut document = DocumentWithReference::new("foo", ConcreteDocument::new("foo", "bar"));
    document.set_note(Reference::new(NestedDocument::new("a note")));
    document.save(&db).await.unwrap();

    let stored = db
        .collection("document_with_reference")
        .unwrap()
        .find_raw(filter!())
        .await
        .unwrap()
        .remove(0);
    let note = stored.get_document("note").unwrap();
    assert_eq!(note.get_str("_type").unwrap(), "NestedDocument");
    assert_eq!(note.get_str("foo").unwrap(), "a note");

    let mut other = DocumentWithReference::default();
    other.retrieve(document.id().cloned().unwrap(), &db).await.unwrap();
    let note = other.note().as_ref().and_then(Reference::get).unwrap();
    assert_eq!(note, &NestedDocument::new("a note"));
}

#[tokio::test]
async fn test_lazy_loading_leaves_placeholders() {
    let db = setup_database().await;
    db.disable_cache();
    assert!(!db.lazy_loading_is_enabled());

    let mut document = DocumentWithReference::new("foo", ConcreteDocument::new("foo", "bar"));
    document.save(&db).await.unwrap();
    let referenced_id = document.referenced().unwrap().id().cloned().unwrap();

    db.enable_lazy_loading();
    let mut other = DocumentWithReference::default();
    other.retrieve(document.id().cloned().unwrap(), &db).await.unwrap();

    let reference = other.reference_mut().unwrap();
    assert!(!reference.is_loaded());
    let placeholder = reference.as_placeholder().unwrap();
    assert_eq!(placeholder.id(), &referenced_id);
    assert_eq!(placeholder.collection(), "concrete_collection");

    let fetched = reference.fetch(&db).await.unwrap();
    assert_eq!(fetched, &ConcreteDocument::new("foo", "bar"));
    assert!(reference.is_loaded());
}

#[tokio::test]
async fn test_placeholder_is_served_from_the_cache() {
    let db = setup_database().await;

    let mut document = DocumentWithReference::new("foo", ConcreteDocument::new("foo", "bar"));
    document.save(&db).await.unwrap();
    let referenced_id = document.referenced().unwrap().id().cloned().unwrap();

    let mut stale = document.referenced().unwrap().to_son().unwrap();
    stale.insert("bar", "changed behind the cache");
    db.store()
        .replace_one("concrete_collection", &doc! { "_id": referenced_id.clone() }, stale)
        .await
        .unwrap();

    let mut placeholder = Reference::<ConcreteDocument>::placeholder(referenced_id.clone()).unwrap();
    assert_eq!(placeholder.fetch(&db).await.unwrap().bar(), "bar");

    let mut loaded = Reference::<ConcreteDocument>::placeholder(referenced_id).unwrap();
    assert_eq!(loaded.load(&db).await.unwrap().bar(), "changed behind the cache");
}

#[tokio::test]
async fn test_referenced_type_is_checked() {
    let db = setup_database().await;
    let oid = ObjectId::new();
    let mut mapping = lisogo_odm::bson::Document::new();
    mapping.insert(oid.to_hex(), "AnotherConcrete");

    db.collection("document_with_reference")
        .unwrap()
        .insert_raw(doc! {
            "data": "foo",
            "reference": oid,
            "_type": "WithReference",
            "_types_mapping": mapping,
        })
        .await
        .unwrap();

    db.enable_lazy_loading();
    let result = db
        .collection("document_with_reference")
        .unwrap()
        .find::<DocumentWithReference>(filter!())
        .await;
    assert!(matches!(result, Err(OdmError::TypeMismatch { .. })));
}

#[test]
fn test_references_compare_ids() {
    let mut left = ConcreteDocument::new("foo", "bar");
    let mut right = ConcreteDocument::new("other", "content");
    let id = Bson::ObjectId(ObjectId::new());
    left.set_id(Some(id.clone()));
    right.set_id(Some(id));
    assert_eq!(Reference::new(left), Reference::new(right));

    let unsaved = Reference::new(ConcreteDocument::new("foo", "bar"));
    assert_eq!(unsaved, Reference::new(ConcreteDocument::new("foo", "bar")));
    assert_ne!(unsaved, Reference::new(ConcreteDocument::new("foo", "baz")));
}
