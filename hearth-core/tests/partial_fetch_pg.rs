// Renames a child table while it runs, so it lives in its own test binary
// and never overlaps the other database tests:
// cargo test -p hearth-core --test partial_fetch_pg -- --ignored

use hearth_core::db::migrations;
use hearth_core::models::NewPhoto;
use hearth_core::{Config, ConnectionManager, NewProperty, PropertyFilters, PropertyRepo};
use uuid::Uuid;

async fn rename_table(db: &ConnectionManager, from: &str, to: &str) {
    let mut conn = db.acquire().await.unwrap();
    sqlx::query(&format!("ALTER TABLE {} RENAME TO {}", from, to))
        .execute(&mut *conn)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn unreadable_children_leave_property_listed() {
    assert!(
        std::env::var("DATABASE_URL").is_ok(),
        "DATABASE_URL must point at a scratch database"
    );
    let config = Config::from_env().unwrap();
    let db = ConnectionManager::connect_lazy(&config.database).unwrap();
    migrations::run(&db).await.unwrap();
    let repo = PropertyRepo::new(db.clone());

    let city = format!("Partial{}", Uuid::new_v4().simple());
    let id = repo
        .create(&NewProperty {
            title: "Hemlock Cottage".into(),
            address: "4 Hemlock Row".into(),
            city: city.clone(),
            state: "WA".into(),
            listing_type: "Rent".into(),
            features: vec!["Deck".into()],
            photos: vec![NewPhoto::from_url("https://img.example.com/h.jpg")],
            ..NewProperty::default()
        })
        .await
        .unwrap()
        .id();

    let filters = PropertyFilters {
        city: Some(city),
        ..PropertyFilters::default()
    };

    rename_table(&db, "property_photos", "property_photos_hidden").await;
    let listed = repo.list(&filters).await;
    rename_table(&db, "property_photos_hidden", "property_photos").await;

    let listed = listed.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id(), id);
    assert!(listed[0].features.is_empty());
    assert!(listed[0].photos.is_empty());

    // Children are intact once the table is back
    let listed = repo.list(&filters).await.unwrap();
    assert_eq!(listed[0].features, vec!["Deck"]);
    assert_eq!(listed[0].photos.len(), 1);

    repo.delete(id).await.unwrap();
}
