// Integration tests against a live Postgres - run with DATABASE_URL set:
// cargo test -p hearth-core -- --ignored

use std::sync::Arc;

use hearth_core::cache::{CachePort, MemoryCache};
use hearth_core::db::migrations;
use hearth_core::models::{NewInquiry, NewPhoto};
use hearth_core::{
    CachedReviews, Config, ConnectionManager, InquiryRepo, NewProperty, NewReview,
    PropertyFilters, PropertyPatch, PropertyRepo, ReviewRepo, StoreError,
};
use uuid::Uuid;

async fn setup() -> (ConnectionManager, Config) {
    require_database_url();
    let config = Config::from_env().unwrap();
    let db = ConnectionManager::connect_lazy(&config.database).unwrap();
    migrations::run(&db).await.unwrap();
    (db, config)
}

fn require_database_url() {
    assert!(
        std::env::var("DATABASE_URL").is_ok(),
        "DATABASE_URL must point at a scratch database"
    );
}

fn sample(title: &str) -> NewProperty {
    NewProperty {
        title: title.to_owned(),
        address: "12 Birch Lane".into(),
        city: "Portland".into(),
        state: "OR".into(),
        listing_type: "Sale".into(),
        property_type: Some("House".into()),
        price: Some(525_000.0),
        bedrooms: Some(3),
        bathrooms: Some(2.0),
        owner_email: Some("owner@example.com".into()),
        features: vec!["Fireplace".into(), "Garage".into()],
        amenities: vec!["Pool".into()],
        photos: vec![
            NewPhoto::from_url("https://img.example.com/1.jpg"),
            NewPhoto::from_url("https://img.example.com/2.jpg"),
            NewPhoto::from_url("https://img.example.com/3.jpg"),
        ],
        ..NewProperty::default()
    }
}

fn unique(prefix: &str) -> String {
    format!("{} {}", prefix, Uuid::new_v4())
}

#[tokio::test]
#[ignore = "requires database"]
async fn create_get_update_delete_round() {
    let (db, _) = setup().await;
    let repo = PropertyRepo::new(db);

    let created = repo.create(&sample(&unique("Birch"))).await.unwrap();
    assert_eq!(created.features, vec!["Fireplace", "Garage"]);
    assert_eq!(created.amenities, vec!["Pool"]);
    assert_eq!(created.photos.len(), 3);
    assert!(created.photos[0].is_primary);
    assert!(created.photos[1..].iter().all(|p| !p.is_primary));
    assert_eq!(
        created.photos.iter().map(|p| p.display_order).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    let id = created.id();
    let fetched = repo.get_by_id(id).await.unwrap();
    assert_eq!(fetched.features.len(), 2);
    assert_eq!(fetched.amenities.len(), 1);
    assert_eq!(fetched.photos.len(), 3);

    let patch = PropertyPatch {
        amenities: Some(Vec::new()),
        price: Some(499_000.0),
        ..PropertyPatch::default()
    };
    let updated = repo.update(id, &patch).await.unwrap();
    assert_eq!(updated.property.price, Some(499_000.0));

    let fetched = repo.get_by_id(id).await.unwrap();
    assert!(fetched.amenities.is_empty());
    assert_eq!(fetched.features, vec!["Fireplace", "Garage"]);
    assert_eq!(fetched.photos.len(), 3);

    repo.delete(id).await.unwrap();
    assert!(repo.get_by_id(id).await.unwrap_err().is_not_found());
    assert!(repo.delete(id).await.unwrap_err().is_not_found());
}

#[tokio::test]
#[ignore = "requires database"]
async fn present_collection_replaces_stored_rows() {
    let (db, _) = setup().await;
    let repo = PropertyRepo::new(db);
    let id = repo.create(&sample(&unique("Cedar"))).await.unwrap().id();

    let patch = PropertyPatch {
        features: Some(vec!["Solar".into()]),
        photos: Some(vec![NewPhoto::from_url("https://img.example.com/new.jpg")]),
        ..PropertyPatch::default()
    };
    let updated = repo.update(id, &patch).await.unwrap();
    assert_eq!(updated.features, vec!["Solar"]);
    assert_eq!(updated.amenities, vec!["Pool"]);
    assert_eq!(updated.photos.len(), 1);
    assert!(updated.photos[0].is_primary);

    repo.delete(id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn failing_child_insert_rolls_back_create() {
    let (db, _) = setup().await;
    let repo = PropertyRepo::new(db.clone());
    let title = unique("Rollback");

    let mut input = sample(&title);
    // Overflows VARCHAR(255) after the parent row is already inserted
    input.features.push("x".repeat(300));

    let err = repo.create(&input).await.unwrap_err();
    assert!(matches!(err, StoreError::Transaction { .. }), "{err}");

    let mut conn = db.acquire().await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM properties WHERE title = $1")
        .bind(&title)
        .fetch_one(&mut *conn)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
#[ignore = "requires database"]
async fn failing_update_leaves_children_untouched() {
    let (db, _) = setup().await;
    let repo = PropertyRepo::new(db);
    let id = repo.create(&sample(&unique("Aspen"))).await.unwrap().id();

    let patch = PropertyPatch {
        amenities: Some(vec!["Gym".into(), "y".repeat(300)]),
        title: Some("Renamed".into()),
        ..PropertyPatch::default()
    };
    assert!(repo.update(id, &patch).await.is_err());

    let fetched = repo.get_by_id(id).await.unwrap();
    assert_eq!(fetched.amenities, vec!["Pool"]);
    assert_ne!(fetched.property.title, "Renamed");

    repo.delete(id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn delete_cascades_to_inquiries_and_reviews() {
    let (db, config) = setup().await;
    let cache: Arc<dyn CachePort> = Arc::new(MemoryCache::new());
    let properties = PropertyRepo::new(db.clone()).with_review_cache(cache.clone());
    let inquiries = InquiryRepo::new(db.clone());
    let reviews = CachedReviews::new(
        ReviewRepo::new(db, config.reviews),
        cache.clone(),
        config.cache,
    );

    let id = properties.create(&sample(&unique("Spruce"))).await.unwrap().id();
    inquiries
        .create(&NewInquiry {
            property_id: id,
            name: "Lee".into(),
            email: "lee@example.com".into(),
            phone: None,
            message: "Is it still available?".into(),
            inquiry_type: "general".into(),
        })
        .await
        .unwrap();
    let review = reviews
        .create(&NewReview {
            reviewer_name: Some("Lee".into()),
            reviewer_email: Some("lee@example.com".into()),
            rating: Some(4.0),
            review_text: Some("Lovely".into()),
            property_id: Some(id),
            ..NewReview::default()
        })
        .await
        .unwrap();
    assert_eq!(review.location.as_deref(), Some("Portland, OR"));
    assert_eq!(review.property_type.as_deref(), Some("House"));

    reviews.stats().await.unwrap();
    let summary = properties.delete(id).await.unwrap();
    assert_eq!(summary.features, 2);
    assert_eq!(summary.amenities, 1);
    assert_eq!(summary.photos, 3);
    assert_eq!(summary.inquiries, 1);
    assert_eq!(summary.reviews, 1);
    assert_eq!(cache.invalidate(Some("stats")).await, 0);

    assert!(inquiries.list_for_property(id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires database"]
async fn review_create_refreshes_cached_stats() {
    let (db, config) = setup().await;
    let cache: Arc<dyn CachePort> = Arc::new(MemoryCache::new());
    let reviews = CachedReviews::new(ReviewRepo::new(db, config.reviews), cache, config.cache);

    let before = reviews.stats().await.unwrap();
    reviews
        .create(&NewReview {
            reviewer_name: Some("Kit".into()),
            reviewer_email: Some("kit@example.com".into()),
            rating: Some(5.0),
            review_text: Some("Would rent again".into()),
            location: Some("Boise, ID".into()),
            ..NewReview::default()
        })
        .await
        .unwrap();
    let after = reviews.stats().await.unwrap();

    if config.reviews.auto_verify {
        assert_eq!(after.total_reviews, before.total_reviews + 1);
        assert_eq!(after.rating_distribution[&5], before.rating_distribution[&5] + 1);
    }
}

#[tokio::test]
#[ignore = "requires database"]
async fn filters_narrow_listing() {
    let (db, _) = setup().await;
    let repo = PropertyRepo::new(db);
    let title = unique("Filter");
    let mut input = sample(&title);
    input.city = format!("Zed{}", Uuid::new_v4().simple());
    let id = repo.create(&input).await.unwrap().id();

    let filters = PropertyFilters {
        city: Some(input.city.to_lowercase()),
        min_bedrooms: Some(3),
        ..PropertyFilters::default()
    };
    let found = repo.list(&filters).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), id);

    let filters = PropertyFilters {
        city: Some(input.city.clone()),
        min_bedrooms: Some(4),
        ..PropertyFilters::default()
    };
    assert!(repo.list(&filters).await.unwrap().is_empty());

    repo.delete(id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn failing_delete_rolls_back_children() {
    let (db, _) = setup().await;
    let repo = PropertyRepo::new(db.clone());
    let inquiries = InquiryRepo::new(db.clone());

    {
        let mut conn = db.acquire().await.unwrap();
        sqlx::query(
            r#"
            CREATE OR REPLACE FUNCTION hearth_guard_delete() RETURNS trigger AS $$
            BEGIN
                IF OLD.title LIKE 'Guarded %' THEN
                    RAISE EXCEPTION 'property % is guarded', OLD.id;
                END IF;
                RETURN OLD;
            END
            $$ LANGUAGE plpgsql
            "#,
        )
        .execute(&mut *conn)
        .await
        .unwrap();
        sqlx::query("DROP TRIGGER IF EXISTS hearth_guard_delete ON properties")
            .execute(&mut *conn)
            .await
            .unwrap();
        sqlx::query(
            "CREATE TRIGGER hearth_guard_delete BEFORE DELETE ON properties \
             FOR EACH ROW EXECUTE FUNCTION hearth_guard_delete()",
        )
        .execute(&mut *conn)
        .await
        .unwrap();
    }

    let id = repo.create(&sample(&unique("Guarded"))).await.unwrap().id();
    inquiries
        .create(&NewInquiry {
            property_id: id,
            name: "Ash".into(),
            email: "ash@example.com".into(),
            phone: None,
            message: "Viewing on Saturday?".into(),
            inquiry_type: "viewing".into(),
        })
        .await
        .unwrap();

    // Children are deleted first, then the parent delete raises
    let err = repo.delete(id).await.unwrap_err();
    assert!(matches!(err, StoreError::Transaction { .. }), "{err}");

    let fetched = repo.get_by_id(id).await.unwrap();
    assert_eq!(fetched.features, vec!["Fireplace", "Garage"]);
    assert_eq!(fetched.amenities, vec!["Pool"]);
    assert_eq!(fetched.photos.len(), 3);
    assert_eq!(inquiries.list_for_property(id).await.unwrap().len(), 1);

    let release = PropertyPatch {
        title: Some(unique("Released")),
        ..PropertyPatch::default()
    };
    repo.update(id, &release).await.unwrap();
    assert_eq!(repo.delete(id).await.unwrap().inquiries, 1);
}

#[tokio::test]
#[ignore = "requires database"]
async fn review_for_missing_property_is_not_found() {
    let (db, config) = setup().await;
    let cache: Arc<dyn CachePort> = Arc::new(MemoryCache::new());
    let reviews = CachedReviews::new(ReviewRepo::new(db, config.reviews), cache, config.cache);
    let missing = Uuid::new_v4();

    let err = reviews
        .create(&NewReview {
            reviewer_name: Some("Jo".into()),
            reviewer_email: Some("jo@example.com".into()),
            rating: Some(3.0),
            review_text: Some("Never existed".into()),
            property_id: Some(missing),
            ..NewReview::default()
        })
        .await
        .unwrap_err();

    assert!(err.is_not_found(), "{err}");
    assert!(!err.is_transient());
    assert!(err.to_string().contains(&missing.to_string()));
}
