use std::sync::Arc;

use common::decimal::dec;
use common::error::Error;
use listing_service::{
    InMemoryListingRepository, ListingRepository, ListingService, ListingUpdate, NewListing,
    ReservationState,
};
use uuid::Uuid;

fn new_listing(quantity: u32) -> NewListing {
    NewListing {
        title: "The Great Gatsby".to_string(),
        author: "F. Scott Fitzgerald".to_string(),
        price: dec!(12.99),
        quantity,
        is_sellable: true,
        is_swappable: false,
        condition: "Good".to_string(),
        city: Some("New York, NY".to_string()),
    }
}

#[tokio::test]
async fn test_create_and_get_listing() {
    let service = ListingService::new();
    let owner = Uuid::new_v4();

    let listing = service.create_listing(owner, new_listing(3)).await.unwrap();
    assert_eq!(listing.owner_id, owner);
    assert_eq!(listing.quantity, 3);
    assert_eq!(listing.available_quantity, 3);

    let fetched = service.get_listing(listing.id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "The Great Gatsby");
}

#[tokio::test]
async fn test_validation_rejects_bad_listings() {
    let service = ListingService::new();
    let owner = Uuid::new_v4();

    let mut bad_price = new_listing(1);
    bad_price.price = dec!(-1.00);
    assert!(matches!(
        service.create_listing(owner, bad_price).await.unwrap_err(),
        Error::ValidationError(_)
    ));

    let mut zero_quantity = new_listing(1);
    zero_quantity.quantity = 0;
    assert!(matches!(
        service.create_listing(owner, zero_quantity).await.unwrap_err(),
        Error::ValidationError(_)
    ));
}

#[tokio::test]
async fn test_reserve_decrements_available() {
    let service = ListingService::new();
    let owner = Uuid::new_v4();
    let listing = service.create_listing(owner, new_listing(3)).await.unwrap();

    service.reserve(listing.id, 1, 1).await.unwrap();

    let listing = service.get_listing(listing.id).await.unwrap().unwrap();
    assert_eq!(listing.available_quantity, 2);
    assert_eq!(listing.quantity, 3);

    let reservation = service.get_reservation(1).await.unwrap().unwrap();
    assert_eq!(reservation.state, ReservationState::Open);
    assert_eq!(reservation.quantity, 1);
}

#[tokio::test]
async fn test_reserve_fails_without_stock() {
    let service = ListingService::new();
    let owner = Uuid::new_v4();
    let listing = service.create_listing(owner, new_listing(1)).await.unwrap();

    service.reserve(listing.id, 1, 1).await.unwrap();
    let err = service.reserve(listing.id, 2, 1).await.unwrap_err();
    assert!(matches!(err, Error::InsufficientStock(_)));

    // The failed reserve left no side effects
    let listing = service.get_listing(listing.id).await.unwrap().unwrap();
    assert_eq!(listing.available_quantity, 0);
    assert!(service.get_reservation(2).await.unwrap().is_none());
}

#[tokio::test]
async fn test_reserve_fails_on_unsellable_listing() {
    let service = ListingService::new();
    let owner = Uuid::new_v4();
    let mut spec = new_listing(2);
    spec.is_sellable = false;
    spec.is_swappable = true;
    let listing = service.create_listing(owner, spec).await.unwrap();

    let err = service.reserve(listing.id, 1, 1).await.unwrap_err();
    assert!(matches!(err, Error::ListingNotSellable(_)));
}

#[tokio::test]
async fn test_release_restores_stock_exactly_once() {
    let service = ListingService::new();
    let owner = Uuid::new_v4();
    let listing = service.create_listing(owner, new_listing(3)).await.unwrap();

    service.reserve(listing.id, 1, 2).await.unwrap();
    service.release(listing.id, 1).await.unwrap();

    let fetched = service.get_listing(listing.id).await.unwrap().unwrap();
    assert_eq!(fetched.available_quantity, 3);

    // Double-release is inert
    service.release(listing.id, 1).await.unwrap();
    let fetched = service.get_listing(listing.id).await.unwrap().unwrap();
    assert_eq!(fetched.available_quantity, 3);
}

#[tokio::test]
async fn test_release_after_finalize_is_inert() {
    let service = ListingService::new();
    let owner = Uuid::new_v4();
    let listing = service.create_listing(owner, new_listing(3)).await.unwrap();

    service.reserve(listing.id, 7, 1).await.unwrap();
    service.finalize(listing.id, 7).await.unwrap();

    let reservation = service.get_reservation(7).await.unwrap().unwrap();
    assert_eq!(reservation.state, ReservationState::Consumed);

    // Finalize changed no counts, and release can no longer touch the hold
    service.release(listing.id, 7).await.unwrap();
    let fetched = service.get_listing(listing.id).await.unwrap().unwrap();
    assert_eq!(fetched.available_quantity, 2);
    assert_eq!(fetched.quantity, 3);
}

#[tokio::test]
async fn test_concurrent_reserves_for_last_unit() {
    let repo = Arc::new(InMemoryListingRepository::new());
    let owner = Uuid::new_v4();
    let listing = common::model::listing::Listing {
        id: Uuid::new_v4(),
        owner_id: owner,
        title: "1984".to_string(),
        author: "George Orwell".to_string(),
        price: dec!(8.50),
        quantity: 1,
        available_quantity: 1,
        is_sellable: true,
        is_swappable: false,
        condition: "Acceptable".to_string(),
        city: None,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };
    repo.create_listing(listing.clone()).await.unwrap();

    let a = {
        let repo = repo.clone();
        let id = listing.id;
        tokio::spawn(async move { repo.reserve(id, 1, 1).await })
    };
    let b = {
        let repo = repo.clone();
        let id = listing.id;
        tokio::spawn(async move { repo.reserve(id, 2, 1).await })
    };

    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one reserve may win the last unit");

    let loser = if a.is_err() { a } else { b };
    assert!(matches!(loser.unwrap_err(), Error::InsufficientStock(_)));

    let fetched = repo.get_listing(listing.id).await.unwrap().unwrap();
    assert_eq!(fetched.available_quantity, 0);
}

#[tokio::test]
async fn test_update_preserves_ledger_counters() {
    let service = ListingService::new();
    let owner = Uuid::new_v4();
    let listing = service.create_listing(owner, new_listing(3)).await.unwrap();
    service.reserve(listing.id, 1, 1).await.unwrap();

    let updated = service.update_listing(owner, listing.id, ListingUpdate {
        title: "The Great Gatsby (1925)".to_string(),
        author: "F. Scott Fitzgerald".to_string(),
        price: dec!(15.00),
        is_sellable: true,
        is_swappable: true,
        condition: "Like New".to_string(),
        city: None,
    }).await.unwrap();

    assert_eq!(updated.price, dec!(15.00));
    assert_eq!(updated.quantity, 3);
    assert_eq!(updated.available_quantity, 2);
}

#[tokio::test]
async fn test_update_requires_owner() {
    let service = ListingService::new();
    let owner = Uuid::new_v4();
    let listing = service.create_listing(owner, new_listing(1)).await.unwrap();

    let err = service.update_listing(Uuid::new_v4(), listing.id, ListingUpdate {
        title: "Hijacked".to_string(),
        author: "Somebody".to_string(),
        price: dec!(0.01),
        is_sellable: true,
        is_swappable: false,
        condition: "Good".to_string(),
        city: None,
    }).await.unwrap_err();
    assert!(matches!(err, Error::NotParty(_)));
}

#[tokio::test]
async fn test_delete_guarded_by_outstanding_reservations() {
    let service = ListingService::new();
    let owner = Uuid::new_v4();
    let listing = service.create_listing(owner, new_listing(2)).await.unwrap();

    service.reserve(listing.id, 1, 1).await.unwrap();
    let err = service.delete_listing(owner, listing.id).await.unwrap_err();
    assert!(matches!(err, Error::ListingNotDeletable(_)));

    service.release(listing.id, 1).await.unwrap();
    service.delete_listing(owner, listing.id).await.unwrap();
    assert!(service.get_listing(listing.id).await.unwrap().is_none());
}
