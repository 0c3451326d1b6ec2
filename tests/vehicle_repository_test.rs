// Postgres-backed repository tests
// Need DATABASE_URL pointing at a disposable database: cargo test -- --ignored

mod common;

use chrono::NaiveDate;
use common::test_pool;
use moto_inventory_service::auth::{hash_password, verify_password};
use moto_inventory_service::db::{
    DbError, LocalityRepository, LocalityStore, UserAccount, UserRepository, UserStore,
    VehicleDetails, VehicleRecord, VehicleRepository, VehicleStore,
};
use serial_test::serial;
use sqlx::PgPool;

const PREFIX: &str = "TESTREPO";

async fn cleanup(pool: &PgPool) {
    sqlx::query("DELETE FROM vehicles WHERE frame_number LIKE $1")
        .bind(format!("{PREFIX}%"))
        .execute(pool)
        .await
        .ok();
}

fn record(suffix: &str, client: Option<&str>) -> VehicleRecord {
    VehicleRecord {
        frame_number: format!("{PREFIX}{suffix}"),
        details: VehicleDetails {
            brand: Some("HONDA".to_string()),
            model: Some("SPORT".to_string()),
            arrival_date: NaiveDate::from_ymd_opt(2023, 3, 15),
            client: client.map(str::to_string),
            ..VehicleDetails::default()
        },
    }
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_insert_get_and_duplicate() {
    let pool = test_pool().await;
    cleanup(pool).await;
    let repo = VehicleRepository::new(pool.clone());

    let first = record("001", None);
    repo.insert(&first).await.unwrap();

    let fetched = repo.get(&first.frame_number).await.unwrap().unwrap();
    assert_eq!(fetched, first);

    let err = repo.insert(&first).await.unwrap_err();
    assert!(matches!(err, DbError::Duplicate(ref f) if *f == first.frame_number));

    cleanup(pool).await;
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_oversized_value_is_rejected_not_internal() {
    let pool = test_pool().await;
    cleanup(pool).await;
    let repo = VehicleRepository::new(pool.clone());

    let mut too_long = record("002", None);
    too_long.details.gender = Some("much too long for the column".to_string());

    let err = repo.insert(&too_long).await.unwrap_err();
    assert!(matches!(err, DbError::Rejected { .. }));

    cleanup(pool).await;
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_list_filter_matches_frame_or_client() {
    let pool = test_pool().await;
    cleanup(pool).await;
    let repo = VehicleRepository::new(pool.clone());

    repo.insert(&record("A10", Some("Karim Alaoui"))).await.unwrap();
    repo.insert(&record("B20", Some("Sara_Bennani"))).await.unwrap();
    repo.insert(&record("C30", None)).await.unwrap();

    let by_frame = repo.list_all(Some("testrepob")).await.unwrap();
    assert_eq!(by_frame.len(), 1);
    assert_eq!(by_frame[0].frame_number, format!("{PREFIX}B20"));

    let by_client = repo.list_all(Some("ALAOUI")).await.unwrap();
    assert_eq!(by_client.len(), 1);

    // Underscore is matched literally
    let literal = repo.list_all(Some("m_a")).await.unwrap();
    assert!(literal.is_empty());

    let all: Vec<String> = repo
        .list_all(Some(PREFIX))
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.frame_number)
        .collect();
    assert_eq!(
        all,
        vec![
            format!("{PREFIX}A10"),
            format!("{PREFIX}B20"),
            format!("{PREFIX}C30")
        ]
    );

    cleanup(pool).await;
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_update_and_delete() {
    let pool = test_pool().await;
    cleanup(pool).await;
    let repo = VehicleRepository::new(pool.clone());
    let original = record("D40", None);
    repo.insert(&original).await.unwrap();

    let details = VehicleDetails {
        client: Some("Youssef".to_string()),
        client_sale_date: NaiveDate::from_ymd_opt(2024, 1, 5),
        ..VehicleDetails::default()
    };
    repo.update(&original.frame_number, &details).await.unwrap();

    let updated = repo.get(&original.frame_number).await.unwrap().unwrap();
    assert_eq!(updated.details, details);

    repo.delete(&original.frame_number).await.unwrap();
    assert!(repo.get(&original.frame_number).await.unwrap().is_none());
    assert!(matches!(
        repo.delete(&original.frame_number).await,
        Err(DbError::NotFound(_))
    ));
    assert!(matches!(
        repo.update(&original.frame_number, &details).await,
        Err(DbError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_user_save_and_lookup() {
    let pool = test_pool().await;
    let repo = UserRepository::new(pool.clone());

    let account = UserAccount {
        login: "testrepo_user".to_string(),
        display_name: "Test".to_string(),
        password_hash: hash_password("pw").unwrap(),
        droit: "consul".to_string(),
    };
    repo.save(&account).await.unwrap();
    repo.save(&account).await.unwrap();

    let found = repo.find_by_login("testrepo_user").await.unwrap().unwrap();
    assert_eq!(found.droit, "consul");
    assert!(verify_password("pw", &found.password_hash));
    assert!(repo.find_by_login("nobody_here").await.unwrap().is_none());

    sqlx::query("DELETE FROM users WHERE login = $1")
        .bind("testrepo_user")
        .execute(pool)
        .await
        .ok();
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_localities_skip_blank_cities() {
    let pool = test_pool().await;
    sqlx::query(
        "INSERT INTO localities (province, city) VALUES ('TESTREPO Prov', 'Zeta'), \
         ('TESTREPO Prov', 'Alpha'), ('TESTREPO Prov', '') ON CONFLICT DO NOTHING",
    )
    .execute(pool)
    .await
    .unwrap();
    let repo = LocalityRepository::new(pool.clone());

    assert!(repo
        .provinces()
        .await
        .unwrap()
        .contains(&"TESTREPO Prov".to_string()));
    assert_eq!(repo.cities("TESTREPO Prov").await.unwrap(), vec!["Alpha", "Zeta"]);

    sqlx::query("DELETE FROM localities WHERE province = 'TESTREPO Prov'")
        .execute(pool)
        .await
        .ok();
}
