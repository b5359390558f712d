//! Engine behaviour against PostgreSQL. Runs when `DATABASE_URL` points at a reachable
//! server and is skipped otherwise. Every test works on its own freshly created tables.

use folio::service::new_identifier;
use folio::{
    ensure_tables, AppError, ById, CrudService, Page, Paste, PgStorage, Storage, StaticPage,
    TableRegistry, Tables,
};
use sqlx::PgPool;

struct Fixture {
    storage: PgStorage,
    registry: TableRegistry,
    names: Vec<String>,
}

impl Fixture {
    async fn open() -> Option<Fixture> {
        let url = std::env::var("DATABASE_URL").ok().filter(|u| !u.trim().is_empty())?;
        let pool = match PgPool::connect(&url).await {
            Ok(pool) => pool,
            Err(e) => {
                eprintln!("skipping PostgreSQL tests: {}", e);
                return None;
            }
        };
        let unique = new_identifier();
        let suffix = &unique[..12];
        let content = format!("page_content_{}", suffix);
        let mut names = vec![content.clone()];
        let mut registry = TableRegistry::with_defaults();
        let kinds = [
            ("blogs", "blog_pages"),
            ("pastes", "paste_pages"),
            ("static", "static_pages"),
        ];
        for (kind, record) in kinds {
            let record = format!("{}_{}", record, suffix);
            names.push(record.clone());
            registry.set_tables(kind, Tables::new(record, content.clone())).unwrap();
        }
        ensure_tables(&pool, &registry).await.unwrap();
        Some(Fixture {
            storage: PgStorage::from_pool(pool),
            registry,
            names,
        })
    }

    fn blogs(&self) -> Tables {
        self.registry.tables_for::<Page>()
    }

    async fn drop_tables(self) {
        for name in &self.names {
            sqlx::query(&format!("DROP TABLE IF EXISTS \"{}\"", name))
                .execute(self.storage.pool())
                .await
                .unwrap();
        }
        self.storage.close().await;
    }
}

#[tokio::test]
async fn page_lifecycle_in_postgres() {
    let Some(fx) = Fixture::open().await else { return };
    let blogs = fx.blogs();

    let inserted = CrudService::insert(&fx.storage, Page::new("p1", "Hello", "World"), &blogs)
        .await
        .unwrap();
    let fetched: Page = CrudService::fetch_one::<Page, _>(&fx.storage, &ById::new("p1"), &blogs)
        .await
        .unwrap();
    assert_eq!(fetched, inserted);
    assert!(fetched.created_at.is_some());

    let updated = CrudService::update(&fx.storage, Page::new("p1", "Hello", "World!"), &blogs)
        .await
        .unwrap();
    assert_eq!(updated.body, "World!");
    assert_eq!(updated.created_at, inserted.created_at);

    CrudService::delete::<Page, _>(&fx.storage, &ById::new("p1"), &blogs)
        .await
        .unwrap();
    let gone = CrudService::fetch_one::<Page, _>(&fx.storage, &ById::new("p1"), &blogs).await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));

    fx.drop_tables().await;
}

#[tokio::test]
async fn conflicts_and_missing_rows_in_postgres() {
    let Some(fx) = Fixture::open().await else { return };
    let blogs = fx.blogs();

    CrudService::insert(&fx.storage, Page::new("p1", "Hello", "World"), &blogs)
        .await
        .unwrap();
    let dup = CrudService::insert(&fx.storage, Page::new("p1", "Again", "Other"), &blogs).await;
    assert!(matches!(dup, Err(AppError::Conflict(_))));

    let missing = CrudService::update(&fx.storage, Page::new("ghost", "t", "b"), &blogs).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
    let missing = CrudService::delete::<Page, _>(&fx.storage, &ById::new("ghost"), &blogs).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    fx.drop_tables().await;
}

#[tokio::test]
async fn update_rolls_back_on_record_without_content() {
    let Some(fx) = Fixture::open().await else { return };
    let blogs = fx.blogs();
    let insert = format!(
        "INSERT INTO \"{}\" (\"id\", \"title\") VALUES ('o1', 'old')",
        blogs.record_table()
    );
    sqlx::query(&insert).execute(fx.storage.pool()).await.unwrap();

    let err = CrudService::update(&fx.storage, Page::new("o1", "new", "b"), &blogs).await;
    assert!(matches!(err, Err(AppError::NotFound(_))), "{:?}", err);
    let select = format!("SELECT \"title\" FROM \"{}\" WHERE \"id\" = 'o1'", blogs.record_table());
    let title: String = sqlx::query_scalar(&select)
        .fetch_one(fx.storage.pool())
        .await
        .unwrap();
    assert_eq!(title, "old");

    fx.drop_tables().await;
}

#[tokio::test]
async fn lists_share_content_table_in_postgres() {
    let Some(fx) = Fixture::open().await else { return };
    let pastes = fx.registry.tables_for::<Paste>();
    let statics = fx.registry.tables_for::<StaticPage>();

    for id in ["b", "a"] {
        let page = StaticPage {
            id: id.into(),
            title: id.to_uppercase(),
            body: format!("{} body", id),
        };
        CrudService::insert(&fx.storage, page, &statics).await.unwrap();
    }
    let paste = Paste {
        id: "a".into(),
        language: "rust".into(),
        body: "fn main() {}".into(),
        ..Paste::default()
    };
    CrudService::insert(&fx.storage, paste, &pastes).await.unwrap();

    let listed: Vec<StaticPage> = CrudService::fetch_many(&fx.storage, &statics).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
    let pastes: Vec<Paste> = CrudService::fetch_many(&fx.storage, &pastes).await.unwrap();
    assert_eq!(pastes.len(), 1);
    assert_eq!(pastes[0].body, "fn main() {}");
    assert!(fx.storage.ping().await.is_ok());

    fx.drop_tables().await;
}
