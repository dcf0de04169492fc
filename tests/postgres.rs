//! Paging against a real PostgreSQL database.
//!
//! Requires a running PostgreSQL: set `TEST_DATABASE_URL` and run with `--ignored`.

use lifeguard_dao::entity::{EntityMetadata, FromRow, LifeEntity, PropertyMeta};
use lifeguard_dao::filter::PropertyFilter;
use lifeguard_dao::{
    connect, LifeDao, LifeError, LifeExecutor, MayPostgresExecutor, PageRequest, PostgresSession,
};
use may_postgres::Row;

static TEAM: EntityMetadata = EntityMetadata::new(
    "Team",
    "dao_test_teams",
    "id",
    &[PropertyMeta::basic("id", "id"), PropertyMeta::basic("city", "city")],
);

static MEMBER: EntityMetadata = EntityMetadata::new(
    "Member",
    "dao_test_members",
    "id",
    &[
        PropertyMeta::basic("id", "id"),
        PropertyMeta::basic("name", "name").ignore_case(),
        PropertyMeta::basic("age", "age"),
        PropertyMeta::association("team", &TEAM, "team_id", "id"),
    ],
);

#[derive(Debug)]
struct Member {
    id: i64,
    name: String,
}

impl LifeEntity for Member {
    fn metadata() -> &'static EntityMetadata {
        &MEMBER
    }
}

impl FromRow for Member {
    fn from_row(row: &Row) -> Result<Self, may_postgres::Error> {
        Ok(Member {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }
}

fn setup(executor: &MayPostgresExecutor) -> Result<(), LifeError> {
    executor.execute("DROP TABLE IF EXISTS dao_test_members", &[])?;
    executor.execute("DROP TABLE IF EXISTS dao_test_teams", &[])?;
    executor.execute(
        "CREATE TABLE dao_test_teams (id BIGINT PRIMARY KEY, city TEXT NOT NULL)",
        &[],
    )?;
    executor.execute(
        r#"
        CREATE TABLE dao_test_members (
            id BIGINT PRIMARY KEY,
            name TEXT NOT NULL,
            age INTEGER NOT NULL,
            team_id BIGINT REFERENCES dao_test_teams (id)
        )
        "#,
        &[],
    )?;
    executor.execute(
        "INSERT INTO dao_test_teams VALUES (1, 'Lyon'), (2, 'Berlin')",
        &[],
    )?;
    executor.execute(
        "INSERT INTO dao_test_members VALUES \
         (1, 'Alice', 30, 1), (2, 'Bob', 15, 2), (3, 'Alvaro', 40, 2), (4, 'Cal', 17, NULL)",
        &[],
    )?;
    Ok(())
}

#[test]
#[ignore]
fn test_paging_against_postgres() {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };

    let handle = may::go!(move || {
        let executor = MayPostgresExecutor::new(connect(&url).expect("connect"));
        setup(&executor).expect("schema");
        let session = PostgresSession::new(&executor);
        let dao: LifeDao<'_, Member, i64, _> = LifeDao::new(&session);

        let page = dao
            .find_page(
                PageRequest::new(2, 3),
                "select o.* from dao_test_members o order by o.id",
                &[],
            )
            .expect("text page");
        assert_eq!(page.result().len(), 1);
        assert_eq!(page.result()[0].id, 4);

        let filters = [
            PropertyFilter::parse("LIKES_name", "AL").expect("filter"),
            PropertyFilter::parse("GEI_age", "18").expect("filter"),
        ];
        let page = dao
            .find_page_by_filters(PageRequest::new(1, 10).order_by("team.city asc"), &filters)
            .expect("filter page");
        assert_eq!(page.total_count(), Some(2));
        let names: Vec<&str> = page.result().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Alvaro", "Alice"]);
    });
    handle.join().expect("coroutine panicked");
}
