use sqlx::PgPool;

/// All `id` columns must be bigint.
#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn all_pks_are_bigint(pool: PgPool) {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT table_name, data_type
         FROM information_schema.columns
         WHERE column_name = 'id'
           AND table_schema = 'public'
           AND table_name != '_sqlx_migrations'
         ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(!rows.is_empty());
    for (table, data_type) in &rows {
        assert_eq!(data_type, "bigint", "{table}.id should be bigint");
    }
}

/// Every table carries timestamptz `created_at` and `updated_at`.
#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn all_tables_have_timestamps(pool: PgPool) {
    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT table_name
         FROM information_schema.tables
         WHERE table_schema = 'public'
           AND table_type = 'BASE TABLE'
           AND table_name != '_sqlx_migrations'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for (table,) in &tables {
        for col in ["created_at", "updated_at"] {
            let data_type: Option<(String,)> = sqlx::query_as(
                "SELECT data_type FROM information_schema.columns
                 WHERE table_schema = 'public' AND table_name = $1 AND column_name = $2",
            )
            .bind(table)
            .bind(col)
            .fetch_optional(&pool)
            .await
            .unwrap();

            let (data_type,) =
                data_type.unwrap_or_else(|| panic!("Table {table} is missing column {col}"));
            assert_eq!(data_type, "timestamp with time zone", "{table}.{col}");
        }
    }
}

/// Every foreign key column has an index.
#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn all_fks_have_indexes(pool: PgPool) {
    let fk_columns: Vec<(String, String)> = sqlx::query_as(
        "SELECT DISTINCT tc.table_name, kcu.column_name
         FROM information_schema.table_constraints tc
         JOIN information_schema.key_column_usage kcu
             ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
         WHERE tc.constraint_type = 'FOREIGN KEY'
           AND tc.table_schema = 'public'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(!fk_columns.is_empty());
    for (table, column) in &fk_columns {
        let (has_index,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (
                SELECT 1 FROM pg_indexes
                WHERE schemaname = 'public'
                  AND tablename = $1
                  AND indexdef LIKE '%(' || $2 || '%'
            )",
        )
        .bind(table)
        .bind(column)
        .fetch_one(&pool)
        .await
        .unwrap();

        assert!(has_index, "FK column {table}.{column} has no index");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn health_check_succeeds(pool: PgPool) {
    pulsewatch_db::health_check(&pool).await.unwrap();
}
