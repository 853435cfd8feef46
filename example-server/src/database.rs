use sqlx::sqlite::SqlitePool;

pub async fn setup(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Users carry the two optional account fields normalized by the admin hook
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            stripe_account TEXT UNIQUE,
            agreement_embed_url TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            is_active BOOLEAN DEFAULT true
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            price REAL NOT NULL,
            stock INTEGER DEFAULT 0,
            category TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Orders reference users, so deleting a user with orders is a constraint failure
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            status TEXT NOT NULL DEFAULT 'pending',
            total REAL NOT NULL,
            placed_on DATE,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Composite key: addressed as "<order_id>,<line_number>"
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS order_lines (
            order_id INTEGER NOT NULL REFERENCES orders(id),
            line_number INTEGER NOT NULL,
            product_id INTEGER NOT NULL REFERENCES products(id),
            quantity INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (order_id, line_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // No primary key: searchable and exportable, but not editable by key
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            happened_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            actor TEXT,
            action TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Hidden by the default denylist
    sqlx::query("CREATE TABLE IF NOT EXISTS schema_migrations (version TEXT PRIMARY KEY)")
        .execute(pool)
        .await?;

    seed_sample_data(pool).await?;

    Ok(())
}

async fn seed_sample_data(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let user_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    if user_count.0 > 0 {
        // Data already seeded
        return Ok(());
    }

    let first_names = [
        "Alice", "Bob", "Charlie", "Diana", "Evan", "Fiona", "George", "Hannah",
        "Isaac", "Julia", "Kevin", "Laura", "Michael", "Nancy", "Oscar", "Patricia",
    ];
    let last_names = [
        "Johnson", "Smith", "Brown", "Prince", "Davis", "Wilson", "Taylor", "Anderson",
        "Thomas", "Jackson", "White", "Harris", "Martin", "Thompson", "Garcia", "O'Neil",
    ];

    for index in 0..50 {
        let first = first_names[index % first_names.len()];
        let last = last_names[(index * 3) % last_names.len()];
        let email = format!(
            "{}.{}{}@example.com",
            first.to_lowercase(),
            last.to_lowercase().replace('\'', ""),
            index
        );
        let stripe_account = (index % 4 == 0).then(|| format!("acct_{:06}", index));
        sqlx::query(
            "INSERT INTO users (name, email, stripe_account, is_active) VALUES (?, ?, ?, ?)",
        )
        .bind(format!("{} {}", first, last))
        .bind(email)
        .bind(stripe_account)
        .bind(index % 5 != 0)
        .execute(pool)
        .await?;
    }

    let categories = ["Electronics", "Furniture", "Stationery", "Kitchen", "Garden"];
    let product_types = ["Laptop", "Chair", "Notebook", "Kettle", "Shovel", "Lamp", "Desk", "Pen"];

    for index in 0..40 {
        let product_type = product_types[index % product_types.len()];
        let category = categories[index % categories.len()];
        let price = 4.5 + (index as f64 * 7.25);

        sqlx::query("INSERT INTO products (name, price, stock, category) VALUES (?, ?, ?, ?)")
            .bind(format!("{} {}", product_type, index + 1))
            .bind(price)
            .bind(((index * 13) % 90) as i64)
            .bind(category)
            .execute(pool)
            .await?;
    }

    let statuses = ["pending", "processing", "shipped", "completed", "cancelled"];

    for index in 0..250 {
        let user_id = (index % 50) + 1;
        let status = statuses[index % statuses.len()];
        let placed_on = format!("2024-{:02}-{:02}", (index % 12) + 1, (index % 28) + 1);

        let order_id: (i64,) = sqlx::query_as(
            "INSERT INTO orders (user_id, status, total, placed_on) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(user_id as i64)
        .bind(status)
        .bind(0.0_f64)
        .bind(placed_on)
        .fetch_one(pool)
        .await?;

        let mut total = 0.0;
        for line_number in 1..=((index % 3) + 1) {
            let product_id = ((index + line_number) % 40) + 1;
            let quantity = (line_number % 4) + 1;
            total += quantity as f64 * (4.5 + (product_id - 1) as f64 * 7.25);

            sqlx::query(
                "INSERT INTO order_lines (order_id, line_number, product_id, quantity) VALUES (?, ?, ?, ?)",
            )
            .bind(order_id.0)
            .bind(line_number as i64)
            .bind(product_id as i64)
            .bind(quantity as i64)
            .execute(pool)
            .await?;
        }

        sqlx::query("UPDATE orders SET total = ? WHERE id = ?")
            .bind(total)
            .bind(order_id.0)
            .execute(pool)
            .await?;
    }

    for index in 0..30 {
        sqlx::query("INSERT INTO audit_log (actor, action) VALUES (?, ?)")
            .bind(first_names[index % first_names.len()])
            .bind(if index % 2 == 0 { "login" } else { "export" })
            .execute(pool)
            .await?;
    }

    tracing::info!(
        "sample data seeded: 50 users, 40 products, 250 orders with lines, 30 audit entries"
    );
    Ok(())
}
