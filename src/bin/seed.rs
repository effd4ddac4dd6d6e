use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use rewear_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    models::WELCOME_BONUS_POINTS,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&pool, "Admin", "admin@rewear.com", "admin123", "admin").await?;
    let user_id = ensure_user(&pool, "Sarah M.", "sarah@example.com", "user123", "user").await?;
    seed_items(&pool, user_id).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash, role, points)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(WELCOME_BONUS_POINTS)
    .fetch_optional(pool)
    .await?;

    // If user already exists, fetch id
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_items(pool: &sqlx::PgPool, uploader_id: Uuid) -> anyhow::Result<()> {
    let items = vec![
        (
            "Vintage Denim Jacket",
            "Classic 90s denim jacket, barely worn",
            "outerwear",
            "jacket",
            "M",
            "excellent",
            25,
        ),
        (
            "Floral Summer Dress",
            "Light cotton dress, perfect for warm days",
            "dresses",
            "dress",
            "S",
            "good",
            20,
        ),
        (
            "Wool Winter Coat",
            "Heavy charcoal wool coat, very warm",
            "outerwear",
            "coat",
            "L",
            "good",
            40,
        ),
        (
            "Canvas Sneakers",
            "White low-tops, light scuffing on the soles",
            "shoes",
            "sneakers",
            "42",
            "fair",
            15,
        ),
    ];

    for (title, description, category, item_type, size, condition, points) in items {
        sqlx::query(
            r#"
            INSERT INTO clothing_items
                (id, title, description, category, item_type, size, condition, points, uploader_id, uploader_name)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, name
            FROM users
            WHERE id = $9
              AND NOT EXISTS (SELECT 1 FROM clothing_items WHERE title = $2)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(description)
        .bind(category)
        .bind(item_type)
        .bind(size)
        .bind(condition)
        .bind(points)
        .bind(uploader_id)
        .execute(pool)
        .await?;
    }

    println!("Seeded items");
    Ok(())
}
