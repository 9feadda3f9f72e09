use anyhow::Context;
use tokio_postgres::{Client, NoTls};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
}

/// Opens a connection and drives it on a background task
pub async fn connect(config: &PostgresConfig) -> anyhow::Result<Client> {
    let connection_str = format!(
        "postgresql://{}:{}@{}",
        config.username, config.password, config.hostname
    );
    tracing::info!("Postgres connection to {}", config.hostname);
    let (client, connection) = tokio_postgres::connect(&connection_str, NoTls)
        .await
        .context("Failed to start postgres")?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Postgres connection error: {}", e);
        }
    });

    Ok(client)
}

#[cfg(test)]
pub(crate) mod test_support {
    use testcontainers::core::IntoContainerPort;
    use testcontainers::runners::AsyncRunner;
    use testcontainers::{ContainerAsync, GenericImage, ImageExt};

    use super::PostgresConfig;

    pub(crate) async fn start_postgres_container() -> ContainerAsync<GenericImage> {
        GenericImage::new("postgres", "latest")
            .with_mapped_port(5432, 5432.tcp())
            .with_env_var("POSTGRES_USER", "postgres")
            .with_env_var("POSTGRES_PASSWORD", "postgres")
            .start()
            .await
            .expect("Failed to start postgres")
    }

    pub(crate) fn local_config() -> PostgresConfig {
        PostgresConfig {
            hostname: "127.0.0.1".to_string(),
            username: "postgres".to_string(),
            password: "postgres".to_string(),
        }
    }
}
