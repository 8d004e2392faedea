//! Tests for db::factory module - repository creation and configuration.

mod support;

use std::io::Write;
use std::str::FromStr;

use teacher_hub::db::factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
use teacher_hub::db::RepositoryConfig;

#[test]
fn test_repository_type_from_str_hosted() {
    assert_eq!(
        RepositoryType::from_str("hosted").unwrap(),
        RepositoryType::Hosted
    );
    assert_eq!(
        RepositoryType::from_str("HOSTED").unwrap(),
        RepositoryType::Hosted
    );
    assert_eq!(
        RepositoryType::from_str("remote").unwrap(),
        RepositoryType::Hosted
    );
}

#[test]
fn test_repository_type_from_str_local() {
    assert_eq!(
        RepositoryType::from_str("local").unwrap(),
        RepositoryType::Local
    );
    assert_eq!(
        RepositoryType::from_str("memory").unwrap(),
        RepositoryType::Local
    );
}

#[test]
fn test_repository_type_from_str_invalid() {
    let result = RepositoryType::from_str("postgres");
    assert!(result.unwrap_err().contains("Unknown repository type"));
}

#[test]
fn test_repository_type_from_env_default() {
    support::with_scoped_env(&[("REPOSITORY_TYPE", None), ("HUB_URL", None)], || {
        assert_eq!(RepositoryType::from_env(), RepositoryType::Local);
    });
}

#[test]
fn test_repository_type_from_env_with_hub_url() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", None),
            ("HUB_URL", Some("https://project.example.co")),
        ],
        || {
            assert_eq!(RepositoryType::from_env(), RepositoryType::Hosted);
        },
    );
}

#[test]
fn test_repository_type_from_env_explicit_overrides_hub_url() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", Some("local")),
            ("HUB_URL", Some("https://project.example.co")),
        ],
        || {
            assert_eq!(RepositoryType::from_env(), RepositoryType::Local);
        },
    );
}

#[test]
fn test_repository_type_from_env_invalid_defaults_to_local() {
    support::with_scoped_env(&[("REPOSITORY_TYPE", Some("invalid"))], || {
        assert_eq!(RepositoryType::from_env(), RepositoryType::Local);
    });
}

#[tokio::test]
async fn test_create_local_via_factory() {
    let repo = RepositoryFactory::create(RepositoryType::Local, None)
        .await
        .unwrap();
    assert!(repo.health_check().await.unwrap());
}

#[cfg(not(feature = "hosted-repo"))]
#[tokio::test]
async fn test_create_hosted_without_feature_fails() {
    let result = RepositoryFactory::create(RepositoryType::Hosted, None).await;
    let err = result.err().unwrap();
    assert!(err.to_string().contains("feature not enabled"));
}

#[cfg(feature = "hosted-repo")]
#[tokio::test]
async fn test_create_hosted_without_config_fails() {
    let result = RepositoryFactory::create(RepositoryType::Hosted, None).await;
    let err = result.err().unwrap();
    assert!(err.to_string().contains("requires HostedConfig"));
}

#[tokio::test]
async fn test_builder_local() {
    let repo = RepositoryBuilder::new()
        .repository_type(RepositoryType::Local)
        .build()
        .await
        .unwrap();
    assert!(repo.health_check().await.unwrap());
}

#[tokio::test]
async fn test_factory_from_local_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[repository]\ntype = \"local\"").unwrap();

    let repo = RepositoryFactory::from_config_file(file.path()).await.unwrap();
    assert!(repo.health_check().await.unwrap());
}

#[tokio::test]
async fn test_factory_rejects_unknown_type_in_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[repository]\ntype = \"sqlite\"").unwrap();

    let err = RepositoryFactory::from_config_file(file.path())
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("Invalid repository type"));
}

#[test]
fn test_repository_config_hosted_defaults() {
    let config: RepositoryConfig = toml::from_str(
        r#"
        [repository]
        type = "hosted"

        [hosted]
        url = "https://project.example.co/"
        service_role_key = "service-key"
        "#,
    )
    .unwrap();

    assert_eq!(config.repository_type().unwrap(), RepositoryType::Hosted);
    assert_eq!(config.hosted.timeout_sec, 20);
    assert_eq!(config.hosted.max_retries, 2);
    assert_eq!(config.hosted.retry_delay_ms, 100);
}

#[cfg(feature = "hosted-repo")]
#[test]
fn test_repository_config_hosted_requires_credentials() {
    let config: RepositoryConfig = toml::from_str(
        r#"
        [repository]
        type = "hosted"

        [hosted]
        url = "https://project.example.co"
        "#,
    )
    .unwrap();

    let err = config.to_hosted_config().unwrap_err();
    assert!(err.to_string().contains("service_role_key"));
}

#[test]
fn test_missing_config_file_is_configuration_error() {
    let err = RepositoryConfig::from_file("/nonexistent/repository.toml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
